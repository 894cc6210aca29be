// src/repository/parsers/prestodelta.rs

//! prestodelta.xml decoder
//!
//! Each `<newpackage>` names a target package and holds one `<delta>` per
//! old version a patch is published for. Every delta becomes its own
//! record carrying the newpackage's name/epoch/version/release/arch.

use super::{attribute_or_empty, cdata, expect_root, local_name, text};
use crate::error::{Error, Result};
use crate::repository::DeltaPackageRecord;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;
use tracing::{debug, info};

const ROOT: &str = "prestodelta";

/// Character-data fields inside `<delta>`
#[derive(Debug, Clone, Copy)]
enum DeltaField {
    Filename,
    Sequence,
    Size,
    Checksum,
}

#[derive(Default)]
struct PrestoState {
    deltas: Vec<DeltaPackageRecord>,
    /// Attributes of the enclosing `<newpackage>`
    target: Option<DeltaPackageRecord>,
    current: Option<DeltaPackageRecord>,
    field: Option<DeltaField>,
}

impl PrestoState {
    fn open(&mut self, e: &BytesStart<'_>, depth: usize) -> Result<()> {
        let name = local_name(e);

        match depth {
            1 => expect_root(&name, ROOT)?,
            2 if name == "newpackage" => {
                self.target = Some(DeltaPackageRecord {
                    name: attribute_or_empty(e, "name")?,
                    epoch: attribute_or_empty(e, "epoch")?,
                    version: attribute_or_empty(e, "version")?,
                    release: attribute_or_empty(e, "release")?,
                    arch: attribute_or_empty(e, "arch")?,
                    ..Default::default()
                });
            }
            3 if name == "delta" => {
                if let Some(ref target) = self.target {
                    self.current = Some(DeltaPackageRecord {
                        old_epoch: attribute_or_empty(e, "oldepoch")?,
                        old_version: attribute_or_empty(e, "oldversion")?,
                        old_release: attribute_or_empty(e, "oldrelease")?,
                        ..target.clone()
                    });
                }
            }
            4 => {
                if let Some(ref mut delta) = self.current {
                    self.field = match name.as_str() {
                        "filename" => Some(DeltaField::Filename),
                        "sequence" => Some(DeltaField::Sequence),
                        "size" => Some(DeltaField::Size),
                        "checksum" => {
                            delta.checksum_type = attribute_or_empty(e, "type")?;
                            Some(DeltaField::Checksum)
                        }
                        _ => None,
                    };
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, depth: usize) {
        match depth {
            4 => self.field = None,
            3 => {
                if let Some(delta) = self.current.take() {
                    self.deltas.push(delta);
                }
            }
            2 => self.target = None,
            _ => {}
        }
    }

    fn push_text(&mut self, value: &str) {
        let (Some(field), Some(delta)) = (self.field, self.current.as_mut()) else {
            return;
        };
        let target = match field {
            DeltaField::Filename => &mut delta.filename,
            DeltaField::Sequence => &mut delta.sequence,
            DeltaField::Size => &mut delta.size,
            DeltaField::Checksum => &mut delta.checksum,
        };
        target.push_str(value);
    }
}

/// Decode a prestodelta.xml stream into delta records, in document order
pub fn parse_prestodelta<R: BufRead>(input: R, source: &str) -> Result<Vec<DeltaPackageRecord>> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut state = PrestoState::default();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                seen_root = true;
                state.open(&e, depth)?;
            }
            Ok(Event::Empty(e)) => {
                seen_root = true;
                state.open(&e, depth + 1)?;
                state.close(depth + 1);
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Text(e)) => state.push_text(&text(&e)?),
            Ok(Event::CData(e)) => state.push_text(&cdata(&e)),
            Ok(Event::End(_)) => {
                state.close(depth);
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Eof) => {
                if depth != 0 {
                    return Err(Error::ParseError(format!(
                        "Failed to parse {}: unexpected end of document",
                        source
                    )));
                }
                break;
            }
            Err(e) => {
                return Err(Error::ParseError(format!(
                    "Failed to parse {} at byte {}: {}",
                    source,
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(Error::ParseError(format!(
            "{} has no <{}> root element",
            source, ROOT
        )));
    }

    debug!("Decoded {} delta entries from {}", state.deltas.len(), source);

    if state.deltas.is_empty() {
        return Err(Error::EmptyDocument(source.to_string()));
    }

    info!("Parsed {} deltas from {}", state.deltas.len(), source);
    Ok(state.deltas)
}
