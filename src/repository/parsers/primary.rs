// src/repository/parsers/primary.rs

//! primary.xml decoder
//!
//! Lifts the checksum, package size and location of every `<package>`
//! element. The root `<metadata packages="N">` count must agree with the
//! number of packages decoded, which catches truncated downloads.

use super::{attribute, attribute_or_empty, cdata, expect_root, local_name, text};
use crate::error::{Error, Result};
use crate::repository::PackageRecord;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;
use tracing::{debug, info};

const ROOT: &str = "metadata";

/// Decoder state while walking primary.xml
#[derive(Default)]
struct PrimaryState {
    declared: Option<usize>,
    packages: Vec<PackageRecord>,
    current: Option<PackageRecord>,
    in_checksum: bool,
}

impl PrimaryState {
    /// Handle an opening (or self-closing) element at `depth`
    fn open(&mut self, e: &BytesStart<'_>, depth: usize) -> Result<()> {
        let name = local_name(e);

        match depth {
            1 => {
                expect_root(&name, ROOT)?;
                if let Some(count) = attribute(e, "packages")? {
                    let count = count.trim().parse().map_err(|err| {
                        Error::ParseError(format!("Invalid packages count '{}': {}", count, err))
                    })?;
                    self.declared = Some(count);
                }
            }
            2 if name == "package" => {
                self.current = Some(PackageRecord::default());
            }
            3 => {
                if let Some(ref mut pkg) = self.current {
                    match name.as_str() {
                        "checksum" => {
                            pkg.checksum_type = attribute_or_empty(e, "type")?;
                            self.in_checksum = true;
                        }
                        "size" => pkg.size = attribute_or_empty(e, "package")?,
                        "location" => pkg.location = attribute_or_empty(e, "href")?,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Handle a closing element at `depth`
    fn close(&mut self, depth: usize) {
        match depth {
            3 => self.in_checksum = false,
            2 => {
                if let Some(pkg) = self.current.take() {
                    self.packages.push(pkg);
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, value: &str) {
        if self.in_checksum {
            if let Some(ref mut pkg) = self.current {
                pkg.checksum.push_str(value);
            }
        }
    }
}

/// Decode a primary.xml stream into package records, in document order
///
/// `source` names the document in diagnostics.
pub fn parse_primary<R: BufRead>(input: R, source: &str) -> Result<Vec<PackageRecord>> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut state = PrimaryState::default();
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

    let packages = state.packages;
    debug!("Decoded {} package entries from {}", packages.len(), source);

    if packages.is_empty() {
        return Err(Error::EmptyDocument(source.to_string()));
    }

    let declared = state.declared.unwrap_or(0);
    if declared != packages.len() {
        return Err(Error::CountMismatch {
            declared,
            parsed: packages.len(),
        });
    }

    info!("Parsed {} packages from {}", packages.len(), source);
    Ok(packages)
}
