// src/repository/parsers/repomd.rs

//! repomd.xml decoder
//!
//! The manifest lists each metadata document of a repository by role
//! (`<data type="primary">`) with its location, checksum, timestamp and
//! size.

use super::{attribute, attribute_or_empty, cdata, expect_root, local_name, text, MetadataRole};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;
use tracing::debug;

const ROOT: &str = "repomd";

/// Checksum value and algorithm as declared in the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checksum {
    pub value: String,
    pub algorithm: String,
}

/// One `<data>` entry of repomd.xml
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestEntry {
    /// Role tag (`type` attribute), e.g. "primary" or "prestodelta"
    pub role: String,

    /// Document location relative to the repository root
    pub href: String,

    /// Checksum of the document as stored (usually compressed)
    pub checksum: Option<Checksum>,

    /// Checksum of the decompressed document
    pub open_checksum: Option<Checksum>,
    pub timestamp: Option<f64>,
    pub size: Option<u64>,
    pub open_size: Option<u64>,
}

impl ManifestEntry {
    /// Role of this entry, if it is one repodiff decodes
    pub fn metadata_role(&self) -> Option<MetadataRole> {
        MetadataRole::from_type(&self.role)
    }
}

/// Decoded repomd.xml
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryManifest {
    pub revision: Option<String>,
    pub entries: Vec<ManifestEntry>,
}

impl RepositoryManifest {
    /// Entries declaring `role`, in manifest order
    pub fn entries_for(&self, role: MetadataRole) -> impl Iterator<Item = &ManifestEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.metadata_role() == Some(role))
    }
}

#[derive(Debug, Clone, Copy)]
enum ManifestField {
    Revision,
    Checksum,
    OpenChecksum,
    Timestamp,
    Size,
    OpenSize,
}

#[derive(Default)]
struct RepomdState {
    manifest: RepositoryManifest,
    current: Option<ManifestEntry>,
    field: Option<ManifestField>,
    value: String,
}

impl RepomdState {
    fn open(&mut self, e: &BytesStart<'_>, depth: usize) -> Result<()> {
        let name = local_name(e);

        match depth {
            1 => expect_root(&name, ROOT)?,
            2 => match name.as_str() {
                "data" => {
                    self.current = Some(ManifestEntry {
                        role: attribute_or_empty(e, "type")?,
                        ..Default::default()
                    });
                }
                "revision" => self.begin(ManifestField::Revision),
                _ => {}
            },
            3 => {
                if let Some(ref mut entry) = self.current {
                    match name.as_str() {
                        "location" => entry.href = attribute_or_empty(e, "href")?,
                        "checksum" => {
                            entry.checksum = Some(Checksum {
                                algorithm: attribute(e, "type")?.unwrap_or_default(),
                                ..Default::default()
                            });
                            self.begin(ManifestField::Checksum);
                        }
                        "open-checksum" => {
                            entry.open_checksum = Some(Checksum {
                                algorithm: attribute(e, "type")?.unwrap_or_default(),
                                ..Default::default()
                            });
                            self.begin(ManifestField::OpenChecksum);
                        }
                        "timestamp" => self.begin(ManifestField::Timestamp),
                        "size" => self.begin(ManifestField::Size),
                        "open-size" => self.begin(ManifestField::OpenSize),
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn begin(&mut self, field: ManifestField) {
        self.field = Some(field);
        self.value.clear();
    }

    fn close(&mut self, depth: usize) -> Result<()> {
        if let Some(field) = self.field.take() {
            self.finish(field)?;
        }
        if depth == 2 {
            if let Some(entry) = self.current.take() {
                self.manifest.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Store the collected character data of `field`
    fn finish(&mut self, field: ManifestField) -> Result<()> {
        let value = std::mem::take(&mut self.value);

        if let ManifestField::Revision = field {
            self.manifest.revision = Some(value);
            return Ok(());
        }

        let Some(ref mut entry) = self.current else {
            return Ok(());
        };

        match field {
            ManifestField::Revision => {}
            ManifestField::Checksum => {
                if let Some(ref mut checksum) = entry.checksum {
                    checksum.value = value;
                }
            }
            ManifestField::OpenChecksum => {
                if let Some(ref mut checksum) = entry.open_checksum {
                    checksum.value = value;
                }
            }
            ManifestField::Timestamp => entry.timestamp = parse_number(&value, "timestamp")?,
            ManifestField::Size => entry.size = parse_number(&value, "size")?,
            ManifestField::OpenSize => entry.open_size = parse_number(&value, "open-size")?,
        }
        Ok(())
    }
}

/// Parse a numeric field; an empty element leaves the field unset
fn parse_number<T>(value: &str, field: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|e| {
        Error::ParseError(format!("Invalid {} '{}' in repomd.xml: {}", field, value, e))
    })
}

/// Decode a repomd.xml stream
///
/// Any decoding failure is returned as an error; no partially populated
/// manifest is ever handed back.
pub fn parse_repomd<R: BufRead>(input: R, source: &str) -> Result<RepositoryManifest> {
    let mut reader = Reader::from_reader(input);
    reader.trim_text(true);

    let mut state = RepomdState::default();
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
                state.close(depth + 1)?;
                if depth == 0 {
                    break;
                }
            }
            Ok(Event::Text(e)) => {
                if state.field.is_some() {
                    state.value.push_str(&text(&e)?);
                }
            }
            Ok(Event::CData(e)) => {
                if state.field.is_some() {
                    state.value.push_str(&cdata(&e));
                }
            }
            Ok(Event::End(_)) => {
                state.close(depth)?;
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
                    "Failed to parse {}: {}",
                    source, e
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

    debug!(
        "Decoded {} data entries from {}",
        state.manifest.entries.len(),
        source
    );
    Ok(state.manifest)
}
