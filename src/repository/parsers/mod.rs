// src/repository/parsers/mod.rs

//! Repository metadata parsers for RPM repositories
//!
//! This module provides decoders for the three repodata documents:
//! - repomd.xml: the repository manifest listing the other documents
//! - primary.xml: every package with checksum, size and location
//! - prestodelta.xml: binary deltas between package versions
//!
//! All three are streamed with quick-xml. Only attribute values and
//! character data are lifted; whitespace and comments are ignored.

pub mod prestodelta;
pub mod primary;
pub mod repomd;

pub use prestodelta::parse_prestodelta;
pub use primary::parse_primary;
pub use repomd::{parse_repomd, ManifestEntry, RepositoryManifest};

use crate::error::{Error, Result};
use quick_xml::events::{BytesCData, BytesStart, BytesText};

/// Role of a metadata document as declared in repomd.xml
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataRole {
    /// Full package list (primary.xml)
    Primary,

    /// Binary delta list (prestodelta.xml)
    PrestoDelta,
}

impl MetadataRole {
    /// Look up a role by its repomd `type` attribute (case-sensitive)
    pub fn from_type(value: &str) -> Option<Self> {
        match value {
            "primary" => Some(MetadataRole::Primary),
            "prestodelta" => Some(MetadataRole::PrestoDelta),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataRole::Primary => "primary",
            MetadataRole::PrestoDelta => "prestodelta",
        }
    }
}

/// Element name without its namespace prefix
pub(crate) fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Unescaped value of the attribute named `key`, if present
pub(crate) fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::ParseError(format!("Invalid attribute: {}", err)))?;
        if attr.key.local_name().as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| Error::ParseError(format!("Invalid attribute value: {}", err)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Attribute value, or an empty string when the attribute is absent
pub(crate) fn attribute_or_empty(e: &BytesStart<'_>, key: &str) -> Result<String> {
    Ok(attribute(e, key)?.unwrap_or_default())
}

/// Unescaped character data
pub(crate) fn text(e: &BytesText<'_>) -> Result<String> {
    e.unescape()
        .map(|t| t.into_owned())
        .map_err(|err| Error::ParseError(format!("Invalid character data: {}", err)))
}

/// Raw CDATA contents
pub(crate) fn cdata(e: &BytesCData<'_>) -> String {
    String::from_utf8_lossy(e).into_owned()
}

/// Fail unless the document root is the element the decoder expects
pub(crate) fn expect_root(found: &str, expected: &str) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(Error::UnexpectedRoot {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}
