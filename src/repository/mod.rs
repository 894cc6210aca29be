// src/repository/mod.rs

//! Repository metadata records and their matching rules
//!
//! This module provides:
//! - The two record kinds decoded from repository metadata (full packages
//!   from primary.xml, binary deltas from prestodelta.xml)
//! - The `Matchable` capability shared by both kinds
//! - Checksum verification for downloaded metadata documents

pub mod parsers;
pub mod source;

use crate::error::{Error, Result};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::hash::Hash;
use tracing::debug;

/// Capability shared by every record kind the diff engine can compare
pub trait Matchable {
    /// Identity tuple borrowed from the record
    type Key<'a>: Eq + Hash
    where
        Self: 'a;

    /// Fields that decide whether two records describe the same artifact
    fn identity(&self) -> Self::Key<'_>;

    /// True if `other` describes the same artifact
    fn matches(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    /// Artifact size in bytes, as written in the source document
    fn size(&self) -> &str;

    /// Render as `{<algo>}<checksum> <size> <path>`, with the path joined
    /// under `repo_path`
    fn render(&self, repo_path: &str) -> String;
}

/// A package artifact listed in primary.xml
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageRecord {
    /// Package checksum value
    pub checksum: String,

    /// Checksum algorithm (sha256, sha1, ...)
    pub checksum_type: String,

    /// Compressed package size in bytes
    pub size: String,

    /// Download path relative to the repository root
    pub location: String,
}

/// Identity tuple of a `PackageRecord`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageKey<'a> {
    pub checksum: &'a str,
    pub checksum_type: &'a str,
    pub size: &'a str,
    pub location: &'a str,
}

impl PackageRecord {
    /// Create a package record
    pub fn new(checksum: &str, checksum_type: &str, size: &str, location: &str) -> Self {
        Self {
            checksum: checksum.to_string(),
            checksum_type: checksum_type.to_string(),
            size: size.to_string(),
            location: location.to_string(),
        }
    }
}

impl Matchable for PackageRecord {
    type Key<'a> = PackageKey<'a>;

    fn identity(&self) -> PackageKey<'_> {
        PackageKey {
            checksum: &self.checksum,
            checksum_type: &self.checksum_type,
            size: &self.size,
            location: &self.location,
        }
    }

    fn size(&self) -> &str {
        &self.size
    }

    fn render(&self, repo_path: &str) -> String {
        format!(
            "{{{}}}{} {} {}",
            self.checksum_type,
            self.checksum,
            self.size,
            join_path(repo_path, &self.location)
        )
    }
}

/// A binary delta (old version to new version) listed in prestodelta.xml
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaPackageRecord {
    pub name: String,
    pub epoch: String,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub old_epoch: String,
    pub old_version: String,
    pub old_release: String,

    /// Delta file path relative to the repository root
    pub filename: String,
    pub sequence: String,

    /// Delta file size in bytes
    pub size: String,
    pub checksum: String,
    pub checksum_type: String,
}

/// Identity tuple of a `DeltaPackageRecord`
///
/// The filename is left out: delta filenames usually embed a hash that
/// has nothing to do with the package identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeltaKey<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub release: &'a str,
    pub old_version: &'a str,
    pub old_release: &'a str,
    pub size: &'a str,
    pub checksum: &'a str,
}

impl Matchable for DeltaPackageRecord {
    type Key<'a> = DeltaKey<'a>;

    fn identity(&self) -> DeltaKey<'_> {
        DeltaKey {
            name: &self.name,
            version: &self.version,
            release: &self.release,
            old_version: &self.old_version,
            old_release: &self.old_release,
            size: &self.size,
            checksum: &self.checksum,
        }
    }

    fn size(&self) -> &str {
        &self.size
    }

    fn render(&self, repo_path: &str) -> String {
        format!(
            "{{{}}}{} {} {}",
            self.checksum_type,
            self.checksum,
            self.size,
            join_path(repo_path, &self.filename)
        )
    }
}

/// Any record decoded from repository metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Package(PackageRecord),
    Delta(DeltaPackageRecord),
}

/// Identity of a `Record`; keys of different kinds never compare equal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey<'a> {
    Package(PackageKey<'a>),
    Delta(DeltaKey<'a>),
}

impl Matchable for Record {
    type Key<'a> = RecordKey<'a>;

    fn identity(&self) -> RecordKey<'_> {
        match self {
            Record::Package(p) => RecordKey::Package(p.identity()),
            Record::Delta(d) => RecordKey::Delta(d.identity()),
        }
    }

    fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Record::Package(a), Record::Package(b)) => a.matches(b),
            (Record::Delta(a), Record::Delta(b)) => a.matches(b),
            _ => false,
        }
    }

    fn size(&self) -> &str {
        match self {
            Record::Package(p) => p.size(),
            Record::Delta(d) => d.size(),
        }
    }

    fn render(&self, repo_path: &str) -> String {
        match self {
            Record::Package(p) => p.render(repo_path),
            Record::Delta(d) => d.render(repo_path),
        }
    }
}

impl From<PackageRecord> for Record {
    fn from(record: PackageRecord) -> Self {
        Record::Package(record)
    }
}

impl From<DeltaPackageRecord> for Record {
    fn from(record: DeltaPackageRecord) -> Self {
        Record::Delta(record)
    }
}

/// Join a record path under a repository path prefix
///
/// Behaves like slash-path joining: empty parts are dropped, duplicate
/// separators collapse, and `.`/`..` segments are resolved. A prefix with
/// a URL scheme (`https://mirror/...`) keeps its `scheme://`.
pub fn join_path(prefix: &str, path: &str) -> String {
    let (scheme, prefix) = match prefix.find("://") {
        Some(idx) => prefix.split_at(idx + 3),
        None => ("", prefix),
    };

    let joined = match (prefix.is_empty(), path.is_empty()) {
        (true, true) => return scheme.to_string(),
        (true, false) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, path),
    };

    if scheme.is_empty() {
        clean_path(&joined)
    } else {
        format!("{}{}", scheme, clean_path(&joined).trim_start_matches('/'))
    }
}

/// Lexically clean a slash-separated path
fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            s => segments.push(s),
        }
    }

    let body = segments.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => format!("/{}", body),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

/// Verify that `data` hashes to `expected` under the named algorithm
pub fn verify_checksum(data: &[u8], expected: &str, algorithm: &str) -> Result<()> {
    let actual = match algorithm.to_ascii_lowercase().as_str() {
        "sha224" => format!("{:x}", Sha224::digest(data)),
        "sha256" => format!("{:x}", Sha256::digest(data)),
        "sha384" => format!("{:x}", Sha384::digest(data)),
        "sha512" => format!("{:x}", Sha512::digest(data)),
        other => return Err(Error::UnsupportedChecksum(other.to_string())),
    };

    if !actual.eq_ignore_ascii_case(expected.trim()) {
        return Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }

    debug!("Checksum verified: {}", expected);
    Ok(())
}
