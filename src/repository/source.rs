// src/repository/source.rs

//! Loading one side of a comparison
//!
//! An input is either a single primary.xml document, a repository
//! manifest (repomd.xml), a local repository directory, or a remote
//! repository URL. Manifest-based inputs are followed to their
//! `primary` and `prestodelta` documents.
//!
//! Failure policy: local documents that cannot be opened or decoded abort
//! the run. A manifest that cannot be read, a remote request that fails,
//! or a checksum that does not verify only makes that part of the side
//! unavailable; the side then contributes no records for it.

use crate::compression::{open_bytes, open_document, Document};
use crate::error::{Error, Result};
use crate::repository::parsers::{parse_prestodelta, parse_primary, parse_repomd};
use crate::repository::parsers::{ManifestEntry, MetadataRole};
use crate::repository::{verify_checksum, Record};
use reqwest::blocking::Client;
use std::cell::OnceCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// File name of the repository manifest
pub const MANIFEST_NAME: &str = "repomd.xml";

/// Directory holding repository metadata under a repository root
pub const METADATA_DIR: &str = "repodata";

/// Default timeout for remote metadata requests (5 seconds)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for reading repository metadata
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Timeout for each remote request; requests are not retried
    pub timeout: Duration,

    /// Verify manifest-referenced documents against their declared checksum
    pub verify_checksums: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            verify_checksums: false,
        }
    }
}

/// One side of the comparison as given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A primary.xml document (plain or compressed)
    File(PathBuf),

    /// A repomd.xml manifest on disk
    Manifest(PathBuf),

    /// A repository directory holding repomd.xml
    Directory(PathBuf),

    /// A repository root URL, or the URL of its repomd.xml
    Remote(String),
}

impl Input {
    /// Classify an input argument
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            return Input::Remote(value.to_string());
        }

        let path = PathBuf::from(value);
        if path.is_dir() {
            Input::Directory(path)
        } else if path.file_name().is_some_and(|name| name == MANIFEST_NAME) {
            Input::Manifest(path)
        } else {
            Input::File(path)
        }
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::File(path) | Input::Manifest(path) | Input::Directory(path) => {
                write!(f, "{}", path.display())
            }
            Input::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Where a metadata document lives
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    Local(PathBuf),
    Remote(String),
}

impl Location {
    /// Resolve a manifest href against this repository root
    fn join(&self, href: &str) -> Location {
        match self {
            Location::Local(root) => Location::Local(root.join(href)),
            Location::Remote(root) => Location::Remote(format!(
                "{}/{}",
                root.trim_end_matches('/'),
                href.trim_start_matches('/')
            )),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Reads repository metadata into records
pub struct MetadataLoader {
    config: LoaderConfig,
    client: OnceCell<Client>,
}

impl MetadataLoader {
    /// Create a new loader
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    /// Load every record one side of the comparison provides
    pub fn load(&self, input: &Input) -> Result<Vec<Record>> {
        let records = match input {
            Input::File(path) => {
                let source = path.display().to_string();
                decode(MetadataRole::Primary, open_document(path)?, &source)?
            }
            Input::Manifest(path) => {
                let root = manifest_root(path);
                self.load_manifest(&Location::Local(path.clone()), &Location::Local(root))?
            }
            Input::Directory(dir) => {
                let manifest = find_manifest(dir)?;
                let root = manifest_root(&manifest);
                self.load_manifest(&Location::Local(manifest), &Location::Local(root))?
            }
            Input::Remote(url) => {
                let (manifest, root) = remote_manifest(url);
                self.load_manifest(&Location::Remote(manifest), &Location::Remote(root))?
            }
        };

        info!("Loaded {} records from {}", records.len(), input);
        Ok(records)
    }

    /// Follow a manifest to its primary and prestodelta documents
    fn load_manifest(&self, manifest: &Location, root: &Location) -> Result<Vec<Record>> {
        let document = match self.open(manifest) {
            Ok(document) => document,
            Err(e) => {
                warn!("Could not read manifest {}: {}", manifest, e);
                return Ok(Vec::new());
            }
        };

        let manifest_doc = match parse_repomd(document, &manifest.to_string()) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Error in decoding manifest {}: {}", manifest, e);
                return Ok(Vec::new());
            }
        };

        for role in [MetadataRole::Primary, MetadataRole::PrestoDelta] {
            if manifest_doc.entries_for(role).next().is_none() {
                info!("No {} metadata listed in {}", role.as_str(), manifest);
            }
        }

        let mut records = Vec::new();
        for entry in &manifest_doc.entries {
            let Some(role) = entry.metadata_role() else {
                debug!("Skipping {} metadata at {}", entry.role, entry.href);
                continue;
            };
            let location = root.join(&entry.href);
            records.extend(self.load_document(role, &location, entry)?);
        }

        Ok(records)
    }

    /// Read and decode one manifest-referenced document
    fn load_document(
        &self,
        role: MetadataRole,
        location: &Location,
        entry: &ManifestEntry,
    ) -> Result<Vec<Record>> {
        let document = if self.config.verify_checksums {
            self.read_verified(location, entry)
        } else {
            self.open(location)
        };

        let document = match document {
            Ok(document) => document,
            Err(e) if e.is_degraded() => {
                warn!(
                    "{} metadata unavailable from {}: {}",
                    role.as_str(),
                    location,
                    e
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        decode(role, document, &location.to_string())
    }

    /// Read a document fully and check it against the manifest checksum
    fn read_verified(&self, location: &Location, entry: &ManifestEntry) -> Result<Document> {
        let data = match location {
            Location::Local(path) => {
                info!("Reading in file {}", path.display());
                fs::read(path).map_err(|e| {
                    Error::IoError(format!("Failed to read {}: {}", path.display(), e))
                })?
            }
            Location::Remote(url) => self.fetch(url)?,
        };

        match &entry.checksum {
            Some(checksum) => verify_checksum(&data, &checksum.value, &checksum.algorithm)?,
            None => warn!("No checksum listed for {}, skipping verification", location),
        }

        open_bytes(data)
    }

    fn open(&self, location: &Location) -> Result<Document> {
        match location {
            Location::Local(path) => open_document(path),
            Location::Remote(url) => open_bytes(self.fetch(url)?),
        }
    }

    /// Download a remote document into memory
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        info!("Fetching {}", url);

        let response = self
            .client()?
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| Error::DownloadError(format!("Failed to read response from {}: {}", url, e)))?;

        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    fn client(&self) -> Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }

        let client = Client::builder()
            .timeout(self.config.timeout)
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(self.client.get_or_init(|| client))
    }
}

impl Default for MetadataLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

/// Run the decoder for `role` and widen its records
fn decode(role: MetadataRole, document: Document, source: &str) -> Result<Vec<Record>> {
    let records = match role {
        MetadataRole::Primary => parse_primary(document, source)?
            .into_iter()
            .map(Record::from)
            .collect(),
        MetadataRole::PrestoDelta => parse_prestodelta(document, source)?
            .into_iter()
            .map(Record::from)
            .collect(),
    };
    Ok(records)
}

/// Locate repomd.xml inside a repository directory
fn find_manifest(dir: &Path) -> Result<PathBuf> {
    let candidates = [
        dir.join(MANIFEST_NAME),
        dir.join(METADATA_DIR).join(MANIFEST_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| {
            Error::NotFoundError(format!("No {} found in {}", MANIFEST_NAME, dir.display()))
        })
}

/// Repository root that manifest hrefs are relative to
///
/// Hrefs are written relative to the directory above `repodata/`.
fn manifest_root(manifest: &Path) -> PathBuf {
    let dir = manifest.parent().unwrap_or_else(|| Path::new(""));
    if dir.file_name().is_some_and(|name| name == METADATA_DIR) {
        dir.parent().unwrap_or_else(|| Path::new("")).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

/// Manifest URL and repository root URL for a remote input
fn remote_manifest(url: &str) -> (String, String) {
    let url = url.trim_end_matches('/');
    let manifest = if url.ends_with(".xml") {
        url.to_string()
    } else {
        format!("{}/{}/{}", url, METADATA_DIR, MANIFEST_NAME)
    };

    let dir = manifest.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let root = dir
        .strip_suffix(&format!("/{}", METADATA_DIR))
        .unwrap_or(dir)
        .to_string();

    (manifest, root)
}
