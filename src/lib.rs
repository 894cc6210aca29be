// src/lib.rs

//! repodiff - RPM repository snapshot comparison
//!
//! Compares two snapshots of an RPM repository's package index and reports
//! which packages were added, removed, or kept between them.
//!
//! # Architecture
//!
//! - Ingestion: metadata documents are sniffed for compression and decoded
//!   into records (primary.xml packages, prestodelta.xml deltas), following
//!   repomd.xml when given a repository
//! - Matching: records are paired by a per-kind identity tuple
//! - Reporting: added / common / removed partitions rendered as text

pub mod compression;
pub mod diff;
mod error;
pub mod report;
pub mod repository;

pub use diff::{match_records, Matchup};
pub use error::{Error, Result};
pub use report::{write_report, Comparison, Partition, ReportOptions};
pub use repository::source::{Input, LoaderConfig, MetadataLoader};
pub use repository::{DeltaPackageRecord, Matchable, PackageRecord, Record};

/// Crate version written into report headers
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
