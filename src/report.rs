// src/report.rs

//! Text report of a comparison
//!
//! The report is line oriented: two header lines, then for each requested
//! partition a summary line followed by one rendered record per line.
//! Partitions always appear in the order added, common, removed.

use crate::diff::{match_records, Matchup};
use crate::error::Result;
use crate::repository::Matchable;
use std::io::Write;
use tracing::debug;

/// Tool identifier written in the report header
pub const TOOL_NAME: &str = "repodiff";

/// One of the three output groups of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Only in the new snapshot
    Added,

    /// In both snapshots (rendered from the new side)
    Common,

    /// Only in the old snapshot
    Removed,
}

impl Partition {
    /// Emission order
    pub const ALL: [Partition; 3] = [Partition::Added, Partition::Common, Partition::Removed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Added => "added",
            Partition::Common => "common",
            Partition::Removed => "removed",
        }
    }
}

/// What to print and how
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub show_added: bool,
    pub show_common: bool,
    pub show_removed: bool,

    /// Prefix joined in front of every record path
    pub repo_path: String,

    /// Input identifiers echoed in the header
    pub new_label: String,
    pub old_label: String,
}

impl ReportOptions {
    /// Whether `partition` was requested
    pub fn shows(&self, partition: Partition) -> bool {
        match partition {
            Partition::Added => self.show_added,
            Partition::Common => self.show_common,
            Partition::Removed => self.show_removed,
        }
    }
}

/// Two record sets and their pairing
pub struct Comparison<'a, T> {
    new: &'a [T],
    old: &'a [T],
    matchup: Matchup,
}

impl<'a, T: Matchable> Comparison<'a, T> {
    /// Pair `new` against `old`
    pub fn new(new: &'a [T], old: &'a [T]) -> Self {
        let matchup = match_records(new, old);
        Self { new, old, matchup }
    }

    pub fn matchup(&self) -> &Matchup {
        &self.matchup
    }

    /// Records of `partition`, in source document order
    pub fn partition(&self, partition: Partition) -> Vec<&'a T> {
        let (records, flags, wanted) = match partition {
            Partition::Added => (self.new, &self.matchup.new_matched, false),
            Partition::Common => (self.new, &self.matchup.new_matched, true),
            Partition::Removed => (self.old, &self.matchup.old_matched, false),
        };

        records
            .iter()
            .zip(flags)
            .filter(|(_, matched)| **matched == wanted)
            .map(|(record, _)| record)
            .collect()
    }

    /// Sum of the record sizes in `partition`
    pub fn total_size(&self, partition: Partition) -> u64 {
        total_size(self.partition(partition))
    }
}

/// Sum record sizes; sizes that are not unsigned integers count as zero
pub fn total_size<'r, T, I>(records: I) -> u64
where
    T: Matchable + 'r,
    I: IntoIterator<Item = &'r T>,
{
    records
        .into_iter()
        .map(|record| record.size().trim().parse::<u64>().unwrap_or(0))
        .fold(0, u64::saturating_add)
}

/// Format a byte count with IEC units
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Write the report for `comparison` to `out`
pub fn write_report<W, T>(out: &mut W, comparison: &Comparison<'_, T>, options: &ReportOptions) -> Result<()>
where
    W: Write,
    T: Matchable,
{
    writeln!(
        out,
        "# {} matchup, version: {}",
        TOOL_NAME,
        crate::VERSION
    )?;
    writeln!(out, "# new: {} old: {}", options.new_label, options.old_label)?;

    for partition in Partition::ALL {
        if !options.shows(partition) {
            continue;
        }

        let records = comparison.partition(partition);
        let total = total_size(records.iter().copied());
        debug!(
            "Writing {} {} records ({} bytes)",
            records.len(),
            partition.as_str(),
            total
        );

        writeln!(
            out,
            "# {}: {} records, {} ({} bytes)",
            partition.as_str(),
            records.len(),
            human_size(total),
            total
        )?;
        for record in records {
            writeln!(out, "{}", record.render(&options.repo_path))?;
        }
    }

    out.flush()?;
    Ok(())
}
