// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use repodiff::{write_report, Comparison, Input, LoaderConfig, MetadataLoader, ReportOptions};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "repodiff")]
#[command(author, version, about = "Compare two RPM repository metadata snapshots", long_about = None)]
struct Cli {
    /// New package list: primary.xml[.gz], repomd.xml, repository directory or URL
    #[arg(long, env = "REPODIFF_NEW", default_value = "NewPrimary.xml.gz")]
    new: String,

    /// Old package list: primary.xml[.gz], repomd.xml, repository directory or URL
    #[arg(long, env = "REPODIFF_OLD", default_value = "OldPrimary.xml.gz")]
    old: String,

    /// Output for the comparison result ("-" for stdout)
    #[arg(short, long, env = "REPODIFF_OUTPUT", default_value = "-")]
    output: String,

    /// Path prefix joined in front of every package path in the output
    #[arg(long, env = "REPODIFF_REPO_PATH", default_value = "")]
    repo_path: String,

    /// Display packages only in the new list
    #[arg(long, alias = "showAdded")]
    show_added: bool,

    /// Display packages only in the old list
    #[arg(long, alias = "showRemoved")]
    show_removed: bool,

    /// Display packages in both the new and old lists
    #[arg(long, alias = "showCommon")]
    show_common: bool,

    /// Timeout in seconds for remote metadata requests
    #[arg(long, env = "REPODIFF_TIMEOUT", default_value_t = 5)]
    timeout: u64,

    /// Verify repository metadata files against the checksums in repomd.xml
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<()> {
    // Log to stderr so the report can go to stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let loader = MetadataLoader::new(LoaderConfig {
        timeout: Duration::from_secs(cli.timeout),
        verify_checksums: cli.verify,
    });

    let new_records = loader
        .load(&Input::parse(&cli.new))
        .with_context(|| format!("Failed to load new package list {}", cli.new))?;
    let old_records = loader
        .load(&Input::parse(&cli.old))
        .with_context(|| format!("Failed to load old package list {}", cli.old))?;

    let mut out: Box<dyn Write> = if cli.output == "-" {
        Box::new(BufWriter::new(io::stdout().lock()))
    } else {
        let file = File::create(&cli.output)
            .with_context(|| format!("Failed to create output file {}", cli.output))?;
        Box::new(BufWriter::new(file))
    };

    info!("Doing matchups");
    let comparison = Comparison::new(&new_records, &old_records);

    let options = ReportOptions {
        show_added: cli.show_added,
        show_common: cli.show_common,
        show_removed: cli.show_removed,
        repo_path: cli.repo_path,
        new_label: cli.new,
        old_label: cli.old,
    };
    write_report(&mut out, &comparison, &options)?;

    Ok(())
}
