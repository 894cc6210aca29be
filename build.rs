// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("repodiff")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Repodiff Contributors")
        .about("Compare two RPM repository metadata snapshots")
        .arg(
            Arg::new("new")
                .long("new")
                .value_name("PATH")
                .default_value("NewPrimary.xml.gz")
                .help("New package list: primary.xml[.gz], repomd.xml, repository directory or URL"),
        )
        .arg(
            Arg::new("old")
                .long("old")
                .value_name("PATH")
                .default_value("OldPrimary.xml.gz")
                .help("Old package list: primary.xml[.gz], repomd.xml, repository directory or URL"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .default_value("-")
                .help("Output for the comparison result (\"-\" for stdout)"),
        )
        .arg(
            Arg::new("repo_path")
                .long("repo-path")
                .value_name("PREFIX")
                .default_value("")
                .help("Path prefix joined in front of every package path in the output"),
        )
        .arg(
            Arg::new("show_added")
                .long("show-added")
                .action(ArgAction::SetTrue)
                .help("Display packages only in the new list"),
        )
        .arg(
            Arg::new("show_removed")
                .long("show-removed")
                .action(ArgAction::SetTrue)
                .help("Display packages only in the old list"),
        )
        .arg(
            Arg::new("show_common")
                .long("show-common")
                .action(ArgAction::SetTrue)
                .help("Display packages in both the new and old lists"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .default_value("5")
                .help("Timeout in seconds for remote metadata requests"),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .action(ArgAction::SetTrue)
                .help("Verify repository metadata files against the checksums in repomd.xml"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("repodiff.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
