// tests/integration_test.rs

//! Integration tests for repodiff
//!
//! These tests build small repositories on disk and run them through
//! loading, matching and reporting.

use flate2::write::GzEncoder;
use repodiff::report::total_size;
use repodiff::{
    write_report, Comparison, Error, Input, LoaderConfig, MetadataLoader, Partition, Record,
    ReportOptions,
};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// (checksum, size, href)
type Pkg<'a> = (&'a str, &'a str, &'a str);

/// (name, oldrelease, filename, size, checksum)
type Drpm<'a> = (&'a str, &'a str, &'a str, &'a str, &'a str);

fn primary_xml(packages: &[Pkg<'_>]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <metadata xmlns=\"http://linux.duke.edu/metadata/common\" packages=\"{}\">\n",
        packages.len()
    );
    for (checksum, size, href) in packages {
        xml.push_str(&format!(
            "<package type=\"rpm\">\n\
             <name>pkg</name>\n\
             <checksum type=\"sha256\" pkgid=\"YES\">{}</checksum>\n\
             <size package=\"{}\" installed=\"1\" archive=\"1\"/>\n\
             <location href=\"{}\"/>\n\
             </package>\n",
            checksum, size, href
        ));
    }
    xml.push_str("</metadata>\n");
    xml
}

fn prestodelta_xml(deltas: &[Drpm<'_>]) -> String {
    let mut xml = String::from("<prestodelta>\n");
    for (name, old_release, filename, size, checksum) in deltas {
        xml.push_str(&format!(
            "<newpackage name=\"{}\" epoch=\"0\" version=\"1.0\" release=\"2\" arch=\"x86_64\">\n\
             <delta oldepoch=\"0\" oldversion=\"1.0\" oldrelease=\"{}\">\n\
             <filename>{}</filename>\n\
             <sequence>seq</sequence>\n\
             <size>{}</size>\n\
             <checksum type=\"sha256\">{}</checksum>\n\
             </delta>\n\
             </newpackage>\n",
            name, old_release, filename, size, checksum
        ));
    }
    xml.push_str("</prestodelta>\n");
    xml
}

/// (role, href, checksum)
fn repomd_xml(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<repomd>\n<revision>1</revision>\n");
    for (role, href, checksum) in entries {
        xml.push_str(&format!(
            "<data type=\"{}\">\n\
             <checksum type=\"sha256\">{}</checksum>\n\
             <location href=\"{}\"/>\n\
             <timestamp>1700000000</timestamp>\n\
             <size>1</size>\n\
             </data>\n",
            role, checksum, href
        ));
    }
    xml.push_str("</repomd>\n");
    xml
}

fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Lay out `root/repodata/{repomd.xml, primary.xml.gz, prestodelta.xml.gz}`
fn write_repo(root: &Path, packages: &[Pkg<'_>], deltas: Option<&[Drpm<'_>]>) {
    let repodata = root.join("repodata");
    fs::create_dir_all(&repodata).unwrap();

    let primary = gzip(&primary_xml(packages));
    fs::write(repodata.join("primary.xml.gz"), &primary).unwrap();
    let mut entries = vec![(
        "primary".to_string(),
        "repodata/primary.xml.gz".to_string(),
        sha256_hex(&primary),
    )];

    if let Some(deltas) = deltas {
        let presto = gzip(&prestodelta_xml(deltas));
        fs::write(repodata.join("prestodelta.xml.gz"), &presto).unwrap();
        entries.push((
            "prestodelta".to_string(),
            "repodata/prestodelta.xml.gz".to_string(),
            sha256_hex(&presto),
        ));
    }

    let entries: Vec<(&str, &str, &str)> = entries
        .iter()
        .map(|(r, h, c)| (r.as_str(), h.as_str(), c.as_str()))
        .collect();
    fs::write(repodata.join("repomd.xml"), repomd_xml(&entries)).unwrap();
}

fn load(input: &Path) -> repodiff::Result<Vec<Record>> {
    MetadataLoader::default().load(&Input::parse(input.to_str().unwrap()))
}

fn rendered(records: Vec<&Record>) -> Vec<String> {
    use repodiff::Matchable;
    records.into_iter().map(|r| r.render("")).collect()
}

#[test]
fn test_compare_primary_files() {
    let dir = tempfile::tempdir().unwrap();
    let new_path = dir.path().join("NewPrimary.xml.gz");
    let old_path = dir.path().join("OldPrimary.xml");

    fs::write(
        &new_path,
        gzip(&primary_xml(&[
            ("aaa", "100", "Packages/a.rpm"),
            ("bbb", "200", "Packages/b.rpm"),
        ])),
    )
    .unwrap();
    fs::write(
        &old_path,
        primary_xml(&[("bbb", "200", "Packages/b.rpm"), ("ccc", "300", "Packages/c.rpm")]),
    )
    .unwrap();

    let new = load(&new_path).unwrap();
    let old = load(&old_path).unwrap();
    let comparison = Comparison::new(&new, &old);

    assert_eq!(
        rendered(comparison.partition(Partition::Added)),
        vec!["{sha256}aaa 100 Packages/a.rpm"]
    );
    assert_eq!(
        rendered(comparison.partition(Partition::Common)),
        vec!["{sha256}bbb 200 Packages/b.rpm"]
    );
    assert_eq!(
        rendered(comparison.partition(Partition::Removed)),
        vec!["{sha256}ccc 300 Packages/c.rpm"]
    );
    assert_eq!(comparison.total_size(Partition::Added), 100);
    assert_eq!(comparison.total_size(Partition::Removed), 300);
}

#[test]
fn test_report_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let new_path = dir.path().join("new.xml");
    let old_path = dir.path().join("old.xml");
    fs::write(&new_path, primary_xml(&[("aaa", "10", "/a")])).unwrap();
    fs::write(&old_path, primary_xml(&[("zzz", "5", "/z")])).unwrap();

    let new = load(&new_path).unwrap();
    let old = load(&old_path).unwrap();
    let comparison = Comparison::new(&new, &old);

    let options = ReportOptions {
        show_added: true,
        show_removed: true,
        repo_path: "mirror/fedora".to_string(),
        new_label: "new.xml".to_string(),
        old_label: "old.xml".to_string(),
        ..Default::default()
    };

    let out_path = dir.path().join("report.txt");
    let mut file = fs::File::create(&out_path).unwrap();
    write_report(&mut file, &comparison, &options).unwrap();
    drop(file);

    let report = fs::read_to_string(&out_path).unwrap();
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("# repodiff matchup, version: "));
    assert_eq!(lines[1], "# new: new.xml old: old.xml");
    assert_eq!(lines[2], "# added: 1 records, 10 B (10 bytes)");
    assert_eq!(lines[3], "{sha256}aaa 10 mirror/fedora/a");
    assert_eq!(lines[4], "# removed: 1 records, 5 B (5 bytes)");
    assert_eq!(lines[5], "{sha256}zzz 5 mirror/fedora/z");
}

#[test]
fn test_repository_directories_with_deltas() {
    let dir = tempfile::tempdir().unwrap();
    let new_root = dir.path().join("new");
    let old_root = dir.path().join("old");

    write_repo(
        &new_root,
        &[("aaa", "100", "Packages/a.rpm"), ("bbb", "200", "Packages/b.rpm")],
        Some(&[
            ("bash", "1", "drpms/bash-new-hash.drpm", "50", "d1"),
            ("zsh", "1", "drpms/zsh.drpm", "60", "d2"),
        ]),
    );
    write_repo(
        &old_root,
        &[("bbb", "200", "Packages/b.rpm")],
        Some(&[("bash", "1", "drpms/bash-old-hash.drpm", "50", "d1")]),
    );

    let new = load(&new_root).unwrap();
    let old = load(&old_root).unwrap();
    assert_eq!(new.len(), 4);
    assert_eq!(old.len(), 2);

    let comparison = Comparison::new(&new, &old);

    // The bash delta only changed its filename, so it is common
    assert_eq!(
        rendered(comparison.partition(Partition::Common)),
        vec![
            "{sha256}bbb 200 Packages/b.rpm",
            "{sha256}d1 50 drpms/bash-new-hash.drpm",
        ]
    );
    assert_eq!(
        rendered(comparison.partition(Partition::Added)),
        vec!["{sha256}aaa 100 Packages/a.rpm", "{sha256}d2 60 drpms/zsh.drpm"]
    );
    assert!(comparison.partition(Partition::Removed).is_empty());
    assert_eq!(total_size(comparison.partition(Partition::Added)), 160);
}

#[test]
fn test_manifest_inside_given_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path(), &[("aaa", "1", "Packages/a.rpm")], None);

    // Pointing at repodata/ itself resolves hrefs against its parent
    let records = load(&dir.path().join("repodata")).unwrap();
    assert_eq!(records.len(), 1);

    // So does pointing at the manifest file
    let records = load(&dir.path().join("repodata").join("repomd.xml")).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn test_manifest_without_prestodelta() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(dir.path(), &[("aaa", "1", "Packages/a.rpm")], None);

    let records = load(dir.path()).unwrap();
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], Record::Package(_)));
}

#[test]
fn test_manifest_without_primary_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("repomd.xml"),
        repomd_xml(&[("filelists", "repodata/filelists.xml.gz", "00")]),
    )
    .unwrap();

    let records = load(dir.path()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_undecodable_manifest_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("repomd.xml"), "<repomd><data type=\"primary\">").unwrap();

    let records = load(dir.path()).unwrap();
    assert!(records.is_empty());
}

#[test]
fn test_missing_manifest_document_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("repomd.xml"),
        repomd_xml(&[("primary", "repodata/missing-primary.xml.gz", "00")]),
    )
    .unwrap();

    let result = load(dir.path());
    assert!(matches!(result, Err(Error::IoError(_))));
}

#[test]
fn test_count_mismatch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("primary.xml.gz");
    let xml = primary_xml(&[("aaa", "1", "a.rpm")]).replace("packages=\"1\"", "packages=\"2\"");
    fs::write(&path, gzip(&xml)).unwrap();

    let result = load(&path);
    assert!(matches!(
        result,
        Err(Error::CountMismatch {
            declared: 2,
            parsed: 1
        })
    ));
}

#[test]
fn test_empty_primary_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("primary.xml");
    fs::write(&path, primary_xml(&[])).unwrap();

    assert!(matches!(load(&path), Err(Error::EmptyDocument(_))));
}

#[test]
fn test_verified_metadata() {
    let dir = tempfile::tempdir().unwrap();
    write_repo(
        dir.path(),
        &[("aaa", "1", "Packages/a.rpm")],
        Some(&[("bash", "1", "drpms/bash.drpm", "50", "d1")]),
    );

    let loader = MetadataLoader::new(LoaderConfig {
        verify_checksums: true,
        ..Default::default()
    });
    let records = loader
        .load(&Input::Directory(dir.path().to_path_buf()))
        .unwrap();
    assert_eq!(records.len(), 2);

    // Corrupt the delta document: only primary survives verification
    let presto = dir.path().join("repodata").join("prestodelta.xml.gz");
    fs::write(&presto, gzip(&prestodelta_xml(&[("x", "1", "x.drpm", "1", "ff")]))).unwrap();

    let records = loader
        .load(&Input::Directory(dir.path().to_path_buf()))
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], Record::Package(_)));
}

#[test]
fn test_unreachable_remote_is_empty() {
    let loader = MetadataLoader::new(LoaderConfig {
        timeout: Duration::from_secs(1),
        verify_checksums: false,
    });
    let records = loader
        .load(&Input::Remote("http://127.0.0.1:9/fedora/".to_string()))
        .unwrap();
    assert!(records.is_empty());
}

/// Serve `requests` connections: `/repo/repodata/repomd.xml` and
/// `/repo/repodata/prestodelta.xml` exist, everything else is a 404
fn serve_partial_repo(requests: usize) -> std::net::SocketAddr {
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let manifest = repomd_xml(&[
        ("primary", "repodata/primary.xml", "00"),
        ("prestodelta", "repodata/prestodelta.xml", "00"),
    ]);
    let presto = prestodelta_xml(&[("bash", "1", "drpms/bash.drpm", "50", "d1")]);

    std::thread::spawn(move || {
        for stream in listener.incoming().take(requests) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap() == 0 || header.trim().is_empty() {
                    break;
                }
            }

            let path = request_line.split_whitespace().nth(1).unwrap_or("");
            let (status, body) = match path {
                "/repo/repodata/repomd.xml" => ("200 OK", manifest.as_str()),
                "/repo/repodata/prestodelta.xml" => ("200 OK", presto.as_str()),
                _ => ("404 Not Found", ""),
            };
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
        }
    });

    addr
}

#[test]
fn test_remote_document_failure_is_degraded() {
    let addr = serve_partial_repo(3);

    let loader = MetadataLoader::new(LoaderConfig {
        timeout: Duration::from_secs(5),
        verify_checksums: false,
    });
    let records = loader
        .load(&Input::Remote(format!("http://{}/repo", addr)))
        .unwrap();

    // primary.xml is a 404 and contributes nothing; the deltas still load
    assert_eq!(records.len(), 1);
    assert!(matches!(records[0], Record::Delta(_)));
    assert_eq!(rendered(records.iter().collect()), vec!["{sha256}d1 50 drpms/bash.drpm"]);
}
