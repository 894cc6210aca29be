// src/compression.rs

//! Transparent decompression of repository metadata documents
//!
//! Metadata files are published gzip-compressed, zstd-compressed,
//! xz-compressed or as plain XML. The format is detected by sniffing the
//! leading magic bytes rather than trusting the file extension, so a
//! `primary.xml.gz` that was stored decompressed still decodes.

use crate::error::{Error, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info};
use xz2::read::XzDecoder;

/// Buffer size for bulk XML parsing
pub const READ_BUFFER_SIZE: usize = 100_000;

const GZIP_MAGIC: [u8; 4] = [0x1f, 0x8b, 0x08, 0x00];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];
const XZ_MAGIC: [u8; 6] = [0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00];

/// A decoded byte stream over a metadata document
///
/// The underlying file or buffer is released when the value is dropped.
pub type Document = Box<dyn BufRead>;

/// Compression format detected from a document's magic number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    Xz,
    None,
}

impl Compression {
    /// Detect the compression format from the leading bytes of a document
    pub fn detect(magic: &[u8]) -> Self {
        if magic.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else if magic.starts_with(&ZSTD_MAGIC) {
            Compression::Zstd
        } else if magic.starts_with(&XZ_MAGIC) {
            Compression::Xz
        } else {
            Compression::None
        }
    }
}

/// Open a metadata document on disk, decompressing it if needed
pub fn open_document(path: &Path) -> Result<Document> {
    info!("Reading in file {}", path.display());

    let file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;

    decode_stream(file)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {}", path.display(), e)))
}

/// Wrap an in-memory document (e.g. a downloaded response body)
pub fn open_bytes(data: Vec<u8>) -> Result<Document> {
    Ok(decode_stream(Cursor::new(data))?)
}

/// Sniff the magic number of a seekable source and wrap it in the
/// matching decoder, rewound to the start
pub fn decode_stream<R>(mut source: R) -> std::io::Result<Document>
where
    R: Read + Seek + 'static,
{
    let mut magic = [0u8; 6];
    let n = read_prefix(&mut source, &mut magic)?;
    source.seek(SeekFrom::Start(0))?;

    let compression = Compression::detect(&magic[..n]);
    debug!("Detected compression: {:?}", compression);

    let document: Document = match compression {
        Compression::Gzip => Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            MultiGzDecoder::new(source),
        )),
        Compression::Zstd => Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            zstd::stream::read::Decoder::new(source)?,
        )),
        Compression::Xz => Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            XzDecoder::new(source),
        )),
        Compression::None => Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, source)),
    };

    Ok(document)
}

/// Read up to `buf.len()` bytes, stopping early only at end of input
fn read_prefix<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
