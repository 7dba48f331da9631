//! Compression-format auto-detection.
//!
//! Magic bytes are checked first so a misnamed file still decodes; the
//! file extension is only a fallback for streams too short to carry a
//! recognizable signature. Anything unrecognized is read as plain bytes.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Uncompressed byte stream
    Plain,
    /// gzip or bgzf (both are gzip members back to back)
    Gzip,
    /// bzip2
    Bzip2,
    /// xz / lzma2
    Xz,
    /// zip archive (one entry is read)
    Zip,
    /// zstandard
    Zstd,
}

impl Format {
    /// Short name for log messages.
    pub fn name(self) -> &'static str {
        match self {
            Format::Plain => "plain",
            Format::Gzip => "gzip",
            Format::Bzip2 => "bzip2",
            Format::Xz => "xz",
            Format::Zip => "zip",
            Format::Zstd => "zstd",
        }
    }
}

/// Probe `path` for its compression format.
pub fn detect_format(path: &Path) -> io::Result<Format> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 6];
    let mut filled = 0;
    while filled < magic.len() {
        match file.read(&mut magic[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(from_magic(&magic[..filled]).unwrap_or_else(|| from_extension(path)))
}

fn from_magic(bytes: &[u8]) -> Option<Format> {
    if bytes.starts_with(&[0x28, 0xB5, 0x2F, 0xFD]) {
        return Some(Format::Zstd);
    }
    if bytes.starts_with(&[0x1F, 0x8B]) {
        return Some(Format::Gzip);
    }
    if bytes.starts_with(b"BZh") {
        return Some(Format::Bzip2);
    }
    if bytes.starts_with(&[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00]) {
        return Some(Format::Xz);
    }
    if bytes.len() >= 4
        && bytes[0] == b'P'
        && bytes[1] == b'K'
        && matches!(bytes[2], 0x03 | 0x05 | 0x07)
        && matches!(bytes[3], 0x04 | 0x06 | 0x08)
    {
        return Some(Format::Zip);
    }
    None
}

fn from_extension(path: &Path) -> Format {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("zst") => Format::Zstd,
        Some("gz") | Some("bgz") => Format::Gzip,
        Some("bz2") => Format::Bzip2,
        Some("xz") => Format::Xz,
        Some("zip") => Format::Zip,
        _ => Format::Plain,
    }
}
