//! Codec adapters: one byte-stream `Read` per supported format.
//!
//! These are deliberately thin wrappers over the codec crates; all the
//! interesting work happens downstream in the pipeline.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use anyhow::{Context, Result};
use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use xz2::read::XzDecoder;
use zip::ZipArchive;

use crate::detect::Format;
use crate::error::CliError;

/// Open `path` as a stream of decompressed bytes.
pub fn open_source(
    path: &Path,
    format: Format,
    zip_entry: Option<&str>,
) -> Result<Box<dyn Read + Send>> {
    if format == Format::Zip {
        return zip_source(path, zip_entry);
    }
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    Ok(match format {
        Format::Plain => Box::new(file),
        Format::Gzip => Box::new(MultiGzDecoder::new(file)),
        Format::Bzip2 => Box::new(MultiBzDecoder::new(file)),
        Format::Xz => Box::new(XzDecoder::new_multi_decoder(file)),
        Format::Zstd => Box::new(
            zstd::stream::read::Decoder::new(file)
                .with_context(|| format!("cannot open {} as zstd", path.display()))?,
        ),
        Format::Zip => unreachable!("handled above"),
    })
}

/// Stream one entry out of a zip archive: the named one, or the first.
///
/// The zip crate's entry reader borrows the archive, so the entry is
/// decoded on a helper thread and bridged through a bounded channel.
fn zip_source(path: &Path, entry: Option<&str>) -> Result<Box<dyn Read + Send>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut archive =
        ZipArchive::new(file).with_context(|| format!("cannot read {} as zip", path.display()))?;
    if archive.is_empty() {
        return Err(CliError::EmptyArchive(path.display().to_string()).into());
    }
    let index = match entry {
        Some(name) => archive.index_for_name(name).ok_or_else(|| CliError::EntryNotFound {
            archive: path.display().to_string(),
            entry: name.to_string(),
        })?,
        None => 0,
    };
    let (tx, rx) = mpsc::sync_channel::<io::Result<Vec<u8>>>(1);
    thread::spawn(move || decode_zip_entry(archive, index, tx));
    Ok(Box::new(ChannelReader::new(rx)))
}

fn decode_zip_entry(
    mut archive: ZipArchive<File>,
    index: usize,
    tx: SyncSender<io::Result<Vec<u8>>>,
) {
    let mut entry = match archive.by_index(index) {
        Ok(entry) => entry,
        Err(err) => {
            let _ = tx.send(Err(io::Error::new(io::ErrorKind::InvalidData, err)));
            return;
        }
    };
    let mut chunk = vec![0u8; 64 * 1024];
    loop {
        match entry.read(&mut chunk) {
            Ok(0) => return,
            Ok(n) => {
                if tx.send(Ok(chunk[..n].to_vec())).is_err() {
                    return; // consumer went away
                }
            }
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                let _ = tx.send(Err(err));
                return;
            }
        }
    }
}

/// `Read` adapter over a channel of decoded chunks.
struct ChannelReader {
    rx: Receiver<io::Result<Vec<u8>>>,
    current: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    fn new(rx: Receiver<io::Result<Vec<u8>>>) -> Self {
        Self {
            rx,
            current: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.current.len() {
            match self.rx.recv() {
                Ok(Ok(chunk)) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                Ok(Err(err)) => return Err(err),
                // Sender gone: the entry was fully decoded.
                Err(_) => return Ok(0),
            }
        }
        let n = (self.current.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
