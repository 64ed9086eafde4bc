//! Read-source collaborator: adapters that turn a file on disk into a
//! stream of DNA byte strings. Quality scores, where present, are read
//! and discarded; read-quality filtering is an external collaborator's
//! job, not this crate's.

use crate::errors::{MetaDbgError, Result};
use needletail::parser::FastxReader;
use needletail::Sequence;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// A source of DNA reads. Blanket-implemented for anything that already
/// yields `io::Result<Vec<u8>>`, so `FastaReads`/`FastqReads`/`BinqReads`
/// only need to implement `Iterator`.
pub trait ReadSource: Iterator<Item = io::Result<Vec<u8>>> {}

impl<T: Iterator<Item = io::Result<Vec<u8>>>> ReadSource for T {}

/// FASTA records (gzip-transparent), via `needletail`.
pub struct FastaReads {
    inner: Box<dyn FastxReader>,
}

/// FASTQ records (gzip-transparent), via `needletail`. Quality strings
/// are parsed and discarded.
pub struct FastqReads {
    inner: Box<dyn FastxReader>,
}

fn next_seq(reader: &mut dyn FastxReader) -> Option<io::Result<Vec<u8>>> {
    reader.next().map(|rec| {
        rec.map(|r| r.seq().into_owned())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    })
}

impl Iterator for FastaReads {
    type Item = io::Result<Vec<u8>>;
    fn next(&mut self) -> Option<Self::Item> {
        next_seq(self.inner.as_mut())
    }
}

impl Iterator for FastqReads {
    type Item = io::Result<Vec<u8>>;
    fn next(&mut self) -> Option<Self::Item> {
        next_seq(self.inner.as_mut())
    }
}

/// The compact binary read format referenced in the external-interfaces
/// section: a sequence of `[u32 seq_len][seq_len bytes seq][seq_len bytes
/// qual]` records. Only `seq` is surfaced; `qual` is read and dropped.
pub struct BinqReads {
    inner: BufReader<File>,
}

impl BinqReads {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            inner: BufReader::new(File::open(path)?),
        })
    }
}

impl Iterator for BinqReads {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut len_buf = [0u8; 4];
        match self.inner.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return None,
            Err(e) => return Some(Err(e)),
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut seq = vec![0u8; len];
        if let Err(e) = self.inner.read_exact(&mut seq) {
            return Some(Err(e));
        }
        let mut qual = vec![0u8; len];
        if let Err(e) = self.inner.read_exact(&mut qual) {
            return Some(Err(e));
        }
        Some(Ok(seq))
    }
}

/// Dispatch on extension: `.fa`/`.fasta`(.gz) -> FASTA, `.fq`/`.fastq`(.gz)
/// -> FASTQ, `.binq` -> the binary format. Matches needletail's own
/// transparent gzip handling for the text formats.
pub fn open_reads(path: &Path) -> Result<Box<dyn ReadSource>> {
    let name = path.to_string_lossy().to_lowercase();
    let stem = name.strip_suffix(".gz").unwrap_or(&name);

    if stem.ends_with(".binq") {
        return Ok(Box::new(BinqReads::open(path)?));
    }
    if stem.ends_with(".fq") || stem.ends_with(".fastq") {
        let inner = needletail::parse_fastx_file(path)
            .map_err(|e| MetaDbgError::InvalidInput(format!("{}: {e}", path.display())))?;
        return Ok(Box::new(FastqReads { inner }));
    }
    if stem.ends_with(".fa") || stem.ends_with(".fasta") || stem.ends_with(".fna") {
        let inner = needletail::parse_fastx_file(path)
            .map_err(|e| MetaDbgError::InvalidInput(format!("{}: {e}", path.display())))?;
        return Ok(Box::new(FastaReads { inner }));
    }
    Err(MetaDbgError::InvalidInput(format!(
        "unrecognized reads file extension: {}",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn rejects_unknown_extension() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, ">irrelevant").unwrap();
        let path = f.path().with_extension("xyz");
        std::fs::copy(f.path(), &path).unwrap();
        assert!(open_reads(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn binq_round_trips_sequences() {
        let mut f = NamedTempFile::new().unwrap();
        for seq in [b"ACGTAC".as_slice(), b"TTTT".as_slice()] {
            f.write_all(&(seq.len() as u32).to_le_bytes()).unwrap();
            f.write_all(seq).unwrap();
            f.write_all(&vec![b'I'; seq.len()]).unwrap();
        }
        f.flush().unwrap();
        let path = f.path().with_extension("binq");
        std::fs::copy(f.path(), &path).unwrap();

        let mut reads = open_reads(&path).unwrap();
        assert_eq!(reads.next().unwrap().unwrap(), b"ACGTAC".to_vec());
        assert_eq!(reads.next().unwrap().unwrap(), b"TTTT".to_vec());
        assert!(reads.next().is_none());
        let _ = std::fs::remove_file(&path);
    }
}
