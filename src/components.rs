//! Component I/O: the binary list of connected components consumed by the
//! feature-vector builder.
//!
//! Format: each component is a 4-byte little-endian count `n` followed by
//! `n` 8-byte little-endian canonical k-mers; concatenated components form
//! the file. Discovery of the components themselves is an external
//! collaborator's job (§1) — this module only round-trips the format.

use crate::errors::Result;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Write `components` to `w` in the documented binary layout.
pub fn write_components(mut w: impl Write, components: &[Vec<u64>]) -> Result<()> {
    for component in components {
        w.write_all(&(component.len() as u32).to_le_bytes())?;
        for &kmer in component {
            w.write_all(&kmer.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Read a binary component list from `r`. An empty stream parses to an
/// empty `Vec`; whether zero components is acceptable is a decision for
/// the caller (the feature-vector driver rejects it with `EmptyResult`).
pub fn read_components(mut r: impl Read) -> Result<Vec<Vec<u64>>> {
    let mut out = Vec::new();
    loop {
        let mut count_buf = [0u8; 4];
        match r.read_exact(&mut count_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        let n = u32::from_le_bytes(count_buf) as usize;
        let mut component = Vec::with_capacity(n);
        for _ in 0..n {
            let mut kmer_buf = [0u8; 8];
            r.read_exact(&mut kmer_buf)?;
            component.push(u64::from_le_bytes(kmer_buf));
        }
        out.push(component);
    }
    Ok(out)
}

/// Convenience wrapper writing to a file path.
pub fn write_components_file(path: &Path, components: &[Vec<u64>]) -> Result<()> {
    let w = BufWriter::new(File::create(path)?);
    write_components(w, components)
}

/// Convenience wrapper reading from a file path.
pub fn read_components_file(path: &Path) -> Result<Vec<Vec<u64>>> {
    let r = BufReader::new(File::open(path)?);
    read_components(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_empty_list() {
        let mut buf = Vec::new();
        write_components(&mut buf, &[]).unwrap();
        assert!(buf.is_empty());
        let back = read_components(Cursor::new(buf)).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn round_trips_several_components() {
        let components = vec![
            vec![1u64, 2, 3],
            vec![],
            vec![u64::MAX, 0, 42, 7],
        ];
        let mut buf = Vec::new();
        write_components(&mut buf, &components).unwrap();
        let back = read_components(Cursor::new(buf)).unwrap();
        assert_eq!(back, components);
    }

    #[test]
    fn byte_layout_matches_spec() {
        let components = vec![vec![1u64, 2]];
        let mut buf = Vec::new();
        write_components(&mut buf, &components).unwrap();
        assert_eq!(buf.len(), 4 + 2 * 8);
        assert_eq!(&buf[0..4], &2u32.to_le_bytes());
        assert_eq!(&buf[4..12], &1u64.to_le_bytes());
        assert_eq!(&buf[12..20], &2u64.to_le_bytes());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("components.bin");
        let components = vec![vec![10u64, 20], vec![30u64]];
        write_components_file(&path, &components).unwrap();
        let back = read_components_file(&path).unwrap();
        assert_eq!(back, components);
    }
}
