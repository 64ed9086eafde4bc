//! Output writers: `sequences.fasta`, `distribution`, `seq-info`, and
//! per-sample feature vectors. Each writer takes any `impl Write` so
//! callers can target a file or, in tests, an in-memory buffer.

use crate::errors::Result;
use crate::unitig::SequenceRecord;
use std::io::Write;

/// One header line per unitig, `>{id} length={L} sum_weight={S}
/// min_weight={m} max_weight={M}`, followed by the DNA string. `{id}` is
/// the record's position in `records` — emission order across unitigs is
/// otherwise unspecified (§5).
pub fn write_fasta(mut w: impl Write, records: &[SequenceRecord]) -> Result<()> {
    for (id, record) in records.iter().enumerate() {
        writeln!(
            w,
            ">{id} length={} sum_weight={} min_weight={} max_weight={}",
            record.sequence.len(),
            record.sum,
            record.min,
            record.max
        )?;
        writeln!(w, "{}", record.sequence)?;
    }
    Ok(())
}

/// One line per frequency, `"{i} {count}"`, for `i` in `1..histogram.len()`.
pub fn write_distribution(mut w: impl Write, histogram: &[u64]) -> Result<()> {
    for (i, &count) in histogram.iter().enumerate().skip(1) {
        writeln!(w, "{i} {count}")?;
    }
    Ok(())
}

/// One line per unitig, `"{length} {weight}"`.
pub fn write_seq_info(mut w: impl Write, records: &[SequenceRecord]) -> Result<()> {
    for record in records {
        writeln!(w, "{} {}", record.sequence.len(), record.weight)?;
    }
    Ok(())
}

/// One decimal per line; component index order matches the input
/// components file exactly.
pub fn write_vector(mut w: impl Write, vector: &[f64]) -> Result<()> {
    for v in vector {
        writeln!(w, "{v}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(sequence: &str, sum: i64, min: i64, max: i64, weight: f64) -> SequenceRecord {
        SequenceRecord {
            sequence: sequence.to_string(),
            sum,
            min,
            max,
            weight,
        }
    }

    #[test]
    fn fasta_header_matches_documented_format() {
        let records = vec![record("ACGTAC", 10, 1, 4, 2.5)];
        let mut buf = Vec::new();
        write_fasta(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            ">0 length=6 sum_weight=10 min_weight=1 max_weight=4\nACGTAC\n"
        );
    }

    #[test]
    fn fasta_ids_follow_slice_position() {
        let records = vec![
            record("ACG", 1, 1, 1, 1.0),
            record("TTT", 2, 2, 2, 2.0),
        ];
        let mut buf = Vec::new();
        write_fasta(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(">0 "));
        assert!(text.contains("\n>1 "));
    }

    #[test]
    fn distribution_skips_bucket_zero() {
        let histogram = vec![999u64, 5, 3, 1];
        let mut buf = Vec::new();
        write_distribution(&mut buf, &histogram).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "1 5\n2 3\n3 1\n");
    }

    #[test]
    fn seq_info_pairs_length_and_weight() {
        let records = vec![record("ACGTAC", 12, 2, 4, 3.0)];
        let mut buf = Vec::new();
        write_seq_info(&mut buf, &records).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "6 3\n");
    }

    #[test]
    fn vector_is_one_decimal_per_line() {
        let mut buf = Vec::new();
        write_vector(&mut buf, &[0.5, 0.25, 1.0]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "0.5\n0.25\n1\n");
    }
}
