//! Threshold selection: chooses the erroneous/real k-mer frequency
//! cutoff from a k-mer occurrence histogram.

use crate::sharded_map::ShardedMap;

/// Default histogram length. `h[0]` is reserved/unused; `h[stat_len - 1]`
/// saturates and accumulates all counts at or above that depth. Kept as
/// a plain constant (not hardwired into `build_histogram`) so tests can
/// use a small histogram.
pub const DEFAULT_STAT_LEN: usize = 1000;

/// Build the occurrence histogram `h[0..stat_len)` over a table's live
/// entries. Banned (negative) entries are skipped; they are not part of
/// the real k-mer population this histogram describes.
pub fn build_histogram(t: &ShardedMap, stat_len: usize) -> Vec<u64> {
    let mut h = vec![0u64; stat_len];
    for (_, v) in t.entries() {
        if v <= 0 {
            continue;
        }
        let idx = (v as usize).min(stat_len - 1);
        h[idx] += 1;
    }
    h
}

/// The three mutually exclusive ways of choosing the erroneous-k-mer
/// cutoff `tau`.
#[derive(Debug, Clone, Copy)]
pub enum ThresholdMode {
    /// `tau` supplied directly.
    Absolute(i64),
    /// Cut the bottom `p` percent of the k-mer population by cumulative
    /// occurrence count.
    BottomPercent(u8),
    /// Locate the valley between the error peak and the true-k-mer peak.
    Auto,
}

impl ThresholdMode {
    /// Select `tau` from a histogram built by [`build_histogram`].
    pub fn select(&self, histogram: &[u64]) -> i64 {
        match self {
            ThresholdMode::Absolute(tau) => *tau,
            ThresholdMode::BottomPercent(p) => select_bottom_percent(histogram, *p),
            ThresholdMode::Auto => select_auto(histogram),
        }
    }
}

fn select_bottom_percent(histogram: &[u64], p: u8) -> i64 {
    let total_kmers: u128 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as u128 * c as u128)
        .sum();
    let kmers_to_cut = total_kmers * p as u128 / 100;

    let mut accum: u128 = 0;
    let mut tau = 0i64;
    for i in 1..histogram.len() {
        accum += i as u128 * histogram[i] as u128;
        tau = i as i64;
        if accum >= kmers_to_cut {
            break;
        }
    }
    tau
}

fn select_auto(histogram: &[u64]) -> i64 {
    if histogram.len() < 3 {
        return 1;
    }
    let total_distinct: u128 = histogram[1..].iter().map(|&c| c as u128).sum();

    let mut tau: usize = 1;
    let mut cumulative: u128 = histogram[1] as u128;
    while tau + 1 < histogram.len() {
        let cur = histogram[tau] as u128 * tau as u128;
        let next = histogram[tau + 1] as u128 * (tau + 1) as u128;
        if cur <= next {
            break;
        }
        tau += 1;
        cumulative += histogram[tau] as u128;
        if cumulative * 2 > total_distinct {
            break;
        }
    }
    tau as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_percent_matches_worked_example() {
        // h[1]=100, h[2]=20, h[3]=5, h[4]=1; total = 159, p = 70 -> cut = 111
        let h = vec![0u64, 100, 20, 5, 1];
        assert_eq!(select_bottom_percent(&h, 70), 2);
    }

    #[test]
    fn absolute_passes_through() {
        assert_eq!(ThresholdMode::Absolute(7).select(&[0, 1, 2, 3]), 7);
    }

    #[test]
    fn auto_stops_at_first_non_increasing_ratio() {
        // Descending error tail: h[1] > h[2] on a rising product basis,
        // then it levels off.
        let h = vec![0u64, 1000, 100, 90, 85, 84];
        // h[1]*1=1000 > h[2]*2=200 -> advance to 2
        // h[2]*2=200 > h[3]*3=270? no (200 <= 270) -> stop at tau=2
        assert_eq!(select_auto(&h), 2);
    }

    #[test]
    fn auto_stops_once_half_of_distinct_kmers_are_covered() {
        let h = vec![0u64, 10, 10, 10, 10, 10, 10];
        // Every step has h[tau]*tau == h[tau+1]*(tau+1)*... not actually;
        // here products strictly increase (10*1 < 10*2 < ...), so the
        // ratio condition alone would walk to the end; the half-of-total
        // guard must cut it off first.
        let total: u64 = h[1..].iter().sum();
        let tau = select_auto(&h);
        let cumulative: u64 = h[1..=(tau as usize)].iter().sum();
        assert!(cumulative * 2 > total);
    }

    #[test]
    fn build_histogram_skips_banned_entries() {
        let t = ShardedMap::new(2, 4);
        let a = crate::kmer::encode(b"ACGT", 4).unwrap();
        let b = crate::kmer::encode(b"TTTT", 4).unwrap();
        t.insert(a, 3).unwrap();
        t.ban(b);
        let h = build_histogram(&t, 10);
        assert_eq!(h[3], 1);
        assert_eq!(h.iter().sum::<u64>(), 1);
    }
}
