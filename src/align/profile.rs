//! 组成谱与熵
//!
//! Composition profiles and entropies, per column or per sequence, over the
//! moltype's canonical alphabet (the observed symbols for bytes).

use std::collections::BTreeSet;

use ndarray::{Array2, Axis};
use serde::Serialize;

use super::Alignment;
use crate::util::moltype::MolType;

/// Symbol counts, one row per sequence or per column, one column per symbol
/// of `char_order`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub char_order: Vec<char>,
    pub counts: Array2<usize>,
}

impl Profile {
    /// Counts scaled to sum to one per row. All-zero rows stay zero.
    pub fn probs(&self) -> Array2<f64> {
        let mut out = self.counts.mapv(|c| c as f64);
        for mut row in out.axis_iter_mut(Axis(0)) {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            }
        }
        out
    }

    /// Shannon entropy of each row, in bits.
    pub fn row_entropies(&self) -> Vec<f64> {
        self.counts
            .axis_iter(Axis(0))
            .map(|row| entropy(row.iter().copied()))
            .collect()
    }
}

/// Entropy in bits of a count vector; zero when nothing was counted.
pub(crate) fn entropy(counts: impl Iterator<Item = usize> + Clone) -> f64 {
    let total: usize = counts.clone().sum();
    if total == 0 {
        return 0.0;
    }
    counts
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / total as f64;
            -p * p.log2()
        })
        .sum()
}

impl Alignment {
    /// Symbols profiles are counted over: the canonical alphabet, or for
    /// `Bytes` the sorted non-gap symbols present.
    fn profile_alphabet(&self) -> Vec<u8> {
        match self.moltype {
            MolType::Bytes => {
                let seen: BTreeSet<u8> = self
                    .grid()
                    .iter()
                    .copied()
                    .filter(|&b| !self.moltype.is_gap_or_missing(b))
                    .collect();
                seen.into_iter().collect()
            }
            mt => mt.alphabet().to_vec(),
        }
    }

    /// Counts per row when `per_seq`, otherwise per column.
    fn profile(&self, per_seq: bool) -> Profile {
        let alphabet = self.profile_alphabet();
        let mut slot = [usize::MAX; 256];
        for (i, &sym) in alphabet.iter().enumerate() {
            slot[self.moltype.encode_lossy(sym) as usize] = i;
        }
        let order = self.row_order();
        let grid = self.grid();
        let (n, lanes) = if per_seq { (order.len(), Axis(1)) } else { (self.num_columns(), Axis(0)) };
        let mut counts = Array2::<usize>::zeros((n, alphabet.len()));
        for (i, mut out) in counts.axis_iter_mut(Axis(0)).enumerate() {
            let lane = grid.index_axis(lanes, if per_seq { order[i] } else { i });
            for &code in lane {
                let s = slot[code as usize];
                if s != usize::MAX {
                    out[s] += 1;
                }
            }
        }
        Profile { char_order: alphabet.into_iter().map(char::from).collect(), counts }
    }

    /// Symbol counts per sequence, in name order.
    pub fn get_seq_freqs(&self) -> Profile {
        self.profile(true)
    }

    /// Symbol counts per column.
    pub fn get_pos_freqs(&self) -> Profile {
        self.profile(false)
    }

    pub fn get_seq_entropy(&self) -> Vec<f64> {
        self.get_seq_freqs().row_entropies()
    }

    pub fn get_pos_entropy(&self) -> Vec<f64> {
        self.get_pos_freqs().row_entropies()
    }

    /// Entropy of each column over every symbol it holds, or only over
    /// `alphabet` when given.
    pub fn uncertainties(&self, alphabet: Option<&[u8]>) -> Vec<f64> {
        self.column_freqs()
            .into_iter()
            .map(|counts| {
                let kept = counts
                    .iter()
                    .filter(|(sym, _)| alphabet.map_or(true, |a| a.contains(&(**sym as u8))))
                    .map(|(_, &n)| n);
                entropy(kept)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seqs::{SeqsBuilder, Sequence};
    use ndarray::array;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    fn dna_alignments() -> Vec<Alignment> {
        let rows = || {
            vec![Sequence::named("s1", "TCAG"), Sequence::named("s2", "CCAC"), Sequence::named("s3", "AGAT")]
        };
        let b = SeqsBuilder::new().moltype(MolType::Dna);
        vec![b.alignment(rows()).unwrap(), b.array_alignment(rows()).unwrap()]
    }

    #[test]
    fn profiles_over_canonical_alphabet() {
        for aln in dna_alignments() {
            let seq = aln.get_seq_freqs();
            assert_eq!(seq.char_order, ['T', 'C', 'A', 'G']);
            assert_eq!(seq.counts, array![[1, 1, 1, 1], [0, 3, 1, 0], [1, 0, 2, 1]]);
            let pos = aln.get_pos_freqs();
            assert_eq!(pos.counts, array![[1, 1, 1, 0], [0, 2, 0, 1], [0, 0, 3, 0], [1, 1, 0, 1]]);
        }
    }

    #[test]
    fn bytes_profiles_use_observed_symbols() {
        let aln = Alignment::new_dense(vec!["abaa", "abbb"]).unwrap();
        let seq = aln.get_seq_freqs();
        assert_eq!(seq.char_order, ['a', 'b']);
        assert_eq!(seq.counts, array![[3, 1], [1, 3]]);
        assert_eq!(aln.get_pos_freqs().counts, array![[2, 0], [0, 2], [1, 1], [1, 1]]);
        assert!(close(&aln.get_pos_entropy(), &[0.0, 0.0, 1.0, 1.0]));

        let aln = Alignment::new(vec!["abab", "bbbb", "abbb"]).unwrap();
        assert!(close(&aln.get_seq_entropy(), &[1.0, 0.0, 0.811_278_124_459_132_8]));
    }

    #[test]
    fn probabilities_per_row() {
        let alns = dna_alignments();
        let probs = alns[0].get_seq_freqs().probs();
        assert_eq!(probs.row(1).to_vec(), [0.0, 0.75, 0.25, 0.0]);
    }

    #[test]
    fn column_uncertainty() {
        let aln = Alignment::new(vec!["ABC", "AXC"]).unwrap();
        assert!(close(&aln.uncertainties(None), &[0.0, 1.0, 0.0]));
        let single = Alignment::new(vec!["ABC"]).unwrap();
        assert!(close(&single.uncertainties(None), &[0.0, 0.0, 0.0]));
        let aln = Alignment::new_dense(vec!["ABC", "DEF", "GHI", "JKL", "333"]).unwrap();
        assert!(close(&aln.uncertainties(Some(b"ABCDEFGHIJKLMNOP")), &[2.0, 2.0, 2.0]));
    }
}
