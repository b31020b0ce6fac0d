//! 列重抽样
//!
//! Whole motif groups are drawn, so every row keeps the same source columns
//! at each draw position.

use rand::seq::index;
use rand::Rng;

use super::Alignment;
use crate::error::{AlnError, Result};

impl Alignment {
    /// Draws `n` motif groups (all of them by default) with the thread RNG.
    pub fn sample(&self, n: Option<usize>, with_replacement: bool, motif_length: usize) -> Result<Alignment> {
        self.sample_with_rng(&mut rand::thread_rng(), n, with_replacement, motif_length)
    }

    /// Like [`sample`](Alignment::sample) with a caller-supplied RNG, for
    /// reproducible draws.
    pub fn sample_with_rng<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: Option<usize>,
        with_replacement: bool,
        motif_length: usize,
    ) -> Result<Alignment> {
        if motif_length == 0 {
            return Err(AlnError::InvalidArgument("motif length must be positive".into()));
        }
        let groups = self.num_columns() / motif_length;
        let n = n.unwrap_or(groups);
        let picks: Vec<usize> = if with_replacement {
            if groups == 0 && n > 0 {
                return Err(AlnError::InvalidArgument("cannot sample from an alignment with no columns".into()));
            }
            (0..n).map(|_| rng.gen_range(0..groups)).collect()
        } else {
            if n > groups {
                return Err(AlnError::InvalidArgument(format!(
                    "cannot draw {} of {} motifs without replacement",
                    n, groups
                )));
            }
            index::sample(rng, groups, n).into_vec()
        };
        let cols: Vec<usize> = picks
            .into_iter()
            .flat_map(|g| g * motif_length..(g + 1) * motif_length)
            .collect();
        Ok(self.with_columns(&cols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seqs::NamedSeqs;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rows(aln: &Alignment) -> Vec<String> {
        aln.iter_seqs().map(|s| s.to_string()).collect()
    }

    #[test]
    fn permutes_columns_by_default() {
        let aln = Alignment::new(vec![("seq1", "ABCDEFGHIJKLMNOP"), ("seq2", "ABCDEFGHIJKLMNOP")]).unwrap();
        let shuffled = aln.sample(None, false, 1).unwrap();
        assert_eq!(shuffled.num_columns(), 16);
        let mut sorted = shuffled.get_seq("seq1").unwrap().as_bytes().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, b"ABCDEFGHIJKLMNOP");

        let sub = Alignment::new_dense(vec![("seq1", "ABCDEFGHIJKLMNOP"), ("seq2", "ABCDEFGHIJKLMNOP")])
            .unwrap()
            .sample(Some(10), false, 1)
            .unwrap();
        let seqs = rows(&sub);
        assert_eq!(seqs[0].len(), 10);
        assert_eq!(seqs[0], seqs[1]);
        for c in seqs[0].chars() {
            assert_eq!(seqs[0].matches(c).count(), 1);
        }
        assert!(aln.sample(Some(17), false, 1).is_err());
    }

    #[test]
    fn with_replacement() {
        let aln = Alignment::new(vec![("seq1", "gatc"), ("seq2", "gatc")]).unwrap();
        let sample = aln.sample(Some(1000), true, 1).unwrap();
        assert_eq!(sample.num_columns(), 1000);
        let one = Alignment::new(vec![("seq1", "A"), ("seq2", "A")]).unwrap();
        assert_eq!(one.sample(None, true, 1).unwrap().num_columns(), 1);
    }

    #[test]
    fn motifs_stay_together() {
        let data = "AABBCCDDEEFFGGHHIIJJKKLLMMNNOOPP";
        let aln = Alignment::new(vec![("seq1", data), ("seq2", data)]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let sample = aln.sample_with_rng(&mut rng, Some(10), false, 2).unwrap();
        let seqs = rows(&sample);
        assert_eq!(seqs[0].len(), 20);
        assert_eq!(seqs[0], seqs[1]);
        for c in seqs[0].chars() {
            assert_eq!(seqs[0].matches(c).count(), 2);
        }
    }

    #[test]
    fn seeded_draws_repeat() {
        let aln = Alignment::new(vec!["ACGTACGTAC", "TTGGCCAATT"]).unwrap();
        let a = aln.sample_with_rng(&mut StdRng::seed_from_u64(1), Some(5), true, 1).unwrap();
        let b = aln.sample_with_rng(&mut StdRng::seed_from_u64(1), Some(5), true, 1).unwrap();
        assert_eq!(a.todict(), b.todict());
    }
}
