//! 列操作：选取、过滤与一致序列
//!
//! Columns are read straight from the code grid; the symbols handed to
//! predicates follow the current name order.

use std::collections::BTreeMap;
use std::ops::Range;

use log::warn;
use ndarray::Axis;

use super::Alignment;
use crate::error::{AlnError, Result};
use crate::seqs::NamedSeqs;
use crate::util::moltype::MolType;

/// Default for [`Alignment::omit_gap_pos`]: drop only columns that are gaps
/// in every row.
pub const DEFAULT_ALLOWED_GAP_FRAC: f64 = 1.0 - 1e-6;

impl Alignment {
    /// Symbols of column `col`, one per row in name order.
    fn column(&self, col: usize, order: &[usize]) -> Vec<u8> {
        let lane = self.grid().index_axis(Axis(0), col);
        order.iter().map(|&r| self.moltype.decode(lane[r])).collect()
    }

    fn check_column(&self, col: usize) -> Result<()> {
        if col < self.num_columns() {
            Ok(())
        } else {
            Err(AlnError::IndexOutOfRange { index: col, len: self.num_columns() })
        }
    }

    /// Every column, left to right.
    pub fn positions(&self) -> impl Iterator<Item = Vec<u8>> + '_ {
        let order = self.row_order();
        (0..self.num_columns()).map(move |c| self.column(c, &order))
    }

    /// Columns in `pos_order` (repeats allowed), or all of them.
    pub fn iter_positions(&self, pos_order: Option<&[usize]>) -> Result<Vec<Vec<u8>>> {
        let order = self.row_order();
        match pos_order {
            None => Ok(self.positions().collect()),
            Some(cols) => cols
                .iter()
                .map(|&c| {
                    self.check_column(c)?;
                    Ok(self.column(c, &order))
                })
                .collect(),
        }
    }

    pub fn get_position_indices<F>(&self, pred: F, negate: bool) -> Vec<usize>
    where
        F: Fn(&[u8]) -> bool,
    {
        self.positions()
            .enumerate()
            .filter(|(_, col)| pred(col) != negate)
            .map(|(i, _)| i)
            .collect()
    }

    /// The given columns in the given order; with `negate`, every other
    /// column in alignment order.
    pub fn take_positions(&self, cols: &[usize], negate: bool) -> Result<Alignment> {
        for &c in cols {
            self.check_column(c)?;
        }
        if !negate {
            return Ok(self.with_columns(cols));
        }
        let mut keep = vec![true; self.num_columns()];
        for &c in cols {
            keep[c] = false;
        }
        let kept: Vec<usize> = (0..keep.len()).filter(|&c| keep[c]).collect();
        Ok(self.with_columns(&kept))
    }

    pub fn take_positions_if<F>(&self, pred: F, negate: bool) -> Alignment
    where
        F: Fn(&[u8]) -> bool,
    {
        self.with_columns(&self.get_position_indices(pred, negate))
    }

    /// Columns `range.start, range.start + step, …` below `range.end`. The
    /// end is clamped to the alignment width.
    pub fn slice(&self, range: Range<usize>, step: usize) -> Result<Alignment> {
        if step == 0 {
            return Err(AlnError::InvalidArgument("slice step must be positive".into()));
        }
        let end = range.end.min(self.num_columns());
        let cols: Vec<usize> = (range.start..end).step_by(step).collect();
        Ok(self.with_columns(&cols))
    }

    /// Start columns of the complete motif groups.
    fn motif_starts(&self, motif_length: usize) -> Result<Range<usize>> {
        if motif_length == 0 {
            return Err(AlnError::InvalidArgument("motif length must be positive".into()));
        }
        Ok(0..self.num_columns() / motif_length)
    }

    /// Keeps the motif groups for which `pred` holds. `pred` receives one
    /// motif per row, in name order. A trailing partial group is dropped, so
    /// the result width is always a multiple of `motif_length`.
    pub fn filtered<F>(&self, pred: F, motif_length: usize, log_warnings: bool) -> Result<Alignment>
    where
        F: Fn(&[Vec<u8>]) -> bool,
    {
        let groups = self.motif_starts(motif_length)?;
        let trailing = self.num_columns() % motif_length;
        if trailing > 0 && log_warnings {
            warn!("dropping {} trailing column(s) that do not fill a motif of {}", trailing, motif_length);
        }
        let order = self.row_order();
        let mut kept = Vec::new();
        for g in groups {
            let cols: Vec<usize> = (g * motif_length..(g + 1) * motif_length).collect();
            let symbols: Vec<Vec<u8>> = cols.iter().map(|&c| self.column(c, &order)).collect();
            let motifs: Vec<Vec<u8>> = (0..order.len())
                .map(|i| symbols.iter().map(|col| col[i]).collect())
                .collect();
            if pred(&motifs) {
                kept.extend(cols);
            }
        }
        Ok(self.with_columns(&kept))
    }

    /// Drops motif groups holding an ambiguity code, or a gap unless
    /// `allow_gap` is set.
    pub fn no_degenerates(&self, motif_length: usize, allow_gap: bool) -> Result<Alignment> {
        let mt = self.moltype;
        self.filtered(
            |motifs| {
                motifs
                    .iter()
                    .flatten()
                    .all(|&b| !mt.is_degenerate(b) && (allow_gap || !mt.is_gap_or_missing(b)))
            },
            motif_length,
            false,
        )
    }

    /// Drops motif groups in which more than `allowed_gap_frac` of the rows
    /// hold a gap. A row counts as gapped in a group when any of its symbols
    /// is a gap or missing. As with [`filtered`](Alignment::filtered), a
    /// trailing partial group is dropped. Returns `None` when no column
    /// survives.
    pub fn omit_gap_pos(&self, allowed_gap_frac: f64, motif_length: usize) -> Result<Option<Alignment>> {
        let mt = self.moltype;
        let kept = self.filtered(
            |motifs| {
                let gapped = motifs
                    .iter()
                    .filter(|m| m.iter().any(|&b| mt.is_gap_or_missing(b)))
                    .count();
                motifs.is_empty() || gapped as f64 / motifs.len() as f64 <= allowed_gap_frac
            },
            motif_length,
            false,
        )?;
        if kept.num_columns() == 0 {
            return Ok(None);
        }
        Ok(Some(kept))
    }

    /// Per column, the smallest ambiguity code covering every row.
    /// `moltype` overrides the alignment's own for ambiguity lookups.
    pub fn iupac_consensus(&self, moltype: Option<MolType>) -> Result<String> {
        let mt = moltype.unwrap_or(self.moltype);
        self.positions()
            .map(|col| mt.degenerate_from(&col).map(char::from))
            .collect()
    }

    /// Most frequent symbol per column; ties go to the lowest symbol code.
    pub fn majority_consensus(&self) -> String {
        let mt = self.moltype;
        self.grid()
            .axis_iter(Axis(0))
            .map(|lane| {
                let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
                for &code in lane {
                    *counts.entry(code).or_default() += 1;
                }
                let best = counts
                    .iter()
                    .fold(None, |best: Option<(u8, usize)>, (&code, &n)| match best {
                        Some((_, m)) if m >= n => best,
                        _ => Some((code, n)),
                    })
                    .map_or(mt.gap(), |(code, _)| mt.decode(code));
                char::from(best)
            })
            .collect()
    }

    /// Symbol counts per column, gaps included.
    pub fn column_freqs(&self) -> Vec<BTreeMap<char, usize>> {
        self.positions()
            .map(|col| {
                let mut counts = BTreeMap::new();
                for b in col {
                    *counts.entry(char::from(b)).or_default() += 1;
                }
                counts
            })
            .collect()
    }

    pub fn column_probs(&self) -> Vec<BTreeMap<char, f64>> {
        self.column_freqs()
            .into_iter()
            .map(|counts| {
                let total: usize = counts.values().sum();
                counts
                    .into_iter()
                    .map(|(sym, n)| (sym, n as f64 / total as f64))
                    .collect()
            })
            .collect()
    }

    /// Raw residue counts keyed by column, then symbol. Gaps and missing
    /// symbols are not counted.
    pub fn get_pssm(&self) -> BTreeMap<usize, BTreeMap<char, usize>> {
        let mt = self.moltype;
        self.column_freqs()
            .into_iter()
            .map(|counts| counts.into_iter().filter(|(sym, _)| !mt.is_gap_or_missing(*sym as u8)).collect())
            .enumerate()
            .collect()
    }

    /// Columns where not every row holds the same symbol.
    pub fn variable_positions(&self) -> Vec<usize> {
        self.grid()
            .axis_iter(Axis(0))
            .enumerate()
            .filter(|(_, lane)| lane.iter().any(|&c| Some(&c) != lane.first()))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::align::tests::dict;
    use crate::seqs::SeqsBuilder;

    fn both(pairs: &[(&str, &str)]) -> Vec<Alignment> {
        vec![Alignment::new(pairs.to_vec()).unwrap(), Alignment::new_dense(pairs.to_vec()).unwrap()]
    }

    fn both_typed(pairs: &[(&str, &str)], mt: MolType) -> Vec<Alignment> {
        let b = SeqsBuilder::new().moltype(mt);
        vec![b.alignment(pairs.to_vec()).unwrap(), b.array_alignment(pairs.to_vec()).unwrap()]
    }

    fn text(cols: Vec<Vec<u8>>) -> Vec<String> {
        cols.into_iter().map(|c| String::from_utf8(c).unwrap()).collect()
    }

    const GAPS: [(&str, &str); 3] = [("a", "AAAAAAA"), ("b", "A--A-AA"), ("c", "AA-----")];

    #[test]
    fn positions_follow_name_order() {
        for mut aln in both(&[("a", "AAAAAA"), ("b", "AAA---"), ("c", "AAAA--")]) {
            assert_eq!(text(aln.positions().collect()), ["AAA", "AAA", "AAA", "A-A", "A--", "A--"]);
            aln.set_names(&["c", "b", "a"]).unwrap();
            let cols = aln.iter_positions(Some(&[5, 1, 3])).unwrap();
            assert_eq!(text(cols), ["--A", "AAA", "A-A"]);
            assert!(aln.iter_positions(Some(&[6])).is_err());
        }
    }

    #[test]
    fn take_positions_in_given_order() {
        for aln in both(&GAPS) {
            let out = aln.take_positions(&[5, 4, 0], false).unwrap();
            assert_eq!(out.todict(), dict(&[("a", "AAA"), ("b", "A-A"), ("c", "--A")]));
            let out = aln.take_positions(&[5, 4, 0], true).unwrap();
            assert_eq!(out.todict(), dict(&[("a", "AAAA"), ("b", "--AA"), ("c", "A---")]));
            assert_eq!(
                aln.take_positions(&[9], false).unwrap_err(),
                AlnError::IndexOutOfRange { index: 9, len: 7 }
            );
        }
    }

    #[test]
    fn position_predicates() {
        for aln in both(&GAPS) {
            let gap_1st = |c: &[u8]| c[0] == b'-';
            let gap_2nd = |c: &[u8]| c[1] == b'-';
            let gap_3rd = |c: &[u8]| c[2] == b'-';
            assert!(aln.get_position_indices(gap_1st, false).is_empty());
            assert_eq!(aln.get_position_indices(gap_2nd, false), [1, 2, 4]);
            assert_eq!(aln.get_position_indices(gap_3rd, false), [2, 3, 4, 5, 6]);
            assert_eq!(aln.get_position_indices(gap_2nd, true), [0, 3, 5, 6]);

            let out = aln.take_positions_if(gap_1st, false);
            assert_eq!(out.num_columns(), 0);
            assert_eq!(out.num_seqs(), 3);
            let out = aln.take_positions_if(gap_2nd, false);
            assert_eq!(out.todict(), dict(&[("a", "AAA"), ("b", "---"), ("c", "A--")]));
            let out = aln.take_positions_if(gap_3rd, true);
            assert_eq!(out.todict(), dict(&[("a", "AA"), ("b", "A-"), ("c", "AA")]));
            assert_eq!(aln.take_positions_if(gap_1st, true), aln);
        }
    }

    #[test]
    fn slicing_with_step() {
        let data = [("seq1", "ACGACGACG"), ("seq2", "ACGACGACG"), ("seq3", "ACGACGACG")];
        for aln in both(&data) {
            let sub = aln.slice(2..5, 1).unwrap();
            assert_eq!(sub.is_dense(), aln.is_dense());
            assert_eq!(sub.get_seq("seq1").unwrap().as_bytes(), b"GAC");
            let third = aln.slice(2..usize::MAX, 3).unwrap();
            assert_eq!(third.get_seq("seq3").unwrap().as_bytes(), b"GGG");
            assert!(aln.slice(0..2, 0).is_err());
        }
    }

    #[test]
    fn filtered_by_motif() {
        let raw = [("a", "ACGACGACG"), ("b", "CCC---CCC"), ("c", "AAAA--AAA")];
        let clean = |motifs: &[Vec<u8>]| motifs.iter().flatten().all(|b| !b"-N?".contains(b));
        for aln in both(&raw) {
            let one = aln.filtered(clean, 1, false).unwrap();
            assert_eq!(one.todict(), dict(&[("a", "ACGACG"), ("b", "CCCCCC"), ("c", "AAAAAA")]));
            let two = aln.filtered(clean, 2, false).unwrap();
            assert_eq!(two.todict(), dict(&[("a", "ACAC"), ("b", "CCCC"), ("c", "AAAA")]));
            let three = aln.filtered(clean, 3, false).unwrap();
            assert_eq!(three.todict(), dict(&[("a", "ACGACG"), ("b", "CCCCCC"), ("c", "AAAAAA")]));
            assert!(aln.filtered(clean, 0, false).is_err());
        }
    }

    thread_local! {
        static WARNINGS: RefCell<Vec<String>> = RefCell::new(Vec::new());
    }

    /// Collects warnings per test thread.
    struct Capture;

    impl log::Log for Capture {
        fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
            metadata.level() <= log::Level::Warn
        }

        fn log(&self, record: &log::Record<'_>) {
            if self.enabled(record.metadata()) {
                WARNINGS.with(|w| w.borrow_mut().push(record.args().to_string()));
            }
        }

        fn flush(&self) {}
    }

    static CAPTURE: Capture = Capture;

    fn warnings_from(f: impl FnOnce()) -> Vec<String> {
        // another test may have installed it already
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(log::LevelFilter::Warn);
        WARNINGS.with(|w| w.borrow_mut().clear());
        f();
        WARNINGS.with(|w| w.borrow_mut().drain(..).collect())
    }

    #[test]
    fn filtered_warns_about_partial_motif() {
        let aln = Alignment::new(vec![("a", "ACGTA"), ("b", "ACGTA")]).unwrap();
        let keep_all = |_: &[Vec<u8>]| true;

        let seen = warnings_from(|| assert_eq!(aln.filtered(keep_all, 2, true).unwrap().num_columns(), 4));
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("1 trailing column"));

        assert!(warnings_from(|| drop(aln.filtered(keep_all, 2, false))).is_empty());
        assert!(warnings_from(|| drop(aln.filtered(keep_all, 5, true))).is_empty());
    }

    #[test]
    fn degenerate_columns_removed() {
        let data = [("s1", "AAACCCGGGTTT"), ("s2", "CCCGGGT-TAAA"), ("s3", "GGRYTTAAACCC")];
        for aln in both_typed(&data, MolType::Dna) {
            let out = aln.no_degenerates(1, false).unwrap();
            assert_eq!(out.todict(), dict(&[("s1", "AACCGGTTT"), ("s2", "CCGGTTAAA"), ("s3", "GGTTAACCC")]));
            let out = aln.no_degenerates(1, true).unwrap();
            assert_eq!(out.todict(), dict(&[("s1", "AACCGGGTTT"), ("s2", "CCGGT-TAAA"), ("s3", "GGTTAAACCC")]));
            let out = aln.no_degenerates(3, false).unwrap();
            assert_eq!(out.todict(), dict(&[("s1", "TTT"), ("s2", "AAA"), ("s3", "CCC")]));
            let out = aln.no_degenerates(3, true).unwrap();
            assert_eq!(out.todict(), dict(&[("s1", "GGGTTT"), ("s2", "T-TAAA"), ("s3", "AAACCC")]));
        }
    }

    #[test]
    fn gapped_columns_removed() {
        let end_gaps = [("a", "--A-BC-"), ("b", "-CB-A--"), ("c", "--D-EF-")];
        for aln in both(&end_gaps) {
            let get = |frac: f64| aln.omit_gap_pos(frac, 1).unwrap().unwrap().todict();
            assert_eq!(get(DEFAULT_ALLOWED_GAP_FRAC), dict(&[("a", "-ABC"), ("b", "CBA-"), ("c", "-DEF")]));
            assert_eq!(get(1.0), dict(&end_gaps));
            assert_eq!(get(0.0), dict(&[("a", "AB"), ("b", "BA"), ("c", "DE")]));
            assert_eq!(get(0.4), dict(&[("a", "ABC"), ("b", "BA-"), ("c", "DEF")]));
            assert_eq!(get(0.7), dict(&[("a", "-ABC"), ("b", "CBA-"), ("c", "-DEF")]));
        }
        for aln in both(&end_gaps) {
            // the trailing seventh column does not fill a pair
            let pairs = |frac: f64| aln.omit_gap_pos(frac, 2).unwrap().unwrap().todict();
            assert_eq!(pairs(0.4), dict(&[("a", "BC"), ("b", "A-"), ("c", "EF")]));
            assert_eq!(pairs(1.0), dict(&[("a", "--A-BC"), ("b", "-CB-A-"), ("c", "--D-EF")]));
            assert!(aln.omit_gap_pos(0.0, 2).unwrap().is_none());
            assert!(aln.omit_gap_pos(0.5, 0).is_err());
        }
        let mut six = end_gaps.to_vec();
        six.extend([("d", "-------"), ("e", "XYZXYZX"), ("f", "AB-CDEF")]);
        for aln in both(&six) {
            assert!(aln.omit_gap_pos(0.0, 1).unwrap().is_none());
        }
    }

    #[test]
    fn iupac_consensus_golden() {
        let rna = [
            "UCAGN-UCAGN-UCAGN-UCAGAGCAUN-",
            "UUCCAAGGNN--UUCCAAGGNNAGCAG--",
            "UUCCAAGGNN--UUCCAAGGNNAGCUA--",
            "UUUUCCCCAAAAGGGGNNNN--AGCUA--",
            "UUUUCCCCAAAAGGGGNNNN--AGCUA--",
        ];
        let b = SeqsBuilder::new().moltype(MolType::Rna);
        for aln in [b.alignment(rna.to_vec()).unwrap(), b.array_alignment(rna.to_vec()).unwrap()] {
            assert_eq!(aln.iupac_consensus(None).unwrap(), "UYHBN?BSNN??KBVSN?NN??AGCWD?-");
        }

        let dna: Vec<String> = rna.iter().map(|s| s.replace('U', "T")).collect();
        let aln = Alignment::new(dna).unwrap();
        assert_eq!(aln.iupac_consensus(Some(MolType::Dna)).unwrap(), "TYHBN?BSNN??KBVSN?NN??AGCWD?-");

        let protein = [
            "ACDEFGHIKLMNPQRSTUVWY-",
            "ACDEFGHIKLMNPQRSUUVWF-",
            "ACDEFGHIKLMNPERSKUVWC-",
            "ACNEFGHIKLMNPQRS-UVWP-",
        ];
        let aln = Alignment::new_dense(protein.to_vec()).unwrap();
        assert_eq!(aln.iupac_consensus(Some(MolType::Protein)).unwrap(), "ACBEFGHIKLMNPZRS?UVWX-");
    }

    #[test]
    fn majority_and_frequencies() {
        let b = SeqsBuilder::new().moltype(MolType::Rna);
        let aln = b.array_alignment(vec!["UCAG", "UCAG", "UCAG"]).unwrap();
        assert_eq!(aln.majority_consensus(), "UCAG");
        // tie between C and A: C has the lower code
        let tie = b.alignment(vec!["AC", "CC"]).unwrap();
        assert_eq!(tie.majority_consensus(), "CC");

        for aln in both(&[("w", "AAA"), ("x", "ACA"), ("y", "GGG"), ("z", "GUC")]) {
            let probs = aln.column_probs();
            assert_eq!(probs[0], BTreeMap::from([('A', 0.5), ('G', 0.5)]));
            assert_eq!(probs[1], BTreeMap::from([('A', 0.25), ('C', 0.25), ('G', 0.25), ('U', 0.25)]));
            assert_eq!(probs[2], BTreeMap::from([('A', 0.5), ('C', 0.25), ('G', 0.25)]));
            assert_eq!(aln.column_freqs()[0], BTreeMap::from([('A', 2), ('G', 2)]));
        }
    }

    #[test]
    fn pssm_counts_residues() {
        let rows = [
            ("a", "UCAGUCAGUU"),
            ("b", "UCCGUCAAUU"),
            ("c", "ACCAUCAGUC"),
            ("d", "UCAAUCGGUU"),
            ("e", "UUGGUUGGGU"),
            ("f", "CCGGGCGGCC"),
            ("g", "UCAACCGGAA"),
        ];
        for aln in both_typed(&rows, MolType::Rna) {
            let pssm = aln.get_pssm();
            assert_eq!(pssm.len(), 10);
            assert_eq!(pssm[&0], BTreeMap::from([('A', 1), ('C', 1), ('U', 5)]));
            assert_eq!(pssm[&1], BTreeMap::from([('C', 6), ('U', 1)]));
            assert_eq!(pssm[&2], BTreeMap::from([('A', 3), ('C', 2), ('G', 2)]));
            assert_eq!(pssm[&9], BTreeMap::from([('A', 1), ('C', 2), ('U', 4)]));
        }
        let gapped = Alignment::new(vec!["A-", "A?"]).unwrap();
        assert!(gapped.get_pssm()[&1].is_empty());
    }

    #[test]
    fn variable_columns() {
        let data = [("seq1", "ACGTACGT"), ("seq2", "ACCGACGT"), ("seq3", "ACGTACGT")];
        for aln in both_typed(&data, MolType::Dna) {
            assert_eq!(aln.variable_positions(), [2, 3]);
        }
    }
}
