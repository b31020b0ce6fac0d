//! 多序列比对
//!
//! An [`Alignment`] is a set of named, equal-length rows. Storage is either a
//! dense grid of symbol codes or a list of [`Sequence`] objects that keep
//! per-row metadata; every operation runs against the code grid, so results
//! do not depend on which one backs the alignment.
//!
//! Operations are spread over submodules by concern:
//!
//! - [`positional`]：column selection, filtering, consensus
//! - [`profile`]：column and sequence composition
//! - [`sample`] / [`window`]：resampling and sliding windows
//! - [`reference`]：edits driven by one reference row
//! - [`gap_filter`]：the gap-pattern comparison used by `matching_ref`

pub mod gap_filter;
pub mod positional;
pub mod profile;
pub mod reference;
pub mod sample;
mod store;
pub mod window;

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use log::debug;
use ndarray::{concatenate, Array2, Axis};

use crate::error::{AlnError, Result};
use crate::seqs::ingest::{Input, Members, SeqsBuilder};
use crate::seqs::named::{check_reorder, select_names, splice_names};
use crate::seqs::{Info, NamedSeqs, Sequence, SequenceCollection};
use crate::util::moltype::MolType;

use store::{encode_rows, Store};

pub use gap_filter::GapFilter;
pub use positional::DEFAULT_ALLOWED_GAP_FRAC;
pub use profile::Profile;
pub use window::SlidingWindows;

#[derive(Debug, Clone)]
pub struct Alignment {
    names: Vec<String>,
    /// name -> row in `store`
    index: HashMap<String, usize>,
    moltype: MolType,
    store: Store,
    pub info: Info,
}

impl Alignment {
    /// Object-backed alignment with default options.
    pub fn new(input: impl Into<Input>) -> Result<Self> {
        SeqsBuilder::new().alignment(input)
    }

    /// Dense alignment with default options.
    pub fn new_dense(input: impl Into<Input>) -> Result<Self> {
        SeqsBuilder::new().array_alignment(input)
    }

    pub(crate) fn from_members(m: Members, dense: bool) -> Result<Self> {
        let num_columns = m.seqs.first().map_or(0, Sequence::len);
        for (name, seq) in m.names.iter().zip(&m.seqs) {
            if seq.len() != num_columns {
                return Err(AlnError::Ragged { name: name.clone(), len: seq.len(), expected: num_columns });
            }
        }
        debug!(
            "{} alignment of {} rows x {} columns ({})",
            if dense { "dense" } else { "object" },
            m.seqs.len(),
            num_columns,
            m.moltype
        );
        let store = if dense {
            Store::Dense(encode_rows(m.seqs.iter().map(Sequence::as_bytes), num_columns, m.moltype))
        } else {
            Store::from_rows(m.seqs)
        };
        Ok(Self::from_store(m.names, store, m.moltype, m.info))
    }

    /// `names` are in store row order.
    fn from_store(names: Vec<String>, store: Store, moltype: MolType, info: Info) -> Self {
        let index = names.iter().enumerate().map(|(i, n)| (n.clone(), i)).collect();
        Self { names, index, moltype, store, info }
    }

    /// Rows given as `(name, symbols)` in the order they should appear,
    /// normalized against `template`'s moltype. Storage kind, metadata and
    /// per-row info come from `template`.
    pub(crate) fn from_named_rows(rows: Vec<(String, Vec<u8>)>, template: &Alignment) -> Result<Self> {
        let rows = rows
            .into_iter()
            .map(|(name, data)| Ok((name, template.moltype.normalize(&data)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_valid_rows(rows, template))
    }

    /// As [`from_named_rows`](Alignment::from_named_rows), for rows already
    /// valid in `template`'s moltype.
    fn from_valid_rows(rows: Vec<(String, Vec<u8>)>, template: &Alignment) -> Self {
        let width = rows.first().map_or(0, |(_, r)| r.len());
        let names: Vec<String> = rows.iter().map(|(n, _)| n.clone()).collect();
        let store = if template.is_dense() {
            Store::Dense(encode_rows(rows.iter().map(|(_, r)| r.as_slice()), width, template.moltype))
        } else {
            let seqs = rows
                .into_iter()
                .map(|(name, data)| match template.stored_row(&name) {
                    Some(orig) => orig.with_data(data),
                    None => Sequence::named(name, data),
                })
                .collect();
            Store::from_rows(seqs)
        };
        Self::from_store(names, store, template.moltype, template.info.clone())
    }

    fn stored_row(&self, name: &str) -> Option<&Sequence> {
        match &self.store {
            Store::Seqs { rows, .. } => self.index.get(name).map(|&i| &rows[i]),
            Store::Dense(_) => None,
        }
    }

    pub fn is_dense(&self) -> bool {
        self.store.is_dense()
    }

    pub fn num_columns(&self) -> usize {
        self.store.num_columns()
    }

    /// Code grid, shape `(columns, rows)` in store row order.
    pub(crate) fn grid(&self) -> &Array2<u8> {
        self.store.grid(self.moltype)
    }

    /// Store rows in current name order.
    pub(crate) fn row_order(&self) -> Vec<usize> {
        self.names.iter().map(|n| self.index[n]).collect()
    }

    /// Names indexed by store row.
    fn names_by_row(&self) -> Vec<String> {
        let mut out = vec![String::new(); self.index.len()];
        for (name, &i) in &self.index {
            out[i] = name.clone();
        }
        out
    }

    /// Same rows, new columns.
    pub(crate) fn with_grid(&self, grid: Array2<u8>) -> Self {
        Self {
            names: self.names.clone(),
            index: self.index.clone(),
            moltype: self.moltype,
            store: self.store.with_grid(grid, self.moltype),
            info: self.info.clone(),
        }
    }

    /// Columns picked by index, in the given order.
    pub(crate) fn with_columns(&self, cols: &[usize]) -> Self {
        self.with_grid(self.grid().select(Axis(0), cols))
    }

    /// Reassigns iteration order. `order` must name every row exactly once.
    pub fn set_names<S: AsRef<str>>(&mut self, order: &[S]) -> Result<()> {
        self.names = check_reorder(&self.names, order)?;
        Ok(())
    }

    /// This alignment in the requested storage; borrowed when it already
    /// matches.
    pub fn to_type(&self, dense: bool) -> Cow<'_, Alignment> {
        if self.is_dense() == dense {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(self.converted())
        }
    }

    pub fn into_type(self, dense: bool) -> Alignment {
        if self.is_dense() == dense {
            self
        } else {
            self.converted()
        }
    }

    fn converted(&self) -> Alignment {
        let store = if self.is_dense() {
            self.store.to_seqs(&self.names_by_row(), self.moltype)
        } else {
            self.store.to_dense(self.moltype)
        };
        Self {
            names: self.names.clone(),
            index: self.index.clone(),
            moltype: self.moltype,
            store,
            info: self.info.clone(),
        }
    }

    /// Rows with gap and missing symbols removed. The rows are no longer
    /// aligned, so the result is a collection.
    pub fn degap(&self) -> SequenceCollection {
        let seqs = self.iter_seqs().map(|s| s.degap(self.moltype)).collect();
        SequenceCollection::from_parts(self.names.clone(), seqs, self.moltype, self.info.clone())
    }

    pub fn to_collection(&self) -> SequenceCollection {
        let seqs = self.iter_seqs().map(Cow::into_owned).collect();
        SequenceCollection::from_parts(self.names.clone(), seqs, self.moltype, self.info.clone())
    }

    /// Leading and trailing gaps recoded as `?`.
    pub fn with_modified_termini(&self) -> Alignment {
        let rows = self
            .names
            .iter()
            .zip(self.iter_seqs())
            .map(|(n, s)| (n.clone(), s.with_termini_unknown(self.moltype).into_bytes()))
            .collect();
        Alignment::from_valid_rows(rows, self)
    }

    /// Adds the rows of `other`, at the end or next to an anchor. Rows must
    /// match the column count.
    pub fn add_seqs<T: NamedSeqs>(&self, other: &T, before: Option<&str>, after: Option<&str>) -> Result<Self> {
        let width = self.num_columns();
        for (name, seq) in other.names().iter().zip(other.iter_seqs()) {
            if seq.len() != width {
                return Err(AlnError::Ragged { name: name.clone(), len: seq.len(), expected: width });
            }
        }
        let order = splice_names(&self.names, other.names(), before, after)?;
        let rows = order
            .into_iter()
            .map(|name| {
                let data = match self.seq(&name) {
                    Some(s) => s.as_bytes().to_vec(),
                    None => other.get_seq(&name)?.as_bytes().to_vec(),
                };
                Ok((name, data))
            })
            .collect::<Result<Vec<_>>>()?;
        Alignment::from_named_rows(rows, self)
    }

    /// Joins same-named rows end to end.
    pub fn concat(&self, other: &Alignment) -> Result<Self> {
        if other.num_seqs() != self.num_seqs() {
            let missing = self
                .names
                .iter()
                .find(|n| !other.index.contains_key(*n))
                .or_else(|| other.names.iter().find(|n| !self.index.contains_key(*n)));
            return Err(AlnError::UnknownName(missing.cloned().unwrap_or_default()));
        }
        // other's rows are re-encoded in this alignment's moltype
        let mut theirs = Array2::<u8>::zeros((other.num_columns(), self.store.num_rows()));
        for (mut lane, name) in theirs.axis_iter_mut(Axis(1)).zip(self.names_by_row()) {
            let seq = other.get_seq(&name)?;
            for (cell, code) in lane.iter_mut().zip(self.moltype.encode_seq(seq.as_bytes())?) {
                *cell = code;
            }
        }
        let joined = concatenate(Axis(0), &[self.grid().view(), theirs.view()])
            .map_err(|e| AlnError::LengthMismatch(e.to_string()))?;
        Ok(self.with_grid(joined))
    }

    /// Text view with the first row shown in full and other rows showing
    /// `.` where they match it. `interleave_len` wraps into blocks.
    pub fn to_pretty(&self, name_order: Option<&[&str]>, interleave_len: Option<usize>) -> Result<String> {
        let names: Vec<&str> = match name_order {
            Some(order) => order.to_vec(),
            None => self.names.iter().map(String::as_str).collect(),
        };
        let rows = self.seqs_in_order(&names)?;
        let width = names.iter().map(|n| n.len()).max().unwrap_or(0) + 4;
        let first: Vec<u8> = rows.first().map(|r| r.as_bytes().to_vec()).unwrap_or_default();
        let masked: Vec<Vec<u8>> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                if i == 0 {
                    return row.as_bytes().to_vec();
                }
                row.as_bytes().iter().zip(&first).map(|(&b, &f)| if b == f { b'.' } else { b }).collect()
            })
            .collect();

        let num_columns = self.num_columns();
        let block = match interleave_len {
            Some(0) => return Err(AlnError::InvalidArgument("interleave length must be positive".into())),
            Some(n) => n,
            None => num_columns.max(1),
        };
        let mut blocks = Vec::new();
        let mut start = 0;
        while start < num_columns || (start == 0 && num_columns == 0) {
            let end = (start + block).min(num_columns);
            let lines: Vec<String> = names
                .iter()
                .zip(&masked)
                .map(|(n, row)| format!("{:<width$}{}", n, String::from_utf8_lossy(&row[start..end]), width = width))
                .collect();
            blocks.push(lines.join("\n"));
            if num_columns == 0 {
                break;
            }
            start = end;
        }
        Ok(blocks.join("\n\n"))
    }
}

impl NamedSeqs for Alignment {
    fn names(&self) -> &[String] {
        &self.names
    }

    fn moltype(&self) -> MolType {
        self.moltype
    }

    fn seq(&self, name: &str) -> Option<Cow<'_, Sequence>> {
        self.index.get(name).map(|&i| self.store.row(i, name, self.moltype))
    }

    fn take_seqs<S: AsRef<str>>(&self, selector: &[S], negate: bool) -> Result<Self> {
        let names = select_names(&self.names, selector, negate)?;
        let picked: Vec<usize> = names.iter().map(|n| self.index[n]).collect();
        let store = self.store.with_rows(&picked);
        Ok(Self::from_store(names, store, self.moltype, self.info.clone()))
    }

    fn seq_len(&self) -> usize {
        self.num_columns()
    }

    fn is_ragged(&self) -> bool {
        false
    }
}

/// Same names with the same content, whatever the storage or order.
impl PartialEq for Alignment {
    fn eq(&self, other: &Self) -> bool {
        self.num_seqs() == other.num_seqs() && self.todict() == other.todict()
    }
}

/// FASTA, one record per row.
impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fasta())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    pub(crate) fn dict(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(n, s)| (n.to_string(), s.to_string())).collect()
    }

    fn both(pairs: &[(&str, &str)]) -> [Alignment; 2] {
        [Alignment::new(pairs.to_vec()).unwrap(), Alignment::new_dense(pairs.to_vec()).unwrap()]
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Alignment::new(vec![("a", "AAAA"), ("b", "AAA")]).unwrap_err();
        assert_eq!(err, AlnError::Ragged { name: "b".into(), len: 3, expected: 4 });
        assert!(Alignment::new_dense(vec!["AA", "A"]).is_err());
    }

    #[test]
    fn storage_round_trip() {
        let data = [("seq1", "ACGTACGTA"), ("seq2", "ACCGAA---"), ("seq3", "ACGTACGTT")];
        for aln in both(&data) {
            let same = aln.to_type(aln.is_dense());
            assert!(matches!(same, Cow::Borrowed(_)));
            let other = aln.to_type(!aln.is_dense());
            assert_ne!(other.is_dense(), aln.is_dense());
            assert_eq!(other.todict(), dict(&data));
            assert_eq!(other.names(), aln.names());
            let back = other.into_owned().into_type(aln.is_dense());
            assert_eq!(back.todict(), aln.todict());
        }
    }

    #[test]
    fn object_storage_keeps_info() {
        let rows = vec![Sequence::named("a", "AC").with_info("x", "1"), Sequence::named("b", "GT")];
        let aln = Alignment::new(rows).unwrap();
        assert_eq!(aln.get_seq("a").unwrap().info["x"], "1");
        let dense = aln.to_type(true);
        assert!(dense.get_seq("a").unwrap().info.is_empty());
    }

    #[test]
    fn reorder_without_copying_rows() {
        for mut aln in both(&[("a", "AAAAA"), ("b", "BBBBB")]) {
            aln.set_names(&["b", "a"]).unwrap();
            let seqs: Vec<String> = aln.iter_seqs().map(|s| s.to_string()).collect();
            assert_eq!(seqs, ["BBBBB", "AAAAA"]);
            assert_eq!(aln.to_fasta(), ">b\nBBBBB\n>a\nAAAAA");
        }
    }

    #[test]
    fn take_seqs_and_degap() {
        for aln in both(&[("a", "AC-GT"), ("b", "ACCGT"), ("c", "A?-GT")]) {
            let sub = aln.take_seqs(&["c", "a"], false).unwrap();
            assert_eq!(sub.names(), ["c", "a"]);
            assert_eq!(sub.is_dense(), aln.is_dense());
            let d = aln.degap();
            assert_eq!(d.todict(), dict(&[("a", "ACGT"), ("b", "ACCGT"), ("c", "AGT")]));
            assert_eq!(d.degap(), d);
        }
    }

    #[test]
    fn add_and_concat_rows() {
        for aln in both(&[("name1", "AAA"), ("name2", "AAA"), ("name3", "AAA"), ("name4", "AAA")]) {
            let extra = SequenceCollection::new(vec![("name5", "BBB"), ("name6", "CCC")]).unwrap();
            let out = aln.add_seqs(&extra, None, Some("name2")).unwrap();
            assert_eq!(out.names(), ["name1", "name2", "name5", "name6", "name3", "name4"]);
            assert_eq!(out.get_seq("name6").unwrap().as_bytes(), b"CCC");
            let long = SequenceCollection::new(vec![("name7", "BBBB")]).unwrap();
            assert!(matches!(aln.add_seqs(&long, None, None), Err(AlnError::Ragged { .. })));
        }
        let a = Alignment::new(vec![("a", "AAAA"), ("b", "TTTT"), ("c", "CCCC")]).unwrap();
        let b = Alignment::new_dense(vec![("c", "NNNN"), ("a", "GGGG"), ("b", "----")]).unwrap();
        let joined = a.concat(&b).unwrap();
        assert_eq!(joined.todict(), dict(&[("a", "AAAAGGGG"), ("b", "TTTT----"), ("c", "CCCCNNNN")]));
    }

    fn both_dna(pairs: &[(&str, &str)]) -> [Alignment; 2] {
        let b = SeqsBuilder::new().moltype(MolType::Dna);
        [b.alignment(pairs.to_vec()).unwrap(), b.array_alignment(pairs.to_vec()).unwrap()]
    }

    #[test]
    fn added_rows_are_normalized() {
        let [obj, dense] = both_dna(&[("a", "ACGT")]);
        let lower = SequenceCollection::new(vec![("z", "acgn")]).unwrap();
        let got_obj = obj.add_seqs(&lower, None, None).unwrap();
        let got_dense = dense.add_seqs(&lower, None, None).unwrap();
        assert_eq!(got_obj.get_seq("z").unwrap().as_bytes(), b"ACGN");
        assert_eq!(got_obj, got_dense);

        let bad = SequenceCollection::new(vec![("z", "acgZ")]).unwrap();
        for aln in [obj, dense] {
            let err = aln.add_seqs(&bad, None, None).unwrap_err();
            assert!(matches!(err, AlnError::InvalidSymbol { symbol: 'Z', .. }));
        }
    }

    #[test]
    fn concat_uses_own_moltype() {
        for left in both(&[("a", "AC")]) {
            for right in both_dna(&[("a", "GG")]) {
                let joined = left.concat(&right).unwrap();
                assert_eq!(joined.get_seq("a").unwrap().as_bytes(), b"ACGG");
            }
        }
        for left in both_dna(&[("a", "AC")]) {
            for right in both(&[("a", "gg"), ("b", "ZZ")]) {
                let right = right.take_seqs(&["a"], false).unwrap();
                assert_eq!(left.concat(&right).unwrap().get_seq("a").unwrap().as_bytes(), b"ACGG");
            }
            let bad = Alignment::new(vec![("a", "ZZ")]).unwrap();
            assert!(matches!(left.concat(&bad), Err(AlnError::InvalidSymbol { .. })));
        }
    }

    #[test]
    fn termini_recoded() {
        for aln in both(&[("s1", "AATGR--"), ("s2", "-T-AG?-")]) {
            assert_eq!(aln.with_modified_termini().todict(), dict(&[("s1", "AATGR??"), ("s2", "?T-AG??")]));
        }
    }

    #[test]
    fn pretty_printing() {
        let data = [("seq1", "ACGAANGA"), ("seq2", "-CGAACGA"), ("seq3", "ATGAACGA")];
        for aln in both(&data) {
            let got = aln.to_pretty(Some(&["seq1", "seq2", "seq3"]), None).unwrap();
            assert_eq!(got, "seq1    ACGAANGA\nseq2    -....C..\nseq3    .T...C..");
            let got = aln.to_pretty(None, Some(4)).unwrap();
            let expect = [
                "seq1    ACGA",
                "seq2    -...",
                "seq3    .T..",
                "",
                "seq1    ANGA",
                "seq2    .C..",
                "seq3    .C..",
            ];
            assert_eq!(got, expect.join("\n"));
        }
    }

    #[test]
    fn equality_across_storage() {
        let [obj, dense] = both(&[("a", "AC"), ("b", "GT")]);
        assert_eq!(obj, dense);
        assert_eq!(obj.to_string(), ">a\nAC\n>b\nGT");
    }
}
