//! 以参考序列为坐标的操作
//!
//! Each operation here reads positions relative to one row: a named member,
//! a template alignment, or the first row of another alignment.

use super::{Alignment, GapFilter};
use crate::error::{AlnError, Result};
use crate::seqs::named::splice_names;
use crate::seqs::{NamedSeqs, Sequence};
use crate::util::moltype::GAP;

impl Alignment {
    /// Rows whose gap pattern agrees with `ref_name`'s (see [`GapFilter`]).
    /// The reference row is always kept.
    pub fn matching_ref(&self, ref_name: &str, gap_fraction: f64, gap_run: usize) -> Result<Alignment> {
        let reference = self.get_seq(ref_name)?;
        let filter = GapFilter::new(&reference, gap_fraction, gap_run);
        let mut keep = Vec::new();
        for (name, seq) in self.names().iter().zip(self.iter_seqs()) {
            if name == ref_name || filter.accepts(&seq)? {
                keep.push(name.as_str());
            }
        }
        self.take_seqs(&keep, false)
    }

    /// Drops every column where `name` holds a gap or missing symbol.
    pub fn get_degapped_relative_to(&self, name: &str) -> Result<Alignment> {
        let mt = self.moltype;
        let reference = self.get_seq(name)?;
        let cols: Vec<usize> = reference
            .as_bytes()
            .iter()
            .enumerate()
            .filter(|(_, &b)| !mt.is_gap_or_missing(b))
            .map(|(i, _)| i)
            .collect();
        Ok(self.with_columns(&cols))
    }

    /// Copies the gaps (strictly `-`) of each row of `template` onto the
    /// same-named row here. Every row must exist in the template.
    pub fn with_gaps_from(&self, template: &Alignment) -> Result<Alignment> {
        if template.num_columns() != self.num_columns() {
            return Err(AlnError::LengthMismatch(format!(
                "template has {} columns, alignment has {}",
                template.num_columns(),
                self.num_columns()
            )));
        }
        let gap_code = self.moltype.encode_lossy(GAP);
        let theirs = template.grid();
        let mut grid = self.grid().clone();
        for (name, &row) in &self.index {
            let t = *template.index.get(name).ok_or_else(|| AlnError::UnknownName(name.clone()))?;
            for c in 0..grid.nrows() {
                if template.moltype.decode(theirs[[c, t]]) == GAP {
                    grid[[c, row]] = gap_code;
                }
            }
        }
        Ok(self.with_grid(grid))
    }

    /// Inserts the rows of `other`, aligned to its first row, into this
    /// alignment's coordinates. The first row of `other` is the reference: it
    /// must be a member here with the same ungapped content, and no other
    /// row may hold a residue where it is gapped.
    pub fn add_from_ref_aln<T: NamedSeqs>(
        &self,
        other: &T,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Alignment> {
        let mt = self.moltype;
        let ref_name = other
            .names()
            .first()
            .ok_or_else(|| AlnError::InvalidArgument("reference alignment has no rows".into()))?;
        let here = self.get_seq(ref_name)?;
        let there = Sequence::new(mt.normalize(other.get_seq(ref_name)?.as_bytes())?);
        if !here.degap(mt).same_content(&there.degap(mt)) {
            return Err(AlnError::ReferenceMismatch(format!(
                "'{}' differs between the two alignments",
                ref_name
            )));
        }

        // residue k of the reference sits at column slots[k] here
        let slots: Vec<usize> = here
            .as_bytes()
            .iter()
            .enumerate()
            .filter(|(_, &b)| !mt.is_gap_or_missing(b))
            .map(|(i, _)| i)
            .collect();
        let mapping: Vec<Option<usize>> = {
            let mut k = 0;
            there
                .as_bytes()
                .iter()
                .map(|&b| {
                    if mt.is_gap_or_missing(b) {
                        None
                    } else {
                        k += 1;
                        slots.get(k - 1).copied()
                    }
                })
                .collect()
        };

        let added: Vec<String> = other.names()[1..].to_vec();
        let width = self.num_columns();
        let mut new_rows = Vec::with_capacity(added.len());
        for name in &added {
            let seq = other.get_seq(name)?;
            let mut row = vec![GAP; width];
            for (&b, slot) in seq.as_bytes().iter().zip(&mapping) {
                match slot {
                    Some(col) => row[*col] = b,
                    None if mt.is_gap_or_missing(b) => {}
                    None => {
                        return Err(AlnError::ReferenceMismatch(format!(
                            "'{}' has residues where reference '{}' is gapped",
                            name, ref_name
                        )))
                    }
                }
            }
            new_rows.push((name.clone(), row));
        }

        let order = splice_names(&self.names, &added, before, after)?;
        let mut rows = Vec::with_capacity(order.len());
        let mut new_rows = new_rows.into_iter();
        for name in order {
            match self.seq(&name) {
                Some(s) => rows.push((name, s.as_bytes().to_vec())),
                None => {
                    if let Some(row) = new_rows.next() {
                        rows.push(row);
                    }
                }
            }
        }
        Alignment::from_named_rows(rows, self)
    }

    /// Replaces each row's residues with the same-named sequence from
    /// `new_seqs`, keeping this alignment's gaps. With `aa_to_codon` every
    /// position expands to three symbols, so amino-acid alignments can carry
    /// codon sequences.
    pub fn replace_seqs<T: NamedSeqs>(&self, new_seqs: &T, aa_to_codon: bool) -> Result<Alignment> {
        let mt = self.moltype;
        let scale = if aa_to_codon { 3 } else { 1 };
        let mut rows = Vec::with_capacity(self.num_seqs());
        for (name, gapped) in self.names().iter().zip(self.iter_seqs()) {
            let fresh = new_seqs.get_seq(name)?.degap(new_seqs.moltype());
            let residues = gapped.len() - gapped.count_gaps(mt);
            if fresh.len() != residues * scale {
                return Err(AlnError::LengthMismatch(format!(
                    "'{}' has {} residues, expected {}",
                    name,
                    fresh.len(),
                    residues * scale
                )));
            }
            let mut chunks = fresh.as_bytes().chunks(scale);
            let mut row = Vec::with_capacity(gapped.len() * scale);
            for &b in gapped.as_bytes() {
                if mt.is_gap_or_missing(b) {
                    row.extend(std::iter::repeat(b).take(scale));
                } else if let Some(chunk) = chunks.next() {
                    row.extend_from_slice(chunk);
                }
            }
            rows.push((name.clone(), row));
        }
        Alignment::from_named_rows(rows, self)
    }
}
