//! 命名序列集合的公共操作
//!
//! [`NamedSeqs`] is implemented by both [`SequenceCollection`](super::SequenceCollection)
//! and [`Alignment`](crate::align::Alignment). Implementors supply name order,
//! lookup by name and a sub-selection constructor; everything else in this
//! module is written once on top of those.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

use crate::error::{AlnError, Result};
use crate::io::fasta;
use crate::seqs::Sequence;
use crate::util::metrics;
use crate::util::moltype::MolType;

/// Synthetic name -> sequence, synthetic name -> original name.
pub type IntMap = (BTreeMap<String, Sequence>, BTreeMap<String, String>);

/// All-pairs score table keyed by name on both axes.
pub type DistanceMatrix = BTreeMap<String, BTreeMap<String, f64>>;

pub trait NamedSeqs: Clone + Sized {
    /// Iteration order. Always a permutation of the member names.
    fn names(&self) -> &[String];

    fn moltype(&self) -> MolType;

    fn seq(&self, name: &str) -> Option<Cow<'_, Sequence>>;

    /// Members named in `selector` (in selector order), or with `negate` all
    /// others in current order.
    fn take_seqs<S: AsRef<str>>(&self, selector: &[S], negate: bool) -> Result<Self>;

    fn num_seqs(&self) -> usize {
        self.names().len()
    }

    /// Length of the longest member.
    fn seq_len(&self) -> usize {
        self.iter_seqs().map(|s| s.len()).max().unwrap_or(0)
    }

    fn is_ragged(&self) -> bool {
        let mut lens = self.iter_seqs().map(|s| s.len());
        match lens.next() {
            Some(first) => lens.any(|l| l != first),
            None => false,
        }
    }

    fn get_seq(&self, name: &str) -> Result<Cow<'_, Sequence>> {
        self.seq(name).ok_or_else(|| AlnError::UnknownName(name.to_string()))
    }

    fn iter_seqs(&self) -> Box<dyn Iterator<Item = Cow<'_, Sequence>> + '_> {
        Box::new(self.names().iter().filter_map(move |n| self.seq(n)))
    }

    /// Members in a caller-chosen order; repeats are allowed.
    fn seqs_in_order<S: AsRef<str>>(&self, order: &[S]) -> Result<Vec<Cow<'_, Sequence>>> {
        order.iter().map(|n| self.get_seq(n.as_ref())).collect()
    }

    /// name -> symbols as text.
    fn todict(&self) -> BTreeMap<String, String> {
        self.names()
            .iter()
            .zip(self.iter_seqs())
            .map(|(n, s)| (n.clone(), s.to_string()))
            .collect()
    }

    fn to_fasta(&self) -> String {
        let seqs: Vec<_> = self.iter_seqs().collect();
        fasta::format_records(self.names().iter().map(String::as_str).zip(seqs.iter().map(|s| s.as_bytes())))
    }

    /// Positions (in name order) of members for which `pred` holds.
    fn get_seq_indices<F>(&self, pred: F, negate: bool) -> Vec<usize>
    where
        F: Fn(&Sequence) -> bool,
    {
        self.iter_seqs()
            .enumerate()
            .filter(|(_, s)| pred(s) != negate)
            .map(|(i, _)| i)
            .collect()
    }

    fn take_seqs_if<F>(&self, pred: F, negate: bool) -> Result<Self>
    where
        F: Fn(&Sequence) -> bool,
    {
        let keep: Vec<&str> = self
            .get_seq_indices(pred, negate)
            .into_iter()
            .map(|i| self.names()[i].as_str())
            .collect();
        self.take_seqs(&keep, false)
    }

    /// Members whose fractional identity to `target` lies in `[min, max]`.
    fn get_similar(&self, target: &Sequence, min: f64, max: f64) -> Result<Self> {
        self.get_similar_by(target, min, max, metrics::frac_same, |s: &Sequence| s.clone())
    }

    /// Like [`get_similar`](NamedSeqs::get_similar) with a custom metric,
    /// applied to `transform`ed target and candidates.
    fn get_similar_by<M, T>(&self, target: &Sequence, min: f64, max: f64, metric: M, transform: T) -> Result<Self>
    where
        M: Fn(&Sequence, &Sequence) -> Result<f64>,
        T: Fn(&Sequence) -> Sequence,
    {
        let target = transform(target);
        let mut keep = Vec::new();
        for (name, seq) in self.names().iter().zip(self.iter_seqs()) {
            let score = metric(&target, &transform(&seq))?;
            if min <= score && score <= max {
                keep.push(name.as_str());
            }
        }
        self.take_seqs(&keep, false)
    }

    /// Applies `metric` to every unordered pair, self pairs included.
    fn distance_matrix<M>(&self, metric: M) -> Result<DistanceMatrix>
    where
        M: Fn(&Sequence, &Sequence) -> Result<f64>,
    {
        let seqs: Vec<_> = self.iter_seqs().collect();
        let names = self.names();
        let mut out: DistanceMatrix = BTreeMap::new();
        for i in 0..seqs.len() {
            for j in i..seqs.len() {
                let d = metric(&seqs[i], &seqs[j])?;
                out.entry(names[i].clone()).or_default().insert(names[j].clone(), d);
                out.entry(names[j].clone()).or_default().insert(names[i].clone(), d);
            }
        }
        Ok(out)
    }

    /// Drops members whose gap fraction exceeds `allowed_gap_frac`.
    fn omit_gap_seqs(&self, allowed_gap_frac: f64) -> Result<Cow<'_, Self>> {
        let mt = self.moltype();
        self.keep_if_any_dropped(|s| s.gap_fraction(mt) <= allowed_gap_frac)
    }

    /// Drops members with a run of gaps longer than `allowed_run`.
    fn omit_gap_runs(&self, allowed_run: usize) -> Result<Cow<'_, Self>> {
        let mt = self.moltype();
        self.keep_if_any_dropped(|s| s.longest_gap_run(mt) <= allowed_run)
    }

    /// Drops the members responsible for mostly-gapped columns.
    ///
    /// A column is bad when its gap fraction exceeds `disallowed_frac`. A
    /// member is dropped when the share of bad columns in which it holds a
    /// residue exceeds `allowed_frac_bad_cols`; with `exclude_just_gap`,
    /// all-gap members go too. Positions past the end of a short member count
    /// as gaps.
    fn omit_bad_seqs(
        &self,
        disallowed_frac: f64,
        allowed_frac_bad_cols: f64,
        exclude_just_gap: bool,
    ) -> Result<Cow<'_, Self>> {
        let mt = self.moltype();
        let seqs: Vec<_> = self.iter_seqs().collect();
        let width = seqs.iter().map(|s| s.len()).max().unwrap_or(0);
        let n = seqs.len();
        let is_gap = |s: &Sequence, col: usize| s.get(col).map_or(true, |b| mt.is_gap_or_missing(b));

        let bad_cols: Vec<usize> = (0..width)
            .filter(|&col| {
                let gaps = seqs.iter().filter(|s| is_gap(s, col)).count();
                n > 0 && gaps as f64 / n as f64 > disallowed_frac
            })
            .collect();

        self.keep_if_any_dropped(|s| {
            if exclude_just_gap && s.is_all_gaps(mt) {
                return false;
            }
            if bad_cols.is_empty() {
                return true;
            }
            let residues = bad_cols.iter().filter(|&&c| !is_gap(s, c)).count();
            residues as f64 / bad_cols.len() as f64 <= allowed_frac_bad_cols
        })
    }

    #[doc(hidden)]
    fn keep_if_any_dropped<F>(&self, keep: F) -> Result<Cow<'_, Self>>
    where
        F: Fn(&Sequence) -> bool,
    {
        let selected = self.get_seq_indices(keep, false);
        if selected.len() == self.num_seqs() {
            return Ok(Cow::Borrowed(self));
        }
        let names: Vec<&str> = selected.iter().map(|&i| self.names()[i].as_str()).collect();
        Ok(Cow::Owned(self.take_seqs(&names, false)?))
    }

    /// Renames members `{prefix}0, {prefix}1, …` in name order.
    fn get_int_map(&self, prefix: &str) -> IntMap {
        let mut seqs = BTreeMap::new();
        let mut keys = BTreeMap::new();
        for (i, (name, seq)) in self.names().iter().zip(self.iter_seqs()).enumerate() {
            let key = format!("{}{}", prefix, i);
            seqs.insert(key.clone(), seq.renamed(key.clone()));
            keys.insert(key, name.clone());
        }
        (seqs, keys)
    }

    /// Sequential PHYLIP with fixed-width identifiers, plus the identifier ->
    /// name map. Ragged members are rejected.
    fn to_phylip(&self) -> Result<(String, BTreeMap<String, String>)> {
        if self.is_ragged() {
            return Err(AlnError::LengthMismatch("PHYLIP requires equal-length sequences".into()));
        }
        let mut lines = vec![format!("{} {}", self.num_seqs(), self.seq_len())];
        let mut ids = BTreeMap::new();
        for (i, (name, seq)) in self.names().iter().zip(self.iter_seqs()).enumerate() {
            let id = format!("seq{:07}", i + 1);
            lines.push(format!("{} {}", id, seq));
            ids.insert(id, name.clone());
        }
        Ok((lines.join("\n"), ids))
    }

    /// Symbols at `(name, position)` coordinates. With `negate`, every other
    /// symbol in name order.
    fn get_items<S: AsRef<str>>(&self, items: &[(S, usize)], negate: bool) -> Result<Vec<u8>> {
        if !negate {
            return items
                .iter()
                .map(|(name, pos)| {
                    let seq = self.get_seq(name.as_ref())?;
                    seq.get(*pos).ok_or(AlnError::IndexOutOfRange { index: *pos, len: seq.len() })
                })
                .collect();
        }
        let excluded: HashSet<(&str, usize)> = items.iter().map(|(n, p)| (n.as_ref(), *p)).collect();
        let mut out = Vec::new();
        for (name, seq) in self.names().iter().zip(self.iter_seqs()) {
            for (pos, &b) in seq.as_bytes().iter().enumerate() {
                if !excluded.contains(&(name.as_str(), pos)) {
                    out.push(b);
                }
            }
        }
        Ok(out)
    }

    /// Coordinates of the symbols matching `pred`, in name then position order.
    fn item_indices_if<F>(&self, pred: F, negate: bool) -> Vec<(String, usize)>
    where
        F: Fn(u8) -> bool,
    {
        let mut out = Vec::new();
        for (name, seq) in self.names().iter().zip(self.iter_seqs()) {
            for (pos, &b) in seq.as_bytes().iter().enumerate() {
                if pred(b) != negate {
                    out.push((name.clone(), pos));
                }
            }
        }
        out
    }

    fn items_if<F>(&self, pred: F, negate: bool) -> Vec<u8>
    where
        F: Fn(u8) -> bool,
    {
        self.iter_seqs()
            .flat_map(|s| s.as_bytes().iter().copied().filter(|&b| pred(b) != negate).collect::<Vec<_>>())
            .collect()
    }

    /// Symbols row by row, restricted to `seq_order` rows and `pos_order`
    /// columns when given.
    fn iter_selected(&self, seq_order: Option<&[&str]>, pos_order: Option<&[usize]>) -> Result<Vec<u8>> {
        let seqs = match seq_order {
            Some(order) => self.seqs_in_order(order)?,
            None => self.iter_seqs().collect(),
        };
        let mut out = Vec::new();
        for seq in &seqs {
            match pos_order {
                None => out.extend_from_slice(seq.as_bytes()),
                Some(cols) => {
                    for &c in cols {
                        out.push(seq.get(c).ok_or(AlnError::IndexOutOfRange { index: c, len: seq.len() })?);
                    }
                }
            }
        }
        Ok(out)
    }

    /// Ambiguity codes (including `?`) per member and position.
    fn get_ambiguous_positions(&self) -> BTreeMap<String, BTreeMap<usize, char>> {
        let mt = self.moltype();
        let mut out = BTreeMap::new();
        for (name, seq) in self.names().iter().zip(self.iter_seqs()) {
            let found: BTreeMap<usize, char> = seq
                .as_bytes()
                .iter()
                .enumerate()
                .filter(|(_, &b)| mt.is_degenerate(b))
                .map(|(i, &b)| (i, b as char))
                .collect();
            if !found.is_empty() {
                out.insert(name.clone(), found);
            }
        }
        out
    }
}

/// Resolves a `take_seqs` selector against the member names.
pub(crate) fn select_names<S: AsRef<str>>(names: &[String], selector: &[S], negate: bool) -> Result<Vec<String>> {
    let mut wanted: HashSet<&str> = HashSet::with_capacity(selector.len());
    for s in selector {
        let s = s.as_ref();
        if !names.iter().any(|n| n == s) {
            return Err(AlnError::UnknownName(s.to_string()));
        }
        if !wanted.insert(s) {
            return Err(AlnError::DuplicateName(s.to_string()));
        }
    }
    if negate {
        Ok(names.iter().filter(|n| !wanted.contains(n.as_str())).cloned().collect())
    } else {
        Ok(selector.iter().map(|s| s.as_ref().to_string()).collect())
    }
}

/// Checks that `order` is a permutation of `names`.
pub(crate) fn check_reorder<S: AsRef<str>>(names: &[String], order: &[S]) -> Result<Vec<String>> {
    let reordered = select_names(names, order, false)?;
    if reordered.len() != names.len() {
        let missing = names
            .iter()
            .find(|n| !reordered.contains(n))
            .cloned()
            .unwrap_or_default();
        return Err(AlnError::InvalidArgument(format!("new name order leaves out '{}'", missing)));
    }
    Ok(reordered)
}

/// Member order after inserting `added` before or after an anchor, or at the
/// end when no anchor is given.
pub(crate) fn splice_names(
    existing: &[String],
    added: &[String],
    before: Option<&str>,
    after: Option<&str>,
) -> Result<Vec<String>> {
    if let Some(dup) = added.iter().find(|n| existing.contains(n)) {
        return Err(AlnError::DuplicateName(dup.clone()));
    }
    let position = |anchor: &str| {
        existing
            .iter()
            .position(|n| n == anchor)
            .ok_or_else(|| AlnError::UnknownName(anchor.to_string()))
    };
    let at = match (before, after) {
        (Some(_), Some(_)) => {
            return Err(AlnError::InvalidArgument("give either a before or an after anchor, not both".into()))
        }
        (Some(b), None) => position(b)?,
        (None, Some(a)) => position(a)? + 1,
        (None, None) => existing.len(),
    };
    let mut out = Vec::with_capacity(existing.len() + added.len());
    out.extend_from_slice(&existing[..at]);
    out.extend_from_slice(added);
    out.extend_from_slice(&existing[at..]);
    Ok(out)
}
