use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::moltype::MolType;

/// Free-form metadata attached to a sequence or a collection.
pub type Info = BTreeMap<String, String>;

/// A named run of symbols with optional metadata.
///
/// Equality compares name, symbols and metadata; collections compare members
/// by content only (see [`Sequence::same_content`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sequence {
    pub name: Option<String>,
    data: Vec<u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub info: Info,
}

impl Sequence {
    pub fn new(data: impl AsRef<[u8]>) -> Self {
        Self { name: None, data: data.as_ref().to_vec(), info: Info::new() }
    }

    pub fn named(name: impl Into<String>, data: impl AsRef<[u8]>) -> Self {
        Self { name: Some(name.into()), data: data.as_ref().to_vec(), info: Info::new() }
    }

    pub fn from_vec(name: Option<String>, data: Vec<u8>, info: Info) -> Self {
        Self { name, data, info }
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    /// Same metadata and name, different symbols.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Self { name: self.name.clone(), data, info: self.info.clone() }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), data: self.data.clone(), info: self.info.clone() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }

    pub fn same_content(&self, other: &Sequence) -> bool {
        self.data == other.data
    }

    /// Symbols with gaps and missing positions removed.
    pub fn degap(&self, moltype: MolType) -> Sequence {
        self.with_data(self.data.iter().copied().filter(|&b| !moltype.is_gap_or_missing(b)).collect())
    }

    pub fn count_gaps(&self, moltype: MolType) -> usize {
        self.data.iter().filter(|&&b| moltype.is_gap_or_missing(b)).count()
    }

    pub fn gap_fraction(&self, moltype: MolType) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.count_gaps(moltype) as f64 / self.data.len() as f64
    }

    /// Per-position gap flags.
    pub fn gap_vector(&self, moltype: MolType) -> Vec<bool> {
        self.data.iter().map(|&b| moltype.is_gap_or_missing(b)).collect()
    }

    /// Longest run of consecutive gap positions.
    pub fn longest_gap_run(&self, moltype: MolType) -> usize {
        let mut best = 0usize;
        let mut cur = 0usize;
        for &b in &self.data {
            if moltype.is_gap_or_missing(b) {
                cur += 1;
                best = best.max(cur);
            } else {
                cur = 0;
            }
        }
        best
    }

    pub fn is_all_gaps(&self, moltype: MolType) -> bool {
        self.data.iter().all(|&b| moltype.is_gap_or_missing(b))
    }

    /// Leading and trailing gap runs recoded as the missing symbol.
    pub fn with_termini_unknown(&self, moltype: MolType) -> Sequence {
        let mut data = self.data.clone();
        let n = data.len();
        let first = data.iter().position(|&b| !moltype.is_gap_or_missing(b)).unwrap_or(n);
        let last = data.iter().rposition(|&b| !moltype.is_gap_or_missing(b)).map_or(0, |i| i + 1);
        for b in data[..first].iter_mut() {
            *b = moltype.missing();
        }
        if last > first {
            for b in data[last..].iter_mut() {
                *b = moltype.missing();
            }
        }
        self.with_data(data)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.data))
    }
}

impl From<&str> for Sequence {
    fn from(s: &str) -> Self {
        Sequence::new(s)
    }
}

impl From<String> for Sequence {
    fn from(s: String) -> Self {
        Sequence::from_vec(None, s.into_bytes(), Info::new())
    }
}

impl AsRef<[u8]> for Sequence {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degap_strips_gap_and_missing() {
        let s = Sequence::named("a", "AT-GRY?");
        let d = s.degap(MolType::Dna);
        assert_eq!(d.as_bytes(), b"ATGRY");
        assert_eq!(d.name.as_deref(), Some("a"));
    }

    #[test]
    fn termini_recoded() {
        let mt = MolType::Dna;
        assert_eq!(Sequence::new("AATGR--").with_termini_unknown(mt).as_bytes(), b"AATGR??");
        assert_eq!(Sequence::new("-T-AG?-").with_termini_unknown(mt).as_bytes(), b"?T-AG??");
        assert_eq!(Sequence::new("---").with_termini_unknown(mt).as_bytes(), b"???");
    }

    #[test]
    fn gap_stats() {
        let s = Sequence::new("A--A-AA");
        assert_eq!(s.count_gaps(MolType::Bytes), 3);
        assert_eq!(s.longest_gap_run(MolType::Bytes), 2);
        assert!((s.gap_fraction(MolType::Bytes) - 3.0 / 7.0).abs() < 1e-12);
        assert!(!s.is_all_gaps(MolType::Bytes));
    }

    #[test]
    fn info_is_kept_by_transformations() {
        let s = Sequence::named("a", "A-C").with_info("x", "3");
        assert_eq!(s.degap(MolType::Bytes).info.get("x").map(String::as_str), Some("3"));
    }
}
