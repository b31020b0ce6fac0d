use std::borrow::Cow;
use std::collections::HashMap;

use log::debug;

use crate::error::{AlnError, Result};
use crate::seqs::ingest::{Input, Members, SeqsBuilder};
use crate::seqs::named::{check_reorder, select_names, splice_names};
use crate::seqs::{Info, NamedSeqs, Sequence};
use crate::util::moltype::MolType;

/// Named sequences of any lengths.
///
/// Members live in a name -> sequence map; `names` holds the iteration order
/// and can be reassigned without touching sequence data.
#[derive(Debug, Clone)]
pub struct SequenceCollection {
    seqs: HashMap<String, Sequence>,
    names: Vec<String>,
    moltype: MolType,
    pub info: Info,
}

impl SequenceCollection {
    /// Builds with default options; see [`SeqsBuilder`] for the others.
    pub fn new(input: impl Into<Input>) -> Result<Self> {
        SeqsBuilder::new().collection(input)
    }

    pub(crate) fn from_members(m: Members) -> Self {
        debug!("collection of {} sequences ({})", m.names.len(), m.moltype);
        Self::from_parts(m.names, m.seqs, m.moltype, m.info)
    }

    /// `seqs` must already carry `names` in the same order.
    pub(crate) fn from_parts(names: Vec<String>, seqs: Vec<Sequence>, moltype: MolType, info: Info) -> Self {
        let seqs = names.iter().cloned().zip(seqs).collect();
        Self { seqs, names, moltype, info }
    }

    fn map_seqs<F>(&self, f: F) -> Self
    where
        F: Fn(&Sequence) -> Sequence,
    {
        let seqs = self.names.iter().map(|n| f(&self.seqs[n])).collect();
        Self::from_parts(self.names.clone(), seqs, self.moltype, self.info.clone())
    }

    /// Reorders iteration. `order` must name every member exactly once.
    pub fn set_names<S: AsRef<str>>(&mut self, order: &[S]) -> Result<()> {
        self.names = check_reorder(&self.names, order)?;
        Ok(())
    }

    /// Members with gap and missing symbols removed.
    pub fn degap(&self) -> Self {
        let mt = self.moltype;
        self.map_seqs(|s| s.degap(mt))
    }

    /// Leading and trailing gaps recoded as `?`; internal gaps are kept.
    pub fn with_modified_termini(&self) -> Self {
        let mt = self.moltype;
        self.map_seqs(|s| s.with_termini_unknown(mt))
    }

    /// Right-pads every member with gaps to `pad_length`, or to the longest
    /// member when `None`.
    pub fn pad_seqs(&self, pad_length: Option<usize>) -> Result<Self> {
        let longest = self.seq_len();
        let target = match pad_length {
            Some(p) if p < longest => return Err(AlnError::PadTooShort { pad_length: p, longest }),
            Some(p) => p,
            None => longest,
        };
        let gap = self.moltype.gap();
        Ok(self.map_seqs(|s| {
            let mut data = s.as_bytes().to_vec();
            data.resize(target, gap);
            s.with_data(data)
        }))
    }

    /// Adds the members of `other`, at the end or next to an anchor.
    pub fn add_seqs<T: NamedSeqs>(&self, other: &T, before: Option<&str>, after: Option<&str>) -> Result<Self> {
        let names = splice_names(&self.names, other.names(), before, after)?;
        let mut seqs = self.seqs.clone();
        for (name, seq) in other.names().iter().zip(other.iter_seqs()) {
            seqs.insert(name.clone(), seq.into_owned());
        }
        Ok(Self { seqs, names, moltype: self.moltype, info: self.info.clone() })
    }

    /// Joins same-named members end to end. Both sides must hold the same
    /// names.
    pub fn concat(&self, other: &SequenceCollection) -> Result<Self> {
        if let Some(missing) = other.names.iter().find(|n| !self.seqs.contains_key(*n)) {
            return Err(AlnError::UnknownName(missing.clone()));
        }
        let mut out = Vec::with_capacity(self.names.len());
        for name in &self.names {
            let tail = other.get_seq(name)?;
            let mut data = self.seqs[name].as_bytes().to_vec();
            data.extend_from_slice(tail.as_bytes());
            out.push(self.seqs[name].with_data(data));
        }
        Ok(Self::from_parts(self.names.clone(), out, self.moltype, self.info.clone()))
    }
}

impl NamedSeqs for SequenceCollection {
    fn names(&self) -> &[String] {
        &self.names
    }

    fn moltype(&self) -> MolType {
        self.moltype
    }

    fn seq(&self, name: &str) -> Option<Cow<'_, Sequence>> {
        self.seqs.get(name).map(Cow::Borrowed)
    }

    fn take_seqs<S: AsRef<str>>(&self, selector: &[S], negate: bool) -> Result<Self> {
        let names = select_names(&self.names, selector, negate)?;
        let seqs = names.iter().map(|n| self.seqs[n].clone()).collect();
        Ok(Self::from_parts(names, seqs, self.moltype, self.info.clone()))
    }
}

/// Same names with the same content; order and metadata are ignored.
impl PartialEq for SequenceCollection {
    fn eq(&self, other: &Self) -> bool {
        self.seqs.len() == other.seqs.len()
            && self
                .seqs
                .iter()
                .all(|(name, seq)| other.seqs.get(name).map_or(false, |o| o.same_content(seq)))
    }
}
