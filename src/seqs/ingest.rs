//! 输入规范化
//!
//! Every constructor goes through here: an [`Input`] is classified into one
//! [`InputKind`], converted into a [`Payload`] of raw sequences plus optional
//! names, and finally resolved by [`SeqsBuilder`] into validated members.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;
use ndarray::Array2;

use crate::align::Alignment;
use crate::error::{AlnError, Result};
use crate::io::fasta;
use crate::seqs::{Info, NamedSeqs, Sequence, SequenceCollection};
use crate::util::moltype::MolType;

/// Caller data in any of the accepted shapes.
#[derive(Debug, Clone)]
pub enum Input {
    /// Rows are sequences of symbol codes.
    Array(Array2<u8>),
    Seqs(Vec<Sequence>),
    Text(String),
    Lines(Vec<String>),
    Nested(Vec<Vec<String>>),
    Map(BTreeMap<String, String>),
    Pairs(Vec<(String, Sequence)>),
    Collection(SequenceCollection),
    Alignment(Alignment),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    ArrayAln,
    Aln,
    Collection,
    Array,
    ArraySeqs,
    Fasta,
    Generic,
    Dict,
    KvPairs,
    Empty,
}

/// Raw sequences plus names; `None` means names are synthesized.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub seqs: Vec<Sequence>,
    pub names: Option<Vec<String>>,
}

/// Decides how `input` will be read. Checked in order: existing instances,
/// emptiness, dense arrays, FASTA markers, nested-list shape, the rest.
pub fn classify(input: &Input) -> Result<InputKind> {
    let kind = match input {
        Input::Alignment(a) if a.is_dense() => InputKind::ArrayAln,
        Input::Alignment(_) => InputKind::Aln,
        Input::Collection(_) => InputKind::Collection,
        Input::Array(a) if a.nrows() == 0 => InputKind::Empty,
        Input::Seqs(v) if v.is_empty() => InputKind::Empty,
        Input::Text(t) if t.trim().is_empty() => InputKind::Empty,
        Input::Lines(v) if v.is_empty() => InputKind::Empty,
        Input::Nested(v) if v.is_empty() => InputKind::Empty,
        Input::Map(m) if m.is_empty() => InputKind::Empty,
        Input::Pairs(v) if v.is_empty() => InputKind::Empty,
        Input::Array(_) => InputKind::Array,
        Input::Text(t) if t.trim_start().starts_with('>') => InputKind::Fasta,
        Input::Lines(v) if v[0].starts_with('>') => InputKind::Fasta,
        Input::Nested(v) => {
            if v.iter().all(|inner| inner.len() == 2) {
                InputKind::KvPairs
            } else if v.iter().all(|inner| inner.len() > 2) {
                InputKind::Generic
            } else {
                return Err(AlnError::Unrecognized(
                    "nested lists must all be pairs or all be longer than two items".into(),
                ));
            }
        }
        Input::Text(_) | Input::Lines(_) => InputKind::Generic,
        Input::Seqs(_) => InputKind::ArraySeqs,
        Input::Map(_) => InputKind::Dict,
        Input::Pairs(_) => InputKind::KvPairs,
    };
    Ok(kind)
}

/// Converts `input` into the canonical payload. `moltype` decodes dense
/// arrays of symbol codes.
pub fn to_payload(input: Input, moltype: MolType) -> Result<Payload> {
    let kind = classify(&input)?;
    debug!("ingesting input classified as {:?}", kind);
    if kind == InputKind::Empty {
        return Err(AlnError::EmptyInput);
    }
    let payload = match input {
        Input::Alignment(a) => from_instance(&a),
        Input::Collection(c) => from_instance(&c),
        Input::Array(arr) => Payload {
            seqs: arr.rows().into_iter().map(|row| Sequence::new(moltype.decode_seq(&row.to_vec()))).collect(),
            ..Payload::default()
        },
        Input::Seqs(seqs) => Payload { seqs, ..Payload::default() },
        Input::Text(text) if kind == InputKind::Fasta => {
            from_fasta(fasta::parse_str(&text).map_err(|e| AlnError::Fasta(e.to_string()))?)
        }
        Input::Lines(lines) if kind == InputKind::Fasta => {
            from_fasta(fasta::parse_lines(&lines).map_err(|e| AlnError::Fasta(e.to_string()))?)
        }
        Input::Text(text) => Payload { seqs: vec![Sequence::from(text)], ..Payload::default() },
        Input::Lines(lines) => Payload {
            seqs: lines.into_iter().map(Sequence::from).collect(),
            ..Payload::default()
        },
        Input::Nested(nested) if kind == InputKind::KvPairs => {
            let (names, seqs) = nested
                .into_iter()
                .map(|mut pair| {
                    let seq = pair.pop().unwrap_or_default();
                    let name = pair.pop().unwrap_or_default();
                    (name, Sequence::from(seq))
                })
                .unzip();
            Payload { seqs, names: Some(names) }
        }
        Input::Nested(nested) => Payload {
            seqs: nested.into_iter().map(|items| Sequence::from(items.concat())).collect(),
            ..Payload::default()
        },
        Input::Map(map) => {
            let (names, seqs) = map.into_iter().map(|(n, s)| (n, Sequence::from(s))).unzip();
            Payload { seqs, names: Some(names) }
        }
        Input::Pairs(pairs) => {
            let (names, seqs) = pairs.into_iter().unzip();
            Payload { seqs, names: Some(names) }
        }
    };
    Ok(payload)
}

fn from_instance<T: NamedSeqs>(inst: &T) -> Payload {
    Payload {
        seqs: inst.iter_seqs().map(|s| s.into_owned()).collect(),
        names: Some(inst.names().to_vec()),
    }
}

fn from_fasta(records: Vec<fasta::FastaRecord>) -> Payload {
    let (names, seqs) = records
        .into_iter()
        .map(|r| {
            let mut seq = Sequence::named(r.id.clone(), r.seq);
            if let Some(desc) = r.desc {
                seq.info.insert("description".into(), desc);
            }
            (r.id, seq)
        })
        .unzip();
    Payload { seqs, names: Some(names) }
}

/// Validated, named and normalized members in iteration order.
#[derive(Debug)]
pub(crate) struct Members {
    pub names: Vec<String>,
    pub seqs: Vec<Sequence>,
    pub moltype: MolType,
    pub info: Info,
}

/// Construction options shared by collections and both alignment storages.
///
/// ```
/// use alnkit::seqs::{Input, NamedSeqs, SeqsBuilder};
///
/// let seqs = SeqsBuilder::new()
///     .label_to_name(|n| n.to_uppercase())
///     .collection(Input::from(vec![("a", "AC"), ("b", "GT")]))
///     .unwrap();
/// assert_eq!(seqs.names(), ["A", "B"]);
/// ```
#[derive(Default)]
pub struct SeqsBuilder {
    names: Option<Vec<String>>,
    moltype: MolType,
    label_to_name: Option<Box<dyn Fn(&str) -> String + Send + Sync>>,
    remove_duplicate_names: bool,
    info: Info,
}

impl SeqsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names for unnamed input (assigned by position), or the members to keep
    /// and their order when the input carries names.
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn moltype(mut self, moltype: MolType) -> Self {
        self.moltype = moltype;
        self
    }

    /// Maps every source label to a member name before uniqueness checks.
    pub fn label_to_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.label_to_name = Some(Box::new(f));
        self
    }

    /// Keep the first of several same-named members instead of failing.
    pub fn remove_duplicate_names(mut self, yes: bool) -> Self {
        self.remove_duplicate_names = yes;
        self
    }

    pub fn info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }

    pub fn collection(&self, input: impl Into<Input>) -> Result<SequenceCollection> {
        Ok(SequenceCollection::from_members(self.members(input.into())?))
    }

    /// Alignment backed by per-row sequence objects.
    pub fn alignment(&self, input: impl Into<Input>) -> Result<Alignment> {
        Alignment::from_members(self.members(input.into())?, false)
    }

    /// Alignment backed by the dense code grid.
    pub fn array_alignment(&self, input: impl Into<Input>) -> Result<Alignment> {
        Alignment::from_members(self.members(input.into())?, true)
    }

    pub(crate) fn members(&self, input: Input) -> Result<Members> {
        let inherited_moltype = match &input {
            Input::Alignment(a) => Some(a.moltype()),
            Input::Collection(c) => Some(c.moltype()),
            _ => None,
        };
        let moltype = match (self.moltype, inherited_moltype) {
            (MolType::Bytes, Some(mt)) => mt,
            (mt, _) => mt,
        };
        let inherited_info = match &input {
            Input::Alignment(a) => Some(a.info.clone()),
            Input::Collection(c) => Some(c.info.clone()),
            _ => None,
        };

        let payload = to_payload(input, moltype)?;
        let synthesized = payload.names.is_none() && payload.seqs.iter().all(|s| s.name.is_none());

        let mut labels: Vec<String> = match payload.names {
            Some(names) => names,
            None => payload
                .seqs
                .iter()
                .enumerate()
                .map(|(i, s)| s.name.clone().unwrap_or_else(|| format!("seq_{}", i)))
                .collect(),
        };
        if let Some(f) = &self.label_to_name {
            labels = labels.iter().map(|l| f(l)).collect();
        }

        let mut seen = HashSet::with_capacity(labels.len());
        let mut names = Vec::with_capacity(labels.len());
        let mut seqs = Vec::with_capacity(labels.len());
        for (label, seq) in labels.into_iter().zip(payload.seqs) {
            if !seen.insert(label.clone()) {
                if self.remove_duplicate_names {
                    debug!("dropping duplicate sequence '{}'", label);
                    continue;
                }
                return Err(AlnError::DuplicateName(label));
            }
            names.push(label);
            seqs.push(seq);
        }

        if let Some(explicit) = &self.names {
            if synthesized && explicit.len() == names.len() {
                names = explicit.clone();
                let unique: HashSet<&String> = names.iter().collect();
                if unique.len() != names.len() {
                    let dup = names.iter().find(|n| names.iter().filter(|m| m == n).count() > 1);
                    return Err(AlnError::DuplicateName(dup.cloned().unwrap_or_default()));
                }
            } else {
                let mut by_name: HashMap<String, Sequence> = names.into_iter().zip(seqs).collect();
                let mut picked = Vec::with_capacity(explicit.len());
                for name in explicit {
                    let seq = by_name.remove(name).ok_or_else(|| {
                        if picked.iter().any(|(n, _): &(String, Sequence)| n == name) {
                            AlnError::DuplicateName(name.clone())
                        } else {
                            AlnError::UnknownName(name.clone())
                        }
                    })?;
                    picked.push((name.clone(), seq));
                }
                (names, seqs) = picked.into_iter().unzip();
            }
        }

        let seqs = names
            .iter()
            .zip(seqs)
            .map(|(name, seq)| {
                let data = moltype.normalize(seq.as_bytes())?;
                Ok(Sequence::from_vec(Some(name.clone()), data, seq.info))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut info = inherited_info.unwrap_or_default();
        info.extend(self.info.clone());
        Ok(Members { names, seqs, moltype, info })
    }
}

impl From<Array2<u8>> for Input {
    fn from(a: Array2<u8>) -> Self {
        Input::Array(a)
    }
}

impl From<Vec<Sequence>> for Input {
    fn from(v: Vec<Sequence>) -> Self {
        Input::Seqs(v)
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Input::Text(s.to_string())
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Input::Text(s)
    }
}

impl From<Vec<String>> for Input {
    fn from(v: Vec<String>) -> Self {
        Input::Lines(v)
    }
}

impl From<Vec<&str>> for Input {
    fn from(v: Vec<&str>) -> Self {
        Input::Lines(v.into_iter().map(String::from).collect())
    }
}

impl From<Vec<Vec<String>>> for Input {
    fn from(v: Vec<Vec<String>>) -> Self {
        Input::Nested(v)
    }
}

impl From<Vec<Vec<&str>>> for Input {
    fn from(v: Vec<Vec<&str>>) -> Self {
        Input::Nested(v.into_iter().map(|inner| inner.into_iter().map(String::from).collect()).collect())
    }
}

impl From<BTreeMap<String, String>> for Input {
    fn from(m: BTreeMap<String, String>) -> Self {
        Input::Map(m)
    }
}

impl From<Vec<(&str, &str)>> for Input {
    fn from(v: Vec<(&str, &str)>) -> Self {
        Input::Pairs(v.into_iter().map(|(n, s)| (n.to_string(), Sequence::from(s))).collect())
    }
}

impl From<Vec<(String, Sequence)>> for Input {
    fn from(v: Vec<(String, Sequence)>) -> Self {
        Input::Pairs(v)
    }
}

impl From<SequenceCollection> for Input {
    fn from(c: SequenceCollection) -> Self {
        Input::Collection(c)
    }
}

impl From<Alignment> for Input {
    fn from(a: Alignment) -> Self {
        Input::Alignment(a)
    }
}
