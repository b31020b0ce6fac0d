use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AlnError, Result};

pub const GAP: u8 = b'-';
pub const MISSING: u8 = b'?';

// code order: canonical alphabet, gap, ambiguity codes, missing
const DNA_TABLE: &[u8] = b"TCAG-RYWSKMBDHVN?";
const RNA_TABLE: &[u8] = b"UCAG-RYWSKMBDHVN?";
const PROTEIN_TABLE: &[u8] = b"ACDEFGHIKLMNPQRSTUVWY-BZJX?";

const DNA_AMBIGUITIES: &[(u8, &[u8])] = &[
    (b'R', b"AG"),
    (b'Y', b"CT"),
    (b'W', b"AT"),
    (b'S', b"CG"),
    (b'K', b"GT"),
    (b'M', b"AC"),
    (b'B', b"CGT"),
    (b'D', b"AGT"),
    (b'H', b"ACT"),
    (b'V', b"ACG"),
    (b'N', b"ACGT"),
    (b'?', b"ACGT-"),
];

const RNA_AMBIGUITIES: &[(u8, &[u8])] = &[
    (b'R', b"AG"),
    (b'Y', b"CU"),
    (b'W', b"AU"),
    (b'S', b"CG"),
    (b'K', b"GU"),
    (b'M', b"AC"),
    (b'B', b"CGU"),
    (b'D', b"AGU"),
    (b'H', b"ACU"),
    (b'V', b"ACG"),
    (b'N', b"ACGU"),
    (b'?', b"ACGU-"),
];

const PROTEIN_AMBIGUITIES: &[(u8, &[u8])] = &[
    (b'B', b"DN"),
    (b'Z', b"EQ"),
    (b'J', b"IL"),
    (b'X', b"ACDEFGHIKLMNPQRSTUVWY"),
    (b'?', b"ACDEFGHIKLMNPQRSTUVWY-"),
];

/// Molecular type of a set of sequences.
///
/// Supplies the legal symbols, the symbol <-> integer code mapping used by the
/// dense alignment grid, the gap and missing symbols, and the ambiguity
/// expansion table. `Bytes` accepts any byte and uses the byte value as code;
/// it has no ambiguity codes apart from `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MolType {
    #[default]
    Bytes,
    Dna,
    Rna,
    Protein,
}

impl MolType {
    pub fn label(self) -> &'static str {
        match self {
            MolType::Bytes => "bytes",
            MolType::Dna => "dna",
            MolType::Rna => "rna",
            MolType::Protein => "protein",
        }
    }

    fn table(self) -> Option<&'static [u8]> {
        match self {
            MolType::Bytes => None,
            MolType::Dna => Some(DNA_TABLE),
            MolType::Rna => Some(RNA_TABLE),
            MolType::Protein => Some(PROTEIN_TABLE),
        }
    }

    fn ambiguities(self) -> &'static [(u8, &'static [u8])] {
        match self {
            MolType::Bytes => &[],
            MolType::Dna => DNA_AMBIGUITIES,
            MolType::Rna => RNA_AMBIGUITIES,
            MolType::Protein => PROTEIN_AMBIGUITIES,
        }
    }

    /// Concrete (non-gap, non-ambiguous) symbols in code order. Empty for
    /// `Bytes`, whose alphabet is whatever the data contains.
    pub fn alphabet(self) -> &'static [u8] {
        match self {
            MolType::Bytes => &[],
            MolType::Dna => &DNA_TABLE[..4],
            MolType::Rna => &RNA_TABLE[..4],
            MolType::Protein => &PROTEIN_TABLE[..21],
        }
    }

    /// Symbol used for positions of unknown content.
    pub fn missing(self) -> u8 {
        MISSING
    }

    pub fn gap(self) -> u8 {
        GAP
    }

    /// The ambiguity code that covers the whole canonical alphabet.
    pub fn any_symbol(self) -> Option<u8> {
        match self {
            MolType::Bytes => None,
            MolType::Dna | MolType::Rna => Some(b'N'),
            MolType::Protein => Some(b'X'),
        }
    }

    #[inline]
    pub fn is_gap(self, sym: u8) -> bool {
        sym == GAP
    }

    /// Gap or missing; both are removed by degapping.
    #[inline]
    pub fn is_gap_or_missing(self, sym: u8) -> bool {
        sym == GAP || sym == MISSING
    }

    /// True for ambiguity codes, including the missing symbol.
    pub fn is_degenerate(self, sym: u8) -> bool {
        sym == MISSING || self.ambiguities().iter().any(|&(code, _)| code == sym)
    }

    /// Upper-cases symbols for the biological types; leaves bytes untouched.
    #[inline]
    pub fn normalize_symbol(self, sym: u8) -> u8 {
        match self {
            MolType::Bytes => sym,
            _ => sym.to_ascii_uppercase(),
        }
    }

    #[inline]
    pub fn encode(self, sym: u8) -> Option<u8> {
        match self.table() {
            None => Some(sym),
            Some(table) => {
                let up = self.normalize_symbol(sym);
                table.iter().position(|&s| s == up).map(|i| i as u8)
            }
        }
    }

    /// Like [`encode`](MolType::encode), for symbols already validated.
    /// Anything without a code decodes back as the missing symbol.
    #[inline]
    pub fn encode_lossy(self, sym: u8) -> u8 {
        self.encode(sym).unwrap_or(u8::MAX)
    }

    #[inline]
    pub fn decode(self, code: u8) -> u8 {
        match self.table() {
            None => code,
            Some(table) => table.get(code as usize).copied().unwrap_or(MISSING),
        }
    }

    /// Normalizes and validates raw symbols.
    pub fn normalize(self, seq: &[u8]) -> Result<Vec<u8>> {
        seq.iter()
            .map(|&b| {
                let up = self.normalize_symbol(b);
                if self.encode(up).is_some() {
                    Ok(up)
                } else {
                    Err(AlnError::InvalidSymbol { symbol: b as char, moltype: self.label() })
                }
            })
            .collect()
    }

    pub fn encode_seq(self, seq: &[u8]) -> Result<Vec<u8>> {
        seq.iter()
            .map(|&b| {
                self.encode(b)
                    .ok_or(AlnError::InvalidSymbol { symbol: b as char, moltype: self.label() })
            })
            .collect()
    }

    pub fn decode_seq(self, codes: &[u8]) -> Vec<u8> {
        codes.iter().map(|&c| self.decode(c)).collect()
    }

    /// Concrete symbols a symbol may stand for. Canonical symbols and the gap
    /// resolve to themselves.
    pub fn resolve(self, sym: u8) -> Vec<u8> {
        let up = self.normalize_symbol(sym);
        match self.ambiguities().iter().find(|&&(code, _)| code == up) {
            Some(&(_, set)) => set.to_vec(),
            None if up == MISSING => {
                let mut all = self.alphabet().to_vec();
                all.push(GAP);
                all
            }
            None => vec![up],
        }
    }

    /// Smallest symbol that covers every observed symbol.
    ///
    /// A single resolved symbol is returned as is; a set that mixes gaps with
    /// residues gives the missing symbol; otherwise the ambiguity code with
    /// exactly that expansion, falling back to the "any" code.
    pub fn degenerate_from(self, observed: &[u8]) -> Result<u8> {
        let distinct: BTreeSet<u8> = observed.iter().map(|&s| self.normalize_symbol(s)).collect();
        if distinct.is_empty() {
            return Err(AlnError::InvalidArgument("no symbols to cover".into()));
        }
        if distinct.len() == 1 {
            if let Some(&only) = distinct.iter().next() {
                return Ok(only);
            }
        }
        let resolved: BTreeSet<u8> = distinct.iter().flat_map(|&s| self.resolve(s)).collect();
        if resolved.len() == 1 {
            if let Some(&only) = resolved.iter().next() {
                return Ok(only);
            }
        }
        if resolved.contains(&GAP) {
            return Ok(MISSING);
        }
        let matching = self.ambiguities().iter().find(|&&(code, set)| {
            code != MISSING && set.len() == resolved.len() && set.iter().all(|s| resolved.contains(s))
        });
        match (matching, self.any_symbol()) {
            (Some(&(code, _)), _) => Ok(code),
            (None, Some(any)) => Ok(any),
            (None, None) => Err(AlnError::InvalidArgument(format!(
                "{} has no ambiguity codes",
                self.label()
            ))),
        }
    }
}

impl std::fmt::Display for MolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
