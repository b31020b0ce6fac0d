//! 序列相似度度量
//!
//! Pairwise metrics used by `get_similar` and `distance_matrix`. A metric takes
//! two sequences and yields a score; the built-in ones require equal lengths.

use crate::error::{AlnError, Result};
use crate::seqs::Sequence;

fn check_lengths(a: &Sequence, b: &Sequence) -> Result<()> {
    if a.len() != b.len() {
        return Err(AlnError::LengthMismatch(format!(
            "cannot compare sequences of length {} and {}",
            a.len(),
            b.len()
        )));
    }
    Ok(())
}

/// Fraction of positions with identical symbols (gaps included).
pub fn frac_same(a: &Sequence, b: &Sequence) -> Result<f64> {
    check_lengths(a, b)?;
    if a.is_empty() {
        return Ok(0.0);
    }
    let same = a.as_bytes().iter().zip(b.as_bytes()).filter(|(x, y)| x == y).count();
    Ok(same as f64 / a.len() as f64)
}

/// Fraction of positions that differ.
pub fn frac_diff(a: &Sequence, b: &Sequence) -> Result<f64> {
    Ok(1.0 - frac_same(a, b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_counts_gaps() {
        let a = Sequence::new("AAAAAAA");
        let b = Sequence::new("A--A-AA");
        let c = Sequence::new("AA-----");
        assert!((frac_same(&a, &b).unwrap() - 4.0 / 7.0).abs() < 1e-12);
        assert!((frac_same(&b, &c).unwrap() - 3.0 / 7.0).abs() < 1e-12);
        assert!((frac_diff(&a, &a).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn identity_rejects_length_mismatch() {
        let err = frac_same(&Sequence::new("AC"), &Sequence::new("ACG")).unwrap_err();
        assert!(matches!(err, AlnError::LengthMismatch(_)));
    }
}
