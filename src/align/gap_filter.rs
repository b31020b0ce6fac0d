//! 基于参考序列的缺口模式过滤
//!
//! A sequence passes when its gaps line up well enough with a template's:
//! few positions where exactly one of the two is gapped, and no long run of
//! such positions on either side.

use crate::error::{AlnError, Result};
use crate::seqs::Sequence;
use crate::util::moltype::MolType;

#[derive(Debug, Clone)]
pub struct GapFilter {
    template_gaps: Vec<bool>,
    gap_fraction: f64,
    gap_run: usize,
}

/// True if `flags` holds `run` consecutive `true` values.
fn has_run(flags: impl Iterator<Item = bool>, run: usize) -> bool {
    let mut current = 0;
    for f in flags {
        current = if f { current + 1 } else { 0 };
        if current >= run {
            return true;
        }
    }
    false
}

impl GapFilter {
    /// `gap_fraction` bounds the share of positions gapped in exactly one of
    /// template and sequence; runs of `gap_run` such positions fail.
    pub fn new(template: &Sequence, gap_fraction: f64, gap_run: usize) -> Self {
        Self { template_gaps: template.gap_vector(MolType::Bytes), gap_fraction, gap_run }
    }

    pub fn accepts(&self, seq: &Sequence) -> Result<bool> {
        if seq.len() != self.template_gaps.len() {
            return Err(AlnError::LengthMismatch(format!(
                "sequence of length {} against a template of length {}",
                seq.len(),
                self.template_gaps.len()
            )));
        }
        let gaps = seq.gap_vector(MolType::Bytes);
        let pairs = || gaps.iter().zip(&self.template_gaps);

        let differing = pairs().filter(|(s, t)| s != t).count();
        if !gaps.is_empty() && differing as f64 / gaps.len() as f64 > self.gap_fraction {
            return Ok(false);
        }
        // gaps opened in the sequence, then insertions relative to the template
        if has_run(pairs().map(|(&s, &t)| s && !t), self.gap_run) {
            return Ok(false);
        }
        Ok(!has_run(pairs().map(|(&s, &t)| t && !s), self.gap_run))
    }
}
