//! 列上的滑动窗口
//!
//! Sliding windows over alignment columns. The view is restartable: each
//! `iter()` starts again from the first column.

use super::Alignment;
use crate::error::{AlnError, Result};

/// Fixed-width column windows over a borrowed alignment.
///
/// The view holds no cursor: each call to [`iter`](SlidingWindows::iter)
/// starts again from the first column.
#[derive(Debug, Clone, Copy)]
pub struct SlidingWindows<'a> {
    aln: &'a Alignment,
    window: usize,
    step: usize,
}

impl<'a> SlidingWindows<'a> {
    pub fn iter(&self) -> WindowIter<'a> {
        WindowIter { view: *self, start: 0 }
    }

    /// Number of windows that fit.
    pub fn len(&self) -> usize {
        let width = self.aln.num_columns();
        if width < self.window {
            0
        } else {
            (width - self.window) / self.step + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> IntoIterator for SlidingWindows<'a> {
    type Item = Alignment;
    type IntoIter = WindowIter<'a>;

    fn into_iter(self) -> WindowIter<'a> {
        self.iter()
    }
}

impl<'a> IntoIterator for &SlidingWindows<'a> {
    type Item = Alignment;
    type IntoIter = WindowIter<'a>;

    fn into_iter(self) -> WindowIter<'a> {
        self.iter()
    }
}

pub struct WindowIter<'a> {
    view: SlidingWindows<'a>,
    start: usize,
}

impl Iterator for WindowIter<'_> {
    type Item = Alignment;

    fn next(&mut self) -> Option<Alignment> {
        let SlidingWindows { aln, window, step } = self.view;
        let end = self.start + window;
        if end > aln.num_columns() {
            return None;
        }
        let cols: Vec<usize> = (self.start..end).collect();
        self.start += step;
        Some(aln.with_columns(&cols))
    }
}

impl Alignment {
    /// Sub-alignments `window` columns wide, advancing by `step`, while a
    /// full window still fits.
    pub fn sliding_windows(&self, window: usize, step: usize) -> Result<SlidingWindows<'_>> {
        if window == 0 || step == 0 {
            return Err(AlnError::InvalidArgument("window and step must be positive".into()));
        }
        Ok(SlidingWindows { aln: self, window, step })
    }
}
