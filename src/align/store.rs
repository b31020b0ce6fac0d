use std::borrow::Cow;
use std::sync::OnceLock;

use ndarray::{Array2, ArrayView1, Axis};

use crate::seqs::Sequence;
use crate::util::moltype::MolType;

/// Row storage behind an [`Alignment`](super::Alignment).
///
/// Both variants expose the same `(columns, rows)` grid of symbol codes, so
/// positional code never looks at the variant.
#[derive(Debug, Clone)]
pub(crate) enum Store {
    /// Codes only; per-row metadata is not kept.
    Dense(Array2<u8>),
    /// Row objects with their metadata. The grid is built on first use.
    Seqs { rows: Vec<Sequence>, grid: OnceLock<Array2<u8>> },
}

/// Encodes equal-length rows into a `(columns, rows)` grid.
pub(crate) fn encode_rows<'a, I>(rows: I, num_columns: usize, moltype: MolType) -> Array2<u8>
where
    I: ExactSizeIterator<Item = &'a [u8]>,
{
    let mut grid = Array2::<u8>::zeros((num_columns, rows.len()));
    for (mut col, row) in grid.axis_iter_mut(Axis(1)).zip(rows) {
        for (cell, &sym) in col.iter_mut().zip(row) {
            *cell = moltype.encode_lossy(sym);
        }
    }
    grid
}

fn decode_lane(lane: ArrayView1<'_, u8>, moltype: MolType) -> Vec<u8> {
    lane.iter().map(|&c| moltype.decode(c)).collect()
}

impl Store {
    pub fn from_rows(rows: Vec<Sequence>) -> Self {
        Store::Seqs { rows, grid: OnceLock::new() }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Store::Dense(_))
    }

    pub fn num_rows(&self) -> usize {
        match self {
            Store::Dense(g) => g.ncols(),
            Store::Seqs { rows, .. } => rows.len(),
        }
    }

    pub fn num_columns(&self) -> usize {
        match self {
            Store::Dense(g) => g.nrows(),
            Store::Seqs { rows, grid } => match grid.get() {
                Some(g) => g.nrows(),
                None => rows.first().map_or(0, Sequence::len),
            },
        }
    }

    /// The code grid, shape `(columns, rows)`.
    pub fn grid(&self, moltype: MolType) -> &Array2<u8> {
        match self {
            Store::Dense(g) => g,
            Store::Seqs { rows, grid } => grid.get_or_init(|| {
                let width = rows.first().map_or(0, Sequence::len);
                encode_rows(rows.iter().map(Sequence::as_bytes), width, moltype)
            }),
        }
    }

    /// Row `i`, named `name`.
    pub fn row(&self, i: usize, name: &str, moltype: MolType) -> Cow<'_, Sequence> {
        match self {
            Store::Dense(g) => Cow::Owned(Sequence::named(name, decode_lane(g.column(i), moltype))),
            Store::Seqs { rows, .. } => Cow::Borrowed(&rows[i]),
        }
    }

    /// Same rows over a new grid of the same row count.
    pub fn with_grid(&self, grid: Array2<u8>, moltype: MolType) -> Store {
        match self {
            Store::Dense(_) => Store::Dense(grid),
            Store::Seqs { rows, .. } => {
                let rows = rows
                    .iter()
                    .zip(grid.axis_iter(Axis(1)))
                    .map(|(row, lane)| row.with_data(decode_lane(lane, moltype)))
                    .collect();
                Store::Seqs { rows, grid: OnceLock::from(grid) }
            }
        }
    }

    /// Rows picked (and possibly reordered) by store index.
    pub fn with_rows(&self, picked: &[usize]) -> Store {
        match self {
            Store::Dense(g) => Store::Dense(g.select(Axis(1), picked)),
            Store::Seqs { rows, grid } => {
                let rows = picked.iter().map(|&i| rows[i].clone()).collect();
                let grid = match grid.get() {
                    Some(g) => OnceLock::from(g.select(Axis(1), picked)),
                    None => OnceLock::new(),
                };
                Store::Seqs { rows, grid }
            }
        }
    }

    pub fn to_dense(&self, moltype: MolType) -> Store {
        Store::Dense(self.grid(moltype).clone())
    }

    /// Row objects from the grid; `names` are indexed by store row.
    pub fn to_seqs(&self, names: &[String], moltype: MolType) -> Store {
        match self {
            Store::Seqs { .. } => self.clone(),
            Store::Dense(g) => {
                let rows = g
                    .axis_iter(Axis(1))
                    .zip(names)
                    .map(|(lane, name)| Sequence::named(name.clone(), decode_lane(lane, moltype)))
                    .collect();
                Store::Seqs { rows, grid: OnceLock::from(g.clone()) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<Sequence> {
        vec![Sequence::named("a", "AC-G"), Sequence::named("b", "ACTG").with_info("k", "v")]
    }

    #[test]
    fn grid_is_column_major() {
        let store = Store::from_rows(rows());
        let grid = store.grid(MolType::Dna);
        assert_eq!(grid.dim(), (4, 2));
        // column 2 holds the gap of row a and the T of row b
        assert_eq!(grid[[2, 0]], MolType::Dna.encode(b'-').unwrap());
        assert_eq!(grid[[2, 1]], 0);
        assert_eq!(store.num_columns(), 4);
        assert_eq!(store.num_rows(), 2);
    }

    #[test]
    fn dense_and_object_rows_agree() {
        let obj = Store::from_rows(rows());
        let dense = obj.to_dense(MolType::Dna);
        assert!(dense.is_dense());
        for (i, name) in ["a", "b"].iter().enumerate() {
            assert!(obj.row(i, name, MolType::Dna).same_content(&dense.row(i, name, MolType::Dna)));
        }
        let back = dense.to_seqs(&["a".into(), "b".into()], MolType::Dna);
        assert_eq!(back.row(1, "b", MolType::Dna).as_bytes(), b"ACTG");
    }

    #[test]
    fn new_grid_keeps_row_info() {
        let obj = Store::from_rows(rows());
        let narrowed = obj.grid(MolType::Dna).select(Axis(0), &[0, 3]);
        let out = obj.with_grid(narrowed, MolType::Dna);
        let b = out.row(1, "b", MolType::Dna);
        assert_eq!(b.as_bytes(), b"AG");
        assert_eq!(b.info["k"], "v");
    }

    #[test]
    fn row_selection() {
        let dense = Store::from_rows(rows()).to_dense(MolType::Dna);
        let picked = dense.with_rows(&[1]);
        assert_eq!(picked.num_rows(), 1);
        assert_eq!(picked.row(0, "b", MolType::Dna).as_bytes(), b"ACTG");
    }
}
