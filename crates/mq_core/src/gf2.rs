//! Binary matrices and Gaussian elimination over GF(2).
//!
//! Addition is exclusive-or and multiplication is AND. Every operation
//! works on a copy of its input; callers keep their matrices unchanged.

use crate::{CoreError, CoreResult};
use bitvec::prelude::*;
use core::fmt;

/// A packed row (or column vector) of bits.
pub type Gf2Row = BitVec<u64, Lsb0>;

/// Returns an all-zero row of the given length.
pub fn zero_row(len: usize) -> Gf2Row {
    BitVec::repeat(false, len)
}

/// Adds `src` into `dst` (bit-wise XOR), one machine word at a time.
///
/// Both rows must have the same length; the unused tail bits of the last
/// word are zero in both, so they stay zero.
#[inline(always)]
pub fn xor_into(dst: &mut Gf2Row, src: &Gf2Row) {
    debug_assert_eq!(dst.len(), src.len());
    for (d, s) in dst.as_raw_mut_slice().iter_mut().zip(src.as_raw_slice()) {
        *d ^= *s;
    }
}

/// Dot product of two rows over GF(2).
#[inline(always)]
pub fn dot(a: &BitSlice<u64, Lsb0>, b: &BitSlice<u64, Lsb0>) -> bool {
    a.iter_ones().filter(|&i| b[i]).count() % 2 == 1
}

/// Dense binary matrix with packed rows.
#[derive(Clone, PartialEq, Eq)]
pub struct Gf2Matrix {
    rows: Vec<Gf2Row>,
    cols: usize,
}

impl Gf2Matrix {
    /// All-zero matrix of the given shape.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| zero_row(cols)).collect(),
            cols,
        }
    }

    /// The `n x n` identity.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.rows[i].set(i, true);
        }
        m
    }

    /// Builds a matrix from rows of integer entries.
    ///
    /// # Errors
    ///
    /// `InvalidMatrix` if an entry is not 0 or 1 or the rows are ragged.
    /// Values are never coerced.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> CoreResult<Self> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut packed = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(CoreError::InvalidMatrix(format!(
                    "row {i} has {} entries, expected {cols}",
                    row.len()
                )));
            }
            let mut bits = zero_row(cols);
            for (j, &value) in row.iter().enumerate() {
                match value {
                    0 => {}
                    1 => bits.set(j, true),
                    other => {
                        return Err(CoreError::InvalidMatrix(format!(
                            "entry ({i}, {j}) is {other}, expected 0 or 1"
                        )));
                    }
                }
            }
            packed.push(bits);
        }

        Ok(Self { rows: packed, cols })
    }

    /// Builds a matrix from already packed rows of length `cols`.
    pub fn from_bit_rows(rows: Vec<Gf2Row>, cols: usize) -> CoreResult<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(CoreError::InvalidMatrix(format!(
                "row {i} has {} bits, expected {cols}",
                row.len()
            )));
        }
        Ok(Self { rows, cols })
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    /// Entry at row `r`, column `c`.
    ///
    /// # Panics
    ///
    /// If either index is out of range.
    pub fn get(&self, r: usize, c: usize) -> bool {
        self.rows[r][c]
    }

    /// Overwrites one entry. Panics on an out-of-range index, like `get`.
    pub fn set(&mut self, r: usize, c: usize, value: bool) {
        self.rows[r].set(c, value);
    }

    /// Row `r` as a packed bit vector.
    pub fn row(&self, r: usize) -> &Gf2Row {
        &self.rows[r]
    }

    pub fn rows(&self) -> &[Gf2Row] {
        &self.rows
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows.len());
        for (r, row) in self.rows.iter().enumerate() {
            for c in row.iter_ones() {
                t.rows[c].set(r, true);
            }
        }
        t
    }

    /// Vertical concatenation of `self` over `other`.
    pub fn stack(&self, other: &Gf2Matrix) -> CoreResult<Self> {
        if self.cols != other.cols {
            return Err(CoreError::InvalidMatrix(format!(
                "cannot stack {} columns over {} columns",
                self.cols, other.cols
            )));
        }
        let mut rows = self.rows.clone();
        rows.extend(other.rows.iter().cloned());
        Ok(Self {
            rows,
            cols: self.cols,
        })
    }

    /// Matrix product modulo 2.
    pub fn mul(&self, other: &Gf2Matrix) -> CoreResult<Self> {
        if self.cols != other.rows.len() {
            return Err(CoreError::InvalidMatrix(format!(
                "shape mismatch: {}x{} times {}x{}",
                self.rows.len(),
                self.cols,
                other.rows.len(),
                other.cols
            )));
        }
        let mut out = Self::zeros(self.rows.len(), other.cols);
        for (r, row) in self.rows.iter().enumerate() {
            for k in row.iter_ones() {
                xor_into(&mut out.rows[r], &other.rows[k]);
            }
        }
        Ok(out)
    }

    /// Matrix-vector product modulo 2.
    pub fn mul_vec(&self, v: &BitSlice<u64, Lsb0>) -> CoreResult<Gf2Row> {
        if v.len() != self.cols {
            return Err(CoreError::InvalidMatrix(format!(
                "vector of length {} against {} columns",
                v.len(),
                self.cols
            )));
        }
        let mut out = zero_row(self.rows.len());
        for (r, row) in self.rows.iter().enumerate() {
            if dot(row, v) {
                out.set(r, true);
            }
        }
        Ok(out)
    }

    /// Reduced row-echelon form and the pivot column of each nonzero row.
    ///
    /// Columns are scanned left to right; the pivot for a column is the
    /// lowest-indexed remaining row with a 1 there.
    pub fn row_reduce(&self) -> (Self, Vec<usize>) {
        let mut m = self.clone();
        let mut pivots = Vec::new();
        let mut next = 0;

        for col in 0..m.cols {
            if next == m.rows.len() {
                break;
            }
            let Some(found) = (next..m.rows.len()).find(|&r| m.rows[r][col]) else {
                continue;
            };
            m.rows.swap(next, found);

            let pivot = m.rows[next].clone();
            for r in 0..m.rows.len() {
                if r != next && m.rows[r][col] {
                    xor_into(&mut m.rows[r], &pivot);
                }
            }

            pivots.push(col);
            next += 1;
        }

        (m, pivots)
    }

    /// Rank over GF(2).
    ///
    /// # Returns
    ///
    /// The number of pivots found by [`Gf2Matrix::row_reduce`].
    pub fn rank(&self) -> usize {
        self.row_reduce().1.len()
    }

    /// Basis of `{x : Mx = 0}`.
    ///
    /// One vector per free column, in ascending order of that column; the
    /// vector has a 1 at its free column and zeros at every other free
    /// column.
    pub fn nullspace(&self) -> Vec<Gf2Row> {
        let (rref, pivots) = self.row_reduce();
        let mut is_pivot = vec![false; self.cols];
        for &p in &pivots {
            is_pivot[p] = true;
        }

        (0..self.cols)
            .filter(|&c| !is_pivot[c])
            .map(|free| {
                let mut v = zero_row(self.cols);
                v.set(free, true);
                for (r, &p) in pivots.iter().enumerate() {
                    if rref.rows[r][free] {
                        v.set(p, true);
                    }
                }
                v
            })
            .collect()
    }

    /// One solution of `Mx = rhs`, with every free variable set to zero.
    ///
    /// Returns `Ok(None)` when the system is inconsistent.
    pub fn solve(&self, rhs: &BitSlice<u64, Lsb0>) -> CoreResult<Option<Gf2Row>> {
        if rhs.len() != self.rows.len() {
            return Err(CoreError::InvalidMatrix(format!(
                "right-hand side of length {} against {} rows",
                rhs.len(),
                self.rows.len()
            )));
        }

        let width = self.cols + 1;
        let augmented: Vec<Gf2Row> = self
            .rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                let mut a = zero_row(width);
                for c in row.iter_ones() {
                    a.set(c, true);
                }
                a.set(self.cols, rhs[r]);
                a
            })
            .collect();
        let (rref, pivots) = Self {
            rows: augmented,
            cols: width,
        }
        .row_reduce();

        if pivots.last() == Some(&self.cols) {
            return Ok(None);
        }

        let mut x = zero_row(self.cols);
        for (r, &p) in pivots.iter().enumerate() {
            if rref.rows[r][self.cols] {
                x.set(p, true);
            }
        }
        Ok(Some(x))
    }
}

impl fmt::Debug for Gf2Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Gf2Matrix {}x{}", self.rows.len(), self.cols)?;
        for row in &self.rows {
            for bit in row.iter().by_vals() {
                write!(f, "{}", bit as u8)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[&[u8]]) -> Gf2Matrix {
        Gf2Matrix::from_rows(rows).unwrap()
    }

    #[test]
    fn rejects_non_binary_entries() {
        let err = Gf2Matrix::from_rows(&[[0u8, 2]]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidMatrix(_)));
    }

    #[test]
    fn rejects_ragged_rows() {
        let rows: Vec<Vec<u8>> = vec![vec![1, 0], vec![1]];
        assert!(Gf2Matrix::from_rows(&rows).is_err());
    }

    #[test]
    fn row_reduce_picks_lowest_pivot_row() {
        let a = m(&[&[0, 1, 1], &[1, 1, 0], &[1, 0, 1]]);
        let (rref, pivots) = a.row_reduce();
        assert_eq!(pivots, vec![0, 1]);
        assert_eq!(rref, m(&[&[1, 0, 1], &[0, 1, 1], &[0, 0, 0]]));
        assert_eq!(a.rank(), 2);
    }

    #[test]
    fn nullspace_is_ordered_by_free_column() {
        let a = m(&[&[1, 1, 0, 0], &[0, 0, 1, 1]]);
        let basis = a.nullspace();
        assert_eq!(basis.len(), 2);
        assert_eq!(basis[0], bitvec![u64, Lsb0; 1, 1, 0, 0]);
        assert_eq!(basis[1], bitvec![u64, Lsb0; 0, 0, 1, 1]);
        for v in &basis {
            assert!(a.mul_vec(v).unwrap().not_any());
        }
    }

    #[test]
    fn solve_detects_inconsistency() {
        let a = m(&[&[1, 1], &[1, 1]]);
        let rhs = bitvec![u64, Lsb0; 1, 0];
        assert_eq!(a.solve(&rhs).unwrap(), None);

        let rhs = bitvec![u64, Lsb0; 1, 1];
        let x = a.solve(&rhs).unwrap().unwrap();
        assert_eq!(a.mul_vec(&x).unwrap(), rhs);
    }

    #[test]
    fn product_and_transpose() {
        let a = m(&[&[1, 0, 1], &[0, 1, 1]]);
        let at = a.transpose();
        let p = a.mul(&at).unwrap();
        assert_eq!(p, m(&[&[0, 1], &[1, 0]]));
        assert!(a.mul(&a).is_err());
    }

    #[test]
    fn empty_system_has_full_nullspace() {
        let a = Gf2Matrix::zeros(0, 3);
        assert_eq!(a.nullspace().len(), 3);
        assert_eq!(a.solve(&zero_row(0)).unwrap(), Some(zero_row(3)));
    }
}
