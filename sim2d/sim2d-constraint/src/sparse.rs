//! Sparse matrices of an island's constraint system.
//!
//! # Sparsity Pattern
//!
//! For an island with N dynamic bodies and M constraint rows the Jacobian is
//! `M × 3N` (x, y, θ per body). A row touches at most two bodies, and static
//! bodies have no columns, so each row holds 3 or 6 non-zeros.
//!
//! The effective mass `A = J · M⁻¹ · Jᵀ` is non-zero at `(i, j)` only when
//! rows `i` and `j` share a dynamic body. [`RowAdjacency`] lists those pairs
//! up front so `A` is assembled without visiting every pair of rows, and `A`
//! reuses its column lists.
//!
//! # Storage
//!
//! Every matrix borrows its storage from caller-provided `f64` words, which
//! the solver carves from the scratch arena. Row offsets and column indices
//! are index words: a `usize` kept in the bits of an `f64`. [`SystemSize`]
//! gives the word counts before anything is reserved. `to_csr` copies a
//! matrix out as a [`CsrMatrix`] for inspection.

use crate::constraint::JacobianRow;
use nalgebra::DMatrix;
use nalgebra_sparse::{CsrMatrix, SparseFormatError};
use std::cmp::Ordering;
use std::ops::Range;

fn encode(index: usize) -> f64 {
    f64::from_bits(index as u64)
}

fn decode(word: f64) -> usize {
    word.to_bits() as usize
}

fn span(offsets: &[f64], i: usize) -> Range<usize> {
    decode(offsets[i])..decode(offsets[i + 1])
}

/// Island-local body indices of a row; `None` for a static end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowBodies {
    /// Body A.
    pub a: Option<usize>,
    /// Body B.
    pub b: Option<usize>,
}

impl RowBodies {
    /// Dynamic bodies of the row, A first.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.a.into_iter().chain(self.b)
    }
}

/// Word counts of an island system, known before assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemSize {
    /// Constraint rows.
    pub rows: usize,
    /// Dynamic bodies.
    pub bodies: usize,
    /// Stored entries of the Jacobian.
    pub jacobian_nnz: usize,
    /// Row entries of the body incidence lists.
    pub incidence: usize,
}

impl SystemSize {
    /// Count the rows of an island over `num_bodies` dynamic bodies.
    #[must_use]
    pub fn new(num_bodies: usize, rows: impl IntoIterator<Item = RowBodies>) -> Self {
        let mut size = Self {
            bodies: num_bodies,
            ..Self::default()
        };
        for ends in rows {
            let touched = ends.iter().count();
            size.rows += 1;
            size.incidence += touched;
            size.jacobian_nnz += 3 * touched;
        }
        size
    }
}

/// Column indices and values of one CSR row.
#[derive(Debug, Clone, Copy)]
pub struct SparseRow<'a> {
    cols: &'a [f64],
    values: &'a [f64],
}

impl<'a> SparseRow<'a> {
    fn new(offsets: &[f64], cols: &'a [f64], values: &'a [f64], i: usize) -> Self {
        let range = span(offsets, i);
        Self {
            cols: &cols[range.clone()],
            values: &values[range],
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row stores nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column indices, ascending.
    pub fn cols(self) -> impl Iterator<Item = usize> + 'a {
        self.cols.iter().map(|&word| decode(word))
    }

    /// Stored values.
    #[must_use]
    pub fn values(self) -> &'a [f64] {
        self.values
    }

    /// `(column, value)` pairs.
    pub fn iter(self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.cols().zip(self.values.iter().copied())
    }
}

/// Constraint Jacobian in CSR format.
#[derive(Debug, Clone, Copy)]
pub struct SparseJacobian<'a> {
    ncols: usize,
    offsets: &'a [f64],
    cols: &'a [f64],
    values: &'a [f64],
}

impl<'a> SparseJacobian<'a> {
    /// Assemble from one `(bodies, row)` entry per constraint row into
    /// `offsets` (`rows + 1` words) and `cols`, `values`
    /// ([`SystemSize::jacobian_nnz`] words each).
    pub fn build(
        num_bodies: usize,
        rows: impl IntoIterator<Item = (RowBodies, JacobianRow)>,
        offsets: &'a mut [f64],
        cols: &'a mut [f64],
        values: &'a mut [f64],
    ) -> Self {
        let mut nnz = 0;
        offsets[0] = encode(0);
        for (i, (bodies, row)) in rows.into_iter().enumerate() {
            let mut ends = [(bodies.a, row.entries_a()), (bodies.b, row.entries_b())];
            // Columns stay ascending within a row.
            if bodies.b < bodies.a {
                ends.swap(0, 1);
            }
            for (body, entries) in ends {
                let Some(body) = body else { continue };
                for (k, value) in entries.into_iter().enumerate() {
                    cols[nnz] = encode(3 * body + k);
                    values[nnz] = value;
                    nnz += 1;
                }
            }
            offsets[i + 1] = encode(nnz);
        }
        Self {
            ncols: 3 * num_bodies,
            offsets,
            cols,
            values,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn nrows(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Number of columns (3 per dynamic body).
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.offsets.last().map_or(0, |&word| decode(word))
    }

    /// Row `i`.
    #[must_use]
    pub fn row(&self, i: usize) -> SparseRow<'a> {
        SparseRow::new(self.offsets, self.cols, self.values, i)
    }

    /// `out = J · v`.
    pub fn mul_vec(&self, v: &[f64], out: &mut [f64]) {
        for (i, out) in out.iter_mut().enumerate().take(self.nrows()) {
            *out = self.row(i).iter().map(|(col, value)| value * v[col]).sum();
        }
    }

    /// `out = Jᵀ · x`.
    pub fn mul_transpose_vec(&self, x: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        for (i, &x) in x.iter().enumerate().take(self.nrows()) {
            for (col, value) in self.row(i).iter() {
                out[col] += value * x;
            }
        }
    }

    /// Heap copy as a nalgebra-sparse matrix.
    pub fn to_csr(&self) -> Result<CsrMatrix<f64>, SparseFormatError> {
        to_csr(self.nrows(), self.ncols, self.offsets, self.cols, self.values)
    }

    /// Dense copy, for inspection.
    #[must_use]
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.nrows(), self.ncols);
        for i in 0..self.nrows() {
            for (col, value) in self.row(i).iter() {
                dense[(i, col)] = value;
            }
        }
        dense
    }
}

/// For every dynamic body, the rows touching it in ascending order.
#[derive(Debug, Clone, Copy)]
pub struct BodyRows<'a> {
    offsets: &'a [f64],
    rows: &'a [f64],
}

impl<'a> BodyRows<'a> {
    /// Counting sort of the rows by body into `offsets` (`bodies + 1` words)
    /// and `rows` ([`SystemSize::incidence`] words).
    pub fn build(
        num_rows: usize,
        ends: impl Fn(usize) -> RowBodies,
        offsets: &'a mut [f64],
        rows: &'a mut [f64],
    ) -> Self {
        offsets.fill(encode(0));
        for i in 0..num_rows {
            for body in ends(i).iter() {
                offsets[body + 1] = encode(decode(offsets[body + 1]) + 1);
            }
        }
        for body in 1..offsets.len() {
            offsets[body] = encode(decode(offsets[body]) + decode(offsets[body - 1]));
        }
        // offsets[b] is now the start of body b and serves as its cursor.
        for i in 0..num_rows {
            for body in ends(i).iter() {
                let slot = decode(offsets[body]);
                rows[slot] = encode(i);
                offsets[body] = encode(slot + 1);
            }
        }
        for body in (1..offsets.len()).rev() {
            offsets[body] = offsets[body - 1];
        }
        offsets[0] = encode(0);
        Self { offsets, rows }
    }

    /// View over lists filled earlier by [`build`](Self::build).
    #[must_use]
    pub fn from_words(offsets: &'a [f64], rows: &'a [f64]) -> Self {
        Self { offsets, rows }
    }

    /// Number of bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Whether there are no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows touching `body`.
    pub fn rows(&self, body: usize) -> impl Iterator<Item = usize> + 'a {
        self.words(body).iter().map(|&word| decode(word))
    }

    fn words(&self, body: usize) -> &'a [f64] {
        let rows = self.rows;
        &rows[span(self.offsets, body)]
    }
}

/// Visit the rows coupled with row `own` in ascending order: the union of
/// the rows touching its bodies, or `own` alone when both ends are static.
fn for_each_coupled(incidence: &BodyRows<'_>, ends: RowBodies, own: usize, mut visit: impl FnMut(usize)) {
    let first = ends.a.map_or(&[][..], |body| incidence.words(body));
    let second = ends.b.map_or(&[][..], |body| incidence.words(body));
    if first.is_empty() && second.is_empty() {
        visit(own);
        return;
    }
    let (mut p, mut q) = (0, 0);
    loop {
        let next = match (first.get(p), second.get(q)) {
            (Some(&x), Some(&y)) => {
                let (x, y) = (decode(x), decode(y));
                match x.cmp(&y) {
                    Ordering::Less => {
                        p += 1;
                        x
                    }
                    Ordering::Greater => {
                        q += 1;
                        y
                    }
                    Ordering::Equal => {
                        p += 1;
                        q += 1;
                        x
                    }
                }
            }
            (Some(&x), None) => {
                p += 1;
                decode(x)
            }
            (None, Some(&y)) => {
                q += 1;
                decode(y)
            }
            (None, None) => break,
        };
        visit(next);
    }
}

/// For every row, the sorted rows sharing at least one dynamic body with it
/// (itself included).
#[derive(Debug, Clone, Copy)]
pub struct RowAdjacency<'a> {
    offsets: &'a [f64],
    rows: &'a [f64],
}

impl<'a> RowAdjacency<'a> {
    /// Total list length, the word count of `rows` in [`build`](Self::build).
    #[must_use]
    pub fn count(num_rows: usize, ends: impl Fn(usize) -> RowBodies, incidence: &BodyRows<'_>) -> usize {
        let mut count = 0;
        for i in 0..num_rows {
            for_each_coupled(incidence, ends(i), i, |_| count += 1);
        }
        count
    }

    /// Merge the incidence lists of every row's bodies into `offsets`
    /// (`rows + 1` words) and `rows` ([`count`](Self::count) words).
    pub fn build(
        num_rows: usize,
        ends: impl Fn(usize) -> RowBodies,
        incidence: &BodyRows<'_>,
        offsets: &'a mut [f64],
        rows: &'a mut [f64],
    ) -> Self {
        let mut len = 0;
        offsets[0] = encode(0);
        for i in 0..num_rows {
            for_each_coupled(incidence, ends(i), i, |j| {
                rows[len] = encode(j);
                len += 1;
            });
            offsets[i + 1] = encode(len);
        }
        Self { offsets, rows }
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of coupled pairs.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.offsets.last().map_or(0, |&word| decode(word))
    }

    /// Rows coupled with row `i`.
    pub fn neighbours(&self, i: usize) -> impl Iterator<Item = usize> + 'a {
        let rows = self.rows;
        rows[span(self.offsets, i)].iter().map(|&word| decode(word))
    }
}

/// Effective mass `A = J · M⁻¹ · Jᵀ` in CSR format over the adjacency
/// pattern.
#[derive(Debug, Clone, Copy)]
pub struct EffectiveMass<'a> {
    pattern: RowAdjacency<'a>,
    values: &'a [f64],
    diagonal: &'a [f64],
}

impl<'a> EffectiveMass<'a> {
    /// Assemble `A` from the Jacobian, the coupling lists and the inverse
    /// mass per column (`[1/m, 1/m, 1/I]` per body) into `values`
    /// (`adjacency.nnz()` words) and `diagonal` (`rows` words).
    pub fn build(
        jacobian: &SparseJacobian<'_>,
        adjacency: RowAdjacency<'a>,
        inv_mass: &[f64],
        values: &'a mut [f64],
        diagonal: &'a mut [f64],
    ) -> Self {
        let mut slot = 0;
        for i in 0..adjacency.len() {
            let row_i = jacobian.row(i);
            for j in adjacency.neighbours(i) {
                let value = weighted_dot(row_i, jacobian.row(j), inv_mass);
                if i == j {
                    diagonal[i] = value;
                }
                values[slot] = value;
                slot += 1;
            }
        }
        Self {
            pattern: adjacency,
            values,
            diagonal,
        }
    }

    /// Dimension.
    #[must_use]
    pub fn size(&self) -> usize {
        self.diagonal.len()
    }

    /// `A_ii`.
    #[must_use]
    pub fn diagonal(&self, i: usize) -> f64 {
        self.diagonal[i]
    }

    /// Row `i`.
    #[must_use]
    pub fn row(&self, i: usize) -> SparseRow<'a> {
        SparseRow::new(self.pattern.offsets, self.pattern.rows, self.values, i)
    }

    /// `Σ_j A_ij x_j`.
    #[must_use]
    pub fn row_dot(&self, i: usize, x: &[f64]) -> f64 {
        self.row(i).iter().map(|(j, a)| a * x[j]).sum()
    }

    /// Heap copy as a nalgebra-sparse matrix.
    pub fn to_csr(&self) -> Result<CsrMatrix<f64>, SparseFormatError> {
        let n = self.size();
        to_csr(n, n, self.pattern.offsets, self.pattern.rows, self.values)
    }

    /// Dense copy, for inspection.
    #[must_use]
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.size();
        let mut dense = DMatrix::zeros(n, n);
        for i in 0..n {
            for (j, value) in self.row(i).iter() {
                dense[(i, j)] = value;
            }
        }
        dense
    }
}

fn to_csr(
    nrows: usize,
    ncols: usize,
    offsets: &[f64],
    cols: &[f64],
    values: &[f64],
) -> Result<CsrMatrix<f64>, SparseFormatError> {
    let offsets: Vec<usize> = offsets.iter().map(|&word| decode(word)).collect();
    let nnz = offsets.last().copied().unwrap_or(0);
    CsrMatrix::try_from_csr_data(
        nrows,
        ncols,
        offsets,
        cols[..nnz].iter().map(|&word| decode(word)).collect(),
        values[..nnz].to_vec(),
    )
}

/// `Σ_k a_k · w_k · b_k` over the columns present in both sorted rows.
fn weighted_dot(a: SparseRow<'_>, b: SparseRow<'_>, w: &[f64]) -> f64 {
    let (mut p, mut q) = (0, 0);
    let mut sum = 0.0;
    while p < a.len() && q < b.len() {
        let (col_a, col_b) = (decode(a.cols[p]), decode(b.cols[q]));
        match col_a.cmp(&col_b) {
            Ordering::Less => p += 1,
            Ordering::Greater => q += 1,
            Ordering::Equal => {
                sum += a.values[p] * w[col_a] * b.values[q];
                p += 1;
                q += 1;
            }
        }
    }
    sum
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{DVector, Vector2};

    /// Chain: static - body 0 - body 1 - body 2, plus a row on body 2 alone.
    /// Row 2 lists its bodies in descending order.
    fn chain() -> (Vec<(RowBodies, JacobianRow)>, Vec<f64>) {
        let rows = vec![
            (
                RowBodies { a: None, b: Some(0) },
                JacobianRow::relative(&Vector2::x(), &Vector2::zeros(), &Vector2::new(0.0, 0.5)),
            ),
            (
                RowBodies { a: Some(0), b: Some(1) },
                JacobianRow::relative(&Vector2::y(), &Vector2::new(0.5, 0.0), &Vector2::new(-0.5, 0.0)),
            ),
            (RowBodies { a: Some(2), b: Some(1) }, JacobianRow::angular()),
            (
                RowBodies { a: Some(2), b: None },
                JacobianRow::relative(&Vector2::new(0.6, 0.8), &Vector2::new(0.1, 0.2), &Vector2::zeros()),
            ),
        ];
        let inv_mass = vec![1.0, 1.0, 2.0, 0.5, 0.5, 4.0, 0.25, 0.25, 1.0];
        (rows, inv_mass)
    }

    /// Word buffers of one assembled system.
    struct Words {
        size: SystemSize,
        j: [Vec<f64>; 3],
        incidence: [Vec<f64>; 2],
        adjacency: [Vec<f64>; 2],
        mass: [Vec<f64>; 2],
    }

    impl Words {
        fn new(num_bodies: usize, rows: &[(RowBodies, JacobianRow)]) -> Self {
            let size = SystemSize::new(num_bodies, rows.iter().map(|(ends, _)| *ends));
            let n = size.rows;
            Self {
                size,
                j: [vec![0.0; n + 1], vec![0.0; size.jacobian_nnz], vec![0.0; size.jacobian_nnz]],
                incidence: [vec![0.0; num_bodies + 1], vec![0.0; size.incidence]],
                adjacency: [vec![0.0; n + 1], Vec::new()],
                mass: [Vec::new(), vec![0.0; n]],
            }
        }
    }

    fn jacobian<'a>(words: &'a mut Words, rows: &[(RowBodies, JacobianRow)]) -> SparseJacobian<'a> {
        let [offsets, cols, values] = &mut words.j;
        SparseJacobian::build(words.size.bodies, rows.iter().copied(), offsets, cols, values)
    }

    #[test]
    fn test_system_size() {
        let (rows, _) = chain();
        let size = SystemSize::new(3, rows.iter().map(|(ends, _)| *ends));
        assert_eq!(
            size,
            SystemSize {
                rows: 4,
                bodies: 3,
                jacobian_nnz: 18,
                incidence: 6,
            }
        );
    }

    #[test]
    fn test_nonzeros_per_row() {
        let (rows, _) = chain();
        let mut words = Words::new(3, &rows);
        let jacobian = jacobian(&mut words, &rows);
        assert_eq!(jacobian.nrows(), 4);
        assert_eq!(jacobian.ncols(), 9);
        assert_eq!(jacobian.nnz(), 3 + 6 + 6 + 3);
        assert_eq!(jacobian.row(0).cols().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(jacobian.row(2).cols().collect::<Vec<_>>(), vec![3, 4, 5, 6, 7, 8]);
        // Body 1 is B of row 2: its angular entry is +1.
        assert_eq!(jacobian.row(2).values(), &[0.0, 0.0, 1.0, 0.0, 0.0, -1.0]);
        assert_eq!(jacobian.row(3).cols().collect::<Vec<_>>(), vec![6, 7, 8]);
    }

    #[test]
    fn test_products_match_dense() {
        let (rows, _) = chain();
        let mut words = Words::new(3, &rows);
        let jacobian = jacobian(&mut words, &rows);
        let dense = jacobian.to_dense();
        let v: Vec<f64> = (0..9).map(|k| f64::from(k) * 0.3 - 1.0).collect();
        let mut jv = vec![0.0; 4];
        jacobian.mul_vec(&v, &mut jv);
        let expected = &dense * DVector::from_vec(v);
        assert_relative_eq!(DVector::from_vec(jv), expected, epsilon = 1e-12);

        let x = vec![1.0, -2.0, 0.5, 3.0];
        let mut jtx = vec![1.0; 9];
        jacobian.mul_transpose_vec(&x, &mut jtx);
        let expected = dense.transpose() * DVector::from_vec(x);
        assert_relative_eq!(DVector::from_vec(jtx), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_csr_export_matches_dense() {
        let (rows, _) = chain();
        let mut words = Words::new(3, &rows);
        let jacobian = jacobian(&mut words, &rows);
        let csr = jacobian.to_csr().unwrap();
        assert_eq!(csr.nnz(), 18);
        assert_eq!(DMatrix::from(&csr), jacobian.to_dense());
    }

    #[test]
    fn test_incidence() {
        let (rows, _) = chain();
        let mut words = Words::new(3, &rows);
        let [offsets, list] = &mut words.incidence;
        let incidence = BodyRows::build(4, |i| rows[i].0, offsets, list);
        assert_eq!(incidence.len(), 3);
        assert_eq!(incidence.rows(0).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(incidence.rows(1).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(incidence.rows(2).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_adjacency() {
        let (rows, _) = chain();
        let mut words = Words::new(3, &rows);
        let ends = |i: usize| rows[i].0;
        let [offsets, list] = &mut words.incidence;
        let incidence = BodyRows::build(4, ends, offsets, list);
        let count = RowAdjacency::count(4, ends, &incidence);
        assert_eq!(count, 2 + 3 + 3 + 2);

        words.adjacency[1] = vec![0.0; count];
        let [offsets, list] = &mut words.adjacency;
        let adjacency = RowAdjacency::build(4, ends, &incidence, offsets, list);
        assert_eq!(adjacency.len(), 4);
        assert_eq!(adjacency.nnz(), count);
        assert_eq!(adjacency.neighbours(0).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(adjacency.neighbours(1).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(adjacency.neighbours(2).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(adjacency.neighbours(3).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_row_between_static_ends_couples_only_itself() {
        let ends = [RowBodies { a: None, b: Some(0) }, RowBodies::default()];
        let (mut offsets, mut list) = (vec![0.0; 2], vec![0.0; 1]);
        let incidence = BodyRows::build(2, |i| ends[i], &mut offsets, &mut list);
        let count = RowAdjacency::count(2, |i| ends[i], &incidence);
        let (mut adj_offsets, mut adj_rows) = (vec![0.0; 3], vec![0.0; count]);
        let adjacency = RowAdjacency::build(2, |i| ends[i], &incidence, &mut adj_offsets, &mut adj_rows);
        assert_eq!(adjacency.neighbours(0).collect::<Vec<_>>(), vec![0]);
        assert_eq!(adjacency.neighbours(1).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_effective_mass_matches_dense() {
        let (rows, inv_mass) = chain();
        let mut words = Words::new(3, &rows);
        let ends = |i: usize| rows[i].0;
        let [inc_offsets, inc_rows] = &mut words.incidence;
        let incidence = BodyRows::build(4, ends, inc_offsets, inc_rows);
        let count = RowAdjacency::count(4, ends, &incidence);
        words.adjacency[1] = vec![0.0; count];
        words.mass[0] = vec![0.0; count];

        let [j_offsets, j_cols, j_values] = &mut words.j;
        let jacobian = SparseJacobian::build(3, rows.iter().copied(), j_offsets, j_cols, j_values);
        let [adj_offsets, adj_rows] = &mut words.adjacency;
        let adjacency = RowAdjacency::build(4, ends, &incidence, adj_offsets, adj_rows);
        let [values, diagonal] = &mut words.mass;
        let a = EffectiveMass::build(&jacobian, adjacency, &inv_mass, values, diagonal);

        let j = jacobian.to_dense();
        let m_inv = DMatrix::from_diagonal(&DVector::from_vec(inv_mass));
        let expected = &j * m_inv * j.transpose();
        assert_relative_eq!(a.to_dense(), expected, epsilon = 1e-12);
        assert_relative_eq!(DMatrix::from(&a.to_csr().unwrap()), expected, epsilon = 1e-12);
        for i in 0..4 {
            assert_relative_eq!(a.diagonal(i), expected[(i, i)], epsilon = 1e-12);
        }
        // Rows 0 and 3 share no body.
        assert!(a.row(0).cols().all(|j| j != 3));
    }

    #[test]
    fn test_empty_system() {
        let (mut offsets, mut cols, mut values) = (vec![0.0; 1], Vec::<f64>::new(), Vec::<f64>::new());
        let jacobian = SparseJacobian::build(0, std::iter::empty(), &mut offsets, &mut cols, &mut values);
        assert_eq!(jacobian.nrows(), 0);
        assert_eq!(jacobian.nnz(), 0);

        let (mut inc_offsets, mut inc_rows) = (vec![0.0; 1], Vec::<f64>::new());
        let incidence = BodyRows::build(0, |_| RowBodies::default(), &mut inc_offsets, &mut inc_rows);
        assert!(incidence.is_empty());
        let (mut adj_offsets, mut adj_rows) = (vec![0.0; 1], Vec::<f64>::new());
        let adjacency =
            RowAdjacency::build(0, |_| RowBodies::default(), &incidence, &mut adj_offsets, &mut adj_rows);
        assert!(adjacency.is_empty());

        let (mut a_values, mut diagonal) = (Vec::<f64>::new(), Vec::<f64>::new());
        let a = EffectiveMass::build(&jacobian, adjacency, &[], &mut a_values, &mut diagonal);
        assert_eq!(a.size(), 0);
    }
}
