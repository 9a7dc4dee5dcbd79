//! Dense linear-algebra helpers shared by the controllers: minimum-norm
//! least-squares, nullspace extraction, orthogonal projection, and rank.
//!
//! Everything here is deterministic given its inputs; degenerate systems
//! degrade to zero solutions instead of failing.

use nalgebra::{DMatrix, DVector};

/// Relative singular-value cutoff: values at or below
/// `max_sv * max(m, n) * epsilon` count as zero.
fn singular_value_threshold(singular_values: &DVector<f64>, m: usize, n: usize) -> f64 {
    let max_sv = singular_values.iter().cloned().fold(0.0_f64, f64::max);
    max_sv * (m.max(n) as f64) * f64::EPSILON
}

/// Numerical rank of a dense matrix via SVD.
pub fn matrix_rank(matrix: &DMatrix<f64>) -> usize {
    let (m, n) = matrix.shape();
    if m == 0 || n == 0 {
        return 0;
    }
    let svd = matrix.clone().svd(false, false);
    let threshold = singular_value_threshold(&svd.singular_values, m, n);
    svd.singular_values.iter().filter(|&&s| s > threshold).count()
}

/// Result of a minimum-norm least-squares solve.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    /// The minimum-norm solution of `A x = b` in the least-squares sense.
    pub solution: DVector<f64>,
    /// Numerical rank of `A`.
    pub rank: usize,
}

/// Solve `A x = b` in the least-squares, minimum-norm sense.
///
/// Works for over- and under-determined systems alike; singular values
/// below the relative threshold are truncated, which is what makes the
/// solution minimum-norm on rank-deficient systems.
pub fn min_norm_lstsq(a: &DMatrix<f64>, b: &DVector<f64>) -> LeastSquares {
    let (m, n) = a.shape();
    if m == 0 || n == 0 {
        return LeastSquares {
            solution: DVector::zeros(n),
            rank: 0,
        };
    }
    let svd = a.clone().svd(true, true);
    let threshold = singular_value_threshold(&svd.singular_values, m, n);
    let rank = svd.singular_values.iter().filter(|&&s| s > threshold).count();
    let solution = svd
        .solve(b, threshold)
        .unwrap_or_else(|_| DVector::zeros(n));
    LeastSquares { solution, rank }
}

/// An orthonormal basis for the kernel of `matrix`, returned as columns of
/// an `n x k` matrix (`k = 0` for full-column-rank input).
///
/// nalgebra computes the economy SVD, whose `V^T` has only `min(m, n)` rows;
/// for wide matrices that drops exactly the kernel directions we are after,
/// so the matrix is padded with zero rows (same kernel) up to square first.
pub fn nullspace_basis(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    let (m, n) = matrix.shape();
    if n == 0 {
        return DMatrix::zeros(0, 0);
    }
    let padded = if m < n {
        let mut square = DMatrix::zeros(n, n);
        square.view_mut((0, 0), (m, n)).copy_from(matrix);
        square
    } else {
        matrix.clone()
    };
    let (pm, _) = padded.shape();
    let svd = padded.svd(false, true);
    let threshold = singular_value_threshold(&svd.singular_values, pm, n);
    let rank = svd.singular_values.iter().filter(|&&s| s > threshold).count();
    match svd.v_t {
        // Singular values are sorted in decreasing order, so the kernel is
        // spanned by the trailing rows of V^T.
        Some(v_t) => v_t.rows(rank, n - rank).transpose(),
        None => DMatrix::zeros(n, 0),
    }
}

/// Orthogonal projector onto the column span of `basis`:
/// `P = A (A^T A)^-1 A^T`. An empty basis projects everything to zero.
pub fn span_projector(basis: &DMatrix<f64>) -> DMatrix<f64> {
    let (n, k) = basis.shape();
    if k == 0 {
        return DMatrix::zeros(n, n);
    }
    let gram = basis.transpose() * basis;
    match gram.try_inverse() {
        Some(gram_inverse) => basis * gram_inverse * basis.transpose(),
        // Linearly dependent basis columns; treat the span as empty rather
        // than propagating a broken projector.
        None => DMatrix::zeros(n, n),
    }
}
