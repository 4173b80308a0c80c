use anyhow::{anyhow, Result};
use faer::sparse::solvers::Lu;
use faer::sparse::FaerSparseMat;
use faer::sparse::SparseColMat;
use faer::{prelude::*, solvers::PartialPivLu, Mat};

use crate::matrix::DenseMatrix;

/// Trait for solving dense linear systems (A·X = B).
///
/// Backends factor the square matrix once and then solve any number of
/// right-hand-side blocks against the factorisation. The factorisation is
/// `Send + Sync` so column blocks can be solved from several threads.
pub trait LinearSystemBackend: Send + Sync {
    /// Factor a square matrix.
    fn factorize(&self, matrix: &DenseMatrix) -> Result<Box<dyn Factorization>>;

    /// Factor an `n × n` matrix given by its stored `(row, col, value)`
    /// entries, each position at most once. Dense backends assemble the
    /// full matrix first.
    fn factorize_entries(
        &self,
        n: usize,
        entries: &[(usize, usize, f64)],
    ) -> Result<Box<dyn Factorization>> {
        check_entries(n, entries)?;
        let mut matrix = DenseMatrix::zeros(n, n);
        for &(i, j, v) in entries {
            matrix.set(i, j, matrix.get(i, j) + v);
        }
        self.factorize(&matrix)
    }

    /// Solve A·x = b for a single right-hand side.
    fn solve(&self, matrix: &DenseMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        let factors = self.factorize(matrix)?;
        let b = DenseMatrix::from_fn(rhs.len(), 1, |i, _| rhs[i]);
        Ok(factors.solve_block(&b)?.column(0))
    }

    fn name(&self) -> &'static str;
}

/// A factored square matrix.
pub trait Factorization: Send + Sync {
    fn dim(&self) -> usize;

    /// Solve A·X = B where B is `dim × k`.
    fn solve_block(&self, rhs: &DenseMatrix) -> Result<DenseMatrix>;

    /// Solve for columns `start..end` of the identity, i.e. a column block
    /// of A⁻¹, without materialising the full identity.
    fn solve_identity_block(&self, start: usize, end: usize) -> Result<DenseMatrix> {
        let n = self.dim();
        if start > end || end > n {
            return Err(anyhow!("identity block {start}..{end} outside dimension {n}"));
        }
        let rhs =
            DenseMatrix::from_fn(n, end - start, |i, j| if i == start + j { 1.0 } else { 0.0 });
        self.solve_block(&rhs)
    }
}

fn check_square(matrix: &DenseMatrix) -> Result<usize> {
    if !matrix.is_square() {
        return Err(anyhow!(
            "matrix must be square, got {} x {}",
            matrix.rows(),
            matrix.cols()
        ));
    }
    Ok(matrix.rows())
}

fn check_entries(n: usize, entries: &[(usize, usize, f64)]) -> Result<()> {
    match entries.iter().find(|&&(i, j, _)| i >= n || j >= n) {
        Some(&(i, j, _)) => Err(anyhow!("entry ({i}, {j}) outside {n} x {n} matrix")),
        None => Ok(()),
    }
}

fn check_rhs(n: usize, rhs: &DenseMatrix) -> Result<()> {
    if rhs.rows() != n {
        return Err(anyhow!(
            "rhs rows ({}) do not match matrix dimension {}",
            rhs.rows(),
            n
        ));
    }
    Ok(())
}

/// LU decomposition with partial pivoting, in plain Rust.
///
/// Used as a reference implementation and for small tables; fails early on
/// a vanishing pivot rather than producing non-finite results.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

struct GaussLu {
    lu: Vec<Vec<f64>>,
    perm: Vec<usize>,
}

impl LinearSystemBackend for GaussSolver {
    fn factorize(&self, matrix: &DenseMatrix) -> Result<Box<dyn Factorization>> {
        let n = check_square(matrix)?;
        let mut lu: Vec<Vec<f64>> = matrix.iter_rows().map(<[f64]>::to_vec).collect();
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            let mut max_val = lu[k][k].abs();
            let mut max_row = k;
            for (i, row) in lu.iter().enumerate().skip(k + 1) {
                if row[k].abs() > max_val {
                    max_val = row[k].abs();
                    max_row = i;
                }
            }

            if max_val < 1e-12 {
                return Err(anyhow!("singular matrix (pivot {k} vanishes)"));
            }

            if max_row != k {
                lu.swap(k, max_row);
                perm.swap(k, max_row);
            }

            let pivot_row = lu[k].clone();
            for row in lu.iter_mut().skip(k + 1) {
                row[k] /= pivot_row[k];
                let factor = row[k];
                if factor == 0.0 {
                    continue;
                }
                for (target, &p) in row[k + 1..].iter_mut().zip(&pivot_row[k + 1..]) {
                    *target -= factor * p;
                }
            }
        }

        Ok(Box::new(GaussLu { lu, perm }))
    }

    fn name(&self) -> &'static str {
        "gauss"
    }
}

impl Factorization for GaussLu {
    fn dim(&self) -> usize {
        self.lu.len()
    }

    fn solve_block(&self, rhs: &DenseMatrix) -> Result<DenseMatrix> {
        let n = self.dim();
        check_rhs(n, rhs)?;
        let mut out = DenseMatrix::zeros(n, rhs.cols());

        for col in 0..rhs.cols() {
            // Forward substitution (L y = P b)
            let mut y = vec![0.0; n];
            for i in 0..n {
                let mut acc = rhs.get(self.perm[i], col);
                for j in 0..i {
                    acc -= self.lu[i][j] * y[j];
                }
                y[i] = acc;
            }

            // Back substitution (U x = y)
            for i in (0..n).rev() {
                let mut acc = y[i];
                for j in (i + 1)..n {
                    acc -= self.lu[i][j] * out.get(j, col);
                }
                out.set(i, col, acc / self.lu[i][i]);
            }
        }

        Ok(out)
    }
}

/// Dense partial-pivoting LU from `faer`.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

struct FaerLu {
    n: usize,
    lu: PartialPivLu<f64>,
}

impl LinearSystemBackend for FaerSolver {
    fn factorize(&self, matrix: &DenseMatrix) -> Result<Box<dyn Factorization>> {
        let n = check_square(matrix)?;
        let mat = Mat::from_fn(n, n, |i, j| matrix.get(i, j));
        let lu = PartialPivLu::new(mat.as_ref());
        Ok(Box::new(FaerLu { n, lu }))
    }

    fn name(&self) -> &'static str {
        "faer"
    }
}

impl Factorization for FaerLu {
    fn dim(&self) -> usize {
        self.n
    }

    fn solve_block(&self, rhs: &DenseMatrix) -> Result<DenseMatrix> {
        check_rhs(self.n, rhs)?;
        let b = Mat::from_fn(self.n, rhs.cols(), |i, j| rhs.get(i, j));
        let sol = self.lu.solve(&b);
        Ok(DenseMatrix::from_fn(self.n, rhs.cols(), |i, j| sol.read(i, j)))
    }
}

/// Sparse LU from `faer`, for systems that are mostly zeros.
///
/// Only the stored entries are factored; fill-in is kept down by the
/// column ordering `faer` picks. Right-hand sides and solutions are dense.
#[derive(Debug, Clone, Default)]
pub struct SparseLuSolver;

struct SparseLu {
    n: usize,
    lu: Lu<usize, f64>,
}

impl LinearSystemBackend for SparseLuSolver {
    fn factorize(&self, matrix: &DenseMatrix) -> Result<Box<dyn Factorization>> {
        let n = check_square(matrix)?;
        let mut entries = Vec::new();
        for j in 0..n {
            for i in 0..n {
                let v = matrix.get(i, j);
                if v != 0.0 {
                    entries.push((i, j, v));
                }
            }
        }
        self.factorize_entries(n, &entries)
    }

    fn factorize_entries(
        &self,
        n: usize,
        entries: &[(usize, usize, f64)],
    ) -> Result<Box<dyn Factorization>> {
        check_entries(n, entries)?;
        let matrix = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, entries)
            .map_err(|err| anyhow!("cannot assemble sparse matrix: {err:?}"))?;
        let lu = matrix
            .as_ref()
            .sp_lu()
            .map_err(|err| anyhow!("sparse LU failed: {err:?}"))?;
        Ok(Box::new(SparseLu { n, lu }))
    }

    fn name(&self) -> &'static str {
        "sparse"
    }
}

impl Factorization for SparseLu {
    fn dim(&self) -> usize {
        self.n
    }

    fn solve_block(&self, rhs: &DenseMatrix) -> Result<DenseMatrix> {
        check_rhs(self.n, rhs)?;
        let b = Mat::from_fn(self.n, rhs.cols(), |i, j| rhs.get(i, j));
        let sol = self.lu.solve(&b);
        Ok(DenseMatrix::from_fn(self.n, rhs.cols(), |i, j| sol.read(i, j)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> DenseMatrix {
        DenseMatrix::from_rows(&[
            vec![4.0, -2.0, 1.0],
            vec![-2.0, 4.0, -2.0],
            vec![1.0, -2.0, 4.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_gauss_and_faer_agree() {
        let a = system();
        let b = [11.0, -16.0, 17.0];
        let x_gauss = GaussSolver.solve(&a, &b).unwrap();
        let x_faer = FaerSolver.solve(&a, &b).unwrap();
        let x_sparse = SparseLuSolver.solve(&a, &b).unwrap();
        for i in 0..3 {
            assert!(
                (x_gauss[i] - x_faer[i]).abs() < 1e-10,
                "Mismatch at {}: gauss={}, faer={}",
                i,
                x_gauss[i],
                x_faer[i]
            );
            assert!((x_gauss[i] - x_sparse[i]).abs() < 1e-10);
        }
        let residual: Vec<f64> = a.mul_vec(&x_gauss).unwrap();
        for (r, expected) in residual.iter().zip(b) {
            assert!((r - expected).abs() < 1e-10);
        }
    }

    #[test]
    fn test_identity_block_is_inverse_columns() {
        let a = system();
        for backend in [
            &GaussSolver as &dyn LinearSystemBackend,
            &FaerSolver,
            &SparseLuSolver,
        ] {
            let factors = backend.factorize(&a).unwrap();
            let block = factors.solve_identity_block(1, 3).unwrap();
            assert_eq!(block.shape(), (3, 2));
            // A · X[:, c] = e_{c+1}
            for c in 0..2 {
                let ax = a.mul_vec(&block.column(c)).unwrap();
                for (i, v) in ax.iter().enumerate() {
                    let expected = if i == c + 1 { 1.0 } else { 0.0 };
                    assert!((v - expected).abs() < 1e-10, "{}: {v}", backend.name());
                }
            }
        }
    }

    #[test]
    fn test_gauss_rejects_singular() {
        let a = DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![2.0, 4.0]]).unwrap();
        assert!(GaussSolver.factorize(&a).is_err());
    }

    #[test]
    fn test_non_square_rejected() {
        let a = DenseMatrix::zeros(2, 3);
        assert!(GaussSolver.factorize(&a).is_err());
        assert!(FaerSolver.factorize(&a).is_err());
        assert!(SparseLuSolver.factorize(&a).is_err());
    }

    #[test]
    fn test_entries_factor_like_dense() {
        // Tridiagonal system() without its corner entries.
        let entries = [
            (0, 0, 4.0),
            (1, 0, -2.0),
            (0, 1, -2.0),
            (1, 1, 4.0),
            (2, 1, -2.0),
            (1, 2, -2.0),
            (2, 2, 4.0),
        ];
        let dense = DenseMatrix::from_rows(&[
            vec![4.0, -2.0, 0.0],
            vec![-2.0, 4.0, -2.0],
            vec![0.0, -2.0, 4.0],
        ])
        .unwrap();
        let expected = GaussSolver
            .factorize(&dense)
            .unwrap()
            .solve_identity_block(0, 3)
            .unwrap();
        for backend in [
            &GaussSolver as &dyn LinearSystemBackend,
            &FaerSolver,
            &SparseLuSolver,
        ] {
            let block = backend
                .factorize_entries(3, &entries)
                .unwrap()
                .solve_identity_block(0, 3)
                .unwrap();
            for i in 0..3 {
                for j in 0..3 {
                    assert!(
                        (block.get(i, j) - expected.get(i, j)).abs() < 1e-12,
                        "{}: [{i},{j}]",
                        backend.name()
                    );
                }
            }
        }
        assert!(SparseLuSolver.factorize_entries(2, &entries).is_err());
        assert!(GaussSolver.factorize_entries(2, &entries).is_err());
    }

    #[test]
    fn test_identity_block_bounds() {
        let factors = GaussSolver.factorize(&system()).unwrap();
        assert!(factors.solve_identity_block(2, 5).is_err());
    }
}
