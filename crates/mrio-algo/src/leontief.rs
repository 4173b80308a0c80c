//! Leontief inverse (total requirements matrix).
//!
//! Solves `(I - A) · L = I` with a direct LU factorisation of `I - A`, one
//! block of identity columns at a time, and validates the result by the
//! residual `max |(I - A)·L - I|`. A residual above tolerance (or a NaN,
//! or a factorisation failure) is a [`MrioError::SingularSystem`]: the table
//! is economically inconsistent or malformed, and no silently wrong L is
//! handed to the impact stage.
//!
//! `I - A` reaches the backend as its stored entries only. The default
//! [`SolverKind::Sparse`] backend factors it without densifying; L itself is
//! dense.
//!
//! ## Determinism
//!
//! Column blocks have a fixed width and every column of L is computed from
//! the same factorisation, so the result is bit-identical whether the blocks
//! run on the rayon pool or sequentially.

use mrio_core::matrix::dot;
use mrio_core::{DenseMatrix, IndustryIndex, MrioError, MrioResult, SolverConfig, SolverKind};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};
use web_time::Instant;

use crate::coefficients::CoefficientMatrix;

/// Identity columns solved per block.
const BLOCK_COLUMNS: usize = 64;

/// Builds [`LeontiefInverse`] values.
#[derive(Debug, Clone)]
pub struct LeontiefSolver {
    backend: SolverKind,
    tolerance: f64,
    parallel: bool,
}

impl Default for LeontiefSolver {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl LeontiefSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self {
            backend: config.backend,
            tolerance: config.residual_tolerance,
            parallel: config.parallel,
        }
    }

    pub fn with_backend(mut self, backend: SolverKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Run column blocks on the rayon pool (no effect without the
    /// `parallel` feature).
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn backend(&self) -> SolverKind {
        self.backend
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Compute L = (I - A)⁻¹.
    pub fn solve(&self, coefficients: &CoefficientMatrix) -> MrioResult<LeontiefInverse> {
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(MrioError::Config(format!(
                "residual tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        let n = coefficients.n_industries();
        let start = Instant::now();
        if n == 0 {
            return Ok(LeontiefInverse {
                index: coefficients.index().clone(),
                matrix: DenseMatrix::zeros(0, 0),
                residual: 0.0,
                backend: self.backend,
            });
        }
        let system = coefficients.identity_minus_entries();

        let backend = self.backend.build_solver();
        let factors = backend
            .factorize_entries(n, &system)
            .map_err(|err| {
                let detail = format!("{} factorisation failed: {err}", backend.name());
                self.singular(f64::INFINITY, detail)
            })?;
        debug!(
            backend = backend.name(),
            industries = n,
            stored = system.len(),
            "factored I - A"
        );

        let blocks: Vec<(usize, usize)> = (0..n)
            .step_by(BLOCK_COLUMNS)
            .map(|s| (s, (s + BLOCK_COLUMNS).min(n)))
            .collect();
        let solve_block = |&(s, e): &(usize, usize)| {
            factors
                .solve_identity_block(s, e)
                .map(|block| (s, block))
                .map_err(|err| {
                    self.singular(f64::INFINITY, format!("column block {s}..{e}: {err}"))
                })
        };

        let solved: Vec<(usize, DenseMatrix)> = if self.use_pool() {
            #[cfg(feature = "parallel")]
            {
                blocks.par_iter().map(solve_block).collect::<MrioResult<_>>()?
            }
            #[cfg(not(feature = "parallel"))]
            {
                blocks.iter().map(solve_block).collect::<MrioResult<_>>()?
            }
        } else {
            blocks.iter().map(solve_block).collect::<MrioResult<_>>()?
        };

        let mut matrix = DenseMatrix::zeros(n, n);
        for (s, block) in &solved {
            for i in 0..n {
                for c in 0..block.cols() {
                    matrix.set(i, s + c, block.get(i, c));
                }
            }
        }

        let residual = self.residual(coefficients, &matrix);
        if residual.is_nan() || residual > self.tolerance {
            return Err(self.singular(
                residual,
                format!("{} backend, {} industries", backend.name(), n),
            ));
        }

        info!(
            backend = backend.name(),
            industries = n,
            residual,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "solved Leontief inverse"
        );

        Ok(LeontiefInverse {
            index: coefficients.index().clone(),
            matrix,
            residual,
            backend: self.backend,
        })
    }

    /// max |(I - A)·L - I| over all entries, NaN if any entry is NaN.
    ///
    /// Column j of (I - A)·L is L[:,j] - Σ_k L[k,j]·A[:,k], which only
    /// touches the stored coefficients.
    pub fn residual(&self, coefficients: &CoefficientMatrix, inverse: &DenseMatrix) -> f64 {
        let n = coefficients.n_industries();
        let column_residual = |j: usize| {
            let mut col = inverse.column(j);
            let l_col = col.clone();
            for (k, &lkj) in l_col.iter().enumerate() {
                if lkj == 0.0 {
                    continue;
                }
                for (i, a) in coefficients.suppliers_of(k) {
                    col[i] -= a * lkj;
                }
            }
            col[j] -= 1.0;
            col.iter().fold(0.0, |acc, r| nan_max(acc, r.abs()))
        };

        if self.use_pool() {
            #[cfg(feature = "parallel")]
            {
                return (0..n)
                    .into_par_iter()
                    .map(column_residual)
                    .reduce(|| 0.0, nan_max);
            }
        }
        (0..n).map(column_residual).fold(0.0, nan_max)
    }

    fn use_pool(&self) -> bool {
        self.parallel && cfg!(feature = "parallel")
    }

    fn singular(&self, residual: f64, detail: String) -> MrioError {
        MrioError::SingularSystem {
            residual,
            tolerance: self.tolerance,
            detail,
        }
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

/// L = (I - A)⁻¹ over a fixed industry index.
///
/// L[i,j] is the output of industry i required, directly and through every
/// upstream tier, per unit of final demand for industry j.
#[derive(Debug, Clone)]
pub struct LeontiefInverse {
    index: Arc<IndustryIndex>,
    matrix: DenseMatrix,
    residual: f64,
    backend: SolverKind,
}

impl LeontiefInverse {
    pub fn index(&self) -> &Arc<IndustryIndex> {
        &self.index
    }

    pub fn n_industries(&self) -> usize {
        self.index.len()
    }

    pub fn matrix(&self) -> &DenseMatrix {
        &self.matrix
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix.get(i, j)
    }

    /// L[:,j]: total requirements per unit of demand for industry j.
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.matrix.column(j)
    }

    pub fn row(&self, i: usize) -> &[f64] {
        self.matrix.row(i)
    }

    /// Residual measured when the inverse was solved.
    pub fn residual(&self) -> f64 {
        self.residual
    }

    pub fn backend(&self) -> SolverKind {
        self.backend
    }

    /// L · v
    pub fn mul_vec(&self, v: &[f64]) -> MrioResult<Vec<f64>> {
        let n = self.n_industries();
        if v.len() != n {
            return Err(MrioError::dimension("Leontief matrix-vector product", n, v.len()));
        }
        #[cfg(feature = "parallel")]
        {
            Ok((0..n).into_par_iter().map(|i| dot(self.matrix.row(i), v)).collect())
        }
        #[cfg(not(feature = "parallel"))]
        {
            Ok((0..n).map(|i| dot(self.matrix.row(i), v)).collect())
        }
    }
}
