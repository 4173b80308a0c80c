//! Technical coefficient matrix (A) derived from a transaction table.
//!
//! ```text
//! A[i,j] = Z[i,j] / x[j]     if x[j] > 0
//! A[:,j] = 0                 if x[j] = 0   (inactive industry)
//! ```
//!
//! A[i,j] is the share of industry j's output bought from industry i. The
//! matrix is stored column-compressed, which makes both the derivation
//! (column-wise division) and the supply-chain walk (suppliers of j are the
//! non-zeros of column j) cheap.

use mrio_core::diagnostics::{CYCLIC, INACTIVE, SELF_SUPPLY, UNBALANCED};
use mrio_core::{
    build_supplier_graph, cyclic_groups, DenseMatrix, Diagnostics, IndustryIndex, MrioError,
    MrioResult, OutputVector, SupplierGraph, SupplierGraphStats, TransactionMatrix,
};
use sprs::{CsMat, TriMat};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Technical coefficients over a fixed industry index.
#[derive(Debug, Clone)]
pub struct CoefficientMatrix {
    index: Arc<IndustryIndex>,
    /// Column-compressed A.
    matrix: CsMat<f64>,
    column_sums: Vec<f64>,
    inactive: Vec<usize>,
    diagnostics: Diagnostics,
}

/// Derives [`CoefficientMatrix`] values from raw tables.
pub struct CoefficientBuilder;

impl CoefficientBuilder {
    /// Column-wise division of Z by x.
    ///
    /// Fails with [`MrioError::InvalidTable`] when Z and x are not aligned to
    /// the same index or when Z or x contain negative or non-finite values.
    pub fn build(
        transactions: &TransactionMatrix,
        output: &OutputVector,
    ) -> MrioResult<CoefficientMatrix> {
        let index = transactions.index();
        if !index.is_aligned_with(output.index()) {
            return Err(MrioError::InvalidTable(format!(
                "transactions cover {} industries but the output vector covers {}",
                index.len(),
                output.len()
            )));
        }
        transactions.validate()?;

        let x = output.values();
        for (j, &xj) in x.iter().enumerate() {
            if !xj.is_finite() || xj < 0.0 {
                return Err(MrioError::InvalidTable(format!(
                    "invalid total output {xj} for {}",
                    index.label(j)
                )));
            }
        }

        let n = index.len();
        let mut diagnostics = Diagnostics::new();
        let mut triplets = TriMat::new((n, n));
        let mut inactive = Vec::new();

        for (j, &xj) in x.iter().enumerate() {
            if xj > 0.0 {
                for (i, z) in transactions.column_iter(j) {
                    triplets.add_triplet(i, j, z / xj);
                }
                continue;
            }

            inactive.push(j);
            let dropped: f64 = transactions.column_iter(j).map(|(_, z)| z).sum();
            if dropped > 0.0 {
                diagnostics.add_warning_at(
                    INACTIVE,
                    &format!("zero output but {dropped} of recorded purchases; column set to zero"),
                    j,
                    &index.label(j),
                );
            } else {
                diagnostics.add_warning_at(INACTIVE, "zero total output", j, &index.label(j));
            }
        }

        let coefficients =
            CoefficientMatrix::assemble(index.clone(), triplets.to_csc(), inactive, diagnostics);

        info!(
            industries = n,
            nnz = coefficients.nnz(),
            inactive = coefficients.inactive.len(),
            "built technical coefficient matrix"
        );
        Ok(coefficients)
    }
}

impl CoefficientMatrix {
    /// Wrap coefficients that were computed elsewhere (databases often ship
    /// A directly). Entries must be finite and non-negative; all-zero columns
    /// are treated as inactive industries.
    pub fn from_triplets<I>(index: Arc<IndustryIndex>, entries: I) -> MrioResult<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let n = index.len();
        let mut triplets = TriMat::new((n, n));
        for (i, j, a) in entries {
            if i >= n || j >= n {
                return Err(MrioError::InvalidTable(format!(
                    "coefficient ({i}, {j}) outside {n} x {n} table"
                )));
            }
            if !a.is_finite() || a < 0.0 {
                return Err(MrioError::InvalidTable(format!(
                    "invalid coefficient {a} from {} to {}",
                    index.label(i),
                    index.label(j)
                )));
            }
            if a != 0.0 {
                triplets.add_triplet(i, j, a);
            }
        }
        let matrix: CsMat<f64> = triplets.to_csc();
        let inactive = (0..n)
            .filter(|&j| matrix.outer_view(j).map(|c| c.nnz() == 0).unwrap_or(true))
            .collect();
        Ok(Self::assemble(index, matrix, inactive, Diagnostics::new()))
    }

    /// Dense rows, `rows[i][j] = A[i,j]`.
    pub fn from_dense(index: Arc<IndustryIndex>, rows: &[Vec<f64>]) -> MrioResult<Self> {
        let n = index.len();
        if rows.len() != n || rows.iter().any(|r| r.len() != n) {
            return Err(MrioError::InvalidTable(format!(
                "coefficient matrix must be {n} x {n}"
            )));
        }
        let entries = rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().enumerate().map(move |(j, &a)| (i, j, a)));
        Self::from_triplets(index, entries)
    }

    fn assemble(
        index: Arc<IndustryIndex>,
        matrix: CsMat<f64>,
        inactive: Vec<usize>,
        mut diagnostics: Diagnostics,
    ) -> Self {
        let n = index.len();
        let column_sums: Vec<f64> = (0..n)
            .map(|j| {
                matrix
                    .outer_view(j)
                    .map(|col| col.iter().map(|(_, &a)| a).sum())
                    .unwrap_or(0.0)
            })
            .collect();

        for (j, &sum) in column_sums.iter().enumerate() {
            if sum >= 1.0 {
                warn!(
                    industry = %index.label(j),
                    column_sum = sum,
                    "coefficient column sums to one or more"
                );
                diagnostics.add_error_at(
                    UNBALANCED,
                    &format!("coefficient column sums to {sum:.4}; (I - A) may be singular"),
                    j,
                    &index.label(j),
                );
            }
        }
        debug!(issues = %diagnostics.summary(), "coefficient diagnostics");

        Self {
            index,
            matrix,
            column_sums,
            inactive,
            diagnostics,
        }
    }

    pub fn index(&self) -> &Arc<IndustryIndex> {
        &self.index
    }

    pub fn n_industries(&self) -> usize {
        self.index.len()
    }

    /// A[i,j], zero when not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix.get(i, j).copied().unwrap_or(0.0)
    }

    /// Direct suppliers of industry j as `(supplier, A[supplier, j])`, in
    /// ascending supplier order.
    pub fn suppliers_of(&self, j: usize) -> Vec<(usize, f64)> {
        self.matrix
            .outer_view(j)
            .map(|col| col.iter().map(|(i, &a)| (i, a)).collect())
            .unwrap_or_default()
    }

    /// Σ_i A[i,j]: share of j's output spent on intermediate inputs.
    pub fn column_sum(&self, j: usize) -> f64 {
        self.column_sums.get(j).copied().unwrap_or(0.0)
    }

    pub fn is_inactive(&self, j: usize) -> bool {
        self.inactive.binary_search(&j).is_ok()
    }

    /// Positions with zero total output, ascending.
    pub fn inactive_industries(&self) -> &[usize] {
        &self.inactive
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// nnz / n²
    pub fn density(&self) -> f64 {
        let n = self.n_industries();
        if n == 0 {
            return 0.0;
        }
        self.nnz() as f64 / (n * n) as f64
    }

    /// All stored entries as `(row, col, value)`, column by column.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n_industries())
            .flat_map(move |j| self.suppliers_of(j).into_iter().map(move |(i, a)| (i, j, a)))
    }

    /// A · v
    pub fn mul_vec(&self, v: &[f64]) -> MrioResult<Vec<f64>> {
        let n = self.n_industries();
        if v.len() != n {
            return Err(MrioError::dimension("coefficient matrix-vector product", n, v.len()));
        }
        let mut out = vec![0.0; n];
        for (j, &vj) in v.iter().enumerate() {
            if vj == 0.0 {
                continue;
            }
            if let Some(col) = self.matrix.outer_view(j) {
                for (i, &a) in col.iter() {
                    out[i] += a * vj;
                }
            }
        }
        Ok(out)
    }

    /// Stored entries of I - A, the system the Leontief solver factors,
    /// column by column with the diagonal first. Off-diagonal zeros of A
    /// stay unstored.
    pub fn identity_minus_entries(&self) -> Vec<(usize, usize, f64)> {
        let n = self.n_industries();
        let mut entries = Vec::with_capacity(n + self.nnz());
        for j in 0..n {
            let suppliers = self.suppliers_of(j);
            let own = suppliers
                .iter()
                .find(|&&(i, _)| i == j)
                .map_or(0.0, |&(_, a)| a);
            entries.push((j, j, 1.0 - own));
            entries.extend(
                suppliers
                    .into_iter()
                    .filter(|&(i, _)| i != j)
                    .map(|(i, a)| (i, j, -a)),
            );
        }
        entries
    }

    pub fn to_dense(&self) -> DenseMatrix {
        let n = self.n_industries();
        let mut m = DenseMatrix::zeros(n, n);
        for (i, j, a) in self.entries() {
            m.set(i, j, a);
        }
        m
    }

    /// Directed supplier graph (edge i → j for every A[i,j] > 0).
    pub fn supplier_graph(&self) -> SupplierGraph {
        build_supplier_graph(self.n_industries(), self.entries())
    }

    pub fn supplier_graph_stats(&self) -> SupplierGraphStats {
        mrio_core::supplier_graph_stats(&self.supplier_graph())
    }

    /// Findings recorded while the matrix was built.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Self-supplying industries and groups of industries that supply each
    /// other in a cycle. Informational: every real table has both, and the
    /// supply-chain tree truncates them.
    pub fn structure_diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let self_supplying = (0..self.n_industries())
            .filter(|&j| self.get(j, j) > 0.0)
            .count();
        if self_supplying > 0 {
            diagnostics.add_info(
                SELF_SUPPLY,
                &format!("{self_supplying} industries buy from themselves"),
            );
        }

        let groups = cyclic_groups(&self.supplier_graph());
        for group in &groups {
            let first = group.first().map(|&p| self.index.label(p)).unwrap_or_default();
            let message = format!(
                "{} industries supply each other in a cycle (including {first})",
                group.len()
            );
            diagnostics.add_info(CYCLIC, &message);
        }
        debug!(
            self_supplying,
            cyclic_groups = groups.len(),
            "analysed supplier graph structure"
        );
        diagnostics
    }
}
