//! Materialised EE-MRIO tables handed to the engine by the data loader.
//!
//! All tables hold a shared [`IndustryIndex`] and are immutable after
//! construction. Constructors check only that the data has the shape the
//! index implies; value-level validation (negative flows, non-finite
//! entries) happens where the values are consumed, so that errors name the
//! operation that rejected them.
//!
//! | Table | Shape | Storage |
//! |-------|-------|---------|
//! | [`TransactionMatrix`] (Z) | n × n | sparse CSC |
//! | [`OutputVector`] (x) | n | dense |
//! | [`ExtensionMatrix`] (S) | k × n | dense row-major |
//! | [`FinalDemandVector`] (y) | n | dense |

use sprs::{CsMat, TriMat};
use std::sync::Arc;

use crate::error::{MrioError, MrioResult};
use crate::index::IndustryIndex;
use crate::matrix::DenseMatrix;
use crate::units::ImpactCategory;

/// Inter-industry monetary flows. `Z[i,j]` is the value sold by industry i
/// to industry j as intermediate input.
#[derive(Debug, Clone)]
pub struct TransactionMatrix {
    index: Arc<IndustryIndex>,
    /// Column-compressed: coefficient derivation divides column-wise.
    matrix: CsMat<f64>,
}

impl TransactionMatrix {
    /// Build from dense rows (`rows[i][j] = Z[i,j]`). Zeros are not stored.
    pub fn from_dense(index: Arc<IndustryIndex>, rows: &[Vec<f64>]) -> MrioResult<Self> {
        let n = index.len();
        if rows.len() != n {
            return Err(MrioError::InvalidTable(format!(
                "transaction matrix has {} rows, index has {} industries",
                rows.len(),
                n
            )));
        }
        let mut triplets = TriMat::new((n, n));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(MrioError::InvalidTable(format!(
                    "transaction matrix row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
            for (j, &value) in row.iter().enumerate() {
                if value != 0.0 {
                    triplets.add_triplet(i, j, value);
                }
            }
        }
        Ok(Self {
            index,
            matrix: triplets.to_csc(),
        })
    }

    /// Build from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets<I>(index: Arc<IndustryIndex>, entries: I) -> MrioResult<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let n = index.len();
        let mut triplets = TriMat::new((n, n));
        for (i, j, value) in entries {
            if i >= n || j >= n {
                return Err(MrioError::InvalidTable(format!(
                    "transaction entry ({i}, {j}) outside {n} x {n} table"
                )));
            }
            if value != 0.0 {
                triplets.add_triplet(i, j, value);
            }
        }
        Ok(Self {
            index,
            matrix: triplets.to_csc(),
        })
    }

    pub fn index(&self) -> &Arc<IndustryIndex> {
        &self.index
    }

    pub fn n_industries(&self) -> usize {
        self.index.len()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// `Z[i,j]`, zero when not stored.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix.get(i, j).copied().unwrap_or(0.0)
    }

    /// Non-zero entries of column j as `(row, value)`.
    pub fn column_iter(&self, j: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.matrix
            .outer_view(j)
            .into_iter()
            .flat_map(|col| col.iter().map(|(i, &v)| (i, v)).collect::<Vec<_>>())
    }

    /// Total intermediate sales of every industry (row sums).
    pub fn row_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.n_industries()];
        for j in 0..self.n_industries() {
            for (i, v) in self.column_iter(j) {
                sums[i] += v;
            }
        }
        sums
    }

    /// Total intermediate purchases of every industry (column sums).
    pub fn column_sums(&self) -> Vec<f64> {
        (0..self.n_industries())
            .map(|j| self.column_iter(j).map(|(_, v)| v).sum())
            .collect()
    }

    /// Reject negative or non-finite flows, naming the first offending edge.
    pub fn validate(&self) -> MrioResult<()> {
        for j in 0..self.n_industries() {
            for (i, v) in self.column_iter(j) {
                if !v.is_finite() {
                    return Err(MrioError::InvalidTable(format!(
                        "non-finite transaction {} -> {}",
                        self.index.label(i),
                        self.index.label(j)
                    )));
                }
                if v < 0.0 {
                    return Err(MrioError::InvalidTable(format!(
                        "negative transaction {v} from {} to {}",
                        self.index.label(i),
                        self.index.label(j)
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Total output per industry.
#[derive(Debug, Clone)]
pub struct OutputVector {
    index: Arc<IndustryIndex>,
    values: Vec<f64>,
}

impl OutputVector {
    pub fn new(index: Arc<IndustryIndex>, values: Vec<f64>) -> MrioResult<Self> {
        if values.len() != index.len() {
            return Err(MrioError::InvalidTable(format!(
                "output vector has {} entries, index has {} industries",
                values.len(),
                index.len()
            )));
        }
        Ok(Self { index, values })
    }

    /// x = Z·1 + y: intermediate sales plus final demand, for tables that
    /// ship without an explicit output vector.
    pub fn from_transactions_and_demand(
        transactions: &TransactionMatrix,
        demand: &FinalDemandVector,
    ) -> MrioResult<Self> {
        transactions
            .index()
            .ensure_aligned(demand.index(), "output from transactions and demand")?;
        let values = transactions
            .row_sums()
            .into_iter()
            .zip(demand.values())
            .map(|(sales, y)| sales + y)
            .collect();
        Self::new(transactions.index().clone(), values)
    }

    pub fn index(&self) -> &Arc<IndustryIndex> {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Direct impact intensities: `S[k,j]` is category k per unit output of
/// industry j.
#[derive(Debug, Clone)]
pub struct ExtensionMatrix {
    index: Arc<IndustryIndex>,
    categories: Vec<ImpactCategory>,
    values: DenseMatrix,
}

impl ExtensionMatrix {
    pub fn new(
        index: Arc<IndustryIndex>,
        categories: Vec<ImpactCategory>,
        values: DenseMatrix,
    ) -> MrioResult<Self> {
        if values.rows() != categories.len() {
            return Err(MrioError::InvalidTable(format!(
                "extension has {} rows for {} categories",
                values.rows(),
                categories.len()
            )));
        }
        if values.cols() != index.len() {
            return Err(MrioError::InvalidTable(format!(
                "extension has {} columns, index has {} industries",
                values.cols(),
                index.len()
            )));
        }
        if !values.all_finite() {
            return Err(MrioError::InvalidTable(
                "extension contains non-finite intensities".into(),
            ));
        }
        Ok(Self {
            index,
            categories,
            values,
        })
    }

    pub fn index(&self) -> &Arc<IndustryIndex> {
        &self.index
    }

    pub fn categories(&self) -> &[ImpactCategory] {
        &self.categories
    }

    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }

    pub fn category(&self, k: usize) -> Option<&ImpactCategory> {
        self.categories.get(k)
    }

    pub fn category_position(&self, name: &str) -> MrioResult<usize> {
        self.categories
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| MrioError::UnknownCategory(name.to_string()))
    }

    /// `S[k,j]`; `None` outside the matrix.
    pub fn intensity(&self, k: usize, j: usize) -> Option<f64> {
        if k < self.values.rows() && j < self.values.cols() {
            Some(self.values.get(k, j))
        } else {
            None
        }
    }

    /// Intensities of one category across all industries.
    pub fn row(&self, k: usize) -> &[f64] {
        self.values.row(k)
    }

    /// All category intensities of one industry, `S[:,j]`.
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.values.column(j)
    }

    pub fn matrix(&self) -> &DenseMatrix {
        &self.values
    }
}

/// Exogenous demand per industry driving a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalDemandVector {
    index: Arc<IndustryIndex>,
    values: Vec<f64>,
}

impl FinalDemandVector {
    pub fn new(index: Arc<IndustryIndex>, values: Vec<f64>) -> MrioResult<Self> {
        if values.len() != index.len() {
            return Err(MrioError::dimension("final demand", index.len(), values.len()));
        }
        Ok(Self { index, values })
    }

    pub fn zeros(index: Arc<IndustryIndex>) -> Self {
        let values = vec![0.0; index.len()];
        Self { index, values }
    }

    /// `amount` of demand on a single industry, zero elsewhere.
    pub fn unit(index: Arc<IndustryIndex>, position: usize, amount: f64) -> MrioResult<Self> {
        if position >= index.len() {
            return Err(MrioError::dimension(
                "final demand position",
                index.len(),
                position,
            ));
        }
        let mut demand = Self::zeros(index);
        demand.values[position] = amount;
        Ok(demand)
    }

    /// `amount` of demand on the industry `region/sector`.
    pub fn for_industry(
        index: Arc<IndustryIndex>,
        region: &str,
        sector: &str,
        amount: f64,
    ) -> MrioResult<Self> {
        let position = index.position(region, sector)?;
        Self::unit(index, position, amount)
    }

    pub fn index(&self) -> &Arc<IndustryIndex> {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, position: usize) -> f64 {
        self.values.get(position).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, position: usize, amount: f64) -> MrioResult<()> {
        let n = self.values.len();
        let slot = self
            .values
            .get_mut(position)
            .ok_or_else(|| MrioError::dimension("final demand position", n, position))?;
        *slot = amount;
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Keep demand only at `positions`, zero elsewhere.
    pub fn restricted_to(&self, positions: &[usize]) -> Self {
        let mut values = vec![0.0; self.values.len()];
        for &p in positions {
            if let Some(v) = self.values.get(p) {
                values[p] = *v;
            }
        }
        Self {
            index: self.index.clone(),
            values,
        }
    }

    /// Positions with non-zero demand.
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(i, v)| (i, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index3() -> Arc<IndustryIndex> {
        IndustryIndex::from_pairs(vec![("R", "a"), ("R", "b"), ("R", "c")])
            .unwrap()
            .into_shared()
    }

    #[test]
    fn test_transaction_matrix_from_dense() {
        let z = TransactionMatrix::from_dense(
            index3(),
            &[
                vec![0.0, 50.0, 0.0],
                vec![20.0, 0.0, 30.0],
                vec![0.0, 0.0, 0.0],
            ],
        )
        .unwrap();
        assert_eq!(z.nnz(), 3);
        assert_eq!(z.get(1, 2), 30.0);
        assert_eq!(z.get(2, 2), 0.0);
        assert_eq!(z.row_sums(), vec![50.0, 50.0, 0.0]);
        assert_eq!(z.column_sums(), vec![20.0, 50.0, 30.0]);
        assert!(z.validate().is_ok());
    }

    #[test]
    fn test_transaction_matrix_shape_checked() {
        let result = TransactionMatrix::from_dense(index3(), &[vec![0.0; 3], vec![0.0; 3]]);
        assert!(matches!(result, Err(MrioError::InvalidTable(_))));

        let result = TransactionMatrix::from_triplets(index3(), vec![(0, 3, 1.0)]);
        assert!(matches!(result, Err(MrioError::InvalidTable(_))));
    }

    #[test]
    fn test_negative_transaction_names_edge() {
        let z = TransactionMatrix::from_triplets(index3(), vec![(0, 1, -1.0)]).unwrap();
        let err = z.validate().unwrap_err().to_string();
        assert!(err.contains("R/a"), "{err}");
        assert!(err.contains("R/b"), "{err}");
    }

    #[test]
    fn test_non_finite_transaction_names_edge() {
        let z = TransactionMatrix::from_triplets(index3(), vec![(2, 0, f64::NAN)]).unwrap();
        let err = z.validate().unwrap_err();
        assert!(matches!(err, MrioError::InvalidTable(_)));
        assert!(err.to_string().contains("non-finite"), "{err}");
        assert!(err.to_string().contains("R/c -> R/a"), "{err}");
    }

    #[test]
    fn test_duplicate_triplets_are_summed() {
        let z = TransactionMatrix::from_triplets(index3(), vec![(0, 1, 1.0), (0, 1, 2.5)]).unwrap();
        assert_eq!(z.get(0, 1), 3.5);
    }

    #[test]
    fn test_output_from_transactions_and_demand() {
        let index = index3();
        let z = TransactionMatrix::from_triplets(index.clone(), vec![(0, 1, 50.0), (1, 0, 20.0)])
            .unwrap();
        let y = FinalDemandVector::new(index, vec![50.0, 80.0, 50.0]).unwrap();
        let x = OutputVector::from_transactions_and_demand(&z, &y).unwrap();
        assert_eq!(x.values(), &[100.0, 100.0, 50.0]);
    }

    #[test]
    fn test_extension_shape_and_lookup() {
        let index = index3();
        let cats = vec![ImpactCategory::new("CO2", "kg"), ImpactCategory::new("Water", "m3")];
        let values = DenseMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![0.0, 0.5, 0.0]]).unwrap();
        let s = ExtensionMatrix::new(index.clone(), cats.clone(), values).unwrap();
        assert_eq!(s.category_position("Water").unwrap(), 1);
        assert_eq!(s.column(1), vec![2.0, 0.5]);
        assert!(matches!(
            s.category_position("Land"),
            Err(MrioError::UnknownCategory(_))
        ));

        let bad = DenseMatrix::zeros(2, 2);
        assert!(ExtensionMatrix::new(index, cats, bad).is_err());
    }

    #[test]
    fn test_final_demand_helpers() {
        let index = index3();
        let y = FinalDemandVector::for_industry(index.clone(), "R", "c", 10.0).unwrap();
        assert_eq!(y.values(), &[0.0, 0.0, 10.0]);
        assert_eq!(y.nonzero().collect::<Vec<_>>(), vec![(2, 10.0)]);

        let mut full = FinalDemandVector::new(index.clone(), vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(full.restricted_to(&[0, 2]).values(), &[1.0, 0.0, 3.0]);
        full.set(1, 7.0).unwrap();
        assert_eq!(full.total(), 11.0);
        assert!(full.set(5, 1.0).is_err());

        assert!(matches!(
            FinalDemandVector::new(index, vec![1.0]),
            Err(MrioError::DimensionMismatch { .. })
        ));
    }
}
