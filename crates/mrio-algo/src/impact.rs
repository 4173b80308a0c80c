//! Impact propagation through the Leontief inverse.
//!
//! | Quantity              | Formula            | Shape  |
//! |-----------------------|--------------------|--------|
//! | total output          | x = L·y            | n      |
//! | direct intensity      | S[:,j]             | k      |
//! | total impact          | S·L·y = S·x        | k      |
//! | per-industry impact   | S[k,j]·x[j]        | k × n  |
//! | multipliers           | M = S·L            | k × n  |
//!
//! `M[k,j]` is the impact embodied in one unit of final demand for industry
//! j, summed over every upstream tier. It satisfies `M = S + M·A`, which is
//! what lets the supply-chain tree attribute impact to truncated branches
//! without expanding them.

use mrio_core::{
    DenseMatrix, ExtensionMatrix, FinalDemandVector, ImpactCategory, MrioError, MrioResult,
};
use once_cell::sync::OnceCell;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::leontief::LeontiefInverse;
use crate::regional::{aggregate_by_region, RegionTotal};

/// Applies extension matrices through a solved Leontief inverse.
///
/// Cheap to clone; the inverse and extensions are shared, and the
/// multiplier matrix is computed on first use and then kept.
#[derive(Debug, Clone)]
pub struct ImpactEngine {
    inverse: Arc<LeontiefInverse>,
    extensions: Arc<ExtensionMatrix>,
    multipliers: Arc<OnceCell<DenseMatrix>>,
}

/// One category total with its display conversion applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    /// In the category's base unit.
    pub raw: f64,
    pub value: f64,
    pub unit: String,
}

impl CategoryTotal {
    fn new(category: &ImpactCategory, raw: f64) -> Self {
        let (value, unit) = category.display(raw);
        Self {
            category: category.name.clone(),
            raw,
            value,
            unit: unit.to_string(),
        }
    }
}

impl ImpactEngine {
    /// Fails with `DimensionMismatch` unless both are built on the same
    /// industry index.
    pub fn new(
        inverse: Arc<LeontiefInverse>,
        extensions: Arc<ExtensionMatrix>,
    ) -> MrioResult<Self> {
        inverse
            .index()
            .ensure_aligned(extensions.index(), "extension matrix")?;
        Ok(Self {
            inverse,
            extensions,
            multipliers: Arc::new(OnceCell::new()),
        })
    }

    pub fn inverse(&self) -> &Arc<LeontiefInverse> {
        &self.inverse
    }

    pub fn extensions(&self) -> &Arc<ExtensionMatrix> {
        &self.extensions
    }

    pub fn n_industries(&self) -> usize {
        self.inverse.n_industries()
    }

    pub fn categories(&self) -> &[ImpactCategory] {
        self.extensions.categories()
    }

    fn check_demand(&self, demand: &FinalDemandVector) -> MrioResult<()> {
        self.inverse
            .index()
            .ensure_aligned(demand.index(), "final demand")
    }

    fn check_position(&self, j: usize) -> MrioResult<()> {
        let n = self.n_industries();
        if j >= n {
            return Err(MrioError::dimension("industry position", n, j));
        }
        Ok(())
    }

    /// x = L·y
    pub fn total_output(&self, demand: &FinalDemandVector) -> MrioResult<Vec<f64>> {
        self.check_demand(demand)?;
        self.inverse.mul_vec(demand.values())
    }

    /// S[:,j]
    pub fn direct_impact(&self, j: usize) -> MrioResult<Vec<f64>> {
        self.check_position(j)?;
        Ok(self.extensions.column(j))
    }

    /// S·L·y, one entry per category.
    pub fn total_impact(&self, demand: &FinalDemandVector) -> MrioResult<Vec<f64>> {
        let x = self.total_output(demand)?;
        self.extensions.matrix().mul_vec(&x)
    }

    /// S[k,j]·x[j] per category k and industry j; row sums equal
    /// [`total_impact`](Self::total_impact).
    pub fn per_industry_impact(&self, demand: &FinalDemandVector) -> MrioResult<DenseMatrix> {
        let x = self.total_output(demand)?;
        let s = self.extensions.matrix();
        Ok(DenseMatrix::from_fn(s.rows(), s.cols(), |k, j| s.get(k, j) * x[j]))
    }

    /// M = S·L
    pub fn multipliers(&self) -> &DenseMatrix {
        self.multipliers.get_or_init(|| {
            let m = compute_multipliers(self.extensions.matrix(), self.inverse.matrix());
            debug!(
                categories = m.rows(),
                industries = m.cols(),
                "computed impact multipliers"
            );
            m
        })
    }

    /// M[k,j]; `None` outside the matrix.
    pub fn multiplier(&self, k: usize, j: usize) -> Option<f64> {
        let m = self.multipliers();
        if k < m.rows() && j < m.cols() {
            Some(m.get(k, j))
        } else {
            None
        }
    }

    /// Total impact of one category, named, with its display conversion.
    pub fn category_total(
        &self,
        demand: &FinalDemandVector,
        name: &str,
    ) -> MrioResult<CategoryTotal> {
        let k = self.extensions.category_position(name)?;
        let x = self.total_output(demand)?;
        let raw = mrio_core::matrix::dot(self.extensions.row(k), &x);
        let category = self
            .extensions
            .category(k)
            .ok_or_else(|| MrioError::UnknownCategory(name.to_string()))?;
        Ok(CategoryTotal::new(category, raw))
    }

    /// Totals of every category.
    pub fn impact_report(&self, demand: &FinalDemandVector) -> MrioResult<Vec<CategoryTotal>> {
        let totals = self.total_impact(demand)?;
        Ok(self
            .categories()
            .iter()
            .zip(totals)
            .map(|(category, raw)| CategoryTotal::new(category, raw))
            .collect())
    }

    /// Impact of one category by the region where it occurs.
    pub fn impact_by_region(
        &self,
        demand: &FinalDemandVector,
        name: &str,
    ) -> MrioResult<Vec<RegionTotal>> {
        let k = self.extensions.category_position(name)?;
        let x = self.total_output(demand)?;
        let row = self.extensions.row(k);
        let per_industry: Vec<f64> = row.iter().zip(&x).map(|(s, x)| s * x).collect();
        aggregate_by_region(self.inverse.index(), &per_industry)
    }
}

/// S (k × n) · L (n × n), one category row at a time.
fn compute_multipliers(s: &DenseMatrix, l: &DenseMatrix) -> DenseMatrix {
    let (k, n) = s.shape();
    let category_row = |c: usize| {
        let mut out = vec![0.0; n];
        for (i, &sci) in s.row(c).iter().enumerate() {
            if sci == 0.0 {
                continue;
            }
            for (o, &lij) in out.iter_mut().zip(l.row(i)) {
                *o += sci * lij;
            }
        }
        out
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<f64>> = (0..k).into_par_iter().map(category_row).collect();
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<f64>> = (0..k).map(category_row).collect();

    let mut m = DenseMatrix::zeros(k, n);
    for (c, row) in rows.into_iter().enumerate() {
        m.row_mut(c).copy_from_slice(&row);
    }
    m
}
