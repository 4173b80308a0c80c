//! Loaded datasets and the per-year cache of derived matrices.
//!
//! A [`Dataset`] is what the loading layer hands over: transactions, output
//! and extensions of one table year, aligned to one index. Deriving A and L
//! from it is the expensive step, so [`DerivedCache`] does it at most once
//! per year and hands out shared, immutable [`DerivedModel`]s.
//!
//! The cache is append-only. Lookups take a read lock; a missing year takes
//! the write lock only long enough to insert an empty cell, and the cell
//! itself serialises concurrent first derivations of the same year. A
//! failed derivation leaves the cell empty, so a later call retries.

use mrio_core::{
    AnalysisConfig, DatasetYear, ExtensionMatrix, IndustryIndex, MrioError, MrioResult,
    OutputVector, TransactionMatrix,
};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use web_time::Instant;

use crate::coefficients::{CoefficientBuilder, CoefficientMatrix};
use crate::impact::ImpactEngine;
use crate::leontief::{LeontiefInverse, LeontiefSolver};

/// Raw tables of one year.
#[derive(Debug, Clone)]
pub struct Dataset {
    year: DatasetYear,
    transactions: TransactionMatrix,
    output: OutputVector,
    extensions: Vec<Arc<ExtensionMatrix>>,
}

impl Dataset {
    /// Fails with `DimensionMismatch` if the tables use different indexes.
    pub fn new(
        year: DatasetYear,
        transactions: TransactionMatrix,
        output: OutputVector,
        extensions: Vec<ExtensionMatrix>,
    ) -> MrioResult<Self> {
        let index = transactions.index();
        index.ensure_aligned(output.index(), "output vector")?;
        for extension in &extensions {
            index.ensure_aligned(extension.index(), "extension matrix")?;
        }
        Ok(Self {
            year,
            transactions,
            output,
            extensions: extensions.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn year(&self) -> DatasetYear {
        self.year
    }

    pub fn index(&self) -> &Arc<IndustryIndex> {
        self.transactions.index()
    }

    pub fn transactions(&self) -> &TransactionMatrix {
        &self.transactions
    }

    pub fn output(&self) -> &OutputVector {
        &self.output
    }

    pub fn extensions(&self) -> &[Arc<ExtensionMatrix>] {
        &self.extensions
    }
}

/// Matrices derived from one [`Dataset`].
#[derive(Debug)]
pub struct DerivedModel {
    year: DatasetYear,
    coefficients: Arc<CoefficientMatrix>,
    inverse: Arc<LeontiefInverse>,
    engines: Vec<ImpactEngine>,
}

impl DerivedModel {
    /// A and L from the dataset, plus one impact engine per extension.
    pub fn derive(dataset: &Dataset, solver: &LeontiefSolver) -> MrioResult<Self> {
        let coefficients = Arc::new(CoefficientBuilder::build(
            &dataset.transactions,
            &dataset.output,
        )?);
        let inverse = Arc::new(solver.solve(&coefficients)?);
        let engines = dataset
            .extensions
            .iter()
            .map(|s| ImpactEngine::new(inverse.clone(), s.clone()))
            .collect::<MrioResult<Vec<_>>>()?;
        Ok(Self {
            year: dataset.year,
            coefficients,
            inverse,
            engines,
        })
    }

    pub fn year(&self) -> DatasetYear {
        self.year
    }

    pub fn index(&self) -> &Arc<IndustryIndex> {
        self.coefficients.index()
    }

    pub fn coefficients(&self) -> &Arc<CoefficientMatrix> {
        &self.coefficients
    }

    pub fn inverse(&self) -> &Arc<LeontiefInverse> {
        &self.inverse
    }

    pub fn engines(&self) -> &[ImpactEngine] {
        &self.engines
    }

    /// Engine of the extension that carries `category`.
    pub fn engine_for(&self, category: &str) -> MrioResult<&ImpactEngine> {
        self.engines
            .iter()
            .find(|e| e.extensions().category_position(category).is_ok())
            .ok_or_else(|| MrioError::UnknownCategory(category.to_string()))
    }
}

type Slot = Arc<OnceCell<Arc<DerivedModel>>>;

/// Append-only cache of derived models keyed by dataset year.
pub struct DerivedCache {
    solver: LeontiefSolver,
    entries: RwLock<HashMap<DatasetYear, Slot>>,
}

impl Default for DerivedCache {
    fn default() -> Self {
        Self::new(LeontiefSolver::default())
    }
}

impl DerivedCache {
    pub fn new(solver: LeontiefSolver) -> Self {
        Self {
            solver,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(LeontiefSolver::from_config(&config.solver))
    }

    pub fn solver(&self) -> &LeontiefSolver {
        &self.solver
    }

    fn slot(&self, year: DatasetYear) -> MrioResult<Slot> {
        if let Some(slot) = self.read()?.get(&year) {
            return Ok(slot.clone());
        }
        let mut entries = self
            .entries
            .write()
            .map_err(|_| MrioError::Other("derived cache lock poisoned".into()))?;
        Ok(entries.entry(year).or_default().clone())
    }

    fn read(
        &self,
    ) -> MrioResult<std::sync::RwLockReadGuard<'_, HashMap<DatasetYear, Slot>>> {
        self.entries
            .read()
            .map_err(|_| MrioError::Other("derived cache lock poisoned".into()))
    }

    /// The derived model of `dataset.year()`, deriving it on first request.
    pub fn get_or_derive(&self, dataset: &Dataset) -> MrioResult<Arc<DerivedModel>> {
        let slot = self.slot(dataset.year)?;
        if let Some(model) = slot.get() {
            debug!(year = dataset.year, "derived model cache hit");
            return Ok(model.clone());
        }

        let model = slot.get_or_try_init(|| {
            let start = Instant::now();
            let model = DerivedModel::derive(dataset, &self.solver)?;
            info!(
                year = dataset.year,
                industries = model.index().len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "derived coefficient matrix and Leontief inverse"
            );
            Ok::<_, MrioError>(Arc::new(model))
        })?;
        Ok(model.clone())
    }

    /// Already-derived model of `year`, if any.
    pub fn get(&self, year: DatasetYear) -> Option<Arc<DerivedModel>> {
        self.read().ok()?.get(&year)?.get().cloned()
    }

    pub fn contains(&self, year: DatasetYear) -> bool {
        self.get(year).is_some()
    }

    /// Years with a derived model, ascending.
    pub fn years(&self) -> Vec<DatasetYear> {
        let mut years: Vec<DatasetYear> = match self.read() {
            Ok(entries) => entries
                .iter()
                .filter(|(_, slot)| slot.get().is_some())
                .map(|(&year, _)| year)
                .collect(),
            Err(_) => Vec::new(),
        };
        years.sort_unstable();
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{toy_extensions, toy_output, toy_transactions};
    use std::thread;

    fn dataset(year: DatasetYear) -> Dataset {
        Dataset::new(year, toy_transactions(), toy_output(), vec![toy_extensions()]).unwrap()
    }

    #[test]
    fn test_derive_once_per_year() {
        let cache = DerivedCache::default();
        assert!(!cache.contains(2022));

        let first = cache.get_or_derive(&dataset(2022)).unwrap();
        let second = cache.get_or_derive(&dataset(2022)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.years(), vec![2022]);
        assert_eq!(first.engines().len(), 1);
        assert!(first.engine_for("Water").is_ok());
        assert!(first.engine_for("Noise").is_err());
    }

    #[test]
    fn test_concurrent_first_access_shares_model() {
        let cache = Arc::new(DerivedCache::default());
        let data = Arc::new(dataset(2019));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let data = data.clone();
                thread::spawn(move || cache.get_or_derive(&data).unwrap())
            })
            .collect();
        let models: Vec<Arc<DerivedModel>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        for model in &models[1..] {
            assert!(Arc::ptr_eq(&models[0], model));
        }
    }

    #[test]
    fn test_failed_derivation_is_not_cached() {
        let index = toy_transactions().index().clone();
        let z = TransactionMatrix::from_triplets(index.clone(), vec![(0, 1, -1.0)]).unwrap();
        let x = OutputVector::new(index, vec![1.0, 1.0, 1.0]).unwrap();
        let bad = Dataset::new(2000, z, x, Vec::new()).unwrap();

        let cache = DerivedCache::default();
        assert!(matches!(
            cache.get_or_derive(&bad),
            Err(MrioError::InvalidTable(_))
        ));
        assert!(!cache.contains(2000));
        assert!(cache.years().is_empty());
    }

    #[test]
    fn test_misaligned_dataset_rejected() {
        let other = IndustryIndex::from_pairs(vec![("X", "a")]).unwrap().into_shared();
        let x = OutputVector::new(other, vec![1.0]).unwrap();
        assert!(matches!(
            Dataset::new(2022, toy_transactions(), x, Vec::new()),
            Err(MrioError::DimensionMismatch { .. })
        ));
    }
}
