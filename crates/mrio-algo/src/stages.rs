//! Supply-chain stage decomposition.
//!
//! Splits the total impact S·L·y of a demand vector into four stages by
//! where along the chain the output is produced. With x = L·y, a = A·y and
//! w = x - y (output of all upstream tiers), and R the raw-material rows:
//!
//! ```text
//! retail                 S · y
//! direct suppliers       S · a        on rows ∉ R
//! preliminary products   S · (w - a)  on rows ∉ R
//! resource extraction    S · w        on rows ∈ R
//! ```
//!
//! The four stages sum to the total. For a *regional* selection (regions
//! named, no sectors) every row inside the selected regions is booked as
//! retail instead, so impacts stay with the region under analysis.

use mrio_core::matrix::dot;
use mrio_core::{FinalDemandVector, MrioError, MrioResult, StageConfig};
use serde::Serialize;
use tracing::debug;

use crate::coefficients::CoefficientMatrix;
use crate::impact::ImpactEngine;
use crate::selection::IndustrySelection;

/// Position along the supply chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Retail,
    DirectSuppliers,
    PreliminaryProducts,
    ResourceExtraction,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Retail,
        Stage::DirectSuppliers,
        Stage::PreliminaryProducts,
        Stage::ResourceExtraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Retail => "retail",
            Stage::DirectSuppliers => "direct_suppliers",
            Stage::PreliminaryProducts => "preliminary_products",
            Stage::ResourceExtraction => "resource_extraction",
        }
    }
}

/// Stage impacts of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageImpact {
    pub category: String,
    pub unit: String,
    pub retail: f64,
    pub direct_suppliers: f64,
    pub preliminary_products: f64,
    pub resource_extraction: f64,
    pub total: f64,
}

impl StageImpact {
    pub fn get(&self, stage: Stage) -> f64 {
        match stage {
            Stage::Retail => self.retail,
            Stage::DirectSuppliers => self.direct_suppliers,
            Stage::PreliminaryProducts => self.preliminary_products,
            Stage::ResourceExtraction => self.resource_extraction,
        }
    }

    /// Each stage as a fraction of the total; unchanged when the total is
    /// zero. The total itself becomes 1.
    pub fn relative(&self) -> StageImpact {
        if self.total == 0.0 {
            return self.clone();
        }
        let share = |v: f64| v / self.total;
        StageImpact {
            category: self.category.clone(),
            unit: "share".to_string(),
            retail: share(self.retail),
            direct_suppliers: share(self.direct_suppliers),
            preliminary_products: share(self.preliminary_products),
            resource_extraction: share(self.resource_extraction),
            total: 1.0,
        }
    }
}

/// Decomposes demand-driven impacts into stages.
pub struct StageDecomposer<'a> {
    coefficients: &'a CoefficientMatrix,
    engine: &'a ImpactEngine,
    raw: Vec<bool>,
}

impl<'a> StageDecomposer<'a> {
    /// Raw-material rows are all industries whose sector is listed in
    /// `config.raw_material_sectors`.
    pub fn new(
        coefficients: &'a CoefficientMatrix,
        engine: &'a ImpactEngine,
        config: &StageConfig,
    ) -> MrioResult<Self> {
        let index = coefficients.index();
        index.ensure_aligned(engine.inverse().index(), "impact engine")?;

        let mut raw = vec![false; index.len()];
        for sector in &config.raw_material_sectors {
            let positions = index.positions_of_sector(sector);
            if positions.is_empty() {
                return Err(MrioError::unknown_industry("*", sector.as_str()));
            }
            for pos in positions {
                raw[pos] = true;
            }
        }
        Ok(Self {
            coefficients,
            engine,
            raw,
        })
    }

    pub fn is_raw_material(&self, position: usize) -> bool {
        self.raw.get(position).copied().unwrap_or(false)
    }

    /// Stage impacts of `demand` restricted to `selection`, one entry per
    /// category, in base units.
    pub fn decompose(
        &self,
        demand: &FinalDemandVector,
        selection: &IndustrySelection,
    ) -> MrioResult<Vec<StageImpact>> {
        let index = self.coefficients.index();
        index.ensure_aligned(demand.index(), "final demand")?;

        let y = selection.restrict(demand)?;
        let y = y.values();
        let x = self.engine.inverse().mul_vec(y)?;
        let a = self.coefficients.mul_vec(y)?;

        let n = index.len();
        let mut retail = y.to_vec();
        let mut direct = vec![0.0; n];
        let mut preliminary = vec![0.0; n];
        let mut extraction = vec![0.0; n];
        for i in 0..n {
            let upstream = x[i] - y[i];
            if self.raw[i] {
                extraction[i] = upstream;
            } else {
                direct[i] = a[i];
                preliminary[i] = upstream - a[i];
            }
        }

        if selection.is_regional() {
            for i in selection.region_positions(index)? {
                retail[i] += direct[i] + preliminary[i] + extraction[i];
                direct[i] = 0.0;
                preliminary[i] = 0.0;
                extraction[i] = 0.0;
            }
        }

        let extensions = self.engine.extensions();
        let stages = extensions
            .categories()
            .iter()
            .enumerate()
            .map(|(k, category)| {
                let s = extensions.row(k);
                StageImpact {
                    category: category.name.clone(),
                    unit: category.unit.clone(),
                    retail: dot(s, &retail),
                    direct_suppliers: dot(s, &direct),
                    preliminary_products: dot(s, &preliminary),
                    resource_extraction: dot(s, &extraction),
                    total: dot(s, &x),
                }
            })
            .collect();

        debug!(
            regional = selection.is_regional(),
            categories = extensions.n_categories(),
            "decomposed impacts into supply-chain stages"
        );
        Ok(stages)
    }

    /// Stage impacts of a single category, converted to its display unit.
    pub fn decompose_category(
        &self,
        demand: &FinalDemandVector,
        selection: &IndustrySelection,
        name: &str,
    ) -> MrioResult<StageImpact> {
        let extensions = self.engine.extensions();
        let k = extensions.category_position(name)?;
        let category = extensions
            .category(k)
            .ok_or_else(|| MrioError::UnknownCategory(name.to_string()))?;
        let raw = self
            .decompose(demand, selection)?
            .into_iter()
            .nth(k)
            .ok_or_else(|| MrioError::UnknownCategory(name.to_string()))?;

        let convert = |v: f64| category.display(v).0;
        Ok(StageImpact {
            category: raw.category,
            unit: category.display_unit().to_string(),
            retail: convert(raw.retail),
            direct_suppliers: convert(raw.direct_suppliers),
            preliminary_products: convert(raw.preliminary_products),
            resource_extraction: convert(raw.resource_extraction),
            total: convert(raw.total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{toy_coefficients, toy_engine, toy_index};

    fn config() -> StageConfig {
        StageConfig {
            raw_material_sectors: vec!["Mining".to_string()],
        }
    }

    fn demand() -> FinalDemandVector {
        FinalDemandVector::unit(toy_index(), 2, 10.0).unwrap()
    }

    #[test]
    fn test_stages_sum_to_total() {
        let a = toy_coefficients();
        let engine = toy_engine();
        let decomposer = StageDecomposer::new(&a, &engine, &config()).unwrap();
        assert!(decomposer.is_raw_material(0));

        let stages = decomposer
            .decompose(&demand(), &IndustrySelection::all())
            .unwrap();
        let totals = engine.total_impact(&demand()).unwrap();
        for (stage, total) in stages.iter().zip(totals) {
            let sum: f64 = Stage::ALL.iter().map(|&s| stage.get(s)).sum();
            assert!((sum - total).abs() < 1e-9, "{}: {} vs {}", stage.category, sum, total);
            assert!((stage.total - total).abs() < 1e-9);
        }
    }

    #[test]
    fn test_toy_stage_values() {
        // y = 10 Retail; a = A·y = [0, 6, 0]; x = [10/3, 20/3, 10].
        let a = toy_coefficients();
        let engine = toy_engine();
        let decomposer = StageDecomposer::new(&a, &engine, &config()).unwrap();
        let ghg = &decomposer
            .decompose(&demand(), &IndustrySelection::all())
            .unwrap()[0];

        // GHG intensities [2, 1, 0.5]
        assert!((ghg.retail - 5.0).abs() < 1e-9);
        assert!((ghg.direct_suppliers - 6.0).abs() < 1e-9);
        assert!((ghg.preliminary_products - (20.0 / 3.0 - 6.0)).abs() < 1e-9);
        assert!((ghg.resource_extraction - 20.0 / 3.0).abs() < 1e-9);

        let relative = ghg.relative();
        let shares: f64 = Stage::ALL.iter().map(|&s| relative.get(s)).sum();
        assert!((shares - 1.0).abs() < 1e-12);
        assert_eq!(relative.unit, "share");
    }

    #[test]
    fn test_regional_selection_books_domestic_rows_as_retail() {
        let a = toy_coefficients();
        let engine = toy_engine();
        let decomposer = StageDecomposer::new(&a, &engine, &config()).unwrap();
        let regional = IndustrySelection::all().with_regions(["R1"]);
        let stages = decomposer.decompose(&demand(), &regional).unwrap();
        for stage in &stages {
            assert_eq!(stage.direct_suppliers, 0.0);
            assert_eq!(stage.preliminary_products, 0.0);
            assert_eq!(stage.resource_extraction, 0.0);
            assert!((stage.retail - stage.total).abs() < 1e-9);
        }
    }

    #[test]
    fn test_category_in_display_unit() {
        let a = toy_coefficients();
        let engine = toy_engine();
        let decomposer = StageDecomposer::new(&a, &engine, &config()).unwrap();
        let ghg = decomposer
            .decompose_category(&demand(), &IndustrySelection::all(), "GHG")
            .unwrap();
        assert_eq!(ghg.unit, "t CO2-eq");
        assert!((ghg.retail - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_raw_sector_rejected() {
        let a = toy_coefficients();
        let engine = toy_engine();
        let config = StageConfig {
            raw_material_sectors: vec!["Fishing".to_string()],
        };
        assert!(matches!(
            StageDecomposer::new(&a, &engine, &config),
            Err(MrioError::UnknownIndustry { .. })
        ));
    }
}
