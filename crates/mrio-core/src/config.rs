//! Analysis configuration.
//!
//! Stored as TOML; every section and field is optional and falls back to the
//! defaults below.
//!
//! ```toml
//! [solver]
//! backend = "sparse"
//! residual_tolerance = 1e-6
//! parallel = true
//!
//! [supply_chain]
//! max_depth = 5
//! cutoff = 0.01
//! include_value_added = true
//!
//! [stages]
//! raw_material_sectors = ["Mining of coal and lignite", "Cultivation of wheat"]
//!
//! [[units]]
//! category = "GHG emissions"
//! divisor = 1e9
//! unit = "Mt CO2-eq"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{MrioError, MrioResult};
use crate::solver::SolverKind;
use crate::units::{ImpactCategory, UnitConversion};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub solver: SolverConfig,
    pub supply_chain: SupplyChainConfig,
    pub stages: StageConfig,
    /// Display conversions per impact category.
    pub units: Vec<UnitOverride>,
}

/// Leontief solve settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverKind,
    /// Maximum absolute entry of (I - A)·L - I accepted.
    pub residual_tolerance: f64,
    /// Solve column blocks on the rayon pool.
    pub parallel: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverKind::default(),
            residual_tolerance: 1e-6,
            parallel: true,
        }
    }
}

/// Defaults for supply-chain tree queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyChainConfig {
    pub max_depth: usize,
    /// Fraction of the root contribution below which branches are pruned.
    pub cutoff: f64,
    /// Emit synthetic value-added leaves so children sum to their parent.
    pub include_value_added: bool,
}

impl Default for SupplyChainConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            cutoff: 0.01,
            include_value_added: true,
        }
    }
}

/// Stage decomposition settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Sector labels counted as resource extraction.
    pub raw_material_sectors: Vec<String>,
}

/// Display conversion for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOverride {
    pub category: String,
    pub divisor: f64,
    pub unit: String,
}

impl AnalysisConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> MrioResult<Self> {
        let config: AnalysisConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> MrioResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text).map_err(|err| match err {
            MrioError::Parse(msg) => MrioError::Parse(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        debug!(
            path = %path.display(),
            backend = config.solver.backend.as_str(),
            units = config.units.len(),
            "loaded analysis configuration"
        );
        Ok(config)
    }

    pub fn to_toml_string(&self) -> MrioResult<String> {
        toml::to_string_pretty(self).map_err(|e| MrioError::Config(e.to_string()))
    }

    pub fn validate(&self) -> MrioResult<()> {
        let tol = self.solver.residual_tolerance;
        if !(tol.is_finite() && tol > 0.0) {
            return Err(MrioError::Config(format!(
                "solver.residual_tolerance must be positive, got {tol}"
            )));
        }
        let cutoff = self.supply_chain.cutoff;
        if !(cutoff.is_finite() && cutoff >= 0.0) {
            return Err(MrioError::Config(format!(
                "supply_chain.cutoff must be non-negative, got {cutoff}"
            )));
        }
        for unit in &self.units {
            if !(unit.divisor.is_finite() && unit.divisor != 0.0) {
                return Err(MrioError::Config(format!(
                    "unit divisor for '{}' must be finite and non-zero",
                    unit.category
                )));
            }
        }
        Ok(())
    }

    /// Attach configured display conversions to matching categories.
    pub fn apply_units(&self, categories: &mut [ImpactCategory]) {
        for category in categories.iter_mut() {
            if let Some(unit) = self.units.iter().find(|u| u.category == category.name) {
                category.conversion = Some(UnitConversion::new(unit.divisor, unit.unit.clone()));
            }
        }
    }
}
