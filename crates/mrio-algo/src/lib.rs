//! # mrio-algo: EE-MRIO Modeling Engine
//!
//! Derives the Leontief model of an environmentally extended multi-regional
//! input-output table and answers footprint questions against it: how much
//! output a demand scenario requires, what impact it causes, and which tiers
//! of suppliers that impact comes from.
//!
//! ## Pipeline
//!
//! | Step | Type | Produces |
//! |------|------|----------|
//! | Coefficients | [`CoefficientBuilder`] | A = Z / x (column-wise) |
//! | Leontief inverse | [`LeontiefSolver`] | L = (I - A)⁻¹, residual-checked |
//! | Impacts | [`ImpactEngine`] | L·y, S·L·y, per-industry impacts, S·L |
//! | Supply chains | [`SupplyChainQuery`] | finite [`SupplyChainTree`] over the cyclic graph |
//! | Stages | [`StageDecomposer`] | retail / suppliers / preliminary / extraction split |
//!
//! A and L are derived once per table year and shared through
//! [`DerivedCache`]; every query reads them without mutation, so any number
//! of queries can run concurrently against one cached model.
//!
//! ## Parallelism
//!
//! With the default `parallel` feature the Leontief back-substitution, the
//! residual check and dense products run on the rayon pool. Results are
//! identical with the feature disabled.
//!
//! ## Example
//!
//! ```rust
//! use mrio_algo::test_utils::{toy_coefficients, toy_engine, toy_index};
//! use mrio_algo::{SupplyChainQuery, RootValue};
//! use mrio_core::FinalDemandVector;
//!
//! let engine = toy_engine();
//! let demand = FinalDemandVector::for_industry(toy_index(), "R1", "Retail", 10.0)?;
//! let output = engine.total_output(&demand)?;
//! assert!((output[2] - 10.0).abs() < 1e-12);
//!
//! let tree = SupplyChainQuery::new("R1", "Retail")
//!     .with_max_depth(4)
//!     .with_cutoff(0.01)
//!     .with_root_value(RootValue::Amount(10.0))
//!     .with_category("GHG")
//!     .build_with_impact(&toy_coefficients(), &engine)?;
//! assert!((tree.leaf_sum() - 10.0).abs() < 1e-9);
//! # Ok::<(), mrio_core::MrioError>(())
//! ```

pub mod coefficients;
pub mod dataset;
pub mod impact;
pub mod leontief;
pub mod regional;
pub mod selection;
pub mod stages;
pub mod supply_chain;
#[doc(hidden)]
pub mod test_utils;

pub use coefficients::{CoefficientBuilder, CoefficientMatrix};
pub use dataset::{Dataset, DerivedCache, DerivedModel};
pub use impact::{CategoryTotal, ImpactEngine};
pub use leontief::{LeontiefInverse, LeontiefSolver};
pub use regional::{aggregate_by_region, requirements_by_region, RegionTotal};
pub use selection::IndustrySelection;
pub use stages::{Stage, StageDecomposer, StageImpact};
pub use supply_chain::{
    NodeId, NodeKind, RootValue, SupplyChainNode, SupplyChainQuery, SupplyChainRow,
    SupplyChainTree, SupplyChainView,
};
