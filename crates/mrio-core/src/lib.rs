//! # mrio-core: EE-MRIO Data Model
//!
//! Provides the data structures shared by every part of an environmentally
//! extended multi-regional input-output (EE-MRIO) analysis.
//!
//! ## Design Philosophy
//!
//! An EE-MRIO table is a set of matrices over **industries**, each industry
//! being a (region, sector) pair:
//!
//! - **Z** ([`TransactionMatrix`]): inter-industry sales, sparse, n × n
//! - **x** ([`OutputVector`]): total output per industry
//! - **S** ([`ExtensionMatrix`]): impact intensity per unit output, k × n
//! - **y** ([`FinalDemandVector`]): exogenous demand driving a scenario
//!
//! All of them share one [`IndustryIndex`], built once when the table is
//! loaded and never mutated. Alignment between tables is checked at the
//! boundary of every operation that combines them, so the numeric code can
//! assume in-bounds positions.
//!
//! ## Quick Start
//!
//! ```rust
//! use mrio_core::*;
//!
//! let index = IndustryIndex::from_regions_and_sectors(&["DE", "CN"], &["Steel", "Mining"])?
//!     .into_shared();
//!
//! let z = TransactionMatrix::from_triplets(
//!     index.clone(),
//!     vec![(3, 2, 40.0), (2, 0, 25.0), (0, 2, 5.0)],
//! )?;
//! let x = OutputVector::new(index.clone(), vec![100.0, 80.0, 200.0, 120.0])?;
//! let y = FinalDemandVector::for_industry(index.clone(), "DE", "Steel", 10.0)?;
//!
//! assert_eq!(z.get(3, 2), 40.0);
//! assert_eq!(x.len(), 4);
//! assert_eq!(y.total(), 10.0);
//! # Ok::<(), MrioError>(())
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph_utils;
pub mod index;
pub mod logging;
pub mod matrix;
pub mod solver;
pub mod table;
pub mod units;

pub use config::{AnalysisConfig, StageConfig, SolverConfig, SupplyChainConfig, UnitOverride};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{MrioError, MrioResult};
pub use graph_utils::{
    build_supplier_graph, cyclic_groups, supplier_graph_stats, SupplierGraph, SupplierGraphStats,
};
pub use index::{Industry, IndustryIndex};
pub use matrix::DenseMatrix;
pub use solver::*;
pub use table::{ExtensionMatrix, FinalDemandVector, OutputVector, TransactionMatrix};
pub use units::{ImpactCategory, UnitConversion};

/// Identifies one loaded dataset (a table year such as 2022).
pub type DatasetYear = u16;
