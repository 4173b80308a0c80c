//! Unified error types for EE-MRIO analysis
//!
//! Every failure the numeric engine can report is a variant of [`MrioError`].
//! All of them are deterministic and data-dependent: retrying the same call on
//! the same tables yields the same error, so nothing here is retried.
//!
//! # Example
//!
//! ```ignore
//! use mrio_core::{MrioError, MrioResult};
//!
//! fn invert(z: &TransactionMatrix, x: &OutputVector) -> MrioResult<LeontiefInverse> {
//!     let a = CoefficientBuilder::build(z, x)?;
//!     LeontiefSolver::new().solve(&a)
//! }
//! ```

use thiserror::Error;

/// Error type for all EE-MRIO operations.
#[derive(Error, Debug)]
pub enum MrioError {
    /// Malformed input table: wrong shape, negative or non-finite entries,
    /// duplicate industry labels.
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// A (region, sector) label pair that the index does not contain.
    #[error("Unknown industry: region '{region}', sector '{sector}'")]
    UnknownIndustry { region: String, sector: String },

    /// Matrices or vectors that are not aligned to the same industry index.
    #[error("Dimension mismatch in {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    /// (I - A) has no valid inverse within tolerance.
    #[error("Singular system: residual {residual:.3e} exceeds tolerance {tolerance:.3e} ({detail})")]
    SingularSystem {
        residual: f64,
        tolerance: f64,
        detail: String,
    },

    /// Supply-chain query rooted at an industry the index does not know.
    #[error("Invalid supply-chain root: {0}")]
    InvalidRoot(String),

    /// Impact category label missing from an extension matrix.
    #[error("Unknown impact category: {0}")]
    UnknownCategory(String),

    /// Supply-chain tree nested deeper than its nested view supports.
    #[error("Supply chain nests {depth} tiers, beyond the nested view limit of {limit}; export it as rows instead")]
    TreeTooDeep { depth: usize, limit: usize },

    /// I/O errors (configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using MrioError.
pub type MrioResult<T> = Result<T, MrioError>;

impl MrioError {
    /// Shorthand for a [`MrioError::DimensionMismatch`].
    pub fn dimension(what: impl Into<String>, expected: usize, got: usize) -> Self {
        MrioError::DimensionMismatch {
            what: what.into(),
            expected,
            got,
        }
    }

    /// Shorthand for a [`MrioError::UnknownIndustry`].
    pub fn unknown_industry(region: impl Into<String>, sector: impl Into<String>) -> Self {
        MrioError::UnknownIndustry {
            region: region.into(),
            sector: sector.into(),
        }
    }
}

impl From<anyhow::Error> for MrioError {
    fn from(err: anyhow::Error) -> Self {
        MrioError::Other(err.to_string())
    }
}

impl From<serde_json::Error> for MrioError {
    fn from(err: serde_json::Error) -> Self {
        MrioError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for MrioError {
    fn from(err: toml::de::Error) -> Self {
        MrioError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_context() {
        let err = MrioError::dimension("final demand", 9800, 49);
        let msg = err.to_string();
        assert!(msg.contains("final demand"));
        assert!(msg.contains("9800"));
        assert!(msg.contains("49"));

        let err = MrioError::unknown_industry("DE", "Steel");
        assert!(err.to_string().contains("'DE'"));
        assert!(err.to_string().contains("'Steel'"));
    }

    #[test]
    fn test_singular_system_display() {
        let err = MrioError::SingularSystem {
            residual: 1.5,
            tolerance: 1e-6,
            detail: "non-finite entries".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("1.500e0"));
        assert!(msg.contains("non-finite entries"));
    }

    #[test]
    fn test_tree_too_deep_points_to_rows() {
        let err = MrioError::TreeTooDeep {
            depth: 600,
            limit: 512,
        };
        let msg = err.to_string();
        assert!(msg.contains("600"));
        assert!(msg.contains("512"));
        assert!(msg.contains("rows"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MrioError = io_err.into();
        assert!(matches!(err, MrioError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> MrioResult<()> {
            Err(MrioError::InvalidRoot("XX/Nothing".into()))
        }

        fn outer() -> MrioResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(MrioError::InvalidRoot(_))));
    }
}
