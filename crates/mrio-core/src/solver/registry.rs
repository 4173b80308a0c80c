use super::backend::{FaerSolver, GaussSolver, LinearSystemBackend, SparseLuSolver};
use crate::error::MrioError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Simple registry of available linear backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    Gauss,
    Faer,
    #[default]
    Sparse,
}

impl FromStr for SolverKind {
    type Err = MrioError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.to_ascii_lowercase().as_str() {
            "sparse" | "default" => Ok(SolverKind::Sparse),
            "faer" => Ok(SolverKind::Faer),
            "gauss" => Ok(SolverKind::Gauss),
            other => Err(MrioError::Config(format!(
                "unknown solver '{}'; supported values: {}",
                other,
                SolverKind::available().join(", ")
            ))),
        }
    }
}

impl SolverKind {
    pub fn build_solver(self) -> Arc<dyn LinearSystemBackend> {
        match self {
            SolverKind::Gauss => Arc::new(GaussSolver),
            SolverKind::Faer => Arc::new(FaerSolver),
            SolverKind::Sparse => Arc::new(SparseLuSolver),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["sparse", "faer", "gauss"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SolverKind::Gauss => "gauss",
            SolverKind::Faer => "faer",
            SolverKind::Sparse => "sparse",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseMatrix;

    #[test]
    fn solver_kind_parsing_supports_all_engines() {
        assert_eq!("gauss".parse::<SolverKind>().unwrap(), SolverKind::Gauss);
        assert_eq!("FAER".parse::<SolverKind>().unwrap(), SolverKind::Faer);
        assert_eq!("Sparse".parse::<SolverKind>().unwrap(), SolverKind::Sparse);
        assert_eq!("default".parse::<SolverKind>().unwrap(), SolverKind::Sparse);
        assert!(matches!(
            "umfpack".parse::<SolverKind>(),
            Err(MrioError::Config(_))
        ));
    }

    #[test]
    fn solver_backend_options_solve_diagonal_system() {
        let matrix = DenseMatrix::from_rows(&[vec![2.0, 0.0], vec![0.0, 3.0]]).unwrap();
        let rhs = vec![4.0, 6.0];

        for kind in [SolverKind::Gauss, SolverKind::Faer, SolverKind::Sparse] {
            let solver = kind.build_solver();
            assert_eq!(solver.name(), kind.as_str());
            let x = solver.solve(&matrix, &rhs).unwrap();
            assert!((x[0] - 2.0).abs() < 1e-12);
            assert!((x[1] - 2.0).abs() < 1e-12);
        }
    }
}
