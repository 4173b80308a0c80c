//! Small hand-checkable tables shared by unit tests, integration tests and
//! benches. Every fixture is valid by construction; the `expect`s only fire
//! if the fixtures themselves are edited into something invalid.

use mrio_core::{
    DenseMatrix, ExtensionMatrix, ImpactCategory, IndustryIndex, OutputVector, TransactionMatrix,
    UnitConversion,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::coefficients::{CoefficientBuilder, CoefficientMatrix};
use crate::impact::ImpactEngine;
use crate::leontief::{LeontiefInverse, LeontiefSolver};

/// Three industries in one region: Mining, Manufacturing, Retail.
pub fn toy_index() -> Arc<IndustryIndex> {
    IndustryIndex::from_pairs(vec![
        ("R1", "Mining"),
        ("R1", "Manufacturing"),
        ("R1", "Retail"),
    ])
    .expect("toy index")
    .into_shared()
}

/// Z = [[0,50,0],[20,0,30],[0,0,0]]
pub fn toy_transactions() -> TransactionMatrix {
    TransactionMatrix::from_dense(
        toy_index(),
        &[
            vec![0.0, 50.0, 0.0],
            vec![20.0, 0.0, 30.0],
            vec![0.0, 0.0, 0.0],
        ],
    )
    .expect("toy transactions")
}

/// x = [100, 100, 50]
pub fn toy_output() -> OutputVector {
    OutputVector::new(toy_index(), vec![100.0, 100.0, 50.0]).expect("toy output")
}

/// A = [[0,0.5,0],[0.2,0,0.6],[0,0,0]]
pub fn toy_coefficients() -> CoefficientMatrix {
    CoefficientBuilder::build(&toy_transactions(), &toy_output()).expect("toy coefficients")
}

pub fn toy_inverse() -> LeontiefInverse {
    LeontiefSolver::new()
        .solve(&toy_coefficients())
        .expect("toy inverse")
}

/// GHG (kg, shown in t) = [2, 1, 0.5]; Water (m3) = [0, 3, 1].
pub fn toy_extensions() -> ExtensionMatrix {
    let categories = vec![
        ImpactCategory::new("GHG", "kg CO2-eq")
            .with_conversion(UnitConversion::new(1000.0, "t CO2-eq")),
        ImpactCategory::new("Water", "m3"),
    ];
    let values = DenseMatrix::from_rows(&[vec![2.0, 1.0, 0.5], vec![0.0, 3.0, 1.0]])
        .expect("toy intensities");
    ExtensionMatrix::new(toy_index(), categories, values).expect("toy extensions")
}

pub fn toy_engine() -> ImpactEngine {
    ImpactEngine::new(Arc::new(toy_inverse()), Arc::new(toy_extensions())).expect("toy engine")
}

/// DE and CN, each with Steel and Mining, trading across the border.
pub fn two_region_index() -> Arc<IndustryIndex> {
    IndustryIndex::from_regions_and_sectors(&["DE", "CN"], &["Steel", "Mining"])
        .expect("two-region index")
        .into_shared()
}

pub fn two_region_transactions() -> TransactionMatrix {
    TransactionMatrix::from_triplets(
        two_region_index(),
        vec![
            (0, 0, 4.0),
            (1, 0, 20.0),
            (2, 0, 10.0),
            (3, 1, 3.0),
            (0, 2, 5.0),
            (3, 2, 30.0),
        ],
    )
    .expect("two-region transactions")
}

pub fn two_region_output() -> OutputVector {
    OutputVector::new(two_region_index(), vec![100.0, 50.0, 120.0, 80.0])
        .expect("two-region output")
}

/// Single GHG category in kg.
pub fn two_region_extensions() -> ExtensionMatrix {
    let values = DenseMatrix::from_rows(&[vec![1.0, 4.0, 2.0, 6.0]]).expect("intensities");
    ExtensionMatrix::new(
        two_region_index(),
        vec![ImpactCategory::new("GHG", "kg CO2-eq")],
        values,
    )
    .expect("two-region extensions")
}

/// Coefficients, inverse and extensions of the two-region table.
pub fn two_region_model() -> (CoefficientMatrix, LeontiefInverse, ExtensionMatrix) {
    let a = CoefficientBuilder::build(&two_region_transactions(), &two_region_output())
        .expect("two-region coefficients");
    let l = LeontiefSolver::new().solve(&a).expect("two-region inverse");
    (a, l, two_region_extensions())
}

/// Balanced random table of `regions × sectors` industries.
///
/// Each column buys from roughly `density` of all industries (always at
/// least one) and spends 30-70% of its output on intermediate inputs, so
/// (I - A) is comfortably non-singular. The supplier graph is cyclic. Same
/// seed, same tables.
pub fn synthetic_tables(
    regions: usize,
    sectors: usize,
    density: f64,
    seed: u64,
) -> (TransactionMatrix, OutputVector, ExtensionMatrix) {
    let region_labels: Vec<String> = (0..regions).map(|r| format!("R{r}")).collect();
    let sector_labels: Vec<String> = (0..sectors).map(|s| format!("S{s}")).collect();
    let index = IndustryIndex::from_regions_and_sectors(&region_labels, &sector_labels)
        .expect("synthetic index")
        .into_shared();
    let n = index.len();

    let mut rng = StdRng::seed_from_u64(seed);
    let output: Vec<f64> = (0..n).map(|_| 100.0 + 900.0 * rng.gen::<f64>()).collect();

    let mut triplets = Vec::new();
    for (j, &xj) in output.iter().enumerate() {
        let mut weights: Vec<(usize, f64)> = (0..n)
            .filter_map(|i| {
                let keep = rng.gen::<f64>() < density;
                let weight = rng.gen::<f64>() + 0.05;
                keep.then_some((i, weight))
            })
            .collect();
        if weights.is_empty() {
            weights.push(((j + 1) % n, 1.0));
        }
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        let column_share = 0.3 + 0.4 * rng.gen::<f64>();
        for (i, w) in weights {
            triplets.push((i, j, w / total * column_share * xj));
        }
    }

    let transactions =
        TransactionMatrix::from_triplets(index.clone(), triplets).expect("synthetic transactions");
    let output = OutputVector::new(index.clone(), output).expect("synthetic output");
    let raw: Vec<f64> = (0..2 * n).map(|_| rng.gen::<f64>()).collect();
    let intensities = DenseMatrix::from_fn(2, n, |k, j| (k + 1) as f64 * raw[k * n + j]);
    let extensions = ExtensionMatrix::new(
        index,
        vec![
            ImpactCategory::new("GHG", "kg CO2-eq"),
            ImpactCategory::new("Land use", "km2"),
        ],
        intensities,
    )
    .expect("synthetic extensions");
    (transactions, output, extensions)
}
