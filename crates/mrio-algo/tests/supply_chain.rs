//! Integration tests for supply-chain trees.
//!
//! Reconciliation of leaves against the root value and of the impact lens
//! against the engine's totals, cutoff monotonicity, termination on fully
//! cyclic tables, and the nested JSON form.

use mrio_algo::test_utils::{synthetic_tables, toy_coefficients, toy_engine};
use mrio_algo::{
    CoefficientBuilder, CoefficientMatrix, ImpactEngine, LeontiefSolver, NodeKind, RootValue,
    SupplyChainQuery, SupplyChainTree,
};
use mrio_core::{FinalDemandVector, IndustryIndex, MrioError, SupplyChainConfig};
use std::sync::Arc;

fn synthetic() -> (CoefficientMatrix, ImpactEngine) {
    let (z, x, s) = synthetic_tables(2, 8, 0.3, 11);
    let a = CoefficientBuilder::build(&z, &x).unwrap();
    let l = LeontiefSolver::new().solve(&a).unwrap();
    let engine = ImpactEngine::new(Arc::new(l), Arc::new(s)).unwrap();
    (a, engine)
}

/// Every industry buys from every industry, itself included.
fn fully_cyclic(n: usize) -> CoefficientMatrix {
    let labels: Vec<String> = (0..n).map(|i| format!("S{i}")).collect();
    let index = IndustryIndex::from_regions_and_sectors(&["R"], &labels)
        .unwrap()
        .into_shared();
    let a = 0.8 / n as f64;
    let rows: Vec<Vec<f64>> = (0..n).map(|_| vec![a; n]).collect();
    CoefficientMatrix::from_dense(index, &rows).unwrap()
}

/// Industry i buys 0.9 per unit of output from industry i + 1; the last
/// industry buys nothing.
fn supplier_chain(n: usize) -> CoefficientMatrix {
    let labels: Vec<String> = (0..n).map(|i| format!("S{i}")).collect();
    let index = IndustryIndex::from_regions_and_sectors(&["R"], &labels)
        .unwrap()
        .into_shared();
    CoefficientMatrix::from_triplets(index, (1..n).map(|i| (i, i - 1, 0.9))).unwrap()
}

#[test]
fn test_leaves_reconcile_at_unlimited_depth() {
    let (a, _) = synthetic();
    for root in [0, 5, 11] {
        let tree = SupplyChainQuery::at_position(root)
            .with_max_depth(usize::MAX)
            .with_cutoff(1e-4)
            .with_root_value(RootValue::Amount(250.0))
            .build(&a)
            .unwrap();
        assert!(
            (tree.leaf_sum() - 250.0).abs() < 1e-9,
            "root {}: leaves sum to {}",
            root,
            tree.leaf_sum()
        );
    }
}

#[test]
fn test_leaves_reconcile_for_any_truncation() {
    let (a, _) = synthetic();
    for depth in [0, 1, 2, 3, 6] {
        for cutoff in [0.0, 0.001, 0.05, 0.5] {
            let tree = SupplyChainQuery::at_position(3)
                .with_max_depth(depth)
                .with_cutoff(cutoff)
                .build(&a)
                .unwrap();
            assert!(
                (tree.leaf_sum() - 1.0).abs() < 1e-12,
                "depth {} cutoff {}: {}",
                depth,
                cutoff,
                tree.leaf_sum()
            );
            assert!(tree.max_tier() <= depth);
        }
    }
}

#[test]
fn test_impact_lens_reconciles_with_total_impact() {
    let (a, engine) = synthetic();
    let root = 6;
    let demand = FinalDemandVector::unit(a.index().clone(), root, 40.0).unwrap();
    let totals = engine.total_impact(&demand).unwrap();

    for (k, category) in engine.categories().iter().enumerate() {
        for (depth, cutoff) in [(1, 0.0), (4, 0.01), (usize::MAX, 1e-5)] {
            let tree = SupplyChainQuery::at_position(root)
                .with_max_depth(depth)
                .with_cutoff(cutoff)
                .with_root_value(RootValue::Demand(demand.clone()))
                .with_category(category.name.clone())
                .build_with_impact(&a, &engine)
                .unwrap();
            let attributed = tree.impact_sum().unwrap();
            assert!(
                (attributed - totals[k]).abs() < 1e-9 * totals[k].abs().max(1.0),
                "{} depth {} cutoff {}: {} vs {}",
                category.name,
                depth,
                cutoff,
                attributed,
                totals[k]
            );
        }
    }
}

#[test]
fn test_cutoff_never_increases_expanded_nodes() {
    let (a, _) = synthetic();
    let cutoffs = [0.0, 1e-4, 1e-3, 0.01, 0.05, 0.1, 0.3, 1.0];
    for depth in [2, 4] {
        let counts: Vec<usize> = cutoffs
            .iter()
            .map(|&cutoff| {
                SupplyChainQuery::at_position(1)
                    .with_max_depth(depth)
                    .with_cutoff(cutoff)
                    .build(&a)
                    .unwrap()
                    .expanded_count()
            })
            .collect();
        for pair in counts.windows(2) {
            assert!(pair[1] <= pair[0], "depth {}: {:?}", depth, counts);
        }
    }
}

#[test]
fn test_fully_cyclic_table_terminates() {
    let a = fully_cyclic(6);
    let tree = SupplyChainQuery::at_position(0)
        .with_max_depth(usize::MAX)
        .with_cutoff(0.0)
        .build(&a)
        .unwrap();

    // Expanded nodes are the simple paths from the root: Σ_k 5!/(5-k)!.
    assert_eq!(tree.expanded_count(), 326);
    assert!(tree.max_tier() <= 6);
    assert!(tree.count_kind(NodeKind::CyclicResidual) > 0);
    assert_eq!(tree.count_kind(NodeKind::DepthLimit), 0);
    assert!((tree.leaf_sum() - 1.0).abs() < 1e-12);
}

#[test]
fn test_every_path_is_simple() {
    let a = fully_cyclic(5);
    let tree = SupplyChainQuery::at_position(2)
        .with_max_depth(usize::MAX)
        .with_cutoff(0.0)
        .build(&a)
        .unwrap();
    for (id, node) in tree.nodes().iter().enumerate() {
        if node.kind() != NodeKind::Supplier {
            continue;
        }
        let industry = node.industry().unwrap();
        assert!(
            tree.ancestors(id).all(|n| n.industry() != Some(industry)),
            "node {} repeats an ancestor",
            id
        );
    }
}

#[test]
fn test_config_defaults_apply() {
    let config = SupplyChainConfig {
        max_depth: 1,
        cutoff: 0.0,
        include_value_added: false,
    };
    let tree = SupplyChainQuery::new("R1", "Retail")
        .configured(&config)
        .build(&toy_coefficients())
        .unwrap();
    assert_eq!(tree.count_kind(NodeKind::ValueAdded), 0);
    assert_eq!(tree.count_kind(NodeKind::DepthLimit), 1);
    assert_eq!(tree.len(), 2);
}

#[test]
fn test_tree_serialises_as_nested_json() {
    let tree = SupplyChainQuery::new("R1", "Retail")
        .with_cutoff(0.0)
        .with_max_depth(10)
        .with_root_value(RootValue::Amount(10.0))
        .with_category("GHG")
        .build_with_impact(&toy_coefficients(), &toy_engine())
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&tree.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["label"], "R1/Retail");
    assert_eq!(json["region"], "R1");
    assert_eq!(json["kind"], "root");
    assert_eq!(json["tier"], 0);
    assert_eq!(json["value"], 10.0);

    let children = json["children"].as_array().unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0]["sector"], "Manufacturing");
    assert_eq!(children[0]["kind"], "supplier");
    assert!((children[0]["share"].as_f64().unwrap() - 0.6).abs() < 1e-12);
    assert_eq!(children[1]["kind"], "value_added");
    assert!(children[1].get("region").is_none());
    assert_eq!(children[1]["impact"], 0.0);

    let mining = &children[0]["children"][0];
    assert_eq!(mining["sector"], "Mining");
    assert_eq!(mining["children"][0]["kind"], "cyclic_residual");
}

#[test]
fn test_rows_cover_every_node() {
    let (a, engine) = synthetic();
    let tree = SupplyChainQuery::at_position(0)
        .with_max_depth(3)
        .with_cutoff(0.02)
        .build_with_impact(&a, &engine)
        .unwrap();
    let rows = tree.rows();
    assert_eq!(rows.len(), tree.len());
    assert_eq!(tree.category(), Some("GHG"));
    for row in &rows {
        assert_eq!(row.path.split(" > ").count(), row.tier + 1);
        assert!(row.impact.is_some());
    }
}

#[test]
fn test_deep_chain_exports_as_rows_not_nested() {
    let a = supplier_chain(600);
    let tree = SupplyChainQuery::at_position(0)
        .with_max_depth(usize::MAX)
        .with_cutoff(0.0)
        .build(&a)
        .unwrap();
    assert_eq!(tree.max_tier(), 600);
    assert!((tree.leaf_sum() - 1.0).abs() < 1e-9);

    match tree.to_json_pretty() {
        Err(MrioError::TreeTooDeep { depth, limit }) => {
            assert_eq!(depth, 600);
            assert_eq!(limit, SupplyChainTree::MAX_VIEW_DEPTH);
        }
        other => panic!("expected TreeTooDeep, got {:?}", other.map(|s| s.len())),
    }
    assert!(tree.to_view().is_err());

    let rows = tree.rows();
    assert_eq!(rows.len(), tree.len());
    let deepest = rows.iter().max_by_key(|r| r.tier).unwrap();
    assert_eq!(deepest.path.split(" > ").count(), 601);
    assert!(deepest.path.starts_with("R/S0 > R/S1 > "));
    assert_eq!(deepest.kind, NodeKind::ValueAdded);
}

#[test]
fn test_chain_at_view_limit_still_nests() {
    let a = supplier_chain(600);
    let tree = SupplyChainQuery::at_position(0)
        .with_max_depth(SupplyChainTree::MAX_VIEW_DEPTH)
        .with_cutoff(0.0)
        .build(&a)
        .unwrap();
    assert_eq!(tree.max_tier(), SupplyChainTree::MAX_VIEW_DEPTH);
    assert_eq!(tree.count_kind(NodeKind::DepthLimit), 1);

    let json = tree.to_json_pretty().unwrap();
    assert!(json.contains("\"depth_limit\""));

    let mut view = tree.to_view().unwrap();
    let mut tiers = 0;
    while let Some(next) = view.children.into_iter().find(|c| c.kind != NodeKind::ValueAdded) {
        view = next;
        tiers += 1;
    }
    assert_eq!(tiers, SupplyChainTree::MAX_VIEW_DEPTH);
    assert_eq!(view.kind, NodeKind::DepthLimit);
}
