//! # Supply-chain trees
//!
//! The coefficient matrix is a weighted, generally cyclic graph: industry i
//! supplies A[i,j] per unit output of industry j, and every industry can
//! transitively supply itself. A [`SupplyChainTree`] is the finite tree a
//! person can read ("40% of this footprint traces to domestic steel, 15% of
//! which traces to mining...") derived from that graph for one query.
//!
//! ## Expansion
//!
//! Breadth-first by tier, starting from the root industry with value v(root)
//! (one unit of output, or the root's final demand). A node n of industry j
//! gets one child per supplier i with A[i,j] > 0, valued v(n)·A[i,j]:
//!
//! | Condition                                  | Child becomes                    |
//! |--------------------------------------------|----------------------------------|
//! | \|value\| < cutoff · \|v(root)\|           | folded into one `BelowCutoff` leaf |
//! | i already on the path root..n              | `CyclicResidual` leaf            |
//! | child tier = max depth                     | `DepthLimit` leaf                |
//! | otherwise                                  | `Supplier`, expanded next tier   |
//!
//! Each expanded node also gets a `ValueAdded` leaf worth
//! v(n)·(1 - Σ_i A[i,j]), so the leaves always sum to v(root). The leaf is
//! not clamped: a column whose coefficients sum above one yields a negative
//! value-added leaf (the coefficient builder reports such columns).
//!
//! Every path is a simple path in the supplier graph, so expansion
//! terminates for any depth and cutoff.
//!
//! ## Impact lens
//!
//! With an [`ImpactEngine`] and a category k, expanded nodes carry their
//! direct impact S[k,j]·v, truncated leaves carry everything upstream of
//! them M[k,j]·v (M = S·L), and value-added leaves carry nothing. Because
//! M = S + M·A the node impacts sum to M[k,root]·v(root) whatever the depth
//! and cutoff.

mod tree;

pub use tree::{
    NodeId, NodeKind, SupplyChainNode, SupplyChainRow, SupplyChainTree, SupplyChainView,
};

use mrio_core::{FinalDemandVector, Industry, MrioError, MrioResult, SupplyChainConfig};
use std::collections::VecDeque;
use tracing::debug;

use crate::coefficients::CoefficientMatrix;
use crate::impact::ImpactEngine;

/// How the root industry is identified.
#[derive(Debug, Clone, PartialEq)]
enum RootRef {
    Industry(Industry),
    Position(usize),
}

/// Value assigned to the root node.
#[derive(Debug, Clone, PartialEq)]
pub enum RootValue {
    /// One unit of output.
    Unit,
    Amount(f64),
    /// The root's entry in a final-demand vector.
    Demand(FinalDemandVector),
}

/// Parameters of one supply-chain query.
#[derive(Debug, Clone)]
pub struct SupplyChainQuery {
    root: RootRef,
    root_value: RootValue,
    max_depth: usize,
    cutoff: f64,
    include_value_added: bool,
    category: Option<String>,
}

impl SupplyChainQuery {
    /// Query rooted at `region/sector` with default depth and cutoff.
    pub fn new(region: &str, sector: &str) -> Self {
        Self::with_root(RootRef::Industry(Industry::new(region, sector)))
    }

    pub fn at_position(position: usize) -> Self {
        Self::with_root(RootRef::Position(position))
    }

    fn with_root(root: RootRef) -> Self {
        let defaults = SupplyChainConfig::default();
        Self {
            root,
            root_value: RootValue::Unit,
            max_depth: defaults.max_depth,
            cutoff: defaults.cutoff,
            include_value_added: defaults.include_value_added,
            category: None,
        }
    }

    /// Take depth, cutoff and value-added settings from configuration.
    pub fn configured(mut self, config: &SupplyChainConfig) -> Self {
        self.max_depth = config.max_depth;
        self.cutoff = config.cutoff;
        self.include_value_added = config.include_value_added;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Fraction of the root value below which suppliers are not expanded.
    /// Zero disables pruning.
    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_value_added(mut self, include: bool) -> Self {
        self.include_value_added = include;
        self
    }

    pub fn with_root_value(mut self, value: RootValue) -> Self {
        self.root_value = value;
        self
    }

    /// Attribute impacts of this category; requires
    /// [`build_with_impact`](Self::build_with_impact).
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Expand over the coefficient graph without an impact lens.
    pub fn build(&self, coefficients: &CoefficientMatrix) -> MrioResult<SupplyChainTree> {
        self.expand(coefficients, None)
    }

    /// Expand and attribute the query's impact category (the first
    /// category of the engine when none was set).
    pub fn build_with_impact(
        &self,
        coefficients: &CoefficientMatrix,
        engine: &ImpactEngine,
    ) -> MrioResult<SupplyChainTree> {
        coefficients
            .index()
            .ensure_aligned(engine.inverse().index(), "impact engine")?;
        let k = match &self.category {
            Some(name) => engine.extensions().category_position(name)?,
            None if engine.categories().is_empty() => {
                return Err(MrioError::UnknownCategory(
                    "extension matrix has no categories".into(),
                ))
            }
            None => 0,
        };
        self.expand(coefficients, Some((engine, k)))
    }

    fn resolve_root(&self, coefficients: &CoefficientMatrix) -> MrioResult<usize> {
        let index = coefficients.index();
        match &self.root {
            RootRef::Industry(industry) => index
                .position_of(industry)
                .map_err(|_| MrioError::InvalidRoot(industry.to_string())),
            RootRef::Position(pos) if *pos < index.len() => Ok(*pos),
            RootRef::Position(pos) => Err(MrioError::InvalidRoot(format!(
                "position {pos} outside {} industries",
                index.len()
            ))),
        }
    }

    fn resolve_value(&self, coefficients: &CoefficientMatrix, root: usize) -> MrioResult<f64> {
        let value = match &self.root_value {
            RootValue::Unit => 1.0,
            RootValue::Amount(v) => *v,
            RootValue::Demand(demand) => {
                coefficients
                    .index()
                    .ensure_aligned(demand.index(), "supply-chain demand")?;
                demand.get(root)
            }
        };
        if !value.is_finite() {
            return Err(MrioError::InvalidRoot(format!(
                "root value {value} is not finite"
            )));
        }
        Ok(value)
    }

    fn expand(
        &self,
        coefficients: &CoefficientMatrix,
        lens: Option<(&ImpactEngine, usize)>,
    ) -> MrioResult<SupplyChainTree> {
        if !(self.cutoff.is_finite() && self.cutoff >= 0.0) {
            return Err(MrioError::Config(format!(
                "supply-chain cutoff must be non-negative, got {}",
                self.cutoff
            )));
        }
        let root = self.resolve_root(coefficients)?;
        let root_value = self.resolve_value(coefficients, root)?;
        let threshold = self.cutoff * root_value.abs();

        let direct = |j: usize, v: f64| {
            lens.and_then(|(engine, k)| engine.extensions().intensity(k, j))
                .map(|s| s * v)
        };
        let embodied = |j: usize, v: f64| {
            lens.and_then(|(engine, k)| engine.multiplier(k, j))
                .map(|m| m * v)
        };
        let category = lens.and_then(|(engine, k)| {
            engine.extensions().category(k).map(|c| c.name.clone())
        });

        let mut tree = SupplyChainTree {
            index: coefficients.index().clone(),
            nodes: vec![SupplyChainNode::new(NodeKind::Root, Some(root), 0, root_value, None)],
            category,
            expanded: 0,
        };
        tree.nodes[SupplyChainTree::ROOT].impact = embodied(root, root_value);

        if self.max_depth == 0 || root_value == 0.0 {
            debug!(
                root = %coefficients.index().label(root),
                "supply chain degenerates to the root"
            );
            return Ok(tree);
        }

        let mut queue = VecDeque::from([SupplyChainTree::ROOT]);
        while let Some(id) = queue.pop_front() {
            let (industry, tier, value) = {
                let node = &tree.nodes[id];
                match node.industry {
                    Some(industry) => (industry, node.tier, node.value),
                    None => continue,
                }
            };

            tree.expanded += 1;
            tree.nodes[id].impact = direct(industry, value);
            let child_tier = tier + 1;
            let mut below_value = 0.0;
            let mut below_impact = 0.0;
            let mut below_count = 0;

            for (supplier, a) in coefficients.suppliers_of(industry) {
                let contribution = value * a;
                let kind = if contribution.abs() < threshold {
                    below_value += contribution;
                    below_impact += embodied(supplier, contribution).unwrap_or(0.0);
                    below_count += 1;
                    continue;
                } else if on_path(&tree, id, supplier) {
                    NodeKind::CyclicResidual
                } else if child_tier >= self.max_depth {
                    NodeKind::DepthLimit
                } else {
                    NodeKind::Supplier
                };

                let mut child =
                    SupplyChainNode::new(kind, Some(supplier), child_tier, contribution, Some(id));
                if kind.is_truncated() {
                    child.impact = embodied(supplier, contribution);
                }
                let child_id = push(&mut tree, child);
                if kind == NodeKind::Supplier {
                    queue.push_back(child_id);
                }
            }

            if below_count > 0 {
                let mut leaf = SupplyChainNode::new(
                    NodeKind::BelowCutoff,
                    None,
                    child_tier,
                    below_value,
                    Some(id),
                );
                leaf.aggregated = below_count;
                leaf.impact = lens.map(|_| below_impact);
                push(&mut tree, leaf);
            }

            if self.include_value_added {
                let value_added = value * (1.0 - coefficients.column_sum(industry));
                if value_added != 0.0 {
                    let mut leaf = SupplyChainNode::new(
                        NodeKind::ValueAdded,
                        None,
                        child_tier,
                        value_added,
                        Some(id),
                    );
                    leaf.impact = lens.map(|_| 0.0);
                    push(&mut tree, leaf);
                }
            }
        }

        debug!(
            root = %coefficients.index().label(root),
            nodes = tree.len(),
            expanded = tree.expanded,
            leaves = tree.leaf_count(),
            cyclic = tree.count_kind(NodeKind::CyclicResidual),
            max_tier = tree.max_tier(),
            "expanded supply chain"
        );
        Ok(tree)
    }
}

/// Whether `industry` is the industry of `id` or of one of its ancestors.
fn on_path(tree: &SupplyChainTree, id: NodeId, industry: usize) -> bool {
    let mut cursor = Some(id);
    while let Some(current) = cursor {
        let node = &tree.nodes[current];
        if node.industry == Some(industry) {
            return true;
        }
        cursor = node.parent;
    }
    false
}

fn push(tree: &mut SupplyChainTree, node: SupplyChainNode) -> NodeId {
    let id = tree.nodes.len();
    if let Some(parent) = node.parent {
        tree.nodes[parent].children.push(id);
    }
    tree.nodes.push(node);
    id
}
