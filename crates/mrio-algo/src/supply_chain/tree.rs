//! Arena storage and views of an expanded supply chain.

use mrio_core::{IndustryIndex, MrioError, MrioResult};
use serde::Serialize;
use std::sync::Arc;

/// Position of a node in [`SupplyChainTree::nodes`].
pub type NodeId = usize;

/// Why a node is in the tree and whether it was expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Industry under analysis (tier 0).
    Root,
    /// Supplier that was expanded into its own suppliers.
    Supplier,
    /// Supplier at the maximum tier, not expanded.
    DepthLimit,
    /// Supplier whose industry already appears on its own ancestor path.
    CyclicResidual,
    /// All suppliers of one parent whose contribution fell below the cutoff.
    BelowCutoff,
    /// Share of the parent's output not bought from other industries.
    ValueAdded,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Supplier => "supplier",
            NodeKind::DepthLimit => "depth_limit",
            NodeKind::CyclicResidual => "cyclic_residual",
            NodeKind::BelowCutoff => "below_cutoff",
            NodeKind::ValueAdded => "value_added",
        }
    }

    /// Aggregates and value added carry no single industry.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeKind::BelowCutoff | NodeKind::ValueAdded)
    }

    /// Supplier kinds that stand for everything upstream of them.
    pub fn is_truncated(&self) -> bool {
        matches!(
            self,
            NodeKind::DepthLimit | NodeKind::CyclicResidual | NodeKind::BelowCutoff
        )
    }
}

/// One node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplyChainNode {
    pub(crate) industry: Option<usize>,
    pub(crate) tier: usize,
    pub(crate) value: f64,
    pub(crate) impact: Option<f64>,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Suppliers folded into a `BelowCutoff` node.
    pub(crate) aggregated: usize,
}

impl SupplyChainNode {
    pub(crate) fn new(
        kind: NodeKind,
        industry: Option<usize>,
        tier: usize,
        value: f64,
        parent: Option<NodeId>,
    ) -> Self {
        Self {
            industry,
            tier,
            value,
            impact: None,
            kind,
            parent,
            children: Vec::new(),
            aggregated: 0,
        }
    }

    /// Industry position; `None` for synthetic nodes.
    pub fn industry(&self) -> Option<usize> {
        self.industry
    }

    pub fn tier(&self) -> usize {
        self.tier
    }

    /// Output of this industry required by the root, along this path.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Impact attributed to this node when the tree carries an impact lens.
    pub fn impact(&self) -> Option<f64> {
        self.impact
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn aggregated(&self) -> usize {
        self.aggregated
    }
}

/// Finite tree rendering of the cyclic supplier graph for one query.
///
/// Leaves (including cyclic-residual, below-cutoff and value-added leaves)
/// always sum to the root value. With an impact lens the node impacts sum
/// to the root's embodied impact.
#[derive(Debug, Clone)]
pub struct SupplyChainTree {
    pub(crate) index: Arc<IndustryIndex>,
    pub(crate) nodes: Vec<SupplyChainNode>,
    pub(crate) category: Option<String>,
    pub(crate) expanded: usize,
}

impl SupplyChainTree {
    pub const ROOT: NodeId = 0;

    /// Deepest tier [`to_view`](Self::to_view) will nest. Building,
    /// serialising and dropping the view all recurse once per tier.
    pub const MAX_VIEW_DEPTH: usize = 512;

    pub fn index(&self) -> &Arc<IndustryIndex> {
        &self.index
    }

    pub fn root(&self) -> &SupplyChainNode {
        &self.nodes[Self::ROOT]
    }

    pub fn node(&self, id: NodeId) -> Option<&SupplyChainNode> {
        self.nodes.get(id)
    }

    /// All nodes in breadth-first order; the root is first.
    pub fn nodes(&self) -> &[SupplyChainNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Impact category of the lens, if any.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Nodes whose suppliers were generated.
    pub fn expanded_count(&self) -> usize {
        self.expanded
    }

    pub fn leaves(&self) -> impl Iterator<Item = &SupplyChainNode> {
        self.nodes.iter().filter(|n| n.is_leaf())
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    pub fn max_tier(&self) -> usize {
        self.nodes.iter().map(|n| n.tier).max().unwrap_or(0)
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    pub fn leaf_sum(&self) -> f64 {
        self.leaves().map(|n| n.value).sum()
    }

    /// Σ impact over all nodes; `None` without an impact lens.
    pub fn impact_sum(&self) -> Option<f64> {
        self.category.as_ref()?;
        Some(self.nodes.iter().filter_map(|n| n.impact).sum())
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &SupplyChainNode> {
        let mut next = self.nodes.get(id).and_then(|n| n.parent);
        std::iter::from_fn(move || {
            let node = self.nodes.get(next?)?;
            next = node.parent;
            Some(node)
        })
    }

    pub fn label(&self, id: NodeId) -> String {
        match self.nodes.get(id) {
            Some(node) => self.node_label(node),
            None => format!("#{id}"),
        }
    }

    fn node_label(&self, node: &SupplyChainNode) -> String {
        match (node.kind, node.industry) {
            (NodeKind::BelowCutoff, _) => format!("below cutoff ({} suppliers)", node.aggregated),
            (NodeKind::ValueAdded, _) => "value added".to_string(),
            (_, Some(pos)) => self.index.label(pos),
            (_, None) => "unknown".to_string(),
        }
    }

    /// Labels from the root down to `id`.
    pub fn path(&self, id: NodeId) -> Vec<String> {
        let mut ids: Vec<NodeId> = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.nodes.get(current) {
                Some(node) => {
                    ids.push(current);
                    cursor = node.parent;
                }
                None => break,
            }
        }
        ids.iter().rev().map(|&i| self.label(i)).collect()
    }

    fn share(&self, value: f64) -> f64 {
        let root = self.root().value;
        if root == 0.0 {
            0.0
        } else {
            value / root
        }
    }

    /// Nested view for JSON or similar nested output.
    ///
    /// Fails with [`MrioError::TreeTooDeep`] past
    /// [`MAX_VIEW_DEPTH`](Self::MAX_VIEW_DEPTH) tiers; [`rows`](Self::rows)
    /// has no such limit.
    pub fn to_view(&self) -> MrioResult<SupplyChainView> {
        let depth = self.max_tier();
        if depth > Self::MAX_VIEW_DEPTH {
            return Err(MrioError::TreeTooDeep {
                depth,
                limit: Self::MAX_VIEW_DEPTH,
            });
        }
        Ok(self.view_of(Self::ROOT))
    }

    fn view_of(&self, id: NodeId) -> SupplyChainView {
        let node = &self.nodes[id];
        let industry = node.industry.and_then(|pos| self.index.industry(pos));
        SupplyChainView {
            label: self.node_label(node),
            region: industry.map(|i| i.region.clone()),
            sector: industry.map(|i| i.sector.clone()),
            tier: node.tier,
            kind: node.kind,
            value: node.value,
            share: self.share(node.value),
            impact: node.impact,
            children: node.children.iter().map(|&c| self.view_of(c)).collect(),
        }
    }

    pub fn to_json_pretty(&self) -> MrioResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_view()?)?)
    }

    /// One row per node in breadth-first order, for tabular output.
    pub fn rows(&self) -> Vec<SupplyChainRow> {
        // Parents precede their children, so each path extends an earlier one.
        let mut paths: Vec<String> = Vec::with_capacity(self.nodes.len());
        let mut rows = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let label = self.node_label(node);
            let path = match node.parent.and_then(|p| paths.get(p)) {
                Some(parent) => format!("{parent} > {label}"),
                None => label.clone(),
            };
            rows.push(SupplyChainRow {
                tier: node.tier,
                path: path.clone(),
                label,
                kind: node.kind,
                value: node.value,
                share: self.share(node.value),
                impact: node.impact,
            });
            paths.push(path);
        }
        rows
    }
}

/// Nested, serialisable form of a [`SupplyChainTree`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyChainView {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    pub tier: usize,
    pub kind: NodeKind,
    pub value: f64,
    /// value / root value
    pub share: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SupplyChainView>,
}

/// Flat form of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyChainRow {
    pub tier: usize,
    pub path: String,
    pub label: String,
    pub kind: NodeKind,
    pub value: f64,
    pub share: f64,
    pub impact: Option<f64>,
}
