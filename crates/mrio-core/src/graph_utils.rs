//! Directed supplier graph of a coefficient matrix.
//!
//! Every non-zero coefficient A[i,j] is an edge i → j (industry i supplies
//! industry j). Input-output graphs are almost always cyclic: most industries
//! reach themselves through some chain of suppliers. The statistics here make
//! that structure visible before anyone tries to walk it.

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

/// Supplier graph: node weight is the industry position, edge weight the
/// coefficient.
pub type SupplierGraph = DiGraph<usize, f64>;

/// Build the supplier graph for `n` industries from `(supplier, buyer, a)`
/// entries. Zero coefficients are skipped.
pub fn build_supplier_graph<I>(n: usize, coefficients: I) -> SupplierGraph
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut graph = DiGraph::with_capacity(n, n * 4);
    let nodes: Vec<NodeIndex> = (0..n).map(|pos| graph.add_node(pos)).collect();
    for (supplier, buyer, a) in coefficients {
        if a != 0.0 && supplier < n && buyer < n {
            graph.add_edge(nodes[supplier], nodes[buyer], a);
        }
    }
    graph
}

/// Summary statistics of a supplier graph.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierGraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    /// Industries that buy from themselves (A[i,i] > 0).
    pub self_loops: usize,
    pub strongly_connected_components: usize,
    /// Size of the largest strongly connected component.
    pub largest_component: usize,
    pub is_cyclic: bool,
}

/// Density, self-supply and strongly-connected structure (Tarjan).
pub fn supplier_graph_stats(graph: &SupplierGraph) -> SupplierGraphStats {
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();
    let density = if node_count == 0 {
        0.0
    } else {
        edge_count as f64 / (node_count as f64 * node_count as f64)
    };
    let self_loops = graph
        .edge_references()
        .filter(|e| e.source() == e.target())
        .count();
    let components = tarjan_scc(graph);
    let largest_component = components.iter().map(Vec::len).max().unwrap_or(0);

    SupplierGraphStats {
        node_count,
        edge_count,
        density,
        self_loops,
        strongly_connected_components: components.len(),
        largest_component,
        is_cyclic: is_cyclic_directed(graph),
    }
}

/// Groups of industries that supply each other in a loop: strongly connected
/// components with more than one member, or a single self-supplying
/// industry. Positions are sorted within each group.
pub fn cyclic_groups(graph: &SupplierGraph) -> Vec<Vec<usize>> {
    tarjan_scc(graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .map(|&n| graph.find_edge(n, n).is_some())
                    .unwrap_or(false)
        })
        .map(|component| {
            let mut positions: Vec<usize> = component.into_iter().map(|n| graph[n]).collect();
            positions.sort_unstable();
            positions
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toy_table_has_one_cycle() {
        // a <-> b, b -> c has no return edge
        let graph = build_supplier_graph(3, vec![(0, 1, 0.5), (1, 0, 0.2), (1, 2, 0.6)]);
        let stats = supplier_graph_stats(&graph);
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.self_loops, 0);
        assert!(stats.is_cyclic);
        assert_eq!(stats.largest_component, 2);
        assert_eq!(stats.strongly_connected_components, 2);
        assert_eq!(cyclic_groups(&graph), vec![vec![0, 1]]);
    }

    #[test]
    fn test_acyclic_chain() {
        let graph = build_supplier_graph(3, vec![(0, 1, 0.1), (1, 2, 0.1), (2, 2, 0.0)]);
        let stats = supplier_graph_stats(&graph);
        assert!(!stats.is_cyclic);
        assert_eq!(stats.edge_count, 2);
        assert!(cyclic_groups(&graph).is_empty());
    }

    #[test]
    fn test_self_loop_counts_as_cycle() {
        let graph = build_supplier_graph(2, vec![(1, 1, 0.3)]);
        let stats = supplier_graph_stats(&graph);
        assert_eq!(stats.self_loops, 1);
        assert!(stats.is_cyclic);
        assert_eq!(cyclic_groups(&graph), vec![vec![1]]);
    }
}
