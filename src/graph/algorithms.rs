use super::wallet_graph::WalletGraph;
use std::collections::HashSet;

/// Result of shortest path finding
#[derive(Debug, Clone)]
pub struct ShortestPath {
    pub path: Vec<String>,
    pub total_distance: f64,
    pub hop_count: usize,
    pub total_volume: u64,
}

/// Graph algorithms implementation
pub struct GraphAlgorithms;

impl GraphAlgorithms {
    /// Find all shortest paths (BFS for unweighted shortest paths)
    pub fn all_shortest_paths(graph: &WalletGraph, from: &str, to: &str) -> Vec<ShortestPath> {
        if from == to {
            return vec![ShortestPath {
                path: vec![from.to_string()],
                total_distance: 0.0,
                hop_count: 0,
                total_volume: 0,
            }];
        }

        let mut paths = Vec::new();
        let mut visited = HashSet::new();
        Self::dfs_paths(
            graph,
            from,
            to,
            &mut visited,
            &mut vec![from.to_string()],
            &mut paths,
        );
        paths
    }

    /// Depth-first search for finding all paths
    fn dfs_paths(
        graph: &WalletGraph,
        current: &str,
        target: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
        all_paths: &mut Vec<ShortestPath>,
    ) {
        if current == target {
            all_paths.push(ShortestPath {
                path: path.clone(),
                total_distance: path.len() as f64 - 1.0,
                hop_count: path.len() - 1,
                total_volume: Self::calculate_path_volume(graph, path),
            });
            return;
        }

        visited.insert(current.to_string());

        for neighbor in graph.get_neighbors(current) {
            if !visited.contains(&neighbor) {
                path.push(neighbor.clone());
                Self::dfs_paths(graph, &neighbor, target, visited, path, all_paths);
                path.pop();
            }
        }

        visited.remove(current);
    }

    /// Calculate total volume transferred along a path
    fn calculate_path_volume(graph: &WalletGraph, path: &[String]) -> u64 {
        let mut total = 0u64;
        for i in 0..path.len() - 1 {
            for edge in graph.get_outgoing_edges(&path[i]) {
                if edge.to == path[i + 1] {
                    total = total.saturating_add(edge.amount);
                }
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, GraphNode};

    fn node(address: &str) -> GraphNode {
        GraphNode {
            address: address.to_string(),
            balance: 0,
            transaction_count: 0,
            risk_score: 0.0,
            is_exchange: false,
        }
    }

    fn edge(from: &str, to: &str, amount: u64) -> Edge {
        Edge {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            transaction_count: 1,
            last_transfer: 1,
            is_direct: true,
            slot: 1,
            block_time: Some(1),
            signature: format!("{from}-{to}"),
        }
    }

    #[test]
    fn all_shortest_paths_finds_every_route() {
        let mut graph = WalletGraph::new();
        for addr in ["a", "b", "c", "d"] {
            graph.add_node(node(addr));
        }
        graph.add_edge(edge("a", "b", 100));
        graph.add_edge(edge("a", "c", 100));
        graph.add_edge(edge("b", "d", 100));
        graph.add_edge(edge("c", "d", 100));

        let paths = GraphAlgorithms::all_shortest_paths(&graph, "a", "d");
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.hop_count == 2));
    }

    #[test]
    fn all_shortest_paths_empty_when_unreachable() {
        let mut graph = WalletGraph::new();
        graph.add_node(node("a"));
        graph.add_node(node("b"));

        let paths = GraphAlgorithms::all_shortest_paths(&graph, "a", "b");
        assert!(paths.is_empty());
    }
}
