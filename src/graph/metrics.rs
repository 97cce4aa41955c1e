/// Network-wide structural metrics: degree distribution, density, and
/// aggregate transfer volume over a wallet graph.
use super::wallet_graph::WalletGraph;
use serde::{Deserialize, Serialize};

/// Overall network metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub min_degree: usize,
    pub diameter: usize,
    pub total_volume: u64,
    pub avg_transaction_value: f64,
}

impl NetworkMetrics {
    /// Calculate comprehensive network metrics
    pub fn calculate(graph: &WalletGraph) -> Self {
        let node_count = graph.node_count();
        let edge_count = graph.edge_count();
        let density = graph.density();

        let total_degree: usize = graph
            .nodes()
            .keys()
            .map(|addr| {
                let in_deg = graph.get_incoming_edges(addr).len();
                let out_deg = graph.get_outgoing_edges(addr).len();
                in_deg + out_deg
            })
            .sum();

        let avg_degree = if node_count > 0 {
            total_degree as f64 / node_count as f64
        } else {
            0.0
        };

        let (max_degree, min_degree) = graph
            .nodes()
            .keys()
            .map(|addr| {
                let in_deg = graph.get_incoming_edges(addr).len();
                let out_deg = graph.get_outgoing_edges(addr).len();
                in_deg + out_deg
            })
            .fold((0, usize::MAX), |(max, min), deg| {
                (max.max(deg), min.min(deg))
            });

        let min_degree = if min_degree == usize::MAX {
            0
        } else {
            min_degree
        };

        let total_volume: u64 = graph
            .edges()
            .values()
            .flat_map(|edges| edges.iter().map(|e| e.amount))
            .sum();

        let avg_transaction_value = if edge_count > 0 {
            total_volume as f64 / edge_count as f64
        } else {
            0.0
        };

        NetworkMetrics {
            node_count,
            edge_count,
            density,
            avg_degree,
            max_degree,
            min_degree,
            diameter: 0, // Would require BFS from each node
            total_volume,
            avg_transaction_value,
        }
    }

    /// Get summary string
    pub fn summary(&self) -> String {
        format!(
            "Network: {} nodes, {} edges, density: {:.4}, avg degree: {:.2}",
            self.node_count, self.edge_count, self.density, self.avg_degree
        )
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

    #[test]
    fn calculate_reports_density_and_degree() {
        let mut graph = WalletGraph::new();
        graph.add_node(node("a"));
        graph.add_node(node("b"));
        graph.add_edge(Edge {
            from: "a".to_string(),
            to: "b".to_string(),
            amount: 1_000,
            transaction_count: 1,
            last_transfer: 1,
            is_direct: true,
            slot: 1,
            block_time: Some(1),
            signature: "sig".to_string(),
        });

        let metrics = NetworkMetrics::calculate(&graph);
        assert_eq!(metrics.node_count, 2);
        assert_eq!(metrics.edge_count, 1);
        assert_eq!(metrics.total_volume, 1_000);
    }
}
