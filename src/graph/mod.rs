pub mod algorithms;
pub mod metrics;
pub mod wallet_graph;

use crate::core::Stage;

pub use algorithms::{GraphAlgorithms, ShortestPath};
pub use metrics::NetworkMetrics;
pub use wallet_graph::{Edge, GraphNode, WalletGraph, WeightedEdge};

/// Validated graph statistics, disabled rather than zero-valued when the
/// edge set is empty.
pub fn build_graph_stats(graph: &WalletGraph) -> Stage<NetworkMetrics> {
    if graph.edge_count() == 0 {
        return Stage::disabled("insufficient_parsed_data");
    }
    Stage::Enabled(NetworkMetrics::calculate(graph))
}
