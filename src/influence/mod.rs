/// Counterfactual node-removal impact analysis: for each of the top-N
/// addresses by taint score, temporarily remove the node and recompute
/// flow, reporting the delta.
use crate::core::Stage;
use crate::flow::attribute_flow;
use crate::graph::WalletGraph;
use crate::taint::TaintResult;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUDGET: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluenceEntry {
    pub address: String,
    pub flow_before: f64,
    pub flow_after: f64,
    pub delta_flow: f64,
    pub taint_mass_before: f64,
    pub taint_mass_after: f64,
    pub delta_taint_mass: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluenceAnalysis {
    pub entries: Vec<InfluenceEntry>,
    pub network_fragility: f64,
}

fn total_flow_sol(graph: &WalletGraph, sources: &[String], target: &str) -> f64 {
    match attribute_flow(graph, sources, target) {
        Stage::Enabled(result) => result.paths.iter().map(|p| p.flow_sol).sum(),
        Stage::Disabled { .. } => 0.0,
    }
}

fn graph_without(graph: &WalletGraph, removed: &str) -> WalletGraph {
    let mut pruned = WalletGraph::new();
    for (address, node) in graph.nodes() {
        if address != removed {
            pruned.add_node(node.clone());
        }
    }
    for edges in graph.edges().values() {
        for edge in edges {
            if edge.from != removed && edge.to != removed {
                pruned.add_edge(edge.clone());
            }
        }
    }
    pruned
}

/// Remove each of the top-N (by taint score) addresses in turn and measure
/// the impact on flow reachability to `target`, bounded by `budget` to
/// cap cost.
pub fn analyze_influence(
    graph: &WalletGraph,
    taint_results: &[TaintResult],
    sources: &[String],
    target: &str,
    budget: usize,
) -> Stage<InfluenceAnalysis> {
    if taint_results.is_empty() || sources.is_empty() {
        return Stage::disabled("missing_prerequisites");
    }

    let mut ranked = taint_results.to_vec();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(budget.max(1));

    let flow_before = total_flow_sol(graph, sources, target);
    let taint_mass_before: f64 = taint_results.iter().map(|r| r.score).sum();

    let mut entries = Vec::new();
    let mut flow_ratios = Vec::new();

    for candidate in &ranked {
        let pruned = graph_without(graph, &candidate.address);
        let flow_after = total_flow_sol(&pruned, sources, target);
        let taint_mass_after: f64 = taint_results
            .iter()
            .filter(|r| r.address != candidate.address)
            .map(|r| r.score)
            .sum();

        if flow_before > 0.0 {
            flow_ratios.push(flow_after / flow_before);
        }

        entries.push(InfluenceEntry {
            address: candidate.address.clone(),
            flow_before,
            flow_after,
            delta_flow: flow_after - flow_before,
            taint_mass_before,
            taint_mass_after,
            delta_taint_mass: taint_mass_after - taint_mass_before,
        });
    }

    let network_fragility = if flow_ratios.is_empty() {
        0.0
    } else {
        1.0 - (flow_ratios.iter().sum::<f64>() / flow_ratios.len() as f64)
    };

    Stage::Enabled(InfluenceAnalysis {
        entries,
        network_fragility,
    })
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
            last_transfer: 0,
            is_direct: true,
            slot: 1,
            block_time: Some(1_700_000_000),
            signature: format!("{from}-{to}"),
        }
    }

    #[test]
    fn removing_sole_path_node_drops_flow_to_zero() {
        let mut g = WalletGraph::new();
        g.add_node(node("source"));
        g.add_node(node("bridge"));
        g.add_node(node("target"));
        g.add_edge(edge("source", "bridge", 1_000_000_000));
        g.add_edge(edge("bridge", "target", 1_000_000_000));

        let taint_results = vec![TaintResult {
            address: "bridge".to_string(),
            score: 0.8,
            hops: 1,
            path: vec!["source".to_string(), "bridge".to_string()],
            contributing_value: 1.0,
        }];

        match analyze_influence(&g, &taint_results, &["source".to_string()], "target", DEFAULT_BUDGET) {
            Stage::Enabled(analysis) => {
                let entry = &analysis.entries[0];
                assert_eq!(entry.flow_after, 0.0);
                assert!(entry.delta_flow < 0.0);
            }
            Stage::Disabled { reason } => panic!("expected analysis, got disabled: {reason}"),
        }
    }
}
