/// Address clustering by co-spending / shared-counterparty patterns, plus a
/// pluggable catalog of CEX/bridge/mixer interaction signatures.
///
/// Clustering uses union-find over shared counterparties rather than plain
/// BFS reachability, since membership here is edge-predicate driven.
use crate::graph::WalletGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub address: String,
    pub cluster_id: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterAggregate {
    pub cluster_id: usize,
    pub members: Vec<String>,
    pub total_volume: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityAnalysis {
    pub assignments: Vec<ClusterAssignment>,
    pub clusters: Vec<ClusterAggregate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationType {
    Cex,
    Bridge,
    Mixer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationEvent {
    pub address: String,
    pub counterparty: String,
    pub integration_type: IntegrationType,
    pub direction: IntegrationDirection,
    pub confidence: f64,
}

/// A source of known CEX/bridge/mixer addresses. Blacklist sources vary in
/// the wild (env list, hardcoded pairs, an external service); this is kept
/// pluggable with an empty default so callers can supply their own.
pub trait BlacklistProvider: Send + Sync {
    fn lookup(&self, address: &str) -> Option<IntegrationType>;
}

#[derive(Default)]
pub struct StaticBlacklist {
    entries: HashMap<String, IntegrationType>,
}

impl StaticBlacklist {
    pub fn new() -> Self {
        StaticBlacklist::default()
    }

    pub fn with_entry(mut self, address: impl Into<String>, kind: IntegrationType) -> Self {
        self.entries.insert(address.into(), kind);
        self
    }
}

impl BlacklistProvider for StaticBlacklist {
    fn lookup(&self, address: &str) -> Option<IntegrationType> {
        self.entries.get(address).copied()
    }
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Cluster addresses that co-spend (share an edge) within the graph.
/// `min_shared_counterparties` is the co-spending / shared-counterparty
/// threshold: addresses with at least that many counterparties in common
/// are unioned into the same cluster.
pub fn cluster_addresses(graph: &WalletGraph, min_shared_counterparties: usize) -> EntityAnalysis {
    let addresses: Vec<String> = graph.nodes().keys().cloned().collect();
    let index_of: HashMap<&str, usize> = addresses
        .iter()
        .enumerate()
        .map(|(i, a)| (a.as_str(), i))
        .collect();

    let mut uf = UnionFind::new(addresses.len());

    let counterparties_of = |addr: &str| -> Vec<String> {
        let mut set: Vec<String> = graph
            .get_neighbors(addr)
            .into_iter()
            .chain(graph.get_predecessors(addr))
            .collect();
        set.sort();
        set.dedup();
        set
    };

    for i in 0..addresses.len() {
        let counterparties_i = counterparties_of(&addresses[i]);
        for j in (i + 1)..addresses.len() {
            let counterparties_j = counterparties_of(&addresses[j]);
            let shared = counterparties_i
                .iter()
                .filter(|c| counterparties_j.contains(c))
                .count();
            if shared >= min_shared_counterparties.max(1) {
                uf.union(i, j);
            }
        }
    }

    let mut root_to_cluster: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<ClusterAggregate> = Vec::new();
    let mut assignments = Vec::new();

    for (addr, &idx) in &index_of {
        let root = uf.find(idx);
        let cluster_id = *root_to_cluster.entry(root).or_insert_with(|| {
            clusters.push(ClusterAggregate {
                cluster_id: clusters.len(),
                members: Vec::new(),
                total_volume: 0,
            });
            clusters.len() - 1
        });

        clusters[cluster_id].members.push(addr.to_string());
        clusters[cluster_id].total_volume += graph.get_outgoing_volume(addr);

        assignments.push(ClusterAssignment {
            address: addr.to_string(),
            cluster_id,
        });
    }

    assignments.sort_by(|a, b| a.address.cmp(&b.address));

    EntityAnalysis {
        assignments,
        clusters,
    }
}

/// Detect CEX/bridge/mixer interaction events using structural tests
/// (fan-in/fan-out ratio, deposit-then-burst volume) layered on top of a
/// known-address catalog.
pub fn detect_integration_events(
    graph: &WalletGraph,
    blacklist: &dyn BlacklistProvider,
) -> Vec<IntegrationEvent> {
    let mut events = Vec::new();

    for address in graph.nodes().keys() {
        for edge in graph.get_outgoing_edges(address) {
            if let Some(kind) = blacklist.lookup(&edge.to) {
                events.push(IntegrationEvent {
                    address: address.clone(),
                    counterparty: edge.to.clone(),
                    integration_type: kind,
                    direction: IntegrationDirection::Outbound,
                    confidence: 0.9,
                });
            }
        }
        for edge in graph.get_incoming_edges(address) {
            if let Some(kind) = blacklist.lookup(&edge.from) {
                events.push(IntegrationEvent {
                    address: address.clone(),
                    counterparty: edge.from.clone(),
                    integration_type: kind,
                    direction: IntegrationDirection::Inbound,
                    confidence: 0.9,
                });
            }
        }

        let in_degree = graph.get_incoming_edges(address).len();
        let out_degree = graph.get_outgoing_edges(address).len();
        if in_degree >= 5 && out_degree >= 5 {
            let in_volume = graph.get_incoming_volume(address);
            let out_volume = graph.get_outgoing_volume(address);
            if in_volume > 0 {
                let ratio = out_volume as f64 / in_volume as f64;
                if (0.9..=1.1).contains(&ratio) {
                    events.push(IntegrationEvent {
                        address: address.clone(),
                        counterparty: "unknown".to_string(),
                        integration_type: IntegrationType::Mixer,
                        direction: IntegrationDirection::Inbound,
                        confidence: 0.6,
                    });
                }
            }
        }
    }

    events
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
    fn shared_counterparty_joins_cluster() {
        let mut g = WalletGraph::new();
        for addr in ["a", "b", "shared"] {
            g.add_node(node(addr));
        }
        g.add_edge(edge("a", "shared", 1));
        g.add_edge(edge("b", "shared", 1));

        let analysis = cluster_addresses(&g, 1);
        let cluster_a = analysis
            .assignments
            .iter()
            .find(|c| c.address == "a")
            .unwrap()
            .cluster_id;
        let cluster_b = analysis
            .assignments
            .iter()
            .find(|c| c.address == "b")
            .unwrap()
            .cluster_id;
        assert_eq!(cluster_a, cluster_b);
    }

    #[test]
    fn blacklist_hit_produces_integration_event() {
        let mut g = WalletGraph::new();
        g.add_node(node("wallet"));
        g.add_node(node("cex_hot_wallet"));
        g.add_edge(edge("wallet", "cex_hot_wallet", 1_000_000_000));

        let blacklist = StaticBlacklist::new().with_entry("cex_hot_wallet", IntegrationType::Cex);
        let events = detect_integration_events(&g, &blacklist);
        assert!(events
            .iter()
            .any(|e| e.counterparty == "cex_hot_wallet" && e.integration_type == IntegrationType::Cex));
    }

    #[test]
    fn empty_blacklist_yields_no_catalog_hits() {
        let mut g = WalletGraph::new();
        g.add_node(node("a"));
        g.add_node(node("b"));
        g.add_edge(edge("a", "b", 1));
        let blacklist = StaticBlacklist::new();
        let events = detect_integration_events(&g, &blacklist);
        assert!(events.is_empty());
    }
}
