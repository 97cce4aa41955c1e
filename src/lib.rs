/// Wires the provider pool, chain reader, parser, graph engine, and every
/// analytic stage into one investigation pipeline: C1 -> C2 -> C4 ->
/// (C5..C10) -> C11 -> C12, with the analysis cache wrapping the whole
/// thing at wallet granularity.
pub mod cache;
pub mod core;
pub mod detective;
pub mod entity;
pub mod evidence;
pub mod flow;
pub mod graph;
pub mod influence;
pub mod metrics;
pub mod parser;
pub mod risk;
pub mod rpc;
pub mod taint;

use crate::cache::{AnalysisCache, CacheStatus};
use crate::core::{Config, Result, Stage, WalletAddress};
use crate::detective::{BaseSnapshot, DetectiveRecord, Investigation, Narrator, PersonaId, TemplateNarrator};
use crate::entity::{BlacklistProvider, StaticBlacklist};
use crate::evidence::DEFAULT_K;
use crate::graph::{Edge, GraphNode, WalletGraph};
use crate::influence::DEFAULT_BUDGET;
use crate::parser::{DataQuality, Direction, ParsedTransaction};
use crate::risk::{RegressionResult, RiskInputs};
use crate::rpc::{ChainReader, ProviderPool};
use crate::taint::{TaintConfig, TaintEngine, TaintOutcome, TaintResult, TaintSeed};

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Identity, transactions, quality, graph stats, entity clustering, risk.
pub const SHALLOW_DEPTH: usize = 1;
/// Everything in `SHALLOW_DEPTH` plus taint, evidence paths, flow
/// attribution, and influence analysis, seeded by the caller.
pub const DEEP_DEPTH: usize = 2;

pub struct GhostWalletHunter {
    config: Config,
    pool: Arc<ProviderPool>,
    reader: ChainReader,
    cache: AnalysisCache<BaseSnapshot>,
    taint_engine: TaintEngine,
    blacklist: Box<dyn BlacklistProvider>,
    narrator: Box<dyn Narrator>,
    regression_result: Option<RegressionResult>,
}

impl GhostWalletHunter {
    pub fn new(config: Config) -> Self {
        let pool = Arc::new(ProviderPool::new(
            config.rpc_url.clone(),
            config.rpc_fallback_urls.clone(),
            config.timeout,
            config.retry_max,
        ));
        let reader = ChainReader::new(
            pool.clone(),
            config.commitment.clone(),
            config.tx_batch_size,
            config.batch_concurrency,
        );
        let cache = AnalysisCache::new(config.cache_ttl, config.cache_max_wait);

        // The regression bank only runs when explicitly enabled; it's a
        // startup self-check, not part of the per-wallet analysis path.
        let regression_result = if config.enable_regression_validation {
            let result = risk::run_regression_harness();
            if result.pass_rate < 1.0 {
                warn!(pass_rate = result.pass_rate, recommendations = ?result.recommendations, "risk regression harness failed on startup");
            } else {
                info!(pass_rate = result.pass_rate, "risk regression harness passed on startup");
            }
            Some(result)
        } else {
            None
        };

        GhostWalletHunter {
            config,
            pool,
            reader,
            cache,
            taint_engine: TaintEngine::new(),
            blacklist: Box::new(StaticBlacklist::new()),
            narrator: Box::new(TemplateNarrator),
            regression_result,
        }
    }

    /// Result of the startup regression self-check, if
    /// `enable_regression_validation` was set; `None` means the harness was
    /// never invoked.
    pub fn regression_status(&self) -> Option<&RegressionResult> {
        self.regression_result.as_ref()
    }

    pub fn with_blacklist(mut self, blacklist: Box<dyn BlacklistProvider>) -> Self {
        self.blacklist = blacklist;
        self
    }

    pub fn with_narrator(mut self, narrator: Box<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn rpc_stats(&self) -> crate::rpc::ProviderPoolStats {
        self.pool.stats()
    }

    /// Run (or replay from cache) the full analytic snapshot for a wallet.
    pub async fn analyze_wallet(
        &self,
        address: &WalletAddress,
        seeds: &[TaintSeed],
        depth: usize,
    ) -> Result<BaseSnapshot> {
        let key = address.as_str();

        // `try_claim` is the single atomic check-and-set: it either returns a
        // fresh hit, tells us someone else is already computing, or claims
        // the slot for us in the same DashMap shard lock and returns `Miss`
        // meaning we won the claim. Looping after a `wait_for` timeout lets a
        // stalled computation's claim be retaken rather than racing it.
        loop {
            match self.cache.try_claim(key, depth) {
                CacheStatus::Ok(snapshot) => {
                    metrics::CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                    return Ok(snapshot);
                }
                CacheStatus::Computing => {
                    if let CacheStatus::Ok(snapshot) = self.cache.wait_for(key, depth).await {
                        metrics::CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
                        return Ok(snapshot);
                    }
                    continue;
                }
                CacheStatus::Miss => break,
            }
        }
        metrics::CACHE_LOOKUPS.with_label_values(&["miss"]).inc();

        let started = Instant::now();
        let result = self.compute_snapshot(address, seeds, depth).await;
        metrics::ANALYSIS_DURATION.observe(started.elapsed().as_secs_f64());

        match result {
            Ok(snapshot) => {
                self.cache.store(key, snapshot.clone(), depth);
                metrics::WALLET_ANALYSES.inc();
                Ok(snapshot)
            }
            Err(e) => {
                self.cache.invalidate(key);
                Err(e)
            }
        }
    }

    async fn compute_snapshot(
        &self,
        address: &WalletAddress,
        seeds: &[TaintSeed],
        depth: usize,
    ) -> Result<BaseSnapshot> {
        let wallet = address.as_str().to_string();

        let identity = self.reader.get_account_identity(&wallet).await?;

        let signature_limit = self.config.tx_batch_size.max(1) * 10;
        let signatures = self
            .reader
            .signatures_paginated(&wallet, signature_limit, 100)
            .await?;

        let signature_strs: Vec<String> = signatures.iter().map(|s| s.signature.clone()).collect();
        let raw_transactions = self.reader.batched_transactions(&signature_strs).await?;

        let mut transactions = Vec::with_capacity(raw_transactions.len());
        let mut missing_fees = 0usize;
        for raw in &raw_transactions {
            match parser::parse_transaction(&wallet, raw) {
                Ok(parsed) => {
                    if parsed.fee_lamports.is_none() {
                        missing_fees += 1;
                    }
                    transactions.push(parsed);
                }
                Err(e) => warn!(error = %e, "dropping malformed transaction"),
            }
        }

        let data_quality = parser::compute_data_quality(&signatures, transactions.len(), missing_fees);

        let wallet_graph = build_graph(&wallet, &transactions);
        let graph_stats = graph::build_graph_stats(&wallet_graph);
        let entity_analysis = entity::cluster_addresses(&wallet_graph, 2);
        let integration_events = entity::detect_integration_events(&wallet_graph, self.blacklist.as_ref());

        let (taint, evidence, flow_attribution, influence_analysis) = if depth >= DEEP_DEPTH && !seeds.is_empty() {
            let slot_range = signature_slot_range(&signatures);
            let taint_config = TaintConfig::default();
            let outcome = self
                .taint_engine
                .propagate(&wallet_graph, seeds, slot_range, &taint_config, &wallet);

            let seed_addresses: Vec<String> = seeds.iter().map(|s| s.address.clone()).collect();
            let evidence_stage =
                evidence::compute_evidence_paths(&wallet_graph, &seed_addresses, &wallet, DEFAULT_K);
            let flow_stage = flow::attribute_flow(&wallet_graph, &seed_addresses, &wallet);
            let taint_results: Vec<TaintResult> = outcome.results.values().cloned().collect();
            let influence_stage = influence::analyze_influence(
                &wallet_graph,
                &taint_results,
                &seed_addresses,
                &wallet,
                DEFAULT_BUDGET,
            );

            (
                Some(outcome),
                evidence_stage.into_option(),
                flow_stage.into_option(),
                influence_stage.into_option(),
            )
        } else {
            (None, None, None, None)
        };

        let rpc_stats = self.pool.stats();
        let inputs = build_risk_inputs(&transactions, &data_quality, &integration_events, &taint, &rpc_stats);
        let profile = risk::select_profile(&inputs);
        let risk_assessment = risk::assess(&inputs, profile);

        info!(
            wallet = %wallet,
            score = risk_assessment.final_score,
            level = ?risk_assessment.level,
            "wallet analysis complete"
        );

        Ok(BaseSnapshot {
            wallet_address: wallet,
            identity,
            transactions,
            data_quality,
            graph_stats: graph_stats.into_option(),
            taint,
            entity: Some(entity_analysis),
            evidence,
            flow: flow_attribution,
            influence: influence_analysis,
            risk: risk_assessment,
            rpc_stats,
        })
    }

    pub async fn run_single_agent(
        &self,
        address: &WalletAddress,
        persona: PersonaId,
        seeds: &[TaintSeed],
    ) -> Result<DetectiveRecord> {
        let snapshot = self.analyze_wallet(address, seeds, DEEP_DEPTH).await?;
        metrics::INVESTIGATIONS_RUN.with_label_values(&["single"]).inc();
        Ok(detective::run_agent(persona, &snapshot, self.narrator.as_ref()))
    }

    pub async fn run_comprehensive_investigation(
        &self,
        address: &WalletAddress,
        seeds: &[TaintSeed],
    ) -> Result<Investigation> {
        let snapshot = self.analyze_wallet(address, seeds, DEEP_DEPTH).await?;
        metrics::INVESTIGATIONS_RUN.with_label_values(&["comprehensive"]).inc();
        Ok(detective::run_comprehensive(
            address.as_str(),
            &snapshot,
            self.narrator.as_ref(),
            &[],
        ))
    }
}

fn signature_slot_range(signatures: &[crate::rpc::SignatureRecord]) -> (u64, u64) {
    let min = signatures.iter().map(|s| s.slot).min().unwrap_or(0);
    let max = signatures.iter().map(|s| s.slot).max().unwrap_or(0);
    (min, max)
}

fn build_graph(wallet: &str, transactions: &[ParsedTransaction]) -> WalletGraph {
    let mut graph = WalletGraph::new();
    graph.add_node(GraphNode {
        address: wallet.to_string(),
        balance: 0,
        transaction_count: transactions.len() as u64,
        risk_score: 0.0,
        is_exchange: false,
    });

    for tx in transactions {
        let Some(counterparty) = tx.counterparties.first() else {
            continue;
        };
        if graph.get_node(counterparty).is_none() {
            graph.add_node(GraphNode {
                address: counterparty.clone(),
                balance: 0,
                transaction_count: 0,
                risk_score: 0.0,
                is_exchange: false,
            });
        }

        let amount_lamports = (tx.sol_delta.abs() * 1_000_000_000.0) as u64;
        if amount_lamports == 0 {
            continue;
        }

        let (from, to) = match tx.direction {
            Direction::Out => (wallet.to_string(), counterparty.clone()),
            Direction::In => (counterparty.clone(), wallet.to_string()),
            Direction::Neutral | Direction::Unknown => continue,
        };

        graph.add_edge(Edge {
            from,
            to,
            amount: amount_lamports,
            transaction_count: 1,
            last_transfer: tx.block_time.unwrap_or(0).max(0) as u64,
            is_direct: true,
            slot: tx.slot,
            block_time: tx.block_time,
            signature: tx.signature.clone(),
        });
    }

    graph
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn fee_variance_coefficient(transactions: &[ParsedTransaction]) -> Option<f64> {
    let fees: Vec<f64> = transactions
        .iter()
        .filter_map(|t| t.fee_lamports)
        .map(|f| f as f64)
        .collect();
    if fees.len() < 3 {
        return None;
    }
    let avg = mean(&fees);
    if avg == 0.0 {
        return None;
    }
    let variance = fees.iter().map(|f| (f - avg).powi(2)).sum::<f64>() / fees.len() as f64;
    Some(variance.sqrt() / avg)
}

fn iqr_outlier_ratio(transactions: &[ParsedTransaction]) -> Option<f64> {
    if transactions.len() < 4 {
        return None;
    }
    let mut values: Vec<f64> = transactions.iter().map(|t| t.sol_delta.abs()).collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());

    let q1 = values[values.len() / 4];
    let q3 = values[values.len() * 3 / 4];
    let iqr = q3 - q1;
    if iqr <= 0.0 {
        return Some(0.0);
    }
    let upper = q3 + 1.5 * iqr;
    let outliers = values.iter().filter(|v| **v > upper).count();
    Some(outliers as f64 / values.len() as f64)
}

fn build_risk_inputs(
    transactions: &[ParsedTransaction],
    data_quality: &DataQuality,
    integration_events: &[entity::IntegrationEvent],
    taint: &Option<TaintOutcome>,
    rpc_stats: &crate::rpc::ProviderPoolStats,
) -> RiskInputs {
    let unique_counterparties = {
        let mut set: Vec<&String> = transactions.iter().flat_map(|t| t.counterparties.iter()).collect();
        set.sort();
        set.dedup();
        set.len()
    };

    let max_transaction_value_sol = transactions
        .iter()
        .map(|t| t.sol_delta.abs())
        .fold(0.0, f64::max);

    let has_cex_interactions = integration_events
        .iter()
        .any(|e| e.integration_type == entity::IntegrationType::Cex);
    let blacklist_hit = integration_events.iter().any(|e| e.confidence >= 0.9);
    let high_confidence_mixer_event = integration_events
        .iter()
        .any(|e| e.integration_type == entity::IntegrationType::Mixer && e.confidence >= 0.6);

    RiskInputs {
        transaction_count: transactions.len(),
        max_transaction_value_sol,
        unique_counterparties,
        has_incident_data: taint.is_some(),
        has_cex_interactions,
        blacklist_hit,
        mean_inbound_taint: taint.as_ref().map(|t| t.metrics.mean_score),
        high_confidence_mixer_event,
        fee_variance_coefficient: fee_variance_coefficient(transactions),
        iqr_outlier_ratio: iqr_outlier_ratio(transactions),
        data_quality_score: Some(data_quality.quality_score),
        rpc_success_rate: Some(rpc_stats.success_rate),
    }
}
