/// Ambient Prometheus metrics, observability only; there is no HTTP
/// exposition endpoint here (that belongs to a façade out of this crate's
/// scope), so `gather_metrics` is the only way out of this process.
use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// RPC calls issued by the provider pool, labeled by method and outcome.
    pub static ref RPC_CALLS: CounterVec = CounterVec::new(
        Opts::new("rpc_calls_total", "Total Solana JSON-RPC calls"),
        &["method", "status"]
    ).unwrap();

    /// Retries and cross-endpoint fallbacks performed by the provider pool.
    pub static ref RPC_RETRIES: Counter = Counter::new(
        "rpc_retries_total",
        "Total RPC retries across all endpoints"
    ).unwrap();

    pub static ref RPC_FALLBACKS: Counter = Counter::new(
        "rpc_fallbacks_total",
        "Total RPC endpoint fallbacks"
    ).unwrap();

    /// Single-flight analysis cache hit/miss, labeled by outcome.
    pub static ref CACHE_LOOKUPS: CounterVec = CounterVec::new(
        Opts::new("analysis_cache_lookups_total", "Total analysis cache lookups"),
        &["outcome"]
    ).unwrap();

    /// Comprehensive and single-agent investigations run.
    pub static ref INVESTIGATIONS_RUN: CounterVec = CounterVec::new(
        Opts::new("investigations_total", "Total investigations run"),
        &["kind"]
    ).unwrap();

    /// Wallet analyses performed (one per cache-miss pipeline run).
    pub static ref WALLET_ANALYSES: Counter = Counter::new(
        "wallet_analyses_total",
        "Total wallet analyses performed"
    ).unwrap();

    pub static ref ANALYSIS_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("analysis_duration_seconds", "Wallet analysis pipeline duration")
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0])
    ).unwrap();
}

/// Registers every metric above. Idempotent only on first call; a second
/// call against the same process will panic on duplicate registration,
/// matching `prometheus::Registry`'s own contract.
pub fn init_metrics() {
    REGISTRY.register(Box::new(RPC_CALLS.clone())).unwrap();
    REGISTRY.register(Box::new(RPC_RETRIES.clone())).unwrap();
    REGISTRY.register(Box::new(RPC_FALLBACKS.clone())).unwrap();
    REGISTRY.register(Box::new(CACHE_LOOKUPS.clone())).unwrap();
    REGISTRY.register(Box::new(INVESTIGATIONS_RUN.clone())).unwrap();
    REGISTRY.register(Box::new(WALLET_ANALYSES.clone())).unwrap();
    REGISTRY.register(Box::new(ANALYSIS_DURATION.clone())).unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_is_well_formed_utf8_after_init() {
        init_metrics();
        WALLET_ANALYSES.inc();
        let text = gather_metrics();
        assert!(text.contains("wallet_analyses_total"));
    }
}
