/// Process configuration, read once from the environment.
///
/// Every variable here is enumerated in the external-interfaces spec; there
/// is no config file layer and no CLI flag layer (bootstrap is an external
/// collaborator's job).
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub rpc_fallback_urls: Vec<String>,
    pub timeout: Duration,
    pub commitment: String,
    pub retry_max: usize,
    pub tx_batch_size: usize,
    pub batch_concurrency: usize,
    pub cache_ttl: Duration,
    pub cache_max_wait: Duration,
    pub enable_regression_validation: bool,
}

fn env_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let rpc_fallback_urls = env::var("SOLANA_RPC_FALLBACK_URLS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Config {
            rpc_url: env::var("SOLANA_RPC_URL")
                .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string()),
            rpc_fallback_urls,
            timeout: Duration::from_millis(env_var("SOLANA_TIMEOUT_MS", 30_000)),
            commitment: env::var("SOLANA_COMMITMENT").unwrap_or_else(|_| "confirmed".to_string()),
            retry_max: env_var("SOLANA_RETRY_MAX", 3),
            tx_batch_size: env_var("SOLANA_TX_BATCH_SIZE", 20),
            batch_concurrency: env_var("SOLANA_BATCH_CONCURRENCY", 4),
            cache_ttl: Duration::from_secs(env_var("WALLET_CACHE_TTL_S", 300)),
            cache_max_wait: Duration::from_secs(env_var("WALLET_CACHE_MAX_WAIT_S", 180)),
            enable_regression_validation: env_var("ENABLE_REGRESSION_VALIDATION", false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        // SAFETY: tests run single-threaded within this process for env vars
        // that are otherwise untouched by the rest of the suite.
        for key in [
            "SOLANA_RPC_URL",
            "SOLANA_RPC_FALLBACK_URLS",
            "SOLANA_TIMEOUT_MS",
            "SOLANA_RETRY_MAX",
            "WALLET_CACHE_TTL_S",
        ] {
            env::remove_var(key);
        }
        let cfg = Config::from_env();
        assert_eq!(cfg.retry_max, 3);
        assert_eq!(cfg.tx_batch_size, 20);
        assert_eq!(cfg.batch_concurrency, 4);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(300));
        assert_eq!(cfg.cache_max_wait, Duration::from_secs(180));
        assert!(!cfg.enable_regression_validation);
    }
}
