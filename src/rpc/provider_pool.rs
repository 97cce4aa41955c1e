/// Load-balanced, retrying JSON-RPC client over one or more Solana endpoints.
///
/// Endpoint rotation is round-robin across calls (each new top-level `rpc()`
/// call starts at the next endpoint in line) and linear within a call (a
/// retried call walks forward through the endpoint list, it never wraps back
/// to re-try an endpoint it already failed against in the same call).
use crate::core::errors::{GhostError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Backoff for 429/rate-limit responses: doubles every retry starting here.
const RATE_LIMIT_BACKOFF_BASE: Duration = Duration::from_secs(1);
/// Flat backoff for transport-level failures (non-2xx status, malformed
/// body, connection error).
const TRANSPORT_BACKOFF_BASE: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    #[allow(dead_code)]
    id: Option<u64>,
    result: Option<T>,
    error: Option<RpcErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorPayload {
    code: i64,
    message: String,
}

/// Per-call metadata describing how the call was actually served.
#[derive(Debug, Clone)]
pub struct CallMeta {
    pub endpoint_used: String,
    pub attempts: u32,
    pub attempted_endpoints: Vec<String>,
    pub fallback_count: u32,
}

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub result: T,
    pub meta: CallMeta,
}

/// Cumulative, process-wide observability over the pool's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPoolStats {
    pub total_calls: u64,
    pub total_retries: u64,
    pub total_fallbacks: u64,
    pub failed_endpoints: Vec<String>,
    pub success_rate: f64,
}

struct Counters {
    total_calls: AtomicU64,
    successful_calls: AtomicU64,
    total_retries: AtomicU64,
    total_fallbacks: AtomicU64,
}

pub struct ProviderPool {
    endpoints: Vec<String>,
    next_start: Mutex<usize>,
    failed_endpoints: Mutex<Vec<String>>,
    client: reqwest::Client,
    timeout: Duration,
    retry_max: usize,
    counters: Counters,
}

impl ProviderPool {
    pub fn new(
        primary: String,
        fallbacks: Vec<String>,
        timeout: Duration,
        retry_max: usize,
    ) -> Self {
        let mut endpoints = vec![primary];
        endpoints.extend(fallbacks);

        ProviderPool {
            endpoints,
            next_start: Mutex::new(0),
            failed_endpoints: Mutex::new(Vec::new()),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("reqwest client build"),
            timeout,
            retry_max,
            counters: Counters {
                total_calls: AtomicU64::new(0),
                successful_calls: AtomicU64::new(0),
                total_retries: AtomicU64::new(0),
                total_fallbacks: AtomicU64::new(0),
            },
        }
    }

    fn take_start_index(&self) -> usize {
        let mut guard = self.next_start.lock().expect("next_start mutex poisoned");
        let start = *guard;
        *guard = (*guard + 1) % self.endpoints.len();
        start
    }

    fn record_failed_endpoint(&self, endpoint: &str) {
        let mut failed = self
            .failed_endpoints
            .lock()
            .expect("failed_endpoints mutex poisoned");
        if !failed.iter().any(|e| e == endpoint) {
            failed.push(endpoint.to_string());
        }
    }

    pub fn stats(&self) -> ProviderPoolStats {
        let total_calls = self.counters.total_calls.load(Ordering::Relaxed);
        let successful = self.counters.successful_calls.load(Ordering::Relaxed);
        let success_rate = if total_calls == 0 {
            0.0
        } else {
            successful as f64 / total_calls as f64
        };

        ProviderPoolStats {
            total_calls,
            total_retries: self.counters.total_retries.load(Ordering::Relaxed),
            total_fallbacks: self.counters.total_fallbacks.load(Ordering::Relaxed),
            failed_endpoints: self
                .failed_endpoints
                .lock()
                .expect("failed_endpoints mutex poisoned")
                .clone(),
            success_rate,
        }
    }

    /// Issue a single JSON-RPC call, retrying across endpoints on failure.
    pub async fn rpc<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Envelope<T>> {
        self.counters.total_calls.fetch_add(1, Ordering::Relaxed);

        let start = self.take_start_index();
        let mut attempted = Vec::new();
        let mut attempts = 0u32;
        let mut fallback_count = 0u32;
        let mut last_err = GhostError::Unknown("no endpoints configured".to_string());

        for offset in 0..self.endpoints.len() {
            let idx = (start + offset) % self.endpoints.len();
            let endpoint = &self.endpoints[idx];
            attempted.push(endpoint.clone());

            for retry in 0..=self.retry_max {
                attempts += 1;
                let body = RpcRequest {
                    jsonrpc: "2.0",
                    id: 1,
                    method,
                    params: params.clone(),
                };

                let send_result = self.client.post(endpoint).json(&body).send().await;

                match send_result {
                    Ok(resp) => {
                        let status = resp.status();
                        if status.as_u16() == 429 {
                            last_err = GhostError::RpcRateLimited(format!(
                                "endpoint {endpoint} rate limited"
                            ));
                            self.counters.total_retries.fetch_add(1, Ordering::Relaxed);
                            if retry < self.retry_max {
                                let backoff = RATE_LIMIT_BACKOFF_BASE * 2u32.pow(retry as u32);
                                tokio::time::sleep(backoff).await;
                                continue;
                            }
                            break;
                        }

                        if status.is_client_error() && status.as_u16() != 408 {
                            self.record_failed_endpoint(endpoint);
                            return Err(GhostError::RpcNonRetryable {
                                status: status.as_u16(),
                                message: format!("endpoint {endpoint} returned {status}"),
                            });
                        }

                        if !status.is_success() {
                            last_err =
                                GhostError::RpcTransport(format!("endpoint {endpoint}: {status}"));
                            self.counters.total_retries.fetch_add(1, Ordering::Relaxed);
                            if retry < self.retry_max {
                                tokio::time::sleep(TRANSPORT_BACKOFF_BASE).await;
                                continue;
                            }
                            break;
                        }

                        let parsed: RpcResponse<T> = match resp.json().await {
                            Ok(v) => v,
                            Err(e) => {
                                last_err = GhostError::from(e);
                                self.counters.total_retries.fetch_add(1, Ordering::Relaxed);
                                if retry < self.retry_max {
                                    tokio::time::sleep(TRANSPORT_BACKOFF_BASE).await;
                                    continue;
                                }
                                break;
                            }
                        };

                        if let Some(err) = parsed.error {
                            self.record_failed_endpoint(endpoint);
                            return Err(GhostError::RpcNonRetryable {
                                status: 200,
                                message: format!("rpc error {}: {}", err.code, err.message),
                            });
                        }

                        if let Some(result) = parsed.result {
                            self.counters.successful_calls.fetch_add(1, Ordering::Relaxed);
                            return Ok(Envelope {
                                result,
                                meta: CallMeta {
                                    endpoint_used: endpoint.clone(),
                                    attempts,
                                    attempted_endpoints: attempted,
                                    fallback_count,
                                },
                            });
                        }

                        return Err(GhostError::ParseMalformed(
                            "rpc response had neither result nor error".to_string(),
                        ));
                    }
                    Err(e) => {
                        last_err = if e.is_timeout() {
                            GhostError::Deadline(format!("endpoint {endpoint} timed out"))
                        } else {
                            GhostError::RpcTransport(format!("endpoint {endpoint}: {e}"))
                        };
                        self.counters.total_retries.fetch_add(1, Ordering::Relaxed);
                        if retry < self.retry_max {
                            tokio::time::sleep(TRANSPORT_BACKOFF_BASE).await;
                            continue;
                        }
                        break;
                    }
                }
            }

            self.record_failed_endpoint(endpoint);
            if offset + 1 < self.endpoints.len() {
                fallback_count += 1;
                self.counters.total_fallbacks.fetch_add(1, Ordering::Relaxed);
            }
        }

        Err(last_err)
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn round_robin_advances_start_index() {
        let pool = ProviderPool::new(
            "https://a.example".to_string(),
            vec!["https://b.example".to_string()],
            Duration::from_secs(1),
            1,
        );
        assert_eq!(pool.take_start_index(), 0);
        assert_eq!(pool.take_start_index(), 1);
        assert_eq!(pool.take_start_index(), 0);
    }

    #[test]
    fn stats_start_empty() {
        let pool = ProviderPool::new(
            "https://a.example".to_string(),
            vec![],
            Duration::from_secs(1),
            1,
        );
        let stats = pool.stats();
        assert_eq!(stats.total_calls, 0);
        assert_eq!(stats.success_rate, 0.0);
    }
}
