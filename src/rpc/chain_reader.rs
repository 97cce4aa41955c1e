/// Typed wrappers over the provider pool for the three Solana JSON-RPC calls
/// the analysis pipeline actually needs.
use crate::core::errors::{GhostError, Result};
use crate::rpc::provider_pool::ProviderPool;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    Individual,
    Program,
    TokenMint,
    TokenAccount,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub address: String,
    pub category: AccountCategory,
    pub executable: bool,
    pub owner_program: Option<String>,
    pub account_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub timestamp_quality: f64,
}

#[derive(Debug, Deserialize)]
struct RawAccountInfoValue {
    owner: Option<String>,
    executable: Option<bool>,
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAccountInfoResult {
    value: Option<RawAccountInfoValue>,
}

#[derive(Debug, Deserialize)]
struct RawSignatureEntry {
    signature: String,
    slot: u64,
    #[serde(rename = "blockTime")]
    block_time: Option<i64>,
    err: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawTransaction {
    pub slot: u64,
    #[serde(rename = "blockTime")]
    pub block_time: Option<i64>,
    pub transaction: Value,
    pub meta: Option<Value>,
}

const SPL_TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

fn validate_block_time(block_time: Option<i64>) -> f64 {
    match block_time {
        None => 0.0,
        Some(t) => {
            // 2020-01-01T00:00:00Z .. 2030-01-01T00:00:00Z, in Unix seconds.
            const LOWER: i64 = 1_577_836_800;
            const UPPER: i64 = 1_893_456_000;
            if t >= LOWER && t <= UPPER {
                1.0
            } else if t > 0 {
                0.5
            } else {
                0.0
            }
        }
    }
}

pub struct ChainReader {
    pool: Arc<ProviderPool>,
    commitment: String,
    tx_batch_size: usize,
    batch_concurrency: usize,
}

impl ChainReader {
    pub fn new(
        pool: Arc<ProviderPool>,
        commitment: String,
        tx_batch_size: usize,
        batch_concurrency: usize,
    ) -> Self {
        ChainReader {
            pool,
            commitment,
            tx_batch_size,
            batch_concurrency,
        }
    }

    pub async fn get_account_identity(&self, address: &str) -> Result<AccountIdentity> {
        let params = json!([
            address,
            { "encoding": "jsonParsed", "commitment": self.commitment }
        ]);

        let envelope = self
            .pool
            .rpc::<RawAccountInfoResult>("getAccountInfo", params)
            .await?;

        let Some(value) = envelope.result.value else {
            return Ok(AccountIdentity {
                address: address.to_string(),
                category: AccountCategory::Unknown,
                executable: false,
                owner_program: None,
                account_exists: false,
            });
        };

        let executable = value.executable.unwrap_or(false);
        let owner = value.owner.clone();

        let category = if executable {
            AccountCategory::Program
        } else if let Some(parsed_type) = value
            .data
            .as_ref()
            .and_then(|d| d.get("parsed"))
            .and_then(|p| p.get("type"))
            .and_then(|t| t.as_str())
        {
            match parsed_type {
                "mint" => AccountCategory::TokenMint,
                "account" => AccountCategory::TokenAccount,
                _ => AccountCategory::Individual,
            }
        } else if owner.as_deref() == Some(SPL_TOKEN_PROGRAM_ID) {
            AccountCategory::TokenAccount
        } else {
            AccountCategory::Individual
        };

        Ok(AccountIdentity {
            address: address.to_string(),
            category,
            executable,
            owner_program: owner,
            account_exists: true,
        })
    }

    pub async fn signatures_paginated(
        &self,
        address: &str,
        limit: usize,
        page_size: usize,
    ) -> Result<Vec<SignatureRecord>> {
        let page_size = page_size.min(100);
        let mut out = Vec::new();
        let mut before: Option<String> = None;

        while out.len() < limit {
            let remaining = limit - out.len();
            let this_page = remaining.min(page_size);

            let mut opts = serde_json::Map::new();
            opts.insert("limit".to_string(), json!(this_page));
            opts.insert("commitment".to_string(), json!(self.commitment));
            if let Some(b) = &before {
                opts.insert("before".to_string(), json!(b));
            }

            let params = json!([address, Value::Object(opts)]);
            let envelope = self
                .pool
                .rpc::<Vec<RawSignatureEntry>>("getSignaturesForAddress", params)
                .await?;

            if envelope.result.is_empty() {
                break;
            }

            let page_len = envelope.result.len();
            for entry in envelope.result {
                before = Some(entry.signature.clone());
                if entry.err.is_some() {
                    continue;
                }
                out.push(SignatureRecord {
                    timestamp_quality: validate_block_time(entry.block_time),
                    signature: entry.signature,
                    slot: entry.slot,
                    block_time: entry.block_time,
                });
            }

            if page_len < this_page {
                break;
            }
        }

        out.truncate(limit);
        Ok(out)
    }

    pub async fn batched_transactions(&self, signatures: &[String]) -> Result<Vec<RawTransaction>> {
        if signatures.is_empty() {
            return Ok(Vec::new());
        }

        let chunks: Vec<Vec<String>> = signatures
            .chunks(self.tx_batch_size.max(1))
            .map(|c| c.to_vec())
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.batch_concurrency.max(1)));
        let mut handles = Vec::new();

        for chunk in chunks {
            let pool = self.pool.clone();
            let commitment = self.commitment.clone();
            let semaphore = semaphore.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let mut results = Vec::new();
                for sig in chunk {
                    let params = json!([
                        sig,
                        {
                            "encoding": "json",
                            "maxSupportedTransactionVersion": 0,
                            "commitment": commitment,
                        }
                    ]);

                    match pool.rpc::<Option<RawTransaction>>("getTransaction", params).await {
                        Ok(envelope) => {
                            if let Some(tx) = envelope.result {
                                results.push(tx);
                            }
                        }
                        Err(e) => {
                            warn!(signature = %sig, error = %e, "dropping transaction that failed to fetch");
                        }
                    }
                }
                results
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(results) => all.extend(results),
                Err(e) => warn!(error = %e, "transaction batch task panicked"),
            }
        }

        if all.is_empty() && !signatures.is_empty() {
            return Err(GhostError::DegradedData(
                "all transactions in batch failed to fetch".to_string(),
            ));
        }

        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_quality_buckets() {
        assert_eq!(validate_block_time(Some(1_700_000_000)), 1.0);
        assert_eq!(validate_block_time(Some(100)), 0.5);
        assert_eq!(validate_block_time(Some(-5)), 0.0);
        assert_eq!(validate_block_time(None), 0.0);
    }
}
