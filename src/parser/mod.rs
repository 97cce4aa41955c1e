/// Transaction parsing and data-quality scoring, narrowed to SOL-only
/// deltas (no token-transfer or DEX decoding; that's out of scope).
use crate::core::errors::GhostError;
use crate::rpc::chain_reader::{RawTransaction, SignatureRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
    Neutral,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub sol_delta: f64,
    pub direction: Direction,
    pub fee_lamports: Option<u64>,
    pub counterparties: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataQuality {
    pub valid_timestamps: usize,
    pub timestamp_coverage: f64,
    pub timestamp_quality: f64,
    pub missing_fees: usize,
    pub missing_signatures: usize,
    pub quality_score: f64,
}

/// Parse one raw `getTransaction` response into wallet-centric fields. A
/// transaction whose message doesn't contain the wallet, or whose balance
/// arrays are malformed, is reported via `ParseMalformed` so the caller can
/// drop it and continue; a single bad transaction never aborts parsing.
pub fn parse_transaction(
    wallet: &str,
    raw: &RawTransaction,
) -> Result<ParsedTransaction, GhostError> {
    let message = raw
        .transaction
        .get("message")
        .ok_or_else(|| GhostError::ParseMalformed("transaction missing message".to_string()))?;

    let account_keys: Vec<String> = message
        .get("accountKeys")
        .and_then(|v| v.as_array())
        .ok_or_else(|| GhostError::ParseMalformed("message missing accountKeys".to_string()))?
        .iter()
        .filter_map(|k| account_key_str(k))
        .collect();

    let wallet_index = account_keys
        .iter()
        .position(|k| k == wallet)
        .ok_or_else(|| GhostError::ParseMalformed("wallet not present in account keys".to_string()))?;

    let meta = raw
        .meta
        .as_ref()
        .ok_or_else(|| GhostError::ParseMalformed("transaction missing meta".to_string()))?;

    let pre_balances = balances_array(meta, "preBalances")?;
    let post_balances = balances_array(meta, "postBalances")?;

    let pre = *pre_balances
        .get(wallet_index)
        .ok_or_else(|| GhostError::ParseMalformed("preBalances missing wallet index".to_string()))?;
    let post = *post_balances
        .get(wallet_index)
        .ok_or_else(|| GhostError::ParseMalformed("postBalances missing wallet index".to_string()))?;

    let sol_delta = (post as i64 - pre as i64) as f64 / 1_000_000_000.0;
    let direction = if sol_delta < 0.0 {
        Direction::Out
    } else if sol_delta > 0.0 {
        Direction::In
    } else {
        Direction::Neutral
    };

    let fee_lamports = meta.get("fee").and_then(|f| f.as_u64());

    let counterparties = account_keys
        .into_iter()
        .filter(|k| k != wallet)
        .collect();

    let signature = raw
        .transaction
        .get("signatures")
        .and_then(|s| s.as_array())
        .and_then(|a| a.first())
        .and_then(|s| s.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default();

    Ok(ParsedTransaction {
        signature,
        slot: raw.slot,
        block_time: raw.block_time,
        sol_delta,
        direction,
        fee_lamports,
        counterparties,
    })
}

fn account_key_str(key: &Value) -> Option<String> {
    if let Some(s) = key.as_str() {
        return Some(s.to_string());
    }
    key.get("pubkey")
        .and_then(|p| p.as_str())
        .map(|s| s.to_string())
}

fn balances_array(meta: &Value, field: &str) -> Result<Vec<u64>, GhostError> {
    meta.get(field)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|b| b.as_u64()).collect())
        .ok_or_else(|| GhostError::ParseMalformed(format!("meta missing {field}")))
}

/// Aggregate parse results and signature metadata into quality metrics.
pub fn compute_data_quality(
    signatures: &[SignatureRecord],
    parsed_count: usize,
    missing_fees: usize,
) -> DataQuality {
    let total = signatures.len();
    if total == 0 {
        return DataQuality::default();
    }

    let valid_timestamps = signatures
        .iter()
        .filter(|s| s.timestamp_quality > 0.0)
        .count();
    let timestamp_coverage = valid_timestamps as f64 / total as f64;
    let timestamp_quality = signatures.iter().map(|s| s.timestamp_quality).sum::<f64>() / total as f64;

    let missing_signatures = total.saturating_sub(parsed_count);
    let missing_data_rate = (missing_signatures + missing_fees) as f64 / (total * 2).max(1) as f64;

    let quality_score = 0.5 * timestamp_quality + 0.5 * (1.0 - missing_data_rate);

    DataQuality {
        valid_timestamps,
        timestamp_coverage,
        timestamp_quality,
        missing_fees,
        missing_signatures,
        quality_score: quality_score.clamp(0.0, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_raw_tx(wallet: &str, other: &str, pre: u64, post: u64) -> RawTransaction {
        RawTransaction {
            slot: 100,
            block_time: Some(1_700_000_000),
            transaction: json!({
                "signatures": ["sig123"],
                "message": {
                    "accountKeys": [wallet, other],
                }
            }),
            meta: Some(json!({
                "fee": 5000,
                "preBalances": [pre, 0],
                "postBalances": [post, 0],
            })),
        }
    }

    #[test]
    fn outgoing_transfer_has_negative_delta() {
        let tx = sample_raw_tx("wallet1", "wallet2", 1_000_000_000, 500_000_000);
        let parsed = parse_transaction("wallet1", &tx).unwrap();
        assert!(parsed.sol_delta < 0.0);
        assert_eq!(parsed.direction, Direction::Out);
        assert_eq!(parsed.counterparties, vec!["wallet2".to_string()]);
    }

    #[test]
    fn incoming_transfer_has_positive_delta() {
        let tx = sample_raw_tx("wallet1", "wallet2", 500_000_000, 1_000_000_000);
        let parsed = parse_transaction("wallet1", &tx).unwrap();
        assert!(parsed.sol_delta > 0.0);
        assert_eq!(parsed.direction, Direction::In);
    }

    #[test]
    fn wallet_absent_from_keys_is_malformed() {
        let tx = sample_raw_tx("wallet2", "wallet3", 0, 0);
        let err = parse_transaction("wallet1", &tx).unwrap_err();
        matches!(err, GhostError::ParseMalformed(_));
    }

    #[test]
    fn repeated_parse_is_deterministic() {
        let tx = sample_raw_tx("wallet1", "wallet2", 1_000_000_000, 500_000_000);
        let a = parse_transaction("wallet1", &tx).unwrap();
        let b = parse_transaction("wallet1", &tx).unwrap();
        assert_eq!(a.sol_delta, b.sol_delta);
    }

    #[test]
    fn zero_signatures_yields_default_quality() {
        let quality = compute_data_quality(&[], 0, 0);
        assert_eq!(quality.quality_score, 0.0);
    }
}
