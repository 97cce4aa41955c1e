/// Wallet address validation, performed before any network I/O.
///
/// A Solana address is a base58-encoded ed25519 public key (32 raw bytes),
/// which base58-encodes to somewhere between 32 and 44 characters. Program
/// addresses and PDAs fall in the same range, so length plus valid base58 is
/// the full extent of what can be checked without a network round trip.
use crate::core::errors::GhostError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self, GhostError> {
        if raw.len() < 32 || raw.len() > 44 {
            return Err(GhostError::InvalidAddress(format!(
                "address length {} outside [32, 44]",
                raw.len()
            )));
        }

        let decoded = bs58::decode(raw)
            .into_vec()
            .map_err(|e| GhostError::InvalidAddress(format!("invalid base58: {e}")))?;

        if decoded.len() != 32 {
            return Err(GhostError::InvalidAddress(format!(
                "decoded address is {} bytes, expected 32",
                decoded.len()
            )));
        }

        Ok(WalletAddress(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_system_program() {
        assert!(WalletAddress::parse("11111111111111111111111111111111").is_ok());
    }

    #[test]
    fn accepts_44_char_address() {
        assert!(WalletAddress::parse("So11111111111111111111111111111111111111112").is_ok());
    }

    #[test]
    fn rejects_too_short() {
        assert!(WalletAddress::parse("short").is_err());
    }

    #[test]
    fn rejects_non_base58() {
        // '0', 'O', 'I', 'l' are excluded from the base58 alphabet.
        let candidate = "0".repeat(36);
        assert!(WalletAddress::parse(&candidate).is_err());
    }

    #[test]
    fn rejects_malformed_length() {
        // Valid base58 chars, but decodes to something other than 32 bytes.
        assert!(WalletAddress::parse(&"1".repeat(44)).is_err());
    }
}
