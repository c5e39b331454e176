use std::fmt;
use std::str::FromStr;

use crate::abi::keccak256;
use crate::error::ChainError;

/// 20-byte EVM account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derives the address of an uncompressed secp256k1 public key
    /// (65 bytes, leading 0x04).
    pub fn from_public_key(uncompressed: &[u8; 65]) -> Self {
        let hash = keccak256(&uncompressed[1..]);
        let mut out = [0u8; 20];
        out.copy_from_slice(&hash[12..]);
        Address(out)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Mixed-case checksummed form.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let shift = if i % 2 == 0 { 4 } else { 0 };
            let nibble = (hash[i / 2] >> shift) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ChainError;

    /// Accepts `0x`-prefixed hex. All-lowercase and all-uppercase inputs are
    /// taken as-is; mixed case must carry a valid checksum.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ChainError::InvalidAddress(s.to_string());

        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(invalid)?;
        if body.len() != 40 {
            return Err(invalid());
        }

        let bytes = hex::decode(body).map_err(|_| invalid())?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        let addr = Address(out);

        let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && addr.to_checksum()[2..] != *body {
            return Err(invalid());
        }

        Ok(addr)
    }
}

/// True when `s` parses as an address.
pub fn is_address(s: &str) -> bool {
    s.parse::<Address>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_roundtrip() {
        let addr: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(addr.to_checksum(), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert!(is_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
        assert!(is_address("0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED"));
    }

    #[test]
    fn test_rejects_bad_input() {
        // one flipped case breaks the checksum
        assert!(!is_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAeD"));
        assert!(!is_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(!is_address("0x5aaeb6"));
        assert!(!is_address("0xzzaeb6053f3e94c9b9a09f33669435e7ef1beaed"));
        assert!(!is_address(""));
    }

    #[test]
    fn test_display_is_lowercase() {
        let addr: Address = "0xA7FBCAAD0D4C2E8188B386B7C3951E1E0792BF8E".parse().unwrap();
        assert_eq!(addr.to_string(), "0xa7fbcaad0d4c2e8188b386b7c3951e1e0792bf8e");
    }
}
