use std::fmt;

use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

use crate::abi::keccak256;
use crate::address::Address;
use crate::error::{ChainError, ChainResult};
use crate::rlp;

/// Server-side signing key.
pub struct Wallet {
    secret: SecretKey,
    address: Address,
}

impl Wallet {
    /// Parses a 32-byte hex private key, with or without `0x`.
    pub fn from_hex(key: &str) -> ChainResult<Self> {
        let key = key.trim();
        let body = key.strip_prefix("0x").unwrap_or(key);
        let bytes = hex::decode(body).map_err(|e| ChainError::InvalidKey(e.to_string()))?;
        let secret =
            SecretKey::from_slice(&bytes).map_err(|e| ChainError::InvalidKey(e.to_string()))?;

        let secp = Secp256k1::signing_only();
        let public = PublicKey::from_secret_key(&secp, &secret);
        let address = Address::from_public_key(&public.serialize_uncompressed());

        Ok(Self { secret, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address).finish_non_exhaustive()
    }
}

/// Pre-EIP-1559 transaction, signed with EIP-155 replay protection.
#[derive(Debug, Clone, Default)]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// Raw bytes ready for `eth_sendRawTransaction`, plus the hash the node
/// will report.
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub raw: Vec<u8>,
    pub hash: [u8; 32],
}

impl SignedTx {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash))
    }
}

impl LegacyTx {
    fn base_fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp::encode_uint(u128::from(self.nonce)),
            rlp::encode_uint(self.gas_price),
            rlp::encode_uint(u128::from(self.gas)),
            rlp::encode_bytes(self.to.as_bytes()),
            rlp::encode_uint(self.value),
            rlp::encode_bytes(&self.data),
        ]
    }

    /// Hash that gets signed: the six fields followed by `chain_id, 0, 0`.
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut fields = self.base_fields();
        fields.push(rlp::encode_uint(u128::from(self.chain_id)));
        fields.push(rlp::encode_uint(0));
        fields.push(rlp::encode_uint(0));
        keccak256(&rlp::encode_list(&fields))
    }

    pub fn sign(&self, wallet: &Wallet) -> SignedTx {
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest(self.signing_hash());
        let (recid, compact) = secp
            .sign_ecdsa_recoverable(&msg, &wallet.secret)
            .serialize_compact();

        let v = recid.to_i32() as u128 + u128::from(self.chain_id) * 2 + 35;

        let mut fields = self.base_fields();
        fields.push(rlp::encode_uint(v));
        fields.push(rlp::encode_bytes(trim_leading_zeros(&compact[..32])));
        fields.push(rlp::encode_bytes(trim_leading_zeros(&compact[32..])));

        let raw = rlp::encode_list(&fields);
        let hash = keccak256(&raw);
        SignedTx { raw, hash }
    }
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
