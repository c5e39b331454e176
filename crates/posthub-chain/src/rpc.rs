use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::address::Address;
use crate::error::{ChainError, ChainResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Thin JSON-RPC 2.0 client over HTTP.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    block_number: Option<String>,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub success: bool,
    pub block_number: u64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> ChainResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        debug!("rpc -> {} {}", self.url, method);
        let resp: RpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        into_result(resp)
    }

    pub async fn chain_id(&self) -> ChainResult<u64> {
        let hex: String = self.request("eth_chainId", json!([])).await?;
        to_u64(parse_quantity(&hex)?)
    }

    /// Read-only call against the latest block.
    pub async fn call(&self, to: &Address, data: &[u8]) -> ChainResult<Vec<u8>> {
        let hex: String = self
            .request(
                "eth_call",
                json!([{ "to": to.to_string(), "data": encode_data(data) }, "latest"]),
            )
            .await?;
        parse_data(&hex)
    }

    pub async fn get_code(&self, address: &Address) -> ChainResult<Vec<u8>> {
        let hex: String = self
            .request("eth_getCode", json!([address.to_string(), "latest"]))
            .await?;
        parse_data(&hex)
    }

    pub async fn gas_price(&self) -> ChainResult<u128> {
        let hex: String = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity(&hex)
    }

    /// Nonce including transactions still in the mempool.
    pub async fn pending_nonce(&self, address: &Address) -> ChainResult<u64> {
        let hex: String = self
            .request("eth_getTransactionCount", json!([address.to_string(), "pending"]))
            .await?;
        to_u64(parse_quantity(&hex)?)
    }

    pub async fn estimate_gas(&self, from: &Address, to: &Address, data: &[u8]) -> ChainResult<u64> {
        let hex: String = self
            .request(
                "eth_estimateGas",
                json!([{ "from": from.to_string(), "to": to.to_string(), "data": encode_data(data) }]),
            )
            .await?;
        to_u64(parse_quantity(&hex)?)
    }

    /// Broadcasts a signed transaction and returns the node's hash for it.
    pub async fn send_raw_transaction(&self, raw_hex: &str) -> ChainResult<String> {
        self.request("eth_sendRawTransaction", json!([raw_hex])).await
    }

    /// `None` while the transaction is still pending.
    pub async fn receipt(&self, hash: &str) -> ChainResult<Option<Receipt>> {
        let raw: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        raw.map(Receipt::try_from).transpose()
    }
}

impl TryFrom<RawReceipt> for Receipt {
    type Error = ChainError;

    fn try_from(raw: RawReceipt) -> Result<Self, Self::Error> {
        let status = raw
            .status
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .unwrap_or(0);
        let block_number = raw
            .block_number
            .as_deref()
            .map(parse_quantity)
            .transpose()?
            .unwrap_or(0);
        Ok(Self {
            success: status == 1,
            block_number: to_u64(block_number)?,
        })
    }
}

fn into_result<T: DeserializeOwned>(resp: RpcResponse) -> ChainResult<T> {
    if let Some(err) = resp.error {
        return Err(ChainError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    serde_json::from_value(resp.result).map_err(|e| ChainError::InvalidResponse(e.to_string()))
}

/// Parses a hex quantity such as `0x1a`. `0x` alone reads as zero.
pub fn parse_quantity(hex: &str) -> ChainResult<u128> {
    let body = hex
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("quantity without 0x: {}", hex)))?;
    if body.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(body, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad quantity {}: {}", hex, e)))
}

pub fn parse_data(hex: &str) -> ChainResult<Vec<u8>> {
    let body = hex.strip_prefix("0x").unwrap_or(hex);
    hex::decode(body).map_err(|e| ChainError::InvalidResponse(format!("bad data {}: {}", hex, e)))
}

fn encode_data(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

fn to_u64(v: u128) -> ChainResult<u64> {
    u64::try_from(v).map_err(|_| ChainError::InvalidResponse(format!("{} overflows u64", v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(parse_quantity("0x2a").unwrap(), 42);
        assert!(parse_quantity("2a").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_parse_data() {
        assert_eq!(parse_data("0x").unwrap(), Vec::<u8>::new());
        assert_eq!(parse_data("0x0102").unwrap(), vec![1, 2]);
        assert!(parse_data("0x0").is_err());
    }

    #[test]
    fn test_error_envelope() {
        let resp: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": { "code": -32000, "message": "nonce too low" }
        }))
        .unwrap();
        match into_result::<String>(resp) {
            Err(ChainError::Rpc { code, message }) => {
                assert_eq!(code, -32000);
                assert_eq!(message, "nonce too low");
            }
            other => panic!("expected rpc error, got {:?}", other),
        }
    }

    #[test]
    fn test_pending_receipt_is_none() {
        let resp: RpcResponse =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": 1, "result": null })).unwrap();
        let raw: Option<RawReceipt> = into_result(resp).unwrap();
        assert!(raw.is_none());
    }

    #[test]
    fn test_receipt_status() {
        let ok = Receipt::try_from(RawReceipt {
            status: Some("0x1".into()),
            block_number: Some("0x10".into()),
        })
        .unwrap();
        assert!(ok.success);
        assert_eq!(ok.block_number, 16);

        let reverted = Receipt::try_from(RawReceipt {
            status: Some("0x0".into()),
            block_number: Some("0x10".into()),
        })
        .unwrap();
        assert!(!reverted.success);
    }
}
