use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

use posthub_chain::evm::{
    DEFAULT_CELO_RPC_URL, DEFAULT_CUSTOMIZATION_CONTRACT, DEFAULT_ENS_RPC_URL,
    DEFAULT_FLOW_RPC_URL, DEFAULT_POAP_CONTRACT, DEFAULT_POST_REGISTRY, DEFAULT_REWARD_AMOUNT,
    DEFAULT_REWARD_TOKEN,
};
use posthub_chain::{Address, ChainConfig};

const DEFAULT_RECEIPT_POLL_SECS: u64 = 8;
const DEFAULT_RECEIPT_MAX_ATTEMPTS: u32 = 75;

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub chain: ChainConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port: u16 = or("POSTHUB_PORT", "3000")
            .parse()
            .context("POSTHUB_PORT must be a port number")?;

        let address = |key: &str, default: &str| -> anyhow::Result<Address> {
            or(key, default)
                .trim()
                .parse()
                .with_context(|| format!("{} is not a valid address", key))
        };

        let reward_amount = match get("REWARD_AMOUNT") {
            Some(v) => v.trim().parse().context("REWARD_AMOUNT must be an integer")?,
            None => DEFAULT_REWARD_AMOUNT,
        };
        let poll_secs = match get("RECEIPT_POLL_SECS") {
            Some(v) => v.trim().parse().context("RECEIPT_POLL_SECS must be an integer")?,
            None => DEFAULT_RECEIPT_POLL_SECS,
        };
        let max_attempts = match get("RECEIPT_MAX_ATTEMPTS") {
            Some(v) => v.trim().parse().context("RECEIPT_MAX_ATTEMPTS must be an integer")?,
            None => DEFAULT_RECEIPT_MAX_ATTEMPTS,
        };

        let chain = ChainConfig {
            flow_rpc_url: or("FLOW_EVM_RPC_URL", DEFAULT_FLOW_RPC_URL),
            celo_rpc_url: or("CELO_RPC_URL", DEFAULT_CELO_RPC_URL),
            ens_rpc_url: or("ENS_RPC_URL", DEFAULT_ENS_RPC_URL),
            private_key: get("FLOW_TX_PRIVATE_KEY"),
            post_registry: address("POST_REGISTRY_ADDRESS", DEFAULT_POST_REGISTRY)?,
            reward_token: address("REWARD_TOKEN_ADDRESS", DEFAULT_REWARD_TOKEN)?,
            reward_amount,
            poap_contract: address("POAP_CONTRACT_ADDRESS", DEFAULT_POAP_CONTRACT)?,
            customization_contract: address("CUSTOMIZATION_CONTRACT", DEFAULT_CUSTOMIZATION_CONTRACT)?,
            receipt_poll_interval: Duration::from_secs(poll_secs),
            receipt_max_attempts: max_attempts,
        };

        Ok(Self {
            host: or("POSTHUB_HOST", "0.0.0.0"),
            port,
            db_path: PathBuf::from(or("POSTHUB_DB_PATH", "posthub.db")),
            chain,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("posthub.db"));
        assert!(config.chain.private_key.is_none());
        assert_eq!(config.chain.reward_amount, 500_000_000);
        assert_eq!(config.chain.receipt_poll_interval, Duration::from_secs(8));
        assert_eq!(config.chain.receipt_max_attempts, 75);
        assert_eq!(config.chain.flow_rpc_url, DEFAULT_FLOW_RPC_URL);
    }

    #[test]
    fn test_overrides_and_blank_key() {
        let config = load(&[
            ("POSTHUB_PORT", "8080"),
            ("FLOW_TX_PRIVATE_KEY", "  "),
            ("REWARD_AMOUNT", "42"),
            ("POST_REGISTRY_ADDRESS", "0x1111111111111111111111111111111111111111"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.chain.private_key.is_none());
        assert_eq!(config.chain.reward_amount, 42);
        assert_eq!(
            config.chain.post_registry.to_string(),
            "0x1111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(load(&[("POSTHUB_PORT", "http")]).is_err());
        assert!(load(&[("REWARD_TOKEN_ADDRESS", "0x1234")]).is_err());
        assert!(load(&[("RECEIPT_MAX_ATTEMPTS", "-1")]).is_err());
    }
}
