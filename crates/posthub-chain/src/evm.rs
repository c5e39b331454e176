use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use posthub_core::identity::Verification;
use tracing::{debug, info, warn};

use crate::abi::{self, Token};
use crate::address::Address;
use crate::error::{ChainError, ChainResult};
use crate::rpc::{Receipt, RpcClient};
use crate::tx::{LegacyTx, Wallet};
use crate::{Chain, OnchainPost, ens};

pub const DEFAULT_FLOW_RPC_URL: &str = "https://mainnet.evm.nodes.onflow.org";
pub const DEFAULT_CELO_RPC_URL: &str = "https://alfajores-forno.celo-testnet.org";
pub const DEFAULT_ENS_RPC_URL: &str = "https://cloudflare-eth.com";

pub const DEFAULT_POST_REGISTRY: &str = "0xb9e6B05EC9c15E3a2898594AD8b81A177D664F46";
pub const DEFAULT_REWARD_TOKEN: &str = "0xa7FbcaAD0D4c2e8188b386B7C3951E1e0792Bf8E";
pub const DEFAULT_POAP_CONTRACT: &str = "0x9A5CF28f9dC827a367C2a0eFF4b4f02bD589DB67";
pub const DEFAULT_CUSTOMIZATION_CONTRACT: &str = "0xbd0Efe0890B8107fDa1495754ccb25FdbCCcE2aF";

/// 500 tokens at 6 decimals.
pub const DEFAULT_REWARD_AMOUNT: u128 = 500_000_000;

/// Cadence Arch precompile exposing `revertibleRandom()`.
pub const CADENCE_ARCH: Address = Address([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x01,
]);

/// Addresses known to hold the badge without asking the chain.
const KNOWN_BADGE_HOLDERS: [&str; 1] = ["0x9a5cf28f9dc827a367c2a0eff4b4f02bd589db67"];

/// Headroom added on top of `eth_estimateGas`, in percent.
const GAS_BUFFER_PCT: u64 = 20;

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub flow_rpc_url: String,
    pub celo_rpc_url: String,
    pub ens_rpc_url: String,
    pub private_key: Option<String>,
    pub post_registry: Address,
    pub reward_token: Address,
    pub reward_amount: u128,
    pub poap_contract: Address,
    pub customization_contract: Address,
    pub receipt_poll_interval: Duration,
    pub receipt_max_attempts: u32,
}

/// [`Chain`] backed by live JSON-RPC endpoints.
pub struct EvmChain {
    flow: RpcClient,
    celo: RpcClient,
    ens: RpcClient,
    wallet: Option<Wallet>,
    config: ChainConfig,
    badge_cache: Mutex<HashMap<Address, bool>>,
    known_holders: HashSet<Address>,
    // one outgoing transaction at a time so nonces don't collide
    send_lock: tokio::sync::Mutex<()>,
}

impl EvmChain {
    pub fn new(config: ChainConfig) -> ChainResult<Self> {
        let wallet = match config.private_key.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                let wallet = Wallet::from_hex(key)?;
                info!("Signer loaded: {}", wallet.address());
                Some(wallet)
            }
            None => {
                warn!("FLOW_TX_PRIVATE_KEY not set; on-chain writes are disabled");
                None
            }
        };

        let known_holders = KNOWN_BADGE_HOLDERS
            .iter()
            .filter_map(|a| a.parse().ok())
            .collect();

        Ok(Self {
            flow: RpcClient::new(config.flow_rpc_url.clone()),
            celo: RpcClient::new(config.celo_rpc_url.clone()),
            ens: RpcClient::new(config.ens_rpc_url.clone()),
            wallet,
            config,
            badge_cache: Mutex::new(HashMap::new()),
            known_holders,
            send_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Signs and broadcasts a contract call from the server wallet.
    async fn send(&self, to: &Address, data: Vec<u8>) -> ChainResult<String> {
        let wallet = self.wallet.as_ref().ok_or(ChainError::MissingSigner)?;
        let _guard = self.send_lock.lock().await;

        let from = wallet.address();
        let chain_id = self.flow.chain_id().await?;
        let nonce = self.flow.pending_nonce(&from).await?;
        let gas_price = self.flow.gas_price().await?;
        let estimate = self.flow.estimate_gas(&from, to, &data).await?;
        let gas = estimate + estimate * GAS_BUFFER_PCT / 100;

        let tx = LegacyTx {
            nonce,
            gas_price,
            gas,
            to: *to,
            value: 0,
            data,
            chain_id,
        };
        let signed = tx.sign(wallet);
        debug!("sending tx {} nonce={} gas={}", signed.hash_hex(), nonce, gas);

        let hash = self.flow.send_raw_transaction(&signed.raw_hex()).await?;
        Ok(hash)
    }

    fn cached_badge(&self, owner: &Address) -> Option<bool> {
        self.badge_cache.lock().ok()?.get(owner).copied()
    }

    fn cache_badge(&self, owner: Address, held: bool) {
        if let Ok(mut cache) = self.badge_cache.lock() {
            cache.insert(owner, held);
        }
    }
}

#[async_trait]
impl Chain for EvmChain {
    fn has_signer(&self) -> bool {
        self.wallet.is_some()
    }

    async fn random_u64(&self) -> ChainResult<u64> {
        let data = abi::encode_call("revertibleRandom()", &[]);
        let out = self.flow.call(&CADENCE_ARCH, &data).await?;
        abi::decode_u64(&out)
    }

    async fn create_post(&self, post: &OnchainPost) -> ChainResult<String> {
        self.flow
            .chain_id()
            .await
            .map_err(|e| ChainError::Unreachable(e.to_string()))?;

        if self.wallet.is_none() {
            return Err(ChainError::MissingSigner);
        }

        let registry = self.config.post_registry;
        if self.flow.get_code(&registry).await?.is_empty() {
            return Err(ChainError::NoContract(registry.to_checksum()));
        }

        let data = abi::encode_call(
            "createPost(address,string,string,string[])",
            &[
                Token::Address(post.author),
                Token::String(post.title.clone()),
                Token::String(post.summary.clone()),
                Token::StringArray(post.media_links.clone()),
            ],
        );
        let hash = self.send(&registry, data).await?;
        info!("createPost submitted for {}: {}", post.author, hash);
        Ok(hash)
    }

    async fn transfer_reward(&self, recipient: &Address) -> ChainResult<String> {
        let data = abi::encode_call(
            "transfer(address,uint256)",
            &[Token::Address(*recipient), Token::Uint(self.config.reward_amount)],
        );
        let hash = self.send(&self.config.reward_token, data).await?;
        info!("Reward transfer to {} submitted: {}", recipient, hash);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, hash: &str) -> ChainResult<Receipt> {
        let attempts = self.config.receipt_max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.flow.receipt(hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => debug!("tx {} pending (attempt {}/{})", hash, attempt, attempts),
                Err(e) => warn!("receipt poll for {} failed: {}", hash, e),
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.receipt_poll_interval).await;
            }
        }
        Err(ChainError::ReceiptTimeout(hash.to_string(), attempts))
    }

    async fn receipt(&self, hash: &str) -> ChainResult<Option<Receipt>> {
        self.flow.receipt(hash).await
    }

    async fn mint_badge(&self, to: &Address) -> ChainResult<String> {
        let data = abi::encode_call("mint(address)", &[Token::Address(*to)]);
        let hash = self.send(&self.config.poap_contract, data).await?;
        // a fresh mint makes the cached answer stale
        self.cache_badge(*to, true);
        Ok(hash)
    }

    async fn has_badge(&self, owner: &Address) -> ChainResult<bool> {
        if self.known_holders.contains(owner) {
            return Ok(true);
        }
        if let Some(held) = self.cached_badge(owner) {
            return Ok(held);
        }

        let data = abi::encode_call("balanceOf(address)", &[Token::Address(*owner)]);
        let out = self.flow.call(&self.config.poap_contract, &data).await?;
        let held = abi::decode_uint(&out)? > 0;
        self.cache_badge(*owner, held);
        Ok(held)
    }

    async fn verification(&self, address: &Address) -> ChainResult<Verification> {
        let contract = self.config.customization_contract;

        let data = abi::encode_call("s_userNationality(address)", &[Token::Address(*address)]);
        let nationality = abi::decode_string(&self.celo.call(&contract, &data).await?)?;

        let data = abi::encode_call("s_userType(address)", &[Token::Address(*address)]);
        let user_type = abi::decode_u8(&self.celo.call(&contract, &data).await?)?;

        Ok(Verification::from_contract(nationality, user_type))
    }

    async fn lookup_ens(&self, address: &Address) -> ChainResult<Option<String>> {
        ens::lookup_address(&self.ens, address).await
    }
}
