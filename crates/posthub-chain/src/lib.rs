//! EVM plumbing: JSON-RPC, ABI and RLP encoding, transaction signing, and the
//! [`Chain`] trait the HTTP layer talks to.

pub mod abi;
pub mod address;
pub mod ens;
pub mod error;
pub mod evm;
pub mod rlp;
pub mod rpc;
pub mod tx;

use async_trait::async_trait;
use posthub_core::identity::Verification;

pub use address::{Address, is_address};
pub use error::{ChainError, ChainResult};
pub use evm::{ChainConfig, EvmChain};
pub use rpc::Receipt;

/// Post metadata anchored in the on-chain registry.
#[derive(Debug, Clone)]
pub struct OnchainPost {
    pub author: Address,
    pub title: String,
    pub summary: String,
    pub media_links: Vec<String>,
}

/// Everything the service needs from the outside chains.
#[async_trait]
pub trait Chain: Send + Sync {
    /// Whether a signing key is configured.
    fn has_signer(&self) -> bool;

    /// Fresh uint64 from the Flow VRF precompile.
    async fn random_u64(&self) -> ChainResult<u64>;

    /// Submits `createPost` and returns the transaction hash without waiting.
    async fn create_post(&self, post: &OnchainPost) -> ChainResult<String>;

    /// Sends the configured reward amount of the reward token.
    async fn transfer_reward(&self, recipient: &Address) -> ChainResult<String>;

    /// Polls until the transaction is mined or the attempt cap is hit.
    async fn wait_for_receipt(&self, hash: &str) -> ChainResult<Receipt>;

    /// Single receipt check; `None` while pending.
    async fn receipt(&self, hash: &str) -> ChainResult<Option<Receipt>>;

    async fn mint_badge(&self, to: &Address) -> ChainResult<String>;

    async fn has_badge(&self, owner: &Address) -> ChainResult<bool>;

    /// Identity contract lookup on Celo.
    async fn verification(&self, address: &Address) -> ChainResult<Verification>;

    /// ENS primary name, forward-verified.
    async fn lookup_ens(&self, address: &Address) -> ChainResult<Option<String>>;
}
