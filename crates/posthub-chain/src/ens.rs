//! ENS reverse resolution against Ethereum mainnet.

use tracing::debug;

use crate::abi::{self, Token, keccak256};
use crate::address::Address;
use crate::error::ChainResult;
use crate::rpc::RpcClient;

/// ENS registry, same address on every network it is deployed to.
pub const ENS_REGISTRY: Address = Address([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x2e, 0x07, 0x4e, 0xc6, 0x9a, 0x0d, 0xfb, 0x29, 0x97, 0xba,
    0x6c, 0x7d, 0x2e, 0x1e,
]);

pub fn namehash(name: &str) -> [u8; 32] {
    let mut node = [0u8; 32];
    for label in name.rsplit('.').filter(|l| !l.is_empty()) {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&node);
        buf[32..].copy_from_slice(&keccak256(label.as_bytes()));
        node = keccak256(&buf);
    }
    node
}

/// Node for `<hex address>.addr.reverse`.
pub fn reverse_node(address: &Address) -> [u8; 32] {
    namehash(&format!("{}.addr.reverse", hex::encode(address.as_bytes())))
}

async fn resolver(rpc: &RpcClient, node: [u8; 32]) -> ChainResult<Option<Address>> {
    let data = abi::encode_call("resolver(bytes32)", &[Token::FixedBytes(node)]);
    let resolver = abi::decode_address(&rpc.call(&ENS_REGISTRY, &data).await?)?;
    Ok((resolver != Address::ZERO).then_some(resolver))
}

/// Primary name for `address`, only if the name resolves back to it.
pub async fn lookup_address(rpc: &RpcClient, address: &Address) -> ChainResult<Option<String>> {
    let node = reverse_node(address);
    let Some(reverse_resolver) = resolver(rpc, node).await? else {
        return Ok(None);
    };

    let data = abi::encode_call("name(bytes32)", &[Token::FixedBytes(node)]);
    let name = abi::decode_string(&rpc.call(&reverse_resolver, &data).await?)?;
    if name.is_empty() {
        return Ok(None);
    }

    let forward = namehash(&name.to_lowercase());
    let Some(forward_resolver) = resolver(rpc, forward).await? else {
        debug!("ENS name {} has no forward resolver", name);
        return Ok(None);
    };

    let data = abi::encode_call("addr(bytes32)", &[Token::FixedBytes(forward)]);
    let resolved = abi::decode_address(&rpc.call(&forward_resolver, &data).await?)?;
    if resolved != *address {
        debug!("ENS name {} resolves to {}, not {}", name, resolved, address);
        return Ok(None);
    }

    Ok(Some(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namehash_vectors() {
        assert_eq!(namehash(""), [0u8; 32]);
        assert_eq!(
            hex::encode(namehash("eth")),
            "93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
        assert_eq!(
            hex::encode(namehash("foo.eth")),
            "de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
        );
    }

    #[test]
    fn test_registry_address() {
        assert_eq!(
            ENS_REGISTRY.to_checksum(),
            "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e"
        );
    }
}
