use std::collections::HashMap;

use lazy_static::lazy_static;
use serde_json::Value;

use crate::block_ref::format_height;

lazy_static! {
    static ref KNOWN_NETWORKS: HashMap<&'static str, u64> = {
        let mut table = HashMap::new();

        table.insert("mainnet", 1);
        table.insert("sepolia", 11155111);
        table.insert("holesky", 17000);
        table.insert("optimism", 10);
        table.insert("base", 8453);
        table.insert("arbitrum", 42161);
        table.insert("polygon", 137);

        table
    };
}

/// Static network identity consumed by the fixed-response stage.
///
/// `eth_chainId` and `net_version` are pure functions of the configured chain
/// id, so they are answered here without touching the cache, the block
/// tracker, or the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkIdentity {
    chain_id: u64,
}

impl NetworkIdentity {
    pub fn from_chain_id(chain_id: u64) -> Self {
        Self { chain_id }
    }

    /// Looks the chain id up in the fixed table of well-known network names.
    pub fn for_network(name: &str) -> Option<Self> {
        KNOWN_NETWORKS
            .get(name.to_lowercase().as_str())
            .map(|chain_id| Self {
                chain_id: *chain_id,
            })
    }

    pub fn chain_id_hex(&self) -> String {
        format_height(self.chain_id)
    }

    pub fn net_version(&self) -> String {
        self.chain_id.to_string()
    }

    /// Returns the fixed response for the two identity methods, `None` for
    /// everything else. This stage cannot fail.
    pub fn resolve(&self, method: &str) -> Option<Value> {
        match method {
            "eth_chainId" => Some(Value::String(self.chain_id_hex())),
            "net_version" => Some(Value::String(self.net_version())),
            _ => None,
        }
    }
}
