use std::collections::HashMap;
use std::str::FromStr;

use alloy_primitives::B256;
use lazy_static::lazy_static;
use serde_json::Value;

/// How a method interacts with the cache. Every method the pipeline knows is
/// in exactly one category; methods absent from the table are passed through
/// to the transport untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Answered from configured network identity, never cached or forwarded.
    Fixed,

    /// Cacheable, keyed by the tracker's latest height; no block argument.
    BlockTracked,

    /// Same keying as [`CacheStrategy::BlockTracked`] but the result is a
    /// transaction object subject to the stricter `blockHash` emptiness rule.
    TxLookup,

    /// Carries a block reference at a fixed position in `params`.
    BlockParam { index: usize },
}

lazy_static! {
    static ref METHOD_STRATEGIES: HashMap<&'static str, CacheStrategy> = {
        let mut table = HashMap::new();

        table.insert("eth_chainId", CacheStrategy::Fixed);
        table.insert("net_version", CacheStrategy::Fixed);

        table.insert("eth_blockNumber", CacheStrategy::BlockTracked);
        table.insert("eth_gasPrice", CacheStrategy::BlockTracked);
        table.insert("eth_maxPriorityFeePerGas", CacheStrategy::BlockTracked);
        table.insert("eth_getLogs", CacheStrategy::BlockTracked);
        table.insert("eth_getBlockByHash", CacheStrategy::BlockTracked);
        table.insert("eth_getBlockReceipts", CacheStrategy::BlockTracked);
        table.insert(
            "eth_getBlockTransactionCountByHash",
            CacheStrategy::BlockTracked,
        );
        table.insert(
            "eth_getTransactionByBlockHashAndIndex",
            CacheStrategy::BlockTracked,
        );
        table.insert("eth_getUncleCountByBlockHash", CacheStrategy::BlockTracked);

        table.insert("eth_getTransactionByHash", CacheStrategy::TxLookup);
        table.insert("eth_getTransactionReceipt", CacheStrategy::TxLookup);

        table.insert("eth_getBlockByNumber", CacheStrategy::BlockParam { index: 0 });
        table.insert("eth_getBalance", CacheStrategy::BlockParam { index: 1 });
        table.insert("eth_getCode", CacheStrategy::BlockParam { index: 1 });
        table.insert(
            "eth_getTransactionCount",
            CacheStrategy::BlockParam { index: 1 },
        );
        table.insert("eth_call", CacheStrategy::BlockParam { index: 1 });
        table.insert("eth_getStorageAt", CacheStrategy::BlockParam { index: 2 });

        table
    };
}

pub fn strategy_for(method: &str) -> Option<CacheStrategy> {
    METHOD_STRATEGIES.get(method).copied()
}

/// An empty result signals data the node does not have yet and must never be
/// stored; the next identical request goes back to the transport.
pub fn is_empty_result(strategy: CacheStrategy, result: &Value) -> bool {
    match result {
        Value::Null => return true,
        // Non-standard placeholder some nodes emit for not-yet-available data.
        Value::String(s) if s == "<nil>" => return true,
        _ => {}
    }

    match strategy {
        CacheStrategy::TxLookup => match result.as_object() {
            Some(tx) => is_empty_block_hash(tx.get("blockHash")),
            None => true,
        },
        _ => false,
    }
}

/// A pending transaction carries no block hash, or an all-zero one. The
/// canonical zero hash has 64 hex digits; a 66-zero-digit form shows up in
/// the wild and counts the same.
fn is_empty_block_hash(block_hash: Option<&Value>) -> bool {
    match block_hash {
        None | Some(Value::Null) => true,
        Some(Value::String(hash)) => match B256::from_str(hash) {
            Ok(hash) => hash.is_zero(),
            Err(_) => hash
                .strip_prefix("0x")
                .is_some_and(|digits| digits.chars().all(|c| c == '0')),
        },
        Some(_) => true,
    }
}
