use serde_json::Value;
use sha1::Digest;

use crate::block_ref::{format_height, BlockRef};
use crate::block_tracker::BlockTracker;
use crate::json_rpc::RpcError;
use crate::methods::CacheStrategy;

/// Outcome of normalizing one request.
///
/// `forward_params` is what the transport must receive; for a resolved
/// `"latest"` the block slot carries the concrete height while the caller
/// still observes the payload of the call they issued. `params_key` is the
/// post-method portion of the cache key, `None` meaning the request bypasses
/// the cache entirely.
#[derive(Debug)]
pub struct RequestPlan {
    pub forward_params: Value,
    pub params_key: Option<String>,
}

impl RequestPlan {
    pub fn passthrough(params: Value) -> Self {
        Self {
            forward_params: params,
            params_key: None,
        }
    }
}

/// Plans a classified request: resolves the block reference against the
/// tracker where needed and derives the cache key component.
///
/// A tracker failure propagates; no default height is ever substituted.
/// Malformed params demote the request to uncacheable passthrough instead of
/// failing it; the provider decides whether to reject them.
pub async fn plan(
    strategy: CacheStrategy,
    method: &str,
    params: Value,
    tracker: &dyn BlockTracker,
) -> Result<RequestPlan, RpcError> {
    match strategy {
        CacheStrategy::Fixed => Ok(RequestPlan::passthrough(params)),

        CacheStrategy::BlockTracked | CacheStrategy::TxLookup => {
            let height = tracker.latest_block().await?;
            let params_key = format!("{height}-{}", hash_string(&params.to_string()));

            Ok(RequestPlan {
                forward_params: params,
                params_key: Some(params_key),
            })
        }

        CacheStrategy::BlockParam { index } => plan_block_param(method, params, index, tracker).await,
    }
}

async fn plan_block_param(
    method: &str,
    params: Value,
    index: usize,
    tracker: &dyn BlockTracker,
) -> Result<RequestPlan, RpcError> {
    let mut slots = match params {
        Value::Array(slots) => slots,
        other => {
            tracing::warn!(method, "params not an array, skipping cache");
            return Ok(RequestPlan::passthrough(other));
        }
    };

    // An absent slot is only well-formed when it is the trailing argument.
    if slots.len() < index {
        tracing::warn!(method, "params too short for block argument, skipping cache");
        return Ok(RequestPlan::passthrough(Value::Array(slots)));
    }

    let block_ref = match slots.get(index) {
        None => BlockRef::Latest,
        Some(slot) => match BlockRef::parse(slot) {
            Ok(block_ref) => block_ref,
            Err(err) => {
                tracing::warn!(method, "unusable block argument, skipping cache: {err:#}");
                return Ok(RequestPlan::passthrough(Value::Array(slots)));
            }
        },
    };

    let block_component = match block_ref {
        // The transport must see the resolved height, not the tag.
        BlockRef::Latest => {
            let height = tracker.latest_block().await?;
            let resolved = Value::String(height.clone());
            if index < slots.len() {
                slots[index] = resolved;
            } else {
                slots.push(resolved);
            }
            height
        }

        // Always reaches the transport, never cached.
        BlockRef::Pending => return Ok(RequestPlan::passthrough(Value::Array(slots))),

        // Historical content is immutable; key by the literal height so the
        // entry survives tracker advances.
        BlockRef::Number(height) => format_height(height),
    };

    let non_block_params: Vec<&Value> = slots
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, slot)| slot)
        .collect();
    let serialized = serde_json::to_string(&non_block_params).unwrap();
    let params_key = format!("{block_component}-{}", hash_string(&serialized));

    Ok(RequestPlan {
        forward_params: Value::Array(slots),
        params_key: Some(params_key),
    })
}

fn hash_string(s: &str) -> String {
    let mut hasher = sha1::Sha1::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();

    hex::encode(result.as_slice())
}

#[cfg(test)]
mod test {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    struct StubTracker(&'static str);

    #[async_trait]
    impl BlockTracker for StubTracker {
        async fn latest_block(&self) -> Result<String, RpcError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingTracker;

    #[async_trait]
    impl BlockTracker for FailingTracker {
        async fn latest_block(&self) -> Result<String, RpcError> {
            Err(RpcError::BlockTracker(anyhow::anyhow!("poll failed")))
        }
    }

    #[tokio::test]
    async fn test_latest_is_rewritten_with_tracker_height() {
        let tracker = StubTracker("0x100");
        let plan = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xabc", "latest"]),
            &tracker,
        )
        .await
        .unwrap();

        assert_eq!(plan.forward_params, json!(["0xabc", "0x100"]));
        let params_key = plan.params_key.unwrap();
        assert!(params_key.starts_with("0x100-"));
    }

    #[tokio::test]
    async fn test_absent_trailing_slot_defaults_to_latest() {
        let tracker = StubTracker("0x100");
        let with_tag = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xabc", "latest"]),
            &tracker,
        )
        .await
        .unwrap();
        let without_tag = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xabc"]),
            &tracker,
        )
        .await
        .unwrap();

        assert_eq!(without_tag.forward_params, json!(["0xabc", "0x100"]));
        assert_eq!(without_tag.params_key, with_tag.params_key);
    }

    #[tokio::test]
    async fn test_explicit_height_is_not_rewritten() {
        let tracker = StubTracker("0x200");
        let plan = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xabc", "0x64"]),
            &tracker,
        )
        .await
        .unwrap();

        assert_eq!(plan.forward_params, json!(["0xabc", "0x64"]));
        assert!(plan.params_key.unwrap().starts_with("0x64-"));
    }

    #[tokio::test]
    async fn test_earliest_and_zero_share_a_key() {
        let tracker = StubTracker("0x200");
        let earliest = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xabc", "earliest"]),
            &tracker,
        )
        .await
        .unwrap();
        let zero = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xabc", "0x00"]),
            &tracker,
        )
        .await
        .unwrap();

        assert_eq!(earliest.params_key, zero.params_key);
        assert!(earliest.params_key.unwrap().starts_with("0x0-"));
    }

    #[tokio::test]
    async fn test_pending_bypasses_the_cache() {
        let tracker = StubTracker("0x200");
        let plan = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xabc", "pending"]),
            &tracker,
        )
        .await
        .unwrap();

        assert_eq!(plan.forward_params, json!(["0xabc", "pending"]));
        assert_eq!(plan.params_key, None);
    }

    #[tokio::test]
    async fn test_different_non_block_params_differ() {
        let tracker = StubTracker("0x100");
        let a = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xaaa", "latest"]),
            &tracker,
        )
        .await
        .unwrap();
        let b = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xbbb", "latest"]),
            &tracker,
        )
        .await
        .unwrap();

        assert_ne!(a.params_key, b.params_key);
    }

    #[tokio::test]
    async fn test_block_tracked_key_carries_height() {
        let plan_a = plan(
            CacheStrategy::BlockTracked,
            "eth_gasPrice",
            json!([]),
            &StubTracker("0x100"),
        )
        .await
        .unwrap();
        let plan_b = plan(
            CacheStrategy::BlockTracked,
            "eth_gasPrice",
            json!([]),
            &StubTracker("0x101"),
        )
        .await
        .unwrap();

        assert_ne!(plan_a.params_key, plan_b.params_key);
        assert_eq!(plan_a.forward_params, json!([]));
    }

    #[tokio::test]
    async fn test_storage_slot_index() {
        let tracker = StubTracker("0x100");
        let plan = plan(
            CacheStrategy::BlockParam { index: 2 },
            "eth_getStorageAt",
            json!(["0xabc", "0x1", "latest"]),
            &tracker,
        )
        .await
        .unwrap();

        assert_eq!(plan.forward_params, json!(["0xabc", "0x1", "0x100"]));
    }

    #[tokio::test]
    async fn test_malformed_params_demote_to_passthrough() {
        let tracker = StubTracker("0x100");

        let not_array = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!({"address": "0xabc"}),
            &tracker,
        )
        .await
        .unwrap();
        assert_eq!(not_array.params_key, None);
        assert_eq!(not_array.forward_params, json!({"address": "0xabc"}));

        let bad_tag = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xabc", "0xzz"]),
            &tracker,
        )
        .await
        .unwrap();
        assert_eq!(bad_tag.params_key, None);

        let too_short = plan(
            CacheStrategy::BlockParam { index: 2 },
            "eth_getStorageAt",
            json!(["0xabc"]),
            &tracker,
        )
        .await
        .unwrap();
        assert_eq!(too_short.params_key, None);
        assert_eq!(too_short.forward_params, json!(["0xabc"]));
    }

    #[tokio::test]
    async fn test_tracker_failure_propagates() {
        let err = plan(
            CacheStrategy::BlockParam { index: 1 },
            "eth_getBalance",
            json!(["0xabc", "latest"]),
            &FailingTracker,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RpcError::BlockTracker(_)));
    }
}
