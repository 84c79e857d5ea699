use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::block_ref::{format_height, parse_hex_height};
use crate::json_rpc::RpcError;
use crate::transport::Transport;

/// Supplies the chain's current latest block height as a canonical hex
/// string. Each distinct height the tracker reports opens a new cache epoch;
/// the pipeline never predicts future heights.
#[async_trait]
pub trait BlockTracker: Send + Sync {
    async fn latest_block(&self) -> Result<String, RpcError>;
}

struct Snapshot {
    height: String,
    fetched_at: Instant,
}

/// Polls `eth_blockNumber` through a transport, holding each answer for the
/// configured interval.
///
/// The refresh path sits behind one async lock, so concurrent callers that
/// find a stale snapshot share a single in-flight poll instead of issuing
/// duplicates.
pub struct PollingBlockTracker {
    transport: Arc<dyn Transport>,
    poll_interval: Duration,
    snapshot: Mutex<Option<Snapshot>>,
}

impl PollingBlockTracker {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);

    pub fn new(transport: Arc<dyn Transport>, poll_interval: Duration) -> Self {
        Self {
            transport,
            poll_interval,
            snapshot: Mutex::new(None),
        }
    }
}

#[async_trait]
impl BlockTracker for PollingBlockTracker {
    async fn latest_block(&self) -> Result<String, RpcError> {
        let mut snapshot = self.snapshot.lock().await;

        if let Some(current) = snapshot.as_ref() {
            if current.fetched_at.elapsed() < self.poll_interval {
                return Ok(current.height.clone());
            }
        }

        let raw = self
            .transport
            .execute("eth_blockNumber", json!([]))
            .await
            .map_err(|err| RpcError::BlockTracker(err.into()))?;

        let height = match &raw {
            Value::String(tag) => parse_hex_height(tag)
                .map(format_height)
                .map_err(RpcError::BlockTracker)?,
            other => {
                return Err(RpcError::BlockTracker(anyhow::anyhow!(
                    "eth_blockNumber returned a non-string result: {other}"
                )))
            }
        };

        tracing::debug!("block tracker refreshed to {}", height);

        *snapshot = Some(Snapshot {
            height: height.clone(),
            fetched_at: Instant::now(),
        });

        Ok(height)
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct CountingTransport {
        calls: AtomicUsize,
        heights: Vec<&'static str>,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn execute(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
            assert_eq!(method, "eth_blockNumber");
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let height = self.heights[call.min(self.heights.len() - 1)];
            Ok(json!(height))
        }
    }

    #[tokio::test]
    async fn test_snapshot_reused_within_interval() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            heights: vec!["0x100", "0x101"],
        });
        let tracker =
            PollingBlockTracker::new(transport.clone(), Duration::from_secs(3600));

        assert_eq!(tracker.latest_block().await.unwrap(), "0x100");
        assert_eq!(tracker.latest_block().await.unwrap(), "0x100");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_interval_repolls() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            heights: vec!["0x100", "0x101"],
        });
        let tracker = PollingBlockTracker::new(transport.clone(), Duration::ZERO);

        assert_eq!(tracker.latest_block().await.unwrap(), "0x100");
        assert_eq!(tracker.latest_block().await.unwrap(), "0x101");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_height_is_canonicalized() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
            heights: vec!["0x0100"],
        });
        let tracker = PollingBlockTracker::new(transport, Duration::ZERO);

        assert_eq!(tracker.latest_block().await.unwrap(), "0x100");
    }

    #[tokio::test]
    async fn test_non_string_height_is_an_error() {
        struct BadTransport;

        #[async_trait]
        impl Transport for BadTransport {
            async fn execute(&self, _method: &str, _params: Value) -> Result<Value, RpcError> {
                Ok(json!(256))
            }
        }

        let tracker = PollingBlockTracker::new(Arc::new(BadTransport), Duration::ZERO);
        let err = tracker.latest_block().await.unwrap_err();
        assert!(matches!(err, RpcError::BlockTracker(_)));
    }
}
