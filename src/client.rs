use std::sync::Arc;

use serde_json::Value;

use crate::block_tracker::{BlockTracker, PollingBlockTracker};
use crate::cache::memory_backend::MemoryBackendFactory;
use crate::cache::{CacheBackendFactory, CacheStatus};
use crate::json_rpc::RpcError;
use crate::methods::{self, CacheStrategy};
use crate::metrics::Metrics;
use crate::network::NetworkIdentity;
use crate::normalize::{self, RequestPlan};
use crate::transport::Transport;

/// The layered request pipeline: network-identity short-circuit, block
/// reference normalization, block-height-keyed response cache, remote
/// transport.
///
/// A single instance serves concurrent callers; cache lookup and store are
/// independent atomic operations, so overlapping misses for one key may each
/// reach the transport, and a request issued after a store observes the
/// cached value.
pub struct CachedClient {
    transport: Arc<dyn Transport>,
    block_tracker: Arc<dyn BlockTracker>,
    cache_factory: Box<dyn CacheBackendFactory>,
    network: Option<NetworkIdentity>,
    metrics: Metrics,
}

impl CachedClient {
    pub fn builder(transport: Arc<dyn Transport>) -> CachedClientBuilder {
        CachedClientBuilder {
            transport,
            block_tracker: None,
            cache_factory: None,
            network: None,
            metrics_prefix: "eth_block_cache".to_string(),
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        if let Some(network) = &self.network {
            if let Some(result) = network.resolve(method) {
                tracing::debug!(method, "answered from network identity");
                return Ok(result);
            }
        }

        let strategy = methods::strategy_for(method);

        let plan = match strategy {
            // Identity methods only get here without a configured network;
            // unclassified methods are never cached. Both pass straight
            // through to the transport.
            None | Some(CacheStrategy::Fixed) => RequestPlan::passthrough(params),
            Some(strategy) => {
                normalize::plan(strategy, method, params, self.block_tracker.as_ref()).await?
            }
        };

        let mut backend = match self.cache_factory.get_instance() {
            Ok(backend) => Some(backend),
            Err(err) => {
                tracing::error!("fail to get cache backend: {err:#}");
                self.metrics.record_error();
                None
            }
        };

        let mut store_key = None;
        match (backend.as_mut(), plan.params_key.as_deref()) {
            (Some(backend), Some(params_key)) => match backend.read(method, params_key) {
                Ok(CacheStatus::Cached { key, value }) => {
                    tracing::debug!("cache hit for method {} with key {}", method, key);
                    self.metrics.record_hit(method);
                    return Ok(value);
                }
                Ok(CacheStatus::Missed { key }) => {
                    tracing::debug!("cache miss for method {} with key {}", method, key);
                    self.metrics.record_miss(method);
                    store_key = Some(key);
                }
                Err(err) => {
                    tracing::error!("fail to read cache: {err:#}");
                    self.metrics.record_error();
                }
            },
            _ => self.metrics.record_uncacheable(method),
        }

        let result = match self.transport.execute(method, plan.forward_params).await {
            Ok(result) => result,
            Err(err) => {
                self.metrics.record_error();
                return Err(err);
            }
        };

        if let (Some(backend), Some(key), Some(strategy)) =
            (backend.as_mut(), store_key, strategy)
        {
            if methods::is_empty_result(strategy, &result) {
                tracing::debug!("empty result for method {} not cached", method);
            } else if let Err(err) = backend.write(&key, &result) {
                tracing::error!("fail to write cache: {err:#}");
                self.metrics.record_error();
            }
        }

        Ok(result)
    }
}

pub struct CachedClientBuilder {
    transport: Arc<dyn Transport>,
    block_tracker: Option<Arc<dyn BlockTracker>>,
    cache_factory: Option<Box<dyn CacheBackendFactory>>,
    network: Option<NetworkIdentity>,
    metrics_prefix: String,
}

impl CachedClientBuilder {
    /// Enables the fixed-response stage for `eth_chainId` / `net_version`.
    pub fn network(mut self, network: NetworkIdentity) -> Self {
        self.network = Some(network);
        self
    }

    pub fn block_tracker(mut self, block_tracker: Arc<dyn BlockTracker>) -> Self {
        self.block_tracker = Some(block_tracker);
        self
    }

    pub fn cache_factory(mut self, cache_factory: Box<dyn CacheBackendFactory>) -> Self {
        self.cache_factory = Some(cache_factory);
        self
    }

    pub fn metrics_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.metrics_prefix = prefix.into();
        self
    }

    pub fn build(self) -> CachedClient {
        let block_tracker = self.block_tracker.unwrap_or_else(|| {
            Arc::new(PollingBlockTracker::new(
                self.transport.clone(),
                PollingBlockTracker::DEFAULT_POLL_INTERVAL,
            ))
        });
        let cache_factory = self
            .cache_factory
            .unwrap_or_else(|| Box::new(MemoryBackendFactory::new()));

        CachedClient {
            transport: self.transport,
            block_tracker,
            cache_factory,
            network: self.network,
            metrics: Metrics::new(&self.metrics_prefix),
        }
    }
}
