pub mod lru_backend;
pub mod memory_backend;

use serde_json::Value;

pub enum CacheStatus {
    Cached { key: String, value: Value },
    Missed { key: String },
}

/// Hands out per-request backend instances; the instances share one
/// underlying store.
pub trait CacheBackendFactory: Send + Sync {
    fn get_instance(&self) -> anyhow::Result<Box<dyn CacheBackend>>;
}

/// One key-value store. `read` and `write` are independent atomic operations;
/// no read-modify-write spans the network call, so two concurrent misses for
/// one key may both reach the transport and the later write wins.
pub trait CacheBackend: Send {
    fn read(&mut self, method: &str, params_key: &str) -> anyhow::Result<CacheStatus>;
    fn write(&mut self, key: &str, value: &Value) -> anyhow::Result<()>;
}
