//! Block-height-aware response cache for Ethereum JSON-RPC clients.
//!
//! Requests flow through four stages: a fixed-response resolver for the
//! network-identity methods, a block reference normalizer that pins
//! `"latest"` to a concrete height from the block tracker, a response cache
//! keyed by method, non-block params, and block component, and finally the
//! remote transport.

pub mod block_ref;
pub mod block_tracker;
pub mod cache;
pub mod client;
pub mod json_rpc;
pub mod methods;
pub mod metrics;
pub mod network;
pub mod normalize;
pub mod transport;

pub use block_tracker::{BlockTracker, PollingBlockTracker};
pub use client::{CachedClient, CachedClientBuilder};
pub use json_rpc::RpcError;
pub use network::NetworkIdentity;
pub use transport::{HttpTransport, Transport};
