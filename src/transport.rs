use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::json_rpc::{JsonRpcRequest, RpcError};

/// The remote side of the pipeline: performs the actual network call.
///
/// Implementations own retry, timeout, and cancellation policy; the cache
/// stores nothing on a failed call and propagates the error unmodified.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
    client: reqwest::Client,
    rpc_url: Url,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(rpc_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), rpc_url)
    }

    pub fn with_client(client: reqwest::Client, rpc_url: Url) -> Self {
        Self {
            client,
            rpc_url,
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        let response = self
            .client
            .post(self.rpc_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|err| RpcError::Transport(err.into()))?
            .json::<Value>()
            .await
            .map_err(|err| RpcError::Transport(err.into()))?;

        let mut envelope = match response {
            Value::Object(envelope) => envelope,
            other => {
                return Err(RpcError::Transport(anyhow::anyhow!(
                    "invalid rpc response: {other}"
                )))
            }
        };

        match envelope.remove("error") {
            None | Some(Value::Null) => {}
            Some(error) => return Err(RpcError::from_error_object(error)),
        }

        match envelope.remove("result") {
            Some(result) => Ok(result),
            None => Err(RpcError::Transport(anyhow::anyhow!(
                "response has neither result nor error"
            ))),
        }
    }
}
