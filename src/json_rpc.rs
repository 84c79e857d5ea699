use serde::Serialize;
use serde_json::Value;

const JSON_RPC_VERSION: &str = "2.0";

/// Outbound JSON-RPC 2.0 envelope posted to the remote provider.
#[derive(Serialize, Clone, Debug)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSON_RPC_VERSION,
            method: method.into(),
            params,
            id,
        }
    }
}

/// Errors surfaced by the request pipeline.
///
/// Upstream JSON-RPC error objects are carried verbatim and never rewritten;
/// the cache records nothing when any of these occur.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The provider answered with a JSON-RPC error object.
    #[error("upstream rpc error {code}: {message}")]
    Upstream {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The network call itself failed or the response was not valid JSON-RPC.
    #[error("transport error: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// The block tracker could not produce a latest height.
    #[error("block tracker error: {0:#}")]
    BlockTracker(#[source] anyhow::Error),
}

impl RpcError {
    /// Builds an [`RpcError::Upstream`] from the `error` member of a response
    /// envelope, keeping the upstream fields as-is.
    pub fn from_error_object(error: Value) -> Self {
        let code = error["code"].as_i64().unwrap_or(-32603);
        let message = error["message"]
            .as_str()
            .unwrap_or("unknown upstream error")
            .to_string();
        let data = match &error["data"] {
            Value::Null => None,
            data => Some(data.clone()),
        };

        RpcError::Upstream {
            code,
            message,
            data,
        }
    }
}
