//! RPC contracts for reaching the coin daemon and wallet.
//!
//! The transport itself (HTTP, retries, timeouts) lives outside this crate;
//! the adapter only sees a JSON response or a transport failure.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

/// Which remote process a call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// The coin daemon.
    Daemon,
    /// The pool wallet.
    Wallet,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Daemon => f.write_str("daemon"),
            Endpoint::Wallet => f.write_str("wallet"),
        }
    }
}

/// A call that never produced a response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Errors surfaced by the normalized RPC wrappers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// The transport failed before a response arrived
    #[error("{endpoint} {method} transport failure: {source}")]
    Transport {
        endpoint: Endpoint,
        method: String,
        #[source]
        source: TransportError,
    },
    /// The response carried no `result`; the raw body is kept for diagnostics
    #[error("{endpoint} {method} returned no result: {response}")]
    NoResult {
        endpoint: Endpoint,
        method: String,
        response: Value,
    },
    /// The `result` did not have the expected shape
    #[error("{endpoint} {method} returned an unexpected result: {message}")]
    Decode {
        endpoint: Endpoint,
        method: String,
        message: String,
        response: Value,
    },
}

impl RpcError {
    /// The raw response body, when one was received.
    pub fn raw_response(&self) -> Option<&Value> {
        match self {
            RpcError::Transport { .. } => None,
            RpcError::NoResult { response, .. } | RpcError::Decode { response, .. } => Some(response),
        }
    }
}

/// Request/response access to the daemon and wallet JSON-RPC interfaces.
///
/// Implementations return the whole response body; interpreting `result` and
/// `error` is the adapter's job. No ordering is promised between concurrent
/// calls.
#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Call a daemon method.
    async fn daemon_call(&self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Call a wallet method.
    async fn wallet_call(&self, method: &str, params: Value) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: RpcClient + ?Sized> RpcClient for Arc<T> {
    async fn daemon_call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        (**self).daemon_call(method, params).await
    }

    async fn wallet_call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        (**self).wallet_call(method, params).await
    }
}

/// Issue a call and return the raw response body.
pub(crate) async fn call<R: RpcClient + ?Sized>(
    rpc: &R,
    endpoint: Endpoint,
    method: &str,
    params: Value,
) -> Result<Value, RpcError> {
    let response = match endpoint {
        Endpoint::Daemon => rpc.daemon_call(method, params).await,
        Endpoint::Wallet => rpc.wallet_call(method, params).await,
    };

    response.map_err(|source| {
        error!(%endpoint, method, error = %source, "RPC transport failure");
        RpcError::Transport {
            endpoint,
            method: method.to_string(),
            source,
        }
    })
}

/// Issue a call and return its `result` member.
///
/// A response without `result` is logged verbatim and returned as
/// [`RpcError::NoResult`]. Nothing is retried here.
pub(crate) async fn call_result<R: RpcClient + ?Sized>(
    rpc: &R,
    endpoint: Endpoint,
    method: &str,
    params: Value,
) -> Result<Value, RpcError> {
    let response = call(rpc, endpoint, method, params).await?;
    take_result(endpoint, method, response)
}

fn take_result(endpoint: Endpoint, method: &str, mut response: Value) -> Result<Value, RpcError> {
    match response.as_object_mut().and_then(|body| body.remove("result")) {
        Some(result) => Ok(result),
        None => {
            error!(%endpoint, method, %response, "RPC call returned no result");
            Err(RpcError::NoResult {
                endpoint,
                method: method.to_string(),
                response,
            })
        }
    }
}

/// Decode `result[field]` (or the whole result when `field` is `None`).
pub(crate) fn decode<T: DeserializeOwned>(
    endpoint: Endpoint,
    method: &str,
    result: Value,
    field: Option<&str>,
) -> Result<T, RpcError> {
    let value = match field {
        Some(name) => result.get(name).cloned().unwrap_or(Value::Null),
        None => result.clone(),
    };

    serde_json::from_value(value).map_err(|e| {
        error!(%endpoint, method, %result, error = %e, "unexpected RPC result shape");
        RpcError::Decode {
            endpoint,
            method: method.to_string(),
            message: e.to_string(),
            response: serde_json::json!({ "result": result }),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_take_result() {
        let result = take_result(Endpoint::Daemon, "m", json!({"id": 0, "result": {"a": 1}})).unwrap();
        assert_eq!(result, json!({"a": 1}));
    }

    #[test]
    fn test_missing_result_keeps_raw_response() {
        let body = json!({"error": {"code": -9, "message": "core is busy"}});
        let err = take_result(Endpoint::Daemon, "getlastblockheader", body.clone()).unwrap_err();

        assert_eq!(err.raw_response(), Some(&body));
        assert!(err.to_string().contains("core is busy"));
        assert!(err.to_string().starts_with("daemon getlastblockheader"));
    }

    #[test]
    fn test_non_object_response() {
        let err = take_result(Endpoint::Wallet, "getStatus", Value::Null).unwrap_err();
        assert!(matches!(err, RpcError::NoResult { endpoint: Endpoint::Wallet, .. }));
    }

    #[test]
    fn test_decode_field() {
        let status: String = decode(Endpoint::Daemon, "submitblock", json!({"status": "OK"}), Some("status")).unwrap();
        assert_eq!(status, "OK");

        let err = decode::<String>(Endpoint::Daemon, "submitblock", json!({}), Some("status")).unwrap_err();
        assert!(matches!(err, RpcError::Decode { .. }));
        assert_eq!(err.raw_response(), Some(&json!({"result": {}})));
    }
}
