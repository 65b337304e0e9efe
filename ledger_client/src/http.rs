//! JSON-RPC [`LedgerClient`] over HTTP.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use stakeline_types::{Contract, Period, SignedTransaction, TransactionReceipt, TxHash};

use crate::client::LedgerClient;
use crate::error::LedgerError;

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a staking-ledger JSON-RPC provider.
///
/// Wraps `reqwest::Client` with the provider URL. Each trait method maps to
/// one JSON-RPC method: `staking_call`, `staking_sendTransaction`,
/// `staking_getReceipt` and `staking_currentPeriod`.
#[derive(Clone)]
pub struct HttpLedgerClient {
    http: reqwest::Client,
    provider_uri: String,
    next_id: std::sync::Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    code: i64,
    message: String,
}

impl HttpLedgerClient {
    pub fn new(provider_uri: impl Into<String>) -> Result<Self, LedgerError> {
        Self::with_timeout(provider_uri, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        provider_uri: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LedgerError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            provider_uri: provider_uri.into(),
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn provider_uri(&self) -> &str {
        &self.provider_uri
    }

    async fn rpc(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(method, id, "ledger rpc");

        let response = self
            .http
            .post(&self.provider_uri)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LedgerError::Transport(format!("request timed out: {e}"))
                } else if e.is_connect() {
                    LedgerError::Transport(format!("connection failed: {e}"))
                } else {
                    LedgerError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(LedgerError::Transport(format!(
                "provider returned HTTP {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("invalid JSON-RPC body: {e}")))?;

        if let Some(err) = parsed.error {
            return Err(LedgerError::Rpc(format!("{} (code {})", err.message, err.code)));
        }
        // A null result (pending receipt) deserializes as `None`.
        Ok(parsed.result.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn call(
        &self,
        contract: &Contract,
        method: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, LedgerError> {
        self.rpc(
            "staking_call",
            json!({ "contract": contract, "method": method, "args": args }),
        )
        .await
    }

    async fn submit(&self, tx: &SignedTransaction) -> Result<TxHash, LedgerError> {
        let method = tx.transaction.call.method();
        let payload = json!({
            "transaction": tx,
            "method": method,
            "args": tx.transaction.call.call.args(),
        });
        let result = self
            .rpc("staking_sendTransaction", payload)
            .await
            .map_err(|e| match e {
                LedgerError::Rpc(msg) => LedgerError::Rejected(msg),
                other => other,
            })?;
        let hash = result
            .as_str()
            .ok_or_else(|| LedgerError::InvalidResponse(format!("tx hash: {result}")))?;
        TxHash::from_hex(hash).map_err(|e| LedgerError::InvalidResponse(e.to_string()))
    }

    async fn receipt(&self, tx_hash: &TxHash) -> Result<Option<TransactionReceipt>, LedgerError> {
        let result = self
            .rpc("staking_getReceipt", json!({ "tx_hash": tx_hash }))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .map_err(|e| LedgerError::InvalidResponse(format!("receipt: {e}")))
    }

    async fn current_period(&self) -> Result<Period, LedgerError> {
        let result = self.rpc("staking_currentPeriod", json!({})).await?;
        result
            .as_u64()
            .map(Period::new)
            .ok_or_else(|| LedgerError::InvalidResponse(format!("period: {result}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_error_body_parses() {
        let body: RpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"execution reverted"}}"#,
        )
        .unwrap();
        assert!(body.result.is_none());
        assert_eq!(body.error.unwrap().message, "execution reverted");
    }

    #[test]
    fn null_result_parses_as_none() {
        let body: RpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(body.result.is_none());
    }

    #[tokio::test]
    async fn unreachable_provider_is_transport_error() {
        let client =
            HttpLedgerClient::with_timeout("http://127.0.0.1:9", Duration::from_millis(200))
                .unwrap();
        let err = client.current_period().await.unwrap_err();
        assert!(matches!(err, LedgerError::Transport(_)));
    }
}
