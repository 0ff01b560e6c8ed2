// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

// Async HTTP JSON-RPC client for RenVM lightnodes.
// RenVM takes named params, so every request carries a single JSON object.

use super::{shard_public_key_from_block_state, QueryTxResponse, RenVmProvider};
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::RenBridgeMetrics;
use crate::transaction::RenVmTransaction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

const MAX_TRANSPORT_ATTEMPTS: usize = 3;

#[derive(Clone, Debug)]
pub struct RenVmJsonRpcClient {
    http_client: reqwest::Client,
    rpc_url: String,
    request_id: Arc<AtomicU64>,
    metrics: Option<Arc<RenBridgeMetrics>>,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

fn shared_http_client() -> reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT
        .get_or_init(|| {
            reqwest::Client::builder()
                .pool_max_idle_per_host(16)
                .tcp_keepalive(Some(Duration::from_secs(30)))
                .connect_timeout(Duration::from_secs(5))
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default()
        })
        .clone()
}

fn is_transient_transport_error(err: &reqwest::Error) -> bool {
    if err.is_connect() || err.is_timeout() {
        return true;
    }
    let msg = err.to_string().to_lowercase();
    msg.contains("connection closed")
        || msg.contains("connection reset")
        || msg.contains("broken pipe")
        || msg.contains("unexpected eof")
        || msg.contains("incomplete")
}

/// Splits a JSON-RPC response body into its result or its error object.
/// A missing result is returned as `null`.
fn parse_response(text: &str) -> BridgeResult<Value> {
    let response: JsonRpcResponse = serde_json::from_str(text)
        .map_err(|e| BridgeError::decoding("json-rpc response", e))?;
    if let Some(error) = response.error {
        return Err(BridgeError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(response.result.unwrap_or(Value::Null))
}

impl RenVmJsonRpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            http_client: shared_http_client(),
            rpc_url: rpc_url.into(),
            request_id: Arc::new(AtomicU64::new(1)),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<RenBridgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub async fn call(&self, method: &str, params: Value) -> BridgeResult<Value> {
        let start = Instant::now();
        let result = self.call_inner(method, params).await;
        if let Some(metrics) = &self.metrics {
            metrics.renvm_rpc_queries.with_label_values(&[method]).inc();
            metrics
                .renvm_rpc_queries_latency
                .with_label_values(&[method])
                .observe(start.elapsed().as_secs_f64());
            if let Err(e) = &result {
                metrics
                    .renvm_rpc_errors
                    .with_label_values(&[method, e.error_type()])
                    .inc();
            }
        }
        result
    }

    async fn call_inner(&self, method: &str, params: Value) -> BridgeResult<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.request_id.fetch_add(1, Ordering::SeqCst),
        };
        tracing::debug!("[RenVM] >>> {} id={}", method, request.id);

        let mut last_transport_err = None;
        for attempt in 0..MAX_TRANSPORT_ATTEMPTS {
            let sent = self
                .http_client
                .post(&self.rpc_url)
                .json(&request)
                .send()
                .await;
            let response = match sent {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt + 1 < MAX_TRANSPORT_ATTEMPTS && is_transient_transport_error(&err) {
                        tracing::warn!(
                            "[RenVM] transport error calling {} (attempt {}/{}), retrying",
                            method,
                            attempt + 1,
                            MAX_TRANSPORT_ATTEMPTS
                        );
                        last_transport_err = Some(err);
                        tokio::time::sleep(Duration::from_millis(50 * (attempt as u64 + 1))).await;
                        continue;
                    }
                    return Err(err.into());
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::error!("[RenVM] <<< {} HTTP error {}: {}", method, status, body);
                // A lightnode answers JSON-RPC errors with a non-2xx status too.
                if let Err(e @ BridgeError::Rpc { .. }) = parse_response(&body) {
                    return Err(e);
                }
                if status.is_server_error() {
                    return Err(BridgeError::TransientNetwork(format!(
                        "HTTP error {} calling {}",
                        status, method
                    )));
                }
                return Err(BridgeError::Rpc {
                    code: i64::from(status.as_u16()),
                    message: body,
                });
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(err) => {
                    if attempt + 1 < MAX_TRANSPORT_ATTEMPTS && is_transient_transport_error(&err) {
                        tracing::warn!(
                            "[RenVM] failed reading response for {} (attempt {}/{}), retrying",
                            method,
                            attempt + 1,
                            MAX_TRANSPORT_ATTEMPTS
                        );
                        last_transport_err = Some(err);
                        tokio::time::sleep(Duration::from_millis(50 * (attempt as u64 + 1))).await;
                        continue;
                    }
                    return Err(err.into());
                }
            };
            tracing::trace!("[RenVM] <<< {}\n{}", method, text);
            return parse_response(&text);
        }

        Err(last_transport_err
            .map(BridgeError::from)
            .unwrap_or_else(|| {
                BridgeError::TransientNetwork(format!("{} failed after retries", method))
            }))
    }

    pub async fn submit_tx(&self, tx: &RenVmTransaction) -> BridgeResult<()> {
        let tx = serde_json::to_value(tx)
            .map_err(|e| BridgeError::encoding("tx", "json", e))?;
        self.call("ren_submitTx", json!({ "tx": tx })).await?;
        Ok(())
    }

    pub async fn query_tx(&self, hash: &str) -> BridgeResult<QueryTxResponse> {
        let result = self.call("ren_queryTx", json!({ "txHash": hash })).await?;
        serde_json::from_value(result).map_err(|e| BridgeError::decoding("ren_queryTx result", e))
    }

    pub async fn query_block_state(&self, contract: &str) -> BridgeResult<Value> {
        self.call("ren_queryBlockState", json!({ "contract": contract }))
            .await
    }

    /// Current public key of the first shard that custodies `asset`.
    pub async fn select_shard_public_key(&self, asset: &str) -> BridgeResult<Vec<u8>> {
        let state = self.query_block_state(asset).await?;
        shard_public_key_from_block_state(&state, asset)
    }
}

#[async_trait]
impl RenVmProvider for RenVmJsonRpcClient {
    async fn submit_tx(&self, tx: &RenVmTransaction) -> BridgeResult<()> {
        RenVmJsonRpcClient::submit_tx(self, tx).await
    }

    async fn query_tx(&self, hash: &str) -> BridgeResult<QueryTxResponse> {
        RenVmJsonRpcClient::query_tx(self, hash).await
    }
}
