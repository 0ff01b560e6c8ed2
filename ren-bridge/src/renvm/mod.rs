// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Talking to RenVM: the provider seam, its HTTP JSON-RPC implementation and
//! the submit / wait state machine built on top of it.

use crate::error::{BridgeError, BridgeResult};
use crate::pack::TypedPackValue;
use crate::transaction::RenVmTransaction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod jsonrpc;
pub mod submitter;

pub use jsonrpc::RenVmJsonRpcClient;
pub use submitter::{RenVmProgress, RenVmTxSubmitter, SignatureCallback};

pub const RENVM_CHAIN: &str = "RenVM";

/// Status reported by `ren_queryTx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Nil,
    Confirming,
    Pending,
    Executing,
    Reverted,
    Done,
    #[serde(other)]
    Unknown,
}

impl TxStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, TxStatus::Done | TxStatus::Reverted)
    }
}

/// A transaction as RenVM reports it. `in` and `out` are kept as raw typed
/// values so unknown schemas still round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenVmTxRecord {
    pub hash: String,
    #[serde(default)]
    pub version: String,
    pub selector: String,
    #[serde(rename = "in")]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTxResponse {
    pub tx: RenVmTxRecord,
    pub tx_status: TxStatus,
}

impl QueryTxResponse {
    /// Non-empty `revert` of the output, either at the top level or inside
    /// the typed value.
    pub fn revert_reason(&self) -> Option<String> {
        let out = self.tx.out.as_ref()?;
        [out.get("revert"), out.get("v").and_then(|v| v.get("revert"))]
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
            .find(|reason| !reason.is_empty())
            .map(str::to_string)
    }

    pub fn typed_input(&self) -> BridgeResult<TypedPackValue> {
        TypedPackValue::from_json(&self.tx.input)
    }

    pub fn typed_output(&self) -> BridgeResult<Option<TypedPackValue>> {
        match &self.tx.out {
            Some(out) if out.get("t").is_some() => TypedPackValue::from_json(out).map(Some),
            _ => Ok(None),
        }
    }
}

/// The calls the submitter needs from RenVM.
#[async_trait]
pub trait RenVmProvider: Send + Sync {
    async fn submit_tx(&self, tx: &RenVmTransaction) -> BridgeResult<()>;

    /// Fails with a not-found RPC error until RenVM has seen the hash.
    async fn query_tx(&self, hash: &str) -> BridgeResult<QueryTxResponse>;
}

/// Reads `v.<asset>.shards[0].pubKey` out of a `ren_queryBlockState` result.
pub fn shard_public_key_from_block_state(state: &Value, asset: &str) -> BridgeResult<Vec<u8>> {
    let asset_state = state
        .get("state")
        .unwrap_or(state)
        .get("v")
        .and_then(|v| v.get(asset))
        .ok_or_else(|| {
            BridgeError::Configuration(format!("no RenVM block state for asset {}", asset))
        })?;
    let pubkey = asset_state
        .get("shards")
        .and_then(Value::as_array)
        .and_then(|shards| shards.first())
        .and_then(|shard| shard.get("pubKey"))
        .and_then(Value::as_str)
        .ok_or_else(|| {
            BridgeError::Configuration(format!("no RenVM shards found for asset {}", asset))
        })?;
    crate::utils::from_base64(pubkey)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(out: Option<Value>, status: &str) -> QueryTxResponse {
        serde_json::from_value(json!({
            "tx": {
                "hash": "hbX3CkyjAyHuGXhrYkzbRzWEgsBxGZPe2RVa_PnLRSM",
                "version": "1",
                "selector": "FIL/toEthereum",
                "in": {"t": "u64", "v": "1"},
                "out": out,
            },
            "txStatus": status,
        }))
        .unwrap()
    }

    #[test]
    fn test_revert_reason_lookup() {
        let top = response(Some(json!({"revert": "insufficient funds"})), "done");
        assert_eq!(top.revert_reason().as_deref(), Some("insufficient funds"));

        let typed = response(
            Some(json!({"t": {"struct": [{"revert": "str"}]}, "v": {"revert": "nonce used"}})),
            "done",
        );
        assert_eq!(typed.revert_reason().as_deref(), Some("nonce used"));
        assert!(typed.typed_output().unwrap().is_some());

        let empty = response(
            Some(json!({"t": {"struct": [{"revert": "str"}]}, "v": {"revert": ""}})),
            "done",
        );
        assert_eq!(empty.revert_reason(), None);
        assert_eq!(response(None, "done").revert_reason(), None);
    }

    #[test]
    fn test_tx_status_parsing() {
        assert_eq!(response(None, "executing").tx_status, TxStatus::Executing);
        assert_eq!(response(None, "somethingnew").tx_status, TxStatus::Unknown);
        assert!(TxStatus::Reverted.is_final());
        assert!(!TxStatus::Pending.is_final());
        assert_eq!(
            response(None, "done").typed_input().unwrap().value().as_uint(),
            Some(1u64.into())
        );
    }

    #[test]
    fn test_shard_key_selection() {
        let state = json!({
            "state": {
                "t": {},
                "v": {"FIL": {"shards": [{"pubKey": "Aw3WX32ykguyKZEuP0IT3RUOX5csm3PpvnFNhEVhrDVc"}]}},
            }
        });
        let key = shard_public_key_from_block_state(&state, "FIL").unwrap();
        assert_eq!(
            hex::encode(key),
            "030dd65f7db2920bb229912e3f4213dd150e5f972c9b73e9be714d844561ac355c"
        );

        let err = shard_public_key_from_block_state(&state, "BTC").unwrap_err();
        assert_eq!(err.error_type(), "configuration");

        let no_shards = json!({"state": {"v": {"FIL": {"shards": []}}}});
        assert!(shard_public_key_from_block_state(&no_shards, "FIL")
            .unwrap_err()
            .to_string()
            .contains("no RenVM shards"));
    }
}
