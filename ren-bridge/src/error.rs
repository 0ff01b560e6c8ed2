// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    // A typed value could not be encoded, e.g. a fixed-width field has the wrong length
    #[error("failed to encode field `{field}` as {tag}: {reason}")]
    Encoding {
        field: String,
        tag: String,
        reason: String,
    },
    // Bytes or JSON could not be decoded into a typed value
    #[error("failed to decode {tag}: {reason}")]
    Decoding { tag: String, reason: String },
    // Invalid curve point or scalar while deriving a gateway address
    #[error("gateway derivation failed: {0}")]
    Derivation(String),
    // Timeouts, dropped connections, indexer outages
    #[error("transient network error: {0}")]
    TransientNetwork(String),
    // Error object returned by a JSON-RPC endpoint
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    // RenVM explicitly rejected the transaction
    #[error("RenVM transaction {hash} reverted: {reason}")]
    ProtocolRevert { hash: String, reason: String },
    // Unsupported asset, wrong chain payload, invalid caller supplied address
    #[error("configuration error: {0}")]
    Configuration(String),
    // Post-confirmation callback failed
    #[error("callback failed: {0}")]
    Callback(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn encoding(field: impl Into<String>, tag: impl Into<String>, reason: impl ToString) -> Self {
        BridgeError::Encoding {
            field: field.into(),
            tag: tag.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decoding(tag: impl Into<String>, reason: impl ToString) -> Self {
        BridgeError::Decoding {
            tag: tag.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::Encoding { .. } => "encoding",
            BridgeError::Decoding { .. } => "decoding",
            BridgeError::Derivation(_) => "derivation",
            BridgeError::TransientNetwork(_) => "transient_network",
            BridgeError::Rpc { .. } => "rpc",
            BridgeError::ProtocolRevert { .. } => "protocol_revert",
            BridgeError::Configuration(_) => "configuration",
            BridgeError::Callback(_) => "callback",
            BridgeError::Internal(_) => "internal",
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::TransientNetwork(_) => true,
            BridgeError::Rpc { .. } => self.is_not_found(),
            _ => false,
        }
    }

    /// Whether the remote side reported that the requested entity does not
    /// exist (yet). These show up when querying a tx right after submission.
    pub fn is_not_found(&self) -> bool {
        let message = match self {
            BridgeError::Rpc { message, .. } => message,
            BridgeError::TransientNetwork(message) => message,
            _ => return false,
        };
        let message = message.to_lowercase();
        message.contains("not found") || message.contains("not available")
    }
}

// Wire failures are transient. Builder and decode errors are not.
impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            BridgeError::TransientNetwork(err.to_string())
        } else if err.is_decode() {
            BridgeError::decoding("http response", err)
        } else if err.is_builder() {
            BridgeError::Configuration(err.to_string())
        } else if let Some(status) = err.status() {
            BridgeError::Rpc {
                code: i64::from(status.as_u16()),
                message: err.to_string(),
            }
        } else {
            BridgeError::Internal(err.to_string())
        }
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
