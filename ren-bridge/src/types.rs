// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{BridgeError, BridgeResult};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a submitted or watched transaction.
///
/// ```text
///   Ready ──▶ Confirming ──▶ Done
///                  │
///                  └──────▶ Reverted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainTransactionStatus {
    Ready,
    Confirming,
    Done,
    Reverted,
}

impl ChainTransactionStatus {
    fn rank(&self) -> u8 {
        match self {
            ChainTransactionStatus::Ready => 0,
            ChainTransactionStatus::Confirming => 1,
            ChainTransactionStatus::Done | ChainTransactionStatus::Reverted => 2,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ChainTransactionStatus::Done | ChainTransactionStatus::Reverted
        )
    }

    /// Staying in the same state is always allowed. Terminal states only
    /// allow that.
    pub fn can_advance_to(&self, next: ChainTransactionStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }
        next.rank() >= self.rank()
    }
}

impl fmt::Display for ChainTransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChainTransactionStatus::Ready => "ready",
            ChainTransactionStatus::Confirming => "confirming",
            ChainTransactionStatus::Done => "done",
            ChainTransactionStatus::Reverted => "reverted",
        };
        write!(f, "{}", s)
    }
}

/// Canonical reference to a transaction on some chain. `txid` is the
/// URL-safe base64 of the raw id bytes and `tx_hash` is the chain's own
/// rendering of the same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransaction {
    pub chain: String,
    pub txid: String,
    pub tx_hash: String,
    pub txindex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_link: Option<String>,
}

impl ChainTransaction {
    pub fn amount_u256(&self) -> Option<U256> {
        self.amount
            .as_deref()
            .and_then(|a| U256::from_dec_str(a).ok())
    }
}

/// A transaction reference where either id form may be missing. Completed
/// into a [`ChainTransaction`] by the chain's tx-hash codec.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialChainTransaction {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub txindex: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

impl PartialChainTransaction {
    pub fn from_tx_hash(tx_hash: impl Into<String>) -> Self {
        Self {
            tx_hash: Some(tx_hash.into()),
            ..Default::default()
        }
    }

    pub fn from_txid(txid: impl Into<String>) -> Self {
        Self {
            txid: Some(txid.into()),
            ..Default::default()
        }
    }
}

impl From<&ChainTransaction> for PartialChainTransaction {
    fn from(tx: &ChainTransaction) -> Self {
        Self {
            txid: Some(tx.txid.clone()),
            tx_hash: Some(tx.tx_hash.clone()),
            txindex: Some(tx.txindex.clone()),
            amount: tx.amount.clone(),
        }
    }
}

/// A deposit discovered by a watcher, handed to the caller's input callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputChainTransaction {
    #[serde(flatten)]
    pub tx: ChainTransaction,
    pub asset: String,
}

/// Progress of one transaction. Owned by a single submitter, waiter or
/// watcher; callers only ever see clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainTransactionProgress {
    pub chain: String,
    pub status: ChainTransactionStatus,
    pub target: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<ChainTransaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced: Option<ChainTransaction>,
}

impl ChainTransactionProgress {
    pub fn new(
        chain: impl Into<String>,
        status: ChainTransactionStatus,
        target: u64,
        transaction: Option<ChainTransaction>,
    ) -> Self {
        Self {
            chain: chain.into(),
            status,
            target,
            confirmations: None,
            transaction,
            revert_reason: None,
            replaced: None,
        }
    }

    pub fn advance(&mut self, next: ChainTransactionStatus) -> BridgeResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(BridgeError::Internal(format!(
                "[{}] invalid status transition {} -> {}",
                self.chain, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Confirmations never go down, a lower report is ignored.
    pub fn observe_confirmations(&mut self, confirmations: u64) -> bool {
        match self.confirmations {
            Some(current) if current >= confirmations => false,
            _ => {
                self.confirmations = Some(confirmations);
                true
            }
        }
    }

    pub fn revert(&mut self, reason: impl Into<String>) -> BridgeResult<()> {
        self.advance(ChainTransactionStatus::Reverted)?;
        self.revert_reason = Some(reason.into());
        Ok(())
    }

    /// Records that `transaction` superseded the tracked one.
    pub fn replace_transaction(&mut self, transaction: ChainTransaction) {
        self.replaced = self.transaction.replace(transaction);
    }
}
