// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Capabilities a chain adapter plugs into the protocol core.
//!
//! A lock chain is split in two:
//! - [`LockChain`]: pure, synchronous descriptors (assets, address and
//!   tx-hash codecs, explorer links, gateway address derivation)
//! - [`DepositClient`] / [`DepositIndexer`]: the network side, used by the
//!   deposit watcher and the confirmation waiter

use crate::error::{BridgeError, BridgeResult};
use crate::types::{ChainTransaction, PartialChainTransaction};
use crate::utils::{from_base64, to_url_base64};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A deposit as reported by a chain client or indexer. `id` is the chain's
/// tx hash string, `amount` a decimal string in the asset's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDeposit {
    pub id: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMessage {
    pub id: String,
    pub amount: String,
    pub confirmations: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositPage {
    pub deposits: Vec<ChainDeposit>,
    pub total_count: u64,
}

/// Node-backed access to a chain.
#[async_trait]
pub trait DepositClient: Send + Sync {
    async fn get_height(&self) -> BridgeResult<u64>;

    /// Deposits to `address` in blocks `[from_height, to_height]`.
    async fn fetch_deposits(
        &self,
        address: &str,
        from_height: u64,
        to_height: u64,
    ) -> BridgeResult<Vec<ChainDeposit>>;

    async fn fetch_message(&self, id: &str) -> BridgeResult<ChainMessage>;
}

/// Explorer-backed history, used to catch up on long backlogs.
#[async_trait]
pub trait DepositIndexer: Send + Sync {
    async fn fetch_deposits_page(
        &self,
        address: &str,
        page: u64,
        size: u64,
    ) -> BridgeResult<DepositPage>;

    async fn fetch_message(&self, id: &str) -> BridgeResult<ChainMessage>;
}

/// Where the funds of a mint come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputPayload {
    /// Watch a freshly derived gateway address.
    GatewayAddress { chain: String },
    /// An existing transaction the caller already knows about.
    Transaction { chain: String, tx: ChainTransaction },
}

impl InputPayload {
    pub fn chain(&self) -> &str {
        match self {
            InputPayload::GatewayAddress { chain } => chain,
            InputPayload::Transaction { chain, .. } => chain,
        }
    }
}

/// Recipient of a burn on a lock chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPayload {
    pub chain: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub to: String,
    pub to_bytes: Vec<u8>,
    pub payload: Vec<u8>,
}

pub trait LockChain: Send + Sync {
    fn name(&self) -> &str;

    fn is_lock_asset(&self, asset: &str) -> bool;

    fn asset_decimals(&self, asset: &str) -> BridgeResult<u32>;

    fn validate_address(&self, address: &str) -> bool;

    fn address_to_bytes(&self, address: &str) -> BridgeResult<Vec<u8>>;

    fn address_from_bytes(&self, bytes: &[u8]) -> BridgeResult<String>;

    fn tx_hash_to_bytes(&self, tx_hash: &str) -> BridgeResult<Vec<u8>>;

    fn tx_hash_from_bytes(&self, bytes: &[u8]) -> BridgeResult<String>;

    fn transaction_explorer_link(&self, tx_hash: &str) -> String;

    fn address_explorer_link(&self, address: &str) -> String;

    fn validate_transaction(&self, tx: &PartialChainTransaction) -> bool;

    /// Derives the deposit address for a mint session.
    fn create_gateway_address(
        &self,
        asset: &str,
        from: &InputPayload,
        shard_public_key: &[u8],
        ghash: &[u8],
    ) -> BridgeResult<String>;

    fn get_output_payload(&self, asset: &str, to: &OutputPayload) -> BridgeResult<OutputTarget>;

    fn assert_asset_is_supported(&self, asset: &str) -> BridgeResult<()> {
        if !self.is_lock_asset(asset) {
            return Err(BridgeError::Configuration(format!(
                "asset {} not supported on {}",
                asset,
                self.name()
            )));
        }
        Ok(())
    }

    fn assert_payload_chain(&self, payload_chain: &str) -> BridgeResult<()> {
        if payload_chain != self.name() {
            return Err(BridgeError::Configuration(format!(
                "invalid payload for chain {} instead of {}",
                payload_chain,
                self.name()
            )));
        }
        Ok(())
    }

    /// Fills in whichever of `txid` / `tx_hash` is missing, defaults the
    /// txindex to "0" and attaches the explorer link.
    fn populate_transaction(&self, partial: &PartialChainTransaction) -> BridgeResult<ChainTransaction> {
        let (txid, tx_hash) = match (&partial.txid, &partial.tx_hash) {
            (Some(txid), Some(tx_hash)) => {
                let expected = to_url_base64(&self.tx_hash_to_bytes(tx_hash)?);
                if &expected != txid {
                    return Err(BridgeError::Configuration(format!(
                        "[{}] txid {} does not match tx hash {}",
                        self.name(),
                        txid,
                        tx_hash
                    )));
                }
                (txid.clone(), tx_hash.clone())
            }
            (Some(txid), None) => (txid.clone(), self.tx_hash_from_bytes(&from_base64(txid)?)?),
            (None, Some(tx_hash)) => (to_url_base64(&self.tx_hash_to_bytes(tx_hash)?), tx_hash.clone()),
            (None, None) => {
                return Err(BridgeError::Configuration(format!(
                    "[{}] transaction needs a txid or a tx hash",
                    self.name()
                )))
            }
        };
        Ok(ChainTransaction {
            chain: self.name().to_string(),
            explorer_link: Some(self.transaction_explorer_link(&tx_hash)),
            txid,
            tx_hash,
            txindex: partial.txindex.clone().unwrap_or_else(|| "0".to_string()),
            amount: partial.amount.clone(),
        })
    }

    /// Builds the `Transaction` input payload for an existing transaction.
    fn transaction_payload(&self, partial: &PartialChainTransaction) -> BridgeResult<InputPayload> {
        if !self.validate_transaction(partial) {
            return Err(BridgeError::Configuration(format!(
                "invalid {} transaction {:?}",
                self.name(),
                partial
            )));
        }
        Ok(InputPayload::Transaction {
            chain: self.name().to_string(),
            tx: self.populate_transaction(partial)?,
        })
    }

    fn gateway_address_payload(&self) -> InputPayload {
        InputPayload::GatewayAddress {
            chain: self.name().to_string(),
        }
    }

    /// Builds the output payload for a burn recipient, rejecting bad addresses.
    fn address_payload(&self, address: &str) -> BridgeResult<OutputPayload> {
        if !self.validate_address(address) {
            return Err(BridgeError::Configuration(format!(
                "invalid {} address: {}",
                self.name(),
                address
            )));
        }
        Ok(OutputPayload {
            chain: self.name().to_string(),
            address: address.to_string(),
        })
    }
}
