// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-process mocks of the RenVM provider and the chain collaborators.

use crate::chain::{ChainDeposit, ChainMessage, DepositClient, DepositIndexer, DepositPage};
use crate::error::{BridgeError, BridgeResult};
use crate::renvm::{QueryTxResponse, RenVmProvider, RenVmTxRecord, TxStatus};
use crate::transaction::{
    generate_ghash, generate_nhash, generate_phash, generate_shash, CrossChainInput,
    RenVmTransaction,
};
use crate::utils::from_base64;
use async_trait::async_trait;
use ethers::types::U256;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Valid 38 byte Filecoin message CIDs.
pub const TEST_MESSAGE_CIDS: [&str; 6] = [
    "bafy2bzacebpffel4pim7dxhjhyjijwqhu6qntukxsnmdxv62shlrgvnnlqcg6",
    "bafy2bzacearvevtv5rrdxid3rpf62cgzj747memvgh2zxhlz2vln6ulc47iak",
    "bafy2bzacebkhzn4axwsygtmess5xa25ubyiq3og7gpi7notjrdg4zyjswqd3a",
    "bafy2bzacealfe6kuablt6gmwb3p56ldgeq3w2as3x7zmhohxah2orzn2hnqam",
    "bafy2bzacedpmwibq6jy2uyjvy4scuc3sryzrriaht3k7wbpt435xlyhgarkku",
    "bafy2bzacebhhavqfr57nssylk4dlmbgvwj6sx6xsra7rd4w3anf422mju7vx2",
];

pub const TEST_SHARD_PUBKEY: &str =
    "030dd65f7db2920bb229912e3f4213dd150e5f972c9b73e9be714d844561ac355c";

pub fn deposit(index: usize, amount: u64) -> ChainDeposit {
    ChainDeposit {
        id: TEST_MESSAGE_CIDS[index].to_string(),
        amount: amount.to_string(),
    }
}

pub fn sample_cross_chain_input() -> CrossChainInput {
    let payload = vec![];
    let nonce = vec![0u8; 32];
    let txid = from_base64("AXGg5AIgHM5CO4I-qfmUkSRN8TLUtqDEMx0ZOmFiLJwJh-YiDZs").unwrap();
    let phash = generate_phash(&payload).to_vec();
    CrossChainInput {
        nhash: generate_nhash(&nonce, &txid, 0).to_vec(),
        ghash: generate_ghash(&phash, &generate_shash("FIL/toEthereum"), &[0u8; 20], &nonce)
            .to_vec(),
        txid,
        txindex: 0,
        amount: U256::from(1_000_000_000_000_000_000u64),
        payload,
        phash,
        to: "0x0000000000000000000000000000000000000001".to_string(),
        nonce,
        gpubkey: hex::decode(TEST_SHARD_PUBKEY).unwrap(),
    }
}

pub fn query_response(hash: &str, status: TxStatus, out: Option<Value>) -> QueryTxResponse {
    QueryTxResponse {
        tx: RenVmTxRecord {
            hash: hash.to_string(),
            version: "1".to_string(),
            selector: "FIL/toEthereum".to_string(),
            input: json!({}),
            out,
        },
        tx_status: status,
    }
}

pub fn not_found(hash: &str) -> BridgeError {
    BridgeError::Rpc {
        code: -32603,
        message: format!("tx={} not found", hash),
    }
}

/// Scripted RenVM node. Queued responses are served first, then the
/// wildcard response (if any) forever.
#[derive(Clone, Default)]
pub struct MockRenVmProvider {
    submit_responses: Arc<Mutex<VecDeque<BridgeResult<()>>>>,
    wildcard_submit_response: Arc<Mutex<Option<BridgeResult<()>>>>,
    query_responses: Arc<Mutex<VecDeque<BridgeResult<QueryTxResponse>>>>,
    wildcard_query_response: Arc<Mutex<Option<BridgeResult<QueryTxResponse>>>>,
    submitted: Arc<Mutex<Vec<RenVmTransaction>>>,
    submit_calls: Arc<AtomicU64>,
    query_calls: Arc<AtomicU64>,
}

impl MockRenVmProvider {
    pub fn add_submit_response(&self, response: BridgeResult<()>) {
        self.submit_responses.lock().unwrap().push_back(response);
    }

    pub fn set_wildcard_submit_response(&self, response: BridgeResult<()>) {
        *self.wildcard_submit_response.lock().unwrap() = Some(response);
    }

    pub fn add_query_response(&self, response: BridgeResult<QueryTxResponse>) {
        self.query_responses.lock().unwrap().push_back(response);
    }

    pub fn set_wildcard_query_response(&self, response: BridgeResult<QueryTxResponse>) {
        *self.wildcard_query_response.lock().unwrap() = Some(response);
    }

    pub fn submitted(&self) -> Vec<RenVmTransaction> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn submit_calls(&self) -> u64 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> u64 {
        self.query_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenVmProvider for MockRenVmProvider {
    async fn submit_tx(&self, tx: &RenVmTransaction) -> BridgeResult<()> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(tx.clone());
        if let Some(response) = self.submit_responses.lock().unwrap().pop_front() {
            return response;
        }
        self.wildcard_submit_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Ok(()))
    }

    async fn query_tx(&self, hash: &str) -> BridgeResult<QueryTxResponse> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = self.query_responses.lock().unwrap().pop_front() {
            return response;
        }
        self.wildcard_query_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(not_found(hash)))
    }
}

/// Chain node holding deposits at fixed heights.
#[derive(Clone, Default)]
pub struct MockDepositClient {
    height: Arc<AtomicU64>,
    height_errors: Arc<Mutex<VecDeque<BridgeError>>>,
    deposits: Arc<Mutex<Vec<(u64, ChainDeposit)>>>,
    deposit_errors: Arc<Mutex<VecDeque<BridgeError>>>,
    messages: Arc<Mutex<HashMap<String, ChainMessage>>>,
    message_errors: Arc<Mutex<VecDeque<BridgeError>>>,
    scanned_ranges: Arc<Mutex<Vec<(u64, u64)>>>,
    height_calls: Arc<AtomicU64>,
    message_calls: Arc<AtomicU64>,
}

impl MockDepositClient {
    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn add_height_error(&self, error: BridgeError) {
        self.height_errors.lock().unwrap().push_back(error);
    }

    pub fn add_deposit(&self, height: u64, deposit: ChainDeposit) {
        self.deposits.lock().unwrap().push((height, deposit));
    }

    pub fn add_deposit_error(&self, error: BridgeError) {
        self.deposit_errors.lock().unwrap().push_back(error);
    }

    pub fn set_message(&self, message: ChainMessage) {
        self.messages
            .lock()
            .unwrap()
            .insert(message.id.clone(), message);
    }

    pub fn add_message_error(&self, error: BridgeError) {
        self.message_errors.lock().unwrap().push_back(error);
    }

    pub fn scanned_ranges(&self) -> Vec<(u64, u64)> {
        self.scanned_ranges.lock().unwrap().clone()
    }

    pub fn height_calls(&self) -> u64 {
        self.height_calls.load(Ordering::SeqCst)
    }

    pub fn message_calls(&self) -> u64 {
        self.message_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DepositClient for MockDepositClient {
    async fn get_height(&self) -> BridgeResult<u64> {
        self.height_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.height_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn fetch_deposits(
        &self,
        _address: &str,
        from_height: u64,
        to_height: u64,
    ) -> BridgeResult<Vec<ChainDeposit>> {
        self.scanned_ranges
            .lock()
            .unwrap()
            .push((from_height, to_height));
        if let Some(err) = self.deposit_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self
            .deposits
            .lock()
            .unwrap()
            .iter()
            .filter(|(height, _)| (from_height..=to_height).contains(height))
            .map(|(_, deposit)| deposit.clone())
            .collect())
    }

    async fn fetch_message(&self, id: &str) -> BridgeResult<ChainMessage> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.message_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.messages
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::TransientNetwork(format!("message {} not found", id)))
    }
}

/// Explorer index serving a fixed deposit history page by page.
#[derive(Clone, Default)]
pub struct MockDepositIndexer {
    deposits: Arc<Mutex<Vec<ChainDeposit>>>,
    page_errors: Arc<Mutex<VecDeque<BridgeError>>>,
    messages: Arc<Mutex<HashMap<String, ChainMessage>>>,
    requested_pages: Arc<Mutex<Vec<u64>>>,
    message_calls: Arc<AtomicU64>,
}

impl MockDepositIndexer {
    pub fn add_deposit(&self, deposit: ChainDeposit) {
        self.deposits.lock().unwrap().push(deposit);
    }

    pub fn add_page_error(&self, error: BridgeError) {
        self.page_errors.lock().unwrap().push_back(error);
    }

    pub fn set_message(&self, message: ChainMessage) {
        self.messages
            .lock()
            .unwrap()
            .insert(message.id.clone(), message);
    }

    pub fn requested_pages(&self) -> Vec<u64> {
        self.requested_pages.lock().unwrap().clone()
    }

    pub fn message_calls(&self) -> u64 {
        self.message_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DepositIndexer for MockDepositIndexer {
    async fn fetch_deposits_page(
        &self,
        _address: &str,
        page: u64,
        size: u64,
    ) -> BridgeResult<DepositPage> {
        self.requested_pages.lock().unwrap().push(page);
        if let Some(err) = self.page_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        let deposits = self.deposits.lock().unwrap();
        Ok(DepositPage {
            deposits: deposits
                .iter()
                .skip((page * size) as usize)
                .take(size as usize)
                .cloned()
                .collect(),
            total_count: deposits.len() as u64,
        })
    }

    async fn fetch_message(&self, id: &str) -> BridgeResult<ChainMessage> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        self.messages
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| BridgeError::TransientNetwork(format!("message {} not found", id)))
    }
}
