// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deposit discovery for gateway addresses.
//!
//! ```text
//!   ┌──────────── iteration ────────────────────────────────────┐
//!   │ height = get_height() (stale height on failure)           │
//!   │                                                           │
//!   │ indexer && (first || height - watermark > threshold)?     │
//!   │    yes ─▶ page through indexer history ──┐ failed         │
//!   │    no ──────────────────────────────────┐│                │
//!   │                                         ▼▼                │
//!   │                native scan [height - window, height]      │
//!   │                                                           │
//!   │ watermark = height                                        │
//!   └───────────── sleep(poll_interval) ◀───────────────────────┘
//! ```
//!
//! Delivery is at-least-once: the same deposit is handed out again by later
//! scans of an overlapping window, and may be reported by both sources.

use crate::chain::{ChainDeposit, DepositClient, DepositIndexer, InputPayload, LockChain};
use crate::config::WatcherConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::RenBridgeMetrics;
use crate::retry_with_max_elapsed_time;
use crate::types::{ChainTransaction, InputChainTransaction, PartialChainTransaction};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Watch state of one (asset, address) pair. Lives only as long as the watch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepositWatchCursor {
    /// Last chain height fully processed.
    pub progress_height: u64,
    /// Next indexer page while catching up.
    pub page: u64,
}

pub struct DepositWatcher {
    chain: Arc<dyn LockChain>,
    client: Arc<dyn DepositClient>,
    indexer: Option<Arc<dyn DepositIndexer>>,
    config: WatcherConfig,
    metrics: Option<Arc<RenBridgeMetrics>>,
}

impl DepositWatcher {
    pub fn new(
        chain: Arc<dyn LockChain>,
        client: Arc<dyn DepositClient>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            chain,
            client,
            indexer: None,
            config,
            metrics: None,
        }
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn DepositIndexer>) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<RenBridgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn record_error(&self, stage: &str) {
        if let Some(metrics) = &self.metrics {
            metrics
                .watcher_errors
                .with_label_values(&[self.chain.name(), stage])
                .inc();
        }
    }

    fn record_discovered(&self, source: &str, count: usize) {
        if let Some(metrics) = &self.metrics {
            metrics
                .watcher_deposits_discovered
                .with_label_values(&[self.chain.name(), source])
                .inc_by(count as u64);
        }
    }

    /// Calls `on_input` for every deposit found on `address` until `cancel`
    /// fires. Invalid arguments fail before any network call; network
    /// faults are logged and retried.
    pub async fn watch<F, Fut>(
        &self,
        asset: &str,
        from: &InputPayload,
        address: &str,
        on_input: F,
        cancel: CancellationToken,
    ) -> BridgeResult<()>
    where
        F: Fn(InputChainTransaction) -> Fut + Send + Sync,
        Fut: Future<Output = ()> + Send,
    {
        self.chain.assert_asset_is_supported(asset)?;
        self.chain.assert_payload_chain(from.chain())?;

        if let InputPayload::Transaction { tx, .. } = from {
            return self.watch_transaction(asset, tx, on_input, cancel).await;
        }

        if !self.chain.validate_address(address) {
            return Err(BridgeError::Configuration(format!(
                "invalid {} address: {}",
                self.chain.name(),
                address
            )));
        }

        info!(
            "[{}] Watching {} for {} deposits",
            self.chain.name(),
            address,
            asset
        );
        let mut cursor = DepositWatchCursor::default();
        let mut first_iteration = true;
        loop {
            if cancel.is_cancelled() {
                info!("[{}] Stopped watching {}", self.chain.name(), address);
                return Ok(());
            }

            let height = match self.client.get_height().await {
                Ok(height) => height,
                Err(e) => {
                    warn!(
                        "[{}] Failed to fetch height, using {}: {}",
                        self.chain.name(),
                        cursor.progress_height,
                        e
                    );
                    self.record_error("height");
                    cursor.progress_height
                }
            };

            let backlog = height.saturating_sub(cursor.progress_height);
            let mut fetched = false;
            if let Some(indexer) = &self.indexer {
                if first_iteration || backlog > self.config.catch_up_threshold {
                    debug!(
                        "[{}] Catching up on {} blocks for {}",
                        self.chain.name(),
                        backlog,
                        address
                    );
                    match self
                        .catch_up(indexer.as_ref(), asset, address, &mut cursor, &on_input, &cancel)
                        .await
                    {
                        Ok(()) => fetched = true,
                        Err(e) => {
                            warn!(
                                "[{}] Indexer catch-up failed, scanning natively: {}",
                                self.chain.name(),
                                e
                            );
                            self.record_error("indexer");
                        }
                    }
                }
            }
            first_iteration = false;

            let processed = fetched || self.scan(asset, address, height, &on_input).await;
            if processed {
                cursor.progress_height = height;
                if let Some(metrics) = &self.metrics {
                    metrics
                        .watcher_last_processed_height
                        .with_label_values(&[self.chain.name()])
                        .set(height as i64);
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// Pages through the indexer history of `address`. Each page is retried
    /// with a bounded backoff; an exhausted page fails the whole catch-up.
    async fn catch_up<F, Fut>(
        &self,
        indexer: &dyn DepositIndexer,
        asset: &str,
        address: &str,
        cursor: &mut DepositWatchCursor,
        on_input: &F,
        cancel: &CancellationToken,
    ) -> BridgeResult<()>
    where
        F: Fn(InputChainTransaction) -> Fut + Send + Sync,
        Fut: Future<Output = ()> + Send,
    {
        let size = self.config.page_size;
        if size == 0 {
            return Err(BridgeError::Configuration(
                "watcher page size must be greater than zero".to_string(),
            ));
        }
        cursor.page = 0;
        loop {
            let page = cursor.page;
            let result = retry_with_max_elapsed_time!(
                indexer.fetch_deposits_page(address, page, size),
                self.config.page_retry_max_elapsed,
                self.config.page_retry_interval
            )?;
            self.record_discovered("indexer", result.deposits.len());
            self.deliver(asset, &result.deposits, on_input).await;

            if size * (page + 1) >= result.total_count {
                return Ok(());
            }
            cursor.page += 1;

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.config.page_interval) => {}
            }
        }
    }

    /// Scans `[height - scan_window, height]` on the node. Returns whether
    /// the window was processed.
    async fn scan<F, Fut>(&self, asset: &str, address: &str, height: u64, on_input: &F) -> bool
    where
        F: Fn(InputChainTransaction) -> Fut + Send + Sync,
        Fut: Future<Output = ()> + Send,
    {
        let from_height = height.saturating_sub(self.config.scan_window);
        match self.client.fetch_deposits(address, from_height, height).await {
            Ok(deposits) => {
                self.record_discovered("node", deposits.len());
                self.deliver(asset, &deposits, on_input).await;
                true
            }
            Err(e) => {
                warn!(
                    "[{}] Failed to scan blocks {}..={} for {}: {}",
                    self.chain.name(),
                    from_height,
                    height,
                    address,
                    e
                );
                self.record_error("scan");
                false
            }
        }
    }

    /// Hands a batch to `on_input`. Calls for one batch run concurrently.
    async fn deliver<F, Fut>(&self, asset: &str, deposits: &[ChainDeposit], on_input: &F)
    where
        F: Fn(InputChainTransaction) -> Fut + Send + Sync,
        Fut: Future<Output = ()> + Send,
    {
        let inputs: Vec<_> = deposits
            .iter()
            .filter_map(|deposit| match self.to_input(asset, &deposit.id, &deposit.amount) {
                Ok(input) => Some(on_input(input)),
                Err(e) => {
                    warn!(
                        "[{}] Skipping deposit {}: {}",
                        self.chain.name(),
                        deposit.id,
                        e
                    );
                    self.record_error("decode");
                    None
                }
            })
            .collect();
        futures::future::join_all(inputs).await;
    }

    fn to_input(&self, asset: &str, tx_hash: &str, amount: &str) -> BridgeResult<InputChainTransaction> {
        let tx = self.chain.populate_transaction(&PartialChainTransaction {
            tx_hash: Some(tx_hash.to_string()),
            amount: Some(amount.to_string()),
            ..Default::default()
        })?;
        Ok(InputChainTransaction {
            tx,
            asset: asset.to_string(),
        })
    }

    /// A transaction named up front is resolved once and delivered, then the
    /// watch idles until cancelled.
    async fn watch_transaction<F, Fut>(
        &self,
        asset: &str,
        tx: &ChainTransaction,
        on_input: F,
        cancel: CancellationToken,
    ) -> BridgeResult<()>
    where
        F: Fn(InputChainTransaction) -> Fut + Send + Sync,
        Fut: Future<Output = ()> + Send,
    {
        let input = match &tx.amount {
            Some(_) => InputChainTransaction {
                tx: self.chain.populate_transaction(&PartialChainTransaction::from(tx))?,
                asset: asset.to_string(),
            },
            None => loop {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                let fetched = match &self.indexer {
                    Some(indexer) => indexer.fetch_message(&tx.tx_hash).await,
                    None => self.client.fetch_message(&tx.tx_hash).await,
                };
                match fetched.and_then(|message| self.to_input(asset, &message.id, &message.amount)) {
                    Ok(input) => break input,
                    Err(e) => {
                        warn!(
                            "[{}] Failed to fetch transaction {}: {}",
                            self.chain.name(),
                            tx.tx_hash,
                            e
                        );
                        self.record_error("fetch");
                    }
                }
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.config.fetch_retry_interval) => {}
                }
            },
        };
        self.record_discovered("payload", 1);
        on_input(input).await;

        cancel.cancelled().await;
        Ok(())
    }
}
