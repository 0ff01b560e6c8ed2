// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Confirmation tracking for a transaction already sent on a lock chain.

use crate::chain::{DepositClient, DepositIndexer, LockChain};
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::RenBridgeMetrics;
use crate::progress::{ProgressSender, ProgressSubscription, TxHandle, WaitOutcome};
use crate::types::{ChainTransaction, ChainTransactionProgress, ChainTransactionStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ChainTxWaiter {
    chain: Arc<dyn LockChain>,
    client: Arc<dyn DepositClient>,
    indexer: Option<Arc<dyn DepositIndexer>>,
    poll_interval: Duration,
    progress: ChainTransactionProgress,
    events: ProgressSender<ChainTransactionProgress>,
    metrics: Option<Arc<RenBridgeMetrics>>,
}

impl ChainTxWaiter {
    pub fn new(
        chain: Arc<dyn LockChain>,
        client: Arc<dyn DepositClient>,
        target: u64,
        poll_interval: Duration,
        channel_size: usize,
    ) -> Self {
        let progress = ChainTransactionProgress::new(
            chain.name(),
            ChainTransactionStatus::Confirming,
            target,
            None,
        );
        Self {
            chain,
            client,
            indexer: None,
            poll_interval,
            progress,
            events: ProgressSender::new(channel_size),
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

    pub fn progress(&self) -> &ChainTransactionProgress {
        &self.progress
    }

    pub fn subscribe(&self) -> ProgressSubscription<ChainTransactionProgress> {
        self.events.subscribe()
    }

    /// Starts tracking `transaction`. A different transaction replacing the
    /// tracked one (e.g. a sped up resend) is recorded in `replaced`.
    pub fn set_transaction(&mut self, transaction: ChainTransaction) {
        match &self.progress.transaction {
            Some(current) if current.tx_hash != transaction.tx_hash => {
                info!(
                    "[{}] Transaction {} replaced by {}",
                    self.chain.name(),
                    current.tx_hash,
                    transaction.tx_hash
                );
                self.progress.replace_transaction(transaction);
            }
            _ => self.progress.transaction = Some(transaction),
        }
        self.events.send(self.progress.clone());
    }

    /// Node first, then the indexer when the node does not know the message.
    async fn confirmations(&self, tx_hash: &str) -> BridgeResult<u64> {
        match self.client.fetch_message(tx_hash).await {
            Ok(message) => Ok(message.confirmations),
            Err(e) => match &self.indexer {
                Some(indexer) => {
                    debug!(
                        "[{}] Node lookup of {} failed, asking the indexer: {}",
                        self.chain.name(),
                        tx_hash,
                        e
                    );
                    Ok(indexer.fetch_message(tx_hash).await?.confirmations)
                }
                None => Err(e),
            },
        }
    }

    /// Polls until the transaction has `target` confirmations, publishing
    /// progress every time the count goes up.
    pub async fn wait(
        &mut self,
        cancel: &CancellationToken,
        target_override: Option<u64>,
    ) -> BridgeResult<WaitOutcome<ChainTransactionProgress>> {
        let tx_hash = match &self.progress.transaction {
            Some(tx) => tx.tx_hash.clone(),
            None => {
                return Err(BridgeError::Configuration(format!(
                    "[{}] no transaction to wait for, call set_transaction first",
                    self.chain.name()
                )))
            }
        };
        if let Some(target) = target_override {
            self.progress.target = target;
        }
        if self.progress.status == ChainTransactionStatus::Done {
            return Ok(WaitOutcome::Finished(self.progress.clone()));
        }

        loop {
            if cancel.is_cancelled() {
                return Ok(WaitOutcome::Cancelled(self.progress.clone()));
            }
            match self.confirmations(&tx_hash).await {
                Ok(confirmations) => {
                    if let Some(metrics) = &self.metrics {
                        metrics
                            .waiter_confirmations
                            .with_label_values(&[self.chain.name()])
                            .set(confirmations as i64);
                    }
                    let increased = self.progress.observe_confirmations(confirmations);
                    if confirmations >= self.progress.target {
                        info!(
                            "[{}] Transaction {} reached {}/{} confirmations",
                            self.chain.name(),
                            tx_hash,
                            confirmations,
                            self.progress.target
                        );
                        self.progress.advance(ChainTransactionStatus::Done)?;
                        self.events.send(self.progress.clone());
                        return Ok(WaitOutcome::Finished(self.progress.clone()));
                    }
                    if increased {
                        debug!(
                            "[{}] Transaction {} has {}/{} confirmations",
                            self.chain.name(),
                            tx_hash,
                            confirmations,
                            self.progress.target
                        );
                        self.events.send(self.progress.clone());
                    }
                }
                Err(e) => {
                    warn!(
                        "[{}] Failed to fetch confirmations of {}: {}",
                        self.chain.name(),
                        tx_hash,
                        e
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics
                            .watcher_errors
                            .with_label_values(&[self.chain.name(), "confirmations"])
                            .inc();
                    }
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    pub fn spawn(
        mut self,
        cancel: CancellationToken,
        target_override: Option<u64>,
    ) -> TxHandle<ChainTransactionProgress, WaitOutcome<ChainTransactionProgress>> {
        let events = self.subscribe();
        let result = tokio::spawn(async move { self.wait(&cancel, target_override).await });
        TxHandle::new(events, result)
    }
}
