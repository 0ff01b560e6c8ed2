// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Submit / wait state machine for one RenVM transaction.
//!
//! ```text
//!            submit()                  wait()
//!   Ready ─────────────▶ Confirming ─────────────▶ Done
//!                             │
//!                             └── out.revert ────▶ Reverted
//! ```
//!
//! `submit` tries `ren_submitTx` a bounded number of times and treats a
//! successful `ren_queryTx` of the same hash as an earlier submission that
//! went through. `wait` polls `ren_queryTx` until RenVM reports a final
//! status, publishing a snapshot whenever the reported status changes.

use super::{QueryTxResponse, RenVmProvider, TxStatus, RENVM_CHAIN};
use crate::config::SubmitterConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::metrics::RenBridgeMetrics;
use crate::pack::TypedPackValue;
use crate::progress::{ProgressSender, ProgressSubscription, TxHandle, WaitOutcome};
use crate::transaction::{CrossChainInput, RenVmTransaction};
use crate::types::{ChainTransaction, ChainTransactionProgress, ChainTransactionStatus};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Invoked once RenVM reports a transaction as done, before the progress
/// moves to `Done`. Typically fetches the mint signature.
pub type SignatureCallback =
    Arc<dyn Fn(QueryTxResponse) -> BoxFuture<'static, BridgeResult<()>> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenVmProgress {
    #[serde(flatten)]
    pub progress: ChainTransactionProgress,
    /// Latest `ren_queryTx` result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<QueryTxResponse>,
}

impl RenVmProgress {
    pub fn status(&self) -> ChainTransactionStatus {
        self.progress.status
    }
}

pub struct RenVmTxSubmitter {
    provider: Arc<dyn RenVmProvider>,
    tx: RenVmTransaction,
    config: SubmitterConfig,
    progress: RenVmProgress,
    events: ProgressSender<RenVmProgress>,
    signature_callback: Option<SignatureCallback>,
    metrics: Option<Arc<RenBridgeMetrics>>,
}

impl RenVmTxSubmitter {
    /// Computes the transaction hash up front, so an input that cannot be
    /// encoded fails here rather than on the first submission.
    pub fn new(
        provider: Arc<dyn RenVmProvider>,
        selector: &str,
        input: TypedPackValue,
        config: SubmitterConfig,
    ) -> BridgeResult<Self> {
        let tx = RenVmTransaction::new(&config.version, selector, input)?;
        let transaction = ChainTransaction {
            chain: RENVM_CHAIN.to_string(),
            txid: tx.hash.clone(),
            tx_hash: tx.hash.clone(),
            txindex: "0".to_string(),
            amount: None,
            explorer_link: None,
        };
        let progress = RenVmProgress {
            progress: ChainTransactionProgress::new(
                RENVM_CHAIN,
                ChainTransactionStatus::Ready,
                1,
                Some(transaction),
            ),
            response: None,
        };
        Ok(Self {
            provider,
            events: ProgressSender::new(config.progress_channel_size),
            tx,
            config,
            progress,
            signature_callback: None,
            metrics: None,
        })
    }

    pub fn cross_chain(
        provider: Arc<dyn RenVmProvider>,
        selector: &str,
        input: &CrossChainInput,
        config: SubmitterConfig,
    ) -> BridgeResult<Self> {
        Self::new(provider, selector, input.to_typed_pack_value()?, config)
    }

    pub fn with_signature_callback(mut self, callback: SignatureCallback) -> Self {
        self.signature_callback = Some(callback);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<RenBridgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn hash(&self) -> &str {
        &self.tx.hash
    }

    pub fn tx(&self) -> &RenVmTransaction {
        &self.tx
    }

    pub fn progress(&self) -> &RenVmProgress {
        &self.progress
    }

    pub fn subscribe(&self) -> ProgressSubscription<RenVmProgress> {
        self.events.subscribe()
    }

    fn emit(&self) {
        self.events.send(self.progress.clone());
    }

    fn record_finished(&self, status: ChainTransactionStatus) {
        if let Some(metrics) = &self.metrics {
            metrics
                .renvm_finished_transactions
                .with_label_values(&[&status.to_string()])
                .inc();
        }
    }

    /// No-op once the transaction has left `Ready`.
    pub async fn submit(&mut self) -> BridgeResult<RenVmProgress> {
        if self.progress.status() != ChainTransactionStatus::Ready {
            return Ok(self.progress.clone());
        }
        let attempts = self.config.submit_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            if let Some(metrics) = &self.metrics {
                metrics.renvm_submit_attempts.inc();
            }
            let submit_err = match self.provider.submit_tx(&self.tx).await {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => e,
            };
            match self.provider.query_tx(&self.tx.hash).await {
                Ok(_) => {
                    info!(
                        "[RenVM] Transaction {} already known to RenVM, submit error ignored: {}",
                        self.tx.hash, submit_err
                    );
                    last_error = None;
                    break;
                }
                Err(query_err) => {
                    debug!("[RenVM] Lookup of {} failed: {}", self.tx.hash, query_err);
                }
            }
            warn!(
                "[RenVM] Failed to submit {} (attempt {}/{}): {}",
                self.tx.hash, attempt, attempts, submit_err
            );
            last_error = Some(submit_err);
            if attempt < attempts {
                tokio::time::sleep(self.config.submit_retry_interval).await;
            }
        }
        if let Some(err) = last_error {
            if let Some(metrics) = &self.metrics {
                metrics.renvm_submit_failures.inc();
            }
            error!(
                "[RenVM] Giving up on {} after {} attempts: {}",
                self.tx.hash, attempts, err
            );
            return Err(err);
        }

        info!("[RenVM] Submitted {} ({})", self.tx.hash, self.tx.selector);
        self.progress
            .progress
            .advance(ChainTransactionStatus::Confirming)?;
        self.emit();
        Ok(self.progress.clone())
    }

    /// Polls RenVM until the transaction is done or reverted. A revert ends
    /// the wait with `ProtocolRevert`; cancellation ends it with
    /// `WaitOutcome::Cancelled`.
    pub async fn wait(
        &mut self,
        cancel: &CancellationToken,
    ) -> BridgeResult<WaitOutcome<RenVmProgress>> {
        match self.progress.status() {
            ChainTransactionStatus::Done => {
                return Ok(WaitOutcome::Finished(self.progress.clone()));
            }
            ChainTransactionStatus::Reverted => {
                return Err(BridgeError::ProtocolRevert {
                    hash: self.tx.hash.clone(),
                    reason: self.progress.progress.revert_reason.clone().unwrap_or_default(),
                });
            }
            _ => {}
        }

        let response = loop {
            if cancel.is_cancelled() {
                info!("[RenVM] Stopped waiting for {}", self.tx.hash);
                return Ok(WaitOutcome::Cancelled(self.progress.clone()));
            }
            match self.provider.query_tx(&self.tx.hash).await {
                Ok(response) if response.tx_status.is_final() => break response,
                Ok(response) => {
                    let changed = self
                        .progress
                        .response
                        .as_ref()
                        .map_or(true, |previous| previous.tx_status != response.tx_status);
                    if changed {
                        debug!(
                            "[RenVM] Transaction {} is {:?}",
                            self.tx.hash, response.tx_status
                        );
                        self.progress
                            .progress
                            .advance(ChainTransactionStatus::Confirming)?;
                        self.progress.response = Some(response);
                        self.emit();
                    }
                }
                Err(e) => {
                    let kind = if e.is_not_found() {
                        debug!("[RenVM] Transaction {} not found yet", self.tx.hash);
                        "not_found"
                    } else {
                        warn!("[RenVM] Error querying {}: {}", self.tx.hash, e);
                        e.error_type()
                    };
                    if let Some(metrics) = &self.metrics {
                        metrics.renvm_query_errors.with_label_values(&[kind]).inc();
                    }
                }
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[RenVM] Stopped waiting for {}", self.tx.hash);
                    return Ok(WaitOutcome::Cancelled(self.progress.clone()));
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        };

        let revert_reason = response.revert_reason().or_else(|| {
            (response.tx_status == TxStatus::Reverted).then(|| "reverted".to_string())
        });
        if let Some(reason) = revert_reason {
            error!("[RenVM] Transaction {} reverted: {}", self.tx.hash, reason);
            self.progress.progress.revert(reason.clone())?;
            self.progress.response = Some(response);
            self.emit();
            self.record_finished(ChainTransactionStatus::Reverted);
            return Err(BridgeError::ProtocolRevert {
                hash: self.tx.hash.clone(),
                reason,
            });
        }

        if let Some(callback) = &self.signature_callback {
            callback(response.clone()).await?;
        }

        info!("[RenVM] Transaction {} done", self.tx.hash);
        self.progress
            .progress
            .advance(ChainTransactionStatus::Done)?;
        self.progress.response = Some(response);
        self.emit();
        self.record_finished(ChainTransactionStatus::Done);
        Ok(WaitOutcome::Finished(self.progress.clone()))
    }

    /// Runs `submit` on a task. The handle resolves with the submitter so
    /// the caller can go on with `wait` or `spawn_wait`.
    pub fn spawn_submit(mut self) -> TxHandle<RenVmProgress, Self> {
        let events = self.subscribe();
        let result = tokio::spawn(async move {
            self.submit().await?;
            Ok(self)
        });
        TxHandle::new(events, result)
    }

    pub fn spawn_wait(
        mut self,
        cancel: CancellationToken,
    ) -> TxHandle<RenVmProgress, WaitOutcome<RenVmProgress>> {
        let events = self.subscribe();
        let result = tokio::spawn(async move { self.wait(&cancel).await });
        TxHandle::new(events, result)
    }

    /// Runs `submit` then `wait` on a task. The handle streams every progress
    /// snapshot and resolves with the final one.
    pub fn spawn(
        mut self,
        cancel: CancellationToken,
    ) -> TxHandle<RenVmProgress, WaitOutcome<RenVmProgress>> {
        let events = self.subscribe();
        let result = tokio::spawn(async move {
            self.submit().await?;
            self.wait(&cancel).await
        });
        TxHandle::new(events, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{not_found, query_response, sample_cross_chain_input, MockRenVmProvider};
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    const SELECTOR: &str = "FIL/toEthereum";

    fn test_config() -> SubmitterConfig {
        SubmitterConfig {
            submit_retry_interval: Duration::from_millis(1),
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        }
    }

    fn submitter(provider: &MockRenVmProvider) -> RenVmTxSubmitter {
        RenVmTxSubmitter::cross_chain(
            Arc::new(provider.clone()),
            SELECTOR,
            &sample_cross_chain_input(),
            test_config(),
        )
        .unwrap()
    }

    fn statuses(events: &[RenVmProgress]) -> Vec<ChainTransactionStatus> {
        events.iter().map(|p| p.status()).collect()
    }

    #[tokio::test]
    async fn test_submit_moves_to_confirming() {
        let provider = MockRenVmProvider::default();
        let mut submitter = submitter(&provider);
        let mut events = submitter.subscribe();
        assert_eq!(submitter.progress().status(), ChainTransactionStatus::Ready);
        let tx = submitter.progress().progress.transaction.clone().unwrap();
        assert_eq!(tx.chain, "RenVM");
        assert_eq!(tx.txid, submitter.hash());

        let progress = submitter.submit().await.unwrap();
        assert_eq!(progress.status(), ChainTransactionStatus::Confirming);
        assert_eq!(provider.submit_calls(), 1);
        assert_eq!(provider.query_calls(), 0);
        assert_eq!(provider.submitted()[0].hash, submitter.hash());
        assert_eq!(statuses(&events.drain()), vec![ChainTransactionStatus::Confirming]);

        // Submitting twice does not hit the network again.
        submitter.submit().await.unwrap();
        assert_eq!(provider.submit_calls(), 1);
    }

    #[tokio::test]
    async fn test_submit_error_ignored_when_tx_already_known() {
        let provider = MockRenVmProvider::default();
        provider.add_submit_response(Err(BridgeError::TransientNetwork("timeout".into())));
        provider.add_query_response(Ok(query_response("h", TxStatus::Pending, None)));
        let mut submitter = submitter(&provider);

        let progress = submitter.submit().await.unwrap();
        assert_eq!(progress.status(), ChainTransactionStatus::Confirming);
        assert_eq!(provider.submit_calls(), 1);
        assert_eq!(provider.query_calls(), 1);
    }

    #[tokio::test]
    async fn test_submit_raises_last_error_after_all_attempts() {
        let provider = MockRenVmProvider::default();
        for i in 0..3 {
            provider.add_submit_response(Err(BridgeError::TransientNetwork(format!("attempt {}", i))));
        }
        let last = BridgeError::Rpc {
            code: -32600,
            message: "invalid tx".into(),
        };
        provider.set_wildcard_submit_response(Err(last.clone()));
        let metrics = Arc::new(RenBridgeMetrics::new_for_testing());
        let mut submitter = submitter(&provider).with_metrics(metrics.clone());
        let mut events = submitter.subscribe();

        let err = submitter.submit().await.unwrap_err();
        assert_eq!(err, last);
        assert_eq!(provider.submit_calls(), 4);
        assert_eq!(provider.query_calls(), 4);
        assert_eq!(submitter.progress().status(), ChainTransactionStatus::Ready);
        assert!(events.drain().is_empty());
        assert_eq!(metrics.renvm_submit_attempts.get(), 4);
        assert_eq!(metrics.renvm_submit_failures.get(), 1);
    }

    #[tokio::test]
    async fn test_submit_retry_succeeds_later() {
        let provider = MockRenVmProvider::default();
        provider.add_submit_response(Err(BridgeError::TransientNetwork("reset".into())));
        let mut submitter = submitter(&provider);
        submitter.submit().await.unwrap();
        assert_eq!(provider.submit_calls(), 2);
        // every submission carries the same hash
        let submitted = provider.submitted();
        assert_eq!(submitted[0], submitted[1]);
    }

    #[tokio::test]
    async fn test_wait_emits_on_status_change_then_done() {
        let provider = MockRenVmProvider::default();
        provider.add_query_response(Err(not_found("h")));
        provider.add_query_response(Err(BridgeError::TransientNetwork("timeout".into())));
        provider.add_query_response(Ok(query_response("h", TxStatus::Pending, None)));
        provider.add_query_response(Ok(query_response("h", TxStatus::Pending, None)));
        provider.add_query_response(Ok(query_response("h", TxStatus::Executing, None)));
        provider.add_query_response(Ok(query_response(
            "h",
            TxStatus::Done,
            Some(json!({"revert": ""})),
        )));

        let callback_calls = Arc::new(AtomicU64::new(0));
        let calls = callback_calls.clone();
        let callback: SignatureCallback = Arc::new(move |response: QueryTxResponse| {
            let calls = calls.clone();
            async move {
                assert_eq!(response.tx_status, TxStatus::Done);
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BridgeError>(())
            }
            .boxed()
        });
        let metrics = Arc::new(RenBridgeMetrics::new_for_testing());
        let mut submitter = submitter(&provider)
            .with_signature_callback(callback)
            .with_metrics(metrics.clone());
        let mut events = submitter.subscribe();

        submitter.submit().await.unwrap();
        let outcome = submitter.wait(&CancellationToken::new()).await.unwrap();
        assert!(!outcome.is_cancelled());
        let progress = outcome.into_progress();
        assert_eq!(progress.status(), ChainTransactionStatus::Done);
        assert_eq!(progress.response.unwrap().tx_status, TxStatus::Done);
        assert_eq!(callback_calls.load(Ordering::SeqCst), 1);

        let events = events.drain();
        assert_eq!(
            statuses(&events),
            vec![
                ChainTransactionStatus::Confirming,
                ChainTransactionStatus::Confirming,
                ChainTransactionStatus::Confirming,
                ChainTransactionStatus::Done,
            ]
        );
        let reported: Vec<_> = events
            .iter()
            .filter_map(|p| p.response.as_ref().map(|r| r.tx_status))
            .collect();
        assert_eq!(
            reported,
            vec![TxStatus::Pending, TxStatus::Executing, TxStatus::Done]
        );
        assert_eq!(
            metrics.renvm_query_errors.with_label_values(&["not_found"]).get(),
            1
        );
        assert_eq!(
            metrics
                .renvm_query_errors
                .with_label_values(&["transient_network"])
                .get(),
            1
        );
        assert_eq!(
            metrics
                .renvm_finished_transactions
                .with_label_values(&["done"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn test_revert_never_reaches_done() {
        let provider = MockRenVmProvider::default();
        provider.set_wildcard_query_response(Ok(query_response(
            "h",
            TxStatus::Done,
            Some(json!({"revert": "insufficient funds"})),
        )));
        let callback_calls = Arc::new(AtomicU64::new(0));
        let calls = callback_calls.clone();
        let callback: SignatureCallback = Arc::new(move |_: QueryTxResponse| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, BridgeError>(()) }.boxed()
        });
        let mut submitter = submitter(&provider).with_signature_callback(callback);
        let mut events = submitter.subscribe();

        submitter.submit().await.unwrap();
        let err = submitter.wait(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(
            err,
            BridgeError::ProtocolRevert {
                hash: submitter.hash().to_string(),
                reason: "insufficient funds".to_string(),
            }
        );
        assert_eq!(submitter.progress().status(), ChainTransactionStatus::Reverted);
        assert_eq!(
            submitter.progress().progress.revert_reason.as_deref(),
            Some("insufficient funds")
        );

        let events = events.drain();
        assert_eq!(
            statuses(&events),
            vec![
                ChainTransactionStatus::Confirming,
                ChainTransactionStatus::Reverted
            ]
        );
        assert!(!statuses(&events).contains(&ChainTransactionStatus::Done));
        assert_eq!(callback_calls.load(Ordering::SeqCst), 0);

        // Waiting again reports the same revert without polling.
        let calls = provider.query_calls();
        assert!(submitter.wait(&CancellationToken::new()).await.is_err());
        assert_eq!(provider.query_calls(), calls);
    }

    #[tokio::test]
    async fn test_reverted_status_without_reason() {
        let provider = MockRenVmProvider::default();
        provider.set_wildcard_query_response(Ok(query_response("h", TxStatus::Reverted, None)));
        let mut submitter = submitter(&provider);
        submitter.submit().await.unwrap();
        let err = submitter.wait(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.error_type(), "protocol_revert");
        assert_eq!(submitter.progress().status(), ChainTransactionStatus::Reverted);
    }

    #[tokio::test]
    async fn test_callback_failure_fails_wait() {
        let provider = MockRenVmProvider::default();
        provider.set_wildcard_query_response(Ok(query_response("h", TxStatus::Done, None)));
        let callback: SignatureCallback = Arc::new(|_: QueryTxResponse| {
            async { Err::<(), _>(BridgeError::Callback("no signature yet".into())) }.boxed()
        });
        let mut submitter = submitter(&provider).with_signature_callback(callback);
        submitter.submit().await.unwrap();

        let err = submitter.wait(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, BridgeError::Callback("no signature yet".into()));
        assert_eq!(submitter.progress().status(), ChainTransactionStatus::Confirming);
    }

    #[tokio::test]
    async fn test_cancelled_wait_is_not_an_error() {
        let provider = MockRenVmProvider::default();
        provider.set_wildcard_query_response(Ok(query_response("h", TxStatus::Pending, None)));
        let mut submitter = submitter(&provider);
        submitter.submit().await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = submitter.wait(&cancel).await.unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(provider.query_calls(), 0);
        assert_eq!(outcome.progress().status(), ChainTransactionStatus::Confirming);
    }

    #[tokio::test]
    async fn test_spawned_submitter_streams_progress_until_cancelled() {
        let provider = MockRenVmProvider::default();
        provider.set_wildcard_query_response(Ok(query_response("h", TxStatus::Executing, None)));
        let config = SubmitterConfig {
            poll_interval: Duration::from_secs(3600),
            ..test_config()
        };
        let submitter = RenVmTxSubmitter::cross_chain(
            Arc::new(provider.clone()),
            SELECTOR,
            &sample_cross_chain_input(),
            config,
        )
        .unwrap();
        let cancel = CancellationToken::new();
        let mut handle = submitter.spawn(cancel.clone());

        let first = handle.next_progress().await.unwrap();
        assert!(first.response.is_none());
        let second = handle.next_progress().await.unwrap();
        assert_eq!(second.response.unwrap().tx_status, TxStatus::Executing);

        // the task is now sleeping between polls
        cancel.cancel();
        let outcome = handle.outcome().await.unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(provider.query_calls(), 1);
    }

    #[tokio::test]
    async fn test_spawned_submitter_resolves_with_done() {
        let provider = MockRenVmProvider::default();
        provider.add_query_response(Ok(query_response("h", TxStatus::Confirming, None)));
        provider.set_wildcard_query_response(Ok(query_response("h", TxStatus::Done, None)));
        let handle = submitter(&provider).spawn(CancellationToken::new());
        let (mut events, result) = handle.into_parts();

        let outcome = result.await.unwrap().unwrap();
        assert_eq!(outcome.progress().status(), ChainTransactionStatus::Done);

        let mut seen = vec![];
        while let Some(progress) = events.recv().await {
            seen.push(progress.status());
        }
        assert_eq!(seen.last(), Some(&ChainTransactionStatus::Done));
        assert!(seen.windows(2).all(|w| w[0].can_advance_to(w[1])));
    }

    #[tokio::test]
    async fn test_submit_and_wait_spawned_separately() {
        let provider = MockRenVmProvider::default();
        provider.set_wildcard_query_response(Ok(query_response("h", TxStatus::Done, None)));

        let mut submit = submitter(&provider).spawn_submit();
        let submitted = submit.next_progress().await.unwrap();
        assert_eq!(submitted.status(), ChainTransactionStatus::Confirming);
        let submitter = submit.outcome().await.unwrap();
        assert_eq!(provider.submit_calls(), 1);
        assert_eq!(provider.query_calls(), 0);

        let mut wait = submitter.spawn_wait(CancellationToken::new());
        let done = wait.next_progress().await.unwrap();
        assert_eq!(done.status(), ChainTransactionStatus::Done);
        let outcome = wait.outcome().await.unwrap();
        assert!(!outcome.is_cancelled());
        assert_eq!(outcome.progress().status(), ChainTransactionStatus::Done);
    }

    #[tokio::test]
    async fn test_spawned_submit_failure_resolves_with_error() {
        let provider = MockRenVmProvider::default();
        provider.set_wildcard_submit_response(Err(BridgeError::TransientNetwork("down".into())));
        let handle = submitter(&provider).spawn_submit();
        let err = handle.outcome().await.err().unwrap();
        assert_eq!(err.error_type(), "transient_network");
        assert_eq!(provider.submit_calls(), 4);
    }

    #[test]
    fn test_bad_input_rejected_at_construction() {
        let mut input = sample_cross_chain_input();
        input.phash = vec![0u8; 31];
        let err = RenVmTxSubmitter::cross_chain(
            Arc::new(MockRenVmProvider::default()),
            SELECTOR,
            &input,
            test_config(),
        )
        .err()
        .unwrap();
        assert_eq!(err.error_type(), "encoding");
        assert!(err.to_string().contains("phash"));
    }

    #[test]
    fn test_progress_json_flattens() {
        let provider = MockRenVmProvider::default();
        let submitter = submitter(&provider);
        let json = serde_json::to_value(submitter.progress()).unwrap();
        assert_eq!(json["chain"], "RenVM");
        assert_eq!(json["status"], "ready");
        assert_eq!(json["target"], 1);
        assert_eq!(json["transaction"]["txid"], submitter.hash());
        assert!(json.get("response").is_none());
    }
}
