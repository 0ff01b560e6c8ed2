// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Progress streams for long running submit / wait operations.
//!
//! An operation publishes every progress snapshot on a broadcast channel and
//! resolves a single result when it ends:
//!
//! ```text
//!   ┌───────────┐  progress   ┌──────────────────────┐
//!   │ submitter │ ──────────▶ │ ProgressSubscription │ (any number)
//!   │  / waiter │             └──────────────────────┘
//!   │           │  result     ┌──────────────────────┐
//!   │           │ ──────────▶ │ JoinHandle           │ (exactly one)
//!   └───────────┘             └──────────────────────┘
//! ```
//!
//! [`TxHandle`] bundles the two for spawned operations.

use crate::error::{BridgeError, BridgeResult};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::warn;

/// How a cancellable wait ended. Cancellation is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<P> {
    Finished(P),
    Cancelled(P),
}

impl<P> WaitOutcome<P> {
    pub fn progress(&self) -> &P {
        match self {
            WaitOutcome::Finished(p) | WaitOutcome::Cancelled(p) => p,
        }
    }

    pub fn into_progress(self) -> P {
        match self {
            WaitOutcome::Finished(p) | WaitOutcome::Cancelled(p) => p,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WaitOutcome::Cancelled(_))
    }
}

/// Publishing side, owned by the operation.
#[derive(Debug)]
pub struct ProgressSender<P> {
    tx: broadcast::Sender<P>,
}

impl<P: Clone> ProgressSender<P> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Having no subscribers is fine.
    pub fn send(&self, progress: P) {
        let _ = self.tx.send(progress);
    }

    pub fn subscribe(&self) -> ProgressSubscription<P> {
        ProgressSubscription {
            rx: self.tx.subscribe(),
        }
    }
}

pub struct ProgressSubscription<P> {
    rx: broadcast::Receiver<P>,
}

impl<P: Clone> ProgressSubscription<P> {
    /// Next snapshot, or `None` once the operation has finished and every
    /// buffered snapshot was read. A subscriber that falls behind skips the
    /// oldest snapshots.
    pub async fn recv(&mut self) -> Option<P> {
        loop {
            match self.rx.recv().await {
                Ok(progress) => return Some(progress),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Progress subscriber lagged, skipped {} updates", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Drains every snapshot already published without waiting.
    pub fn drain(&mut self) -> Vec<P> {
        let mut out = vec![];
        loop {
            match self.rx.try_recv() {
                Ok(progress) => out.push(progress),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return out,
            }
        }
    }
}

/// A spawned operation: live progress plus its final result.
pub struct TxHandle<P, T> {
    events: ProgressSubscription<P>,
    result: JoinHandle<BridgeResult<T>>,
}

impl<P: Clone, T> TxHandle<P, T> {
    pub fn new(events: ProgressSubscription<P>, result: JoinHandle<BridgeResult<T>>) -> Self {
        Self { events, result }
    }

    pub async fn next_progress(&mut self) -> Option<P> {
        self.events.recv().await
    }

    pub async fn outcome(self) -> BridgeResult<T> {
        self.result
            .await
            .map_err(|e| BridgeError::Internal(format!("operation task failed: {}", e)))?
    }

    pub fn into_parts(self) -> (ProgressSubscription<P>, JoinHandle<BridgeResult<T>>) {
        (self.events, self.result)
    }
}
