// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_vec_with_registry, HistogramVec,
    IntCounter, IntCounterVec, IntGaugeVec, Registry,
};

const RPC_LATENCY_SEC_BUCKETS: &[f64] = &[
    0.01, 0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 5.0, 7.5, 10., 15., 20., 30., 60.,
];

#[derive(Clone, Debug)]
pub struct RenBridgeMetrics {
    pub(crate) renvm_rpc_queries: IntCounterVec,
    pub(crate) renvm_rpc_queries_latency: HistogramVec,
    pub(crate) renvm_rpc_errors: IntCounterVec,

    pub(crate) renvm_submit_attempts: IntCounter,
    pub(crate) renvm_submit_failures: IntCounter,
    pub(crate) renvm_query_errors: IntCounterVec,
    pub(crate) renvm_finished_transactions: IntCounterVec,

    pub(crate) watcher_deposits_discovered: IntCounterVec,
    pub(crate) watcher_last_processed_height: IntGaugeVec,
    pub(crate) watcher_errors: IntCounterVec,

    pub(crate) waiter_confirmations: IntGaugeVec,
}

impl RenBridgeMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            renvm_rpc_queries: register_int_counter_vec_with_registry!(
                "ren_bridge_renvm_rpc_queries",
                "Total number of RenVM JSON-RPC calls, by method",
                &["method"],
                registry,
            )?,
            renvm_rpc_queries_latency: register_histogram_vec_with_registry!(
                "ren_bridge_renvm_rpc_queries_latency",
                "Latency of RenVM JSON-RPC calls, by method",
                &["method"],
                RPC_LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )?,
            renvm_rpc_errors: register_int_counter_vec_with_registry!(
                "ren_bridge_renvm_rpc_errors",
                "Total number of failed RenVM JSON-RPC calls, by method and error type",
                &["method", "type"],
                registry,
            )?,
            renvm_submit_attempts: register_int_counter_with_registry!(
                "ren_bridge_renvm_submit_attempts",
                "Total number of ren_submitTx attempts",
                registry,
            )?,
            renvm_submit_failures: register_int_counter_with_registry!(
                "ren_bridge_renvm_submit_failures",
                "Total number of submissions that exhausted every attempt",
                registry,
            )?,
            renvm_query_errors: register_int_counter_vec_with_registry!(
                "ren_bridge_renvm_query_errors",
                "Total number of ren_queryTx errors while waiting, by error type",
                &["type"],
                registry,
            )?,
            renvm_finished_transactions: register_int_counter_vec_with_registry!(
                "ren_bridge_renvm_finished_transactions",
                "Total number of RenVM transactions that reached a final status",
                &["status"],
                registry,
            )?,
            watcher_deposits_discovered: register_int_counter_vec_with_registry!(
                "ren_bridge_watcher_deposits_discovered",
                "Total number of deposits handed to callers, by chain and source",
                &["chain", "source"],
                registry,
            )?,
            watcher_last_processed_height: register_int_gauge_vec_with_registry!(
                "ren_bridge_watcher_last_processed_height",
                "Last chain height fully processed by a deposit watcher",
                &["chain"],
                registry,
            )?,
            watcher_errors: register_int_counter_vec_with_registry!(
                "ren_bridge_watcher_errors",
                "Total number of deposit watcher errors, by chain and stage",
                &["chain", "stage"],
                registry,
            )?,
            waiter_confirmations: register_int_gauge_vec_with_registry!(
                "ren_bridge_waiter_confirmations",
                "Latest confirmation count seen by a transaction waiter",
                &["chain"],
                registry,
            )?,
        })
    }

    #[cfg(test)]
    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry).unwrap()
    }
}
