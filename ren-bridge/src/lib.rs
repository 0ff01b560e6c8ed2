// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! RenVM bridge protocol core: typed value packing, transaction identity,
//! gateway address derivation, the RenVM submit / wait state machine and
//! deposit watching for lock chains.

pub mod chain;
pub mod config;
pub mod error;
pub mod filecoin;
pub mod gateway;
pub mod metrics;
pub mod pack;
pub mod progress;
pub mod renvm;
pub mod transaction;
pub mod types;
pub mod utils;
pub mod waiter;
pub mod watcher;

#[cfg(test)]
pub mod test_utils;

/// Retries `$func` until it succeeds or `$max_elapsed_time` has passed,
/// returning the last error in that case. Every error is treated as
/// transient. Without an interval the delays grow exponentially from 400ms;
/// with one they stay (roughly) constant.
#[macro_export]
macro_rules! retry_with_max_elapsed_time {
    (@retry $backoff:expr, $func:expr) => {{
        backoff::future::retry($backoff, || {
            let fut = async {
                match $func.await {
                    Ok(value) => Ok(value),
                    Err(e) => {
                        tracing::debug!("Retrying due to error: {:?}", e);
                        Err(backoff::Error::transient(e))
                    }
                }
            };
            std::boxed::Box::pin(fut)
        })
        .await
    }};
    ($func:expr, $max_elapsed_time:expr) => {{
        // The following delay sequence (in secs) will be used, applied with jitter
        // 0.4, 0.8, 1.6, 3.2, 6.4, 12.8, 25.6, 30, 60, 120, 120 ...
        let backoff = backoff::ExponentialBackoff {
            initial_interval: std::time::Duration::from_millis(400),
            randomization_factor: 0.1,
            multiplier: 2.0,
            max_interval: std::time::Duration::from_secs(120),
            max_elapsed_time: Some($max_elapsed_time),
            ..Default::default()
        };
        $crate::retry_with_max_elapsed_time!(@retry backoff, $func)
    }};
    ($func:expr, $max_elapsed_time:expr, $interval:expr) => {{
        let interval: std::time::Duration = $interval;
        let backoff = backoff::ExponentialBackoff {
            current_interval: interval,
            initial_interval: interval,
            randomization_factor: 0.1,
            multiplier: 1.0,
            max_interval: interval,
            max_elapsed_time: Some($max_elapsed_time),
            ..Default::default()
        };
        $crate::retry_with_max_elapsed_time!(@retry backoff, $func)
    }};
}
