// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{BridgeError, BridgeResult};
use crate::filecoin::FilecoinNetworkConfig;
use ren_bridge_config::Config;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenNetwork {
    Mainnet,
    Testnet,
    Devnet,
}

impl RenNetwork {
    /// Devnet has no public endpoint.
    pub fn default_rpc_url(&self) -> Option<&'static str> {
        match self {
            RenNetwork::Mainnet => Some("https://rpc.renproject.io"),
            RenNetwork::Testnet => Some("https://rpc-testnet.renproject.io"),
            RenNetwork::Devnet => None,
        }
    }

    pub fn filecoin(&self) -> FilecoinNetworkConfig {
        match self {
            RenNetwork::Mainnet => FilecoinNetworkConfig::mainnet(),
            RenNetwork::Testnet | RenNetwork::Devnet => FilecoinNetworkConfig::testnet(),
        }
    }
}

impl fmt::Display for RenNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RenNetwork::Mainnet => "mainnet",
            RenNetwork::Testnet => "testnet",
            RenNetwork::Devnet => "devnet",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RenNetwork {
    type Err = BridgeError;

    fn from_str(s: &str) -> BridgeResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(RenNetwork::Mainnet),
            "testnet" => Ok(RenNetwork::Testnet),
            "devnet" => Ok(RenNetwork::Devnet),
            other => Err(BridgeError::Configuration(format!(
                "invalid RenVM network {}",
                other
            ))),
        }
    }
}

/// Settings of the RenVM submit / wait state machine.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubmitterConfig {
    /// Each attempt is a submit followed, on failure, by a lookup of the hash
    #[serde(default = "default_submit_attempts")]
    pub submit_attempts: u32,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_submit_retry_interval")]
    pub submit_retry_interval: Duration,

    /// Interval between ren_queryTx polls while waiting
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_submitter_poll_interval")]
    pub poll_interval: Duration,

    #[serde(default = "default_progress_channel_size")]
    pub progress_channel_size: usize,

    /// Transaction version hashed into the id
    #[serde(default = "default_tx_version")]
    pub version: String,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            submit_attempts: default_submit_attempts(),
            submit_retry_interval: default_submit_retry_interval(),
            poll_interval: default_submitter_poll_interval(),
            progress_channel_size: default_progress_channel_size(),
            version: default_tx_version(),
        }
    }
}

fn default_submit_attempts() -> u32 {
    4
}

fn default_submit_retry_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_submitter_poll_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_progress_channel_size() -> usize {
    64
}

fn default_tx_version() -> String {
    crate::transaction::RENVM_TX_VERSION.to_string()
}

/// Settings of the deposit watcher and the confirmation waiter.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WatcherConfig {
    /// Sleep between two watch iterations
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_watcher_poll_interval")]
    pub poll_interval: Duration,

    /// Backlog (in blocks) above which the indexer is used to catch up
    #[serde(default = "default_catch_up_threshold")]
    pub catch_up_threshold: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Blocks below the head scanned natively each iteration
    #[serde(default = "default_scan_window")]
    pub scan_window: u64,

    /// Sleep between two indexer pages
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_page_interval")]
    pub page_interval: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_page_retry_max_elapsed")]
    pub page_retry_max_elapsed: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_page_retry_interval")]
    pub page_retry_interval: Duration,

    /// Sleep between failed lookups of a known transaction
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_fetch_retry_interval")]
    pub fetch_retry_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_watcher_poll_interval(),
            catch_up_threshold: default_catch_up_threshold(),
            page_size: default_page_size(),
            scan_window: default_scan_window(),
            page_interval: default_page_interval(),
            page_retry_max_elapsed: default_page_retry_max_elapsed(),
            page_retry_interval: default_page_retry_interval(),
            fetch_retry_interval: default_fetch_retry_interval(),
        }
    }
}

fn default_watcher_poll_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_catch_up_threshold() -> u64 {
    100
}

fn default_page_size() -> u64 {
    100
}

fn default_scan_window() -> u64 {
    100
}

fn default_page_interval() -> Duration {
    Duration::from_secs(10)
}

// five attempts, five seconds apart
fn default_page_retry_max_elapsed() -> Duration {
    Duration::from_secs(25)
}

fn default_page_retry_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_fetch_retry_interval() -> Duration {
    Duration::from_secs(15)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RenBridgeConfig {
    pub network: RenNetwork,
    // Overrides the network's public RenVM endpoint. Required on devnet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renvm_rpc_url: Option<String>,
    #[serde(default)]
    pub submitter: SubmitterConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filecoin: Option<FilecoinNetworkConfig>,
}

impl Config for RenBridgeConfig {}

impl RenBridgeConfig {
    pub fn for_network(network: RenNetwork) -> Self {
        Self {
            network,
            renvm_rpc_url: None,
            submitter: SubmitterConfig::default(),
            watcher: WatcherConfig::default(),
            filecoin: None,
        }
    }

    pub fn renvm_rpc_url(&self) -> BridgeResult<String> {
        self.renvm_rpc_url
            .clone()
            .or_else(|| self.network.default_rpc_url().map(str::to_string))
            .ok_or_else(|| {
                BridgeError::Configuration(format!(
                    "renvm-rpc-url is required on {}",
                    self.network
                ))
            })
    }

    pub fn filecoin_network(&self) -> FilecoinNetworkConfig {
        self.filecoin
            .clone()
            .unwrap_or_else(|| self.network.filecoin())
    }

    pub fn validate(&self) -> BridgeResult<()> {
        self.renvm_rpc_url()?;
        let zero = |name: &str| {
            Err(BridgeError::Configuration(format!("{} must be greater than zero", name)))
        };
        if self.submitter.submit_attempts == 0 {
            return zero("submitter.submit-attempts");
        }
        if self.submitter.progress_channel_size == 0 {
            return zero("submitter.progress-channel-size");
        }
        if self.submitter.poll_interval.is_zero() {
            return zero("submitter.poll-interval");
        }
        if self.watcher.page_size == 0 {
            return zero("watcher.page-size");
        }
        if self.watcher.poll_interval.is_zero() {
            return zero("watcher.poll-interval");
        }
        if self.filecoin_network().address_prefix.chars().count() != 1 {
            return Err(BridgeError::Configuration(
                "filecoin.address-prefix must be a single character".to_string(),
            ));
        }
        Ok(())
    }
}
