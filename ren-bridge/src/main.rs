// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use clap::Parser;
use ren_bridge::chain::LockChain;
use ren_bridge::config::{RenBridgeConfig, RenNetwork};
use ren_bridge::filecoin::Filecoin;
use ren_bridge::pack::TypedPackValue;
use ren_bridge::renvm::RenVmJsonRpcClient;
use ren_bridge::transaction::transaction_id;
use ren_bridge::utils::{from_base64, from_hex, to_url_base64};
use ren_bridge_config::Config;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(rename_all = "kebab-case")]
#[clap(name = env!("CARGO_BIN_NAME"))]
#[clap(version)]
struct Args {
    /// YAML or JSON `RenBridgeConfig`. Without it the network defaults apply.
    #[clap(long, global = true)]
    config_path: Option<PathBuf>,

    #[clap(long, global = true, default_value = "testnet")]
    network: RenNetwork,

    #[clap(subcommand)]
    command: RenBridgeCommand,
}

#[derive(Parser)]
#[clap(rename_all = "kebab-case")]
enum RenBridgeCommand {
    /// Derive the Filecoin gateway address of a mint session.
    #[clap(name = "gateway-address")]
    GatewayAddress {
        #[clap(long, default_value = "FIL")]
        asset: String,
        /// 32 byte session hash, base64 or 0x-prefixed hex
        #[clap(long)]
        ghash: String,
        /// Shard public key, base64 or 0x-prefixed hex. Fetched from RenVM
        /// when omitted.
        #[clap(long)]
        shard_pubkey: Option<String>,
    },
    /// Compute the RenVM transaction hash of a typed input.
    #[clap(name = "tx-hash")]
    TxHash {
        #[clap(long)]
        selector: String,
        /// `{"t": .., "v": ..}` JSON, inline or `@path`
        #[clap(long)]
        input: String,
        #[clap(long)]
        version: Option<String>,
    },
    /// Print the `ren_queryTx` result of a transaction.
    #[clap(name = "query-tx")]
    QueryTx {
        #[clap(long)]
        hash: String,
    },
    /// Print the current shard public key of an asset.
    #[clap(name = "shard-key")]
    ShardKey {
        #[clap(long, default_value = "FIL")]
        asset: String,
    },
}

fn parse_bytes(input: &str) -> anyhow::Result<Vec<u8>> {
    let bytes = match input.strip_prefix("0x") {
        Some(_) => from_hex(input)?,
        None => from_base64(input)?,
    };
    Ok(bytes)
}

fn load_config(args: &Args) -> anyhow::Result<RenBridgeConfig> {
    let config = match &args.config_path {
        Some(path) => RenBridgeConfig::load(path)?,
        None => RenBridgeConfig::for_network(args.network),
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;
    debug!("Using {} config", config.network);

    match args.command {
        RenBridgeCommand::GatewayAddress {
            asset,
            ghash,
            shard_pubkey,
        } => {
            let chain = Filecoin::new(config.filecoin_network());
            let shard_pubkey = match shard_pubkey {
                Some(key) => parse_bytes(&key).context("Invalid shard public key")?,
                None => {
                    let client = RenVmJsonRpcClient::new(config.renvm_rpc_url()?);
                    client.select_shard_public_key(&asset).await?
                }
            };
            let ghash = parse_bytes(&ghash).context("Invalid ghash")?;
            let address = chain.create_gateway_address(
                &asset,
                &chain.gateway_address_payload(),
                &shard_pubkey,
                &ghash,
            )?;
            info!("[{}] Gateway address derived", chain.name());
            println!("{}", address);
            println!("{}", chain.address_explorer_link(&address));
        }
        RenBridgeCommand::TxHash {
            selector,
            input,
            version,
        } => {
            let raw = match input.strip_prefix('@') {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read input file {}", path))?,
                None => input,
            };
            let json: serde_json::Value =
                serde_json::from_str(&raw).context("Input is not valid JSON")?;
            let typed = TypedPackValue::from_json(&json)?;
            let version = version.unwrap_or_else(|| config.submitter.version.clone());
            println!("{}", transaction_id(&version, &selector, &typed)?);
        }
        RenBridgeCommand::QueryTx { hash } => {
            let client = RenVmJsonRpcClient::new(config.renvm_rpc_url()?);
            let response = client.query_tx(&hash).await?;
            if let Some(reason) = response.revert_reason() {
                info!("[RenVM] Transaction {} reverted: {}", hash, reason);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        RenBridgeCommand::ShardKey { asset } => {
            let client = RenVmJsonRpcClient::new(config.renvm_rpc_url()?);
            let key = client.select_shard_public_key(&asset).await?;
            println!("0x{}", hex::encode(&key));
            println!("{}", to_url_base64(&key));
        }
    }
    Ok(())
}
