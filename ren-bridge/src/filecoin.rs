// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Filecoin as a RenVM lock chain.
//!
//! Address strings are `<network><protocol><base32(payload || checksum)>`
//! where the checksum is a 4 byte blake2b of `protocol || payload`, except
//! for ID addresses which carry the actor id in decimal. Message ids are
//! CIDs; their 38 raw bytes are what RenVM sees as the txid.

use crate::chain::{InputPayload, LockChain, OutputPayload, OutputTarget};
use crate::error::{BridgeError, BridgeResult};
use crate::gateway::derive_gateway_payload;
use crate::types::PartialChainTransaction;
use crate::utils::{is_url_base64, to_url_base64};
use blake2::digest::consts::U4;
use blake2::{Blake2b, Digest};
use cid::Cid;
use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const FILECOIN: &str = "Filecoin";
pub const FIL: &str = "FIL";

const CHECKSUM_LENGTH: usize = 4;
const SECP256K1_PAYLOAD_LENGTH: usize = 20;
const BLS_PAYLOAD_LENGTH: usize = 48;
const MESSAGE_CID_LENGTH: usize = 38;

type Blake2b32 = Blake2b<U4>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NativeAsset {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilecoinNetworkConfig {
    pub selector: String,
    pub native_asset: NativeAsset,
    // seconds
    pub average_confirmation_time: u64,
    pub address_prefix: String,
    pub explorer: String,
    pub rpc_url: String,
    #[serde(default)]
    pub rpc_token: Option<String>,
    #[serde(default)]
    pub filfox_api: Option<String>,
}

impl FilecoinNetworkConfig {
    fn base(address_prefix: &str, explorer: &str, rpc_url: &str, filfox_api: Option<&str>) -> Self {
        Self {
            selector: FILECOIN.to_string(),
            native_asset: NativeAsset {
                name: FILECOIN.to_string(),
                symbol: FIL.to_string(),
                decimals: 18,
            },
            average_confirmation_time: 30,
            address_prefix: address_prefix.to_string(),
            explorer: explorer.to_string(),
            rpc_url: rpc_url.to_string(),
            rpc_token: None,
            filfox_api: filfox_api.map(str::to_string),
        }
    }

    pub fn mainnet() -> Self {
        Self::base(
            "f",
            "https://filfox.info/en",
            "https://multichain-web-proxy.herokuapp.com/mainnet",
            Some("https://filfox.info/api/v1/"),
        )
    }

    pub fn testnet() -> Self {
        Self::base(
            "t",
            "https://calibration.filscan.io",
            "https://multichain-web-proxy.herokuapp.com/testnet",
            None,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressProtocol {
    Id = 0,
    Secp256k1 = 1,
    Actor = 2,
    Bls = 3,
}

impl AddressProtocol {
    fn from_u8(protocol: u8) -> BridgeResult<Self> {
        match protocol {
            0 => Ok(AddressProtocol::Id),
            1 => Ok(AddressProtocol::Secp256k1),
            2 => Ok(AddressProtocol::Actor),
            3 => Ok(AddressProtocol::Bls),
            p => Err(BridgeError::decoding(
                "filecoin address",
                format!("unknown protocol {}", p),
            )),
        }
    }

    fn payload_length(&self) -> Option<usize> {
        match self {
            AddressProtocol::Id => None,
            AddressProtocol::Secp256k1 | AddressProtocol::Actor => Some(SECP256K1_PAYLOAD_LENGTH),
            AddressProtocol::Bls => Some(BLS_PAYLOAD_LENGTH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilecoinAddress {
    network: char,
    protocol: AddressProtocol,
    payload: Vec<u8>,
}

impl FilecoinAddress {
    pub fn new(network: char, protocol: AddressProtocol, payload: Vec<u8>) -> BridgeResult<Self> {
        if network != 'f' && network != 't' {
            return Err(BridgeError::Configuration(format!(
                "unknown filecoin network prefix {:?}",
                network
            )));
        }
        match protocol.payload_length() {
            Some(expected) if expected != payload.len() => {
                return Err(BridgeError::decoding(
                    "filecoin address",
                    format!("expected {} payload bytes, got {}", expected, payload.len()),
                ))
            }
            None => {
                decode_leb128(&payload)?;
            }
            _ => {}
        }
        Ok(Self {
            network,
            protocol,
            payload,
        })
    }

    pub fn network(&self) -> char {
        self.network
    }

    pub fn protocol(&self) -> AddressProtocol {
        self.protocol
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// `protocol || payload`, the form RenVM stores for recipients.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.payload.len());
        out.push(self.protocol as u8);
        out.extend_from_slice(&self.payload);
        out
    }

    fn checksum(&self) -> [u8; CHECKSUM_LENGTH] {
        Blake2b32::digest(self.to_bytes()).into()
    }
}

impl fmt::Display for FilecoinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.network, self.protocol as u8)?;
        if self.protocol == AddressProtocol::Id {
            // validated in `new`
            let id = decode_leb128(&self.payload).map_err(|_| fmt::Error)?;
            return write!(f, "{}", id);
        }
        let mut raw = self.payload.clone();
        raw.extend_from_slice(&self.checksum());
        write!(f, "{}", BASE32_NOPAD.encode(&raw).to_ascii_lowercase())
    }
}

impl FromStr for FilecoinAddress {
    type Err = BridgeError;

    fn from_str(address: &str) -> BridgeResult<Self> {
        let invalid = |reason: &str| {
            BridgeError::decoding("filecoin address", format!("{}: {:?}", reason, address))
        };
        let mut chars = address.chars();
        let network = chars.next().ok_or_else(|| invalid("empty address"))?;
        let protocol = chars
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(|| invalid("missing protocol"))?;
        let protocol = AddressProtocol::from_u8(protocol as u8)?;
        let rest = chars.as_str();
        if rest.is_empty() {
            return Err(invalid("missing payload"));
        }

        if protocol == AddressProtocol::Id {
            let id: u64 = rest.parse().map_err(|_| invalid("bad actor id"))?;
            return Self::new(network, protocol, encode_leb128(id));
        }

        if rest.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid("address must be lowercase"));
        }
        let raw = BASE32_NOPAD
            .decode(rest.to_ascii_uppercase().as_bytes())
            .map_err(|_| invalid("bad base32"))?;
        if raw.len() <= CHECKSUM_LENGTH {
            return Err(invalid("too short"));
        }
        let (payload, checksum) = raw.split_at(raw.len() - CHECKSUM_LENGTH);
        let parsed = Self::new(network, protocol, payload.to_vec())?;
        if parsed.checksum() != checksum {
            return Err(invalid("checksum mismatch"));
        }
        Ok(parsed)
    }
}

fn encode_leb128(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn decode_leb128(bytes: &[u8]) -> BridgeResult<u64> {
    let mut value: u64 = 0;
    for (i, byte) in bytes.iter().enumerate() {
        if i >= 10 {
            break;
        }
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            if i + 1 != bytes.len() {
                break;
            }
            return Ok(value);
        }
    }
    Err(BridgeError::decoding(
        "leb128",
        format!("invalid actor id bytes 0x{}", hex::encode(bytes)),
    ))
}

pub fn tx_hash_to_bytes(tx_hash: &str) -> BridgeResult<Vec<u8>> {
    Cid::try_from(tx_hash)
        .map(|cid| cid.to_bytes())
        .map_err(|e| BridgeError::decoding("cid", format!("{}: {:?}", e, tx_hash)))
}

pub fn tx_hash_from_bytes(bytes: &[u8]) -> BridgeResult<String> {
    Cid::try_from(bytes)
        .map(|cid| cid.to_string())
        .map_err(|e| BridgeError::decoding("cid", format!("{}: 0x{}", e, hex::encode(bytes))))
}

#[derive(Debug, Clone)]
pub struct Filecoin {
    network: FilecoinNetworkConfig,
}

impl Filecoin {
    pub fn new(network: FilecoinNetworkConfig) -> Self {
        Self { network }
    }

    pub fn network(&self) -> &FilecoinNetworkConfig {
        &self.network
    }

    fn network_char(&self) -> BridgeResult<char> {
        let mut chars = self.network.address_prefix.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(BridgeError::Configuration(format!(
                "invalid filecoin address prefix {:?}",
                self.network.address_prefix
            ))),
        }
    }

    fn uses_filscan(&self) -> bool {
        self.network.explorer.contains("filscan")
    }
}

impl LockChain for Filecoin {
    fn name(&self) -> &str {
        &self.network.selector
    }

    fn is_lock_asset(&self, asset: &str) -> bool {
        asset == self.network.native_asset.symbol
    }

    fn asset_decimals(&self, asset: &str) -> BridgeResult<u32> {
        self.assert_asset_is_supported(asset)?;
        Ok(self.network.native_asset.decimals)
    }

    fn validate_address(&self, address: &str) -> bool {
        match (FilecoinAddress::from_str(address), self.network_char()) {
            (Ok(parsed), Ok(network)) => parsed.network() == network,
            _ => false,
        }
    }

    fn address_to_bytes(&self, address: &str) -> BridgeResult<Vec<u8>> {
        Ok(FilecoinAddress::from_str(address)?.to_bytes())
    }

    /// Accepts the bare 20 byte payload or `protocol || payload`.
    fn address_from_bytes(&self, bytes: &[u8]) -> BridgeResult<String> {
        let payload = if bytes.len() == SECP256K1_PAYLOAD_LENGTH + 1 {
            &bytes[1..]
        } else {
            bytes
        };
        let address =
            FilecoinAddress::new(self.network_char()?, AddressProtocol::Secp256k1, payload.to_vec())?;
        Ok(address.to_string())
    }

    fn tx_hash_to_bytes(&self, tx_hash: &str) -> BridgeResult<Vec<u8>> {
        tx_hash_to_bytes(tx_hash)
    }

    fn tx_hash_from_bytes(&self, bytes: &[u8]) -> BridgeResult<String> {
        tx_hash_from_bytes(bytes)
    }

    fn transaction_explorer_link(&self, tx_hash: &str) -> String {
        if self.uses_filscan() {
            format!("{}/tipset/message-detail?cid={}", self.network.explorer, tx_hash)
        } else {
            format!("{}/message/{}", self.network.explorer, tx_hash)
        }
    }

    fn address_explorer_link(&self, address: &str) -> String {
        if self.uses_filscan() {
            format!("{}/address/general?address={}", self.network.explorer, address)
        } else {
            format!("{}/address/{}", self.network.explorer, address)
        }
    }

    fn validate_transaction(&self, tx: &PartialChainTransaction) -> bool {
        if tx.txid.is_none() && tx.tx_hash.is_none() {
            return false;
        }
        let hash_bytes = match &tx.tx_hash {
            Some(tx_hash) => match tx_hash_to_bytes(tx_hash) {
                Ok(bytes) if bytes.len() == MESSAGE_CID_LENGTH => Some(bytes),
                _ => return false,
            },
            None => None,
        };
        if let Some(txid) = &tx.txid {
            if !is_url_base64(txid, MESSAGE_CID_LENGTH) {
                return false;
            }
            if let Some(bytes) = &hash_bytes {
                if &to_url_base64(bytes) != txid {
                    return false;
                }
            }
        }
        matches!(tx.txindex.as_deref(), None | Some("0"))
    }

    fn create_gateway_address(
        &self,
        asset: &str,
        from: &InputPayload,
        shard_public_key: &[u8],
        ghash: &[u8],
    ) -> BridgeResult<String> {
        self.assert_asset_is_supported(asset)?;
        self.assert_payload_chain(from.chain())?;
        let payload = derive_gateway_payload(shard_public_key, ghash)?;
        self.address_from_bytes(&payload)
    }

    fn get_output_payload(&self, asset: &str, to: &OutputPayload) -> BridgeResult<OutputTarget> {
        self.assert_asset_is_supported(asset)?;
        self.assert_payload_chain(&to.chain)?;
        if to.address.is_empty() {
            return Err(BridgeError::Configuration(format!(
                "no {} address specified",
                self.name()
            )));
        }
        Ok(OutputTarget {
            to: to.address.clone(),
            to_bytes: self.address_to_bytes(&to.address)?,
            payload: vec![],
        })
    }
}
