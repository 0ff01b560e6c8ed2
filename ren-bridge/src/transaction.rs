// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! RenVM transaction identity and the cross-chain input that mint and burn
//! instructions carry.

use crate::error::{BridgeError, BridgeResult};
use crate::pack::{
    encode_string, PackField, PackPrimitive, PackType, PackValue, TypedPackValue,
};
use crate::utils::to_url_base64;
use ethers::types::U256;
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const RENVM_TX_VERSION: &str = "1";

/// sha256(len(version) || version || len(selector) || selector || type || value)
pub fn transaction_hash(
    version: &str,
    selector: &str,
    input: &TypedPackValue,
) -> BridgeResult<[u8; 32]> {
    let mut hasher = Sha256::new();
    hasher.update(encode_string(version));
    hasher.update(encode_string(selector));
    hasher.update(input.encode()?);
    Ok(hasher.finalize().into())
}

/// The public identifier of a transaction, URL-safe base64 of its hash.
pub fn transaction_id(version: &str, selector: &str, input: &TypedPackValue) -> BridgeResult<String> {
    Ok(to_url_base64(&transaction_hash(version, selector, input)?))
}

pub fn generate_phash(payload: &[u8]) -> [u8; 32] {
    keccak256(payload)
}

/// Hash of the selector, e.g. `FIL/toEthereum`.
pub fn generate_shash(selector: &str) -> [u8; 32] {
    keccak256(selector.as_bytes())
}

pub fn generate_nhash(nonce: &[u8], txid: &[u8], txindex: u32) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(nonce.len() + txid.len() + 4);
    preimage.extend_from_slice(nonce);
    preimage.extend_from_slice(txid);
    preimage.extend_from_slice(&txindex.to_be_bytes());
    keccak256(preimage)
}

/// Session hash binding the payload, asset selector, recipient and nonce.
pub fn generate_ghash(phash: &[u8], shash: &[u8], to: &[u8], nonce: &[u8]) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(phash.len() + shash.len() + to.len() + nonce.len());
    preimage.extend_from_slice(phash);
    preimage.extend_from_slice(shash);
    preimage.extend_from_slice(to);
    preimage.extend_from_slice(nonce);
    keccak256(preimage)
}

/// Arguments of a mint or burn instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossChainInput {
    pub txid: Vec<u8>,
    pub txindex: u32,
    pub amount: U256,
    pub payload: Vec<u8>,
    pub phash: Vec<u8>,
    pub to: String,
    pub nonce: Vec<u8>,
    pub nhash: Vec<u8>,
    pub gpubkey: Vec<u8>,
    pub ghash: Vec<u8>,
}

impl CrossChainInput {
    pub fn pack_type() -> PackType {
        PackType::Struct(vec![
            PackField::new("txid", PackPrimitive::Bytes),
            PackField::new("txindex", PackPrimitive::U32),
            PackField::new("amount", PackPrimitive::U256),
            PackField::new("payload", PackPrimitive::Bytes),
            PackField::new("phash", PackPrimitive::Bytes32),
            PackField::new("to", PackPrimitive::Str),
            PackField::new("nonce", PackPrimitive::Bytes32),
            PackField::new("nhash", PackPrimitive::Bytes32),
            PackField::new("gpubkey", PackPrimitive::Bytes),
            PackField::new("ghash", PackPrimitive::Bytes32),
        ])
    }

    /// Fails with an encoding error naming the first field of the wrong width.
    pub fn to_typed_pack_value(&self) -> BridgeResult<TypedPackValue> {
        let value = PackValue::Struct(vec![
            ("txid".into(), PackValue::Bytes(self.txid.clone())),
            ("txindex".into(), PackValue::uint(self.txindex as u64)),
            ("amount".into(), PackValue::Uint(self.amount)),
            ("payload".into(), PackValue::Bytes(self.payload.clone())),
            ("phash".into(), PackValue::Bytes(self.phash.clone())),
            ("to".into(), PackValue::Str(self.to.clone())),
            ("nonce".into(), PackValue::Bytes(self.nonce.clone())),
            ("nhash".into(), PackValue::Bytes(self.nhash.clone())),
            ("gpubkey".into(), PackValue::Bytes(self.gpubkey.clone())),
            ("ghash".into(), PackValue::Bytes(self.ghash.clone())),
        ]);
        TypedPackValue::new(Self::pack_type(), value)
    }

    pub fn from_typed_pack_value(typed: &TypedPackValue) -> BridgeResult<Self> {
        if typed.ty() != &Self::pack_type() {
            return Err(BridgeError::decoding(
                "struct",
                "value is not a cross-chain input",
            ));
        }
        let v = typed.value();
        let bytes = |name: &str| -> BridgeResult<Vec<u8>> {
            v.field(name)
                .and_then(PackValue::as_bytes)
                .map(<[u8]>::to_vec)
                .ok_or_else(|| BridgeError::decoding("struct", format!("missing `{}`", name)))
        };
        let uint = |name: &str| -> BridgeResult<U256> {
            v.field(name)
                .and_then(PackValue::as_uint)
                .ok_or_else(|| BridgeError::decoding("struct", format!("missing `{}`", name)))
        };
        Ok(Self {
            txid: bytes("txid")?,
            txindex: uint("txindex")?.as_u32(),
            amount: uint("amount")?,
            payload: bytes("payload")?,
            phash: bytes("phash")?,
            to: v
                .field("to")
                .and_then(PackValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| BridgeError::decoding("struct", "missing `to`"))?,
            nonce: bytes("nonce")?,
            nhash: bytes("nhash")?,
            gpubkey: bytes("gpubkey")?,
            ghash: bytes("ghash")?,
        })
    }
}

/// The envelope sent with `ren_submitTx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenVmTransaction {
    pub hash: String,
    pub selector: String,
    pub version: String,
    #[serde(rename = "in")]
    pub input: TypedPackValue,
}

impl RenVmTransaction {
    pub fn new(version: &str, selector: &str, input: TypedPackValue) -> BridgeResult<Self> {
        Ok(Self {
            hash: transaction_id(version, selector, &input)?,
            selector: selector.to_string(),
            version: version.to_string(),
            input,
        })
    }
}
