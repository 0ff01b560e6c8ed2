// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{BridgeError, BridgeResult};
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;

/// URL-safe base64 without padding, the form RenVM uses for hashes and
/// transaction ids.
pub fn to_url_base64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes standard or URL-safe base64, padded or not.
pub fn from_base64(input: &str) -> BridgeResult<Vec<u8>> {
    let normalized: String = input
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    STANDARD_NO_PAD
        .decode(normalized)
        .map_err(|e| BridgeError::decoding("base64", format!("{}: {:?}", e, input)))
}

/// Checks that `input` is URL-safe base64 of exactly `length` bytes.
pub fn is_url_base64(input: &str, length: usize) -> bool {
    if input.contains('+') || input.contains('/') {
        return false;
    }
    matches!(from_base64(input), Ok(bytes) if bytes.len() == length)
}

pub fn from_hex(input: &str) -> BridgeResult<Vec<u8>> {
    hex::decode(input.trim_start_matches("0x"))
        .map_err(|e| BridgeError::decoding("hex", format!("{}: {:?}", e, input)))
}
