// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Gateway key derivation.
//!
//! A gateway address is owned by the RenVM shard key offset by the session
//! hash:
//!
//! ```text
//!   derived = shard_public_key + ghash * G
//!   payload = blake2b-160(uncompressed(derived))
//! ```
//!
//! The chain then wraps `payload` in its own address format. Nothing here
//! wraps around silently: a point off the curve, a scalar outside `[1, n)` or
//! a sum at infinity is a [`BridgeError::Derivation`].

use crate::error::{BridgeError, BridgeResult};
use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};
use ethers::core::k256::elliptic_curve::sec1::ToEncodedPoint;
use ethers::core::k256::{PublicKey, SecretKey};

type Blake2b160 = Blake2b<U20>;

pub const GHASH_LENGTH: usize = 32;

/// Adds the public point of `ghash` to `shard_public_key`.
pub fn derive_gateway_public_key(shard_public_key: &[u8], ghash: &[u8]) -> BridgeResult<PublicKey> {
    let shard = PublicKey::from_sec1_bytes(shard_public_key).map_err(|_| {
        BridgeError::Derivation(format!(
            "shard public key 0x{} is not a secp256k1 point",
            hex::encode(shard_public_key)
        ))
    })?;
    if ghash.len() != GHASH_LENGTH {
        return Err(BridgeError::Derivation(format!(
            "ghash must be {} bytes, got {}",
            GHASH_LENGTH,
            ghash.len()
        )));
    }
    let offset = SecretKey::from_slice(ghash).map_err(|_| {
        BridgeError::Derivation(format!(
            "ghash 0x{} is not a valid secp256k1 scalar",
            hex::encode(ghash)
        ))
    })?;

    let derived = shard.to_projective() + offset.public_key().to_projective();
    PublicKey::from_affine(derived.to_affine())
        .map_err(|_| BridgeError::Derivation("derived key is the point at infinity".to_string()))
}

/// 20 byte address payload shared by secp256k1-address chains.
pub fn derive_gateway_payload(shard_public_key: &[u8], ghash: &[u8]) -> BridgeResult<[u8; 20]> {
    let derived = derive_gateway_public_key(shard_public_key, ghash)?;
    let uncompressed = derived.to_encoded_point(false);
    Ok(Blake2b160::digest(uncompressed.as_bytes()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::from_base64;

    const SHARD_PUBLIC_KEY: &str =
        "030dd65f7db2920bb229912e3f4213dd150e5f972c9b73e9be714d844561ac355c";
    const GHASH: &str = "cQ+CJ8bOP4RMopOCNDvbQ020Eu8KRpYykurZyKNFM1I=";

    #[test]
    fn test_payload_matches_fixture() {
        let pubkey = hex::decode(SHARD_PUBLIC_KEY).unwrap();
        let ghash = from_base64(GHASH).unwrap();
        let payload = derive_gateway_payload(&pubkey, &ghash).unwrap();
        assert_eq!(
            hex::encode(payload),
            "b2fa07f3e3b9908526650959c5b38286f67da218"
        );
        // pure: a second run gives identical bytes
        assert_eq!(derive_gateway_payload(&pubkey, &ghash).unwrap(), payload);
    }

    #[test]
    fn test_distinct_ghash_gives_distinct_payload() {
        let pubkey = hex::decode(SHARD_PUBLIC_KEY).unwrap();
        let a = derive_gateway_payload(&pubkey, &from_base64(GHASH).unwrap()).unwrap();
        let b = derive_gateway_payload(&pubkey, &[1u8; 32]).unwrap();
        assert_ne!(a, b);
        assert_eq!(hex::encode(b), "2905d13197a75e05a8c279284a522c546e9ac218");
    }

    #[test]
    fn test_invalid_point_is_derivation_error() {
        let mut pubkey = hex::decode(SHARD_PUBLIC_KEY).unwrap();
        pubkey[0] = 0x05;
        let err = derive_gateway_payload(&pubkey, &[1u8; 32]).unwrap_err();
        assert_eq!(err.error_type(), "derivation");

        let err = derive_gateway_payload(&pubkey[..20], &[1u8; 32]).unwrap_err();
        assert_eq!(err.error_type(), "derivation");
    }

    #[test]
    fn test_invalid_scalar_is_derivation_error() {
        let pubkey = hex::decode(SHARD_PUBLIC_KEY).unwrap();
        for ghash in [
            vec![0u8; 32],
            vec![0xffu8; 32],
            vec![1u8; 31],
            vec![1u8; 33],
        ] {
            let err = derive_gateway_payload(&pubkey, &ghash).unwrap_err();
            assert!(
                matches!(err, BridgeError::Derivation(_)),
                "ghash {} should fail",
                hex::encode(&ghash)
            );
        }
    }

    #[test]
    fn test_sum_at_infinity_is_rejected() {
        // G + (n - 1) * G
        let generator =
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .unwrap();
        let n_minus_one =
            hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140")
                .unwrap();
        let err = derive_gateway_public_key(&generator, &n_minus_one).unwrap_err();
        assert!(err.to_string().contains("infinity"));
    }
}
