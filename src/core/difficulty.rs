// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/difficulty.rs
// Version: 1.0.0
//
// This file contains the 256-bit target arithmetic used by share assessment:
// the difficulty-one bound, hex target parsing and hash-versus-target
// comparison.

use hex;
use log::{trace, warn};
use uint::construct_uint;

const LOG_TARGET: &str = "rigminer::difficulty";

construct_uint! {
    pub struct U256(4);
}

/// Difficulty-one target (compact bits 0x1d00ffff), big-endian.
pub const DIFF_ONE_TARGET: [u8; 32] = [
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Expected hash attempts per difficulty-one share (2^32).
pub const HASHES_PER_DIFF_ONE_SHARE: f64 = 4_294_967_296.0;

pub fn diff_one_target() -> U256 {
    U256::from_big_endian(&DIFF_ONE_TARGET)
}

/// Interpret a header hash as a number. Block hashes are little-endian.
pub fn hash_to_u256(hash: &[u8; 32]) -> U256 {
    U256::from_little_endian(hash)
}

pub fn hash_meets_target(hash: &[u8; 32], target: U256) -> bool {
    let hash_value = hash_to_u256(hash);
    trace!(target: LOG_TARGET,
        "Hash check: hash={:064x}, target={:064x}",
        hash_value, target
    );
    hash_value <= target
}

/// Parse a big-endian hex target of at most 32 bytes. Zero and malformed
/// targets yield `None`.
pub fn parse_target_hex(target_hex: &str) -> Option<U256> {
    let trimmed = target_hex.trim().trim_start_matches("0x");
    if trimmed.is_empty() {
        warn!(target: LOG_TARGET,"Target hex is empty");
        return None;
    }
    let padded = if trimmed.len() % 2 == 1 {
        format!("0{}", trimmed)
    } else {
        trimmed.to_string()
    };
    match hex::decode(&padded) {
        Ok(bytes) => {
            if bytes.len() > 32 {
                warn!(target: LOG_TARGET,"Invalid target: too long ({} bytes)", bytes.len());
                return None;
            }
            let target = U256::from_big_endian(&bytes);
            if target.is_zero() {
                warn!(target: LOG_TARGET,"Invalid target: zero value");
                return None;
            }
            Some(target)
        }
        Err(e) => {
            warn!(target: LOG_TARGET,"Failed to decode target hex: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_one_target_is_ffff_shifted_by_208_bits() {
        assert_eq!(diff_one_target(), U256::from(0xFFFFu64) << 208);
    }

    #[test]
    fn hash_is_read_little_endian() {
        let mut hash = [0u8; 32];
        hash[0] = 0x01;
        assert_eq!(hash_to_u256(&hash), U256::from(1u64));
        assert!(hash_meets_target(&hash, U256::from(1u64)));
        assert!(!hash_meets_target(&hash, U256::zero()));
    }

    #[test]
    fn parse_target_rejects_zero_and_garbage() {
        assert!(parse_target_hex("0000").is_none());
        assert!(parse_target_hex("zz").is_none());
        assert!(parse_target_hex("").is_none());
        assert_eq!(parse_target_hex("0x0100"), Some(U256::from(256u64)));
        assert_eq!(parse_target_hex("fff"), Some(U256::from(0xfffu64)));
    }
}
