// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/sha256.rs
// Version: 1.0.0
//
// This file implements the SHA256d (double SHA-256) header hasher used by the
// reference header layout and the CPU reference runtime.

use log::trace;
use sha2::{Digest, Sha256};

use super::header::HeaderHasher;

const LOG_TARGET: &str = "rigminer::sha256";

pub fn sha256d_hash(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let result: [u8; 32] = Sha256::digest(first).into();
    trace!(target: LOG_TARGET,"SHA256d hash: {}", hex::encode(result));
    result
}

/// Double SHA-256 over the full serialized header, solution included.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256dHasher;

impl HeaderHasher for Sha256dHasher {
    fn hash(&self, header: &[u8]) -> [u8; 32] {
        sha256d_hash(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256d_of_empty_input() {
        assert_eq!(
            hex::encode(sha256d_hash(b"")),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }
}
