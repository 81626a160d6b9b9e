// Rigminer - Free and Open Source Software Statement
//
// File: src/core/header.rs
// Version: 1.0.0
//
// Reference block header. The prefix (everything but the solution) is what a
// search kernel receives; the full serialization, solution appended, is what
// gets hashed and submitted.

use thiserror::Error;

/// version + prev_block + merkle_root + bits + timestamp + nonce + extra_data
pub const HEADER_PREFIX_LEN: usize = 4 + 32 + 32 + 4 + 4 + 4 + 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("header too short: {len} bytes, need at least 112")]
    TooShort { len: usize },
}

/// Hashes a fully serialized header. Implementations must be thread safe since
/// completion callbacks may run on accelerator-owned threads.
pub trait HeaderHasher: Send + Sync {
    fn hash(&self, header: &[u8]) -> [u8; 32];
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_block: [u8; 32],
    pub merkle_root: [u8; 32],
    pub bits: u32,
    pub timestamp: u32,
    pub nonce: u32,
    pub extra_data: [u8; 32],
    pub solution: Vec<u8>,
}

impl BlockHeader {
    pub fn serialize_prefix(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_PREFIX_LEN + self.solution.len());
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.prev_block);
        out.extend_from_slice(&self.merkle_root);
        out.extend_from_slice(&self.bits.to_le_bytes());
        out.extend_from_slice(&self.timestamp.to_le_bytes());
        out.extend_from_slice(&self.nonce.to_le_bytes());
        out.extend_from_slice(&self.extra_data);
        out
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.serialize_prefix();
        out.extend_from_slice(&self.solution);
        out
    }

    /// Parse a serialized header; bytes past the prefix are the solution.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_PREFIX_LEN {
            return Err(HeaderError::TooShort { len: bytes.len() });
        }
        let mut cursor = Cursor { bytes, pos: 0 };
        Ok(Self {
            version: cursor.u32(),
            prev_block: cursor.array(),
            merkle_root: cursor.array(),
            bits: cursor.u32(),
            timestamp: cursor.u32(),
            nonce: cursor.u32(),
            extra_data: cursor.array(),
            solution: bytes[HEADER_PREFIX_LEN..].to_vec(),
        })
    }

    /// The extra-nonce occupies the first 8 bytes of extra_data, little endian.
    pub fn set_extra_nonce(&mut self, extra_nonce: u32) {
        self.extra_data[..8].copy_from_slice(&u64::from(extra_nonce).to_le_bytes());
    }

    pub fn extra_nonce(&self) -> u32 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.extra_data[..8]);
        u64::from_le_bytes(raw) as u32
    }
}

// Length is checked up front by from_bytes.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.pos..self.pos + N]);
        self.pos += N;
        out
    }

    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.array())
    }
}
