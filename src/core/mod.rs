// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/mod.rs
// Version: 1.0.0
//
// This file is the module declaration for the core functionality of rigminer,
// located in the core subdirectory. It declares submodules and re-exports key
// types for use throughout the project.

pub mod difficulty;
pub mod header;
pub mod sha256;
pub mod types;

// Re-export the most commonly used items
pub use difficulty::{U256, diff_one_target, hash_meets_target, hash_to_u256, parse_target_hex};
pub use header::{BlockHeader, HeaderError, HeaderHasher};
pub use sha256::{Sha256dHasher, sha256d_hash};
pub use types::{Args, MiningMode, ShareResult, Work, WorkError, unix_time};
