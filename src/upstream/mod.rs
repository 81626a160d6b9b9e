// Rigminer - Free and Open Source Software Statement
//
// This project, rigminer, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/upstream/mod.rs
// Version: 1.0.0
//
// This file defines where work comes from and where shares go. Solo mining
// pulls jobs from a node and submits headers back to it; pool mining has a
// protocol client push jobs into PoolState and accepts submissions through
// PoolSubmitter. The wire protocols themselves live in embedding applications.
//
// Tree Location:
// - src/upstream/mod.rs (upstream traits)
// - Submodules: pool
// - Depends on: thiserror

pub mod pool;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::core::types::{MiningMode, Work};

pub use pool::{PoolState, PoolWork};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The job the share was found against is no longer current.
    #[error("share is stale")]
    Stale,
    #[error("upstream rejected request: {0}")]
    Rejected(String),
    #[error("upstream transport error: {0}")]
    Transport(String),
    #[error("no work available")]
    NoWork,
}

/// Pull-style work source and submission sink (node RPC).
pub trait NodeClient: Send + Sync {
    fn get_work(&self) -> BoxFuture<'_, Result<Work, UpstreamError>>;

    /// Returns whether the node accepted the header. Either answer triggers a
    /// work refresh; an error counts the share invalid without one.
    fn submit_work(&self, data: Vec<u8>) -> BoxFuture<'_, Result<bool, UpstreamError>>;
}

/// Pool submission sink. Work arrives separately through [`PoolState`].
pub trait PoolSubmitter: Send + Sync {
    /// Returns whether the share was handed to the pool. `Ok(false)` is
    /// counted as an invalid share and triggers a work refresh, the same as
    /// any error other than [`UpstreamError::Stale`]. Return `Stale` for
    /// shares against an outdated job; those are counted separately and do
    /// not trigger a refresh.
    fn submit(&self, data: Vec<u8>) -> BoxFuture<'_, Result<bool, UpstreamError>>;
}

#[derive(Clone)]
pub enum Upstream {
    Solo(Arc<dyn NodeClient>),
    Pool {
        state: PoolState,
        submitter: Arc<dyn PoolSubmitter>,
    },
}

impl Upstream {
    pub fn mode(&self) -> MiningMode {
        match self {
            Upstream::Solo(_) => MiningMode::Solo,
            Upstream::Pool { .. } => MiningMode::Pool,
        }
    }
}

impl std::fmt::Debug for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Upstream::Solo(_) => f.write_str("Upstream::Solo"),
            Upstream::Pool { state, .. } => f
                .debug_struct("Upstream::Pool")
                .field("new_work", &state.has_new_work())
                .finish(),
        }
    }
}
