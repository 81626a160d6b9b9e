// Rigminer - Free and Open Source Software Statement
//
// File: src/miner/device/assess.rs
// Version: 1.0.0
//
// Two-threshold share assessment. A hash above the proof-of-work limit means
// the accelerator returned garbage; a hash under the limit but above the job
// target is a difficulty-one share that only feeds the hash-rate estimate.

use std::sync::Arc;

use log::{debug, info};

use crate::core::difficulty::{U256, hash_meets_target};
use crate::core::header::HeaderHasher;
use crate::core::types::{ShareResult, Work};
use crate::miner::stats::DeviceCounters;

const LOG_TARGET: &str = "rigminer::device::assess";

#[derive(Debug)]
pub enum Assessment {
    /// Hash above the proof-of-work limit
    HardwareAnomaly,
    /// Cleared the limit, not the job target
    DifficultyOne,
    /// Cleared the limit in benchmark mode
    Benchmark,
    Share(Box<ShareResult>),
}

pub struct ShareAssessor {
    pow_limit: U256,
    benchmark: bool,
    hasher: Arc<dyn HeaderHasher>,
}

impl ShareAssessor {
    pub fn new(pow_limit: U256, benchmark: bool, hasher: Arc<dyn HeaderHasher>) -> Self {
        Self {
            pow_limit,
            benchmark,
            hasher,
        }
    }

    pub fn pow_limit(&self) -> U256 {
        self.pow_limit
    }

    pub fn assess(
        &self,
        device_index: usize,
        work: &Work,
        solution: &[u8],
        counters: &DeviceCounters,
    ) -> Assessment {
        let mut candidate = work.clone();
        candidate.header.solution = solution.to_vec();
        let data = candidate.header.serialize();
        let hash = self.hasher.hash(&data);

        if !hash_meets_target(&hash, self.pow_limit) {
            debug!(target: LOG_TARGET,
                "DEV #{}: hash {} above proof-of-work limit, hardware error",
                device_index,
                hex::encode(hash)
            );
            counters.record_invalid();
            return Assessment::HardwareAnomaly;
        }

        counters.record_diff_one();

        if self.benchmark {
            return Assessment::Benchmark;
        }

        if !hash_meets_target(&hash, work.target) {
            debug!(target: LOG_TARGET,
                "DEV #{}: share {} below job target",
                device_index,
                hex::encode(hash)
            );
            return Assessment::DifficultyOne;
        }

        info!(target: LOG_TARGET,
            "💎 DEV #{} found share {}{}",
            device_index,
            hex::encode(hash),
            work.job_id
                .as_deref()
                .map(|id| format!(" (job {})", id))
                .unwrap_or_default()
        );
        counters.record_valid();

        Assessment::Share(Box::new(ShareResult {
            device_index,
            solution: solution.to_vec(),
            work: candidate,
            data,
            hash,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::header::BlockHeader;

    /// Hashes to the little-endian encoding of a fixed number.
    struct FixedHasher(u64);

    impl HeaderHasher for FixedHasher {
        fn hash(&self, _: &[u8]) -> [u8; 32] {
            let mut out = [0u8; 32];
            out[..8].copy_from_slice(&self.0.to_le_bytes());
            out
        }
    }

    fn work(target: u64) -> Work {
        Work::new(BlockHeader::default(), U256::from(target), 0, 0, false, None).unwrap()
    }

    fn assessor(hash: u64, benchmark: bool) -> ShareAssessor {
        ShareAssessor::new(U256::from(1_000u64), benchmark, Arc::new(FixedHasher(hash)))
    }

    #[test]
    fn above_limit_is_an_anomaly() {
        let counters = DeviceCounters::new();
        let outcome = assessor(5_000, false).assess(0, &work(100), &[1], &counters);
        assert!(matches!(outcome, Assessment::HardwareAnomaly));
        assert_eq!((counters.invalid(), counters.diff_one(), counters.valid()), (1, 0, 0));
    }

    #[test]
    fn between_bounds_counts_difficulty_one_only() {
        let counters = DeviceCounters::new();
        let outcome = assessor(500, false).assess(0, &work(100), &[1], &counters);
        assert!(matches!(outcome, Assessment::DifficultyOne));
        assert_eq!((counters.invalid(), counters.diff_one(), counters.valid()), (0, 1, 0));
    }

    #[test]
    fn clearing_target_emits_share() {
        let counters = DeviceCounters::new();
        let w = work(100);
        let outcome = assessor(50, false).assess(2, &w, &[7, 7], &counters);
        let Assessment::Share(share) = outcome else {
            panic!("expected a share");
        };
        assert_eq!(share.device_index, 2);
        assert_eq!(share.solution, vec![7, 7]);
        assert_eq!(share.work.header.solution, vec![7, 7]);
        assert!(w.header.solution.is_empty());
        assert_eq!(share.data, share.work.header.serialize());
        assert_eq!((counters.diff_one(), counters.valid()), (1, 1));
    }

    #[test]
    fn benchmark_stops_after_difficulty_one() {
        let counters = DeviceCounters::new();
        let outcome = assessor(50, true).assess(0, &work(100), &[1], &counters);
        assert!(matches!(outcome, Assessment::Benchmark));
        assert_eq!((counters.diff_one(), counters.valid()), (1, 0));
    }

    #[test]
    fn hashes_equal_to_a_bound_clear_it() {
        let counters = DeviceCounters::new();
        let outcome = assessor(1_000, false).assess(0, &work(1_000), &[1], &counters);
        assert!(matches!(outcome, Assessment::Share(_)));
        assert_eq!((counters.invalid(), counters.diff_one(), counters.valid()), (0, 1, 1));
    }
}
