// Rigminer - Free and Open Source Software Statement
//
// File: src/miner/device/nonce.rs
// Version: 1.0.0
//
// Search-space partitioning. Each device owns the extra-nonce values whose
// top byte is its index; the lower 24 bits roll once per dispatch. The per-job
// starting nonce is drawn from the OS RNG.

use log::warn;
use rand::RngCore;

const LOG_TARGET: &str = "rigminer::device::nonce";

const COUNTER_MASK: u32 = 0x00FF_FFFF;

/// Highest device index with its own extra-nonce partition.
pub const MAX_DEVICE_INDEX: usize = 0xFF;

/// Starting nonce used when the RNG fails.
pub const FALLBACK_NONCE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraNonce(u32);

impl ExtraNonce {
    /// The top byte carries the device index. Callers must keep `index` at or
    /// below [`MAX_DEVICE_INDEX`]; larger indexes would alias a lower device.
    pub fn for_device(index: usize) -> Self {
        Self(((index as u32) & 0xFF) << 24)
    }

    /// Advance the 24-bit counter, wrapping to zero. The device byte is kept.
    pub fn roll(&mut self) {
        let counter = (self.0.wrapping_add(1)) & COUNTER_MASK;
        self.0 = (self.0 & !COUNTER_MASK) | counter;
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn device_byte(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn counter(&self) -> u32 {
        self.0 & COUNTER_MASK
    }
}

pub fn random_start_nonce<R: RngCore + ?Sized>(rng: &mut R, device_index: usize) -> u32 {
    let mut buf = [0u8; 4];
    match rng.try_fill_bytes(&mut buf) {
        Ok(()) => u32::from_le_bytes(buf),
        Err(e) => {
            warn!(target: LOG_TARGET,
                "DEV #{}: random nonce generation failed ({}), using {}",
                device_index, e, FALLBACK_NONCE
            );
            FALLBACK_NONCE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
        fn next_u64(&mut self) -> u64 {
            0
        }
        fn fill_bytes(&mut self, _: &mut [u8]) {}
        fn try_fill_bytes(&mut self, _: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::other("entropy source offline")))
        }
    }

    #[test]
    fn device_byte_survives_rollover() {
        let mut extra = ExtraNonce::for_device(3);
        assert_eq!(extra.value(), 0x0300_0000);
        for _ in 0..COUNTER_MASK {
            extra.roll();
        }
        assert_eq!(extra.value(), 0x03FF_FFFF);
        extra.roll();
        assert_eq!(extra.value(), 0x0300_0000);
        assert_eq!(extra.device_byte(), 3);
        assert_eq!(extra.counter(), 0);
    }

    #[test]
    fn partitions_never_collide() {
        let mut seen = HashSet::new();
        for device in 0..4 {
            let mut extra = ExtraNonce::for_device(device);
            for _ in 0..1000 {
                extra.roll();
                assert!(seen.insert(extra.value()));
            }
        }
    }

    #[test]
    fn rng_failure_falls_back() {
        assert_eq!(random_start_nonce(&mut BrokenRng, 0), FALLBACK_NONCE);
    }

    #[test]
    fn rng_success_uses_drawn_bytes() {
        let mut rng = rand::rngs::mock::StepRng::new(0x0102_0304, 0);
        assert_eq!(random_start_nonce(&mut rng, 0), 0x0102_0304);
    }
}
