// Rigminer - Free and Open Source Software Statement
//
// File: tests/common/mod.rs
// Version: 1.0.0
//
// Scriptable stand-ins for the accelerator runtime, header hasher, telemetry
// backend and node/pool clients, shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rigminer::accelerator::{AcceleratorBinding, AcceleratorRuntime, DeviceInfo, DeviceKind, InitOutcome};
use rigminer::core::difficulty::{U256, diff_one_target};
use rigminer::core::header::{BlockHeader, HeaderHasher};
use rigminer::core::types::{Work, unix_time};
use rigminer::miner::device::{DeviceHandle, SolutionRouter};
use rigminer::telemetry::{FanAdjustment, FanTemp, HealthTelemetry, TelemetryError};
use rigminer::upstream::{BoxFuture, NodeClient, PoolSubmitter, UpstreamError};

/// What a test can observe about a mock binding after handing it to a miner.
#[derive(Clone, Default)]
pub struct BindingProbe {
    pub dispatches: Arc<AtomicU64>,
    pub headers: Arc<Mutex<Vec<Vec<u8>>>>,
    pub released: Arc<AtomicBool>,
    pub handle: Arc<Mutex<Option<DeviceHandle>>>,
}

impl BindingProbe {
    pub fn dispatches(&self) -> u64 {
        self.dispatches.load(Ordering::SeqCst)
    }

    pub fn headers(&self) -> Vec<BlockHeader> {
        self.headers
            .lock()
            .unwrap()
            .iter()
            .map(|bytes| BlockHeader::from_bytes(bytes).unwrap())
            .collect()
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn handle(&self) -> Option<DeviceHandle> {
        *self.handle.lock().unwrap()
    }
}

pub struct MockBinding {
    info: DeviceInfo,
    emit: Option<(Arc<AtomicBool>, Vec<u8>)>,
    pause: Duration,
    probe: BindingProbe,
}

impl MockBinding {
    pub fn new(index: usize, kind: DeviceKind) -> (Self, BindingProbe) {
        let probe = BindingProbe::default();
        let binding = Self {
            info: DeviceInfo {
                index,
                name: format!("mock {}", index),
                kind,
            },
            emit: None,
            pause: Duration::from_millis(2),
            probe: probe.clone(),
        };
        (binding, probe)
    }

    /// Deliver `solution` on the first dispatch that finds `armed` set,
    /// clearing it. Several bindings sharing one flag emit once in total.
    pub fn emitting(mut self, armed: Arc<AtomicBool>, solution: Vec<u8>) -> Self {
        self.emit = Some((armed, solution));
        self
    }
}

impl AcceleratorBinding for MockBinding {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn solve(
        &mut self,
        header: &[u8],
        _nonce: u32,
        handle: DeviceHandle,
        router: &SolutionRouter,
    ) -> anyhow::Result<()> {
        self.probe.dispatches.fetch_add(1, Ordering::SeqCst);
        *self.probe.handle.lock().unwrap() = Some(handle);
        {
            let mut headers = self.probe.headers.lock().unwrap();
            if headers.len() == 64 {
                headers.remove(0);
            }
            headers.push(header.to_vec());
        }
        if let Some((armed, solution)) = &self.emit {
            if armed.swap(false, Ordering::SeqCst) {
                // Completion callbacks arrive on a driver thread.
                std::thread::scope(|s| {
                    s.spawn(|| router.deliver(handle, solution));
                });
            }
        }
        std::thread::sleep(self.pause);
        Ok(())
    }

    fn release(&mut self) {
        self.probe.released.store(true, Ordering::SeqCst);
    }
}

pub struct MockRuntime {
    bindings: Mutex<Vec<Box<dyn AcceleratorBinding>>>,
}

impl MockRuntime {
    pub fn new(bindings: Vec<MockBinding>) -> Self {
        Self {
            bindings: Mutex::new(
                bindings
                    .into_iter()
                    .map(|b| Box::new(b) as Box<dyn AcceleratorBinding>)
                    .collect(),
            ),
        }
    }
}

impl AcceleratorRuntime for MockRuntime {
    fn name(&self) -> &str {
        "mock"
    }

    fn enumerate(&self) -> anyhow::Result<Vec<Box<dyn AcceleratorBinding>>> {
        Ok(std::mem::take(&mut *self.bindings.lock().unwrap()))
    }
}

/// Returns the same hash for every header.
pub struct FixedHasher(pub [u8; 32]);

impl FixedHasher {
    /// Clears any target.
    pub fn winning() -> Arc<Self> {
        Arc::new(Self([0; 32]))
    }

    /// Above the difficulty-one bound.
    pub fn garbage() -> Arc<Self> {
        Arc::new(Self([0xFF; 32]))
    }
}

impl HeaderHasher for FixedHasher {
    fn hash(&self, _: &[u8]) -> [u8; 32] {
        self.0
    }
}

pub struct MockTelemetry {
    reading: Mutex<FanTemp>,
    pub adjustments: Mutex<Vec<(usize, u32, FanAdjustment)>>,
}

impl MockTelemetry {
    pub fn new(fan_percent: u32, temperature: u32) -> Arc<Self> {
        Arc::new(Self {
            reading: Mutex::new(FanTemp {
                fan_percent,
                temperature,
            }),
            adjustments: Mutex::new(Vec::new()),
        })
    }

    pub fn set_reading(&self, fan_percent: u32, temperature: u32) {
        *self.reading.lock().unwrap() = FanTemp {
            fan_percent,
            temperature,
        };
    }

    pub fn adjustments(&self) -> Vec<(usize, u32, FanAdjustment)> {
        self.adjustments.lock().unwrap().clone()
    }
}

impl HealthTelemetry for MockTelemetry {
    fn initialize(&self) -> Result<InitOutcome, TelemetryError> {
        Ok(InitOutcome::AlreadyInitialized)
    }

    fn poll(&self, _index: usize) -> Result<FanTemp, TelemetryError> {
        Ok(*self.reading.lock().unwrap())
    }

    fn adjust_fan(
        &self,
        index: usize,
        current_percent: u32,
        adjustment: FanAdjustment,
    ) -> Result<(), TelemetryError> {
        self.adjustments
            .lock()
            .unwrap()
            .push((index, current_percent, adjustment));
        Ok(())
    }
}

pub struct MockNode {
    work: Work,
    outcome: Result<bool, UpstreamError>,
    pub get_work_calls: AtomicU64,
    pub submissions: AtomicU64,
}

impl MockNode {
    pub fn new(work: Work, accept: bool) -> Arc<Self> {
        Self::answering(work, Ok(accept))
    }

    /// A node whose submissions fail in transit.
    pub fn unreachable(work: Work) -> Arc<Self> {
        Self::answering(work, Err(UpstreamError::Transport("connection reset".to_string())))
    }

    fn answering(work: Work, outcome: Result<bool, UpstreamError>) -> Arc<Self> {
        Arc::new(Self {
            work,
            outcome,
            get_work_calls: AtomicU64::new(0),
            submissions: AtomicU64::new(0),
        })
    }

    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn get_work_calls(&self) -> u64 {
        self.get_work_calls.load(Ordering::SeqCst)
    }
}

impl NodeClient for MockNode {
    fn get_work(&self) -> BoxFuture<'_, Result<Work, UpstreamError>> {
        self.get_work_calls.fetch_add(1, Ordering::SeqCst);
        let mut work = self.work.clone();
        work.time_received = unix_time();
        Box::pin(async move { Ok(work) })
    }

    fn submit_work(&self, _data: Vec<u8>) -> BoxFuture<'_, Result<bool, UpstreamError>> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

/// A pool that answers every submission the same way.
pub struct ScriptedPool {
    outcome: Result<bool, UpstreamError>,
    pub submissions: AtomicU64,
}

impl ScriptedPool {
    fn answering(outcome: Result<bool, UpstreamError>) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            submissions: AtomicU64::new(0),
        })
    }

    pub fn stale() -> Arc<Self> {
        Self::answering(Err(UpstreamError::Stale))
    }

    pub fn accepting() -> Arc<Self> {
        Self::answering(Ok(true))
    }

    pub fn unreachable() -> Arc<Self> {
        Self::answering(Err(UpstreamError::Transport("broken pipe".to_string())))
    }

    pub fn refusing() -> Arc<Self> {
        Self::answering(Ok(false))
    }

    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }
}

impl PoolSubmitter for ScriptedPool {
    fn submit(&self, _data: Vec<u8>) -> BoxFuture<'_, Result<bool, UpstreamError>> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

pub fn test_work(is_getwork: bool, job_time: u32, time_received: u32) -> Work {
    let header = BlockHeader {
        version: 4,
        prev_block: [0xAB; 32],
        merkle_root: [0xCD; 32],
        bits: 0x1d00ffff,
        timestamp: job_time,
        ..BlockHeader::default()
    };
    Work::new(
        header,
        diff_one_target() >> 8,
        job_time,
        time_received,
        is_getwork,
        Some("job-1".to_string()),
    )
    .unwrap()
}

pub fn any_target() -> U256 {
    U256::MAX
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

pub fn wait_until_blocking(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
