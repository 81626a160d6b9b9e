// Rigminer - Free and Open Source Software Statement
//
// File: tests/device_loop.rs
// Version: 1.0.0
//
// Drives single devices directly, without a Miner: job handoff, per-dispatch
// header preparation, solution delivery and teardown.
//
// Tree Location:
// - tests/device_loop.rs
// - Depends on: rigminer, tokio

mod common;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use common::*;
use rigminer::accelerator::DeviceKind;
use rigminer::core::diff_one_target;
use rigminer::core::header::HeaderHasher;
use rigminer::core::types::{ShareResult, unix_time};
use rigminer::miner::device::{
    Device, DeviceArena, DeviceSetup, DeviceState, ShareAssessor, SolutionRouter,
};
use rigminer::telemetry::NoTelemetry;
use tokio::sync::mpsc::UnboundedReceiver;

fn setup(hasher: Arc<dyn HeaderHasher>) -> (DeviceSetup, UnboundedReceiver<ShareResult>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let setup = DeviceSetup {
        telemetry: Arc::new(NoTelemetry),
        assessor: Arc::new(ShareAssessor::new(diff_one_target(), false, hasher)),
        results: tx,
        arena: Arc::new(DeviceArena::new()),
    };
    (setup, rx)
}

fn stop_and_join(device: &Device, thread: std::thread::JoinHandle<()>) {
    device.stop();
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = done_tx.send(thread.join().is_ok());
    });
    let joined = done_rx
        .recv_timeout(Duration::from_secs(10))
        .expect("device thread did not exit");
    assert!(joined, "device thread panicked");
}

#[test]
fn saturated_handoff_never_blocks() {
    let (setup, _rx) = setup(FixedHasher::winning());
    let (binding, _) = MockBinding::new(0, DeviceKind::Cpu);
    let device = Device::new(Box::new(binding), None, &setup).unwrap();
    let work = Arc::new(test_work(false, 1000, 1000));

    let started = Instant::now();
    assert!(device.set_work(Arc::clone(&work)));
    assert!(!device.set_work(Arc::clone(&work)));
    assert!(!device.set_work(work));
    assert!(started.elapsed() < Duration::from_millis(100));
    assert_eq!(device.state(), DeviceState::AwaitingWork);
}

#[test]
fn pull_style_work_rolls_its_timestamp_forward() {
    let (setup, _rx) = setup(FixedHasher::garbage());
    let (binding, probe) = MockBinding::new(0, DeviceKind::AmdGpu);
    let device = Device::new(Box::new(binding), None, &setup).unwrap();
    let thread = device.spawn().unwrap();

    let received = unix_time() - 30;
    assert!(device.set_work(Arc::new(test_work(true, 1000, received))));
    assert!(wait_until_blocking(|| probe.dispatches() >= 2));
    stop_and_join(&device, thread);

    for header in probe.headers() {
        assert!(header.timestamp >= 1030, "timestamp {}", header.timestamp);
        assert!(header.timestamp < 1030 + 60);
    }
}

#[test]
fn push_style_work_keeps_the_job_time() {
    let (setup, _rx) = setup(FixedHasher::garbage());
    let (binding, probe) = MockBinding::new(0, DeviceKind::AmdGpu);
    let device = Device::new(Box::new(binding), None, &setup).unwrap();
    let thread = device.spawn().unwrap();

    assert!(device.set_work(Arc::new(test_work(false, 1000, unix_time() - 30))));
    assert!(wait_until_blocking(|| probe.dispatches() >= 2));
    stop_and_join(&device, thread);

    assert!(probe.headers().iter().all(|h| h.timestamp == 1000));
}

#[test]
fn every_dispatch_gets_a_fresh_extra_nonce_in_the_device_partition() {
    let (setup, _rx) = setup(FixedHasher::garbage());
    let (binding, probe) = MockBinding::new(5, DeviceKind::AmdGpu);
    let device = Device::new(Box::new(binding), None, &setup).unwrap();
    let thread = device.spawn().unwrap();

    assert!(device.set_work(Arc::new(test_work(false, 1000, 1000))));
    assert!(wait_until_blocking(|| probe.dispatches() >= 4));
    stop_and_join(&device, thread);

    let extra_nonces: Vec<u32> = probe.headers().iter().map(|h| h.extra_nonce()).collect();
    assert!(extra_nonces.len() >= 4);
    assert!(extra_nonces.iter().all(|n| n >> 24 == 5));
    for pair in extra_nonces.windows(2) {
        assert_eq!(pair[1] & 0x00FF_FFFF, (pair[0] & 0x00FF_FFFF) + 1);
    }
}

#[test]
fn newer_job_replaces_the_current_one() {
    let (setup, _rx) = setup(FixedHasher::garbage());
    let (binding, probe) = MockBinding::new(0, DeviceKind::AmdGpu);
    let device = Device::new(Box::new(binding), None, &setup).unwrap();
    let thread = device.spawn().unwrap();

    assert!(device.set_work(Arc::new(test_work(false, 1000, 1000))));
    assert!(wait_until_blocking(|| probe.dispatches() >= 2));
    assert!(wait_until_blocking(|| device.set_work(Arc::new(test_work(false, 2000, 2000)))));
    assert!(wait_until_blocking(|| probe
        .headers()
        .last()
        .map(|h| h.timestamp == 2000)
        .unwrap_or(false)));
    stop_and_join(&device, thread);
}

#[test]
fn solution_becomes_a_share_on_the_result_channel() {
    let (setup, mut rx) = setup(FixedHasher::winning());
    let armed = Arc::new(AtomicBool::new(true));
    let (binding, _) = MockBinding::new(3, DeviceKind::AmdGpu);
    let device = Device::new(
        Box::new(binding.emitting(armed, vec![0x11, 0x22, 0x33])),
        None,
        &setup,
    )
    .unwrap();
    let thread = device.spawn().unwrap();

    assert!(device.set_work(Arc::new(test_work(false, 1000, 1000))));
    assert!(wait_until_blocking(|| device.core().counters().valid() == 1));
    stop_and_join(&device, thread);

    let share = rx.try_recv().unwrap();
    assert_eq!(share.device_index, 3);
    assert_eq!(share.solution, vec![0x11, 0x22, 0x33]);
    assert_eq!(share.work.header.solution, share.solution);
    assert_eq!(share.data, share.work.header.serialize());
    assert_eq!(share.work.header.extra_nonce() >> 24, 3);
    assert!(rx.try_recv().is_err());
    assert_eq!(device.core().counters().diff_one(), 1);
}

#[test]
fn teardown_releases_the_binding_and_drops_late_solutions() {
    let (setup, mut rx) = setup(FixedHasher::winning());
    let (binding, probe) = MockBinding::new(0, DeviceKind::AmdGpu);
    let device = Device::new(Box::new(binding), None, &setup).unwrap();
    assert_eq!(setup.arena.live(), 1);
    let thread = device.spawn().unwrap();
    assert!(device.spawn().is_err());

    assert!(device.set_work(Arc::new(test_work(false, 1000, 1000))));
    assert!(wait_until_blocking(|| probe.dispatches() >= 1));
    stop_and_join(&device, thread);

    assert!(probe.released());
    assert_eq!(device.state(), DeviceState::Stopped);
    assert_eq!(setup.arena.live(), 0);

    let router = SolutionRouter::new(Arc::clone(&setup.arena));
    let handle = probe.handle().unwrap();
    assert_eq!(handle, device.handle());
    assert!(!router.deliver(handle, &[1, 2, 3]));
    assert!(rx.try_recv().is_err());
    assert_eq!(device.core().counters().valid(), 0);
}

#[test]
fn dropping_an_unstarted_device_releases_its_binding() {
    let (setup, _rx) = setup(FixedHasher::winning());
    let (binding, probe) = MockBinding::new(0, DeviceKind::Cpu);
    let device = Device::new(Box::new(binding), None, &setup).unwrap();
    assert!(!probe.released());

    drop(device);
    assert!(probe.released());
    assert_eq!(setup.arena.live(), 0);
}
