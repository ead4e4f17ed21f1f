use conflux::sync::Fence;

use std::mem::ManuallyDrop;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[test]
fn test_new_fence_is_unsignaled() {
    let fence = Fence::new();
    assert!(!fence.signaled());
}

#[test]
fn test_signal_reports_first_transition_only() {
    let fence = Fence::new();

    assert!(fence.signal());
    assert!(!fence.signal());
    assert!(fence.signaled());
}

#[test]
fn test_wait_returns_immediately_when_signaled() {
    let fence = Fence::new();
    fence.signal();

    fence.wait();
    assert!(fence.signaled());
}

#[test]
fn test_reset_clears_the_flag() {
    let fence = Fence::new();
    fence.force_signal();
    fence.reset();

    assert!(!fence.signaled());

    fence.force_signal();
    fence.force_signal();
    assert!(fence.signaled());
}

#[test]
fn test_wait_blocks_until_signaled_from_another_thread() {
    let fence = Arc::new(Fence::new());
    let data = Arc::new(AtomicUsize::new(0));

    let remote_fence = fence.clone();
    let remote_data = data.clone();

    let signaler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        remote_data.store(42, Ordering::Relaxed);
        remote_fence.signal();
    });

    fence.wait();

    assert!(fence.signaled());
    assert_eq!(data.load(Ordering::Relaxed), 42);

    signaler.join().unwrap();
}

#[test]
fn test_fence_can_be_reused_after_reset() {
    let fence = Arc::new(Fence::new());

    for round in 0..5 {
        fence.reset();

        let remote = fence.clone();
        let signaler = thread::spawn(move || {
            thread::sleep(Duration::from_millis(2));
            remote.signal();
        });

        fence.wait();
        assert!(fence.signaled(), "round {round} returned before the signal");

        signaler.join().unwrap();
    }
}

#[test]
fn test_drop_force_signals() {
    let mut fence = ManuallyDrop::new(Fence::new());
    fence.signal();
    fence.reset();

    // SAFETY: the fence holds only atomics and parking state, which stay
    // readable after its destructor ran; it is not dropped again.
    unsafe { ManuallyDrop::drop(&mut fence) };

    assert!(fence.signaled());
}
