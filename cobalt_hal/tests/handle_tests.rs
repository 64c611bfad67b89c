//! Handle manager concurrency and lifecycle tests.
//!
//! Managers are shared across threads here exactly as interrupt callbacks,
//! notifier threads and the control loop share them at runtime.

use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

use cobalt_common::hal::handle::{Counter, Dio, Interrupt, RawHandle, decode};
use cobalt_common::hal::status::HalError;
use cobalt_hal::{
    HandleResource, IndexedHandleResource, LimitedHandleResource, LimitedIndexedHandleResource,
};

const THREADS: usize = 8;

#[test]
fn test_concurrent_first_fit_allocations_are_unique() {
    let manager = Arc::new(LimitedHandleResource::<Counter, usize, 64>::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..8)
                    .map(|i| manager.allocate(t * 8 + i).expect("slot available"))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let handles: Vec<_> = workers
        .into_iter()
        .flat_map(|w| w.join().expect("worker panicked"))
        .collect();

    let indices: HashSet<u8> = handles.iter().map(|h| h.index()).collect();
    assert_eq!(indices.len(), 64);
    assert_eq!(manager.live_count(), 64);
    assert_eq!(
        manager.allocate(0),
        Err(HalError::NoAvailableResources { capacity: 64 })
    );

    // Every handle resolves to the value its own thread stored.
    for h in &handles {
        let value = *manager.get(*h).expect("live handle");
        assert!(value < 64);
    }
}

#[test]
fn test_contended_channel_has_exactly_one_winner() {
    let manager = Arc::new(IndexedHandleResource::<Dio, usize, 4>::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                manager.allocate(2, t)
            })
        })
        .collect();
    let results: Vec<_> = workers
        .into_iter()
        .map(|w| w.join().expect("worker panicked"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == HalError::ResourceAlreadyAllocated { index: 2 })
    );
}

#[test]
fn test_churn_never_repeats_a_live_handle() {
    let manager = Arc::new(LimitedHandleResource::<Counter, u32, 4>::new());

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for i in 0..200u32 {
                    let h = manager.allocate(i).expect("one slot per thread");
                    assert_eq!(*manager.get(h).expect("own handle"), i);
                    manager.free(h);
                    assert!(manager.get(h).is_err());
                }
            })
        })
        .collect();

    for w in workers {
        w.join().expect("worker panicked");
    }
    assert_eq!(manager.live_count(), 0);
}

#[test]
fn test_generation_distinguishes_reuse_of_same_slot() {
    let manager = IndexedHandleResource::<Dio, &'static str, 8>::new();
    let mut raws = HashSet::new();
    let mut previous = None;

    for _ in 0..10 {
        let h = manager.allocate(3, "port").unwrap();
        assert!(raws.insert(RawHandle::from(h)));
        if let Some(stale) = previous {
            assert_eq!(manager.get(stale), Err(HalError::InvalidHandle));
        }
        manager.free(h);
        previous = Some(h);
    }

    let generations: HashSet<u8> = raws
        .iter()
        .map(|raw| decode(*raw).unwrap().generation)
        .collect();
    assert_eq!(generations.len(), 10);
}

#[test]
fn test_free_is_idempotent_and_ignores_stale() {
    let manager = LimitedIndexedHandleResource::<Interrupt, u8, 8>::new(2);
    let h1 = manager.allocate(0, 1).unwrap();
    assert!(manager.free(h1).is_some());
    assert!(manager.free(h1).is_none());

    let h2 = manager.allocate(0, 2).unwrap();
    // Freeing the stale handle must not touch the new occupant.
    assert!(manager.free(h1).is_none());
    assert_eq!(*manager.get(h2).unwrap(), 2);
}

#[test]
fn test_limited_indexed_error_precedence() {
    let manager = LimitedIndexedHandleResource::<Interrupt, u8, 8>::new(1);
    let _h = manager.allocate(5, 0).unwrap();

    assert_eq!(
        manager.allocate(8, 0),
        Err(HalError::ChannelIndexOutOfRange { index: 8, capacity: 8 })
    );
    assert_eq!(
        manager.allocate(5, 0),
        Err(HalError::ResourceAlreadyAllocated { index: 5 })
    );
    assert_eq!(
        manager.allocate(6, 0),
        Err(HalError::ResourceExhausted { limit: 1 })
    );
}

#[test]
fn test_reset_invalidates_outstanding_handles() {
    let manager = IndexedHandleResource::<Dio, u8, 4>::new();
    let a = manager.allocate(0, 1).unwrap();
    let b = manager.allocate(1, 2).unwrap();
    manager.reset();
    assert_eq!(manager.live_count(), 0);
    assert!(manager.get(a).is_err());
    assert!(manager.get(b).is_err());

    let a2 = manager.allocate(0, 3).unwrap();
    assert_ne!(a, a2);
    assert!(manager.get(a).is_err());
}
