use crate::{
    codec::{self, EPOCH_MILLIS, MAX_SEQUENCE, MAX_TIMESTAMP},
    error::Error,
    Clock, Generator, Registry,
};
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

/// A clock frozen at a single instant.
#[derive(Clone)]
struct FixedClock(u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}

/// A clock that jumps backwards after its first reading.
#[derive(Clone)]
struct RegressingClock {
    start: u64,
    delta: u64,
    calls: Arc<AtomicU64>,
}

impl RegressingClock {
    fn new(start: u64, delta: u64) -> Self {
        Self {
            start,
            delta,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Clock for RegressingClock {
    fn now_millis(&self) -> u64 {
        if self.calls.fetch_add(1, Ordering::Relaxed) == 0 {
            self.start
        } else {
            self.start - self.delta
        }
    }
}

/// A clock that stays on one millisecond for a fixed number of readings,
/// then ticks over to the next.
#[derive(Clone)]
struct StallingClock {
    base: u64,
    readings_at_base: u64,
    calls: Arc<AtomicU64>,
}

impl StallingClock {
    fn new(base: u64, readings_at_base: u64) -> Self {
        Self {
            base,
            readings_at_base,
            calls: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Clock for StallingClock {
    fn now_millis(&self) -> u64 {
        if self.calls.fetch_add(1, Ordering::Relaxed) < self.readings_at_base {
            self.base
        } else {
            self.base + 1
        }
    }
}

#[test]
fn test_next_id() -> Result<(), Error> {
    let registry = Registry::new()?;
    assert!(registry.next_id().is_ok());
    Ok(())
}

#[test]
fn test_encode_decode_roundtrip() -> Result<(), Error> {
    for (ts, machine_id, sequence) in [
        (0, 0, 0),
        (1_000, 42, 1),
        (123_456_789, 63, 16_383),
        (MAX_TIMESTAMP, 1, 7),
    ] {
        let id = codec::encode(ts, machine_id, sequence)?;
        let parts = codec::decode(id);
        assert_eq!(parts.timestamp_millis, ts + EPOCH_MILLIS);
        assert_eq!(parts.machine_id, machine_id);
        assert_eq!(parts.sequence, sequence);
        assert_eq!(parts.id, id);
    }
    Ok(())
}

// The sequence field is 16 bits wide; decoding must not truncate it to the
// 6-bit machine id width.
#[test]
fn test_decode_keeps_full_sequence_width() -> Result<(), Error> {
    let id = codec::encode(500, 5, MAX_SEQUENCE)?;
    let parts = codec::decode(id);
    assert_eq!(parts.sequence, MAX_SEQUENCE);
    assert_eq!(parts.machine_id, 5);
    Ok(())
}

#[test]
fn test_alpha_roundtrip() -> Result<(), Error> {
    for id in [0u64, 1, 35, 36, 42_424_242, u64::MAX] {
        let alpha = codec::to_alpha(id);
        assert_eq!(codec::from_alpha(&alpha)?, id);
        // Parsing is case-insensitive.
        assert_eq!(codec::from_alpha(&alpha.to_uppercase())?, id);
    }
    assert_eq!(codec::to_alpha(0), "0");
    assert_eq!(codec::to_alpha(35), "z");
    assert_eq!(codec::to_alpha(36), "10");
    Ok(())
}

#[test]
fn test_malformed_alpha() {
    for input in ["", "not alpha!", "??", "zzzzzzzzzzzzz"] {
        assert!(
            matches!(codec::from_alpha(input), Err(Error::MalformedAlphaId(_))),
            "expected MalformedAlphaId for {:?}",
            input
        );
    }
}

#[test]
fn test_encode_field_overflow() {
    assert!(matches!(
        codec::encode(MAX_TIMESTAMP + 1, 0, 0),
        Err(Error::FieldOverflow { field: "timestamp", .. })
    ));
    assert!(matches!(
        codec::encode(0, 64, 0),
        Err(Error::FieldOverflow { field: "machine id", .. })
    ));
    assert!(matches!(
        codec::encode(0, 0, MAX_SEQUENCE + 1),
        Err(Error::FieldOverflow { field: "sequence", .. })
    ));
}

#[test]
fn test_machine_id_bounds() {
    assert!(Generator::new(0).is_ok());
    assert!(Generator::new(63).is_ok());
    assert!(matches!(Generator::new(64), Err(Error::InvalidMachineId(64))));
    assert!(matches!(Generator::new(-1), Err(Error::InvalidMachineId(-1))));
}

#[test]
fn test_registry_rejects_invalid_machine_id() -> Result<(), Error> {
    let registry = Registry::new()?;
    assert!(matches!(registry.get(64), Err(Error::InvalidMachineId(64))));
    assert!(matches!(registry.get(-1), Err(Error::InvalidMachineId(-1))));
    Ok(())
}

#[test]
fn test_frozen_clock_sequences() -> Result<(), Error> {
    let registry = Registry::builder()
        .clock(FixedClock(EPOCH_MILLIS + 1_000))
        .default_machine_id(42)
        .finalize()?;

    let first = codec::decode(registry.next_id()?);
    let second = codec::decode(registry.next_id()?);

    assert_eq!(first.machine_id, 42);
    assert_eq!(first.sequence, 0);
    assert_eq!(second.machine_id, 42);
    assert_eq!(second.sequence, 1);
    assert_eq!(first.timestamp_millis, EPOCH_MILLIS + 1_000);
    assert_eq!(second.timestamp_millis, first.timestamp_millis);
    Ok(())
}

#[test]
fn test_clock_regression_is_reported() -> Result<(), Error> {
    let generator = Generator::with_clock(3, RegressingClock::new(EPOCH_MILLIS + 5_000, 250))?;
    assert!(generator.next_id().is_ok());
    assert!(matches!(
        generator.next_id(),
        Err(Error::ClockRegression(250))
    ));
    Ok(())
}

#[test]
fn test_sequence_exhaustion_waits_for_next_millisecond() -> Result<(), Error> {
    let base = EPOCH_MILLIS + 7_777;
    // Enough readings at `base` that the generator exhausts its sequence and
    // has to spin before the tick-over.
    let clock = StallingClock::new(base, 16_386);
    let generator = Generator::with_clock(9, clock)?;

    let calls = MAX_SEQUENCE as usize + 2; // one full millisecond plus one
    let mut last = 0u64;
    for _ in 0..calls {
        let id = generator.next_id()?;
        assert!(id > last, "ids must be strictly increasing");
        last = id;
    }

    let parts = codec::decode(last);
    assert_eq!(parts.timestamp_millis, base + 1);
    assert_eq!(parts.sequence, 0);
    Ok(())
}

#[test]
fn test_registry_reuses_generator() -> Result<(), Error> {
    let registry = Registry::new()?;
    let first = registry.get(7)?;
    let second = registry.get(7)?;
    assert!(Arc::ptr_eq(&first, &second));
    registry.sweep();
    assert_eq!(registry.cached_generators(), 1);
    Ok(())
}

#[test]
fn test_eviction_yields_fresh_generator() -> Result<(), Error> {
    let registry = Registry::builder()
        .idle_window(Duration::from_millis(50))
        .finalize()?;

    let before = registry.get(1)?;
    let id = before.next_id()?;

    thread::sleep(Duration::from_millis(120));
    registry.sweep();

    let after = registry.get(1)?;
    assert!(!Arc::ptr_eq(&before, &after));

    // An id minted before the sweep still decodes correctly.
    let parts = codec::decode(id);
    assert_eq!(parts.machine_id, 1);
    // And a stale handle across an eviction keeps working.
    assert!(before.next_id().is_ok());
    Ok(())
}

#[test]
fn test_threads_uniqueness() -> Result<(), Error> {
    let registry = Arc::new(Registry::new()?);
    let ids = Arc::new(Mutex::new(HashSet::new()));
    let mut children = Vec::new();
    let num_threads = 8;
    let ids_per_thread = 10_000;

    for _ in 0..num_threads {
        let thread_registry = Arc::clone(&registry);
        let thread_ids = Arc::clone(&ids);
        children.push(thread::spawn(move || {
            let mut local_ids = Vec::with_capacity(ids_per_thread);
            let mut last = 0u64;
            for _ in 0..ids_per_thread {
                let id = thread_registry.next_id_for(3).unwrap();
                assert!(id > last, "ids must increase as observed by one thread");
                last = id;
                local_ids.push(id);
            }
            let mut ids_lock = thread_ids.lock().unwrap();
            for id in local_ids {
                assert!(ids_lock.insert(id), "Duplicate ID detected: {}", id);
            }
        }));
    }

    for child in children {
        child.join().expect("Child thread panicked");
    }

    let final_count = ids.lock().unwrap().len();
    assert_eq!(final_count, num_threads * ids_per_thread);
    Ok(())
}

#[test]
fn test_default_machine_id() -> Result<(), Error> {
    let registry = Registry::new()?;
    assert_eq!(registry.default_machine_id(), 42);

    let parts = codec::decode_alpha(&registry.next_alpha()?)?;
    assert_eq!(parts.machine_id, 42);
    Ok(())
}

#[test]
fn test_builder_errors() {
    assert!(matches!(
        Registry::builder().default_machine_id(99).finalize(),
        Err(Error::InvalidMachineId(99))
    ));

    assert!(matches!(
        Registry::builder()
            .clock(FixedClock(EPOCH_MILLIS - 1))
            .finalize(),
        Err(Error::EpochAheadOfCurrentTime(_))
    ));
}

#[test]
fn test_error_send_sync() {
    // This test ensures the Error type is Send + Sync
    let err = Error::MutexPoisoned;
    thread::spawn(move || {
        let _ = err;
    })
    .join()
    .unwrap();
}
