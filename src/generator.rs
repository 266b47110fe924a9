use crate::clock::{Clock, SystemClock};
use crate::codec::{self, EPOCH_MILLIS, MAX_MACHINE_ID, MAX_SEQUENCE, MAX_TIMESTAMP};
use crate::error::Error;
use std::{cmp::Ordering, sync::Mutex, thread};
use tracing::trace;

/// Mutable counters of a [`Generator`]. Touched only inside `next_id`, under
/// the generator's mutex.
#[derive(Debug)]
struct State {
    /// Last wall-clock reading an id was minted at, in unix milliseconds.
    /// Non-decreasing for the lifetime of the generator.
    last_timestamp: u64,
    sequence: u16,
}

/// A stateful id generator bound to one machine id.
///
/// Produces a strictly increasing stream of identifiers: no two calls, from
/// any thread, return the same value. `next_id` is the one blocking operation
/// in the crate; callers targeting the same generator serialize on its
/// internal mutex, callers on different machine ids never contend.
///
/// Most callers should obtain generators through a [`Registry`] rather than
/// constructing them directly, so that repeated requests for a machine id
/// reuse the same sequence state.
///
/// [`Registry`]: crate::Registry
#[derive(Debug)]
pub struct Generator<C = SystemClock> {
    machine_id: u8,
    clock: C,
    state: Mutex<State>,
}

impl Generator<SystemClock> {
    /// Create a standalone generator on the system clock.
    ///
    /// Fails with [`Error::InvalidMachineId`] when `machine_id` is outside
    /// `0..64`.
    pub fn new(machine_id: i32) -> Result<Self, Error> {
        Self::with_clock(machine_id, SystemClock)
    }
}

impl<C: Clock> Generator<C> {
    /// Create a generator on a caller-supplied clock.
    pub fn with_clock(machine_id: i32, clock: C) -> Result<Self, Error> {
        Ok(Self::with_validated(validate_machine_id(machine_id)?, clock))
    }

    pub(crate) fn with_validated(machine_id: u8, clock: C) -> Self {
        Self {
            machine_id,
            clock,
            state: Mutex::new(State {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    /// The machine id embedded in every identifier this generator mints.
    pub fn machine_id(&self) -> u8 {
        self.machine_id
    }

    /// Generate the next unique identifier.
    ///
    /// Within one millisecond the sequence counter disambiguates ids; when it
    /// is exhausted the call spins (yielding the thread) until the clock
    /// advances. A backward clock jump fails the call with
    /// [`Error::ClockRegression`] carrying the regression in milliseconds;
    /// the caller decides whether to retry, back off, or abort.
    pub fn next_id(&self) -> Result<u64, Error> {
        let mut state = self.state.lock().map_err(|_| Error::MutexPoisoned)?;

        let mut now = self.clock.now_millis();
        match now.cmp(&state.last_timestamp) {
            Ordering::Greater => {
                state.last_timestamp = now;
                state.sequence = 0;
            }
            Ordering::Equal => {
                if state.sequence < MAX_SEQUENCE {
                    state.sequence += 1;
                } else {
                    // Sequence exhausted for this millisecond; wait out the
                    // remainder rather than overflow into the machine id
                    // field. Real clocks advance within a few iterations.
                    trace!(
                        machine_id = self.machine_id,
                        "sequence exhausted, waiting for the clock to advance"
                    );
                    loop {
                        thread::yield_now();
                        now = self.clock.now_millis();
                        match now.cmp(&state.last_timestamp) {
                            Ordering::Greater => break,
                            Ordering::Equal => continue,
                            Ordering::Less => {
                                return Err(Error::ClockRegression(state.last_timestamp - now))
                            }
                        }
                    }
                    state.last_timestamp = now;
                    state.sequence = 0;
                }
            }
            Ordering::Less => {
                return Err(Error::ClockRegression(state.last_timestamp - now));
            }
        }

        let elapsed = now.checked_sub(EPOCH_MILLIS).ok_or(Error::FieldOverflow {
            field: "timestamp",
            value: now,
            max: MAX_TIMESTAMP,
        })?;
        codec::encode(elapsed, self.machine_id, state.sequence)
    }

    /// Generate the next unique identifier in its base-36 textual form.
    pub fn next_alpha(&self) -> Result<String, Error> {
        Ok(codec::to_alpha(self.next_id()?))
    }
}

/// Check a caller-supplied machine id against the 6-bit field bound.
pub(crate) fn validate_machine_id(machine_id: i32) -> Result<u8, Error> {
    if (0..i32::from(MAX_MACHINE_ID)).contains(&machine_id) {
        Ok(machine_id as u8)
    } else {
        Err(Error::InvalidMachineId(machine_id))
    }
}
