use crate::codec::MAX_MACHINE_ID;
use thiserror::Error;

/// The error type for this crate.
///
/// Every failure is surfaced to the caller as a typed variant; nothing is
/// logged-and-ignored inside the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The machine id is outside `0..MAX_MACHINE_ID`. Caller error, not
    /// retryable without fixing the input.
    #[error("machine id `{0}` is out of range 0..{MAX_MACHINE_ID}")]
    InvalidMachineId(i32),
    /// The wall clock moved backwards (NTP correction, VM migration) by the
    /// given number of milliseconds. Transient; retryable after a
    /// caller-chosen backoff.
    #[error("clock moved backwards by {0} ms")]
    ClockRegression(u64),
    /// A field value does not fit its bit width. Unreachable through the
    /// public surface given validated inputs; if it occurs it is a bug.
    #[error("{field} `{value}` exceeds the field maximum {max}")]
    FieldOverflow {
        field: &'static str,
        value: u64,
        max: u64,
    },
    /// The input is not a base-36 string representing a 64-bit identifier.
    #[error("`{0}` is not a valid base-36 identifier")]
    MalformedAlphaId(String),
    #[error("mutex is poisoned (i.e. a panic happened while it was locked)")]
    MutexPoisoned,
    /// The system clock reads earlier than the identifier epoch. Fatal
    /// configuration error, detected when the registry is built.
    #[error("current time {0} ms is earlier than the identifier epoch")]
    EpochAheadOfCurrentTime(u64),
    #[cfg(feature = "ip-fallback")]
    #[error("could not find any private ip address")]
    NoPrivateIp,
}
