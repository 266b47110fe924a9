use chrono::Utc;

/// A wall-clock time source, in milliseconds since the Unix epoch.
///
/// Reading time never fails; small backward jumps of the underlying clock
/// are tolerated by [`Generator::next_id`], which reports them as
/// [`Error::ClockRegression`] instead of producing out-of-order ids.
///
/// The trait exists so tests (and hosts with their own time discipline) can
/// inject a frozen or scripted clock.
///
/// [`Generator::next_id`]: crate::Generator::next_id
/// [`Error::ClockRegression`]: crate::Error::ClockRegression
pub trait Clock {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// The default [`Clock`], backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        Utc::now().timestamp_millis() as u64
    }
}
