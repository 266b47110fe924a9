use crate::builder::Builder;
use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::error::Error;
use crate::generator::{validate_machine_id, Generator};
use moka::sync::Cache;
use std::sync::Arc;
use tracing::debug;

/// A keyed cache of [`Generator`] instances, one per machine id.
///
/// The registry hands back the same generator for repeated requests for a
/// machine id, which is what keeps that machine id's identifier stream
/// strictly increasing. Generators that go unused for the configured idle
/// window are evicted to bound memory; eviction is an optimization only.
///
/// A boundary condition follows from eviction: a generator recreated after
/// eviction restarts its sequence at 0, so an id minted at the exact same
/// millisecond as one minted just before the eviction could repeat a
/// sequence number. The default two-minute idle window is large relative to
/// clock resolution precisely to keep that window unreachable in practice.
/// Deployments that cannot tolerate it should hold the generators they use
/// directly (see [`Registry::get`]) instead of relying on re-lookup.
///
/// The registry is an explicitly constructed value; create one per process
/// and share it behind an `Arc`.
pub struct Registry<C = SystemClock> {
    cache: Cache<u8, Arc<Generator<C>>>,
    clock: C,
    default_machine_id: u8,
}

impl Registry<SystemClock> {
    /// Create a registry with the default configuration.
    /// For custom configuration see [`builder`].
    ///
    /// [`builder`]: Registry::builder
    pub fn new() -> Result<Self, Error> {
        Builder::new().finalize()
    }

    /// Create a new [`Builder`] to construct a registry.
    pub fn builder() -> Builder<SystemClock> {
        Builder::new()
    }
}

impl<C> Registry<C>
where
    C: Clock + Clone + Send + Sync + 'static,
{
    pub(crate) fn new_inner(cache: Cache<u8, Arc<Generator<C>>>, clock: C, default_machine_id: u8) -> Self {
        Self {
            cache,
            clock,
            default_machine_id,
        }
    }

    /// Return the generator bound to `machine_id`, creating and caching it
    /// on first request.
    ///
    /// Creation happens at most once per cold key even under concurrent
    /// lookups. The returned `Arc` stays valid across an eviction; a holder
    /// keeps minting correct ids from it while newly arriving callers get a
    /// fresh instance.
    pub fn get(&self, machine_id: i32) -> Result<Arc<Generator<C>>, Error> {
        let machine_id = validate_machine_id(machine_id)?;
        Ok(self.cache.get_with(machine_id, || {
            debug!(machine_id, "creating generator");
            Arc::new(Generator::with_validated(machine_id, self.clock.clone()))
        }))
    }

    /// Generate the next identifier for the configured default machine id.
    pub fn next_id(&self) -> Result<u64, Error> {
        self.next_id_for(i32::from(self.default_machine_id))
    }

    /// Generate the next identifier for `machine_id`.
    pub fn next_id_for(&self, machine_id: i32) -> Result<u64, Error> {
        self.get(machine_id)?.next_id()
    }

    /// Generate the next identifier for the default machine id, in its
    /// base-36 textual form.
    pub fn next_alpha(&self) -> Result<String, Error> {
        self.next_alpha_for(i32::from(self.default_machine_id))
    }

    /// Generate the next identifier for `machine_id`, in its base-36
    /// textual form.
    pub fn next_alpha_for(&self, machine_id: i32) -> Result<String, Error> {
        Ok(codec::to_alpha(self.next_id_for(machine_id)?))
    }

    /// The machine id used by [`next_id`] and [`next_alpha`].
    ///
    /// [`next_id`]: Registry::next_id
    /// [`next_alpha`]: Registry::next_alpha
    pub fn default_machine_id(&self) -> u8 {
        self.default_machine_id
    }

    /// Run any pending cache maintenance, including idle eviction.
    ///
    /// Eviction otherwise piggybacks on cache accesses; calling this is only
    /// needed to make eviction deterministic, e.g. in tests or before
    /// inspecting [`cached_generators`].
    ///
    /// [`cached_generators`]: Registry::cached_generators
    pub fn sweep(&self) {
        self.cache.run_pending_tasks();
    }

    /// Number of generators currently cached.
    pub fn cached_generators(&self) -> u64 {
        self.cache.entry_count()
    }
}
