use crate::clock::{Clock, SystemClock};
use crate::codec::EPOCH_MILLIS;
use crate::error::Error;
use crate::generator::validate_machine_id;
use crate::registry::Registry;
use moka::sync::Cache;
use std::time::Duration;

#[cfg(feature = "ip-fallback")]
use std::net::{IpAddr, Ipv4Addr};

/// Machine id used when a caller does not specify one: the historical
/// default carried by existing deployments.
pub const DEFAULT_MACHINE_ID: u8 = 42;
/// How long a machine id may go unused before its generator is evicted.
pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_secs(120);

/// A builder for a [`Registry`].
///
/// ```
/// use flakeid::Registry;
/// use std::time::Duration;
///
/// let registry = Registry::builder()
///     .idle_window(Duration::from_secs(300))
///     .default_machine_id(7)
///     .finalize()
///     .unwrap();
/// ```
pub struct Builder<C = SystemClock> {
    idle_window: Duration,
    default_machine_id: i32,
    clock: C,
}

impl Default for Builder<SystemClock> {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder<SystemClock> {
    /// Construct a builder with the system clock, the default machine id
    /// and the default idle window.
    pub fn new() -> Self {
        Self {
            idle_window: DEFAULT_IDLE_WINDOW,
            default_machine_id: i32::from(DEFAULT_MACHINE_ID),
            clock: SystemClock,
        }
    }
}

impl<C> Builder<C> {
    /// Set how long a machine id may go unused before its generator is
    /// evicted from the registry.
    ///
    /// Keep this window large relative to clock resolution; see the
    /// eviction note on [`Registry`].
    pub fn idle_window(mut self, idle_window: Duration) -> Self {
        self.idle_window = idle_window;
        self
    }

    /// Set the machine id used by [`Registry::next_id`] and
    /// [`Registry::next_alpha`]. If it is out of range, `finalize` will fail.
    pub fn default_machine_id(mut self, machine_id: i32) -> Self {
        self.default_machine_id = machine_id;
        self
    }

    /// Derive the default machine id from the last octet (IPv4) or segment
    /// (IPv6) of a private interface address, masked to the 6-bit field.
    ///
    /// Fails with [`Error::NoPrivateIp`] when no private address exists.
    #[cfg(feature = "ip-fallback")]
    pub fn default_machine_id_from_ip(mut self) -> Result<Self, Error> {
        self.default_machine_id = i32::from(machine_id_from_ip().ok_or(Error::NoPrivateIp)?);
        Ok(self)
    }

    /// Replace the time source. Intended for tests and hosts with their own
    /// time discipline.
    pub fn clock<D>(self, clock: D) -> Builder<D> {
        Builder {
            idle_window: self.idle_window,
            default_machine_id: self.default_machine_id,
            clock,
        }
    }

    /// Finish building and create a [`Registry`].
    ///
    /// Fails when the default machine id is out of range, or when the clock
    /// reads earlier than the identifier epoch (a misconfigured platform
    /// clock, caught here once rather than on every call).
    pub fn finalize(self) -> Result<Registry<C>, Error>
    where
        C: Clock + Clone + Send + Sync + 'static,
    {
        let default_machine_id = validate_machine_id(self.default_machine_id)?;

        let now = self.clock.now_millis();
        if now < EPOCH_MILLIS {
            return Err(Error::EpochAheadOfCurrentTime(now));
        }

        let cache = Cache::builder().time_to_idle(self.idle_window).build();
        Ok(Registry::new_inner(cache, self.clock, default_machine_id))
    }
}

/// Get a 6-bit machine id from the host's private IP address (v4 or v6).
#[cfg(feature = "ip-fallback")]
fn machine_id_from_ip() -> Option<u8> {
    if let Some(ipv4) = private_ipv4() {
        return Some(ipv4.octets()[3] & 0x3F);
    }

    if let Some(ipv6) = private_ipv6() {
        return Some((ipv6.segments()[7] & 0x3F) as u8);
    }

    None
}

#[cfg(feature = "ip-fallback")]
fn private_ipv4() -> Option<Ipv4Addr> {
    pnet_datalink::interfaces()
        .iter()
        .filter(|iface| iface.is_up() && !iface.is_loopback() && !iface.ips.is_empty())
        .flat_map(|iface| iface.ips.iter())
        .find_map(|network| match network.ip() {
            IpAddr::V4(ipv4) if is_private_ipv4(&ipv4) => Some(ipv4),
            _ => None,
        })
}

#[cfg(feature = "ip-fallback")]
fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    let octets = ip.octets();
    matches!(octets[0], 10)
        || (octets[0] == 172 && (16..=31).contains(&octets[1]))
        || (octets[0] == 192 && octets[1] == 168)
}

#[cfg(feature = "ip-fallback")]
fn private_ipv6() -> Option<std::net::Ipv6Addr> {
    pnet_datalink::interfaces()
        .iter()
        .filter(|iface| iface.is_up() && !iface.is_loopback() && !iface.ips.is_empty())
        .flat_map(|iface| iface.ips.iter())
        .find_map(|network| match network.ip() {
            IpAddr::V6(ipv6) if is_private_ipv6(&ipv6) => Some(ipv6),
            _ => None,
        })
}

#[cfg(feature = "ip-fallback")]
fn is_private_ipv6(ip: &std::net::Ipv6Addr) -> bool {
    // fc00::/7 (Unique Local Address)
    // fe80::/10 (Link-Local Address)
    (ip.segments()[0] & 0xfe00) == 0xfc00 || (ip.segments()[0] & 0xffc0) == 0xfe80
}
