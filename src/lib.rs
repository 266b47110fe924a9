//! A time-ordered unique ID generator in the style of [Twitter's Snowflake].
//!
//! Every identifier is a 64-bit integer packing three fields: milliseconds
//! since a fixed epoch (42 bits), a machine id (6 bits), and a per-millisecond
//! sequence number (16 bits). Identifiers produced for one machine id are
//! strictly increasing, and identifiers can be rendered as (and parsed back
//! from) a compact base-36 string.
//!
//! ## Quickstart
//!
//! Add the following to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! flakeid = "0.1"
//! ```
//!
//! Use the library like this:
//!
//! ```
//! use flakeid::Registry;
//!
//! let registry = Registry::new().unwrap();
//! let id = registry.next_id().unwrap();
//! println!("{}", id);
//! println!("{}", flakeid::to_alpha(id));
//! ```
//!
//! ## Multiple machine ids
//!
//! The [`Registry`] hands out one [`Generator`] per machine id and caches it,
//! evicting generators that go unused for the configured idle window:
//!
//! ```
//! use flakeid::Registry;
//!
//! let registry = Registry::new().unwrap();
//! let id = registry.next_id_for(7).unwrap();
//! let parts = flakeid::decode(id);
//! assert_eq!(parts.machine_id, 7);
//! ```
//!
//! ## Concurrent use
//!
//! `Registry` is thread-safe; share it behind an `Arc`:
//!
//! ```
//! use flakeid::Registry;
//! use std::{sync::Arc, thread};
//!
//! let registry = Arc::new(Registry::new().unwrap());
//!
//! let mut children = Vec::new();
//! for _ in 0..10 {
//!     let thread_registry = Arc::clone(&registry);
//!     children.push(thread::spawn(move || {
//!         println!("{}", thread_registry.next_id().unwrap());
//!     }));
//! }
//!
//! for child in children {
//!     child.join().unwrap();
//! }
//! ```
//!
//! [Twitter's Snowflake]: https://blog.twitter.com/2010/announcing-snowflake

mod builder;
mod clock;
mod codec;
mod error;
mod generator;
mod registry;
#[cfg(test)]
mod tests;

pub use builder::*;
pub use clock::*;
pub use codec::*;
pub use error::*;
pub use generator::*;
pub use registry::*;
