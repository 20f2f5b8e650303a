// src/utils/log.rs

//! Tracing support for the PGF codec.
//!
//! The library never prints; it emits `tracing` events instead. The image
//! façade logs `debug!` events when a header is set, a stream is opened and
//! each level payload is written or decoded, and the transform emits a
//! `trace!` event per forward/inverse pass. To watch an encode or decode
//! from a binary or a test, install the bundled subscriber first:
//!
//! ```
//! pgf_codec::utils::log::init_subscriber(tracing::Level::DEBUG);
//! ```
//!
//! Applications that already run their own `tracing` subscriber need
//! nothing from this module: the codec's events flow into whatever
//! collector is installed.

pub use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Installs a process-wide stderr subscriber capped at `max_level`.
///
/// A convenience for binaries and tests that want to see level payloads
/// move; `Level::DEBUG` shows per-level progress, `Level::TRACE` adds one
/// event per transform pass. There can only be one global subscriber, so
/// calling this after another has been installed panics.
pub fn init_subscriber(max_level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(max_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("a global tracing subscriber is already installed");
}
