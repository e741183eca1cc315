//! Long-running orchestration.
//!
//! This module owns the watch loop: periodic badge polling and expiry scanning, with
//! cancellation on shutdown. CLI layers call into it and render the emitted events.

mod controller;

pub(crate) use controller::{run_watch, WatchConfig};
