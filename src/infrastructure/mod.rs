//! Infrastructure layer
//!
//! Transport framing for graph diffs exchanged between processes.

pub mod wire;

pub use wire::{DiffEnvelope, WireError, WIRE_FORMAT_VERSION};
