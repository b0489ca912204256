// LogScope - core/mod.rs
//
// Core export engine.
// Pure request logic plus the `SearchBackend` seam; no direct network or
// filesystem access. Output goes to any `AsyncWrite` sink.
// Must NOT depend on: app or platform.

pub mod backend;
pub mod export;
pub mod fields;
pub mod filter;
pub mod model;
pub mod query;
pub mod time;
