// LogScope - app/mod.rs
//
// Application layer: request orchestration, stored configuration lookup,
// and artifact lifecycle.
// Dependencies: core layer, platform::fs.

pub mod artifacts;
pub mod coordinator;
pub mod store;
