// LogScope - platform/mod.rs
//
// Platform layer: config file and directory resolution, filesystem helpers,
// and the Elasticsearch implementation of the core `SearchBackend` seam.
// Dependencies: core (backend trait and model types), util.
// Must NOT depend on: app.

pub mod config;
pub mod es;
pub mod fs;
