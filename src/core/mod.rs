// LogHarvest - core/mod.rs
//
// Core business logic layer.
// Dependencies: standard library plus pure data crates (chrono, regex,
// html2text, serde) and the output writers used by `export`.
// Must NOT depend on: platform, app.

pub mod aggregate;
pub mod coerce;
pub mod export;
pub mod model;
pub mod parser;
pub mod timestamp;
