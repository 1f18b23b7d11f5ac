// LogHarvest - app/mod.rs
//
// Application layer: raw message decoding and batch orchestration.
// Dependencies: core, platform.

pub mod mailbox;
pub mod pipeline;
