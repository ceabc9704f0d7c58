//! Core data model shared between the harness and tooling

pub mod frame;
pub mod record;
