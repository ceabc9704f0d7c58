//! Shared types and utilities for nicbench
//!
//! This crate contains the wire-level data model (frames, messages, captured
//! records) and the frame codec used by both the harness and any external
//! tooling that inspects recorded traffic.

pub mod protocol;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use types::{frame::*, record::*};
