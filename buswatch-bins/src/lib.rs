//! Shared helpers for the buswatch binaries

pub mod common;
