//! Test fixtures
//!
//! Deterministic chains (manual clock, difficulty 1) and helpers for building
//! signed transfers and mining them.

pub mod test_utils;

pub use test_utils::*;
