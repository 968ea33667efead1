//! Shared test infrastructure

pub mod doubles;
pub mod fixtures;
pub mod harness;
