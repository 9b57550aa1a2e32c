//! Shared utilities for marketbrief-rs
//!
//! This crate provides common functionality used across the marketbrief
//! workspace, including logging setup and environment variable helpers.

pub mod env;
pub mod logging;

pub use env::env_nonempty;
pub use logging::init_tracing;
