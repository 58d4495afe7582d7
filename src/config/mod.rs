//! Configuration module for the search daemon
//!
//! This module provides the `SearchConfig` struct, its builder, and the
//! environment loader that overrides defaults from `SEARCHD_*` variables.

pub mod builder;
pub mod env;
pub mod getters;
pub mod types;

pub use builder::SearchConfigBuilder;
pub use env::{parse_duration, parse_language};
pub use types::{DatabaseConfig, SearchConfig};
