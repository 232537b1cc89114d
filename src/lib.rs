// ABOUTME: Library root for ecsroll - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod cluster;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod task;
pub mod types;
