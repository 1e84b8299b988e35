//! idbridge CLI library
//!
//! This library exposes the CLI modules for integration testing.
//! The binary is in main.rs.

pub mod backend;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
