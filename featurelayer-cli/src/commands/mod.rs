//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration inspection (path, show)
//! - [`sync`] - Run reconciliation cycles against a live service
//! - [`tiles`] - Show the tiles a viewport maps to

pub mod common;
pub mod config;
pub mod sync;
pub mod tiles;
