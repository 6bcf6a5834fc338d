//! Command handlers for chatsdj
//!
//! Each submodule implements one CLI subcommand.

pub mod credentials;
pub mod models;
pub mod serve;
