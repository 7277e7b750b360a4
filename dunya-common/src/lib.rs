//! # Dunya Common Library
//!
//! Shared code for the Dunya extractor crates:
//! - Common error type
//! - TOML bootstrap configuration
//! - Tracing initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
