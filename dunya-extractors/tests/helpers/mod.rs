//! Test Helper Utilities
//!
//! Shared utilities for testing dunya-extractors

#![allow(dead_code)]

pub mod log_capture;

pub use log_capture::{capture_logs, LogCapture};
