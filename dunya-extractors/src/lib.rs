//! dunya-extractors - extractor module contract
//!
//! An extractor module analyses one music file and returns named outputs.
//! This crate provides the shared bookkeeping every module needs:
//! - [`settings`] - named configuration options
//! - [`cache`] - shared (Redis) or local key/value cache
//! - [`logger`] - tracing with module and document context
//! - [`metadata`] - declared slug, version, inputs, dependencies and outputs
//! - [`module`] - the [`ExtractorModule`] trait and [`ModuleBase`]
//! - [`output`] - values returned by a run
//! - [`registry`] - constructors by slug
//! - [`extractors`] - reference modules

pub mod cache;
pub mod error;
pub mod extractors;
pub mod logger;
pub mod metadata;
pub mod module;
pub mod output;
pub mod registry;
pub mod settings;

pub use crate::error::{ExtractorError, Result};
pub use crate::metadata::{Depends, ModuleMetadata, OutputDecl, OutputFormat};
pub use crate::module::{construct, DocumentRef, ExtractorModule, ModuleBase};
pub use crate::output::{ModuleOutputs, OutputData, OutputValue};
pub use crate::registry::ModuleRegistry;
pub use crate::settings::Settings;
