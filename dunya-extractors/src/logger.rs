//! Per-module logger
//!
//! Wraps `tracing` with the context every extractor log line should carry:
//! module slug, module version, and the document / source file being
//! processed. Inside a module use `self.base().logger()`; outside one,
//! build a logger with [`ModuleLogger::for_module`] using the module's slug.

use tracing::Span;

/// Target used for all module log events
pub const LOG_TARGET: &str = "dunya_extractors::module";

/// Logger bound to one module instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLogger {
    slug: String,
    version: String,
    document_id: Option<i64>,
    source_file_id: Option<i64>,
}

macro_rules! module_event {
    ($level:expr, $logger:expr, $message:expr) => {{
        let logger: &ModuleLogger = $logger;
        tracing::event!(
            target: LOG_TARGET,
            $level,
            module = %logger.slug,
            version = %logger.version,
            document_id = ?logger.document_id,
            source_file_id = ?logger.source_file_id,
            "{}",
            $message
        )
    }};
}

impl ModuleLogger {
    /// Logger for a module identified by slug and version
    pub fn for_module(slug: Option<&str>, version: Option<&str>) -> Self {
        Self {
            slug: slug.unwrap_or_default().to_string(),
            version: version.unwrap_or_default().to_string(),
            document_id: None,
            source_file_id: None,
        }
    }

    pub fn set_document_id(&mut self, document_id: i64) {
        self.document_id = Some(document_id);
    }

    pub fn set_source_file_id(&mut self, source_file_id: i64) {
        self.source_file_id = Some(source_file_id);
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn document_id(&self) -> Option<i64> {
        self.document_id
    }

    pub fn source_file_id(&self) -> Option<i64> {
        self.source_file_id
    }

    /// Span carrying the current context, entered for the duration of `run`
    pub fn span(&self) -> Span {
        tracing::info_span!(
            target: LOG_TARGET,
            "extractor",
            module = %self.slug,
            version = %self.version,
            document_id = ?self.document_id,
            source_file_id = ?self.source_file_id,
        )
    }

    pub fn debug(&self, message: impl std::fmt::Display) {
        module_event!(tracing::Level::DEBUG, self, message);
    }

    pub fn info(&self, message: impl std::fmt::Display) {
        module_event!(tracing::Level::INFO, self, message);
    }

    pub fn warn(&self, message: impl std::fmt::Display) {
        module_event!(tracing::Level::WARN, self, message);
    }

    pub fn error(&self, message: impl std::fmt::Display) {
        module_event!(tracing::Level::ERROR, self, message);
    }
}
