//! Extractor module contract
//!
//! A module analyses one file and returns named outputs. Concrete modules
//! embed a [`ModuleBase`] holding the shared bookkeeping (settings, logger,
//! cache, per-document ids) and implement [`ExtractorModule`]:
//!
//! ```rust,ignore
//! static METADATA: ModuleMetadata = ModuleMetadata {
//!     version: Some("1.0"),
//!     source_type: Some("audio"),
//!     slug: Some("pitch"),
//!     ..ModuleMetadata::UNSET
//! };
//!
//! pub struct Pitch {
//!     base: ModuleBase,
//! }
//!
//! impl Pitch {
//!     pub fn new(settings: Settings) -> Result<Self> {
//!         construct(Self { base: ModuleBase::new(&METADATA, settings) })
//!     }
//! }
//!
//! impl ExtractorModule for Pitch {
//!     fn base(&self) -> &ModuleBase { &self.base }
//!     fn base_mut(&mut self) -> &mut ModuleBase { &mut self.base }
//!
//!     fn run(&mut self, file_path: &Path) -> Result<Option<ModuleOutputs>> {
//!         self.base.logger().info(format!("Analysing {}", file_path.display()));
//!         Ok(Some(ModuleOutputs::new().with("pitch", json!([]))))
//!     }
//! }
//! ```

use crate::cache::{self, CacheBackend, LocalCache};
use crate::error::Result;
use crate::logger::ModuleLogger;
use crate::metadata::ModuleMetadata;
use crate::output::ModuleOutputs;
use crate::settings::Settings;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifiers of the document being processed, supplied by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentRef {
    pub collection_id: Uuid,
    pub document_id: i64,
    pub source_file_id: i64,
    /// External (MusicBrainz) work identifier
    pub work_id: Uuid,
}

/// State shared by every extractor module
pub struct ModuleBase {
    metadata: &'static ModuleMetadata,
    settings: Settings,
    logger: ModuleLogger,
    cache: Box<dyn CacheBackend>,
    local_cache_warned: bool,
    document_id: Option<i64>,
    collection_id: Option<Uuid>,
    work_id: Option<Uuid>,
}

impl ModuleBase {
    /// Create the base state; the cache backend is chosen by [`construct`]
    pub fn new(metadata: &'static ModuleMetadata, settings: Settings) -> Self {
        Self {
            metadata,
            settings,
            logger: ModuleLogger::for_module(metadata.slug, metadata.version),
            cache: Box::new(LocalCache::new()),
            local_cache_warned: false,
            document_id: None,
            collection_id: None,
            work_id: None,
        }
    }

    pub fn metadata(&self) -> &'static ModuleMetadata {
        self.metadata
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Merge options into the settings, overwriting same-named entries
    pub fn add_settings<I, K, V>(&mut self, options: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.settings.merge(options);
    }

    pub fn logger(&self) -> &ModuleLogger {
        &self.logger
    }

    pub fn document_id(&self) -> Option<i64> {
        self.document_id
    }

    pub fn collection_id(&self) -> Option<Uuid> {
        self.collection_id
    }

    pub fn work_id(&self) -> Option<Uuid> {
        self.work_id
    }

    /// Name of the active cache backend ("redis" or "local")
    pub fn cache_kind(&self) -> &'static str {
        self.cache.kind()
    }

    /// Re-select the cache backend from the current settings
    pub fn connect_cache(&mut self) {
        self.cache = cache::select_backend(&self.settings);
        self.local_cache_warned = false;
        debug!(
            module = %self.logger.slug(),
            backend = self.cache.kind(),
            "Cache backend selected"
        );
    }

    /// Cache key for `key`: `"<slug>-<version>-<key>"`
    ///
    /// Bumping the module version changes every derived key.
    pub fn derive_key(&self, key: &str) -> String {
        format!("{}-{}", self.metadata.cache_prefix(), key)
    }

    /// Cached value for `key`, `None` on a miss
    pub fn get_key<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        self.warn_if_local();
        let derived = self.derive_key(key);
        match self.cache.get(&derived)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Cache `value` under `key`
    ///
    /// `timeout` is honoured by the shared backend only.
    pub fn set_key<T: Serialize + ?Sized>(
        &mut self,
        key: &str,
        value: &T,
        timeout: Option<Duration>,
    ) -> Result<()> {
        self.warn_if_local();
        let derived = self.derive_key(key);
        let bytes = serde_json::to_vec(value)?;
        self.cache.set(&derived, &bytes, timeout)
    }

    fn warn_if_local(&mut self) {
        if self.cache.is_shared() || self.local_cache_warned {
            return;
        }
        warn!(
            module = %self.logger.slug(),
            "No shared cache configured, using local non-shared cache"
        );
        self.local_cache_warned = true;
    }

    fn begin_document(&mut self, document: &DocumentRef) {
        self.document_id = Some(document.document_id);
        self.logger.set_document_id(document.document_id);
        self.logger.set_source_file_id(document.source_file_id);
        self.work_id = Some(document.work_id);
        self.collection_id = Some(document.collection_id);
    }
}

impl std::fmt::Debug for ModuleBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleBase")
            .field("metadata", self.metadata)
            .field("settings", &self.settings)
            .field("logger", &self.logger)
            .field("cache", &self.cache.kind())
            .field("document_id", &self.document_id)
            .field("collection_id", &self.collection_id)
            .field("work_id", &self.work_id)
            .finish()
    }
}

/// A module that runs on a file and returns outputs
pub trait ExtractorModule: Send {
    fn base(&self) -> &ModuleBase;

    fn base_mut(&mut self) -> &mut ModuleBase;

    fn metadata(&self) -> &'static ModuleMetadata {
        self.base().metadata()
    }

    /// One-time initialisation, run by [`construct`] before any document
    ///
    /// A typical use is registering default settings with
    /// `self.base_mut().add_settings(...)`.
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Analyse `file_path` and return named outputs
    ///
    /// The default produces no output.
    fn run(&mut self, file_path: &Path) -> Result<Option<ModuleOutputs>> {
        let _ = file_path;
        Ok(None)
    }

    /// Record the document context, then call [`ExtractorModule::run`]
    ///
    /// Entry point for the orchestrator. Implementations should neither
    /// override nor call it themselves.
    fn process_document(
        &mut self,
        document: &DocumentRef,
        file_path: &Path,
    ) -> Result<Option<ModuleOutputs>> {
        self.base_mut().begin_document(document);

        let span = self.base().logger().span();
        let _entered = span.enter();
        debug!(file = %file_path.display(), "Processing document");

        self.run(file_path)
    }
}

/// Finish constructing a module: run its setup hook, then pick the cache
///
/// The backend is selected after `setup` so that options registered there,
/// including `redis_host`, are taken into account.
pub fn construct<M: ExtractorModule>(mut module: M) -> Result<M> {
    module.setup()?;
    module.base_mut().connect_cache();
    Ok(module)
}
