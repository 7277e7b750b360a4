//! Lookup of module constructors by slug
//!
//! The registry only builds modules; ordering them by `depends` and
//! persisting their outputs belongs to the orchestrator.

use crate::error::{ExtractorError, Result};
use crate::extractors::{checksum, tags, ChecksumModule, TagsModule};
use crate::metadata::ModuleMetadata;
use crate::module::ExtractorModule;
use crate::settings::Settings;
use std::collections::BTreeMap;

/// Builds a configured module instance
pub type ModuleConstructor = fn(Settings) -> Result<Box<dyn ExtractorModule>>;

struct Entry {
    metadata: &'static ModuleMetadata,
    constructor: ModuleConstructor,
}

/// Module constructors keyed by slug
#[derive(Default)]
pub struct ModuleRegistry {
    entries: BTreeMap<&'static str, Entry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the reference modules shipped with this crate
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(&checksum::METADATA, |settings| {
            Ok(Box::new(ChecksumModule::new(settings)?))
        });
        registry.insert(&tags::METADATA, |settings| {
            Ok(Box::new(TagsModule::new(settings)?))
        });
        registry
    }

    /// Register a module; its metadata must validate
    pub fn register(
        &mut self,
        metadata: &'static ModuleMetadata,
        constructor: ModuleConstructor,
    ) -> Result<&mut Self> {
        metadata.validate()?;
        let slug = metadata.slug.unwrap_or_default();
        if self.entries.contains_key(slug) {
            return Err(ExtractorError::Metadata(vec![format!(
                "slug '{}' registered twice",
                slug
            )]));
        }
        self.insert(metadata, constructor);
        Ok(self)
    }

    fn insert(&mut self, metadata: &'static ModuleMetadata, constructor: ModuleConstructor) {
        self.entries.insert(
            metadata.slug.unwrap_or_default(),
            Entry {
                metadata,
                constructor,
            },
        );
    }

    /// Construct the module registered under `slug`
    pub fn build(&self, slug: &str, settings: Settings) -> Result<Box<dyn ExtractorModule>> {
        let entry = self
            .entries
            .get(slug)
            .ok_or_else(|| ExtractorError::UnknownModule(slug.to_string()))?;
        (entry.constructor)(settings)
    }

    pub fn metadata(&self, slug: &str) -> Option<&'static ModuleMetadata> {
        self.entries.get(slug).map(|e| e.metadata)
    }

    pub fn slugs(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_slugs() {
        let registry = ModuleRegistry::with_builtin();
        assert_eq!(registry.slugs().collect::<Vec<_>>(), vec!["checksum", "tags"]);
        assert_eq!(registry.metadata("tags").unwrap().version, Some("0.1"));
    }

    #[test]
    fn test_build_unknown_slug() {
        let registry = ModuleRegistry::with_builtin();
        assert!(matches!(
            registry.build("pitch", Settings::new()),
            Err(ExtractorError::UnknownModule(slug)) if slug == "pitch"
        ));
    }

    #[test]
    fn test_build_runs_setup() {
        let registry = ModuleRegistry::with_builtin();
        let module = registry.build("checksum", Settings::new()).unwrap();
        assert!(module.base().settings().contains("block_size"));
        assert_eq!(module.metadata().slug, Some("checksum"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = ModuleRegistry::with_builtin();
        let result = registry.register(&tags::METADATA, |settings| {
            Ok(Box::new(TagsModule::new(settings)?))
        });
        assert!(matches!(result, Err(ExtractorError::Metadata(_))));
    }

    #[test]
    fn test_invalid_metadata_rejected() {
        static UNNAMED: ModuleMetadata = ModuleMetadata::UNSET;
        let mut registry = ModuleRegistry::new();
        let result = registry.register(&UNNAMED, |settings| {
            Ok(Box::new(TagsModule::new(settings)?))
        });
        assert!(result.is_err());
    }
}
