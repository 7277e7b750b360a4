//! Reference extractor modules
//!
//! Small, dependency-light modules that exercise the whole contract:
//! 1. **checksum** - whole-file and per-block SHA-256 (setup hook, cache, parts output)
//! 2. **tags** - embedded tags and audio properties via `lofty` (JSON output)

pub mod checksum;
pub mod tags;

pub use checksum::ChecksumModule;
pub use tags::TagsModule;
