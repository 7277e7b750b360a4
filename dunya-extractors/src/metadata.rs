//! Declared module metadata
//!
//! Every module exposes a `&'static ModuleMetadata` describing what it is,
//! what it consumes and what it produces. The orchestrator reads it to order
//! modules and to persist their outputs; nothing in this crate acts on
//! `depends`.
//!
//! ```rust,ignore
//! static METADATA: ModuleMetadata = ModuleMetadata {
//!     version: Some("1.0"),
//!     source_type: Some("audio"),
//!     slug: Some("pitch"),
//!     depends: Depends::One("tonic"),
//!     output: Some(&[OutputDecl::new("pitch", OutputFormat::JSON)]),
//! };
//! ```

use crate::error::{ExtractorError, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Modules that must have produced output before this one runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(untagged)]
pub enum Depends {
    #[default]
    None,
    One(&'static str),
    Many(&'static [&'static str]),
}

impl Depends {
    pub fn slugs(&self) -> Vec<&'static str> {
        match self {
            Depends::None => Vec::new(),
            Depends::One(slug) => vec![*slug],
            Depends::Many(slugs) => slugs.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slugs().is_empty()
    }
}

/// How one named output is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputFormat {
    /// File extension; `"json"` means the value is serialised as JSON
    pub extension: &'static str,
    pub mimetype: &'static str,
    /// The output is an ordered sequence of parts rather than one unit
    pub parts: bool,
}

impl OutputFormat {
    /// A single JSON document, the format of undeclared outputs
    pub const JSON: OutputFormat = OutputFormat {
        extension: "json",
        mimetype: "application/json",
        parts: false,
    };

    pub const fn new(extension: &'static str, mimetype: &'static str) -> Self {
        Self {
            extension,
            mimetype,
            parts: false,
        }
    }

    pub const fn with_parts(self) -> Self {
        Self {
            parts: true,
            ..self
        }
    }

    pub fn is_json(&self) -> bool {
        self.extension == "json"
    }
}

/// Declaration of one named output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputDecl {
    pub name: &'static str,
    #[serde(flatten)]
    pub format: OutputFormat,
}

impl OutputDecl {
    pub const fn new(name: &'static str, format: OutputFormat) -> Self {
        Self { name, format }
    }
}

/// Static description of an extractor module
///
/// Unset fields are legal here; [`ModuleMetadata::validate`] reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleMetadata {
    /// Any change re-runs the module and invalidates its cached values
    pub version: Option<&'static str>,
    /// Slug of the source file type taken as input
    pub source_type: Option<&'static str>,
    /// Unique over all modules
    pub slug: Option<&'static str>,
    pub depends: Depends,
    /// `None` means every output is a single JSON document
    pub output: Option<&'static [OutputDecl]>,
}

impl ModuleMetadata {
    /// Nothing declared
    pub const UNSET: ModuleMetadata = ModuleMetadata {
        version: None,
        source_type: None,
        slug: None,
        depends: Depends::None,
        output: None,
    };

    /// `"<slug>-<version>"`, the prefix of every cache key of this module
    pub fn cache_prefix(&self) -> String {
        format!(
            "{}-{}",
            self.slug.unwrap_or_default(),
            self.version.unwrap_or_default()
        )
    }

    /// Storage format of the output called `name`
    ///
    /// `None` when outputs are declared but `name` is not among them.
    pub fn format_for(&self, name: &str) -> Option<OutputFormat> {
        match self.output {
            None => Some(OutputFormat::JSON),
            Some(decls) => decls.iter().find(|d| d.name == name).map(|d| d.format),
        }
    }

    /// Check that the module supplies real values
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        let required = [
            ("slug", self.slug),
            ("version", self.version),
            ("source_type", self.source_type),
        ];
        for (field, value) in required {
            match value {
                None => problems.push(format!("{} is not set", field)),
                Some(v) if v.trim().is_empty() => problems.push(format!("{} is empty", field)),
                Some(_) => {}
            }
        }

        if self.depends.slugs().iter().any(|s| Some(*s) == self.slug) {
            problems.push("module depends on itself".to_string());
        }

        if let Some(decls) = self.output {
            let mut seen = HashSet::new();
            for decl in decls {
                if !seen.insert(decl.name) {
                    problems.push(format!("output '{}' declared twice", decl.name));
                }
                if decl.format.extension.is_empty() {
                    problems.push(format!("output '{}' has no extension", decl.name));
                }
                if decl.format.mimetype.is_empty() {
                    problems.push(format!("output '{}' has no mimetype", decl.name));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ExtractorError::Metadata(problems))
        }
    }
}

impl Default for ModuleMetadata {
    fn default() -> Self {
        Self::UNSET
    }
}
