//! Checksum module
//!
//! SHA-256 of the whole file (`sha256`, plain text) plus one digest per
//! fixed-size block (`blocks`, JSON parts). The result is cached under the
//! file's path, length and modification time, so an unchanged file is read
//! only once per cache lifetime.
//!
//! Settings:
//! - `block_size` - bytes per block, default 1 MiB (registered in `setup`),
//!   at most 256 MiB
//! - `cache_timeout_secs` - optional expiry of cached digests

use crate::error::{ExtractorError, Result};
use crate::metadata::{Depends, ModuleMetadata, OutputDecl, OutputFormat};
use crate::module::{construct, ExtractorModule, ModuleBase};
use crate::output::{ModuleOutputs, OutputData, OutputValue};
use crate::settings::Settings;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

pub const DEFAULT_BLOCK_SIZE: u64 = 1024 * 1024;

/// Largest accepted `block_size`; the whole block is buffered in memory
pub const MAX_BLOCK_SIZE: u64 = 256 * 1024 * 1024;

pub static METADATA: ModuleMetadata = ModuleMetadata {
    version: Some("1.0"),
    source_type: Some("audio"),
    slug: Some("checksum"),
    depends: Depends::None,
    output: Some(&[
        OutputDecl::new("sha256", OutputFormat::new("txt", "text/plain")),
        OutputDecl::new("blocks", OutputFormat::JSON.with_parts()),
    ]),
};

/// Digests of one file, as cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDigest {
    pub sha256: String,
    pub block_size: u64,
    pub blocks: Vec<String>,
}

impl FileDigest {
    /// Hash `reader` in `block_size` chunks
    pub fn compute<R: Read>(mut reader: R, block_size: u64) -> Result<Self> {
        let mut whole = Sha256::new();
        let mut blocks = Vec::new();
        let mut buffer = vec![0u8; checked_block_size(block_size)?];

        loop {
            let filled = read_block(&mut reader, &mut buffer)?;
            if filled == 0 {
                break;
            }
            whole.update(&buffer[..filled]);
            blocks.push(format!("{:x}", Sha256::digest(&buffer[..filled])));
            if filled < buffer.len() {
                break;
            }
        }

        Ok(Self {
            sha256: format!("{:x}", whole.finalize()),
            block_size,
            blocks,
        })
    }
}

/// Validate a block size and convert it to a buffer length
fn checked_block_size(size: u64) -> Result<usize> {
    let invalid = |reason: String| ExtractorError::InvalidSetting {
        name: "block_size".to_string(),
        reason,
    };
    if size == 0 {
        return Err(invalid("must be greater than zero".to_string()));
    }
    if size > MAX_BLOCK_SIZE {
        return Err(invalid(format!(
            "{} exceeds the maximum of {} bytes",
            size, MAX_BLOCK_SIZE
        )));
    }
    usize::try_from(size).map_err(|_| invalid(format!("{} does not fit in memory", size)))
}

/// Fill `buffer` as far as the reader allows; short only at end of input
fn read_block<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Whole-file and per-block SHA-256
#[derive(Debug)]
pub struct ChecksumModule {
    base: ModuleBase,
}

impl ChecksumModule {
    pub fn new(settings: Settings) -> Result<Self> {
        construct(Self {
            base: ModuleBase::new(&METADATA, settings),
        })
    }

    fn block_size(&self) -> Result<u64> {
        let size: u64 = self.base.settings().get_as("block_size")?;
        checked_block_size(size)?;
        Ok(size)
    }

    fn cache_timeout(&self) -> Result<Option<Duration>> {
        if !self.base.settings().contains("cache_timeout_secs") {
            return Ok(None);
        }
        let secs: u64 = self.base.settings().get_as("cache_timeout_secs")?;
        Ok(Some(Duration::from_secs(secs)))
    }
}

/// Cache key identifying a file's current contents
fn file_fingerprint(file_path: &Path) -> Result<String> {
    let meta = std::fs::metadata(file_path)?;
    let modified = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    Ok(format!("{}:{}:{}", file_path.display(), meta.len(), modified))
}

impl ExtractorModule for ChecksumModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn setup(&mut self) -> Result<()> {
        if !self.base.settings().contains("block_size") {
            self.base
                .add_settings([("block_size", json!(DEFAULT_BLOCK_SIZE))]);
        }
        Ok(())
    }

    fn run(&mut self, file_path: &Path) -> Result<Option<ModuleOutputs>> {
        let block_size = self.block_size()?;
        let fingerprint = file_fingerprint(file_path)?;

        let digest = match self.base.get_key::<FileDigest>(&fingerprint)? {
            Some(cached) if cached.block_size == block_size => {
                self.base
                    .logger()
                    .debug(format!("Using cached digest for {}", file_path.display()));
                cached
            }
            _ => {
                let digest = FileDigest::compute(File::open(file_path)?, block_size)?;
                let timeout = self.cache_timeout()?;
                self.base.set_key(&fingerprint, &digest, timeout)?;
                digest
            }
        };

        self.base.logger().info(format!(
            "Hashed {} ({} blocks)",
            file_path.display(),
            digest.blocks.len()
        ));

        let blocks = digest
            .blocks
            .iter()
            .enumerate()
            .map(|(index, sha256)| {
                OutputData::Json(json!({
                    "index": index,
                    "offset": index as u64 * block_size,
                    "sha256": sha256,
                }))
            })
            .collect();

        Ok(Some(
            ModuleOutputs::new()
                .with("sha256", OutputValue::Single(OutputData::Text(digest.sha256)))
                .with("blocks", OutputValue::Parts(blocks)),
        ))
    }
}
