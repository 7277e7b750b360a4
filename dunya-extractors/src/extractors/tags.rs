//! Tags module
//!
//! Reads embedded tags and audio properties using the `lofty` crate and
//! returns them as a single `tags` JSON document. Supports ID3v2, ID3v1,
//! APE, Vorbis Comments, MP4 and RIFF INFO. Missing tags yield `null` fields.

use crate::error::{ExtractorError, Result};
use crate::metadata::{Depends, ModuleMetadata, OutputDecl, OutputFormat};
use crate::module::{construct, ExtractorModule, ModuleBase};
use crate::output::ModuleOutputs;
use crate::settings::Settings;
use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};
use serde_json::{json, Value};
use std::path::Path;
use uuid::Uuid;

pub static METADATA: ModuleMetadata = ModuleMetadata {
    version: Some("0.1"),
    source_type: Some("audio"),
    slug: Some("tags"),
    depends: Depends::None,
    output: Some(&[OutputDecl::new("tags", OutputFormat::JSON)]),
};

/// Embedded tag reader
#[derive(Debug)]
pub struct TagsModule {
    base: ModuleBase,
}

impl TagsModule {
    pub fn new(settings: Settings) -> Result<Self> {
        construct(Self {
            base: ModuleBase::new(&METADATA, settings),
        })
    }

    fn read_tags(&self, file_path: &Path) -> Result<Value> {
        let tagged_file = Probe::open(file_path)
            .map_err(|e| ExtractorError::Io(std::io::Error::other(e)))?
            .guess_file_type()?
            .read()
            .map_err(|e| ExtractorError::Parse(format!("Failed to read audio file tags: {}", e)))?;

        let properties = tagged_file.properties();
        let format = format_name(tagged_file.file_type());

        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
        if tag.is_none() {
            self.base
                .logger()
                .debug(format!("No tags found in {}", file_path.display()));
        }

        Ok(json!({
            "format": format,
            "duration_ms": properties.duration().as_millis() as u64,
            "sample_rate": properties.sample_rate(),
            "channels": properties.channels(),
            "bit_depth": properties.bit_depth(),
            "bitrate_kbps": properties.audio_bitrate(),
            "title": tag.and_then(|t| t.title().map(|s| s.to_string())),
            "artist": tag.and_then(|t| t.artist().map(|s| s.to_string())),
            "album": tag.and_then(|t| t.album().map(|s| s.to_string())),
            "genre": tag.and_then(|t| t.genre().map(|s| s.to_string())),
            "year": tag.and_then(|t| t.year()),
            "track_number": tag.and_then(|t| t.track()),
            "album_artist": tag.and_then(|t| t.get_string(&ItemKey::AlbumArtist)),
            "composer": tag.and_then(|t| t.get_string(&ItemKey::Composer)),
            "recording_mbid": tag.and_then(|t| self.recording_mbid(t)),
        }))
    }

    fn recording_mbid(&self, tag: &Tag) -> Option<String> {
        let mbid = tag.get_string(&ItemKey::MusicBrainzRecordingId)?;
        match Uuid::parse_str(mbid.trim()) {
            Ok(uuid) => Some(uuid.to_string()),
            Err(_) => {
                self.base
                    .logger()
                    .warn(format!("Ignoring malformed recording MBID '{}'", mbid));
                None
            }
        }
    }
}

fn format_name(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Mpeg => "MP3",
        FileType::Flac => "FLAC",
        FileType::Opus => "Opus",
        FileType::Vorbis => "OGG Vorbis",
        FileType::Aac => "AAC",
        FileType::Aiff => "AIFF",
        FileType::Wav => "WAV",
        FileType::WavPack => "WavPack",
        FileType::Mp4 => "MP4",
        _ => "Unknown",
    }
}

impl ExtractorModule for TagsModule {
    fn base(&self) -> &ModuleBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModuleBase {
        &mut self.base
    }

    fn run(&mut self, file_path: &Path) -> Result<Option<ModuleOutputs>> {
        let tags = self.read_tags(file_path)?;
        self.base.logger().info(format!(
            "Read tags from {} ({})",
            file_path.display(),
            tags["format"].as_str().unwrap_or("Unknown")
        ));
        Ok(Some(ModuleOutputs::new().with("tags", tags)))
    }
}
