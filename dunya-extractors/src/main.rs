//! dunya-extract - run one extractor module on one file
//!
//! Loads the bootstrap TOML, builds the requested module with its settings,
//! processes the file as the given document and prints the outputs as JSON
//! on stdout. Logs go to stderr (or the configured log file). Nothing is
//! written to disk.

use anyhow::{Context, Result};
use clap::Parser;
use dunya_common::config::{load_or_default, resolve_redis_host, TomlConfig, REDIS_HOST_ENV};
use dunya_common::logging::init_tracing;
use dunya_extractors::settings::REDIS_HOST;
use dunya_extractors::{DocumentRef, ModuleRegistry, Settings};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(version, about = "Run one extractor module on one file")]
struct Args {
    /// Module slug (see --list)
    #[arg(required_unless_present = "list")]
    module: Option<String>,

    /// File to analyse
    #[arg(required_unless_present = "list")]
    file: Option<PathBuf>,

    /// Bootstrap TOML file (default: <config dir>/dunya/extractors.toml)
    #[arg(short, long, env = "DUNYA_EXTRACT_CONFIG")]
    config: Option<PathBuf>,

    /// Redis host for the shared cache (overrides DUNYA_REDIS_HOST and TOML)
    #[arg(long)]
    redis_host: Option<String>,

    /// Module option, repeatable; VALUE is parsed as JSON, else taken as a string
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_setting)]
    settings: Vec<(String, Value)>,

    #[arg(long, default_value_t = Uuid::nil())]
    collection_id: Uuid,

    #[arg(long, default_value_t = 0)]
    document_id: i64,

    #[arg(long, default_value_t = 0)]
    source_file_id: i64,

    /// MusicBrainz work id
    #[arg(long, default_value_t = Uuid::nil())]
    work_id: Uuid,

    /// List available modules and exit
    #[arg(long)]
    list: bool,
}

fn parse_setting(raw: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty setting name in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Settings for one run of `slug`
///
/// TOML tables first, then `-s` options on top. The Redis host is taken
/// from, in order: `--redis-host`, `-s redis_host=...`, DUNYA_REDIS_HOST,
/// the module's TOML tables, top-level `redis_host`.
fn build_settings(
    config: &TomlConfig,
    slug: &str,
    cli_settings: &[(String, Value)],
    cli_redis_host: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::from(config.module_settings(slug)?);

    let mut toml_sources = config.clone();
    if let Ok(host) = settings.get_str(REDIS_HOST) {
        toml_sources.redis_host = Some(host.to_string());
    }

    settings.merge(cli_settings.iter().cloned());

    let cli_host = cli_redis_host.or_else(|| {
        cli_settings
            .iter()
            .rev()
            .find(|(name, _)| name == REDIS_HOST)
            .and_then(|(_, value)| value.as_str())
    });
    if let Some(host) = resolve_redis_host(cli_host, REDIS_HOST_ENV, &toml_sources) {
        settings.insert(REDIS_HOST, host);
    }

    Ok(settings)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_or_default(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    let registry = ModuleRegistry::with_builtin();

    if args.list {
        for slug in registry.slugs() {
            if let Some(meta) = registry.metadata(slug) {
                println!(
                    "{}\t{}\t{}",
                    slug,
                    meta.version.unwrap_or("-"),
                    meta.source_type.unwrap_or("-")
                );
            }
        }
        return Ok(());
    }

    // Both are required unless --list
    let (Some(slug), Some(file)) = (args.module.as_deref(), args.file.as_ref()) else {
        anyhow::bail!("module and file are required");
    };

    let settings = build_settings(&config, slug, &args.settings, args.redis_host.as_deref())?;

    let mut module = registry
        .build(slug, settings)
        .with_context(|| format!("Failed to construct module '{}'", slug))?;
    let metadata = module.metadata();
    metadata.validate()?;

    info!(
        module = slug,
        version = metadata.version.unwrap_or_default(),
        cache = module.base().cache_kind(),
        file = %file.display(),
        "Running extractor"
    );

    let document = DocumentRef {
        collection_id: args.collection_id,
        document_id: args.document_id,
        source_file_id: args.source_file_id,
        work_id: args.work_id,
    };
    let outputs = module
        .process_document(&document, file)
        .with_context(|| format!("Module '{}' failed on {}", slug, file.display()))?;

    if let Some(outputs) = &outputs {
        for (name, value) in outputs.iter() {
            match metadata.format_for(name) {
                Some(format) if value.matches(&format) => {}
                Some(_) => warn!(output = %name, "Output does not match its declared format"),
                None => warn!(output = %name, "Output is not declared by the module"),
            }
        }
    }

    let report = json!({
        "module": slug,
        "version": metadata.version,
        "document_id": document.document_id,
        "outputs": outputs.as_ref().map(|o| o.to_json()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    fn config_with_module_host() -> TomlConfig {
        toml::from_str(
            r#"
redis_host = "global-host"

[modules.checksum]
redis_host = "module-host"
block_size = 64
"#,
        )
        .unwrap()
    }

    fn redis_host(settings: &Settings) -> &str {
        settings.get_str(REDIS_HOST).unwrap()
    }

    #[test]
    fn test_parse_setting_json_and_string() {
        assert_eq!(
            parse_setting("block_size=4096").unwrap(),
            ("block_size".to_string(), json!(4096))
        );
        assert_eq!(
            parse_setting("redis_host=cache.local").unwrap(),
            ("redis_host".to_string(), json!("cache.local"))
        );
        assert_eq!(
            parse_setting("flags=[1,2]").unwrap(),
            ("flags".to_string(), json!([1, 2]))
        );
        assert!(parse_setting("novalue").is_err());
        assert!(parse_setting("=1").is_err());
    }

    #[test]
    fn test_args_require_module_unless_list() {
        assert!(Args::try_parse_from(["dunya-extract"]).is_err());
        assert!(Args::try_parse_from(["dunya-extract", "--list"]).is_ok());

        let args = Args::try_parse_from([
            "dunya-extract",
            "checksum",
            "song.mp3",
            "-s",
            "block_size=16",
            "--document-id",
            "7",
        ])
        .unwrap();
        assert_eq!(args.module.as_deref(), Some("checksum"));
        assert_eq!(args.settings, vec![("block_size".to_string(), json!(16))]);
        assert_eq!(args.document_id, 7);
    }

    #[test]
    #[serial]
    fn test_set_option_redis_host_beats_environment() {
        env::set_var(REDIS_HOST_ENV, "env-host");
        let cli = vec![(REDIS_HOST.to_string(), json!("set-host"))];

        let settings = build_settings(&TomlConfig::default(), "checksum", &cli, None).unwrap();
        assert_eq!(redis_host(&settings), "set-host");

        let settings =
            build_settings(&TomlConfig::default(), "checksum", &cli, Some("flag-host")).unwrap();
        assert_eq!(redis_host(&settings), "flag-host");

        env::remove_var(REDIS_HOST_ENV);
    }

    #[test]
    #[serial]
    fn test_module_table_redis_host_beats_global() {
        env::remove_var(REDIS_HOST_ENV);
        let config = config_with_module_host();

        let settings = build_settings(&config, "checksum", &[], None).unwrap();
        assert_eq!(redis_host(&settings), "module-host");
        assert_eq!(settings.get_as::<u64>("block_size").unwrap(), 64);

        let settings = build_settings(&config, "tags", &[], None).unwrap();
        assert_eq!(redis_host(&settings), "global-host");
    }

    #[test]
    #[serial]
    fn test_environment_beats_toml_redis_host() {
        env::set_var(REDIS_HOST_ENV, "env-host");

        let settings = build_settings(&config_with_module_host(), "checksum", &[], None).unwrap();
        assert_eq!(redis_host(&settings), "env-host");

        env::remove_var(REDIS_HOST_ENV);
    }

    #[test]
    #[serial]
    fn test_no_redis_host_leaves_settings_untouched() {
        env::remove_var(REDIS_HOST_ENV);

        let settings = build_settings(&TomlConfig::default(), "checksum", &[], None).unwrap();
        assert!(!settings.contains(REDIS_HOST));
    }
}
