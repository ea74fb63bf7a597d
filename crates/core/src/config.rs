//! Config file parsing for `~/.config/epub-ingest/config.toml`.
//!
//! Use `ingest_options_from_config` to build pipeline options from the loaded
//! config so the security settings apply, and `destination_root` to resolve
//! where books are extracted.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ingest::IngestOptions;
use crate::security::SecurityLimits;

/// Environment variable overriding the destination root.
pub const DEST_ENV: &str = "EPUB_INGEST_DEST";

const APP_DIR: &str = "epub-ingest";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub destination_root: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub max_file_size_mb: Option<u64>,
    pub max_compression_ratio: Option<u64>,
    pub max_file_count: Option<u64>,
}

/// Load config from the default path. A missing or unparseable file yields
/// the defaults.
pub fn load_config() -> AppConfig {
    let Some(path) = config_path() else {
        return AppConfig::default();
    };
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return AppConfig::default(),
    };
    parse_config(&content)
}

/// Parse config text, falling back to defaults on error.
pub fn parse_config(content: &str) -> AppConfig {
    match toml::from_str::<AppConfig>(content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("ignoring unparseable config: {}", e);
            AppConfig::default()
        }
    }
}

/// Return the default config file path (for init and show).
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut p| {
        p.push(APP_DIR);
        p.push("config.toml");
        p
    })
}

/// Build security limits from config. Uses defaults for any unset values.
pub fn security_limits_from_config(c: &SecurityConfig) -> SecurityLimits {
    let mut limits = SecurityLimits::default();
    if let Some(mb) = c.max_file_size_mb {
        limits.max_total_size_bytes = mb.saturating_mul(1024).saturating_mul(1024);
    }
    if let Some(r) = c.max_compression_ratio {
        limits.max_compression_ratio = r;
    }
    if let Some(n) = c.max_file_count {
        limits.max_file_count = n;
    }
    limits
}

pub fn ingest_options_from_config(cfg: &AppConfig) -> IngestOptions {
    IngestOptions {
        security: security_limits_from_config(&cfg.security),
    }
}

/// Destination root: `EPUB_INGEST_DEST`, then `[ingest] destination_root`,
/// then `<data_local_dir>/epub-ingest`.
pub fn destination_root(cfg: &AppConfig) -> Option<PathBuf> {
    resolve_destination_root(std::env::var_os(DEST_ENV).map(PathBuf::from), cfg)
}

fn resolve_destination_root(env: Option<PathBuf>, cfg: &AppConfig) -> Option<PathBuf> {
    env.filter(|p| !p.as_os_str().is_empty())
        .or_else(|| cfg.ingest.destination_root.as_ref().map(PathBuf::from))
        .or_else(|| dirs::data_local_dir().map(|p| p.join(APP_DIR)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_sections() {
        let cfg = parse_config(
            r#"
            [ingest]
            destination_root = "/srv/books"

            [security]
            max_file_size_mb = 10
            max_file_count = 50
            "#,
        );
        assert_eq!(cfg.ingest.destination_root.as_deref(), Some("/srv/books"));

        let opts = ingest_options_from_config(&cfg);
        assert_eq!(opts.security.max_total_size_bytes, 10 * 1024 * 1024);
        assert_eq!(opts.security.max_file_count, 50);
        assert_eq!(
            opts.security.max_compression_ratio,
            SecurityLimits::default().max_compression_ratio
        );
    }

    #[test]
    fn bad_config_falls_back_to_defaults() {
        assert_eq!(parse_config("[security\nmax = "), AppConfig::default());
        assert_eq!(parse_config(""), AppConfig::default());
    }

    #[test]
    fn destination_precedence() {
        let cfg = AppConfig {
            ingest: IngestConfig {
                destination_root: Some("/from/config".into()),
            },
            ..AppConfig::default()
        };
        assert_eq!(
            resolve_destination_root(Some(PathBuf::from("/from/env")), &cfg),
            Some(PathBuf::from("/from/env"))
        );
        assert_eq!(
            resolve_destination_root(Some(PathBuf::new()), &cfg),
            Some(PathBuf::from("/from/config"))
        );
        assert_eq!(resolve_destination_root(None, &cfg), Some(PathBuf::from("/from/config")));
    }

    #[test]
    fn config_round_trips_through_toml() {
        let cfg = AppConfig {
            ingest: IngestConfig {
                destination_root: Some("/books".into()),
            },
            security: SecurityConfig {
                max_compression_ratio: Some(42),
                ..SecurityConfig::default()
            },
        };
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(parse_config(&text), cfg);
    }
}
