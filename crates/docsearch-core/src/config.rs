//! Configuration loader and path helpers.
//!
//! Uses Figment to merge compiled-in defaults, `config.toml`,
//! `config.<env>.toml` and `APP_*` env vars (nested keys split on `__`, e.g.
//! `APP_INGEST__CONCURRENCY=4`). Provides helpers to expand `~` and `${VAR}`
//! and to resolve relative paths against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;

pub struct Config {
    figment: Figment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub index: IndexSettings,
    pub ingest: IngestSettings,
    pub extract: ExtractSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub dir: String,
    pub writer_memory_bytes: usize,
    pub clear_retry_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSettings {
    pub concurrency: usize,
    pub roots: Vec<String>,
    pub extensions: Vec<String>,
    /// Minutes between automatic reindex runs; 0 disables.
    pub auto_index_minutes: u64,
}

/// Command names of the external converters used for binary formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractSettings {
    pub hwp5txt: String,
    pub pdftotext: String,
    pub xls2csv: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dir: "~/.docsearch/index".to_string(),
            writer_memory_bytes: 50_000_000,
            clear_retry_delay_ms: 500,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            concurrency: 6,
            roots: Vec::new(),
            extensions: ["hwp", "hwpx", "pdf", "xls", "xlsx", "txt"].iter().map(|s| s.to_string()).collect(),
            auto_index_minutes: 0,
        }
    }
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            hwp5txt: "hwp5txt".to_string(),
            pdftotext: "pdftotext".to_string(),
            xls2csv: "xls2csv".to_string(),
        }
    }
}

impl Settings {
    /// Index directory with `~` and env vars expanded.
    pub fn index_dir(&self) -> PathBuf {
        expand_path(&self.index.dir)
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.ingest.roots.iter().map(expand_path).collect()
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Wraps an already-assembled figment; used by front ends and tests that
    /// bring their own providers.
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let settings = self.settings()?;
        if settings.ingest.concurrency == 0 {
            anyhow::bail!("Invalid configuration: ingest.concurrency must be at least 1");
        }
        if settings.index.dir.trim().is_empty() {
            anyhow::bail!("Invalid configuration: index.dir must not be empty");
        }
        Ok(())
    }
}

/// `~` and `$VAR` expansion for configured paths. Unset variables leave
/// the text as written.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_vars = shellexpand::env(raw).unwrap_or(Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_vars).into_owned())
}
