//! Build configuration.
//!
//! Settings are read from a TOML file and may be overridden from the
//! environment with the `HYGIENE_` prefix:
//!
//! | Variable | Setting |
//! |---|---|
//! | `HYGIENE_BASE_URL` | `base_url` |
//! | `HYGIENE_OUT_DIR` | `out_dir` |
//! | `HYGIENE_CACHE_DIR` | `cache_dir` |
//! | `HYGIENE_CONCURRENCY` | `authority_concurrency` |
//!
//! ## Example Configuration File
//!
//! ```toml
//! base_url = "https://example.org"
//! out_dir = "dist"
//! cache_dir = ".cache/datasets"
//! authority_concurrency = 10
//! write_concurrency = 32
//! fetch_policy = "prefer_cache"
//! on_authority_error = "abort"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::identifier::UrlScheme;
use crate::repository::FetchPolicy;
use crate::{Error, Result};

/// What the build does when one authority fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop dispatching and fail the whole build.
    #[default]
    Abort,
    /// Log the failure, leave the authority out, and build the rest.
    Skip,
}

/// Settings of one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Public base URL every canonical URL is derived from.
    pub base_url: String,
    /// Output root for generated artifacts.
    pub out_dir: PathBuf,
    /// Directory of cached raw datasets.
    pub cache_dir: PathBuf,
    /// Authorities processed at once.
    pub authority_concurrency: usize,
    /// Artifact writes in flight per authority.
    pub write_concurrency: usize,
    /// Whether dataset lookups may use the network.
    pub fetch_policy: FetchPolicy,
    /// Reaction to a failing authority.
    pub on_authority_error: FailurePolicy,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            out_dir: PathBuf::from("dist"),
            cache_dir: PathBuf::from(".cache/datasets"),
            authority_concurrency: 10,
            write_concurrency: 32,
            fetch_policy: FetchPolicy::default(),
            on_authority_error: FailurePolicy::default(),
        }
    }
}

impl BuildConfig {
    /// Parse settings from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from `path` and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `HYGIENE_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(url) = lookup("HYGIENE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(dir) = lookup("HYGIENE_OUT_DIR") {
            self.out_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("HYGIENE_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("HYGIENE_CONCURRENCY") {
            self.authority_concurrency = value.trim().parse().map_err(|_| {
                Error::Config(format!("HYGIENE_CONCURRENCY must be a number, got '{value}'"))
            })?;
        }
        self.validate()
    }

    /// Check the settings for values a build cannot run with.
    pub fn validate(&self) -> Result<()> {
        UrlScheme::new(&self.base_url)
            .map_err(|e| Error::Config(format!("base_url is unusable: {e}")))?;
        if self.authority_concurrency == 0 {
            return Err(Error::Config(
                "authority_concurrency must be at least 1".to_string(),
            ));
        }
        if self.write_concurrency == 0 {
            return Err(Error::Config("write_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }

    /// URL scheme rooted at the configured base URL.
    pub fn url_scheme(&self) -> Result<UrlScheme> {
        UrlScheme::new(&self.base_url)
    }
}
