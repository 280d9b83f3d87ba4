//! Raw dataset lookup.
//!
//! Datasets are addressed by a [`CacheKey`] derived from their source URL.
//! A [`DatasetRepository`] resolves a key to a parsed (not yet validated)
//! [`RawDataset`]. Which copy is used, cached or freshly fetched, is decided
//! by the repository's [`FetchPolicy`], never by the build itself.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use url::Url;

use crate::fetcher::DocumentFetcher;
use crate::types::RawDataset;
use crate::writer::write_atomic;
use crate::{Error, Result};

/// Identity of a raw dataset: the file name of its source URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    source_url: String,
}

impl CacheKey {
    /// Derive the key from a dataset URL.
    ///
    /// ```rust
    /// use hygiene_core::repository::CacheKey;
    ///
    /// let key = CacheKey::from_source_url("http://example.org/OpenDataFiles/FHRS999en-GB.json")?;
    /// assert_eq!(key.name(), "FHRS999en-GB.json");
    /// # Ok::<(), hygiene_core::Error>(())
    /// ```
    pub fn from_source_url(source_url: &str) -> Result<Self> {
        let url = Url::parse(source_url)?;
        let name = url
            .path_segments()
            .and_then(|segments| segments.rev().find(|s| !s.is_empty()))
            .filter(|s| *s != "." && *s != "..")
            .ok_or_else(|| {
                Error::InvalidUrl(format!("'{source_url}' does not name a dataset file"))
            })?;

        Ok(Self {
            name: name.to_string(),
            source_url: source_url.to_string(),
        })
    }

    /// File name used in the cache.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL the dataset is fetched from.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Resolves cache keys to raw datasets.
#[async_trait]
pub trait DatasetRepository: Send + Sync {
    /// Look up the dataset for `key`.
    async fn get(&self, key: &CacheKey) -> Result<RawDataset>;
}

/// Whether a lookup may use the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPolicy {
    /// Always fetch, refreshing the cached copy.
    Network,
    /// Use a cached copy when one exists, fetch otherwise.
    #[default]
    PreferCache,
    /// Never fetch; a missing copy is [`Error::CacheMiss`].
    CacheOnly,
}

/// Raw dataset documents stored as files in one directory.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Use `dir` as cache directory. It is created on first store.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the cached document for `key`.
    #[must_use]
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.name())
    }

    /// Read the cached document for `key`, if present.
    pub async fn load_text(&self, key: &CacheKey) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Store the document for `key`, replacing any previous copy.
    pub async fn store_text(&self, key: &CacheKey, text: &str) -> Result<()> {
        write_atomic(&self.path_for(key), text).await?;
        debug!(key = %key, bytes = text.len(), "cached dataset");
        Ok(())
    }
}

#[async_trait]
impl DatasetRepository for FileCache {
    async fn get(&self, key: &CacheKey) -> Result<RawDataset> {
        let text = self.load_text(key).await?.ok_or_else(|| Error::CacheMiss {
            key: key.name().to_string(),
        })?;
        RawDataset::from_json(&text)
    }
}

/// Combines a fetcher with a [`FileCache`] under a [`FetchPolicy`].
#[derive(Debug, Clone)]
pub struct FetchingRepository<F> {
    fetcher: F,
    cache: FileCache,
    policy: FetchPolicy,
}

impl<F: DocumentFetcher> FetchingRepository<F> {
    /// Create a repository.
    pub const fn new(fetcher: F, cache: FileCache, policy: FetchPolicy) -> Self {
        Self {
            fetcher,
            cache,
            policy,
        }
    }

    /// Active policy.
    #[must_use]
    pub const fn policy(&self) -> FetchPolicy {
        self.policy
    }

    async fn fetch_and_cache(&self, key: &CacheKey) -> Result<RawDataset> {
        let text = self.fetcher.fetch_text(key.source_url()).await?;
        // Only documents that parse are worth keeping.
        let dataset = RawDataset::from_json(&text)?;
        self.cache.store_text(key, &text).await?;
        Ok(dataset)
    }
}

#[async_trait]
impl<F: DocumentFetcher> DatasetRepository for FetchingRepository<F> {
    #[instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &CacheKey) -> Result<RawDataset> {
        debug!(policy = ?self.policy, "resolving dataset");
        match self.policy {
            FetchPolicy::CacheOnly => self.cache.get(key).await,
            FetchPolicy::PreferCache => {
                if let Some(text) = self.cache.load_text(key).await? {
                    debug!("using cached dataset");
                    return RawDataset::from_json(&text);
                }
                info!("dataset not cached, fetching");
                self.fetch_and_cache(key).await
            },
            FetchPolicy::Network => self.fetch_and_cache(key).await,
        }
    }
}

/// Datasets held in memory, keyed by cache key name.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    datasets: HashMap<String, RawDataset>,
}

impl MemoryRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the dataset served for the key derived from `source_url`.
    pub fn insert(&mut self, source_url: &str, dataset: RawDataset) -> Result<()> {
        let key = CacheKey::from_source_url(source_url)?;
        self.datasets.insert(key.name, dataset);
        Ok(())
    }
}

#[async_trait]
impl DatasetRepository for MemoryRepository {
    async fn get(&self, key: &CacheKey) -> Result<RawDataset> {
        self.datasets
            .get(key.name())
            .cloned()
            .ok_or_else(|| Error::CacheMiss {
                key: key.name().to_string(),
            })
    }
}
