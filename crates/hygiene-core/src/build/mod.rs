//! Whole-site builds.
//!
//! A build takes the authority listing, resolves and validates every
//! authority's dataset, and writes:
//!
//! - one page per establishment
//! - one index page and one sitemap shard per authority
//! - a sitemap index over every shard and a urlset of every index page
//!
//! Authorities are processed through [`crate::scheduler::schedule`] with a
//! fixed ceiling, and each authority's writes are scheduled the same way.
//! Every URL that appears in a sitemap is the exact string computed by
//! [`crate::identifier::UrlScheme`] for the page it points to.

mod orchestrator;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::BuildConfig;
use crate::fetcher::HttpFetcher;
use crate::identifier::Identifier;
use crate::render::HtmlRenderer;
use crate::repository::{FetchingRepository, FileCache};
use crate::types::{Authority, Establishment};
use crate::writer::FsWriter;
use crate::Result;

pub use orchestrator::BuildOrchestrator;

/// One unit of scheduled write work for an authority.
#[derive(Debug, Clone, Copy)]
pub enum BuildTask<'a> {
    /// Render and write one establishment page.
    Page {
        /// The establishment.
        establishment: &'a Establishment,
        /// Its identifier.
        identifier: &'a Identifier,
    },
    /// Render and write the authority index page.
    AuthorityIndex,
    /// Write the authority sitemap shard.
    SitemapShard,
}

impl BuildTask<'_> {
    /// Short label for logs and task failures.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Page { identifier, .. } => format!("page {}", identifier.link_name()),
            Self::AuthorityIndex => "authority index".to_string(),
            Self::SitemapShard => "sitemap shard".to_string(),
        }
    }
}

/// What was built for one authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityOutcome {
    /// Authority code.
    pub code: String,
    /// Encoded link name.
    pub link_name: String,
    /// Canonical URL of the index page.
    pub index_url: String,
    /// URL of the sitemap shard.
    pub shard_url: String,
    /// Number of establishment pages written.
    pub page_count: usize,
    /// Extract date of the dataset the pages were built from.
    pub extract_date: NaiveDate,
}

/// An authority left out under the skip policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedAuthority {
    /// Authority code.
    pub code: String,
    /// Error category, see [`crate::Error::category`].
    pub category: &'static str,
    /// Error message.
    pub reason: String,
}

/// Summary of a finished build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    /// Built authorities, in listing order.
    pub authorities: Vec<AuthorityOutcome>,
    /// Authorities left out, in listing order.
    pub skipped: Vec<SkippedAuthority>,
    /// URL of the sitemap index over all shards.
    pub establishments_sitemap_url: String,
    /// URL of the urlset of authority index pages.
    pub indexes_sitemap_url: String,
}

impl BuildReport {
    /// Total number of establishment pages written.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.authorities.iter().map(|a| a.page_count).sum()
    }
}

/// Build the site described by `config` from the network and dataset cache.
pub async fn build_from_config(
    config: &BuildConfig,
    authorities: &[Authority],
) -> Result<BuildReport> {
    let repository = FetchingRepository::new(
        HttpFetcher::new()?,
        FileCache::new(&config.cache_dir),
        config.fetch_policy,
    );
    let orchestrator = BuildOrchestrator::new(
        config,
        repository,
        FsWriter::new(&config.out_dir),
        HtmlRenderer::new(),
    )?;
    orchestrator.build(authorities).await
}
