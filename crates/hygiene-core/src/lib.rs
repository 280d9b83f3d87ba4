//! # hygiene-core
//!
//! Static site builder for food hygiene inspection open data.
//!
//! The crate turns the published authority listing and one raw dataset per
//! local authority into a consistent set of static artifacts: one page per
//! establishment, one index page per authority, and a sitemap hierarchy that
//! points at exactly those pages.
//!
//! ## Architecture
//!
//! - **Scheduling**: bounded-concurrency fan-out with index-stable results
//! - **Validation**: raw records to a closed set of address and rating shapes
//! - **Identifiers**: deterministic, path-safe names and canonical URLs
//! - **Build**: composes the above with a dataset repository, a renderer and
//!   an artifact writer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hygiene_core::{BuildConfig, build::build_from_config, fetcher};
//!
//! # async fn run() -> hygiene_core::Result<()> {
//! let config = BuildConfig::load(std::path::Path::new("hygiene.toml"))?;
//! let http = fetcher::HttpFetcher::new()?;
//! let listing =
//!     fetcher::fetch_authority_listing(&http, "https://example.org/authorities.json").await?;
//!
//! let report = build_from_config(&config, &listing.authorities).await?;
//! println!("{} pages across {} authorities", report.page_count(), report.authorities.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. Build failures arrive wrapped
//! in [`Error::TaskFailed`]; [`Error::root`] reaches the cause:
//!
//! ```rust
//! use hygiene_core::Error;
//!
//! let err = Error::TaskFailed {
//!     index: 3,
//!     label: "999".to_string(),
//!     source: Box::new(Error::UnknownRegionCode { code: "999".to_string() }),
//! };
//! assert_eq!(err.root().category(), "config");
//! ```

/// Dataset-to-site builds
pub mod build;
/// Build settings
pub mod config;
/// Error types and result aliases
pub mod error;
/// HTTP access to upstream documents
pub mod fetcher;
/// Names, URLs and paths of generated pages
pub mod identifier;
/// Page rendering
pub mod render;
/// Raw dataset lookup and caching
pub mod repository;
/// Bounded-concurrency task scheduling
pub mod scheduler;
/// Sitemap documents
pub mod sitemap;
/// Raw and normalized data types
pub mod types;
/// Dataset validation
pub mod validate;
/// Artifact output
pub mod writer;

// Re-export commonly used types
pub use build::{BuildOrchestrator, BuildReport};
pub use config::{BuildConfig, FailurePolicy};
pub use error::{Error, Result};
pub use identifier::{Identifier, RegionIndex, UrlScheme};
pub use repository::{CacheKey, DatasetRepository, FetchPolicy};
pub use scheduler::schedule;
pub use types::*;
