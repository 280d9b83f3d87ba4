//! Deterministic names, URLs and paths for generated pages.
//!
//! Two passes turn free text into a path segment:
//!
//! - [`slugify`] is the readable pass: lower-case, separators to hyphens,
//!   everything else stripped, hyphens collapsed and trimmed.
//! - [`encode_name`] is the strict pass, always applied last: anything outside
//!   `[a-z0-9-]` becomes a hyphen, and legacy reserved device names are refused.
//!
//! Every entity gets its canonical URL and output path computed once, in an
//! [`Identifier`] or [`AuthorityIdentifier`], and those values are reused
//! verbatim wherever the entity is referenced.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::types::{Authority, Establishment, Region};
use crate::{Error, Result};

/// Device names that must never appear as a path segment.
const RESERVED_NAMES: [&str; 22] = [
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

#[allow(clippy::expect_used)]
static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("separator regex is valid"));
#[allow(clippy::expect_used)]
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("non-word regex is valid"));
#[allow(clippy::expect_used)]
static HYPHEN_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-{2,}").expect("hyphen regex is valid"));

/// Strict path-segment encoding.
///
/// Lower-cases `text` and replaces every character outside `[a-z0-9-]` with a
/// hyphen. Fails with [`Error::ReservedNameCollision`] if the result is a
/// legacy reserved device name.
///
/// ```rust
/// use hygiene_core::identifier::encode_name;
///
/// assert_eq!(encode_name("Fish & Chips")?, "fish---chips");
/// assert!(encode_name("COM5").is_err());
/// # Ok::<(), hygiene_core::Error>(())
/// ```
pub fn encode_name(text: &str) -> Result<String> {
    let encoded: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '-',
        })
        .collect();

    if RESERVED_NAMES.contains(&encoded.as_str()) {
        return Err(Error::ReservedNameCollision { name: encoded });
    }
    Ok(encoded)
}

/// Readable slug: `"Joe's  Café & Bar"` becomes `"joes-caf-bar"`.
///
/// Whitespace and underscores separate words; any other character outside
/// `[a-z0-9-]` is dropped after lower-casing.
#[must_use]
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    let separated = SEPARATORS.replace_all(&lower, "-");
    let stripped = NON_WORD.replace_all(&separated, "");
    let collapsed = HYPHEN_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Link name of an establishment: slugged business name plus its identifier.
///
/// The identifier is appended before the strict pass, so two businesses
/// with the same name never share a link name.
pub fn establishment_link_name(business_name: &str, id: u64) -> Result<String> {
    encode_name(&format!("{}-{id}", slugify(business_name)))
}

/// Link name of an authority, from its friendly name.
pub fn authority_link_name(friendly_name: &str) -> Result<String> {
    encode_name(friendly_name)
}

/// Authority code to region lookup, built once from the authority listing.
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    regions: HashMap<String, Region>,
}

impl RegionIndex {
    /// Build the index. A code listed under two different regions is a
    /// configuration error.
    pub fn from_authorities<'a>(
        authorities: impl IntoIterator<Item = &'a Authority>,
    ) -> Result<Self> {
        let mut regions = HashMap::new();
        for authority in authorities {
            match regions.insert(authority.code.clone(), authority.region) {
                Some(previous) if previous != authority.region => {
                    return Err(Error::Config(format!(
                        "authority code '{}' is listed under both {previous} and {}",
                        authority.code, authority.region
                    )));
                },
                _ => {},
            }
        }
        Ok(Self { regions })
    }

    /// Region of an authority code. A miss is never defaulted.
    pub fn resolve(&self, code: &str) -> Result<Region> {
        self.regions
            .get(code)
            .copied()
            .ok_or_else(|| Error::UnknownRegionCode {
                code: code.to_string(),
            })
    }

    /// Number of mapped codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no codes are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Derived identity of an establishment page. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    link_name: String,
    region: Region,
    canonical_url: String,
    page_path: PathBuf,
}

impl Identifier {
    /// Encoded link name, e.g. `the-crown-42`.
    #[must_use]
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    /// Resolved region.
    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Canonical URL, also used as the sitemap `<loc>`.
    #[must_use]
    pub fn canonical_url(&self) -> &str {
        &self.canonical_url
    }

    /// Output path relative to the output root, e.g. `region-scotland/the-crown-42.html`.
    #[must_use]
    pub fn page_path(&self) -> &Path {
        &self.page_path
    }
}

/// Derived identity of an authority: its index page and its sitemap shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityIdentifier {
    link_name: String,
    index_url: String,
    index_path: PathBuf,
    shard_url: String,
    shard_path: PathBuf,
}

impl AuthorityIdentifier {
    /// Encoded link name, from the friendly name.
    #[must_use]
    pub fn link_name(&self) -> &str {
        &self.link_name
    }

    /// Canonical URL of the authority index page.
    #[must_use]
    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    /// Output path of the authority index page, `l/<name>.html`.
    #[must_use]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// URL of the authority's sitemap shard.
    #[must_use]
    pub fn shard_url(&self) -> &str {
        &self.shard_url
    }

    /// Output path of the authority's sitemap shard, `sitemap/l-<name>.xml`.
    #[must_use]
    pub fn shard_path(&self) -> &Path {
        &self.shard_path
    }
}

/// Directory holding sitemap files.
pub const SITEMAP_DIR: &str = "sitemap";
/// Sitemap index over every authority shard.
pub const ESTABLISHMENTS_SITEMAP: &str = "local-authority-establishments.xml";
/// Urlset of every authority index page.
pub const INDEXES_SITEMAP: &str = "local-authority-indexes.xml";

/// Maps entities to URLs below a base URL and to paths below the output root.
#[derive(Debug, Clone)]
pub struct UrlScheme {
    base: Url,
}

impl UrlScheme {
    /// Create a scheme rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(Error::InvalidUrl(format!("'{base_url}' cannot be a base URL")));
        }
        if base.query().is_some() || base.fragment().is_some() {
            return Err(Error::InvalidUrl(format!(
                "base URL '{base_url}' must not carry a query or fragment"
            )));
        }
        Ok(Self { base })
    }

    /// The base URL.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// URL of `segments` below the base; each segment is percent-encoded.
    pub fn url_for(&self, segments: &[&str]) -> Result<String> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(format!("'{}' cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    /// Derive the identifier of an establishment.
    pub fn establishment(
        &self,
        establishment: &Establishment,
        regions: &RegionIndex,
    ) -> Result<Identifier> {
        let region = regions.resolve(&establishment.authority_code)?;
        let link_name = establishment_link_name(&establishment.business_name, establishment.id)?;
        let region_segment = format!("region-{}", region.slug());

        let canonical_url = self.url_for(&[&region_segment, &link_name])?;
        let page_path = Path::new(&region_segment).join(format!("{link_name}.html"));

        Ok(Identifier {
            link_name,
            region,
            canonical_url,
            page_path,
        })
    }

    /// Derive the identifier of an authority.
    pub fn authority(&self, authority: &Authority) -> Result<AuthorityIdentifier> {
        let link_name = authority_link_name(&authority.friendly_name)?;
        let shard_file = format!("l-{link_name}.xml");

        Ok(AuthorityIdentifier {
            index_url: self.url_for(&["l", &link_name])?,
            index_path: Path::new("l").join(format!("{link_name}.html")),
            shard_url: self.url_for(&[SITEMAP_DIR, &shard_file])?,
            shard_path: Path::new(SITEMAP_DIR).join(shard_file),
            link_name,
        })
    }

    /// URL and output path of a top-level sitemap file.
    pub fn sitemap_file(&self, file_name: &str) -> Result<(String, PathBuf)> {
        Ok((
            self.url_for(&[SITEMAP_DIR, file_name])?,
            Path::new(SITEMAP_DIR).join(file_name),
        ))
    }
}
