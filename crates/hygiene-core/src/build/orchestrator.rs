use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, instrument, warn};

use super::{AuthorityOutcome, BuildReport, BuildTask, SkippedAuthority};
use crate::config::{BuildConfig, FailurePolicy};
use crate::identifier::{
    AuthorityIdentifier, ESTABLISHMENTS_SITEMAP, INDEXES_SITEMAP, Identifier, RegionIndex,
    UrlScheme,
};
use crate::render::{AuthorityIndexPage, EstablishmentPage, IndexEntry, PageRenderer};
use crate::repository::{CacheKey, DatasetRepository};
use crate::scheduler::{TaskFailure, schedule};
use crate::sitemap;
use crate::types::{Authority, Establishment};
use crate::validate::validate_dataset;
use crate::writer::ArtifactWriter;
use crate::{Error, Result};

/// Result of one authority under the active failure policy.
enum AuthorityResult {
    Built(AuthorityOutcome),
    Skipped(SkippedAuthority),
}

/// Drives a full build over a dataset repository, a page renderer and an
/// artifact writer.
pub struct BuildOrchestrator<R, W, P> {
    repository: R,
    writer: W,
    renderer: P,
    scheme: UrlScheme,
    authority_concurrency: usize,
    write_concurrency: usize,
    on_authority_error: FailurePolicy,
}

impl<R, W, P> BuildOrchestrator<R, W, P>
where
    R: DatasetRepository,
    W: ArtifactWriter,
    P: PageRenderer,
{
    /// Create an orchestrator from validated settings.
    pub fn new(config: &BuildConfig, repository: R, writer: W, renderer: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            repository,
            writer,
            renderer,
            scheme: config.url_scheme()?,
            authority_concurrency: config.authority_concurrency,
            write_concurrency: config.write_concurrency,
            on_authority_error: config.on_authority_error,
        })
    }

    /// The artifact writer.
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    /// Build every authority, then the two top-level sitemap files.
    ///
    /// Under [`FailurePolicy::Abort`] the first failing authority stops
    /// dispatch and fails the build with [`Error::TaskFailed`]; artifacts
    /// already written stay on disk. Under [`FailurePolicy::Skip`] failing
    /// authorities are reported and left out of the sitemap files.
    #[instrument(skip_all, fields(authorities = authorities.len()))]
    pub async fn build(&self, authorities: &[Authority]) -> Result<BuildReport> {
        let regions = RegionIndex::from_authorities(authorities)?;
        let claimed = Mutex::new(HashSet::new());
        let (regions, claimed) = (&regions, &claimed);
        let pending: Vec<&Authority> = authorities.iter().collect();

        let results = schedule(
            pending,
            self.authority_concurrency,
            |authority| async move {
                match self.build_authority(authority, regions, claimed).await {
                    Ok(outcome) => Ok(AuthorityResult::Built(outcome)),
                    Err(err) if self.on_authority_error == FailurePolicy::Skip => {
                        warn!(
                            code = %authority.code,
                            category = err.category(),
                            error = %err,
                            "skipping authority"
                        );
                        Ok(AuthorityResult::Skipped(SkippedAuthority {
                            code: authority.code.clone(),
                            category: err.category(),
                            reason: err.to_string(),
                        }))
                    },
                    Err(err) => Err(err),
                }
            },
        )
        .await
        .map_err(|failure| task_failed(failure, |index| authorities[index].code.clone()))?;

        let mut report = BuildReport::default();
        for result in results {
            match result {
                AuthorityResult::Built(outcome) => report.authorities.push(outcome),
                AuthorityResult::Skipped(skipped) => report.skipped.push(skipped),
            }
        }

        let (index_url, index_path) = self.scheme.sitemap_file(ESTABLISHMENTS_SITEMAP)?;
        let index_xml =
            sitemap::sitemap_index(report.authorities.iter().map(|a| a.shard_url.as_str()))?;
        self.writer.write(&index_path, &index_xml).await?;

        let (indexes_url, indexes_path) = self.scheme.sitemap_file(INDEXES_SITEMAP)?;
        let indexes_xml =
            sitemap::urlset(report.authorities.iter().map(|a| a.index_url.as_str()))?;
        self.writer.write(&indexes_path, &indexes_xml).await?;

        report.establishments_sitemap_url = index_url;
        report.indexes_sitemap_url = indexes_url;

        info!(
            built = report.authorities.len(),
            skipped = report.skipped.len(),
            pages = report.page_count(),
            "build finished"
        );
        Ok(report)
    }

    /// Resolve, validate and write one authority.
    #[instrument(skip_all, fields(code = %authority.code))]
    async fn build_authority(
        &self,
        authority: &Authority,
        regions: &RegionIndex,
        claimed: &Mutex<HashSet<PathBuf>>,
    ) -> Result<AuthorityOutcome> {
        let key = CacheKey::from_source_url(&authority.dataset_url)?;
        let raw = self.repository.get(&key).await?;
        let dataset = validate_dataset(&raw)?;
        debug!(count = dataset.establishments.len(), "dataset validated");

        let authority_id = self.scheme.authority(authority)?;
        let identifiers = dataset
            .establishments
            .iter()
            .map(|establishment| self.scheme.establishment(establishment, regions))
            .collect::<Result<Vec<_>>>()?;

        claim_paths(claimed, &authority_id, &identifiers)?;

        let pages: Vec<(&Establishment, &Identifier)> =
            dataset.establishments.iter().zip(&identifiers).collect();

        let mut tasks: Vec<BuildTask<'_>> = pages
            .iter()
            .map(|&(establishment, identifier)| BuildTask::Page {
                establishment,
                identifier,
            })
            .collect();
        tasks.push(BuildTask::AuthorityIndex);
        tasks.push(BuildTask::SitemapShard);

        let labels: Vec<String> = tasks.iter().map(BuildTask::label).collect();
        let (authority_id_ref, pages_ref) = (&authority_id, &pages);

        schedule(tasks, self.write_concurrency, |task| async move {
            self.run_task(task, authority, authority_id_ref, pages_ref).await
        })
        .await
        .map_err(|failure| task_failed(failure, |index| labels[index].clone()))?;

        info!(pages = pages.len(), "authority written");

        Ok(AuthorityOutcome {
            code: authority.code.clone(),
            link_name: authority_id.link_name().to_string(),
            index_url: authority_id.index_url().to_string(),
            shard_url: authority_id.shard_url().to_string(),
            page_count: pages.len(),
            extract_date: dataset.header.extract_date,
        })
    }

    async fn run_task(
        &self,
        task: BuildTask<'_>,
        authority: &Authority,
        authority_id: &AuthorityIdentifier,
        pages: &[(&Establishment, &Identifier)],
    ) -> Result<()> {
        match task {
            BuildTask::Page {
                establishment,
                identifier,
            } => {
                let html = self.renderer.establishment_page(&EstablishmentPage {
                    establishment,
                    identifier,
                    authority,
                    authority_identifier: authority_id,
                })?;
                self.writer.write(identifier.page_path(), &html).await
            },
            BuildTask::AuthorityIndex => {
                let html = self.renderer.authority_index(&AuthorityIndexPage {
                    authority,
                    identifier: authority_id,
                    entries: pages
                        .iter()
                        .map(|&(establishment, identifier)| IndexEntry {
                            establishment,
                            identifier,
                        })
                        .collect(),
                })?;
                self.writer.write(authority_id.index_path(), &html).await
            },
            BuildTask::SitemapShard => {
                let xml = sitemap::urlset(pages.iter().map(|(_, id)| id.canonical_url()))?;
                self.writer.write(authority_id.shard_path(), &xml).await
            },
        }
    }
}

/// Reserve every output path of one authority for the rest of the build.
///
/// Two entities mapping to one path would leave one page silently
/// overwritten and a sitemap entry pointing at the wrong content.
fn claim_paths(
    claimed: &Mutex<HashSet<PathBuf>>,
    authority_id: &AuthorityIdentifier,
    identifiers: &[Identifier],
) -> Result<()> {
    let mut claimed = claimed.lock().unwrap_or_else(PoisonError::into_inner);
    let paths = identifiers
        .iter()
        .map(Identifier::page_path)
        .chain([authority_id.index_path(), authority_id.shard_path()]);

    for path in paths {
        if !claimed.insert(path.to_path_buf()) {
            return Err(Error::Config(format!(
                "output path '{}' is claimed by more than one entity",
                path.display()
            )));
        }
    }
    Ok(())
}

fn task_failed(failure: TaskFailure<Error>, label: impl Fn(usize) -> String) -> Error {
    Error::TaskFailed {
        index: failure.index,
        label: label(failure.index),
        source: Box::new(failure.error),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::render::HtmlRenderer;
    use crate::repository::MemoryRepository;
    use crate::types::{RawDataset, Region};
    use crate::writer::MemoryWriter;
    use async_trait::async_trait;
    use std::path::Path;

    fn authority(code: &str, friendly: &str, region: Region) -> Authority {
        Authority {
            code: code.to_string(),
            name: format!("{friendly} Council"),
            friendly_name: friendly.to_string(),
            region,
            dataset_url: format!("http://example.org/OpenDataFiles/FHRS{code}en-GB.json"),
        }
    }

    fn record(id: u64, name: &str, code: &str) -> String {
        format!(
            r#"{{"FHRSID": {id}, "BusinessName": "{name}", "BusinessType": "Restaurant/Cafe/Canteen",
                "AddressLine1": "1 Main Street", "PostCode": "AB1 2CD",
                "RatingValue": "4", "RatingKey": "fhrs_4_en-GB", "RatingDate": "2023-05-01T00:00:00",
                "LocalAuthorityCode": "{code}", "SchemeType": "FHRS",
                "Scores": {{"Hygiene": 5, "Structural": 5, "ConfidenceInManagement": 10}},
                "Geocode": {{"Longitude": "-2.1", "Latitude": "57.1"}}, "NewRatingPending": "False"}}"#
        )
    }

    fn dataset(records: &[String]) -> RawDataset {
        let collection = if records.is_empty() {
            "null".to_string()
        } else {
            format!(r#"{{"EstablishmentDetail": [{}]}}"#, records.join(","))
        };
        RawDataset::from_json(&format!(
            r#"{{"FHRSEstablishment": {{"Header": {{"ExtractDate": "2024-02-01", "ItemCount": "{}", "ReturnCode": "Success"}}, "EstablishmentCollection": {collection}}}}}"#,
            records.len()
        ))
        .unwrap()
    }

    fn config(policy: FailurePolicy) -> BuildConfig {
        BuildConfig {
            base_url: "https://ratings.example.org/".to_string(),
            authority_concurrency: 2,
            write_concurrency: 3,
            on_authority_error: policy,
            ..BuildConfig::default()
        }
    }

    fn orchestrator(
        repo: MemoryRepository,
        policy: FailurePolicy,
    ) -> BuildOrchestrator<MemoryRepository, MemoryWriter, HtmlRenderer> {
        BuildOrchestrator::new(&config(policy), repo, MemoryWriter::new(), HtmlRenderer::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_writes_every_artifact() {
        let york = authority("1", "york", Region::YorkshireAndHumberside);
        let leeds = authority("2", "leeds", Region::YorkshireAndHumberside);
        let mut repo = MemoryRepository::new();
        repo.insert(
            &york.dataset_url,
            dataset(&[record(10, "Cafe Nero", "1"), record(11, "Cafe Nero", "1")]),
        )
        .unwrap();
        repo.insert(&leeds.dataset_url, dataset(&[])).unwrap();
        let orch = orchestrator(repo, FailurePolicy::Abort);

        let report = orch.build(&[york, leeds]).await.unwrap();
        let writer = orch.writer();

        assert_eq!(report.page_count(), 2);
        assert_eq!(report.authorities.len(), 2);
        assert!(writer.get("region-yorkshire-and-humberside/cafe-nero-10.html").is_some());
        assert!(writer.get("region-yorkshire-and-humberside/cafe-nero-11.html").is_some());
        assert!(writer.get("l/york.html").is_some());
        assert!(writer.get("l/leeds.html").is_some());
        // 2 pages, 2 indexes, 2 shards, 2 top-level sitemaps.
        assert_eq!(writer.len(), 8);

        let shards =
            sitemap::parse_locs(&writer.get("sitemap/local-authority-establishments.xml").unwrap())
                .unwrap();
        assert_eq!(
            shards,
            vec![
                "https://ratings.example.org/sitemap/l-york.xml",
                "https://ratings.example.org/sitemap/l-leeds.xml"
            ]
        );
        let indexes =
            sitemap::parse_locs(&writer.get("sitemap/local-authority-indexes.xml").unwrap())
                .unwrap();
        assert_eq!(
            indexes,
            vec!["https://ratings.example.org/l/york", "https://ratings.example.org/l/leeds"]
        );
        let leeds_shard = writer.get("sitemap/l-leeds.xml").unwrap();
        assert!(sitemap::parse_locs(&leeds_shard).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abort_policy_fails_the_build() {
        let good = authority("1", "york", Region::YorkshireAndHumberside);
        let bad = authority("2", "leeds", Region::YorkshireAndHumberside);
        let mut repo = MemoryRepository::new();
        repo.insert(&good.dataset_url, dataset(&[record(10, "Cafe", "1")])).unwrap();
        repo.insert(&bad.dataset_url, dataset(&[record(20, "Bistro", "404")])).unwrap();
        let orch = orchestrator(repo, FailurePolicy::Abort);

        let err = orch.build(&[good, bad]).await.unwrap_err();

        match &err {
            Error::TaskFailed { index, label, .. } => {
                assert_eq!(*index, 1);
                assert_eq!(label, "2");
            },
            other => panic!("expected task failure, got {other:?}"),
        }
        assert!(matches!(err.root(), Error::UnknownRegionCode { code } if code == "404"));
        assert!(orch.writer().get("sitemap/local-authority-establishments.xml").is_none());
    }

    #[tokio::test]
    async fn test_skip_policy_leaves_failed_authority_out() {
        let good = authority("1", "york", Region::YorkshireAndHumberside);
        let missing = authority("3", "hull", Region::YorkshireAndHumberside);
        let mut repo = MemoryRepository::new();
        repo.insert(&good.dataset_url, dataset(&[record(10, "Cafe", "1")])).unwrap();
        let orch = orchestrator(repo, FailurePolicy::Skip);

        let report = orch.build(&[good, missing]).await.unwrap();

        assert_eq!(report.authorities.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].code, "3");
        assert_eq!(report.skipped[0].category, "cache");
        let index = orch
            .writer()
            .get("sitemap/local-authority-establishments.xml")
            .unwrap();
        let shards = sitemap::parse_locs(&index).unwrap();
        assert_eq!(shards, vec!["https://ratings.example.org/sitemap/l-york.xml"]);
    }

    #[tokio::test]
    async fn test_duplicate_output_path_is_rejected() {
        let york = authority("1", "york", Region::YorkshireAndHumberside);
        let mut repo = MemoryRepository::new();
        repo.insert(
            &york.dataset_url,
            dataset(&[record(10, "Cafe", "1"), record(10, "Cafe", "1")]),
        )
        .unwrap();
        let orch = orchestrator(repo, FailurePolicy::Abort);

        let err = orch.build(&[york]).await.unwrap_err();

        assert_eq!(err.root().category(), "config");
        assert!(orch.writer().is_empty());
    }

    struct FailingWriter {
        inner: MemoryWriter,
        fail_on: &'static str,
    }

    #[async_trait]
    impl ArtifactWriter for FailingWriter {
        async fn write(&self, relative: &Path, contents: &str) -> Result<()> {
            if relative == Path::new(self.fail_on) {
                return Err(Error::Io(std::io::Error::other("disk full")));
            }
            self.inner.write(relative, contents).await
        }
    }

    #[tokio::test]
    async fn test_write_failure_names_the_task() {
        let york = authority("1", "york", Region::YorkshireAndHumberside);
        let mut repo = MemoryRepository::new();
        repo.insert(&york.dataset_url, dataset(&[record(10, "Cafe", "1")])).unwrap();
        let writer = FailingWriter {
            inner: MemoryWriter::new(),
            fail_on: "l/york.html",
        };
        let orch = BuildOrchestrator::new(
            &config(FailurePolicy::Abort),
            repo,
            writer,
            HtmlRenderer::new(),
        )
        .unwrap();

        let err = orch.build(&[york]).await.unwrap_err();

        let Error::TaskFailed { source, .. } = &err else {
            panic!("expected task failure, got {err:?}");
        };
        assert!(matches!(
            source.as_ref(),
            Error::TaskFailed { label, .. } if label == "authority index"
        ));
        assert_eq!(err.root().category(), "io");
    }
}
