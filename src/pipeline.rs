//! Pipeline driver: wires iteration, location and acquisition into one run.
//!
//! Both modes walk the chapters in order and for each one read the title,
//! enter the content frame, locate the assets and hand them to a sink. They
//! differ only in the sink and in what the run leaves behind:
//! - [`Pipeline::run_bundle`] writes a single graphics bundle document
//! - [`Pipeline::run_download`] writes one directory per chapter
//!
//! The document source is closed when a run ends, fatal error or not.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::acquire::{FileSink, MarkupSink};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::locator::AssetLocator;
use crate::progress::{RunningSpinner, Spinner};
use crate::source::DocumentSource;
use crate::types::{AssetFailure, AssetKind, UnitContent, UnitRef, UnitReport, collect_failures};
use crate::units::UnitIterator;

/// Result of a graphics bundle run
#[derive(Debug, Serialize)]
pub struct BundleReport {
    /// Where the bundle was written
    pub path: PathBuf,
    /// The bundle itself
    #[serde(skip)]
    pub document: String,
    /// Per-chapter outcomes in chapter order
    pub units: Vec<UnitReport>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl BundleReport {
    /// Every asset that did not make it into the bundle
    pub fn failures(&self) -> Vec<AssetFailure<'_>> {
        collect_failures(&self.units)
    }
}

/// Result of an image download run
#[derive(Debug, Serialize)]
pub struct DownloadReport {
    /// `<out_dir>/<book>`
    pub root: PathBuf,
    /// Per-chapter outcomes in chapter order
    pub units: Vec<UnitReport>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl DownloadReport {
    /// Every asset transfer that failed
    pub fn failures(&self) -> Vec<AssetFailure<'_>> {
        collect_failures(&self.units)
    }

    /// Number of image files written
    pub fn files_written(&self) -> usize {
        self.units.iter().map(UnitReport::succeeded).sum()
    }

    /// Chapters that could not be processed at all
    pub fn failed_units(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|unit| unit.error.is_some())
    }
}

/// One configured extraction pipeline, reusable across runs
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: Config,
    units: UnitIterator,
    locator: AssetLocator,
}

impl Pipeline {
    /// Validate `config` and build the pipeline
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            units: UnitIterator::new(&config),
            locator: AssetLocator::new(&config),
            config,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build the graphics bundle and write it to `out_dir`.
    ///
    /// `source` must already show the chapter list at `book_url`.
    pub async fn run_bundle<S>(
        &self,
        source: &mut S,
        book_url: &str,
        out_dir: &Path,
    ) -> Result<BundleReport>
    where
        S: DocumentSource + ?Sized,
    {
        let started_at = Utc::now();
        let outcome = self.bundle(source, book_url).await;
        release_source(source).await;
        let (sink, units) = outcome?;

        let path = sink.output_path(out_dir);
        let document = sink.finish();
        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| Error::CreateDir {
                path: out_dir.to_path_buf(),
                source: e,
            })?;
        tokio::fs::write(&path, &document).await?;
        tracing::info!(path = %path.display(), chapters = units.len(), "Graphics bundle written");

        Ok(BundleReport {
            path,
            document,
            units,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Download every chapter's images under `<out_dir>/<book>`.
    ///
    /// `source` must already show the chapter list at `book_url`.
    pub async fn run_download<S>(
        &self,
        source: &mut S,
        book_url: &str,
        book: &str,
        out_dir: &Path,
    ) -> Result<DownloadReport>
    where
        S: DocumentSource + ?Sized,
    {
        let started_at = Utc::now();
        let outcome = match FileSink::new(&self.config.acquire, out_dir, book) {
            Ok(sink) => self.download(source, book_url, &sink).await.map(|units| (sink, units)),
            Err(e) => Err(e),
        };
        release_source(source).await;
        let (sink, units) = outcome?;

        let report = DownloadReport {
            root: sink.root().to_path_buf(),
            units,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            root = %report.root.display(),
            files = report.files_written(),
            failed = report.failures().len(),
            "Images downloaded"
        );
        Ok(report)
    }

    async fn bundle<S>(&self, source: &mut S, book_url: &str) -> Result<(MarkupSink, Vec<UnitReport>)>
    where
        S: DocumentSource + ?Sized,
    {
        let mut sink = MarkupSink::new(&self.config.markup);
        let mut reports = Vec::new();

        self.units
            .for_each_unit(source, book_url, async |source: &mut S, unit: &UnitRef| {
                let spinner = self.spinner(unit.ordinal);
                let content = match self.extract(source, unit, AssetKind::Markup).await {
                    Ok(content) => content,
                    Err(e) => return abandon(spinner, unit, e).await,
                };

                let results = sink.acquire(unit.ordinal, &content.title, &content.assets);
                spinner.stop(&finished_message(&content)).await;
                reports.push(UnitReport {
                    ordinal: unit.ordinal,
                    title: content.title,
                    located: content.assets.len(),
                    results,
                    error: None,
                });
                Ok(())
            })
            .await?;

        Ok((sink, reports))
    }

    async fn download<S>(&self, source: &mut S, book_url: &str, sink: &FileSink) -> Result<Vec<UnitReport>>
    where
        S: DocumentSource + ?Sized,
    {
        let mut reports = Vec::new();

        self.units
            .for_each_unit(source, book_url, async |source: &mut S, unit: &UnitRef| {
                let spinner = self.spinner(unit.ordinal);
                let content = match self.extract(source, unit, AssetKind::Url).await {
                    Ok(content) => content,
                    Err(e) => return abandon(spinner, unit, e).await,
                };

                let (results, error) = match sink.acquire(unit.ordinal, &content.assets).await {
                    Ok(results) => (results, None),
                    Err(e) => {
                        tracing::error!(chapter = unit.ordinal, error = %e, "Skipping chapter");
                        (Vec::new(), Some(e.to_string()))
                    }
                };
                let message = match &error {
                    Some(e) => format!("Chapter #{} skipped: {e}", unit.ordinal),
                    None => finished_message(&content),
                };
                spinner.stop(&message).await;

                reports.push(UnitReport {
                    ordinal: unit.ordinal,
                    title: content.title,
                    located: content.assets.len(),
                    results,
                    error,
                });
                Ok(())
            })
            .await?;

        Ok(reports)
    }

    /// Read the visited chapter: title from the page, assets from its frame
    async fn extract<S>(&self, source: &mut S, unit: &UnitRef, kind: AssetKind) -> Result<UnitContent>
    where
        S: DocumentSource + ?Sized,
    {
        let title = source.query_title().await?;
        source.enter_content_scope().await?;
        let located = self.locator.locate(source, kind).await;
        let left = source.leave_content_scope().await;
        let assets = located?;
        left?;

        if assets.is_empty() {
            tracing::info!(chapter = unit.ordinal, "found no images in Chapter {}", unit.ordinal);
        } else {
            tracing::debug!(chapter = unit.ordinal, assets = assets.len(), title = %title, "Chapter assets located");
        }

        Ok(UnitContent {
            ordinal: unit.ordinal,
            title,
            assets,
        })
    }

    fn spinner(&self, ordinal: u32) -> RunningSpinner {
        let message = format!("Processing Chapter #{ordinal}");
        let spinner = if self.config.show_progress {
            Spinner::new(message)
        } else {
            Spinner::hidden(message)
        };
        spinner.start()
    }
}

fn finished_message(content: &UnitContent) -> String {
    if content.assets.is_empty() {
        format!("Chapter #{} done, found no images", content.ordinal)
    } else {
        format!("Chapter #{} done...", content.ordinal)
    }
}

async fn abandon(spinner: RunningSpinner, unit: &UnitRef, error: Error) -> Result<()> {
    spinner
        .stop(&format!("Chapter #{} failed: {error}", unit.ordinal))
        .await;
    Err(error)
}

/// Close `source`, logging instead of returning a failure.
///
/// Runs end with this on every path, so a session that cannot be closed
/// never hides the run's own outcome.
pub async fn release_source<S>(source: &mut S)
where
    S: DocumentSource + ?Sized,
{
    if let Err(e) = source.close().await {
        tracing::warn!(error = %e, "Failed to close document source");
    }
}
