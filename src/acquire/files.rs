//! Per-chapter image download into `<book>/Chapter N/<book>_<N>_<i>.<ext>`.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};

use crate::config::AcquireConfig;
use crate::error::{Error, Result, TransferError};
use crate::types::{AcquisitionResult, AssetDescriptor, AssetSource};

/// Extension used when neither the URL nor the response reveals one
const FALLBACK_EXTENSION: &str = "bin";

/// Downloads a chapter's images concurrently into the book's directory tree
#[derive(Clone, Debug)]
pub struct FileSink {
    http: reqwest::Client,
    root: PathBuf,
    book: String,
    max_concurrent: usize,
}

impl FileSink {
    /// Create a sink writing under `out_dir/<book>`
    pub fn new(config: &AcquireConfig, out_dir: &Path, book: &str) -> Result<Self> {
        if book.is_empty() || book.contains(['/', '\\']) || book == "." || book == ".." {
            return Err(Error::Config {
                message: format!("book identifier {book:?} is not usable as a directory name"),
                key: None,
            });
        }

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            root: out_dir.join(book),
            book: book.to_string(),
            max_concurrent: config.max_concurrent_fetches.max(1),
        })
    }

    /// Root of the tree, `out_dir/<book>`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of chapter `unit`
    pub fn unit_dir(&self, unit: u32) -> PathBuf {
        self.root.join(format!("Chapter {unit}"))
    }

    /// Download every descriptor of chapter `unit`.
    ///
    /// The chapter directory is created first; failing that is the only error
    /// returned. Individual transfer failures are recorded in the results,
    /// which come back in ordinal order regardless of completion order.
    pub async fn acquire(
        &self,
        unit: u32,
        descriptors: &[AssetDescriptor],
    ) -> Result<Vec<AcquisitionResult>> {
        let dir = self.unit_dir(unit);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| Error::CreateDir {
                path: dir.clone(),
                source,
            })?;

        let mut results: Vec<AcquisitionResult> = stream::iter(descriptors)
            .map(|descriptor| self.fetch_one(unit, &dir, descriptor))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        results.sort_by_key(AcquisitionResult::ordinal);

        let failed = results.iter().filter(|r| !r.is_success()).count();
        tracing::info!(
            chapter = unit,
            assets = results.len(),
            failed = failed,
            "Chapter images downloaded"
        );
        Ok(results)
    }

    async fn fetch_one(
        &self,
        unit: u32,
        dir: &Path,
        descriptor: &AssetDescriptor,
    ) -> AcquisitionResult {
        let ordinal = descriptor.ordinal;
        let AssetSource::Url(url) = &descriptor.source else {
            return AcquisitionResult::Failed {
                ordinal,
                cause: TransferError::WrongKind {
                    ordinal,
                    expected: "URL",
                },
            };
        };

        tracing::debug!(chapter = unit, ordinal = ordinal, url = %url, "Downloading image");
        match self.transfer(unit, dir, ordinal, url).await {
            Ok((path, bytes)) => {
                tracing::debug!(chapter = unit, ordinal = ordinal, bytes = bytes, "Image written");
                AcquisitionResult::Written {
                    ordinal,
                    path,
                    bytes,
                }
            }
            Err(cause) => {
                tracing::warn!(chapter = unit, ordinal = ordinal, error = %cause, "Image transfer failed");
                AcquisitionResult::Failed { ordinal, cause }
            }
        }
    }

    async fn transfer(
        &self,
        unit: u32,
        dir: &Path,
        ordinal: usize,
        url: &str,
    ) -> std::result::Result<(PathBuf, u64), TransferError> {
        let network = |source| TransferError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.http.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let extension = extension_from_url(url)
            .or_else(|| {
                response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .and_then(extension_from_content_type)
            })
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        let body = response.bytes().await.map_err(network)?;
        let path = dir.join(asset_file_name(&self.book, unit, ordinal, &extension));
        tokio::fs::write(&path, &body)
            .await
            .map_err(|source| TransferError::Write {
                path: path.clone(),
                source,
            })?;
        Ok((path, body.len() as u64))
    }
}

/// `<book>_<unit>_<ordinal>.<extension>`
pub fn asset_file_name(book: &str, unit: u32, ordinal: usize, extension: &str) -> String {
    format!("{book}_{unit}_{ordinal}.{extension}")
}

/// Extension of the URL's last path segment, ignoring query and fragment.
///
/// ```
/// use chapter_harvest::acquire::extension_from_url;
///
/// assert_eq!(extension_from_url("https://cdn.example.com/up/fig.png?ver=2").as_deref(), Some("png"));
/// assert_eq!(extension_from_url("https://cdn.example.com/"), None);
/// ```
pub fn extension_from_url(url: &str) -> Option<String> {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or_default();
    let (stem, extension) = segment.rsplit_once('.')?;
    (!stem.is_empty() && !extension.is_empty()).then(|| extension.to_string())
}

/// `image/svg+xml; charset=utf-8` -> `svg`
fn extension_from_content_type(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim();
    let (kind, subtype) = mime.split_once('/')?;
    if kind != "image" || subtype.is_empty() {
        return None;
    }
    let subtype = subtype.split('+').next().unwrap_or(subtype);
    Some(match subtype {
        "jpeg" | "pjpeg" => "jpg".to_string(),
        other => other.to_string(),
    })
}
