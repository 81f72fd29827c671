//! # chapter-harvest
//!
//! Extracts chapter images from a live, JavaScript-rendered book editor.
//!
//! The crate walks a book's chapter list in a browser session, reads each
//! chapter's title and the uploaded images inside its editor frame, and then
//! either:
//! - assembles the image markup into one graphics bundle document, or
//! - downloads the images into `<book>/Chapter N/<book>_<N>_<i>.<ext>`.
//!
//! ## Design
//!
//! - **Single-owner session** - the browser session is a [`DocumentSource`]
//!   taken by `&mut`, so no two page operations can overlap
//! - **Two deadlines** - a short structural wait whose expiry aborts the run,
//!   and a longer content wait whose expiry means "no images"
//! - **Failure isolation** - a failed image is recorded against its ordinal
//!   and never affects its siblings
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use chapter_harvest::{Config, Pipeline, WebDriverSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut source = WebDriverSource::connect(&config).await?;
//!     source.open("https://cdp.example.com/book/1234").await?;
//!
//!     let report = Pipeline::new(config)?
//!         .run_download(&mut source, "https://cdp.example.com/book/1234", "B01234", Path::new("."))
//!         .await?;
//!     println!("{} images written to {}", report.files_written(), report.root.display());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Asset sinks: graphics bundle and image files
pub mod acquire;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Asset location and markup sanitization
pub mod locator;
/// Pipeline driver
pub mod pipeline;
/// Readiness polling with structural and content deadlines
pub mod poller;
/// Terminal spinner
pub mod progress;
/// Retry policy for transient failures
pub mod retry;
/// Document source contract and WebDriver implementation
pub mod source;
/// Core data types
pub mod types;
/// Chapter iteration
pub mod units;

#[cfg(test)]
mod test_helpers;

pub use acquire::{FileSink, MarkupSink};
pub use config::Config;
pub use error::{Error, Result, TransferError};
pub use locator::{AssetLocator, strip_size_attributes};
pub use pipeline::{BundleReport, DownloadReport, Pipeline, release_source};
pub use poller::{Poller, Readiness};
pub use progress::{RunningSpinner, Spinner};
pub use retry::{IsRetryable, with_retry};
pub use source::{DocumentSource, WebDriverSource};
pub use types::{
    AcquisitionResult, AssetDescriptor, AssetFailure, AssetKind, AssetSource, NavigationEpoch,
    RawAsset, UnitContent, UnitRef, UnitReport,
};
pub use units::UnitIterator;
