//! Asset acquisition -- moving located assets into a sink.
//!
//! Two sinks share one contract: one [`AcquisitionResult`] per descriptor,
//! returned in descriptor order, with a failed asset never affecting its
//! siblings.
//! - [`markup`] - appends sanitized fragments to the graphics bundle, strictly
//!   in ordinal order
//! - [`files`] - fetches URLs concurrently and writes them under
//!   `<book>/Chapter N/`
//!
//! [`AcquisitionResult`]: crate::types::AcquisitionResult

pub mod files;
pub mod markup;

pub use files::{FileSink, asset_file_name, extension_from_url};
pub use markup::MarkupSink;
