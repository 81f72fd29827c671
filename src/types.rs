//! Core types for chapter-harvest

use serde::{Serialize, Serializer};
use std::path::PathBuf;

use crate::error::{Error, Result, TransferError};

/// Counter bumped on every navigation of a document source
///
/// A [`UnitRef`] remembers the epoch of the chapter list it came from; once the
/// source navigates, the epoch moves on and the reference can no longer be
/// visited. Sources call [`NavigationEpoch::check`] at the top of `visit`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NavigationEpoch(u64);

impl NavigationEpoch {
    /// Record a navigation
    pub fn advance(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Current value, stamped into freshly listed unit references
    pub fn current(&self) -> u64 {
        self.0
    }

    /// Fail with [`Error::OutdatedUnitRef`] unless `unit` belongs to the current snapshot
    pub fn check(&self, unit: &UnitRef) -> Result<()> {
        if unit.epoch == self.0 {
            Ok(())
        } else {
            Err(Error::OutdatedUnitRef {
                ordinal: unit.ordinal,
            })
        }
    }
}

/// Handle to one chapter as currently listed on the index page
///
/// Valid within one enumeration snapshot only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitRef {
    /// 1-based position in the chapter list
    pub ordinal: u32,
    /// Navigable target (the chapter editor URL)
    pub target: String,
    pub(crate) epoch: u64,
}

impl UnitRef {
    /// Create a reference stamped with the source's current epoch
    pub fn new(ordinal: u32, target: impl Into<String>, epoch: &NavigationEpoch) -> Self {
        Self {
            ordinal,
            target: target.into(),
            epoch: epoch.current(),
        }
    }
}

/// What the active sink needs from each image element
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// The element's outer HTML (graphics bundle)
    Markup,
    /// The element's resolved `src` URL (image download)
    Url,
}

/// An image-bearing element as reported by a document source, in document order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAsset {
    /// Value of the `src` attribute, used for the inclusion rule
    pub src: String,
    /// Outer HTML, present when markup was requested
    pub markup: Option<String>,
}

impl RawAsset {
    /// Element known only by its `src`
    pub fn url(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            markup: None,
        }
    }

    /// Element with its outer HTML
    pub fn with_markup(src: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            markup: Some(markup.into()),
        }
    }
}

/// Payload of a located asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum AssetSource {
    /// Sanitized markup fragment
    Fragment(String),
    /// Resolvable URL
    Url(String),
}

/// One located asset with its stable, zero-based position in the chapter
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AssetDescriptor {
    /// Zero-based position among the chapter's included images
    pub ordinal: usize,
    /// Fragment or URL
    pub source: AssetSource,
}

/// Readable state of a visited chapter
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitContent {
    /// 1-based chapter number
    pub ordinal: u32,
    /// Chapter title as shown in the editor
    pub title: String,
    /// Located assets in ordinal order
    pub assets: Vec<AssetDescriptor>,
}

/// Outcome of transferring one asset
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AcquisitionResult {
    /// Fragment appended to the chapter's markup
    Appended {
        /// Descriptor ordinal
        ordinal: usize,
        /// Length of the appended block in bytes
        bytes: usize,
    },
    /// Body written to disk
    Written {
        /// Descriptor ordinal
        ordinal: usize,
        /// Destination file
        path: PathBuf,
        /// Body length in bytes
        bytes: u64,
    },
    /// Transfer failed; siblings are unaffected
    Failed {
        /// Descriptor ordinal
        ordinal: usize,
        /// Why it failed
        #[serde(serialize_with = "serialize_display")]
        cause: TransferError,
    },
}

impl AcquisitionResult {
    /// Ordinal of the descriptor this result belongs to
    pub fn ordinal(&self) -> usize {
        match self {
            AcquisitionResult::Appended { ordinal, .. }
            | AcquisitionResult::Written { ordinal, .. }
            | AcquisitionResult::Failed { ordinal, .. } => *ordinal,
        }
    }

    /// Whether the asset made it to the sink
    pub fn is_success(&self) -> bool {
        !matches!(self, AcquisitionResult::Failed { .. })
    }

    /// Failure cause, if any
    pub fn failure(&self) -> Option<&TransferError> {
        match self {
            AcquisitionResult::Failed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

/// Per-chapter entry of a run summary
#[derive(Debug, Serialize)]
pub struct UnitReport {
    /// 1-based chapter number
    pub ordinal: u32,
    /// Chapter title
    pub title: String,
    /// Number of located assets
    pub located: usize,
    /// One result per located asset, in ordinal order
    pub results: Vec<AcquisitionResult>,
    /// Set when the chapter could not be processed at all (e.g. its directory
    /// could not be created)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UnitReport {
    /// Count of assets that reached the sink
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Count of recorded transfer failures
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }
}

/// One recorded asset failure, for the final summary
#[derive(Debug, Serialize)]
pub struct AssetFailure<'a> {
    /// Chapter number
    pub unit: u32,
    /// Asset ordinal within the chapter
    pub ordinal: usize,
    /// Why it failed
    #[serde(serialize_with = "serialize_display")]
    pub cause: &'a TransferError,
}

/// Collect every asset failure across chapters
pub fn collect_failures(units: &[UnitReport]) -> Vec<AssetFailure<'_>> {
    units
        .iter()
        .flat_map(|unit| {
            unit.results.iter().filter_map(move |result| {
                result.failure().map(|cause| AssetFailure {
                    unit: unit.ordinal,
                    ordinal: result.ordinal(),
                    cause,
                })
            })
        })
        .collect()
}

fn serialize_display<T, S>(value: &T, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    T: std::fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_rejects_references_from_earlier_snapshots() {
        let mut epoch = NavigationEpoch::default();
        let unit = UnitRef::new(1, "https://example.com/ch1", &epoch);
        assert!(epoch.check(&unit).is_ok());

        epoch.advance();
        assert!(matches!(
            epoch.check(&unit),
            Err(Error::OutdatedUnitRef { ordinal: 1 })
        ));

        let fresh = UnitRef::new(1, "https://example.com/ch1", &epoch);
        assert!(epoch.check(&fresh).is_ok());
    }

    #[test]
    fn unit_report_counts_and_failures() {
        let report = UnitReport {
            ordinal: 4,
            title: "Networking".into(),
            located: 3,
            results: vec![
                AcquisitionResult::Written {
                    ordinal: 0,
                    path: PathBuf::from("b/Chapter 4/b_4_0.png"),
                    bytes: 10,
                },
                AcquisitionResult::Failed {
                    ordinal: 1,
                    cause: TransferError::Status {
                        status: 500,
                        url: "https://cdn/x.png".into(),
                    },
                },
                AcquisitionResult::Written {
                    ordinal: 2,
                    path: PathBuf::from("b/Chapter 4/b_4_2.png"),
                    bytes: 12,
                },
            ],
            error: None,
        };
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);

        let reports = [report];
        let failures = collect_failures(&reports);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].unit, 4);
        assert_eq!(failures[0].ordinal, 1);
    }

    #[test]
    fn failed_result_serializes_cause_as_text() {
        let result = AcquisitionResult::Failed {
            ordinal: 2,
            cause: TransferError::Status {
                status: 404,
                url: "https://cdn/y.jpg".into(),
            },
        };
        let json = serde_json::to_value(&result).expect("serialize failed");
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["ordinal"], 2);
        assert_eq!(json["cause"], "HTTP 404 for https://cdn/y.jpg");
    }
}
