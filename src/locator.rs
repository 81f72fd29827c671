//! Asset discovery inside a visited chapter.
//!
//! An image counts as an asset when its `src` contains the configured marker
//! substring; uploaded images carry it, editor templates and decorations do
//! not. The element's container is irrelevant.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::poller::{Poller, Readiness};
use crate::retry::with_retry;
use crate::source::DocumentSource;
use crate::types::{AssetDescriptor, AssetKind, AssetSource, RawAsset};

// Whole start tag: name, attribute section, optional self-closing slash
#[allow(clippy::expect_used)]
static START_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*<([A-Za-z][A-Za-z0-9:-]*)(.*?)(/?)>\s*$").expect("static pattern")
});

// One attribute: name, then a double-quoted, single-quoted or bare value
#[allow(clippy::expect_used)]
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("static pattern")
});

/// Attributes removed from markup fragments so the bundle is not pinned to the
/// editor's inline dimensions
const SIZE_ATTRIBUTES: [&str; 2] = ["width", "height"];

/// Finds a chapter's assets, tolerating slow rendering and one re-render
#[derive(Clone, Debug)]
pub struct AssetLocator {
    poller: Poller,
    retry: RetryConfig,
    marker: String,
}

impl AssetLocator {
    /// Build a locator from configuration
    pub fn new(config: &Config) -> Self {
        Self {
            poller: Poller::new(&config.poll),
            retry: config.retry.clone(),
            marker: config.selectors.asset_marker.clone(),
        }
    }

    /// Locate the assets of the chapter currently in scope.
    ///
    /// Polls until at least one marked image shows up or the content deadline
    /// passes, in which case the chapter has no assets. Each poll tolerates
    /// stale references according to the retry policy; one that survives the
    /// policy propagates.
    pub async fn locate<S>(&self, source: &mut S, kind: AssetKind) -> Result<Vec<AssetDescriptor>>
    where
        S: DocumentSource + ?Sized,
    {
        let readiness = self
            .poller
            .until_ready(async || {
                let raw = with_retry(&self.retry, async || {
                    source.query_asset_elements(kind).await
                })
                .await?;
                Ok::<_, Error>(self.select(raw))
            })
            .await?;

        Ok(match readiness {
            Readiness::Ready(found) => describe(found, kind),
            Readiness::Empty => Vec::new(),
        })
    }

    /// Keep only images whose `src` carries the marker, in document order
    fn select(&self, raw: Vec<RawAsset>) -> Vec<RawAsset> {
        raw.into_iter()
            .filter(|asset| asset.src.contains(&self.marker))
            .collect()
    }
}

fn describe(found: Vec<RawAsset>, kind: AssetKind) -> Vec<AssetDescriptor> {
    found
        .into_iter()
        .enumerate()
        .map(|(ordinal, asset)| {
            let source = match kind {
                AssetKind::Url => AssetSource::Url(asset.src),
                AssetKind::Markup => {
                    let markup = asset
                        .markup
                        .unwrap_or_else(|| format!("<img src=\"{}\">", escape_value(&asset.src)));
                    AssetSource::Fragment(strip_size_attributes(&markup))
                }
            };
            AssetDescriptor { ordinal, source }
        })
        .collect()
}

/// Remove `width` and `height` from a single start tag.
///
/// Remaining attributes keep their order and values; quoting is rewritten
/// canonically (double quotes, `"` escaped as `&quot;`, valueless attributes
/// bare). Input that is not a single start tag is returned trimmed but
/// otherwise untouched.
pub fn strip_size_attributes(fragment: &str) -> String {
    let Some(tag) = START_TAG.captures(fragment) else {
        tracing::debug!(fragment = fragment, "Fragment is not a single start tag, left as is");
        return fragment.trim().to_string();
    };

    let name = &tag[1];
    let mut out = format!("<{name}");
    for attribute in ATTRIBUTE.captures_iter(&tag[2]) {
        let key = &attribute[1];
        if SIZE_ATTRIBUTES
            .iter()
            .any(|size| key.eq_ignore_ascii_case(size))
        {
            continue;
        }
        let value = attribute
            .get(2)
            .or_else(|| attribute.get(3))
            .or_else(|| attribute.get(4));
        match value {
            Some(value) => {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_value(value.as_str()));
                out.push('"');
            }
            None => {
                out.push(' ');
                out.push_str(key);
            }
        }
    }
    if !tag[3].is_empty() {
        out.push_str(" /");
    }
    out.push('>');
    out
}

fn escape_value(value: &str) -> String {
    value.replace('"', "&quot;")
}
