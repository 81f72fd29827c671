//! Chapter iteration over a volatile chapter list.
//!
//! The index page reloads between chapters, so element handles from one
//! listing are useless after the next navigation. Only the initial count is
//! kept; the reference for chapter `i` is re-resolved from a fresh listing
//! right before it is visited.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::poller::Poller;
use crate::source::DocumentSource;
use crate::types::UnitRef;

/// Drives the enumerate, visit, process, return cycle
#[derive(Clone, Debug)]
pub struct UnitIterator {
    poller: Poller,
}

impl UnitIterator {
    /// Build an iterator from configuration
    pub fn new(config: &Config) -> Self {
        Self {
            poller: Poller::new(&config.poll),
        }
    }

    /// Visit every chapter in ascending order `1..=N` and run `per_unit` on it.
    ///
    /// The index page is reloaded after each chapter whatever `per_unit`
    /// returned. An error from `per_unit` stops the iteration once the index
    /// is back; a failed reload stops it with [`Error::Navigation`].
    ///
    /// Returns the number of chapters visited.
    pub async fn for_each_unit<S>(
        &self,
        source: &mut S,
        book_url: &str,
        mut per_unit: impl AsyncFnMut(&mut S, &UnitRef) -> Result<()>,
    ) -> Result<u32>
    where
        S: DocumentSource + ?Sized,
    {
        let total = self.resolve(source).await?.len() as u32;
        tracing::info!(chapters = total, "Chapter list resolved");

        for ordinal in 1..=total {
            let unit = self
                .resolve(source)
                .await?
                .into_iter()
                .nth(ordinal as usize - 1)
                .ok_or_else(|| {
                    Error::structural(
                        format!("chapter #{ordinal} in the chapter list"),
                        self.poller.structural_timeout(),
                    )
                })?;

            tracing::debug!(chapter = ordinal, target = %unit.target, "Visiting chapter");
            source.visit(&unit).await?;

            let outcome = per_unit(&mut *source, &unit).await;
            let back = source.return_to_index(book_url).await;

            if let Err(e) = &outcome {
                tracing::error!(chapter = ordinal, error = %e, "Chapter processing aborted the run");
            }
            outcome?;
            back.map_err(|e| match e {
                nav @ Error::Navigation { .. } => nav,
                other => Error::Navigation {
                    url: book_url.to_string(),
                    reason: other.to_string(),
                },
            })?;
        }

        Ok(total)
    }

    async fn resolve<S>(&self, source: &mut S) -> Result<Vec<UnitRef>>
    where
        S: DocumentSource + ?Sized,
    {
        self.poller
            .until_listed("chapter list", async || source.list_units().await)
            .await
    }
}
