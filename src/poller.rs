//! Readiness polling against a rendered page
//!
//! A query is re-run at a fixed interval until it yields something or a
//! deadline passes. What an expired deadline means depends on the tier:
//! - [`Poller::until_ready`] (content deadline): expiry is [`Readiness::Empty`],
//!   a legitimate terminal state
//! - [`Poller::until_present`] (structural deadline): expiry is
//!   [`Error::StructuralUnavailable`], fatal for the run

use std::time::Duration;
use tokio::time::Instant;

use crate::config::PollConfig;
use crate::error::{Error, Result};

/// Outcome of content polling
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness<T> {
    /// The query produced a non-empty result
    Ready(Vec<T>),
    /// The query stayed empty for the whole deadline
    Empty,
}

impl<T> Readiness<T> {
    /// Items if ready, an empty vector otherwise
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Readiness::Ready(items) => items,
            Readiness::Empty => Vec::new(),
        }
    }

    /// Whether the deadline expired without a result
    pub fn is_empty(&self) -> bool {
        matches!(self, Readiness::Empty)
    }
}

/// Re-run `query` every `interval` until it returns `Some` or `timeout` elapses.
///
/// The query always runs at least once, and once more at the deadline if the
/// interval does not divide it evenly. Query errors propagate immediately.
pub async fn poll<T, E>(
    interval: Duration,
    timeout: Duration,
    mut query: impl AsyncFnMut() -> std::result::Result<Option<T>, E>,
) -> std::result::Result<Option<T>, E> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(found) = query().await? {
            return Ok(Some(found));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

/// Poll cadence bound to the two deadline tiers
#[derive(Clone, Debug)]
pub struct Poller {
    interval: Duration,
    structural_timeout: Duration,
    content_timeout: Duration,
}

impl Poller {
    /// Build a poller from configuration
    pub fn new(config: &PollConfig) -> Self {
        Self {
            interval: config.interval,
            structural_timeout: config.structural_timeout,
            content_timeout: config.content_timeout,
        }
    }

    /// The structural deadline
    pub fn structural_timeout(&self) -> Duration {
        self.structural_timeout
    }

    /// Poll a list query under the content deadline.
    pub async fn until_ready<T, E>(
        &self,
        mut query: impl AsyncFnMut() -> std::result::Result<Vec<T>, E>,
    ) -> std::result::Result<Readiness<T>, E> {
        let found = poll(self.interval, self.content_timeout, async || {
            let items = query().await?;
            Ok((!items.is_empty()).then_some(items))
        })
        .await?;

        Ok(match found {
            Some(items) => Readiness::Ready(items),
            None => Readiness::Empty,
        })
    }

    /// Poll for a page region under the structural deadline.
    ///
    /// `element` names the region in the error raised on expiry.
    pub async fn until_present<T>(
        &self,
        element: &str,
        query: impl AsyncFnMut() -> Result<Option<T>>,
    ) -> Result<T> {
        match poll(self.interval, self.structural_timeout, query).await? {
            Some(found) => Ok(found),
            None => {
                tracing::error!(
                    element = element,
                    waited_ms = self.structural_timeout.as_millis(),
                    "Expected page element never appeared"
                );
                Err(Error::structural(element, self.structural_timeout))
            }
        }
    }

    /// Poll a list query under the structural deadline; an empty list is fatal.
    pub async fn until_listed<T>(
        &self,
        element: &str,
        mut query: impl AsyncFnMut() -> Result<Vec<T>>,
    ) -> Result<Vec<T>> {
        self.until_present(element, async || {
            let items = query().await?;
            Ok((!items.is_empty()).then_some(items))
        })
        .await
    }
}
