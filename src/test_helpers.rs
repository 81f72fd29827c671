//! Shared test helpers: an in-memory document source for unit tests.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::source::DocumentSource;
use crate::types::{AssetKind, NavigationEpoch, RawAsset, UnitRef};

/// One chapter of a [`FakeSource`]
pub(crate) struct FakeChapter {
    pub title: String,
    /// Result of the n-th asset query after visiting; the last entry repeats
    pub asset_polls: Vec<Vec<RawAsset>>,
}

impl FakeChapter {
    pub fn new(title: &str, assets: Vec<RawAsset>) -> Self {
        Self {
            title: title.to_string(),
            asset_polls: vec![assets],
        }
    }
}

/// Scripted [`DocumentSource`] that records every call in `log`
#[derive(Default)]
pub(crate) struct FakeSource {
    pub chapters: Vec<FakeChapter>,
    pub log: Vec<String>,
    pub asset_queries: usize,
    /// Number of upcoming asset queries that fail with a stale reference
    pub stale_failures: usize,
    /// Number of initial `list_units` calls that return nothing
    pub empty_listings: usize,
    /// Ordinal of the chapter whose return to the index fails
    pub fail_return_after: Option<u32>,
    /// Drop the last chapter from listings after the first one
    pub shrink_after_first_listing: bool,
    pub closed: bool,
    /// Make `close` report a failure after recording the attempt
    pub fail_close: bool,
    epoch: NavigationEpoch,
    current: Option<usize>,
    polls_in_chapter: usize,
    listings: usize,
}

impl FakeSource {
    pub fn new(chapters: Vec<FakeChapter>) -> Self {
        Self {
            chapters,
            ..Self::default()
        }
    }

    /// A source already sitting inside one chapter's content
    pub fn with_assets(asset_polls: Vec<Vec<RawAsset>>) -> Self {
        Self {
            chapters: vec![FakeChapter {
                title: "Only".to_string(),
                asset_polls,
            }],
            current: Some(0),
            ..Self::default()
        }
    }

    fn chapter(&self) -> Result<&FakeChapter> {
        self.current
            .and_then(|index| self.chapters.get(index))
            .ok_or_else(|| Error::structural("chapter page", std::time::Duration::ZERO))
    }
}

#[async_trait(?Send)]
impl DocumentSource for FakeSource {
    async fn list_units(&mut self) -> Result<Vec<UnitRef>> {
        self.listings += 1;
        if self.empty_listings > 0 {
            self.empty_listings -= 1;
            return Ok(Vec::new());
        }
        let mut count = self.chapters.len();
        if self.shrink_after_first_listing && self.listings > 1 {
            count -= 1;
        }
        Ok((1..=count as u32)
            .map(|ordinal| UnitRef::new(ordinal, format!("fake://chapter/{ordinal}"), &self.epoch))
            .collect())
    }

    async fn visit(&mut self, unit: &UnitRef) -> Result<()> {
        self.epoch.check(unit)?;
        self.log.push(format!("visit {}", unit.ordinal));
        self.epoch.advance();
        self.current = Some(unit.ordinal as usize - 1);
        self.polls_in_chapter = 0;
        Ok(())
    }

    async fn enter_content_scope(&mut self) -> Result<()> {
        self.log.push("enter".to_string());
        Ok(())
    }

    async fn leave_content_scope(&mut self) -> Result<()> {
        self.log.push("leave".to_string());
        Ok(())
    }

    async fn query_title(&mut self) -> Result<String> {
        Ok(self.chapter()?.title.clone())
    }

    async fn query_asset_elements(&mut self, _kind: AssetKind) -> Result<Vec<RawAsset>> {
        self.asset_queries += 1;
        if self.stale_failures > 0 {
            self.stale_failures -= 1;
            return Err(Error::StaleReference("content re-rendered".to_string()));
        }
        let index = self.polls_in_chapter;
        self.polls_in_chapter += 1;
        let polls = &self.chapter()?.asset_polls;
        Ok(polls
            .get(index)
            .or_else(|| polls.last())
            .cloned()
            .unwrap_or_default())
    }

    async fn return_to_index(&mut self, book_url: &str) -> Result<()> {
        let ordinal = self.current.map(|index| index as u32 + 1);
        self.log.push("index".to_string());
        self.epoch.advance();
        self.current = None;
        if ordinal.is_some() && ordinal == self.fail_return_after {
            return Err(Error::Navigation {
                url: book_url.to_string(),
                reason: "page did not load".to_string(),
            });
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        if self.fail_close {
            return Err(Error::WebDriver {
                code: "invalid session id".to_string(),
                message: "session already gone".to_string(),
            });
        }
        Ok(())
    }
}
