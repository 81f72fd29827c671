//! Scripted in-memory document source

use async_trait::async_trait;
use chapter_harvest::{
    AssetKind, DocumentSource, Error, NavigationEpoch, RawAsset, Result, UnitRef,
};

/// One chapter as the editor would render it
#[derive(Clone, Debug)]
pub struct ScriptedChapter {
    pub title: String,
    pub images: Vec<RawAsset>,
    /// Asset queries that come back empty before the images render
    pub render_delay_polls: usize,
}

impl ScriptedChapter {
    pub fn new(title: &str, images: Vec<RawAsset>) -> Self {
        Self {
            title: title.to_string(),
            images,
            render_delay_polls: 0,
        }
    }

    pub fn rendering_after(mut self, polls: usize) -> Self {
        self.render_delay_polls = polls;
        self
    }
}

/// Document source replaying a fixed book and recording each call
#[derive(Debug, Default)]
pub struct ScriptedSource {
    pub chapters: Vec<ScriptedChapter>,
    /// Every operation in call order
    pub calls: Vec<String>,
    /// Upcoming asset queries that fail with a stale reference
    pub stale_failures: usize,
    /// Whether the content frame ever shows up
    pub frame_missing: bool,
    pub close_count: u32,
    epoch: NavigationEpoch,
    current: Option<usize>,
    polls: usize,
    in_frame: bool,
}

impl ScriptedSource {
    pub fn new(chapters: Vec<ScriptedChapter>) -> Self {
        Self {
            chapters,
            ..Self::default()
        }
    }

    /// Chapters visited, in visiting order
    pub fn visits(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|call| call.strip_prefix("visit "))
            .filter_map(|ordinal| ordinal.parse().ok())
            .collect()
    }

    fn chapter(&self) -> Result<&ScriptedChapter> {
        self.current
            .and_then(|index| self.chapters.get(index))
            .ok_or_else(|| Error::structural("chapter page", std::time::Duration::ZERO))
    }
}

#[async_trait(?Send)]
impl DocumentSource for ScriptedSource {
    async fn list_units(&mut self) -> Result<Vec<UnitRef>> {
        Ok((1..=self.chapters.len() as u32)
            .map(|ordinal| UnitRef::new(ordinal, format!("scripted://chapter/{ordinal}"), &self.epoch))
            .collect())
    }

    async fn visit(&mut self, unit: &UnitRef) -> Result<()> {
        self.epoch.check(unit)?;
        self.calls.push(format!("visit {}", unit.ordinal));
        self.epoch.advance();
        self.current = Some(unit.ordinal as usize - 1);
        self.polls = 0;
        Ok(())
    }

    async fn enter_content_scope(&mut self) -> Result<()> {
        if self.frame_missing {
            return Err(Error::structural("`content_ifr` frame", std::time::Duration::from_secs(5)));
        }
        self.calls.push("enter".to_string());
        self.in_frame = true;
        Ok(())
    }

    async fn leave_content_scope(&mut self) -> Result<()> {
        self.calls.push("leave".to_string());
        self.in_frame = false;
        Ok(())
    }

    async fn query_title(&mut self) -> Result<String> {
        Ok(self.chapter()?.title.clone())
    }

    async fn query_asset_elements(&mut self, _kind: AssetKind) -> Result<Vec<RawAsset>> {
        if !self.in_frame {
            return Err(Error::WebDriver {
                code: "no such element".to_string(),
                message: "asset query outside the content frame".to_string(),
            });
        }
        if self.stale_failures > 0 {
            self.stale_failures -= 1;
            return Err(Error::StaleReference("editor re-rendered".to_string()));
        }
        self.polls += 1;
        let chapter = self.chapter()?;
        if self.polls <= chapter.render_delay_polls {
            return Ok(Vec::new());
        }
        Ok(chapter.images.clone())
    }

    async fn return_to_index(&mut self, _book_url: &str) -> Result<()> {
        self.calls.push("index".to_string());
        self.epoch.advance();
        self.current = None;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.close_count += 1;
        Ok(())
    }
}
