//! The document source: the live, rendered editor the pipeline reads from.
//!
//! Split into:
//! - [`DocumentSource`] - the contract the pipeline consumes
//! - [`webdriver`] - production implementation over the W3C WebDriver protocol
//!
//! Every method takes `&mut self`. A browsing session has one current page and
//! one current frame, so the pipeline owns its source exclusively and never
//! issues two operations at once; the borrow checker enforces that. For the
//! same reason the trait's futures are not required to be `Send`.

pub mod webdriver;

pub use webdriver::WebDriverSource;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AssetKind, RawAsset, UnitRef};

/// A stateful, navigable rendering surface exposing chapters and their images
#[async_trait(?Send)]
pub trait DocumentSource {
    /// List chapter references on the current index page, in display order.
    ///
    /// Returns whatever is currently rendered, which may be empty while the
    /// page is still loading. References are stamped with the current
    /// navigation epoch and become unusable after the next navigation.
    async fn list_units(&mut self) -> Result<Vec<UnitRef>>;

    /// Navigate to a chapter so subsequent queries target its content.
    ///
    /// Fails with [`crate::Error::OutdatedUnitRef`] for references listed
    /// before the last navigation.
    async fn visit(&mut self, unit: &UnitRef) -> Result<()>;

    /// Narrow queries to the chapter's rendered body.
    ///
    /// Fails with [`crate::Error::StructuralUnavailable`] if the body region
    /// does not become available within the structural deadline.
    async fn enter_content_scope(&mut self) -> Result<()>;

    /// Widen queries back to the full page.
    async fn leave_content_scope(&mut self) -> Result<()>;

    /// Title of the visited chapter.
    async fn query_title(&mut self) -> Result<String>;

    /// Image-bearing elements in the current scope, in document order.
    ///
    /// `kind` selects whether outer HTML is captured alongside `src`. May fail
    /// with [`crate::Error::StaleReference`] when the content re-renders mid-read.
    async fn query_asset_elements(&mut self, kind: AssetKind) -> Result<Vec<RawAsset>>;

    /// Navigate back to the chapter list page.
    async fn return_to_index(&mut self, book_url: &str) -> Result<()>;

    /// Release the underlying session. Idempotent.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
