//! The automation seam between test logic and a browser
//!
//! Resolver, workflow and audit code only talk to [`PageDriver`]. The
//! Playwright bridge implements it against a real browser and
//! [`crate::board::SimulatedBoard`] implements it in memory.

use std::path::Path;

use async_trait::async_trait;

use crate::a11y::Violation;
use crate::config::Project;
use crate::error::E2eResult;
use crate::locator::Locator;

/// One open page. Every call completes once the action has been applied.
///
/// Commands that act on a single element (click, hover, text, attribute)
/// are strict: the locator must match exactly one element.
#[async_trait]
pub trait PageDriver: Send {
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    async fn title(&mut self) -> E2eResult<String>;

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize>;

    async fn text_content(&mut self, locator: &Locator) -> E2eResult<Option<String>>;

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool>;

    async fn get_attribute(&mut self, locator: &Locator, name: &str) -> E2eResult<Option<String>>;

    async fn click(&mut self, locator: &Locator) -> E2eResult<()>;

    async fn hover(&mut self, locator: &Locator) -> E2eResult<()>;

    async fn mouse_down(&mut self) -> E2eResult<()>;

    async fn mouse_move(&mut self, x: f64, y: f64) -> E2eResult<()>;

    async fn mouse_up(&mut self) -> E2eResult<()>;

    /// Run axe-core restricted to `tags` and return its violations
    async fn accessibility_scan(&mut self, tags: &[String]) -> E2eResult<Vec<Violation>>;

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()>;

    async fn close(&mut self) -> E2eResult<()>;
}

/// Opens a fresh, isolated page for each test attempt
#[async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: PageDriver;

    async fn open(&self, project: &Project) -> E2eResult<Self::Driver>;
}
