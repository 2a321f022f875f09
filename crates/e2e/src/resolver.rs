//! Column and item resolution
//!
//! Nothing here caches element identity. Each call re-runs the role
//! queries, because every click or drop re-renders the lists.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::driver::PageDriver;
use crate::error::{E2eError, E2eResult};
use crate::locator::{strip_display_suffix, ColumnHeader, Locator};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHandle {
    pub header: ColumnHeader,
    pub locator: Locator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemHandle {
    pub column: ColumnHeader,
    /// Raw text content, suffix included
    pub label: String,
    /// Label with the display suffix stripped
    pub identity: String,
    pub locator: Locator,
}

/// Resolve the listbox headed by `header`
pub async fn resolve_column<D: PageDriver + ?Sized>(
    driver: &mut D,
    header: &ColumnHeader,
) -> E2eResult<ColumnHandle> {
    let locator = Locator::column(header);
    match driver.count(&locator).await? {
        0 => Err(E2eError::NotFound { what: format!("column '{}'", header) }),
        1 => Ok(ColumnHandle { header: header.clone(), locator }),
        count => Err(E2eError::Ambiguous { what: format!("column '{}'", header), count }),
    }
}

/// Every item currently in the column, in display order
pub async fn resolve_items<D: PageDriver + ?Sized>(
    driver: &mut D,
    header: &ColumnHeader,
) -> E2eResult<Vec<ItemHandle>> {
    resolve_column(driver, header).await?;

    let items = Locator::column_items(header);
    let count = driver.count(&items).await?;
    let mut handles = Vec::with_capacity(count);
    for index in 0..count {
        let locator = items.clone().nth(index);
        let label = driver.text_content(&locator).await?.unwrap_or_default();
        let identity = strip_display_suffix(&label)?;
        handles.push(ItemHandle {
            column: header.clone(),
            label,
            identity,
            locator,
        });
    }
    debug!("Column '{}' holds {} item(s)", header, handles.len());
    Ok(handles)
}

/// The single item in the column whose stripped label equals `name`
pub async fn resolve_item<D: PageDriver + ?Sized>(
    driver: &mut D,
    header: &ColumnHeader,
    name: &str,
) -> E2eResult<ItemHandle> {
    resolve_column(driver, header).await?;

    // The accessible name includes the suffix, so query by substring and
    // keep only exact identity matches.
    let candidates = Locator::column_item(header, name);
    let count = driver.count(&candidates).await?;
    let mut matches = Vec::new();
    for index in 0..count {
        let locator = candidates.clone().nth(index);
        let label = driver.text_content(&locator).await?.unwrap_or_default();
        match strip_display_suffix(&label) {
            Ok(identity) if identity == name => matches.push(ItemHandle {
                column: header.clone(),
                label,
                identity,
                locator,
            }),
            Ok(_) | Err(E2eError::LabelTooShort(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let what = format!("item '{}' in column '{}'", name, header);
    match matches.len() {
        0 => Err(E2eError::NotFound { what }),
        1 => Ok(matches.remove(0)),
        count => Err(E2eError::Ambiguous { what, count }),
    }
}

/// Wait until `locator` matches one visible element
pub async fn expect_visible<D: PageDriver + ?Sized>(
    driver: &mut D,
    locator: &Locator,
    timeout: Duration,
) -> E2eResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if driver.is_visible(locator).await? {
            return Ok(());
        }
        if !wait_for_next_poll(deadline).await {
            return Err(E2eError::AssertionFailed(format!(
                "expected {} to be visible within {:?}",
                locator, timeout
            )));
        }
    }
}

/// Wait until the page title equals `expected`
pub async fn expect_title<D: PageDriver + ?Sized>(
    driver: &mut D,
    expected: &str,
    timeout: Duration,
) -> E2eResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let title = driver.title().await?;
        if title == expected {
            return Ok(());
        }
        if !wait_for_next_poll(deadline).await {
            return Err(E2eError::AssertionFailed(format!(
                "expected page title '{}', got '{}'",
                expected, title
            )));
        }
    }
}

/// Wait until the named item resolves inside the column and is visible
pub async fn expect_item_visible<D: PageDriver + ?Sized>(
    driver: &mut D,
    header: &ColumnHeader,
    name: &str,
    timeout: Duration,
) -> E2eResult<ItemHandle> {
    let deadline = Instant::now() + timeout;
    loop {
        match resolve_item(driver, header, name).await {
            Ok(item) => {
                if driver.is_visible(&item.locator).await? {
                    return Ok(item);
                }
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
        if !wait_for_next_poll(deadline).await {
            return Err(E2eError::AssertionFailed(format!(
                "expected item '{}' to be visible in column '{}'",
                name, header
            )));
        }
    }
}

/// Whether the named item resolves inside the column right now
pub async fn is_item_present<D: PageDriver + ?Sized>(
    driver: &mut D,
    header: &ColumnHeader,
    name: &str,
) -> E2eResult<bool> {
    match resolve_item(driver, header, name).await {
        Ok(_) => Ok(true),
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Whether the named item resolves inside the column and is visible right now
pub async fn is_item_visible<D: PageDriver + ?Sized>(
    driver: &mut D,
    header: &ColumnHeader,
    name: &str,
) -> E2eResult<bool> {
    match resolve_item(driver, header, name).await {
        Ok(item) => driver.is_visible(&item.locator).await,
        Err(e) if e.is_not_found() => Ok(false),
        Err(e) => Err(e),
    }
}

/// Wait until the named item no longer resolves inside the column
pub async fn expect_item_absent<D: PageDriver + ?Sized>(
    driver: &mut D,
    header: &ColumnHeader,
    name: &str,
    timeout: Duration,
) -> E2eResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if !is_item_present(driver, header, name).await? {
            return Ok(());
        }
        if !wait_for_next_poll(deadline).await {
            return Err(E2eError::AssertionFailed(format!(
                "expected item '{}' to be gone from column '{}'",
                name, header
            )));
        }
    }
}

/// Sleep one poll interval, or return false once the deadline has passed
pub(crate) async fn wait_for_next_poll(deadline: Instant) -> bool {
    let now = Instant::now();
    if now >= deadline {
        return false;
    }
    sleep(POLL_INTERVAL.min(deadline - now)).await;
    true
}
