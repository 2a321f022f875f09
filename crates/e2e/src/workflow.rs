//! Moving items between columns
//!
//! One parameterized routine covers every move test: pick items in the
//! source column, select them by clicking, commit the move with a header
//! click or a pointer drag, then check where the items ended up.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::driver::PageDriver;
use crate::error::{E2eError, E2eResult};
use crate::locator::{ColumnHeader, Locator};
use crate::resolver::{
    is_item_present, is_item_visible, resolve_column, resolve_items, wait_for_next_poll, ItemHandle,
};
use crate::selection::SelectionPolicy;

/// Where the pointer rests mid-drag, away from every column
pub const NEUTRAL_POINT: (f64, f64) = (0.0, 0.0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// One item at a uniformly random position
    #[default]
    Single,
    /// A random non-empty subset of the column
    Multiple,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Click the destination column to relocate the selection
    #[default]
    HeaderClick,
    /// Press on an item, leave the lists, release over the destination
    PointerDrag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveScenario {
    pub source: ColumnHeader,
    pub destination: ColumnHeader,
    #[serde(default)]
    pub selection: SelectionMode,
    #[serde(default)]
    pub commit: CommitMode,
}

/// Labels that were moved, captured before the move
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub moved: Vec<String>,
}

impl MoveScenario {
    pub fn new(
        source: ColumnHeader,
        destination: ColumnHeader,
        selection: SelectionMode,
        commit: CommitMode,
    ) -> Self {
        Self { source, destination, selection, commit }
    }

    /// Single-item pointer drags grab the item directly without clicking it
    fn selects_by_click(&self) -> bool {
        !(self.selection == SelectionMode::Single && self.commit == CommitMode::PointerDrag)
    }

    pub async fn run<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        policy: &mut SelectionPolicy,
        expect_timeout: Duration,
    ) -> E2eResult<MoveOutcome> {
        if self.source == self.destination {
            return Err(E2eError::SpecParse(format!(
                "move source and destination are both '{}'",
                self.source
            )));
        }

        // Query
        let items = resolve_items(driver, &self.source).await?;
        let indices = match self.selection {
            SelectionMode::Single => vec![policy.pick_one(self.source.as_str(), items.len())?],
            SelectionMode::Multiple => policy.pick_indices(self.source.as_str(), items.len())?,
        };
        let picked: Vec<&ItemHandle> = indices.iter().map(|&i| &items[i]).collect();
        let moved: Vec<String> = picked.iter().map(|item| item.identity.clone()).collect();
        info!(
            "Moving {:?} from '{}' to '{}' ({:?}, {:?}, seed {})",
            moved,
            self.source,
            self.destination,
            self.selection,
            self.commit,
            policy.seed()
        );

        // Select
        if self.selects_by_click() {
            for item in &picked {
                driver.click(&item.locator).await?;
            }
            for item in &picked {
                let checked = driver.get_attribute(&item.locator, "aria-checked").await?;
                if checked.as_deref() != Some("true") {
                    return Err(E2eError::AssertionFailed(format!(
                        "item '{}' was clicked but is not checked (aria-checked={:?})",
                        item.identity, checked
                    )));
                }
            }
        }

        // Commit
        let destination = resolve_column(driver, &self.destination).await?;
        match self.commit {
            CommitMode::HeaderClick => {
                driver.click(&destination.locator).await?;
            }
            CommitMode::PointerDrag => {
                let handle = if self.selects_by_click() {
                    Locator::checked_items().first()
                } else {
                    picked[0].locator.clone()
                };
                debug!("Dragging from {}", handle);
                driver.hover(&handle).await?;
                driver.mouse_down().await?;
                driver.mouse_move(NEUTRAL_POINT.0, NEUTRAL_POINT.1).await?;
                driver.hover(&destination.locator).await?;
                driver.mouse_up().await?;
            }
        }

        // Verify
        self.verify(driver, &moved, expect_timeout).await?;
        Ok(MoveOutcome { moved })
    }

    /// Poll until every moved label is in the destination and gone from
    /// the source. All labels share one deadline.
    async fn verify<D: PageDriver + ?Sized>(
        &self,
        driver: &mut D,
        moved: &[String],
        expect_timeout: Duration,
    ) -> E2eResult<()> {
        let deadline = Instant::now() + expect_timeout;
        loop {
            let mut missing = Vec::new();
            let mut left_behind = Vec::new();
            for label in moved {
                if !is_item_visible(driver, &self.destination, label).await? {
                    missing.push(label.as_str());
                }
                if is_item_present(driver, &self.source, label).await? {
                    left_behind.push(label.as_str());
                }
            }

            if missing.is_empty() && left_behind.is_empty() {
                return Ok(());
            }
            if wait_for_next_poll(deadline).await {
                continue;
            }

            let mut problems = Vec::new();
            if !missing.is_empty() {
                problems.push(format!("not found in '{}': {}", self.destination, missing.join(", ")));
            }
            if !left_behind.is_empty() {
                problems.push(format!("still in '{}': {}", self.source, left_behind.join(", ")));
            }
            return Err(E2eError::AssertionFailed(problems.join("; ")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::SimulatedBoard;

    const TIMEOUT: Duration = Duration::from_millis(50);

    async fn loaded() -> SimulatedBoard {
        let mut board = SimulatedBoard::demo();
        board.goto("/").await.unwrap();
        board
    }

    #[tokio::test]
    async fn test_single_header_click() {
        let mut board = loaded().await;
        let scenario = MoveScenario::new(
            ColumnHeader::Trees,
            ColumnHeader::Flowers,
            SelectionMode::Single,
            CommitMode::HeaderClick,
        );
        let outcome = scenario
            .run(&mut board, &mut SelectionPolicy::seeded(3), TIMEOUT)
            .await
            .unwrap();
        assert_eq!(outcome.moved.len(), 1);
        assert!(board.item_names("Flowers").contains(&outcome.moved[0]));
        assert!(!board.item_names("Trees").contains(&outcome.moved[0]));
    }

    #[tokio::test]
    async fn test_multiple_pointer_drag() {
        for seed in 0..10 {
            let mut board = loaded().await;
            let scenario = MoveScenario::new(
                ColumnHeader::Flowers,
                ColumnHeader::Trees,
                SelectionMode::Multiple,
                CommitMode::PointerDrag,
            );
            let outcome = scenario
                .run(&mut board, &mut SelectionPolicy::seeded(seed), TIMEOUT)
                .await
                .unwrap();
            let trees = board.item_names("Trees");
            assert!(outcome.moved.iter().all(|m| trees.contains(m)), "seed {seed}");
            assert_eq!(board.item_names("Flowers").len(), 5 - outcome.moved.len());
        }
    }

    #[tokio::test]
    async fn test_same_column_rejected() {
        let mut board = loaded().await;
        let scenario = MoveScenario::new(
            ColumnHeader::Trees,
            ColumnHeader::Trees,
            SelectionMode::Single,
            CommitMode::HeaderClick,
        );
        let err = scenario
            .run(&mut board, &mut SelectionPolicy::seeded(0), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::SpecParse(_)));
    }

    #[tokio::test]
    async fn test_empty_source_column() {
        let mut board = SimulatedBoard::new("t", vec![("Trees", vec![]), ("Flowers", vec!["Rose"])]);
        board.goto("/").await.unwrap();
        let scenario = MoveScenario::new(
            ColumnHeader::Trees,
            ColumnHeader::Flowers,
            SelectionMode::Multiple,
            CommitMode::HeaderClick,
        );
        let err = scenario
            .run(&mut board, &mut SelectionPolicy::seeded(0), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::EmptyColumn(_)));
    }

    #[tokio::test]
    async fn test_static_page_fails_selection_check() {
        let mut board = SimulatedBoard::demo().with_javascript(false);
        board.goto("/").await.unwrap();
        let scenario = MoveScenario::new(
            ColumnHeader::Bushes,
            ColumnHeader::Trees,
            SelectionMode::Single,
            CommitMode::HeaderClick,
        );
        let err = scenario
            .run(&mut board, &mut SelectionPolicy::seeded(0), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::AssertionFailed(msg) if msg.contains("not checked")));
    }

    #[tokio::test]
    async fn test_drag_without_javascript_reports_missing_item() {
        let mut board = SimulatedBoard::demo().with_javascript(false);
        board.goto("/").await.unwrap();
        let scenario = MoveScenario::new(
            ColumnHeader::Bushes,
            ColumnHeader::Trees,
            SelectionMode::Single,
            CommitMode::PointerDrag,
        );
        let err = scenario
            .run(&mut board, &mut SelectionPolicy::seeded(0), TIMEOUT)
            .await
            .unwrap_err();
        match err {
            E2eError::AssertionFailed(msg) => {
                assert!(msg.contains("not found in 'Trees'"), "{msg}");
                assert!(msg.contains("still in 'Bushes'"), "{msg}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scenario_yaml() {
        let scenario: MoveScenario = serde_yaml::from_str(
            "source: Bushes\ndestination: Trees\ncommit: pointer_drag\n",
        )
        .unwrap();
        assert_eq!(scenario.selection, SelectionMode::Single);
        assert_eq!(scenario.commit, CommitMode::PointerDrag);
        assert_eq!(scenario.destination, ColumnHeader::Trees);
    }
}
