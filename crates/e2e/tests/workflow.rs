//! Move and resolution behavior against the simulated board

use std::collections::BTreeSet;
use std::time::Duration;

use test_case::test_case;

use sortable_e2e::a11y::{AccessibilityAudit, WCAG_TAGS};
use sortable_e2e::board::SimulatedBoard;
use sortable_e2e::resolver::{expect_item_absent, expect_item_visible, resolve_column, resolve_item, resolve_items};
use sortable_e2e::{ColumnHeader, CommitMode, MoveScenario, PageDriver, SelectionMode, SelectionPolicy};

const TIMEOUT: Duration = Duration::from_millis(50);

async fn fresh_page() -> SimulatedBoard {
    let mut board = SimulatedBoard::demo();
    board.goto("http://localhost:3000").await.unwrap();
    board
}

async fn identities(board: &mut SimulatedBoard, header: &ColumnHeader) -> Vec<String> {
    resolve_items(board, header)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.identity)
        .collect()
}

#[tokio::test]
async fn oak_moves_from_trees_to_flowers() {
    let mut board = fresh_page().await;

    resolve_column(&mut board, &ColumnHeader::Trees).await.unwrap();
    let oak = expect_item_visible(&mut board, &ColumnHeader::Trees, "Oak", TIMEOUT).await.unwrap();
    assert_eq!(oak.identity, "Oak");

    board.click(&oak.locator).await.unwrap();
    let flowers = resolve_column(&mut board, &ColumnHeader::Flowers).await.unwrap();
    board.click(&flowers.locator).await.unwrap();

    resolve_item(&mut board, &ColumnHeader::Flowers, "Oak").await.unwrap();
    expect_item_absent(&mut board, &ColumnHeader::Trees, "Oak", TIMEOUT).await.unwrap();
    let err = resolve_item(&mut board, &ColumnHeader::Trees, "Oak").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn resolve_items_is_idempotent() {
    let mut board = fresh_page().await;
    for header in ColumnHeader::ALL.iter() {
        let first = identities(&mut board, header).await;
        let second = identities(&mut board, header).await;
        assert_eq!(first, second);
    }
}

#[test_case(ColumnHeader::Trees, ColumnHeader::Flowers, SelectionMode::Single, CommitMode::HeaderClick ; "single header click")]
#[test_case(ColumnHeader::Flowers, ColumnHeader::Bushes, SelectionMode::Multiple, CommitMode::HeaderClick ; "multiple header click")]
#[test_case(ColumnHeader::Bushes, ColumnHeader::Trees, SelectionMode::Single, CommitMode::PointerDrag ; "single pointer drag")]
#[test_case(ColumnHeader::Flowers, ColumnHeader::Trees, SelectionMode::Multiple, CommitMode::PointerDrag ; "multiple pointer drag")]
#[tokio::test]
async fn moved_labels_land_in_destination(
    source: ColumnHeader,
    destination: ColumnHeader,
    selection: SelectionMode,
    commit: CommitMode,
) {
    let scenario = MoveScenario::new(source.clone(), destination.clone(), selection, commit);
    for seed in 0..20 {
        let mut board = fresh_page().await;
        let before_source = identities(&mut board, &source).await;
        let before_dest = identities(&mut board, &destination).await;

        let mut policy = SelectionPolicy::seeded(seed);
        let outcome = scenario.run(&mut board, &mut policy, TIMEOUT).await.unwrap();
        if selection == SelectionMode::Single {
            assert_eq!(outcome.moved.len(), 1);
        }

        let moved: BTreeSet<String> = outcome.moved.iter().cloned().collect();
        let after_source = identities(&mut board, &source).await;
        let after_dest = identities(&mut board, &destination).await;

        let landed: BTreeSet<String> = after_dest.iter().filter(|l| moved.contains(*l)).cloned().collect();
        assert_eq!(landed, moved, "seed {seed}");
        assert!(after_source.iter().all(|l| !moved.contains(l)), "seed {seed}");
        assert_eq!(after_source.len() + moved.len(), before_source.len());
        assert_eq!(after_dest.len(), before_dest.len() + moved.len());
    }
}

#[tokio::test]
async fn every_item_stays_in_exactly_one_column() {
    let mut board = fresh_page().await;
    let mut policy = SelectionPolicy::seeded(99);
    let moves = [
        (ColumnHeader::Trees, ColumnHeader::Bushes),
        (ColumnHeader::Bushes, ColumnHeader::Flowers),
        (ColumnHeader::Flowers, ColumnHeader::Trees),
    ];
    for (source, destination) in moves {
        MoveScenario::new(source, destination, SelectionMode::Multiple, CommitMode::PointerDrag)
            .run(&mut board, &mut policy, TIMEOUT)
            .await
            .unwrap();
    }

    let mut all = Vec::new();
    for header in ColumnHeader::ALL.iter() {
        all.extend(identities(&mut board, header).await);
    }
    let unique: BTreeSet<&String> = all.iter().collect();
    assert_eq!(all.len(), 14);
    assert_eq!(unique.len(), 14);
}

#[test]
fn one_item_column_always_picks_index_zero() {
    let mut policy = SelectionPolicy::from_entropy();
    for _ in 0..100 {
        assert_eq!(policy.pick_indices("Bushes", 1).unwrap(), vec![0]);
    }
}

#[tokio::test]
async fn initial_page_has_no_violations() {
    let mut board = fresh_page().await;
    let audit = AccessibilityAudit::default();
    assert_eq!(audit.tags().len(), WCAG_TAGS.len());
    assert!(audit.scan(&mut board).await.unwrap().is_empty());
    audit.assert_clean(&mut board).await.unwrap();
}
