//! Sortable Lists E2E Test Framework
//!
//! This crate drives a three-column drag-and-drop list page (Trees, Bushes,
//! Flowers) from Rust:
//! - Resolves columns and items by ARIA role and accessible name
//! - Picks items to move with a seedable random selection policy
//! - Moves them by click-select plus header click, or by pointer drag
//! - Runs axe-core accessibility scans through Playwright
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 E2E Test Runner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner<F: DriverFactory>                               │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── factory.open(project) -> PageDriver                  │
//! │    ├── execute_case(case) -> moved labels                   │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver                                                 │
//! │    ├── PlaywrightDriver (node bridge, JSON lines)           │
//! │    └── SimulatedBoard (in-memory, --dry-run and tests)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestCase (YAML)                                            │
//! │    ├── name, description, tags, only, skip                  │
//! │    └── kind                                                 │
//! │          ├── title { expected }                             │
//! │          ├── elements_visible { heading, columns, items }   │
//! │          ├── move { source, destination, selection, commit }│
//! │          └── accessibility { tags }                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod a11y;
pub mod board;
pub mod config;
pub mod driver;
pub mod error;
pub mod locator;
pub mod playwright;
pub mod resolver;
pub mod runner;
pub mod selection;
pub mod server;
pub mod suite;
pub mod workflow;

pub use config::SuiteConfig;
pub use driver::{DriverFactory, PageDriver};
pub use error::{E2eError, E2eResult};
pub use locator::{ColumnHeader, Locator};
pub use runner::{CaseFilter, TestRunner, TestSuiteResult};
pub use selection::SelectionPolicy;
pub use suite::{CaseKind, TestCase};
pub use workflow::{CommitMode, MoveScenario, SelectionMode};
