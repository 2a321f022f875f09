//! Declarative YAML test cases

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::a11y::WCAG_TAGS;
use crate::error::{E2eError, E2eResult};
use crate::locator::{ColumnHeader, PAGE_HEADING};
use crate::workflow::{CommitMode, MoveScenario, SelectionMode};

/// A single test case parsed from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Unique name for this case
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering cases
    #[serde(default)]
    pub tags: Vec<String>,

    /// Run only the cases marked `only` (rejected when `forbid_only` is set)
    #[serde(default)]
    pub only: bool,

    #[serde(default)]
    pub skip: bool,

    pub kind: CaseKind,
}

/// What a case checks after the page has loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CaseKind {
    /// The document title equals `expected`
    Title { expected: String },

    /// The page heading, each column and each listed item are visible
    ElementsVisible {
        #[serde(default = "default_heading")]
        heading: String,
        #[serde(default)]
        columns: Vec<ColumnHeader>,
        #[serde(default)]
        items: Vec<ItemRef>,
    },

    /// Move items between columns and verify where they land
    Move(MoveScenario),

    /// axe-core scan must report no violations for `tags`
    Accessibility {
        #[serde(default = "default_tags")]
        tags: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub column: ColumnHeader,
    pub item: String,
}

fn default_heading() -> String {
    PAGE_HEADING.to_string()
}

fn default_tags() -> Vec<String> {
    WCAG_TAGS.iter().map(|t| t.to_string()).collect()
}

impl TestCase {
    pub fn new(name: &str, tags: &[&str], kind: CaseKind) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            only: false,
            skip: false,
            kind,
        }
    }

    /// Parse a case from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a case from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all cases from a directory, sorted by file path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        if !dir.is_dir() {
            return Err(E2eError::SpecParse(format!("not a directory: {}", dir.display())));
        }

        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let mut cases = Vec::new();
        for path in paths {
            cases.push(Self::from_file(&path)?);
        }

        let mut names: Vec<&str> = cases.iter().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(E2eError::SpecParse(format!("duplicate case name: {}", dup[0])));
        }
        Ok(cases)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The stock suite for the demo page
pub fn default_suite() -> Vec<TestCase> {
    use crate::locator::ColumnHeader::{Bushes, Flowers, Trees};

    let functional = &["functional"];
    vec![
        TestCase::new(
            "has title",
            functional,
            CaseKind::Title { expected: PAGE_HEADING.to_string() },
        ),
        TestCase::new(
            "page elements display",
            functional,
            CaseKind::ElementsVisible {
                heading: default_heading(),
                columns: ColumnHeader::ALL.to_vec(),
                items: vec![
                    ItemRef { column: Trees, item: "Oak".into() },
                    ItemRef { column: Bushes, item: "Juniper".into() },
                    ItemRef { column: Flowers, item: "Rose".into() },
                ],
            },
        ),
        TestCase::new(
            "select a single element and place it in another column",
            functional,
            CaseKind::Move(MoveScenario::new(Trees, Flowers, SelectionMode::Single, CommitMode::HeaderClick)),
        ),
        TestCase::new(
            "select multiple elements and place them in another column",
            functional,
            CaseKind::Move(MoveScenario::new(Flowers, Bushes, SelectionMode::Multiple, CommitMode::HeaderClick)),
        ),
        TestCase::new(
            "drag and drop single element",
            functional,
            CaseKind::Move(MoveScenario::new(Bushes, Trees, SelectionMode::Single, CommitMode::PointerDrag)),
        ),
        TestCase::new(
            "drag and drop multiple elements",
            functional,
            CaseKind::Move(MoveScenario::new(Flowers, Trees, SelectionMode::Multiple, CommitMode::PointerDrag)),
        ),
        TestCase::new(
            "accessibility check",
            &["accessibility"],
            CaseKind::Accessibility { tags: default_tags() },
        ),
    ]
}
