//! Role- and text-based locators for the sortable lists page
//!
//! A [`Locator`] is a plain description of a query, not a handle to a DOM
//! node. It is serialized to the Playwright bridge and evaluated again on
//! every command, so it stays valid while the page re-renders between
//! interactions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Number of trailing characters the UI appends to every item label
pub const DISPLAY_SUFFIX_WIDTH: usize = 2;

/// Accessible name of the page heading
pub const PAGE_HEADING: &str = "Drag and Drop (with sorting)";

/// Header label of a column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnHeader {
    Trees,
    Bushes,
    Flowers,
    /// A column on a page other than the stock demo
    Other(String),
}

impl ColumnHeader {
    /// The three columns the demo page renders, in display order
    pub const ALL: [ColumnHeader; 3] = [ColumnHeader::Trees, ColumnHeader::Bushes, ColumnHeader::Flowers];

    pub fn as_str(&self) -> &str {
        match self {
            ColumnHeader::Trees => "Trees",
            ColumnHeader::Bushes => "Bushes",
            ColumnHeader::Flowers => "Flowers",
            ColumnHeader::Other(name) => name,
        }
    }
}

impl From<String> for ColumnHeader {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Trees" => ColumnHeader::Trees,
            "Bushes" => ColumnHeader::Bushes,
            "Flowers" => ColumnHeader::Flowers,
            _ => ColumnHeader::Other(value),
        }
    }
}

impl From<&str> for ColumnHeader {
    fn from(value: &str) -> Self {
        ColumnHeader::from(value.to_string())
    }
}

impl From<ColumnHeader> for String {
    fn from(value: ColumnHeader) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ColumnHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a locator chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    /// `getByRole(role, { name, exact })`
    Role {
        role: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        exact: bool,
    },

    /// `filter({ has: <locator> })`, the inner locator relative to each match
    Has { locator: Locator },

    /// `locator(selector)`
    Css { selector: String },

    /// `nth(index)`
    Nth { index: usize },

    /// `first()`
    First,
}

/// A chain of query segments evaluated from the page root
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator {
    segments: Vec<Segment>,
}

impl Locator {
    /// The page itself
    pub fn page() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    fn push(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn by_role(self, role: impl Into<String>) -> Self {
        self.push(Segment::Role { role: role.into(), name: None, exact: false })
    }

    /// Role query matching the accessible name as a case-insensitive substring
    pub fn by_role_named(self, role: impl Into<String>, name: impl Into<String>) -> Self {
        self.push(Segment::Role { role: role.into(), name: Some(name.into()), exact: false })
    }

    /// Role query matching the accessible name exactly
    pub fn by_role_exact(self, role: impl Into<String>, name: impl Into<String>) -> Self {
        self.push(Segment::Role { role: role.into(), name: Some(name.into()), exact: true })
    }

    pub fn has(self, inner: Locator) -> Self {
        self.push(Segment::Has { locator: inner })
    }

    pub fn css(self, selector: impl Into<String>) -> Self {
        self.push(Segment::Css { selector: selector.into() })
    }

    pub fn nth(self, index: usize) -> Self {
        self.push(Segment::Nth { index })
    }

    pub fn first(self) -> Self {
        self.push(Segment::First)
    }

    /// The page-level heading
    pub fn heading(name: &str) -> Self {
        Self::page().by_role_exact("heading", name)
    }

    /// The listbox that contains a heading named `header`
    pub fn column(header: &ColumnHeader) -> Self {
        Self::page()
            .by_role("listbox")
            .has(Self::page().by_role_exact("heading", header.as_str()))
    }

    /// Every option inside the column, in display order
    pub fn column_items(header: &ColumnHeader) -> Self {
        Self::column(header).by_role("option")
    }

    /// Options inside the column whose accessible name contains `name`
    ///
    /// Item names carry the display suffix, so this is a substring match;
    /// callers disambiguate on the stripped label.
    pub fn column_item(header: &ColumnHeader, name: &str) -> Self {
        Self::column(header).by_role_named("option", name)
    }

    /// Items currently marked as selected anywhere on the page
    pub fn checked_items() -> Self {
        Self::page().css("li[aria-checked=true]")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("page")?;
        for segment in &self.segments {
            match segment {
                Segment::Role { role, name: None, .. } => write!(f, ".getByRole('{}')", role)?,
                Segment::Role { role, name: Some(name), exact } => {
                    if *exact {
                        write!(f, ".getByRole('{}', {{ name: '{}', exact: true }})", role, name)?
                    } else {
                        write!(f, ".getByRole('{}', {{ name: '{}' }})", role, name)?
                    }
                }
                Segment::Has { locator } => write!(f, ".filter({{ has: {} }})", locator)?,
                Segment::Css { selector } => write!(f, ".locator('{}')", selector)?,
                Segment::Nth { index } => write!(f, ".nth({})", index)?,
                Segment::First => f.write_str(".first()")?,
            }
        }
        Ok(())
    }
}

/// Strip the UI-added suffix from an item label, leaving its stable identity
///
/// The last `DISPLAY_SUFFIX_WIDTH` characters of the raw label are dropped
/// (characters, not bytes), then surrounding whitespace is trimmed. Labels
/// with nothing left are rejected.
pub fn strip_display_suffix(label: &str) -> E2eResult<String> {
    let chars = label.chars().count();
    if chars <= DISPLAY_SUFFIX_WIDTH {
        return Err(E2eError::LabelTooShort(label.to_string()));
    }
    let identity: String = label.chars().take(chars - DISPLAY_SUFFIX_WIDTH).collect();
    let identity = identity.trim();
    if identity.is_empty() {
        return Err(E2eError::LabelTooShort(label.to_string()));
    }
    Ok(identity.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Oak ⠿", "Oak" ; "space and glyph")]
    #[test_case("Birch12", "Birch" ; "two digit badge")]
    #[test_case("  Maple 3 ", "Maple" ; "surrounding whitespace")]
    #[test_case("Oak\n ", "Oak" ; "whitespace suffix")]
    #[test_case(" Pine\t\n", "Pine" ; "tab and newline suffix")]
    #[test_case("Lilac é", "Lilac" ; "multibyte suffix")]
    fn test_strip_display_suffix(label: &str, expected: &str) {
        assert_eq!(strip_display_suffix(label).unwrap(), expected);
    }

    #[test_case("" ; "empty")]
    #[test_case("ab" ; "exactly suffix width")]
    #[test_case("  x " ; "one char")]
    #[test_case("  ⠿⠿" ; "suffix only")]
    fn test_strip_rejects_short_labels(label: &str) {
        assert!(matches!(strip_display_suffix(label), Err(E2eError::LabelTooShort(_))));
    }

    #[test]
    fn test_column_header_roundtrip() {
        assert_eq!(ColumnHeader::from("Trees"), ColumnHeader::Trees);
        assert_eq!(ColumnHeader::from("Cacti"), ColumnHeader::Other("Cacti".into()));
        let header: ColumnHeader = serde_json::from_str("\"Flowers\"").unwrap();
        assert_eq!(header, ColumnHeader::Flowers);
        assert_eq!(serde_json::to_string(&ColumnHeader::Bushes).unwrap(), "\"Bushes\"");
    }

    #[test]
    fn test_locator_display() {
        let locator = Locator::column_items(&ColumnHeader::Trees).nth(2);
        assert_eq!(
            locator.to_string(),
            "page.getByRole('listbox')\
             .filter({ has: page.getByRole('heading', { name: 'Trees', exact: true }) })\
             .getByRole('option').nth(2)"
        );
    }

    #[test]
    fn test_locator_serializes_as_segment_list() {
        let locator = Locator::checked_items().first();
        let json = serde_json::to_value(&locator).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "kind": "css", "selector": "li[aria-checked=true]" },
                { "kind": "first" }
            ])
        );
    }
}
