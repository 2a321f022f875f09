//! In-memory model of the sortable lists page
//!
//! Implements [`PageDriver`] with the observable behavior of the real UI:
//! clicking an item toggles `aria-checked`, clicking a column moves every
//! checked item there, and a pointer drag from an item drops it (or the
//! whole checked group it belongs to) on the column under the pointer.
//! Used by `--dry-run` and by the crate's tests.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::a11y::Violation;
use crate::config::Project;
use crate::driver::{DriverFactory, PageDriver};
use crate::error::{E2eError, E2eResult};
use crate::locator::{Locator, Segment, PAGE_HEADING};

/// Two-character suffix the demo appends to item text
const ITEM_SUFFIX: &str = " ⋮";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Root,
    PageHeading,
    Listbox(usize),
    Heading(usize),
    Item(usize, usize),
}

#[derive(Debug, Clone)]
struct Item {
    name: String,
    checked: bool,
}

#[derive(Debug, Clone)]
struct Column {
    header: String,
    items: Vec<Item>,
}

#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    title: String,
    initial: Vec<Column>,
    columns: Vec<Column>,
    url: Option<String>,
    hovered: Option<Node>,
    /// Names of the items held by an active pointer drag
    dragging: Option<Vec<String>>,
    violations: Vec<Violation>,
    javascript_enabled: bool,
}

impl SimulatedBoard {
    pub fn new(title: &str, columns: Vec<(&str, Vec<&str>)>) -> Self {
        let initial: Vec<Column> = columns
            .into_iter()
            .map(|(header, items)| Column {
                header: header.to_string(),
                items: items
                    .into_iter()
                    .map(|name| Item { name: name.to_string(), checked: false })
                    .collect(),
            })
            .collect();
        Self {
            title: title.to_string(),
            columns: initial.clone(),
            initial,
            url: None,
            hovered: None,
            dragging: None,
            violations: Vec::new(),
            javascript_enabled: true,
        }
    }

    /// The stock demo: three columns led by Oak, Juniper and Rose
    pub fn demo() -> Self {
        Self::new(
            PAGE_HEADING,
            vec![
                ("Trees", vec!["Oak", "Pine", "Maple", "Birch", "Willow"]),
                ("Bushes", vec!["Juniper", "Holly", "Lilac", "Boxwood"]),
                ("Flowers", vec!["Rose", "Tulip", "Daisy", "Orchid", "Peony"]),
            ],
        )
    }

    /// Report a violation for scans that include any of `tags`
    pub fn with_violation(mut self, id: &str, tags: &[&str]) -> Self {
        self.violations.push(Violation {
            id: id.to_string(),
            impact: Some("serious".to_string()),
            description: format!("simulated {}", id),
            help: format!("fix {}", id),
            help_url: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            nodes: Vec::new(),
        });
        self
    }

    /// Without scripts the markup renders but never reacts to input
    pub fn with_javascript(mut self, enabled: bool) -> Self {
        self.javascript_enabled = enabled;
        self
    }

    /// Plain item names of a column in display order
    pub fn item_names(&self, header: &str) -> Vec<String> {
        self.columns
            .iter()
            .find(|c| c.header == header)
            .map(|c| c.items.iter().map(|i| i.name.clone()).collect())
            .unwrap_or_default()
    }

    fn nodes_under(&self, scope: Node) -> Vec<Node> {
        let mut nodes = Vec::new();
        match scope {
            Node::Root => {
                nodes.push(Node::PageHeading);
                for (c, column) in self.columns.iter().enumerate() {
                    nodes.push(Node::Listbox(c));
                    nodes.push(Node::Heading(c));
                    nodes.extend((0..column.items.len()).map(|i| Node::Item(c, i)));
                }
            }
            Node::Listbox(c) => {
                nodes.push(Node::Heading(c));
                nodes.extend((0..self.columns[c].items.len()).map(|i| Node::Item(c, i)));
            }
            _ => {}
        }
        nodes
    }

    fn role(node: Node) -> &'static str {
        match node {
            Node::Root => "document",
            Node::PageHeading | Node::Heading(_) => "heading",
            Node::Listbox(_) => "listbox",
            Node::Item(..) => "option",
        }
    }

    fn text(&self, node: Node) -> String {
        match node {
            Node::Root => String::new(),
            Node::PageHeading => PAGE_HEADING.to_string(),
            Node::Heading(c) => self.columns[c].header.clone(),
            Node::Listbox(c) => {
                let column = &self.columns[c];
                let mut text = column.header.clone();
                for item in &column.items {
                    text.push_str(&item.name);
                    text.push_str(ITEM_SUFFIX);
                }
                text
            }
            Node::Item(c, i) => format!("{}{}", self.columns[c].items[i].name, ITEM_SUFFIX),
        }
    }

    fn accessible_name(&self, node: Node) -> String {
        match node {
            Node::Listbox(c) => self.columns[c].header.clone(),
            other => self.text(other).trim().to_string(),
        }
    }

    fn css_matches(&self, selector: &str, node: Node) -> E2eResult<bool> {
        let (tag, attrs) = match selector.find('[') {
            Some(pos) => (&selector[..pos], &selector[pos..]),
            None => (selector, ""),
        };
        if tag != "li" {
            return Err(E2eError::Bridge(format!("unsupported selector: {}", selector)));
        }
        let Node::Item(c, i) = node else {
            return Ok(false);
        };
        let checked = self.columns[c].items[i].checked;
        match attrs.replace('"', "").as_str() {
            "" => Ok(true),
            "[aria-checked=true]" => Ok(checked),
            "[aria-checked=false]" => Ok(!checked),
            _ => Err(E2eError::Bridge(format!("unsupported selector: {}", selector))),
        }
    }

    fn evaluate(&self, locator: &Locator, scope: Node) -> E2eResult<Vec<Node>> {
        let mut current = vec![scope];
        for segment in locator.segments() {
            current = match segment {
                Segment::Role { role, name, exact } => {
                    let mut next = Vec::new();
                    for parent in &current {
                        for node in self.nodes_under(*parent) {
                            if Self::role(node) != role.as_str() || next.contains(&node) {
                                continue;
                            }
                            let matches_name = match name {
                                None => true,
                                Some(name) if *exact => self.accessible_name(node) == *name,
                                Some(name) => self
                                    .accessible_name(node)
                                    .to_lowercase()
                                    .contains(&name.to_lowercase()),
                            };
                            if matches_name {
                                next.push(node);
                            }
                        }
                    }
                    next
                }
                Segment::Has { locator } => {
                    let mut kept = Vec::new();
                    for node in current {
                        if !self.evaluate(locator, node)?.is_empty() {
                            kept.push(node);
                        }
                    }
                    kept
                }
                Segment::Css { selector } => {
                    let mut next = Vec::new();
                    for parent in &current {
                        for node in self.nodes_under(*parent) {
                            if !next.contains(&node) && self.css_matches(selector, node)? {
                                next.push(node);
                            }
                        }
                    }
                    next
                }
                Segment::Nth { index } => current.get(*index).copied().into_iter().collect(),
                Segment::First => current.first().copied().into_iter().collect(),
            };
        }
        Ok(current)
    }

    fn single(&self, locator: &Locator) -> E2eResult<Node> {
        let nodes = self.evaluate(locator, Node::Root)?;
        match nodes.len() {
            0 => Err(E2eError::NotFound { what: locator.to_string() }),
            1 => Ok(nodes[0]),
            count => Err(E2eError::Ambiguous { what: locator.to_string(), count }),
        }
    }

    fn column_of(node: Node) -> Option<usize> {
        match node {
            Node::Listbox(c) | Node::Heading(c) | Node::Item(c, _) => Some(c),
            _ => None,
        }
    }

    fn checked_names(&self, column: usize) -> Vec<String> {
        self.columns[column]
            .items
            .iter()
            .filter(|i| i.checked)
            .map(|i| i.name.clone())
            .collect()
    }

    fn clear_selection(&mut self) {
        for column in &mut self.columns {
            for item in &mut column.items {
                item.checked = false;
            }
        }
    }

    /// Move named items to the end of `dest`, dropping their selection
    fn move_items(&mut self, names: &[String], dest: usize) {
        let mut moved = Vec::new();
        for name in names {
            for column in &mut self.columns {
                if let Some(pos) = column.items.iter().position(|i| &i.name == name) {
                    let mut item = column.items.remove(pos);
                    item.checked = false;
                    moved.push(item);
                    break;
                }
            }
        }
        debug!("Board: moved {:?} to {}", names, self.columns[dest].header);
        self.columns[dest].items.extend(moved);
        self.clear_selection();
    }

    fn render(&self) -> String {
        let mut out = format!("{}\n", self.title);
        for column in &self.columns {
            out.push_str(&format!("[{}]\n", column.header));
            for item in &column.items {
                let mark = if item.checked { "x" } else { " " };
                out.push_str(&format!("  ({}) {}\n", mark, item.name));
            }
        }
        out
    }
}

#[async_trait]
impl PageDriver for SimulatedBoard {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.url = Some(url.to_string());
        self.columns = self.initial.clone();
        self.hovered = None;
        self.dragging = None;
        Ok(())
    }

    async fn title(&mut self) -> E2eResult<String> {
        Ok(if self.url.is_some() { self.title.clone() } else { String::new() })
    }

    async fn count(&mut self, locator: &Locator) -> E2eResult<usize> {
        Ok(self.evaluate(locator, Node::Root)?.len())
    }

    async fn text_content(&mut self, locator: &Locator) -> E2eResult<Option<String>> {
        let node = self.single(locator)?;
        Ok(Some(self.text(node)))
    }

    async fn is_visible(&mut self, locator: &Locator) -> E2eResult<bool> {
        let nodes = self.evaluate(locator, Node::Root)?;
        match nodes.len() {
            0 => Ok(false),
            1 => Ok(true),
            count => Err(E2eError::Ambiguous { what: locator.to_string(), count }),
        }
    }

    async fn get_attribute(&mut self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        let node = self.single(locator)?;
        Ok(match (node, name) {
            (Node::Item(c, i), "aria-checked") => Some(self.columns[c].items[i].checked.to_string()),
            (node, "role") => Some(Self::role(node).to_string()),
            _ => None,
        })
    }

    async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        let node = self.single(locator)?;
        self.hovered = Some(node);
        if !self.javascript_enabled {
            return Ok(());
        }
        match node {
            Node::Item(c, i) => {
                let others_checked = self
                    .columns
                    .iter()
                    .enumerate()
                    .any(|(oc, col)| oc != c && col.items.iter().any(|it| it.checked));
                if others_checked {
                    self.clear_selection();
                }
                let item = &mut self.columns[c].items[i];
                item.checked = !item.checked;
            }
            Node::Listbox(d) | Node::Heading(d) => {
                let names: Vec<String> = (0..self.columns.len())
                    .flat_map(|c| self.checked_names(c))
                    .collect();
                if !names.is_empty() {
                    self.move_items(&names, d);
                }
            }
            Node::Root | Node::PageHeading => {}
        }
        Ok(())
    }

    async fn hover(&mut self, locator: &Locator) -> E2eResult<()> {
        self.hovered = Some(self.single(locator)?);
        Ok(())
    }

    async fn mouse_down(&mut self) -> E2eResult<()> {
        if !self.javascript_enabled {
            return Ok(());
        }
        if let Some(Node::Item(c, i)) = self.hovered {
            let item = &self.columns[c].items[i];
            let held = if item.checked {
                self.checked_names(c)
            } else {
                vec![item.name.clone()]
            };
            self.dragging = Some(held);
        }
        Ok(())
    }

    async fn mouse_move(&mut self, _x: f64, _y: f64) -> E2eResult<()> {
        self.hovered = None;
        Ok(())
    }

    async fn mouse_up(&mut self) -> E2eResult<()> {
        if let Some(held) = self.dragging.take() {
            if let Some(dest) = self.hovered.and_then(Self::column_of) {
                self.move_items(&held, dest);
            }
        }
        Ok(())
    }

    async fn accessibility_scan(&mut self, tags: &[String]) -> E2eResult<Vec<Violation>> {
        Ok(self
            .violations
            .iter()
            .filter(|v| v.tags.iter().any(|t| tags.contains(t)))
            .cloned()
            .collect())
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path.with_extension("txt"), self.render())?;
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        Ok(())
    }
}

/// Hands every attempt its own copy of a board
#[derive(Debug, Clone)]
pub struct BoardFactory {
    template: SimulatedBoard,
}

impl BoardFactory {
    pub fn new(template: SimulatedBoard) -> Self {
        Self { template }
    }
}

impl Default for BoardFactory {
    fn default() -> Self {
        Self::new(SimulatedBoard::demo())
    }
}

#[async_trait]
impl DriverFactory for BoardFactory {
    type Driver = SimulatedBoard;

    async fn open(&self, project: &Project) -> E2eResult<SimulatedBoard> {
        Ok(self.template.clone().with_javascript(project.javascript_enabled))
    }
}
