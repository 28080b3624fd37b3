//! Miller-columns shell: wires the data source and the selection controller
//! together and exposes a render-ready view.

#![forbid(unsafe_code)]

use std::sync::Arc;

use lakescope_api::ScopeApi;
use lakescope_core::{ConnectionId, ScopeId, ScopeItem};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PickerConfig;
use crate::error::{PickerError, PickerResult};
use crate::selection::SelectionState;
use crate::source::{Applied, ScopeSource};

/// Scroll geometry of one column, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    pub offset: f32,
    pub viewport: f32,
    pub content: f32,
}

impl ScrollPosition {
    /// Position inside a column whose viewport is `column_height` pixels tall.
    pub fn in_column(offset: f32, content: f32, column_height: u32) -> Self {
        Self { offset, viewport: column_height as f32, content }
    }

    pub fn remaining(&self) -> f32 { (self.content - self.offset - self.viewport).max(0.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Opened(ScopeId),
    Selected(ScopeId),
    Deselected(ScopeId),
    /// Disabled leaf.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub id: ScopeId,
    pub name: String,
    pub selected: bool,
    pub disabled: bool,
    pub expandable: bool,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnView {
    pub index: usize,
    pub parent: Option<ScopeId>,
    pub rows: Vec<RowView>,
    pub loading: bool,
    pub has_more: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerView {
    pub connection: Option<ConnectionId>,
    /// Viewport height of every column, in pixels.
    pub column_height: u32,
    pub columns: Vec<ColumnView>,
    pub selected: Vec<ScopeItem>,
}

pub type ChangeCallback = Box<dyn FnMut(&[ScopeItem]) + Send>;

pub struct MillerColumns<A: ScopeApi + ?Sized + 'static> {
    config: PickerConfig,
    source: ScopeSource<A>,
    selection: SelectionState,
    emitted: Vec<ScopeItem>,
    on_change_items: Option<ChangeCallback>,
}

impl<A: ScopeApi + ?Sized + 'static> MillerColumns<A> {
    pub fn new(api: Arc<A>, config: PickerConfig) -> Self {
        Self {
            source: ScopeSource::new(api, config.page_size),
            config,
            selection: SelectionState::new(),
            emitted: Vec::new(),
            on_change_items: None,
        }
    }

    pub fn on_change_items(mut self, f: impl FnMut(&[ScopeItem]) + Send + 'static) -> Self {
        self.on_change_items = Some(Box::new(f));
        self
    }

    pub fn config(&self) -> &PickerConfig { &self.config }

    pub fn source(&self) -> &ScopeSource<A> { &self.source }

    pub fn selection(&self) -> &SelectionState { &self.selection }

    /// Items emitted by the last effective selection change.
    pub fn selected_items(&self) -> &[ScopeItem] { &self.emitted }

    /// Load the first page of the root column.
    pub fn mount(&mut self) -> bool { self.source.on_scroll_column(0) }

    /// Point the picker at another connection and reload from the root.
    pub fn set_connection(&mut self, id: ConnectionId) -> bool {
        if !self.source.set_owner(id) {
            return false;
        }
        self.emitted.clear();
        self.mount();
        true
    }

    pub fn set_disabled_items(&mut self, items: Option<&[ScopeItem]>) -> bool {
        self.selection.sync_disabled(items)
    }

    pub fn set_selected_items(&mut self, items: Option<&[ScopeItem]>) -> bool {
        self.selection.sync_selected(items)
    }

    /// Fetch the next page of `column` once the user scrolls near its bottom.
    pub fn on_scroll(&mut self, column: usize, pos: ScrollPosition) -> bool {
        if pos.remaining() > self.config.scroll_threshold_px as f32 {
            return false;
        }
        self.load_more(column)
    }

    /// Fetch the next page of `column` regardless of scroll position.
    pub fn load_more(&mut self, column: usize) -> bool { self.source.on_scroll_column(column) }

    pub fn click(&mut self, column: usize, id: &ScopeId) -> PickerResult<ClickOutcome> {
        if column >= self.source.column_count() {
            return Err(PickerError::UnknownColumn(column));
        }
        let expandable = self
            .source
            .node(column, id)
            .map(|n| n.expandable)
            .ok_or_else(|| PickerError::UnknownNode(id.clone()))?;
        if expandable {
            self.source.drill(column, id);
            return Ok(ClickOutcome::Opened(id.clone()));
        }
        if self.selection.is_disabled(id) {
            debug!(column, id = %id, "picker: click on disabled leaf ignored");
            return Ok(ClickOutcome::Ignored);
        }
        self.source.close_after(column);
        let Some(ids) = self.selection.toggle(id) else {
            return Ok(ClickOutcome::Ignored);
        };
        let selected = ids.contains(id);
        self.handle_change_items(ids);
        Ok(if selected { ClickOutcome::Selected(id.clone()) } else { ClickOutcome::Deselected(id.clone()) })
    }

    /// Store `ids` as the selection and emit the resolvable part of it.
    pub fn handle_change_items(&mut self, ids: Vec<ScopeId>) -> Vec<ScopeItem> {
        let Some(conn) = self.source.owner().cloned() else {
            debug!("picker: selection change without a connection");
            return Vec::new();
        };
        self.selection.set_selected_ids(ids);
        let items = self.selection.resolve(self.selection.selected_ids(), self.source.all_items(), &conn);
        info!(conn = %conn, selected = self.selection.selected_ids().len(), emitted = items.len(), "picker: selection changed");
        self.emitted = items.clone();
        if let Some(cb) = self.on_change_items.as_mut() {
            cb(&items);
        }
        items
    }

    pub fn process_updates(&mut self) -> Vec<Applied> { self.source.process_updates() }

    pub async fn next_update(&mut self) -> Option<Applied> { self.source.next_update().await }

    pub async fn settle(&mut self) -> Vec<Applied> { self.source.settle().await }

    pub fn view(&self) -> PickerView {
        let count = self.source.column_count().max(self.config.column_count);
        let path = self.source.path();
        let columns = (0..count)
            .map(|c| {
                let open = path.get(c);
                let rows = self
                    .source
                    .items(c)
                    .iter()
                    .map(|n| RowView {
                        id: n.id.clone(),
                        name: n.name.clone(),
                        selected: self.selection.is_selected(&n.id),
                        disabled: self.selection.is_disabled(&n.id),
                        expandable: n.expandable,
                        open: open == Some(&n.id),
                    })
                    .collect();
                ColumnView {
                    index: c,
                    parent: self.source.parent_of(c).flatten(),
                    rows,
                    loading: self.source.is_loading(c),
                    has_more: self.source.has_more(c),
                    error: self.source.error(c).map(|e| e.to_string()),
                }
            })
            .collect();
        PickerView {
            connection: self.source.owner().cloned(),
            column_height: self.config.column_height,
            columns,
            selected: self.emitted.clone(),
        }
    }
}

fn mark(r: &RowView) -> &'static str {
    if r.disabled {
        "[-]"
    } else if r.selected {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Plain-text rendering of a view, one block per column.
pub fn render_text(view: &PickerView) -> String {
    let mut out = String::new();
    for col in view.columns.iter() {
        match &col.parent {
            Some(p) => out.push_str(&format!("-- column {} ({}) --\n", col.index, p)),
            None => out.push_str(&format!("-- column {} --\n", col.index)),
        }
        if let Some(e) = &col.error {
            out.push_str(&format!("! {}\n", e));
        }
        for r in col.rows.iter() {
            let open = if r.open { "*" } else { " " };
            let arrow = if r.expandable { " >" } else { "" };
            out.push_str(&format!("{}{} {}{}\n", open, mark(r), r.name, arrow));
        }
        if col.loading {
            out.push_str("  loading…\n");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, selected: bool, disabled: bool, expandable: bool, open: bool) -> RowView {
        RowView { id: ScopeId::from(name), name: name.into(), selected, disabled, expandable, open }
    }

    #[test]
    fn threshold_uses_remaining_distance() {
        let p = ScrollPosition { offset: 200.0, viewport: 300.0, content: 540.0 };
        assert_eq!(p.remaining(), 40.0);
        let over = ScrollPosition { offset: 900.0, viewport: 300.0, content: 1000.0 };
        assert_eq!(over.remaining(), 0.0);
        assert_eq!(ScrollPosition::in_column(200.0, 540.0, 300), p);
    }

    #[test]
    fn text_marks_rows() {
        let view = PickerView {
            connection: Some(ConnectionId::new("conn-1")),
            column_height: 300,
            columns: vec![
                ColumnView {
                    index: 0,
                    parent: None,
                    rows: vec![
                        row("A", true, false, false, false),
                        row("B", false, true, false, false),
                        row("P", false, false, true, true),
                    ],
                    loading: false,
                    has_more: false,
                    error: None,
                },
                ColumnView {
                    index: 1,
                    parent: Some(ScopeId::from("P")),
                    rows: vec![],
                    loading: true,
                    has_more: true,
                    error: Some("fetch failed for column 1: transport: boom".into()),
                },
            ],
            selected: vec![],
        };
        let text = render_text(&view);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "-- column 0 --",
            " [x] A",
            " [-] B",
            "*[ ] P >",
            "-- column 1 (P) --",
            "! fetch failed for column 1: transport: boom",
            "  loading…",
        ]);
    }
}
