//! Table column descriptors.
//!
//! This module provides:
//! - `ColumnDef<R>`: title, accessor path, alignment, width and an optional render fn
//! - `render_rows` to turn rows into display cells
//! - `render_table` for fixed-width text output

#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

pub type RenderFn<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;

pub struct ColumnDef<R> {
    pub key: &'static str,
    pub title: &'static str,
    /// Row fields read by the default renderer, in order.
    pub data_index: SmallVec<[&'static str; 4]>,
    pub align: Align,
    pub width: usize,
    pub render: Option<RenderFn<R>>,
}

impl<R> Clone for ColumnDef<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            title: self.title,
            data_index: self.data_index.clone(),
            align: self.align,
            width: self.width,
            render: self.render.clone(),
        }
    }
}

impl<R> fmt::Debug for ColumnDef<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("data_index", &self.data_index)
            .field("align", &self.align)
            .field("width", &self.width)
            .field("render", &self.render.is_some())
            .finish()
    }
}

impl<R> ColumnDef<R> {
    pub fn new(key: &'static str, title: &'static str, width: usize) -> Self {
        Self { key, title, data_index: SmallVec::new(), align: Align::Left, width: width.max(1), render: None }
    }

    pub fn index(mut self, fields: &[&'static str]) -> Self {
        self.data_index = fields.iter().copied().collect();
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn render(mut self, f: impl Fn(&R) -> String + Send + Sync + 'static) -> Self {
        self.render = Some(Arc::new(f));
        self
    }
}

fn scalar(v: &serde_json::Value) -> Option<String> {
    use serde_json::Value;
    match v {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(arr) => {
            let parts: Vec<String> = arr.iter().filter_map(scalar).collect();
            if parts.is_empty() { None } else { Some(parts.join(",")) }
        }
        Value::Object(_) => None,
    }
}

fn render_cell<R>(col: &ColumnDef<R>, row: &R, json: &serde_json::Value) -> String {
    if let Some(f) = &col.render {
        return f(row);
    }
    let parts: Vec<String> = col.data_index.iter().filter_map(|k| json.get(*k).and_then(scalar)).collect();
    parts.join(" ")
}

/// Render every row into one display string per column.
pub fn render_rows<R: Serialize>(cols: &[ColumnDef<R>], rows: &[R]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| {
            let json = serde_json::to_value(row).unwrap_or(serde_json::Value::Null);
            cols.iter().map(|c| render_cell(c, row, &json)).collect()
        })
        .collect()
}

fn fit(s: &str, width: usize, align: Align) -> String {
    let len = s.chars().count();
    if len > width {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        return out;
    }
    let pad = width - len;
    match align {
        Align::Left => format!("{}{}", s, " ".repeat(pad)),
        Align::Right => format!("{}{}", " ".repeat(pad), s),
        Align::Center => {
            let left = pad / 2;
            format!("{}{}{}", " ".repeat(left), s, " ".repeat(pad - left))
        }
    }
}

/// Fixed-width text table: header line, rule, one line per row.
pub fn render_table<R: Serialize>(cols: &[ColumnDef<R>], rows: &[R]) -> String {
    let mut out = String::new();
    let header: Vec<String> = cols.iter().map(|c| fit(c.title, c.width, c.align)).collect();
    out.push_str(header.join("  ").trim_end());
    out.push('\n');
    let rule: Vec<String> = cols.iter().map(|c| "-".repeat(c.width)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for cells in render_rows(cols, rows) {
        let line: Vec<String> = cols.iter().zip(cells.iter()).map(|(c, s)| fit(s, c.width, c.align)).collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        icon: String,
        name: String,
        scope_ids: Vec<u64>,
    }

    fn rows() -> Vec<Row> {
        vec![Row { icon: "jira.svg".into(), name: "Jira Cloud".into(), scope_ids: vec![1, 2] }]
    }

    #[test]
    fn default_render_joins_accessor_fields() {
        let cols = vec![
            ColumnDef::<Row>::new("connection", "Data Connections", 24).index(&["icon", "name"]),
            ColumnDef::<Row>::new("scope", "Data Scope", 10).index(&["scopeIds"]),
        ];
        let cells = render_rows(&cols, &rows());
        assert_eq!(cells[0], vec!["jira.svg Jira Cloud".to_string(), "1,2".to_string()]);
    }

    #[test]
    fn render_fn_overrides_accessor() {
        let cols = vec![ColumnDef::<Row>::new("action", "", 9).align(Align::Center).render(|_| "Add Scope".into())];
        assert_eq!(render_rows(&cols, &rows())[0][0], "Add Scope");
    }

    #[test]
    fn table_pads_and_truncates() {
        let cols = vec![
            ColumnDef::<Row>::new("name", "Name", 6).index(&["name"]),
            ColumnDef::<Row>::new("n", "N", 3).index(&["scopeIds"]).align(Align::Right),
        ];
        let text = render_table(&cols, &rows());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Name      N");
        assert_eq!(lines[1], "------  ---");
        assert_eq!(lines[2], "Jira …  1,2");
    }
}
