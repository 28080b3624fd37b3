//! lakescope core types: scope identifiers, hierarchy nodes and the item shape
//! handed back to callers once a selection is resolved.

#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod columns;

/// Opaque scope identifier. Backends hand out either numbers or strings; the two
/// never compare equal (`1` is not `"1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeId {
    Num(u64),
    Str(String),
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Num(n) => write!(f, "{}", n),
            ScopeId::Str(s) => f.write_str(s),
        }
    }
}

impl From<u64> for ScopeId {
    fn from(v: u64) -> Self { ScopeId::Num(v) }
}

impl From<&str> for ScopeId {
    fn from(v: &str) -> Self { ScopeId::Str(v.to_string()) }
}

impl From<String> for ScopeId {
    fn from(v: String) -> Self { ScopeId::Str(v) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("empty scope id")]
    Empty,
}

/// All-digit input parses as a number, anything else as a string id.
impl FromStr for ScopeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() { return Err(IdError::Empty); }
        match s.parse::<u64>() {
            Ok(n) => Ok(ScopeId::Num(n)),
            Err(_) => Ok(ScopeId::Str(s.to_string())),
        }
    }
}

/// Owner key that scopes every fetch (a data connection).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new(v: impl Into<String>) -> Self { Self(v.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ConnectionId {
    fn from(v: &str) -> Self { Self(v.to_string()) }
}

/// A selectable unit in one hierarchy column (e.g. a Jira board).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeNode {
    pub id: ScopeId,
    /// Domain key; providers use it as `id` as well.
    pub board_id: ScopeId,
    pub name: String,
    /// Endpoint reference of the remote object.
    #[serde(rename = "self", default)]
    pub self_url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ScopeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ScopeId>,
    /// True when the node has a child column to drill into.
    #[serde(default)]
    pub expandable: bool,
}

impl ScopeNode {
    /// Leaf node whose id doubles as its domain key.
    pub fn leaf(id: impl Into<ScopeId>, name: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            board_id: id.clone(),
            id,
            name: name.into(),
            self_url: String::new(),
            kind: String::new(),
            parent_id: None,
            project_id: None,
            expandable: false,
        }
    }

    /// Node with children.
    pub fn group(id: impl Into<ScopeId>, name: impl Into<String>) -> Self {
        Self { expandable: true, ..Self::leaf(id, name) }
    }

    pub fn with_parent(mut self, parent: impl Into<ScopeId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }
}

/// Externally relevant shape of a selected scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeItem {
    pub connection_id: ConnectionId,
    pub board_id: ScopeId,
    pub name: String,
    #[serde(rename = "self", default)]
    pub self_url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ScopeId>,
}

impl ScopeItem {
    pub fn from_node(connection_id: &ConnectionId, node: &ScopeNode) -> Self {
        Self {
            connection_id: connection_id.clone(),
            board_id: node.board_id.clone(),
            name: node.name.clone(),
            self_url: node.self_url.clone(),
            kind: node.kind.clone(),
            project_id: node.project_id.clone(),
        }
    }
}

pub mod prelude {
    pub use super::{ConnectionId, ScopeId, ScopeItem, ScopeNode};
    pub use super::columns::{Align, ColumnDef};
}
