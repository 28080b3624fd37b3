//! lakescope scope API façade.
//!
//! This crate defines the paged-list trait the picker depends on. Any backend
//! (REST proxy, GraphQL, RPC) that can hand out one page of child scopes for a
//! connection and parent satisfies it.

#![forbid(unsafe_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use lakescope_core::{ConnectionId, ScopeId, ScopeNode};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::debug;

/// Pagination input: either an offset into the listing or a server cursor.
/// A cursor, when present, wins over the offset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pager {
    pub offset: usize,
    pub skip_cursor: Option<String>,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScopeQuery {
    pub connection_id: ConnectionId,
    /// `None` lists the root column.
    pub parent_id: Option<ScopeId>,
    pub pager: Pager,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ScopePage {
    pub items: Vec<ScopeNode>,
    pub next_cursor: Option<String>,
}

/// API errors suitable for transport over RPC.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ApiError {
    #[error("validation: {0}")]
    Validation(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Paged provider of scope nodes.
#[async_trait::async_trait]
pub trait ScopeApi: Send + Sync {
    /// Fetch one page of the children of `query.parent_id` for a connection.
    async fn fetch_scope_list(&self, query: ScopeQuery) -> ApiResult<ScopePage>;
}

// ----------------- Mock implementation -----------------

/// JSON fixture: `{"connections": {"conn-1": [nodes...]}, "cursorPaging": false}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeFixture {
    #[serde(default)]
    pub connections: FxHashMap<String, Vec<ScopeNode>>,
    /// Hand out opaque cursors instead of relying on offsets.
    #[serde(default)]
    pub cursor_paging: bool,
}

/// Holds gated fetches until permits are released.
#[derive(Clone)]
pub struct Gate { sem: Arc<Semaphore> }

impl Gate {
    /// Let `n` pending (or future) fetches complete.
    pub fn release(&self, n: usize) { self.sem.add_permits(n); }
}

/// In-memory implementation serving a fixture. Used by tests and the CLI.
pub struct MockApi {
    fixture: ScopeFixture,
    calls: Mutex<Vec<ScopeQuery>>,
    fail_next: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl Default for MockApi {
    fn default() -> Self { Self::from_fixture(ScopeFixture::default()) }
}

impl MockApi {
    pub fn new() -> Self { Self::default() }

    pub fn from_fixture(fixture: ScopeFixture) -> Self {
        Self { fixture, calls: Mutex::new(Vec::new()), fail_next: AtomicUsize::new(0), gate: None }
    }

    /// Load a fixture file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("reading fixture {}", path.display()))?;
        let fixture: ScopeFixture = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing fixture {}", path.display()))?;
        Ok(Self::from_fixture(fixture))
    }

    pub fn with_connection(mut self, connection: &str, nodes: Vec<ScopeNode>) -> Self {
        self.fixture.connections.insert(connection.to_string(), nodes);
        self
    }

    pub fn with_cursor_paging(mut self, on: bool) -> Self {
        self.fixture.cursor_paging = on;
        self
    }

    /// Make the next `n` fetches fail with a transport error.
    pub fn fail_next(&self, n: usize) { self.fail_next.store(n, Ordering::SeqCst); }

    /// Hold every fetch until the returned gate releases it.
    pub fn gated(mut self) -> (Self, Gate) {
        let sem = Arc::new(Semaphore::new(0));
        self.gate = Some(sem.clone());
        (self, Gate { sem })
    }

    /// Queries received so far, in arrival order.
    pub fn calls(&self) -> Vec<ScopeQuery> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn take_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn encode_cursor(pos: usize) -> String { format!("cur:{}", pos) }

fn decode_cursor(c: &str) -> ApiResult<usize> {
    c.strip_prefix("cur:")
        .and_then(|s| s.parse::<usize>().ok())
        .ok_or_else(|| ApiError::Validation(format!("invalid cursor: {}", c)))
}

#[async_trait::async_trait]
impl ScopeApi for MockApi {
    async fn fetch_scope_list(&self, query: ScopeQuery) -> ApiResult<ScopePage> {
        debug!(conn = %query.connection_id, parent = ?query.parent_id, offset = query.pager.offset, size = query.pager.size, "api: fetch_scope_list");
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(query.clone());
        if let Some(gate) = &self.gate {
            let permit = gate.acquire().await.map_err(|e| ApiError::Internal(e.to_string()))?;
            permit.forget();
        }
        if self.take_failure() {
            return Err(ApiError::Transport("injected failure".into()));
        }
        let nodes = self
            .fixture
            .connections
            .get(query.connection_id.as_str())
            .ok_or_else(|| ApiError::NotFound(format!("connection {}", query.connection_id)))?;
        let children: Vec<&ScopeNode> = nodes.iter().filter(|n| n.parent_id == query.parent_id).collect();
        let start = match &query.pager.skip_cursor {
            Some(c) => decode_cursor(c)?,
            None => query.pager.offset,
        };
        let start = start.min(children.len());
        let end = start.saturating_add(query.pager.size.max(1)).min(children.len());
        let items: Vec<ScopeNode> = children[start..end].iter().map(|n| (*n).clone()).collect();
        let next_cursor = if self.fixture.cursor_paging && end < children.len() { Some(encode_cursor(end)) } else { None };
        Ok(ScopePage { items, next_cursor })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boards(n: u64) -> Vec<ScopeNode> {
        (1..=n).map(|i| ScopeNode::leaf(i, format!("Board {}", i))).collect()
    }

    fn query(offset: usize, cursor: Option<String>, size: usize) -> ScopeQuery {
        ScopeQuery {
            connection_id: ConnectionId::new("conn-1"),
            parent_id: None,
            pager: Pager { offset, skip_cursor: cursor, size },
        }
    }

    #[tokio::test]
    async fn offset_paging_slices_children() {
        let api = MockApi::new().with_connection("conn-1", boards(5));
        let p1 = api.fetch_scope_list(query(0, None, 2)).await.unwrap();
        let p3 = api.fetch_scope_list(query(4, None, 2)).await.unwrap();
        assert_eq!(p1.items.len(), 2);
        assert_eq!(p1.next_cursor, None);
        assert_eq!(p3.items.len(), 1);
        assert_eq!(p3.items[0].name, "Board 5");
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn cursor_paging_hands_out_opaque_cursors() {
        let api = MockApi::new().with_connection("conn-1", boards(3)).with_cursor_paging(true);
        let p1 = api.fetch_scope_list(query(0, None, 2)).await.unwrap();
        assert_eq!(p1.next_cursor.as_deref(), Some("cur:2"));
        let p2 = api.fetch_scope_list(query(0, p1.next_cursor, 2)).await.unwrap();
        assert_eq!(p2.items.len(), 1);
        assert!(p2.next_cursor.is_none());
        let bad = api.fetch_scope_list(query(0, Some("garbage".into()), 2)).await;
        assert!(matches!(bad, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn children_are_filtered_by_parent() {
        let nodes = vec![
            ScopeNode::group("p1", "Project"),
            ScopeNode::leaf(10u64, "Child").with_parent("p1"),
        ];
        let api = MockApi::new().with_connection("conn-1", nodes);
        let mut q = query(0, None, 10);
        q.parent_id = Some(ScopeId::from("p1"));
        let page = api.fetch_scope_list(q).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, ScopeId::Num(10));
    }

    #[tokio::test]
    async fn injected_failures_and_unknown_connections() {
        let api = MockApi::new().with_connection("conn-1", boards(1));
        api.fail_next(1);
        assert!(matches!(api.fetch_scope_list(query(0, None, 1)).await, Err(ApiError::Transport(_))));
        assert!(api.fetch_scope_list(query(0, None, 1)).await.is_ok());
        let mut q = query(0, None, 1);
        q.connection_id = ConnectionId::new("nope");
        assert!(matches!(api.fetch_scope_list(q).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn gate_holds_responses_until_released() {
        let (api, gate) = MockApi::new().with_connection("conn-1", boards(1)).gated();
        let api = Arc::new(api);
        let a = api.clone();
        let task = tokio::spawn(async move { a.fetch_scope_list(query(0, None, 1)).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!task.is_finished());
        gate.release(1);
        let page = task.await.unwrap().unwrap();
        assert_eq!(page.items.len(), 1);
    }
}
