//! Hierarchy data source: per-parent listings loaded page by page.
//!
//! Fetches run on spawned tokio tasks and report back over a channel; nothing
//! but the owner of the `ScopeSource` mutates listing state. Every result is
//! tagged with the `(generation, owner)` it was requested under so results for
//! a previous connection are dropped on arrival.

#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Instant;

use lakescope_api::{ApiResult, Pager, ScopeApi, ScopePage, ScopeQuery};
use lakescope_core::{ConnectionId, ScopeId, ScopeNode};
use metrics::{counter, histogram};
use rustc_hash::FxHashMap;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::error::PickerError;

/// Loaded children of one parent.
#[derive(Debug, Clone)]
pub struct Listing {
    pub items: Vec<ScopeNode>,
    pub cursor: Option<String>,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<PickerError>,
}

impl Default for Listing {
    fn default() -> Self {
        Self { items: Vec::new(), cursor: None, has_more: true, loading: false, error: None }
    }
}

/// Result of one fetch task, as sent back to the source.
#[derive(Debug)]
pub struct SourceUpdate {
    pub generation: u64,
    pub owner: ConnectionId,
    pub column: usize,
    pub parent: Option<ScopeId>,
    pub result: ApiResult<ScopePage>,
}

/// What applying an update did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Page { column: usize, parent: Option<ScopeId>, added: usize, has_more: bool },
    Failed { parent: Option<ScopeId>, error: PickerError },
    Stale(PickerError),
}

/// Fetches are spawned on the ambient tokio runtime; without one,
/// `on_scroll_column` starts nothing and returns false.
pub struct ScopeSource<A: ScopeApi + ?Sized + 'static> {
    api: Arc<A>,
    page_size: usize,
    owner: Option<ConnectionId>,
    generation: u64,
    listings: FxHashMap<Option<ScopeId>, Listing>,
    listing_order: Vec<Option<ScopeId>>,
    path: Vec<ScopeId>,
    in_flight: usize,
    tx: UnboundedSender<SourceUpdate>,
    rx: UnboundedReceiver<SourceUpdate>,
}

impl<A: ScopeApi + ?Sized + 'static> ScopeSource<A> {
    pub fn new(api: Arc<A>, page_size: usize) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            api,
            page_size: page_size.max(1),
            owner: None,
            generation: 0,
            listings: FxHashMap::default(),
            listing_order: Vec::new(),
            path: Vec::new(),
            in_flight: 0,
            tx,
            rx,
        }
    }

    pub fn owner(&self) -> Option<&ConnectionId> { self.owner.as_ref() }

    pub fn generation(&self) -> u64 { self.generation }

    pub fn page_size(&self) -> usize { self.page_size }

    /// Switch to another connection. Returns false when the owner is unchanged.
    pub fn set_owner(&mut self, owner: ConnectionId) -> bool {
        if self.owner.as_ref() == Some(&owner) {
            return false;
        }
        self.generation += 1;
        info!(owner = %owner, generation = self.generation, dropped_listings = self.listings.len(), "picker: owner changed");
        self.owner = Some(owner);
        self.listings.clear();
        self.listing_order.clear();
        self.path.clear();
        true
    }

    /// Opened node per column.
    pub fn path(&self) -> &[ScopeId] { &self.path }

    pub fn column_count(&self) -> usize { self.path.len() + 1 }

    /// Parent listed by `column`: `Some(None)` for the root column, `None` when the column is not shown.
    pub fn parent_of(&self, column: usize) -> Option<Option<ScopeId>> {
        match column {
            0 => Some(None),
            k if k <= self.path.len() => Some(Some(self.path[k - 1].clone())),
            _ => None,
        }
    }

    pub fn listing(&self, column: usize) -> Option<&Listing> {
        let parent = self.parent_of(column)?;
        self.listings.get(&parent)
    }

    pub fn items(&self, column: usize) -> &[ScopeNode] {
        self.listing(column).map(|l| l.items.as_slice()).unwrap_or(&[])
    }

    /// True until a short page (or a page without cursor) says otherwise.
    pub fn has_more(&self, column: usize) -> bool {
        match self.parent_of(column) {
            Some(parent) => self.listings.get(&parent).map(|l| l.has_more).unwrap_or(true),
            None => false,
        }
    }

    pub fn is_loading(&self, column: usize) -> bool {
        self.listing(column).map(|l| l.loading).unwrap_or(false)
    }

    pub fn error(&self, column: usize) -> Option<&PickerError> {
        self.listing(column).and_then(|l| l.error.as_ref())
    }

    pub fn node(&self, column: usize, id: &ScopeId) -> Option<&ScopeNode> {
        self.items(column).iter().find(|n| &n.id == id)
    }

    /// Every loaded node, listings in creation order.
    pub fn all_items(&self) -> impl Iterator<Item = &ScopeNode> + '_ {
        self.listing_order
            .iter()
            .filter_map(move |p| self.listings.get(p))
            .flat_map(|l| l.items.iter())
    }

    /// Fetches spawned and not yet applied, stale ones included.
    pub fn pending(&self) -> usize { self.in_flight }

    fn ensure_listing(&mut self, parent: &Option<ScopeId>) -> &mut Listing {
        if !self.listings.contains_key(parent) {
            self.listing_order.push(parent.clone());
        }
        self.listings.entry(parent.clone()).or_default()
    }

    /// Request the next page for `column`. Returns whether a fetch was spawned.
    pub fn on_scroll_column(&mut self, column: usize) -> bool {
        let Some(owner) = self.owner.clone() else {
            debug!(column, "picker: scroll ignored, no connection");
            return false;
        };
        let Some(parent) = self.parent_of(column) else {
            debug!(column, "picker: scroll ignored, column not shown");
            return false;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(column, "picker: no tokio runtime, fetch not started");
            return false;
        };
        let page_size = self.page_size;
        let listing = self.ensure_listing(&parent);
        if !listing.has_more || listing.loading {
            debug!(column, has_more = listing.has_more, loading = listing.loading, "picker: fetch trigger dropped");
            counter!("picker_fetch_dropped_total", 1u64);
            return false;
        }
        listing.loading = true;
        let query = ScopeQuery {
            connection_id: owner.clone(),
            parent_id: parent.clone(),
            pager: Pager { offset: listing.items.len(), skip_cursor: listing.cursor.clone(), size: page_size },
        };
        info!(conn = %owner, column, parent = ?parent, offset = query.pager.offset, "picker: fetch start");
        counter!("picker_fetch_total", 1u64);
        self.in_flight += 1;
        let api = self.api.clone();
        let tx = self.tx.clone();
        let generation = self.generation;
        runtime.spawn(async move {
            let t0 = Instant::now();
            let result = api.fetch_scope_list(query).await;
            let took_ms = t0.elapsed().as_secs_f64() * 1000.0;
            histogram!("picker_fetch_ms", took_ms);
            debug!(column, took_ms, ok = result.is_ok(), "picker: fetch returned");
            // receiver lives as long as the source; a send error means it is gone
            let _ = tx.send(SourceUpdate { generation, owner, column, parent, result });
        });
        true
    }

    /// Open an expandable node in `column`, closing anything deeper.
    /// The child listing is fetched only when nothing is cached for it yet.
    pub fn drill(&mut self, column: usize, id: &ScopeId) -> bool {
        match self.node(column, id) {
            Some(n) if n.expandable => {}
            _ => return false,
        }
        self.path.truncate(column);
        self.path.push(id.clone());
        let child = Some(id.clone());
        let cached = self
            .listings
            .get(&child)
            .map(|l| !l.items.is_empty() || l.loading || !l.has_more)
            .unwrap_or(false);
        if cached {
            debug!(column, id = %id, "picker: reopened cached listing");
        } else {
            self.on_scroll_column(column + 1);
        }
        true
    }

    /// Close every column right of `column`.
    pub fn close_after(&mut self, column: usize) {
        self.path.truncate(column);
    }

    fn apply(&mut self, u: SourceUpdate) -> Applied {
        self.in_flight = self.in_flight.saturating_sub(1);
        if u.generation != self.generation || self.owner.as_ref() != Some(&u.owner) {
            debug!(owner = %u.owner, generation = u.generation, current = self.generation, "picker: stale response discarded");
            counter!("picker_stale_discarded_total", 1u64);
            return Applied::Stale(PickerError::StaleResponse { owner: u.owner });
        }
        let page_size = self.page_size;
        let Some(listing) = self.listings.get_mut(&u.parent) else {
            counter!("picker_stale_discarded_total", 1u64);
            return Applied::Stale(PickerError::StaleResponse { owner: u.owner });
        };
        listing.loading = false;
        match u.result {
            Ok(page) => {
                let added = page.items.len();
                listing.has_more = page.next_cursor.is_some() || added >= page_size;
                listing.cursor = page.next_cursor;
                listing.items.extend(page.items);
                listing.error = None;
                info!(column = u.column, parent = ?u.parent, added, total = listing.items.len(), has_more = listing.has_more, "picker: fetch done");
                Applied::Page { column: u.column, parent: u.parent, added, has_more: listing.has_more }
            }
            Err(e) => {
                let error = PickerError::FetchFailure { column: u.column, message: e.to_string() };
                info!(column = u.column, parent = ?u.parent, error = %e, "picker: fetch failed");
                counter!("picker_fetch_errors_total", 1u64);
                listing.error = Some(error.clone());
                Applied::Failed { parent: u.parent, error }
            }
        }
    }

    /// Apply every update that has already arrived.
    pub fn process_updates(&mut self) -> Vec<Applied> {
        let mut out = Vec::new();
        while let Ok(u) = self.rx.try_recv() {
            out.push(self.apply(u));
        }
        out
    }

    /// Wait for the next update and apply it. `None` when nothing is in flight.
    pub async fn next_update(&mut self) -> Option<Applied> {
        if self.in_flight == 0 {
            return None;
        }
        let u = self.rx.recv().await?;
        Some(self.apply(u))
    }

    /// Apply updates until nothing is in flight.
    pub async fn settle(&mut self) -> Vec<Applied> {
        let mut out = Vec::new();
        while let Some(a) = self.next_update().await {
            out.push(a);
        }
        out
    }
}
