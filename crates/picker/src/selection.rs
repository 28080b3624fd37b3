#![forbid(unsafe_code)]

use lakescope_core::{ConnectionId, ScopeId, ScopeItem, ScopeNode};
use metrics::counter;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::error::PickerError;

/// Domain keys of `items`, first occurrence wins.
pub fn derive_id_set(items: &[ScopeItem]) -> Vec<ScopeId> {
    let mut seen = FxHashSet::default();
    items
        .iter()
        .filter(|i| seen.insert(i.board_id.clone()))
        .map(|i| i.board_id.clone())
        .collect()
}

/// Disabled and selected id sets, kept in step with the lists handed in by the embedding view.
#[derive(Debug, Default)]
pub struct SelectionState {
    disabled_ids: FxHashSet<ScopeId>,
    selected_ids: Vec<ScopeId>,
    last_disabled: Option<Vec<ScopeItem>>,
    last_selected: Option<Vec<ScopeItem>>,
}

impl SelectionState {
    pub fn new() -> Self { Self::default() }

    pub fn selected_ids(&self) -> &[ScopeId] { &self.selected_ids }

    pub fn is_selected(&self, id: &ScopeId) -> bool { self.selected_ids.contains(id) }

    pub fn is_disabled(&self, id: &ScopeId) -> bool { self.disabled_ids.contains(id) }

    pub fn disabled_count(&self) -> usize { self.disabled_ids.len() }

    /// Re-derive the disabled set if `items` differs from the last list seen.
    pub fn sync_disabled(&mut self, items: Option<&[ScopeItem]>) -> bool {
        let next = items.map(|s| s.to_vec());
        if next == self.last_disabled {
            return false;
        }
        self.disabled_ids = derive_id_set(items.unwrap_or(&[])).into_iter().collect();
        self.last_disabled = next;
        true
    }

    /// Re-derive the selected list if `items` differs from the last list seen.
    pub fn sync_selected(&mut self, items: Option<&[ScopeItem]>) -> bool {
        let next = items.map(|s| s.to_vec());
        if next == self.last_selected {
            return false;
        }
        self.selected_ids = derive_id_set(items.unwrap_or(&[]));
        self.last_selected = next;
        true
    }

    /// Flip `id`. `None` when it is disabled, otherwise the whole updated list.
    pub fn toggle(&mut self, id: &ScopeId) -> Option<Vec<ScopeId>> {
        if self.is_disabled(id) {
            debug!(id = %id, "picker: toggle on disabled id ignored");
            return None;
        }
        match self.selected_ids.iter().position(|s| s == id) {
            Some(pos) => {
                self.selected_ids.remove(pos);
            }
            None => self.selected_ids.push(id.clone()),
        }
        Some(self.selected_ids.clone())
    }

    /// Replace the selection with `ids`, dropping duplicates. Disabled ids keep
    /// their current membership whatever `ids` says about them; the ones already
    /// selected follow the new ids in their previous order.
    pub fn set_selected_ids(&mut self, ids: Vec<ScopeId>) {
        let mut seen = FxHashSet::default();
        let mut next = Vec::with_capacity(ids.len());
        for id in ids {
            if self.is_disabled(&id) {
                debug!(id = %id, "picker: disabled id in selection change ignored");
                continue;
            }
            if seen.insert(id.clone()) {
                next.push(id);
            }
        }
        next.extend(self.selected_ids.iter().filter(|i| self.is_disabled(i)).cloned());
        self.selected_ids = next;
    }

    /// Map `ids` to items using the loaded `nodes`, in load order. Disabled ids
    /// are skipped; ids without a loaded node are left out until one arrives.
    pub fn resolve<'a>(
        &self,
        ids: &[ScopeId],
        nodes: impl IntoIterator<Item = &'a ScopeNode>,
        connection_id: &ConnectionId,
    ) -> Vec<ScopeItem> {
        let wanted: FxHashSet<&ScopeId> = ids.iter().filter(|i| !self.is_disabled(i)).collect();
        let mut found: FxHashSet<ScopeId> = FxHashSet::default();
        let mut out = Vec::new();
        for n in nodes {
            if wanted.contains(&n.id) && found.insert(n.id.clone()) {
                out.push(ScopeItem::from_node(connection_id, n));
            }
        }
        for id in wanted.iter().filter(|i| !found.contains(**i)) {
            let reason = PickerError::UnresolvableSelection((*id).clone());
            debug!(error = %reason, "picker: selected id not loaded yet");
            counter!("picker_selection_unresolved_total", 1u64);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64) -> ScopeItem {
        ScopeItem::from_node(&ConnectionId::new("conn-1"), &ScopeNode::leaf(id, format!("B{}", id)))
    }

    fn ids(v: &[u64]) -> Vec<ScopeId> { v.iter().map(|i| ScopeId::Num(*i)).collect() }

    #[test]
    fn derive_dedupes_in_order() {
        assert_eq!(derive_id_set(&[item(2), item(1), item(2)]), ids(&[2, 1]));
        assert!(derive_id_set(&[]).is_empty());
    }

    #[test]
    fn sync_compares_by_value() {
        let mut s = SelectionState::new();
        assert!(!s.sync_selected(None));
        let list = vec![item(1)];
        assert!(s.sync_selected(Some(&list)));
        let copy = list.clone();
        assert!(!s.sync_selected(Some(&copy)));
        assert!(s.sync_selected(Some(&[])));
        assert!(s.selected_ids().is_empty());
    }

    #[test]
    fn toggle_skips_disabled() {
        let mut s = SelectionState::new();
        s.sync_disabled(Some(&[item(2)]));
        assert_eq!(s.toggle(&ScopeId::Num(2)), None);
        assert_eq!(s.toggle(&ScopeId::Num(1)), Some(ids(&[1])));
        assert_eq!(s.toggle(&ScopeId::Num(1)), Some(vec![]));
    }

    #[test]
    fn resolve_follows_load_order_and_skips_disabled() {
        let mut s = SelectionState::new();
        s.sync_disabled(Some(&[item(2)]));
        let nodes: Vec<ScopeNode> = (1..=3u64).map(|i| ScopeNode::leaf(i, format!("B{}", i))).collect();
        let out = s.resolve(&ids(&[3, 2, 1, 7]), nodes.iter(), &ConnectionId::new("conn-1"));
        let got: Vec<ScopeId> = out.iter().map(|i| i.board_id.clone()).collect();
        assert_eq!(got, ids(&[1, 3]));
    }
}
