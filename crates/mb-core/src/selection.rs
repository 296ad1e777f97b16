//! The set of currently selected element ids.
//!
//! Kept as a small ordered vector: selections are tiny, and a stable
//! iteration order keeps rendering and tests deterministic.

use crate::hit::hit_test_rect;
use crate::id::ElementId;
use crate::model::Rect;
use crate::store::ElementStore;
use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    ids: SmallVec<[ElementId; 8]>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.ids.iter().copied()
    }

    pub fn first(&self) -> Option<ElementId> {
        self.ids.first().copied()
    }

    /// Plain click: the selection becomes exactly `{id}`.
    pub fn select_only(&mut self, id: ElementId) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Shift-click: add if absent, remove if present.
    pub fn toggle(&mut self, id: ElementId) {
        if let Some(pos) = self.ids.iter().position(|s| *s == id) {
            self.ids.remove(pos);
        } else {
            self.ids.push(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Replace the selection with every element intersecting `rect`.
    pub fn select_by_rect(&mut self, store: &ElementStore, rect: Rect) {
        self.ids = hit_test_rect(store, rect).into_iter().collect();
    }

    pub fn select_all(&mut self, store: &ElementStore) {
        self.ids = store.ids().collect();
    }

    /// Drop the given ids, e.g. after their elements were deleted.
    pub fn subtract(&mut self, removed: &[ElementId]) {
        self.ids.retain(|id| !removed.contains(id));
    }

    /// Drop ids whose element no longer exists.
    pub fn retain_existing(&mut self, store: &ElementStore) {
        self.ids.retain(|id| store.contains(*id));
    }
}
