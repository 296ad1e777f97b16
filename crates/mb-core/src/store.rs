//! Ordered collection of placed elements.
//!
//! All operations are total: unknown ids are silently ignored. Every
//! effective mutation bumps `revision`, which the autosave scheduler watches.

use crate::id::ElementId;
use crate::model::{CanvasElement, ElementPatch};
use crate::selection::Selection;

#[derive(Debug, Clone, Default)]
pub struct ElementStore {
    elements: Vec<CanvasElement>,
    revision: u64,
}

impl ElementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted elements. Duplicate ids keep the first
    /// occurrence. Loading is not a mutation: `revision` starts at 0.
    pub fn from_elements(elements: Vec<CanvasElement>) -> Self {
        let mut store = Self::new();
        store.replace_all(elements);
        store
    }

    /// Replace the whole collection without bumping `revision`.
    pub fn replace_all(&mut self, elements: Vec<CanvasElement>) {
        self.elements.clear();
        for el in elements {
            if self.contains(el.id) {
                log::warn!("dropping duplicate element id {} on load", el.id);
                continue;
            }
            self.elements.push(el);
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.iter().any(|el| el.id == id)
    }

    pub fn get(&self, id: ElementId) -> Option<&CanvasElement> {
        self.elements.iter().find(|el| el.id == id)
    }

    /// Private so every mutation goes through a path that bumps `revision`.
    fn get_mut(&mut self, id: ElementId) -> Option<&mut CanvasElement> {
        self.elements.iter_mut().find(|el| el.id == id)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &CanvasElement> {
        self.elements.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.iter().map(|el| el.id)
    }

    pub fn as_slice(&self) -> &[CanvasElement] {
        &self.elements
    }

    pub fn to_vec(&self) -> Vec<CanvasElement> {
        self.elements.clone()
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Append an element. Returns `false` (and changes nothing) if an
    /// element with the same id is already present.
    pub fn add(&mut self, element: CanvasElement) -> bool {
        if self.contains(element.id) {
            log::warn!("refusing to add duplicate element id {}", element.id);
            return false;
        }
        log::trace!("add {:?} element {}", element.kind, element.id);
        self.elements.push(element);
        self.touch();
        true
    }

    /// Merge `patch` into the element with `id`. No-op if absent.
    pub fn update(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        let Some(el) = self.get_mut(id) else {
            return false;
        };
        el.apply(patch);
        self.touch();
        true
    }

    /// Run `f` on the element with `id`, counting it as a mutation.
    pub fn with_element_mut<R>(
        &mut self,
        id: ElementId,
        f: impl FnOnce(&mut CanvasElement) -> R,
    ) -> Option<R> {
        let el = self.get_mut(id)?;
        let out = f(el);
        self.touch();
        Some(out)
    }

    /// Remove every element whose id is in `ids` and drop those ids from
    /// `selection` in the same step. Returns the number removed.
    pub fn remove(&mut self, ids: &[ElementId], selection: &mut Selection) -> usize {
        let before = self.elements.len();
        self.elements.retain(|el| !ids.contains(&el.id));
        let removed = before - self.elements.len();
        selection.subtract(ids);
        if removed > 0 {
            log::debug!("removed {removed} element(s)");
            self.touch();
        }
        removed
    }
}
