pub mod cards;
pub mod hit;
pub mod id;
pub mod model;
pub mod selection;
pub mod store;
pub mod viewport;

pub use cards::{CardTemplate, CustomCard, templates_for};
pub use hit::{HitTarget, ResizeHandle, hit_test, hit_test_rect};
pub use id::{ElementId, TaskId};
pub use model::*;
pub use selection::Selection;
pub use store::ElementStore;
pub use viewport::Viewport;

/// Selected elements in store (z) order: the reference context handed to
/// the generation backend.
pub fn selected_elements(store: &ElementStore, selection: &Selection) -> Vec<CanvasElement> {
    store
        .iter()
        .filter(|el| selection.contains(el.id))
        .cloned()
        .collect()
}
