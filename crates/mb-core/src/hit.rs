//! Hit testing: canvas point → element, handle, or empty canvas.
//!
//! Walks elements in paint order reversed (topmost first). Selected elements
//! float above unselected ones, so they are tested first, and the resize
//! handles of selected elements take priority over any element body.

use crate::id::ElementId;
use crate::model::{Point, Rect};
use crate::selection::Selection;
use crate::store::ElementStore;
use serde::{Deserialize, Serialize};

/// One of the eight resize handles around a selected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    N,
    S,
    E,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NW,
        ResizeHandle::NE,
        ResizeHandle::SW,
        ResizeHandle::SE,
        ResizeHandle::N,
        ResizeHandle::S,
        ResizeHandle::W,
        ResizeHandle::E,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "n" => ResizeHandle::N,
            "s" => ResizeHandle::S,
            "e" => ResizeHandle::E,
            "w" => ResizeHandle::W,
            "ne" => ResizeHandle::NE,
            "nw" => ResizeHandle::NW,
            "se" => ResizeHandle::SE,
            "sw" => ResizeHandle::SW,
            _ => return None,
        })
    }

    pub fn moves_north(self) -> bool {
        matches!(self, ResizeHandle::N | ResizeHandle::NE | ResizeHandle::NW)
    }

    pub fn moves_south(self) -> bool {
        matches!(self, ResizeHandle::S | ResizeHandle::SE | ResizeHandle::SW)
    }

    pub fn moves_east(self) -> bool {
        matches!(self, ResizeHandle::E | ResizeHandle::NE | ResizeHandle::SE)
    }

    pub fn moves_west(self) -> bool {
        matches!(self, ResizeHandle::W | ResizeHandle::NW | ResizeHandle::SW)
    }

    /// Where this handle sits on `r`: corners and edge midpoints.
    pub fn position_on(self, r: &Rect) -> Point {
        let x = if self.moves_west() {
            r.x
        } else if self.moves_east() {
            r.right()
        } else {
            r.x + r.width / 2.0
        };
        let y = if self.moves_north() {
            r.y
        } else if self.moves_south() {
            r.bottom()
        } else {
            r.y + r.height / 2.0
        };
        Point::new(x, y)
    }
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Canvas,
    Element(ElementId),
    Handle(ElementId, ResizeHandle),
}

/// Resolve the down-target at canvas point `p`.
///
/// `handle_radius` is the handle grab distance in canvas units.
pub fn hit_test(
    store: &ElementStore,
    selection: &Selection,
    p: Point,
    handle_radius: f32,
) -> HitTarget {
    for id in selection.iter() {
        let Some(el) = store.get(id) else { continue };
        let bounds = el.bounds();
        for handle in ResizeHandle::ALL {
            let hp = handle.position_on(&bounds);
            if (p.x - hp.x).abs() <= handle_radius && (p.y - hp.y).abs() <= handle_radius {
                return HitTarget::Handle(id, handle);
            }
        }
    }

    let topmost = |selected: bool| {
        store
            .iter()
            .rev()
            .filter(|el| selection.contains(el.id) == selected)
            .find(|el| el.bounds().contains(p))
            .map(|el| el.id)
    };

    topmost(true)
        .or_else(|| topmost(false))
        .map_or(HitTarget::Canvas, HitTarget::Element)
}

/// All elements whose bounds intersect `rect`, in store order.
/// Used for marquee selection.
pub fn hit_test_rect(store: &ElementStore, rect: Rect) -> Vec<ElementId> {
    store
        .iter()
        .filter(|el| rect.intersects(&el.bounds()))
        .map(|el| el.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanvasElement;
    use pretty_assertions::assert_eq;

    fn element(name: &str, x: f32, y: f32, w: f32, h: f32) -> CanvasElement {
        let mut el = CanvasElement::image(Rect::new(x, y, w, h), "u");
        el.id = ElementId::intern(name);
        el
    }

    fn store() -> ElementStore {
        ElementStore::from_elements(vec![
            element("hit_a", 0.0, 0.0, 10.0, 10.0),
            element("hit_b", 100.0, 100.0, 10.0, 10.0),
        ])
    }

    #[test]
    fn marquee_selects_by_intersection() {
        let s = store();
        assert_eq!(
            hit_test_rect(&s, Rect::new(0.0, 0.0, 20.0, 20.0)),
            vec![ElementId::intern("hit_a")]
        );
        assert_eq!(
            hit_test_rect(&s, Rect::new(5.0, 5.0, 200.0, 200.0)),
            vec![ElementId::intern("hit_a"), ElementId::intern("hit_b")]
        );
    }

    #[test]
    fn later_element_is_on_top() {
        let s = ElementStore::from_elements(vec![
            element("under", 0.0, 0.0, 100.0, 100.0),
            element("over", 50.0, 50.0, 100.0, 100.0),
        ]);
        let hit = hit_test(&s, &Selection::new(), Point::new(75.0, 75.0), 6.0);
        assert_eq!(hit, HitTarget::Element(ElementId::intern("over")));
    }

    #[test]
    fn selected_element_floats_above() {
        let s = ElementStore::from_elements(vec![
            element("sel_under", 0.0, 0.0, 100.0, 100.0),
            element("sel_over", 50.0, 50.0, 100.0, 100.0),
        ]);
        let mut sel = Selection::new();
        sel.select_only(ElementId::intern("sel_under"));
        let hit = hit_test(&s, &sel, Point::new(75.0, 75.0), 6.0);
        assert_eq!(hit, HitTarget::Element(ElementId::intern("sel_under")));
    }

    #[test]
    fn handles_only_on_selected_elements() {
        let s = store();
        let corner = Point::new(10.0, 10.0);
        assert_eq!(
            hit_test(&s, &Selection::new(), corner, 3.0),
            HitTarget::Element(ElementId::intern("hit_a"))
        );

        let mut sel = Selection::new();
        sel.select_only(ElementId::intern("hit_a"));
        assert_eq!(
            hit_test(&s, &sel, corner, 3.0),
            HitTarget::Handle(ElementId::intern("hit_a"), ResizeHandle::SE)
        );
    }

    #[test]
    fn empty_space_is_canvas() {
        assert_eq!(
            hit_test(&store(), &Selection::new(), Point::new(500.0, 500.0), 6.0),
            HitTarget::Canvas
        );
    }

    #[test]
    fn handle_positions() {
        let r = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(ResizeHandle::N.position_on(&r), Point::new(50.0, 0.0));
        assert_eq!(ResizeHandle::SW.position_on(&r), Point::new(0.0, 50.0));
        assert_eq!(ResizeHandle::E.position_on(&r), Point::new(100.0, 25.0));
        assert_eq!(ResizeHandle::parse("ne"), Some(ResizeHandle::NE));
        assert_eq!(ResizeHandle::parse("x"), None);
    }
}
