//! Pointer gesture state machine.
//!
//! One gesture at a time, decided on pointer-down and kept until pointer-up
//! or pointer-leave, whichever comes first:
//!
//! ```text
//!            ┌─ middle button / Hand tool ──────────► Panning
//!            ├─ resize handle ──────────────────────► Resizing
//! Idle ──────┼─ element body (Select tool) ─────────► DraggingElement
//!            └─ empty canvas (Select tool) ─────────► MarqueeSelecting
//!
//! any ── pointer-up / pointer-leave ──► Idle   (marquee applies selection first)
//! ```
//!
//! Pan and drag track the *incremental* screen delta from the previous
//! event; resize tracks the *total* delta from the gesture start and is
//! recomputed from the recorded start bounds on every move, so repeated or
//! coalesced move events cannot accumulate error.

use crate::editor::{EditorConfig, EditorEffect};
use crate::input::{Modifiers, PointerButton};
use crate::tools::ToolKind;
use mb_core::{
    CanvasElement, ElementId, ElementPatch, ElementStore, HitTarget, Point, Rect, ResizeHandle,
    Selection, Viewport,
};

/// Snapshot taken when a resize starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeState {
    pub id: ElementId,
    pub handle: ResizeHandle,
    /// Pointer position at pointer-down, screen pixels.
    pub start_pointer: Point,
    pub start_bounds: Rect,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    /// `last` is the previous pointer position in screen pixels.
    Panning { last: Point },
    /// Corners in canvas units.
    MarqueeSelecting { start: Point, end: Point },
    DraggingElement { id: ElementId, last: Point },
    Resizing(ResizeState),
}

/// Mutable editor state a gesture may touch.
pub struct GestureContext<'a> {
    pub store: &'a mut ElementStore,
    pub selection: &'a mut Selection,
    pub viewport: &'a mut Viewport,
    pub tool: &'a mut ToolKind,
    pub config: &'a EditorConfig,
}

#[derive(Debug, Default)]
pub struct GestureMachine {
    state: Gesture,
    /// Whether pointer capture was requested at gesture start.
    captured: bool,
}

impl GestureMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Gesture {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == Gesture::Idle
    }

    pub fn has_capture(&self) -> bool {
        self.captured
    }

    /// Current marquee rectangle (canvas units), for rendering.
    pub fn marquee_rect(&self) -> Option<Rect> {
        match self.state {
            Gesture::MarqueeSelecting { start, end } => Some(Rect::from_corners(start, end)),
            _ => None,
        }
    }

    pub fn pointer_down(
        &mut self,
        ctx: &mut GestureContext<'_>,
        p: Point,
        button: PointerButton,
        modifiers: Modifiers,
        target: HitTarget,
    ) -> Vec<EditorEffect> {
        if !self.is_idle() {
            log::trace!("pointer-down ignored during {:?}", self.state);
            return vec![];
        }
        if button == PointerButton::Secondary {
            return vec![];
        }

        if button == PointerButton::Middle || ctx.tool.always_pans() {
            self.state = Gesture::Panning { last: p };
            self.captured = true;
            log::trace!("gesture: idle → panning");
            return vec![EditorEffect::CapturePointer];
        }

        match target {
            HitTarget::Handle(id, handle) => {
                let Some(el) = ctx.store.get(id) else {
                    return vec![];
                };
                self.state = Gesture::Resizing(ResizeState {
                    id,
                    handle,
                    start_pointer: p,
                    start_bounds: el.bounds(),
                });
                log::trace!("gesture: idle → resizing {id} via {handle:?}");
                vec![]
            }
            HitTarget::Element(id) => {
                if !ctx.store.contains(id) {
                    return vec![];
                }
                if modifiers.shift {
                    ctx.selection.toggle(id);
                } else {
                    ctx.selection.select_only(id);
                }
                if ctx.tool.drags_elements() {
                    self.state = Gesture::DraggingElement { id, last: p };
                    log::trace!("gesture: idle → dragging {id}");
                }
                vec![EditorEffect::SelectionChanged]
            }
            HitTarget::Canvas => match *ctx.tool {
                ToolKind::Select => {
                    ctx.selection.clear();
                    let start = ctx.viewport.screen_to_canvas(p);
                    self.state = Gesture::MarqueeSelecting { start, end: start };
                    log::trace!("gesture: idle → marquee at {start:?}");
                    vec![EditorEffect::SelectionChanged]
                }
                ToolKind::Text => {
                    let at = ctx.viewport.screen_to_canvas(p);
                    let el = CanvasElement::text(
                        centered_rect(at, CanvasElement::TEXT_SIZE),
                        ctx.config.new_text_content.as_str(),
                    );
                    let id = el.id;
                    ctx.store.add(el);
                    ctx.selection.select_only(id);
                    *ctx.tool = ToolKind::Select;
                    vec![
                        EditorEffect::ElementsChanged,
                        EditorEffect::SelectionChanged,
                        EditorEffect::ToolChanged(ToolKind::Select),
                    ]
                }
                ToolKind::Hand => vec![],
            },
        }
    }

    pub fn pointer_move(&mut self, ctx: &mut GestureContext<'_>, p: Point) -> Vec<EditorEffect> {
        match &mut self.state {
            Gesture::Idle => vec![],
            Gesture::Panning { last } => {
                let (dx, dy) = (p.x - last.x, p.y - last.y);
                *last = p;
                if dx == 0.0 && dy == 0.0 {
                    return vec![];
                }
                ctx.viewport.pan_by(dx, dy);
                vec![EditorEffect::ViewportChanged]
            }
            Gesture::MarqueeSelecting { end, .. } => {
                *end = ctx.viewport.screen_to_canvas(p);
                vec![EditorEffect::MarqueeChanged]
            }
            Gesture::DraggingElement { id, last } => {
                let (dx, dy) = (p.x - last.x, p.y - last.y);
                *last = p;
                if dx == 0.0 && dy == 0.0 {
                    return vec![];
                }
                let (cdx, cdy) = ctx.viewport.screen_delta_to_canvas(dx, dy);
                let targets: Vec<ElementId> =
                    if ctx.config.group_drag && ctx.selection.contains(*id) {
                        ctx.selection.iter().collect()
                    } else {
                        vec![*id]
                    };
                let mut moved = false;
                for target in targets {
                    moved |= ctx
                        .store
                        .with_element_mut(target, |el| {
                            el.x += cdx;
                            el.y += cdy;
                        })
                        .is_some();
                }
                if moved {
                    vec![EditorEffect::ElementsChanged]
                } else {
                    vec![]
                }
            }
            Gesture::Resizing(rs) => {
                let (dx, dy) = ctx
                    .viewport
                    .screen_delta_to_canvas(p.x - rs.start_pointer.x, p.y - rs.start_pointer.y);
                let next = resize_bounds(
                    rs.start_bounds,
                    rs.handle,
                    dx,
                    dy,
                    ctx.config.min_element_size,
                );
                let unchanged = ctx.store.get(rs.id).is_none_or(|el| el.bounds() == next);
                if unchanged {
                    return vec![];
                }
                ctx.store.update(rs.id, &ElementPatch::bounds(next));
                vec![EditorEffect::ElementsChanged]
            }
        }
    }

    /// Pointer-up or pointer-leave: always terminates the current gesture.
    pub fn pointer_end(&mut self, ctx: &mut GestureContext<'_>) -> Vec<EditorEffect> {
        let finished = std::mem::take(&mut self.state);
        let mut effects = Vec::new();

        if let Gesture::MarqueeSelecting { start, end } = finished {
            ctx.selection
                .select_by_rect(ctx.store, Rect::from_corners(start, end));
            effects.push(EditorEffect::SelectionChanged);
        }
        if finished != Gesture::Idle {
            log::trace!("gesture: {finished:?} → idle");
        }
        if std::mem::take(&mut self.captured) {
            effects.push(EditorEffect::ReleasePointer);
        }
        effects
    }
}

/// `size` centred on `center`.
pub fn centered_rect(center: Point, (w, h): (f32, f32)) -> Rect {
    Rect::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
}

/// Apply a total canvas-space drag `(dx, dy)` of `handle` to `start`.
///
/// North/west handles move the origin and shrink the size inversely;
/// south/east handles only change the size. Width and height never drop
/// below `min_size`, and when clamping a north/west drag the origin is
/// pinned so the opposite edge stays where it started.
pub fn resize_bounds(start: Rect, handle: ResizeHandle, dx: f32, dy: f32, min_size: f32) -> Rect {
    let mut r = start;

    if handle.moves_east() {
        r.width = start.width + dx;
    }
    if handle.moves_west() {
        r.x = start.x + dx;
        r.width = start.width - dx;
    }
    if handle.moves_south() {
        r.height = start.height + dy;
    }
    if handle.moves_north() {
        r.y = start.y + dy;
        r.height = start.height - dy;
    }

    if r.width < min_size {
        r.width = min_size;
        if handle.moves_west() {
            r.x = start.right() - min_size;
        }
    }
    if r.height < min_size {
        r.height = min_size;
        if handle.moves_north() {
            r.y = start.bottom() - min_size;
        }
    }
    r
}
