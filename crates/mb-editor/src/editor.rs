//! The editor controller.
//!
//! `Editor` is the single owner of a session's canvas state: the element
//! store, the selection, the viewport, the active tool, and the in-progress
//! gesture. Every change goes through a method on it, so any reader (the
//! generation processor, the autosave loop) always observes a consistent
//! snapshot between events.

use crate::gesture::{GestureContext, GestureMachine, centered_rect};
use crate::input::InputEvent;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::tools::ToolKind;
use mb_core::model::MIN_ELEMENT_SIZE;
use mb_core::viewport::ZOOM_SENSITIVITY;
use mb_core::{
    CanvasElement, CardTemplate, ElementId, ElementPatch, ElementStore, Point, Rect, Selection,
    Viewport, hit_test, selected_elements,
};
use serde::{Deserialize, Serialize};

// ─── Config ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Resize floor for width and height, canvas units.
    pub min_element_size: f32,
    /// Grab distance around resize handles, screen pixels.
    pub handle_radius: f32,
    /// Gap between a reference element and a generated image placed to its right.
    pub placement_gap: f32,
    pub zoom_sensitivity: f32,
    /// Move every selected element when dragging one of them. Off by default:
    /// only the element under the pointer moves.
    pub group_drag: bool,
    /// Canvas surface size in screen pixels, used to find the viewport centre.
    pub screen_width: f32,
    pub screen_height: f32,
    /// Content of text elements placed by the Text tool or `add_text`.
    pub new_text_content: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_element_size: MIN_ELEMENT_SIZE,
            handle_radius: 6.0,
            placement_gap: 20.0,
            zoom_sensitivity: ZOOM_SENSITIVITY,
            group_drag: false,
            screen_width: 1280.0,
            screen_height: 800.0,
            new_text_content: "New Text".to_string(),
        }
    }
}

// ─── Effects ──────────────────────────────────────────────────────────────

/// What an event changed, for the host to react to (re-render, capture…).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorEffect {
    /// Host should capture the pointer to the canvas surface.
    CapturePointer,
    /// Host should release a capture taken at gesture start.
    ReleasePointer,
    ViewportChanged,
    SelectionChanged,
    ElementsChanged,
    MarqueeChanged,
    ToolChanged(ToolKind),
}

// ─── Editor ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Editor {
    store: ElementStore,
    selection: Selection,
    viewport: Viewport,
    tool: ToolKind,
    gesture: GestureMachine,
    config: EditorConfig,
    loaded: bool,
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Install a project's elements and reset per-session state.
    /// Pointer input is ignored until this has been called.
    pub fn load(&mut self, elements: Vec<CanvasElement>) {
        self.store.replace_all(elements);
        self.selection.clear();
        self.viewport = Viewport::default();
        self.gesture = GestureMachine::new();
        self.tool = ToolKind::Select;
        self.loaded = true;
        log::debug!("editor loaded {} element(s)", self.store.len());
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn store(&self) -> &ElementStore {
        &self.store
    }

    pub fn elements(&self) -> &[CanvasElement] {
        self.store.as_slice()
    }

    pub fn element(&self, id: ElementId) -> Option<&CanvasElement> {
        self.store.get(id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selected elements in z-order.
    pub fn selected_elements(&self) -> Vec<CanvasElement> {
        selected_elements(&self.store, &self.selection)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn gesture(&self) -> &GestureMachine {
        &self.gesture
    }

    pub fn marquee_rect(&self) -> Option<Rect> {
        self.gesture.marquee_rect()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Element-store revision; changes on every element mutation.
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn set_screen_size(&mut self, width: f32, height: f32) {
        self.config.screen_width = width;
        self.config.screen_height = height;
    }

    /// Canvas point under the centre of the screen.
    pub fn screen_center(&self) -> Point {
        self.viewport
            .center_in_canvas(self.config.screen_width, self.config.screen_height)
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.viewport.reset_zoom();
    }

    /// Jump straight to a zoom level; clamped like every other zoom.
    pub fn set_zoom(&mut self, scale: f32) {
        self.viewport.set_scale(scale);
    }

    pub fn set_tool(&mut self, tool: ToolKind) -> Vec<EditorEffect> {
        if self.tool == tool {
            return vec![];
        }
        self.tool = tool;
        vec![EditorEffect::ToolChanged(tool)]
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn handle(&mut self, event: &InputEvent) -> Vec<EditorEffect> {
        if !self.loaded {
            log::trace!("input before load ignored: {event:?}");
            return vec![];
        }

        match event {
            InputEvent::Key { key, modifiers } => {
                return match ShortcutMap::resolve(key, *modifiers) {
                    Some(action) => self.run_action(action),
                    None => vec![],
                };
            }
            InputEvent::Wheel { dx, dy, modifiers } => {
                if modifiers.command() {
                    self.viewport.zoom_by_wheel(*dy, self.config.zoom_sensitivity);
                } else {
                    self.viewport.pan_by(-dx, -dy);
                }
                return vec![EditorEffect::ViewportChanged];
            }
            _ => {}
        }

        let Editor {
            store,
            selection,
            viewport,
            tool,
            gesture,
            config,
            ..
        } = &mut *self;

        match event {
            InputEvent::PointerDown {
                x,
                y,
                button,
                modifiers,
                target,
            } => {
                let p = Point::new(*x, *y);
                let target = target.unwrap_or_else(|| {
                    let radius = config.handle_radius / viewport.scale;
                    hit_test(store, selection, viewport.screen_to_canvas(p), radius)
                });
                let mut ctx = GestureContext {
                    store,
                    selection,
                    viewport,
                    tool,
                    config,
                };
                gesture.pointer_down(&mut ctx, p, *button, *modifiers, target)
            }
            InputEvent::PointerMove { x, y, .. } => {
                let mut ctx = GestureContext {
                    store,
                    selection,
                    viewport,
                    tool,
                    config,
                };
                gesture.pointer_move(&mut ctx, Point::new(*x, *y))
            }
            InputEvent::PointerUp { .. } | InputEvent::PointerLeave { .. } => {
                let mut ctx = GestureContext {
                    store,
                    selection,
                    viewport,
                    tool,
                    config,
                };
                gesture.pointer_end(&mut ctx)
            }
            InputEvent::Wheel { .. } | InputEvent::Key { .. } => vec![],
        }
    }

    pub fn run_action(&mut self, action: ShortcutAction) -> Vec<EditorEffect> {
        match action {
            ShortcutAction::ToolSelect => self.set_tool(ToolKind::Select),
            ShortcutAction::ToolHand => self.set_tool(ToolKind::Hand),
            ShortcutAction::ToolText => self.set_tool(ToolKind::Text),
            ShortcutAction::Delete => {
                if self.delete_selected() > 0 {
                    vec![EditorEffect::ElementsChanged, EditorEffect::SelectionChanged]
                } else {
                    vec![]
                }
            }
            ShortcutAction::SelectAll => {
                self.selection.select_all(&self.store);
                vec![EditorEffect::SelectionChanged]
            }
            ShortcutAction::Deselect => {
                self.selection.clear();
                vec![EditorEffect::SelectionChanged]
            }
            ShortcutAction::ZoomIn => {
                self.zoom_in();
                vec![EditorEffect::ViewportChanged]
            }
            ShortcutAction::ZoomOut => {
                self.zoom_out();
                vec![EditorEffect::ViewportChanged]
            }
            ShortcutAction::ZoomReset => {
                self.reset_zoom();
                vec![EditorEffect::ViewportChanged]
            }
        }
    }

    // ─── Element operations ──────────────────────────────────────────────

    /// Add, select, and switch back to the Select tool.
    fn place(&mut self, element: CanvasElement) -> ElementId {
        let id = element.id;
        self.store.add(element);
        self.selection.select_only(id);
        self.tool = ToolKind::Select;
        id
    }

    pub fn add_text(&mut self) -> ElementId {
        let bounds = centered_rect(self.screen_center(), CanvasElement::TEXT_SIZE);
        let text = self.config.new_text_content.clone();
        self.place(CanvasElement::text(bounds, text))
    }

    /// Place an uploaded image (URL or data URI) at the screen centre.
    pub fn add_image(&mut self, url: impl Into<String>) -> ElementId {
        let bounds = centered_rect(self.screen_center(), CanvasElement::IMAGE_SIZE);
        self.place(CanvasElement::image(bounds, url))
    }

    pub fn add_card(&mut self, template: &CardTemplate) -> ElementId {
        let bounds = centered_rect(self.screen_center(), CanvasElement::CARD_SIZE);
        self.place(CanvasElement::card(
            bounds,
            template.card_type,
            template.image_content.clone(),
            template.text_content.clone(),
        ))
    }

    /// Where a generated image goes: right of the first reference element
    /// with a fixed gap, or the screen centre when there is no reference.
    pub fn generated_origin(&self, context: &[CanvasElement]) -> Point {
        match context.first() {
            Some(first) => Point::new(first.x + first.width + self.config.placement_gap, first.y),
            None => self.screen_center(),
        }
    }

    /// Insert a generated image. Unlike the other insertions this does not
    /// select the new element: the selection is left untouched so work in
    /// progress (including an active gesture) is not disturbed.
    pub fn insert_generated(
        &mut self,
        url: impl Into<String>,
        context: &[CanvasElement],
    ) -> ElementId {
        let origin = self.generated_origin(context);
        let element = CanvasElement::generated_image(origin, url);
        let id = element.id;
        self.store.add(element);
        log::debug!("inserted generated image {id} at {origin:?}");
        id
    }

    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        self.store.update(id, patch)
    }

    pub fn delete(&mut self, ids: &[ElementId]) -> usize {
        self.store.remove(ids, &mut self.selection)
    }

    pub fn delete_selected(&mut self) -> usize {
        let ids: Vec<ElementId> = self.selection.iter().collect();
        self.delete(&ids)
    }

    pub fn select_only(&mut self, id: ElementId) {
        if self.store.contains(id) {
            self.selection.select_only(id);
        }
    }

    pub fn toggle_selection(&mut self, id: ElementId) {
        if self.store.contains(id) {
            self.selection.toggle(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }
}
