//! Canvas data model for moodboard projects.
//!
//! A project is a flat, insertion-ordered list of `CanvasElement`s. Order is
//! only meaningful as z-order: later elements paint above earlier ones, and a
//! selected element floats above everything. Positions and sizes are stored in
//! canvas logical units, never screen pixels.

use crate::id::ElementId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smallest width or height an element may be resized to.
pub const MIN_ELEMENT_SIZE: f32 = 50.0;

// ─── Geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in canvas units. Width and height are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalize a drag from `a` to `b` regardless of drag direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Overlap test: `other` is excluded only when it lies entirely to one
    /// side of `self`. Touching edges count as intersecting.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(other.x > self.right()
            || other.right() < self.x
            || other.y > self.bottom()
            || other.bottom() < self.y)
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Image,
    Text,
    Card,
}

impl ElementKind {
    /// Id prefix used when minting elements of this kind.
    pub fn id_prefix(self) -> &'static str {
        match self {
            ElementKind::Image => "img",
            ElementKind::Text => "text",
            ElementKind::Card => "card",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Hook,
    Inspiration,
    Template,
    Product,
    Constraint,
}

impl CardType {
    pub const ALL: [CardType; 5] = [
        CardType::Hook,
        CardType::Inspiration,
        CardType::Template,
        CardType::Product,
        CardType::Constraint,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CardType::Hook => "hook",
            CardType::Inspiration => "inspiration",
            CardType::Template => "template",
            CardType::Product => "product",
            CardType::Constraint => "constraint",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

/// An element placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasElement {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Image URL / data URI, or the literal text. Unused by cards.
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<CardType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,
}

impl CanvasElement {
    pub const TEXT_SIZE: (f32, f32) = (200.0, 100.0);
    pub const IMAGE_SIZE: (f32, f32) = (300.0, 300.0);
    pub const CARD_SIZE: (f32, f32) = (300.0, 400.0);
    pub const GENERATED_SIZE: (f32, f32) = (400.0, 400.0);

    fn base(id: ElementId, kind: ElementKind, bounds: Rect, content: String) -> Self {
        Self {
            id,
            kind,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            content,
            rotation: None,
            card_type: None,
            image_content: None,
            text_content: None,
        }
    }

    pub fn text(bounds: Rect, text: impl Into<String>) -> Self {
        let id = ElementId::generate(ElementKind::Text.id_prefix());
        Self::base(id, ElementKind::Text, bounds, text.into())
    }

    pub fn image(bounds: Rect, url: impl Into<String>) -> Self {
        let id = ElementId::generate(ElementKind::Image.id_prefix());
        Self::base(id, ElementKind::Image, bounds, url.into())
    }

    /// An image produced by the generation backend (`ai-` id prefix).
    pub fn generated_image(origin: Point, url: impl Into<String>) -> Self {
        let (w, h) = Self::GENERATED_SIZE;
        let id = ElementId::generate("ai");
        Self::base(
            id,
            ElementKind::Image,
            Rect::new(origin.x, origin.y, w, h),
            url.into(),
        )
    }

    pub fn card(
        bounds: Rect,
        card_type: CardType,
        image_content: Option<String>,
        text_content: Option<String>,
    ) -> Self {
        let id = ElementId::generate(ElementKind::Card.id_prefix());
        let mut el = Self::base(id, ElementKind::Card, bounds, String::new());
        el.card_type = Some(card_type);
        el.image_content = image_content;
        el.text_content = text_content;
        el
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    pub fn set_bounds(&mut self, r: Rect) {
        self.x = r.x;
        self.y = r.y;
        self.width = r.width;
        self.height = r.height;
    }

    /// Merge a patch into this element. Kind and card type are immutable.
    pub fn apply(&mut self, patch: &ElementPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(w) = patch.width {
            self.width = w;
        }
        if let Some(h) = patch.height {
            self.height = h;
        }
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(image) = &patch.image_content {
            self.image_content = Some(image.clone());
        }
        if let Some(text) = &patch.text_content {
            self.text_content = Some(text.clone());
        }
    }
}

/// Partial update merged into an element by `ElementStore::update`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub content: Option<String>,
    pub image_content: Option<String>,
    pub text_content: Option<String>,
}

impl ElementPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn bounds(r: Rect) -> Self {
        Self {
            x: Some(r.x),
            y: Some(r.y),
            width: Some(r.width),
            height: Some(r.height),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ─── Projects ────────────────────────────────────────────────────────────

/// A persisted composition: title plus its element list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub is_example: bool,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub elements: Vec<CanvasElement>,
}

impl Project {
    pub const DEFAULT_TITLE: &'static str = "Untitled";

    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            title: if title.trim().is_empty() {
                Self::DEFAULT_TITLE.to_string()
            } else {
                title
            },
            thumbnail: None,
            is_example: false,
            updated_at: Utc::now(),
            elements: Vec::new(),
        }
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            thumbnail: self.thumbnail.clone(),
            is_example: self.is_example,
            updated_at: self.updated_at,
            element_count: self.elements.len(),
        }
    }

    /// Apply an update, stamping `updated_at`.
    pub fn apply(&mut self, update: ProjectUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(elements) = update.elements {
            self.elements = elements;
        }
        self.updated_at = Utc::now();
    }
}

/// Listing row for the project dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub is_example: bool,
    pub updated_at: DateTime<Utc>,
    pub element_count: usize,
}

/// Fields a save may overwrite. Elements are always the full array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elements: Option<Vec<CanvasElement>>,
}

impl ProjectUpdate {
    pub fn elements(elements: Vec<CanvasElement>) -> Self {
        Self {
            title: None,
            elements: Some(elements),
        }
    }
}
