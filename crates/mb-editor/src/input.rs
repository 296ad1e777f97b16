//! Input abstraction layer.
//!
//! Normalizes pointer, wheel, and keyboard events from any host (browser,
//! native window, test harness) into `InputEvent`s consumed by the editor.
//! All coordinates are screen pixels relative to the canvas surface.

use mb_core::HitTarget;

/// Keyboard modifiers held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    /// ⌘ on macOS, Ctrl elsewhere.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerButton {
    #[default]
    Primary,
    /// Auxiliary (wheel) button: always pans.
    Middle,
    Secondary,
}

/// A normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f32,
        y: f32,
        button: PointerButton,
        modifiers: Modifiers,
        /// Down-target resolved by the host, if it does its own hit testing.
        /// `None` lets the editor hit-test the canvas itself.
        target: Option<HitTarget>,
    },

    PointerMove {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },

    PointerUp {
        x: f32,
        y: f32,
    },

    /// Pointer left the canvas surface. Ends the gesture exactly like `PointerUp`.
    PointerLeave {
        x: f32,
        y: f32,
    },

    Wheel {
        dx: f32,
        dy: f32,
        modifiers: Modifiers,
    },

    Key {
        key: String,
        modifiers: Modifiers,
    },
}

impl InputEvent {
    /// Primary-button press with no modifiers, hit-tested by the editor.
    pub fn down(x: f32, y: f32) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
            target: None,
        }
    }

    pub fn down_on(x: f32, y: f32, target: HitTarget) -> Self {
        Self::PointerDown {
            x,
            y,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
            target: Some(target),
        }
    }

    pub fn move_to(x: f32, y: f32) -> Self {
        Self::PointerMove {
            x,
            y,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn key(key: &str, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y }
            | Self::PointerLeave { x, y } => Some((*x, *y)),
            _ => None,
        }
    }
}
