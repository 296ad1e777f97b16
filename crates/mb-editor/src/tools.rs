//! Active tool selection.
//!
//! | Tool   | Pointer-down on element      | Pointer-down on empty canvas   |
//! |--------|------------------------------|--------------------------------|
//! | Select | select + drag                | clear selection + marquee      |
//! | Hand   | pan                          | pan                            |
//! | Text   | select (no drag)             | place a text element, → Select |
//!
//! The middle mouse button pans under every tool.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Hand,
    Text,
}

impl ToolKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "select" => Some(ToolKind::Select),
            "hand" | "pan" => Some(ToolKind::Hand),
            "text" => Some(ToolKind::Text),
            _ => None,
        }
    }

    /// Whether pointer-down on an element starts a drag.
    pub fn drags_elements(self) -> bool {
        self == ToolKind::Select
    }

    /// Whether every pointer-down pans the viewport.
    pub fn always_pans(self) -> bool {
        self == ToolKind::Hand
    }
}
