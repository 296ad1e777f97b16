//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. `key` is the
//! `KeyboardEvent.key` value (e.g. `"a"`, `"Delete"`). On macOS ⌘ plays the
//! role Ctrl plays elsewhere; see `Modifiers::command`.

use crate::input::Modifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Tools ──
    ToolSelect,
    ToolHand,
    ToolText,

    // ── Edit ──
    Delete,
    SelectAll,
    Deselect,

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomReset,
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action, or `None` if unbound.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        if modifiers.command() {
            return match key {
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" | "_" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                _ => None,
            };
        }

        match key {
            "v" | "V" => Some(ShortcutAction::ToolSelect),
            "h" | "H" => Some(ShortcutAction::ToolHand),
            "t" | "T" => Some(ShortcutAction::ToolText),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };

    #[test]
    fn resolve_tool_shortcuts() {
        assert_eq!(
            ShortcutMap::resolve("v", Modifiers::NONE),
            Some(ShortcutAction::ToolSelect)
        );
        assert_eq!(
            ShortcutMap::resolve("H", Modifiers::NONE),
            Some(ShortcutAction::ToolHand)
        );
        assert_eq!(
            ShortcutMap::resolve("t", Modifiers::NONE),
            Some(ShortcutAction::ToolText)
        );
    }

    #[test]
    fn resolve_zoom_with_either_command_key() {
        assert_eq!(
            ShortcutMap::resolve("=", META),
            Some(ShortcutAction::ZoomIn)
        );
        assert_eq!(
            ShortcutMap::resolve("-", Modifiers::CTRL),
            Some(ShortcutAction::ZoomOut)
        );
        assert_eq!(
            ShortcutMap::resolve("0", Modifiers::CTRL),
            Some(ShortcutAction::ZoomReset)
        );
    }

    #[test]
    fn resolve_edit_keys() {
        assert_eq!(
            ShortcutMap::resolve("Backspace", Modifiers::NONE),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Escape", Modifiers::NONE),
            Some(ShortcutAction::Deselect)
        );
        assert_eq!(
            ShortcutMap::resolve("a", META),
            Some(ShortcutAction::SelectAll)
        );
    }

    #[test]
    fn resolve_modifier_precedence() {
        // Plain "a" and ⌘V are unbound.
        assert_eq!(ShortcutMap::resolve("a", Modifiers::NONE), None);
        assert_eq!(ShortcutMap::resolve("v", META), None);
    }
}
