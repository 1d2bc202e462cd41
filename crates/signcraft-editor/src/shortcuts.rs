//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. The map lives
//! in Rust so the browser bridge and native tests share it.

use crate::input::Modifiers;
use crate::tools::ToolKind;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Tool switching ──
    Tool(ToolKind),

    // ── Edit ──
    Delete,
    Undo,
    Redo,

    // ── File ──
    Save,
    Export,

    // ── View ──
    ZoomIn,
    ZoomOut,
    ResetZoom,
    FitToCanvas,
}

pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"z"`, `"Delete"`).
    /// Nothing resolves while focus is in a text field.
    pub fn resolve(key: &str, modifiers: Modifiers, in_text_field: bool) -> Option<ShortcutAction> {
        if in_text_field {
            return None;
        }
        let cmd = modifiers.command();

        // ── Modifier combos first (most specific) ──
        if cmd && modifiers.shift {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Redo),
                // Shift+= arrives as "+" on most layouts.
                "+" | "=" => Some(ShortcutAction::ZoomIn),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "z" | "Z" => Some(ShortcutAction::Undo),
                "y" | "Y" => Some(ShortcutAction::Redo),
                "s" | "S" => Some(ShortcutAction::Save),
                "e" | "E" => Some(ShortcutAction::Export),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ResetZoom),
                "1" => Some(ShortcutAction::FitToCanvas),
                _ => None,
            };
        }

        if modifiers.alt {
            return None;
        }

        // ── Single keys ──
        match key {
            "v" | "V" => Some(ShortcutAction::Tool(ToolKind::Select)),
            "t" | "T" => Some(ShortcutAction::Tool(ToolKind::Text)),
            "r" | "R" => Some(ShortcutAction::Tool(ToolKind::Rectangle)),
            "c" | "C" => Some(ShortcutAction::Tool(ToolKind::Circle)),
            "i" | "I" => Some(ShortcutAction::Tool(ToolKind::Image)),
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CTRL: Modifiers = Modifiers {
        ctrl: true,
        ..Modifiers::NONE
    };
    const META: Modifiers = Modifiers {
        meta: true,
        ..Modifiers::NONE
    };

    #[test]
    fn resolve_tool_shortcuts() {
        let tool = |k| ShortcutMap::resolve(k, Modifiers::NONE, false);
        assert_eq!(tool("v"), Some(ShortcutAction::Tool(ToolKind::Select)));
        assert_eq!(tool("T"), Some(ShortcutAction::Tool(ToolKind::Text)));
        assert_eq!(tool("r"), Some(ShortcutAction::Tool(ToolKind::Rectangle)));
        assert_eq!(tool("c"), Some(ShortcutAction::Tool(ToolKind::Circle)));
        assert_eq!(tool("i"), Some(ShortcutAction::Tool(ToolKind::Image)));
        assert_eq!(tool("x"), None);
    }

    #[test]
    fn resolve_undo_redo() {
        assert_eq!(ShortcutMap::resolve("z", CTRL, false), Some(ShortcutAction::Undo));
        assert_eq!(ShortcutMap::resolve("z", META, false), Some(ShortcutAction::Undo));
        let cmd_shift = Modifiers {
            shift: true,
            ..META
        };
        assert_eq!(ShortcutMap::resolve("Z", cmd_shift, false), Some(ShortcutAction::Redo));
        assert_eq!(ShortcutMap::resolve("y", CTRL, false), Some(ShortcutAction::Redo));
    }

    #[test]
    fn resolve_file_and_view() {
        assert_eq!(ShortcutMap::resolve("s", CTRL, false), Some(ShortcutAction::Save));
        assert_eq!(ShortcutMap::resolve("e", META, false), Some(ShortcutAction::Export));
        assert_eq!(ShortcutMap::resolve("=", CTRL, false), Some(ShortcutAction::ZoomIn));
        assert_eq!(ShortcutMap::resolve("-", CTRL, false), Some(ShortcutAction::ZoomOut));
        assert_eq!(ShortcutMap::resolve("0", CTRL, false), Some(ShortcutAction::ResetZoom));
        assert_eq!(ShortcutMap::resolve("1", CTRL, false), Some(ShortcutAction::FitToCanvas));
        // Bare digits do nothing.
        assert_eq!(ShortcutMap::resolve("1", Modifiers::NONE, false), None);
    }

    #[test]
    fn resolve_delete() {
        assert_eq!(
            ShortcutMap::resolve("Delete", Modifiers::NONE, false),
            Some(ShortcutAction::Delete)
        );
        assert_eq!(
            ShortcutMap::resolve("Backspace", Modifiers::NONE, false),
            Some(ShortcutAction::Delete)
        );
    }

    #[test]
    fn suppressed_in_text_fields() {
        assert_eq!(ShortcutMap::resolve("Backspace", Modifiers::NONE, true), None);
        assert_eq!(ShortcutMap::resolve("z", CTRL, true), None);
        assert_eq!(ShortcutMap::resolve("t", Modifiers::NONE, true), None);
    }
}
