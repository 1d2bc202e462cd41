//! Input abstraction layer.
//!
//! Normalizes browser pointer, wheel and keyboard events into `InputEvent`s.
//! Pointer coordinates are in screen (viewport) space; the controller maps
//! them into canvas space before tools see them.

/// Keyboard modifier state at the time of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on Windows/Linux, ⌘ on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PointerButton {
    #[default]
    Primary,
    Middle,
    Secondary,
}

impl PointerButton {
    /// Map `MouseEvent.button`.
    pub fn from_dom(button: i16) -> Self {
        match button {
            1 => PointerButton::Middle,
            2 => PointerButton::Secondary,
            _ => PointerButton::Primary,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown {
        x: f32,
        y: f32,
        button: PointerButton,
        modifiers: Modifiers,
    },
    PointerMove {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    PointerUp {
        x: f32,
        y: f32,
        modifiers: Modifiers,
    },
    DoubleClick {
        x: f32,
        y: f32,
    },
    /// Mouse wheel; `delta_y` follows `WheelEvent.deltaY`.
    Wheel {
        x: f32,
        y: f32,
        delta_y: f32,
    },
    KeyDown {
        key: String,
        modifiers: Modifiers,
        /// Focus is in a text input; shortcuts are suppressed.
        in_text_field: bool,
    },
    KeyUp {
        key: String,
    },
}

impl InputEvent {
    /// Position if this is a pointer event.
    pub fn position(&self) -> Option<(f32, f32)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y }
            | Self::Wheel { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }

    /// Same event with its position replaced.
    #[must_use]
    pub fn with_position(&self, nx: f32, ny: f32) -> Self {
        let mut out = self.clone();
        match &mut out {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::DoubleClick { x, y }
            | Self::Wheel { x, y, .. } => {
                *x = nx;
                *y = ny;
            }
            Self::KeyDown { .. } | Self::KeyUp { .. } => {}
        }
        out
    }
}
