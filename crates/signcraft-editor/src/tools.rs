//! Tool system for canvas interactions.
//!
//! Each tool translates canvas-space input events into `Gesture`s that the
//! controller applies to the scene.
//!
//! ## Modifier behaviors
//!
//! | Modifier | Select Tool |
//! |----------|-------------|
//! | **Shift** | Toggle in/out of selection; extend marquee |

use crate::input::{InputEvent, PointerButton};
use signcraft_core::geometry::Bounds;
use signcraft_render::InstanceId;

/// The active tool determines how input events are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolKind {
    #[default]
    Select,
    Text,
    Rectangle,
    Circle,
    Image,
}

impl ToolKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "select" => Some(ToolKind::Select),
            "text" => Some(ToolKind::Text),
            "rectangle" => Some(ToolKind::Rectangle),
            "circle" => Some(ToolKind::Circle),
            "image" => Some(ToolKind::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Text => "text",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Circle => "circle",
            ToolKind::Image => "image",
        }
    }
}

/// Transform handles around the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Rotate,
}

impl Handle {
    pub const CORNERS: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    /// Distance of the rotation handle above the top edge.
    pub const ROTATE_OFFSET: f32 = 30.0;

    /// Handle position for a selection box.
    pub fn position(self, b: &Bounds) -> (f32, f32) {
        match self {
            Handle::TopLeft => (b.x, b.y),
            Handle::TopRight => (b.right(), b.y),
            Handle::BottomLeft => (b.x, b.bottom()),
            Handle::BottomRight => (b.right(), b.bottom()),
            Handle::Rotate => (b.x + b.width / 2.0, b.y - Self::ROTATE_OFFSET),
        }
    }

    /// The corner that stays put while this one is dragged.
    pub fn anchor(self, b: &Bounds) -> (f32, f32) {
        match self {
            Handle::TopLeft => (b.right(), b.bottom()),
            Handle::TopRight => (b.x, b.bottom()),
            Handle::BottomLeft => (b.right(), b.y),
            Handle::BottomRight => (b.x, b.y),
            Handle::Rotate => b.center(),
        }
    }

    /// Handle under `(x, y)`, if any, within `radius`.
    pub fn at(b: &Bounds, x: f32, y: f32, radius: f32) -> Option<Handle> {
        Self::CORNERS
            .into_iter()
            .chain(std::iter::once(Handle::Rotate))
            .find(|h| {
                let (hx, hy) = h.position(b);
                (hx - x).abs() <= radius && (hy - y).abs() <= radius
            })
    }
}

/// What the pointer is over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hit {
    pub instance: Option<InstanceId>,
    pub handle: Option<Handle>,
}

/// A semantic edit for the controller to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    /// The selection changed to this list.
    Selected(Vec<InstanceId>),
    /// A drag started; everything until `EndTransform` is one undo step.
    BeginTransform,
    Move { dx: f32, dy: f32 },
    /// Scale the selection so `handle` follows the pointer.
    Scale { handle: Handle, x: f32, y: f32 },
    /// Rotate the selection so its top faces the pointer.
    Rotate { x: f32, y: f32 },
    EndTransform,
    /// Marquee released over this box.
    Marquee(Bounds),
    /// Create an object of the tool's kind at the pointer.
    Create { kind: ToolKind, x: f32, y: f32 },
    /// Enter text editing.
    EditText(InstanceId),
}

/// Trait for tools that handle input and produce gestures.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Handle a canvas-space input event.
    fn handle(&mut self, event: &InputEvent, hit: Hit) -> Vec<Gesture>;
}

// ─── Select Tool ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drag {
    Move,
    Scale(Handle),
    Rotate,
}

#[derive(Debug, Default)]
pub struct SelectTool {
    /// Currently selected instance(s).
    pub selected: Vec<InstanceId>,
    drag: Option<Drag>,
    last_x: f32,
    last_y: f32,
    /// Set when pointer-down hits empty space. `(start_x, start_y)`.
    pub marquee_start: Option<(f32, f32)>,
    /// Current marquee rectangle, normalized. Updated during drag.
    pub marquee_rect: Option<Bounds>,
}

impl SelectTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn first_selected(&self) -> Option<InstanceId> {
        self.selected.first().copied()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    fn normalize_rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Bounds {
        Bounds::new(x1.min(x2), y1.min(y2), (x2 - x1).abs(), (y2 - y1).abs())
    }
}

impl Tool for SelectTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Select
    }

    fn handle(&mut self, event: &InputEvent, hit: Hit) -> Vec<Gesture> {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button: PointerButton::Primary,
                modifiers,
            } => {
                self.marquee_start = None;
                self.marquee_rect = None;
                self.last_x = *x;
                self.last_y = *y;

                if let Some(handle) = hit.handle
                    && !self.selected.is_empty()
                {
                    self.drag = Some(match handle {
                        Handle::Rotate => Drag::Rotate,
                        corner => Drag::Scale(corner),
                    });
                    return vec![Gesture::BeginTransform];
                }

                if let Some(hit_id) = hit.instance {
                    if modifiers.shift {
                        if let Some(pos) = self.selected.iter().position(|id| *id == hit_id) {
                            self.selected.remove(pos);
                        } else {
                            self.selected.push(hit_id);
                        }
                    } else if !self.selected.contains(&hit_id) {
                        self.selected = vec![hit_id];
                    }
                    // Clicking an already-selected instance keeps the selection for drag
                    self.drag = Some(Drag::Move);
                    vec![
                        Gesture::Selected(self.selected.clone()),
                        Gesture::BeginTransform,
                    ]
                } else {
                    if !modifiers.shift {
                        self.selected.clear();
                    }
                    self.drag = None;
                    self.marquee_start = Some((*x, *y));
                    self.marquee_rect = Some(Bounds::new(*x, *y, 0.0, 0.0));
                    vec![Gesture::Selected(self.selected.clone())]
                }
            }
            InputEvent::PointerMove { x, y, .. } => match self.drag {
                Some(Drag::Move) => {
                    let (dx, dy) = (x - self.last_x, y - self.last_y);
                    self.last_x = *x;
                    self.last_y = *y;
                    if dx == 0.0 && dy == 0.0 {
                        return vec![];
                    }
                    vec![Gesture::Move { dx, dy }]
                }
                Some(Drag::Scale(handle)) => vec![Gesture::Scale { handle, x: *x, y: *y }],
                Some(Drag::Rotate) => vec![Gesture::Rotate { x: *x, y: *y }],
                None => {
                    if let Some((sx, sy)) = self.marquee_start {
                        self.marquee_rect = Some(Self::normalize_rect(sx, sy, *x, *y));
                    }
                    vec![]
                }
            },
            InputEvent::PointerUp { .. } => {
                if self.drag.take().is_some() {
                    return vec![Gesture::EndTransform];
                }
                self.marquee_start = None;
                match self.marquee_rect.take() {
                    Some(rect) if rect.width > 2.0 || rect.height > 2.0 => vec![Gesture::Marquee(rect)],
                    _ => vec![],
                }
            }
            InputEvent::DoubleClick { .. } => match hit.instance {
                Some(id) => {
                    self.selected = vec![id];
                    vec![Gesture::EditText(id)]
                }
                None => vec![],
            },
            _ => vec![],
        }
    }
}

// ─── Create Tool ─────────────────────────────────────────────────────────

/// Text, rectangle, circle and image tools: a click creates the object at
/// the pointer.
#[derive(Debug, Clone, Copy)]
pub struct CreateTool {
    kind: ToolKind,
}

impl CreateTool {
    pub fn new(kind: ToolKind) -> Self {
        Self { kind }
    }
}

impl Tool for CreateTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    fn handle(&mut self, event: &InputEvent, _hit: Hit) -> Vec<Gesture> {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                button: PointerButton::Primary,
                ..
            } => vec![Gesture::Create {
                kind: self.kind,
                x: *x,
                y: *y,
            }],
            _ => vec![],
        }
    }
}
