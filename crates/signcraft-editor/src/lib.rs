pub mod adapter;
pub mod background;
pub mod controller;
pub mod error;
pub mod history;
pub mod images;
pub mod input;
pub mod layers;
pub mod shortcuts;
pub mod snapping;
pub mod tools;
pub mod viewport;

pub use adapter::{SceneAdapter, TemplateMetadata};
pub use controller::{CanvasEditor, EditorState};
pub use error::EditorError;
pub use images::{ImagePurpose, ImageRequest, UploadedFile};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use layers::{LayerCategory, LayerFilter, LayerKind, LayerNode};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::ToolKind;
