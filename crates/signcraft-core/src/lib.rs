pub mod catalog;
pub mod config;
pub mod css;
pub mod error;
pub mod geometry;
pub mod id;
pub mod model;
pub mod project;
pub mod template;
pub mod validate;

pub use catalog::TemplateStore;
pub use config::EditorConfig;
pub use error::{CatalogError, ParseError};
pub use geometry::{Bounds, FitMode, Size, TemplateFit};
pub use id::ObjectId;
pub use model::*;
pub use project::{Project, SavedObject};
pub use template::{
    BackgroundPreset, ColorVariation, PresetKind, Template, TemplateCategory, TextVariation,
};
