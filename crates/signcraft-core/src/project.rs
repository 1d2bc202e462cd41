//! Saved project format.
//!
//! A project is the live scene read back into drawable objects in canvas
//! space, plus the linkage the editor needs to restore it: which objects are
//! region backgrounds, and which objects were grouped together.

use crate::error::CatalogError;
use crate::geometry::TemplateFit;
use crate::id::ObjectId;
use crate::model::{Color, DrawableObject};
use serde::{Deserialize, Serialize};

pub const PROJECT_VERSION: u32 = 1;

/// One live object as saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedObject {
    #[serde(flatten)]
    pub object: DrawableObject,
    /// Set on region backgrounds: the template id of the region they fill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_object_id: Option<ObjectId>,
    /// Locked against move/scale/rotate.
    #[serde(default)]
    pub locked: bool,
    /// Objects sharing a group number were grouped on the surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<u32>,
}

impl SavedObject {
    pub fn new(object: DrawableObject) -> Self {
        Self {
            object,
            linked_object_id: None,
            locked: false,
            group: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub background_color: Color,
    /// Bottom-most first.
    #[serde(deserialize_with = "crate::model::known_objects")]
    pub objects: Vec<SavedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_fit: Option<TemplateFit>,
    pub version: u32,
    /// Milliseconds since the Unix epoch.
    pub created_at: u64,
    pub updated_at: u64,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>, width: f32, height: f32, now: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            width,
            height,
            background_color: Color::WHITE,
            objects: Vec::new(),
            template_id: None,
            template_fit: None,
            version: PROJECT_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: u64) {
        self.updated_at = now.max(self.created_at);
    }

    pub fn to_json(&self) -> Result<String, CatalogError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let project: Project = serde_json::from_str(json)?;
        if project.version > PROJECT_VERSION {
            log::warn!(
                "project {} has version {}, newer than supported {}",
                project.id,
                project.version,
                PROJECT_VERSION
            );
        }
        Ok(project)
    }
}
