//! Template definitions.
//!
//! A template is an immutable, ordered list of drawable objects in its own
//! design space, plus named color and text variations keyed by object id.

use crate::geometry::Size;
use crate::id::ObjectId;
use crate::model::{Color, DrawableObject};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Business,
    Safety,
    Directional,
    Promotional,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 4] = [
        TemplateCategory::Business,
        TemplateCategory::Safety,
        TemplateCategory::Directional,
        TemplateCategory::Promotional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::Business => "business",
            TemplateCategory::Safety => "safety",
            TemplateCategory::Directional => "directional",
            TemplateCategory::Promotional => "promotional",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

/// A named recoloring: object id → new fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorVariation {
    pub id: String,
    pub name: String,
    pub colors: BTreeMap<ObjectId, Color>,
}

/// A named rewording: text object id → new content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextVariation {
    pub id: String,
    pub name: String,
    pub texts: BTreeMap<ObjectId, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: TemplateCategory,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub dimensions: Size,
    /// Paint order is index order.
    #[serde(deserialize_with = "crate::model::known_objects")]
    pub objects: Vec<DrawableObject>,
    #[serde(default)]
    pub color_variations: Vec<ColorVariation>,
    #[serde(default)]
    pub text_variations: Vec<TextVariation>,
}

impl Template {
    pub fn object(&self, id: ObjectId) -> Option<&DrawableObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn color_variation(&self, id: &str) -> Option<&ColorVariation> {
        self.color_variations.iter().find(|v| v.id == id)
    }

    pub fn text_variation(&self, id: &str) -> Option<&TextVariation> {
        self.text_variations.iter().find(|v| v.id == id)
    }

    /// Case-insensitive substring match against name, description and tags.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.name.to_lowercase().contains(&q)
            || self.description.to_lowercase().contains(&q)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&q))
    }
}

// ─── Background presets ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetKind {
    Gradient,
    Pattern,
    Solid,
    Image,
}

/// A reusable background for a selected region. `value` is a CSS color, a
/// CSS gradient, or an image URL depending on `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundPreset {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PresetKind,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MINI: &str = r##"{
        "id": "mini",
        "name": "Mini Sign",
        "description": "A tiny sign",
        "category": "business",
        "tags": ["Hours", "store"],
        "dimensions": { "width": 100, "height": 50 },
        "objects": [
            { "id": "bg", "kind": "rectangle",
              "geometry": { "left": 0, "top": 0, "width": 100, "height": 50 },
              "paint": { "fill": "#000000" }, "templateRole": "background" },
            { "id": "label", "kind": "text", "text": "HI",
              "geometry": { "left": 10, "top": 10, "width": 80, "height": 30 } }
        ],
        "colorVariations": [
            { "id": "inverse", "name": "Inverse", "colors": { "bg": "#ffffff" } }
        ],
        "textVariations": [
            { "id": "bye", "name": "Bye", "texts": { "label": "BYE" } }
        ]
    }"##;

    #[test]
    fn template_from_json() {
        let t: Template = serde_json::from_str(MINI).unwrap();
        assert_eq!(t.category, TemplateCategory::Business);
        assert_eq!(t.objects.len(), 2);
        let v = t.color_variation("inverse").unwrap();
        assert_eq!(v.colors[&ObjectId::intern("bg")], Color::WHITE);
        assert_eq!(t.text_variation("bye").unwrap().texts.len(), 1);
        assert!(t.color_variation("missing").is_none());
        assert!(t.object(ObjectId::intern("label")).unwrap().is_text());
    }

    #[test]
    fn query_is_case_insensitive_over_tags() {
        let t: Template = serde_json::from_str(MINI).unwrap();
        assert!(t.matches_query("hours"));
        assert!(t.matches_query("TINY"));
        assert!(!t.matches_query("parking"));
    }

    #[test]
    fn category_parse() {
        assert_eq!(TemplateCategory::parse("Safety"), Some(TemplateCategory::Safety));
        assert_eq!(TemplateCategory::parse("misc"), None);
    }
}
