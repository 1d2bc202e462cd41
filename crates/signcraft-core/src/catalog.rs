//! Template definition store.
//!
//! The builtin catalog is static JSON embedded at compile time. Templates are
//! validated once on load and immutable afterwards; lookups hand out shared
//! references in catalog order.

use crate::error::CatalogError;
use crate::template::{BackgroundPreset, Template, TemplateCategory};
use crate::validate::{self, Severity};
use serde::Deserialize;
use std::collections::HashSet;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    templates: Vec<Template>,
    #[serde(default)]
    background_presets: Vec<BackgroundPreset>,
}

#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: Vec<Template>,
    presets: Vec<BackgroundPreset>,
}

impl TemplateStore {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.templates, file.background_presets)
    }

    pub fn new(
        templates: Vec<Template>,
        presets: Vec<BackgroundPreset>,
    ) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for template in &templates {
            if !seen.insert(template.id.as_str()) {
                return Err(CatalogError::DuplicateTemplate(template.id.clone()));
            }
        }
        // A template that fails validation is dropped; the rest still load.
        let templates: Vec<Template> = templates
            .into_iter()
            .filter(|template| {
                let diags = validate::validate_template(template);
                for d in &diags {
                    match d.severity {
                        Severity::Error | Severity::Warning => {
                            log::warn!("template {} [{}]: {}", template.id, d.rule, d.message)
                        }
                        Severity::Info => {
                            log::debug!("template {} [{}]: {}", template.id, d.rule, d.message)
                        }
                    }
                }
                let valid = !validate::has_errors(&diags);
                if !valid {
                    log::error!("template {} failed validation; skipped", template.id);
                }
                valid
            })
            .collect();
        log::debug!(
            "catalog loaded: {} templates, {} background presets",
            templates.len(),
            presets.len()
        );
        Ok(Self { templates, presets })
    }

    pub fn all(&self) -> &[Template] {
        &self.templates
    }

    pub fn by_category(&self, category: TemplateCategory) -> Vec<&Template> {
        self.templates
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    pub fn by_id(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Text query and tag filter, ANDed. An empty query or empty tag list
    /// matches everything. Catalog order is preserved.
    pub fn search(&self, query: &str, tags: Option<&[&str]>) -> Vec<&Template> {
        let query = query.trim();
        self.templates
            .iter()
            .filter(|t| query.is_empty() || t.matches_query(query))
            .filter(|t| match tags {
                Some(tags) if !tags.is_empty() => tags.iter().any(|tag| t.tags.contains(*tag)),
                _ => true,
            })
            .collect()
    }

    pub fn background_presets(&self) -> &[BackgroundPreset] {
        &self.presets
    }

    pub fn background_preset(&self, id: &str) -> Option<&BackgroundPreset> {
        self.presets.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let store = TemplateStore::builtin().unwrap();
        assert!(store.all().len() >= 6);
        assert!(store.by_id("open-closed-sign").is_some());
        assert!(store.by_id("nope").is_none());
        assert!(!store.background_presets().is_empty());
    }

    #[test]
    fn builtin_templates_are_clean() {
        let store = TemplateStore::builtin().unwrap();
        for t in store.all() {
            let diags = validate::validate_template(t);
            assert!(diags.is_empty(), "{}: {diags:?}", t.id);
        }
    }

    #[test]
    fn duplicate_template_ids_are_rejected() {
        let store = TemplateStore::builtin().unwrap();
        let first = store.all()[0].clone();
        let err = TemplateStore::new(vec![first.clone(), first], vec![]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTemplate(_)));
    }

    #[test]
    fn invalid_template_is_dropped_and_the_rest_load() {
        let store = TemplateStore::builtin().unwrap();
        let good = store.all()[0].clone();
        let mut bad = store.all()[1].clone();
        bad.dimensions.width = 0.0;
        let store = TemplateStore::new(vec![bad.clone(), good.clone()], vec![]).unwrap();
        assert_eq!(store.all().len(), 1);
        assert_eq!(store.all()[0].id, good.id);
        assert!(store.by_id(&bad.id).is_none());
    }

    #[test]
    fn unknown_object_kinds_are_skipped() {
        let json = r#"{
            "templates": [{
                "id": "starry",
                "name": "Starry",
                "category": "promotional",
                "dimensions": { "width": 400, "height": 200 },
                "objects": [
                    { "id": "bg", "kind": "rectangle",
                      "geometry": { "left": 0, "top": 0, "width": 400, "height": 200 } },
                    { "id": "burst", "kind": "star",
                      "geometry": { "left": 10, "top": 10, "width": 50, "height": 50 } }
                ]
            }]
        }"#;
        let store = TemplateStore::from_json(json).unwrap();
        let t = store.by_id("starry").unwrap();
        assert_eq!(t.objects.len(), 1);
        assert_eq!(t.objects[0].id.as_str(), "bg");
    }

    #[test]
    fn malformed_known_object_is_still_an_error() {
        let json = r#"{
            "templates": [{
                "id": "broken",
                "name": "Broken",
                "category": "business",
                "dimensions": { "width": 400, "height": 200 },
                "objects": [{ "id": "t", "kind": "text",
                              "geometry": { "left": 0, "top": 0, "width": 10, "height": 10 } }]
            }]
        }"#;
        assert!(matches!(TemplateStore::from_json(json), Err(CatalogError::Malformed(_))));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            TemplateStore::from_json("{ \"templates\": 3 }"),
            Err(CatalogError::Malformed(_))
        ));
    }
}
