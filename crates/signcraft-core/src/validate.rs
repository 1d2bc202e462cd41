//! Template validation diagnostics.
//!
//! Reports structural issues without modifying the template. The catalog
//! runs this on load and logs every finding; templates with an `Error`
//! finding are rejected.

use crate::id::ObjectId;
use crate::template::Template;
use std::collections::HashSet;

// ─── Diagnostic types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational.
    Info,
    /// Likely a mistake; the template still loads.
    Warning,
    /// The template cannot be instantiated safely.
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The object this diagnostic refers to, if any.
    pub object_id: Option<ObjectId>,
    pub message: String,
    pub severity: Severity,
    /// Short rule identifier (e.g. "duplicate-id").
    pub rule: &'static str,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Run every rule over a template.
#[must_use]
pub fn validate_template(template: &Template) -> Vec<Diagnostic> {
    let mut diags = Vec::new();
    check_dimensions(template, &mut diags);
    check_duplicate_ids(template, &mut diags);
    check_variation_targets(template, &mut diags);
    check_object_bounds(template, &mut diags);
    diags
}

/// True when any diagnostic is an error.
pub fn has_errors(diags: &[Diagnostic]) -> bool {
    diags.iter().any(|d| d.severity == Severity::Error)
}

// ─── Rules ────────────────────────────────────────────────────────────────

fn check_dimensions(template: &Template, diags: &mut Vec<Diagnostic>) {
    if template.dimensions.is_empty() {
        diags.push(Diagnostic {
            object_id: None,
            message: format!(
                "Template dimensions {}×{} must be positive.",
                template.dimensions.width, template.dimensions.height
            ),
            severity: Severity::Error,
            rule: "bad-dimensions",
        });
    }
}

fn check_duplicate_ids(template: &Template, diags: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    for obj in &template.objects {
        if !seen.insert(obj.id) {
            diags.push(Diagnostic {
                object_id: Some(obj.id),
                message: format!("Object id `{}` is used more than once.", obj.id),
                severity: Severity::Error,
                rule: "duplicate-id",
            });
        }
    }
}

fn check_variation_targets(template: &Template, diags: &mut Vec<Diagnostic>) {
    for variation in &template.color_variations {
        for id in variation.colors.keys() {
            if template.object(*id).is_none() {
                diags.push(Diagnostic {
                    object_id: Some(*id),
                    message: format!(
                        "Color variation `{}` targets unknown object `{id}`.",
                        variation.id
                    ),
                    severity: Severity::Warning,
                    rule: "unknown-variation-target",
                });
            }
        }
    }

    for variation in &template.text_variations {
        for id in variation.texts.keys() {
            let (message, rule) = match template.object(*id) {
                None => (
                    format!(
                        "Text variation `{}` targets unknown object `{id}`.",
                        variation.id
                    ),
                    "unknown-variation-target",
                ),
                Some(obj) if !obj.is_text() => (
                    format!(
                        "Text variation `{}` targets `{id}`, which is a {}.",
                        variation.id,
                        obj.kind.name()
                    ),
                    "text-variation-non-text",
                ),
                Some(_) => continue,
            };
            diags.push(Diagnostic {
                object_id: Some(*id),
                message,
                severity: Severity::Warning,
                rule,
            });
        }
    }
}

/// Objects wholly outside the design area are almost always typos.
fn check_object_bounds(template: &Template, diags: &mut Vec<Diagnostic>) {
    let (tw, th) = (template.dimensions.width, template.dimensions.height);
    for obj in &template.objects {
        let g = &obj.geometry;
        let outside = g.left >= tw
            || g.top >= th
            || g.left + g.scaled_width() <= 0.0
            || g.top + g.scaled_height() <= 0.0;
        if outside {
            diags.push(Diagnostic {
                object_id: Some(obj.id),
                message: format!("Object `{}` lies outside the template area.", obj.id),
                severity: Severity::Info,
                rule: "outside-template",
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::model::{Color, DrawableObject, Geometry, ObjectKind, TextPayload};
    use crate::template::{ColorVariation, TemplateCategory, TextVariation};
    use std::collections::{BTreeMap, BTreeSet};

    fn template(objects: Vec<DrawableObject>) -> Template {
        Template {
            id: "t".into(),
            name: "T".into(),
            description: String::new(),
            category: TemplateCategory::Business,
            tags: BTreeSet::new(),
            dimensions: Size::new(100.0, 100.0),
            objects,
            color_variations: Vec::new(),
            text_variations: Vec::new(),
        }
    }

    fn rect(id: &str) -> DrawableObject {
        DrawableObject::new(
            ObjectId::intern(id),
            ObjectKind::Rectangle,
            Geometry::new(0.0, 0.0, 10.0, 10.0),
        )
    }

    #[test]
    fn clean_template_has_no_findings() {
        assert!(validate_template(&template(vec![rect("a"), rect("b")])).is_empty());
    }

    #[test]
    fn duplicate_ids_are_errors() {
        let diags = validate_template(&template(vec![rect("dup"), rect("dup")]));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, "duplicate-id");
        assert!(has_errors(&diags));
    }

    #[test]
    fn variation_targets_are_checked() {
        let mut t = template(vec![
            rect("box"),
            DrawableObject::new(
                ObjectId::intern("label"),
                ObjectKind::Text(TextPayload::new("x")),
                Geometry::new(0.0, 0.0, 10.0, 10.0),
            ),
        ]);
        t.color_variations.push(ColorVariation {
            id: "c".into(),
            name: "C".into(),
            colors: BTreeMap::from([(ObjectId::intern("ghost"), Color::BLACK)]),
        });
        t.text_variations.push(TextVariation {
            id: "t".into(),
            name: "T".into(),
            texts: BTreeMap::from([
                (ObjectId::intern("box"), "nope".to_string()),
                (ObjectId::intern("label"), "ok".to_string()),
            ]),
        });
        let rules: Vec<_> = validate_template(&t).iter().map(|d| d.rule).collect();
        assert!(rules.contains(&"unknown-variation-target"));
        assert!(rules.contains(&"text-variation-non-text"));
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn zero_dimensions_are_errors() {
        let mut t = template(vec![]);
        t.dimensions = Size::new(0.0, 100.0);
        assert!(has_errors(&validate_template(&t)));
    }
}
