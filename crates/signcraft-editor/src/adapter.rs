//! Scene adapter: template objects ⇄ live surface instances.
//!
//! Template metadata (object id, role, editability) lives in a typed
//! side-table keyed by `InstanceId`, so the surface stays a pure drawing
//! model. Every live instance the editor creates has an entry; the object id
//! is the join key for variations, image swaps and saves.

use crate::images::{ImageLoader, ImagePurpose};
use serde::{Deserialize, Serialize};
use signcraft_core::config::EditorConfig;
use signcraft_core::geometry::{FitMode, Size, TemplateFit};
use signcraft_core::model::{
    Color, DrawableObject, Geometry, ImageFilter, ImagePayload, Interactivity, ObjectKind, Paint,
    PaintStyle, Stroke, TemplateRole,
};
use signcraft_core::project::SavedObject;
use signcraft_core::template::Template;
use signcraft_core::ObjectId;
use signcraft_render::{
    ControlStyle, DecodedImage, ImageContent, Instance, InstanceId, InstanceKind, Locks, Surface,
};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// ─── Metadata ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataRole {
    Template(TemplateRole),
    /// A background composited behind the region with this object id.
    RegionBackground { linked: ObjectId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub object_id: ObjectId,
    pub role: MetadataRole,
    pub is_editable: bool,
    pub is_required: bool,
    pub placeholder: Option<String>,
    /// Source of an image whose load has not completed yet.
    pub pending_src: Option<String>,
    /// Filters the pending image gets once it arrives.
    #[serde(default)]
    pub pending_filters: SmallVec<[ImageFilter; 2]>,
}

impl TemplateMetadata {
    pub fn for_object(obj: &DrawableObject) -> Self {
        Self {
            object_id: obj.id,
            role: MetadataRole::Template(obj.template_role),
            is_editable: obj.is_editable,
            is_required: obj.is_required,
            placeholder: obj.placeholder.clone(),
            pending_src: None,
            pending_filters: SmallVec::new(),
        }
    }

    /// Metadata for an object the user added.
    pub fn added(kind: &str) -> Self {
        Self {
            object_id: ObjectId::with_prefix(kind),
            role: MetadataRole::Template(TemplateRole::Decoration),
            is_editable: true,
            is_required: false,
            placeholder: None,
            pending_src: None,
            pending_filters: SmallVec::new(),
        }
    }

    pub fn background(linked: ObjectId) -> Self {
        Self {
            object_id: ObjectId::with_prefix("template-background"),
            role: MetadataRole::RegionBackground { linked },
            is_editable: false,
            is_required: false,
            placeholder: None,
            pending_src: None,
            pending_filters: SmallVec::new(),
        }
    }

    pub fn linked_region(&self) -> Option<ObjectId> {
        match self.role {
            MetadataRole::RegionBackground { linked } => Some(linked),
            MetadataRole::Template(_) => None,
        }
    }

    pub fn is_background(&self) -> bool {
        self.linked_region().is_some()
    }

    pub fn template_role(&self) -> TemplateRole {
        match self.role {
            MetadataRole::Template(role) => role,
            MetadataRole::RegionBackground { .. } => TemplateRole::Background,
        }
    }
}

// ─── Styles ──────────────────────────────────────────────────────────────

/// Dashed grey box shown while an image loads.
pub fn placeholder_paint() -> PaintStyle {
    let mut paint = PaintStyle::filled(Color::rgb8(240, 240, 240));
    paint.stroke = Some(Stroke::dashed(Color::rgb8(153, 153, 153), 2.0, 5.0, 5.0));
    paint
}

/// Red-tinted box left behind by a failed load.
pub fn failure_paint() -> PaintStyle {
    let mut paint = PaintStyle::filled(Color::rgba(1.0, 0.0, 0.0, 0.1));
    paint.stroke = Some(Stroke::dashed(Color::rgb8(220, 38, 38), 2.0, 5.0, 5.0));
    paint
}

/// Non-interactive, fully locked.
pub fn lock_instance(inst: &mut Instance) {
    inst.selectable = false;
    inst.evented = false;
    inst.locks = Locks::ALL;
}

fn scale_paint(paint: &PaintStyle, s: f32) -> PaintStyle {
    let mut out = paint.clone();
    out.fill = out.fill.map(|f| f.scaled(s, s));
    if let Some(stroke) = &mut out.stroke {
        stroke.width *= s;
        if let Some(dash) = &mut stroke.dash {
            for v in dash.iter_mut() {
                *v *= s;
            }
        }
    }
    out
}

/// Map a design-space object onto the canvas. `None` for degenerate boxes.
fn object_instance(obj: &DrawableObject, fit: &TemplateFit) -> Option<Instance> {
    let g = &obj.geometry;
    let s = fit.scale;
    let (left, top) = fit.to_canvas(g.left, g.top);
    let (w, h) = (g.width * s, g.height * s);
    let degenerate = match obj.kind {
        ObjectKind::Line => !(w > 0.0 || h > 0.0),
        _ => !(w > 0.0 && h > 0.0),
    };
    if degenerate || !left.is_finite() || !top.is_finite() {
        return None;
    }
    let mut geometry = Geometry {
        left,
        top,
        width: w,
        height: h,
        ..*g
    };
    let kind = match &obj.kind {
        ObjectKind::Text(t) => {
            let mut t = t.clone();
            t.font_size *= s;
            InstanceKind::Text(t)
        }
        ObjectKind::Rectangle => InstanceKind::Rect,
        ObjectKind::Circle => {
            let radius = w.min(h) / 2.0;
            geometry.width = radius * 2.0;
            geometry.height = radius * 2.0;
            InstanceKind::Circle { radius }
        }
        ObjectKind::Triangle => InstanceKind::Triangle,
        ObjectKind::Line => InstanceKind::Line,
        ObjectKind::Image(img) => InstanceKind::Image(ImageContent {
            src: img.src.clone(),
            natural_width: 0,
            natural_height: 0,
            filters: img.filters.clone(),
        }),
    };
    let mut inst = Instance::new(kind, geometry).with_paint(scale_paint(&obj.paint, s));
    inst.selectable = obj.interactivity.selectable;
    inst.evented = obj.interactivity.evented;
    Some(inst)
}

// ─── Adapter ─────────────────────────────────────────────────────────────

/// Serializable adapter state, captured with the surface for undo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterState {
    pub metadata: BTreeMap<InstanceId, TemplateMetadata>,
    pub template_id: Option<String>,
    pub fit: Option<TemplateFit>,
}

#[derive(Debug, Default)]
pub struct SceneAdapter {
    metadata: BTreeMap<InstanceId, TemplateMetadata>,
    template: Option<Template>,
    fit: Option<TemplateFit>,
    /// Templates loaded this session, for restoring history states.
    loaded: HashMap<String, Template>,
}

impl SceneAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn fit(&self) -> Option<TemplateFit> {
        self.fit
    }

    pub fn metadata(&self, id: InstanceId) -> Option<&TemplateMetadata> {
        self.metadata.get(&id)
    }

    pub fn metadata_mut(&mut self, id: InstanceId) -> Option<&mut TemplateMetadata> {
        self.metadata.get_mut(&id)
    }

    pub fn stamp(&mut self, id: InstanceId, meta: TemplateMetadata) {
        self.metadata.insert(id, meta);
    }

    pub fn forget(&mut self, id: InstanceId) -> Option<TemplateMetadata> {
        self.metadata.remove(&id)
    }

    /// Drop entries whose instance no longer exists.
    pub fn prune(&mut self, surface: &Surface) {
        self.metadata.retain(|id, _| surface.contains(*id));
    }

    pub fn clear(&mut self) {
        self.metadata.clear();
        self.template = None;
        self.fit = None;
    }

    pub fn state(&self) -> AdapterState {
        AdapterState {
            metadata: self.metadata.clone(),
            template_id: self.template.as_ref().map(|t| t.id.clone()),
            fit: self.fit,
        }
    }

    /// Reattach a template without instantiating it (project restore).
    pub fn set_template(&mut self, template: &Template, fit: TemplateFit) {
        self.loaded.insert(template.id.clone(), template.clone());
        self.template = Some(template.clone());
        self.fit = Some(fit);
    }

    pub fn restore_state(&mut self, state: AdapterState) {
        self.metadata = state.metadata;
        self.template = state
            .template_id
            .and_then(|id| self.loaded.get(&id).cloned());
        self.fit = state.fit;
    }

    // ─── Instantiation ───────────────────────────────────────────────────

    /// Instantiate `template` on the surface, scaled (at most
    /// `max_fit_scale`) and centered. Image objects start as dashed
    /// placeholders and queue a load on `loader`. Returns the number of
    /// objects placed.
    pub fn load_template(
        &mut self,
        surface: &mut Surface,
        template: &Template,
        clear: bool,
        config: &EditorConfig,
        loader: &mut ImageLoader,
    ) -> usize {
        if clear {
            surface.clear();
            surface.set_background(Color::WHITE);
            self.metadata.clear();
        }
        let canvas = Size::new(surface.width(), surface.height());
        let fit = TemplateFit::compute(template.dimensions, canvas, config.max_fit_scale);
        log::debug!(
            "adapter: loading {} at scale {} offset ({}, {})",
            template.id,
            fit.scale,
            fit.offset_x,
            fit.offset_y
        );

        let mut ordered: Vec<&DrawableObject> = template.objects.iter().collect();
        ordered.sort_by_key(|o| o.interactivity.z_index.unwrap_or(0));

        let mut placed = 0;
        for obj in ordered {
            let Some(mut inst) = object_instance(obj, &fit) else {
                log::warn!(
                    "adapter: skipping {} ({}): degenerate geometry",
                    obj.id,
                    obj.kind.name()
                );
                continue;
            };
            if config.force_all_interactive {
                inst.selectable = true;
                inst.evented = true;
            }
            let mut meta = TemplateMetadata::for_object(obj);
            let pending = match &obj.kind {
                ObjectKind::Image(img) => {
                    let src = img.src.clone();
                    inst.kind = InstanceKind::Rect;
                    inst.paint = PaintStyle {
                        opacity: inst.paint.opacity,
                        visible: inst.paint.visible,
                        ..placeholder_paint()
                    };
                    meta.pending_src = Some(src.clone());
                    meta.pending_filters = img.filters.clone();
                    Some(src)
                }
                _ => None,
            };
            let id = surface.add(inst);
            self.metadata.insert(id, meta);
            if let Some(src) = pending {
                loader.request(src, id, ImagePurpose::TemplateImage);
            }
            placed += 1;
        }

        self.restyle(surface);

        self.loaded.insert(template.id.clone(), template.clone());
        self.template = Some(template.clone());
        self.fit = Some(fit);
        placed
    }

    /// Default control styling on every selectable instance, then text
    /// above everything else (relative order kept).
    fn restyle(&self, surface: &mut Surface) {
        let top = surface.top_level();
        for &id in &top {
            if let Some(inst) = surface.get_mut(id)
                && inst.selectable
            {
                inst.controls = ControlStyle::default();
            }
        }
        let texts: Vec<InstanceId> = top
            .into_iter()
            .filter(|&id| surface.get(id).is_some_and(Instance::is_text))
            .collect();
        for id in texts {
            surface.bring_to_front(id);
        }
    }

    /// First live, non-background instance carrying `object_id`.
    pub fn find_by_object_id(&self, surface: &Surface, object_id: ObjectId) -> Option<InstanceId> {
        self.metadata
            .iter()
            .find(|(id, m)| m.object_id == object_id && !m.is_background() && surface.contains(**id))
            .map(|(id, _)| *id)
    }

    /// Live instances joined to `object_id`, backgrounds excluded.
    fn instances_for(&self, object_id: ObjectId) -> Vec<InstanceId> {
        self.metadata
            .iter()
            .filter(|(_, m)| m.object_id == object_id && !m.is_background())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Background instances linked to the region `object_id`.
    pub fn backgrounds_for(&self, object_id: ObjectId) -> Vec<InstanceId> {
        self.metadata
            .iter()
            .filter(|(_, m)| m.linked_region() == Some(object_id))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn all_backgrounds(&self) -> Vec<InstanceId> {
        self.metadata
            .iter()
            .filter(|(_, m)| m.is_background())
            .map(|(id, _)| *id)
            .collect()
    }

    // ─── Variations ──────────────────────────────────────────────────────

    /// Recolor every instance named by the variation. Unknown variation
    /// leaves the scene untouched.
    pub fn apply_color_variation(&self, surface: &mut Surface, template: &Template, variation_id: &str) -> bool {
        let Some(variation) = template.color_variation(variation_id) else {
            log::warn!("adapter: {} has no color variation {variation_id}", template.id);
            return false;
        };
        for (object_id, color) in &variation.colors {
            for id in self.instances_for(*object_id) {
                if let Some(inst) = surface.get_mut(id) {
                    inst.paint.fill = Some(Paint::Solid(*color));
                }
            }
        }
        true
    }

    /// Replace text content; non-text targets are ignored.
    pub fn apply_text_variation(&self, surface: &mut Surface, template: &Template, variation_id: &str) -> bool {
        let Some(variation) = template.text_variation(variation_id) else {
            log::warn!("adapter: {} has no text variation {variation_id}", template.id);
            return false;
        };
        for (object_id, text) in &variation.texts {
            for id in self.instances_for(*object_id) {
                if let Some(inst) = surface.get_mut(id)
                    && let InstanceKind::Text(payload) = &mut inst.kind
                {
                    payload.text = text.clone();
                }
            }
        }
        true
    }

    // ─── Image swap ──────────────────────────────────────────────────────

    /// Swap `target` for the loaded image, fitted into its current box with
    /// `mode`. Identity, z-position and metadata are kept. False if the
    /// target is gone.
    pub fn swap_in_image(
        &mut self,
        surface: &mut Surface,
        target: InstanceId,
        src: &str,
        image: Arc<DecodedImage>,
        mode: FitMode,
    ) -> bool {
        let Some(old) = surface.get(target) else {
            return false;
        };
        let natural = Size::new(image.width as f32, image.height as f32);
        let placed = mode.place(natural, old.local_bounds());
        let filters = self
            .metadata
            .get(&target)
            .map(|m| m.pending_filters.clone())
            .unwrap_or_default();
        let mut inst = Instance::new(
            InstanceKind::Image(ImageContent {
                src: src.to_string(),
                natural_width: image.width,
                natural_height: image.height,
                filters,
            }),
            Geometry {
                angle: old.geometry.angle,
                ..Geometry::new(placed.x, placed.y, placed.width, placed.height)
            },
        );
        inst.paint.opacity = old.paint.opacity;
        inst.paint.visible = old.paint.visible;
        inst.selectable = old.selectable;
        inst.evented = old.evented;
        inst.locks = old.locks;
        inst.controls = old.controls.clone();
        surface.cache_image(src, image);
        if !surface.replace(target, inst) {
            return false;
        }
        if let Some(meta) = self.metadata.get_mut(&target) {
            meta.pending_src = None;
            meta.pending_filters.clear();
        }
        true
    }

    // ─── Read back ───────────────────────────────────────────────────────

    /// Live instance as a design-space object (through the current fit).
    pub fn read_back(&self, surface: &Surface, id: InstanceId) -> Option<DrawableObject> {
        self.read_back_with(surface, id, &self.fit.unwrap_or(TemplateFit::IDENTITY))
    }

    fn read_back_with(&self, surface: &Surface, id: InstanceId, fit: &TemplateFit) -> Option<DrawableObject> {
        let inst = surface.get(id)?;
        let meta = self.metadata.get(&id);
        let s = if fit.scale > 0.0 { fit.scale } else { 1.0 };

        let pending = meta.and_then(|m| {
            m.pending_src.clone().map(|src| ImagePayload {
                src,
                filters: m.pending_filters.clone(),
            })
        });
        let kind = match (&inst.kind, pending) {
            (InstanceKind::Group, _) => return None,
            (_, Some(payload)) => ObjectKind::Image(payload),
            (InstanceKind::Rect, None) => ObjectKind::Rectangle,
            (InstanceKind::Circle { .. }, None) => ObjectKind::Circle,
            (InstanceKind::Triangle, None) => ObjectKind::Triangle,
            (InstanceKind::Line, None) => ObjectKind::Line,
            (InstanceKind::Text(t), None) => {
                let mut t = t.clone();
                t.font_size /= s;
                ObjectKind::Text(t)
            }
            (InstanceKind::Image(c), None) => ObjectKind::Image(ImagePayload {
                src: c.src.clone(),
                filters: c.filters.clone(),
            }),
        };

        let g = &inst.geometry;
        let (left, top) = fit.to_design(g.left, g.top);
        let geometry = Geometry {
            left,
            top,
            width: g.width / s,
            height: g.height / s,
            ..*g
        };
        let paint = if meta.is_some_and(|m| m.pending_src.is_some()) {
            PaintStyle {
                fill: None,
                stroke: None,
                ..inst.paint.clone()
            }
        } else {
            scale_paint(&inst.paint, 1.0 / s)
        };

        let object_id = meta.map(|m| m.object_id).unwrap_or_else(|| ObjectId::with_prefix(kind.name()));
        let mut obj = DrawableObject::new(object_id, kind, geometry);
        obj.paint = paint;
        obj.interactivity = Interactivity {
            selectable: inst.selectable,
            evented: inst.evented,
            z_index: None,
        };
        if let Some(m) = meta {
            obj.template_role = m.template_role();
            obj.is_editable = m.is_editable;
            obj.is_required = m.is_required;
            obj.placeholder = m.placeholder.clone();
        }
        Some(obj)
    }

    /// The live scene in paint order, canvas space, for saving.
    pub fn to_saved_objects(&self, surface: &Surface) -> Vec<SavedObject> {
        let mut groups: HashMap<InstanceId, u32> = HashMap::new();
        let mut out = Vec::new();
        for id in surface.paint_order() {
            let Some(inst) = surface.get(id) else {
                continue;
            };
            if inst.is_group() {
                let n = groups.len() as u32;
                groups.insert(id, n);
                continue;
            }
            let Some(object) = self.read_back_with(surface, id, &TemplateFit::IDENTITY) else {
                continue;
            };
            let mut saved = SavedObject::new(object);
            saved.linked_object_id = self.metadata.get(&id).and_then(TemplateMetadata::linked_region);
            saved.locked = inst.locks.any();
            saved.group = surface.parent(id).and_then(|p| groups.get(&p).copied());
            out.push(saved);
        }
        out
    }

    /// Rebuild a saved scene (canvas space). Data URI images are decoded
    /// immediately; other sources are queued on `loader`.
    pub fn restore_objects(&mut self, surface: &mut Surface, objects: &[SavedObject], loader: &mut ImageLoader) -> usize {
        surface.clear();
        self.clear();
        let mut groups: BTreeMap<u32, Vec<InstanceId>> = BTreeMap::new();
        let mut placed = 0;
        for saved in objects {
            let obj = &saved.object;
            let Some(mut inst) = object_instance(obj, &TemplateFit::IDENTITY) else {
                log::warn!("adapter: skipping saved {}: degenerate geometry", obj.id);
                continue;
            };
            if saved.locked {
                inst.locks = Locks::ALL;
            }
            let mut meta = match saved.linked_object_id {
                Some(linked) => {
                    lock_instance(&mut inst);
                    TemplateMetadata {
                        object_id: obj.id,
                        ..TemplateMetadata::background(linked)
                    }
                }
                None => TemplateMetadata::for_object(obj),
            };
            let mut queue = None;
            if let InstanceKind::Image(content) = &mut inst.kind {
                let src = content.src.clone();
                match src
                    .starts_with("data:")
                    .then(|| DecodedImage::decode_data_uri(&src))
                {
                    Some(Ok(img)) => {
                        content.natural_width = img.width;
                        content.natural_height = img.height;
                        surface.cache_image(src, Arc::new(img));
                    }
                    Some(Err(e)) => {
                        log::warn!("adapter: saved image {} failed to decode: {e}", obj.id);
                        inst.kind = InstanceKind::Rect;
                        inst.paint = failure_paint();
                    }
                    None => {
                        meta.pending_filters = content.filters.clone();
                        inst.kind = InstanceKind::Rect;
                        inst.paint = PaintStyle {
                            opacity: inst.paint.opacity,
                            visible: inst.paint.visible,
                            ..placeholder_paint()
                        };
                        meta.pending_src = Some(src.clone());
                        queue = Some(src);
                    }
                }
            }
            let id = surface.add(inst);
            self.metadata.insert(id, meta);
            if let Some(src) = queue {
                loader.request(src, id, ImagePurpose::TemplateImage);
            }
            if let Some(g) = saved.group {
                groups.entry(g).or_default().push(id);
            }
            placed += 1;
        }
        for members in groups.values() {
            surface.group(members);
        }
        placed
    }
}
