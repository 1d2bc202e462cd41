//! Canvas editing controller.
//!
//! Owns one scene and everything that edits it: the adapter, the background
//! service, the tools, the viewport and the history. Every public edit is a
//! single undo step; drags are batched.
//!
//! State machine: `Idle ↔ Selected(n) ↔ EditingText`. Clicking empty canvas
//! goes idle, clicking an object makes it the sole selection, double-clicking
//! text starts editing, and any other interaction commits the edit first.

use crate::adapter::{AdapterState, SceneAdapter, TemplateMetadata, placeholder_paint};
use crate::background::BackgroundService;
use crate::error::EditorError;
use crate::history::{self, History};
use crate::images::{ImageLoader, ImagePurpose, ImageRequest, UploadedFile};
use crate::input::{InputEvent, PointerButton};
use crate::layers::{self, LayerFilter, LayerNode};
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use crate::snapping::{Guide, alignment_guides, snap_rotation};
use crate::tools::{CreateTool, Gesture, Handle, Hit, SelectTool, Tool, ToolKind};
use crate::viewport::{Debouncer, Viewport};
use serde::{Deserialize, Serialize};
use signcraft_core::geometry::{Bounds, FitMode, Size};
use signcraft_core::model::{Color, Geometry, ImageFilter, Paint, PaintStyle, Stroke, TextPayload};
use signcraft_core::project::Project;
use signcraft_core::template::{BackgroundPreset, Template};
use signcraft_core::{EditorConfig, ObjectId};
use signcraft_render::{
    ControlStyle, DecodedImage, ImageContent, Instance, InstanceId, InstanceKind, Surface,
    SurfaceSnapshot, export_png_data_url, hit_test, hit_test_rect,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Where the selection state machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    Selected(usize),
    EditingText(InstanceId),
}

/// Everything undo needs to put back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SceneState {
    surface: SurfaceSnapshot,
    adapter: AdapterState,
}

/// Selection geometry captured when a drag starts.
#[derive(Debug, Clone)]
struct TransformStart {
    bounds: Bounds,
    geometries: HashMap<InstanceId, Geometry>,
}

pub type SaveCallback = Box<dyn FnMut(&Project)>;

pub struct CanvasEditor {
    config: EditorConfig,
    surface: Option<Surface>,
    adapter: SceneAdapter,
    backgrounds: BackgroundService,
    loader: ImageLoader,
    history: History,
    viewport: Viewport,
    wheel_render: Debouncer,
    mutation_render: Debouncer,
    clock_ms: u64,

    select: SelectTool,
    tool: ToolKind,
    editing_text: Option<InstanceId>,
    guides: Vec<Guide>,
    transform: Option<TransformStart>,
    /// Last screen position while panning.
    pan: Option<(f32, f32)>,
    space_held: bool,

    project_id: String,
    project_name: String,
    created_at: u64,
    on_save: Option<SaveCallback>,
}

impl CanvasEditor {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            backgrounds: BackgroundService::new(&config),
            history: History::new(config.history_depth),
            viewport: Viewport::new(config.canvas_size, &config),
            wheel_render: Debouncer::new(config.wheel_debounce_ms),
            mutation_render: Debouncer::new(config.mutation_debounce_ms),
            config,
            surface: None,
            adapter: SceneAdapter::new(),
            loader: ImageLoader::new(),
            clock_ms: 0,
            select: SelectTool::new(),
            tool: ToolKind::Select,
            editing_text: None,
            guides: Vec::new(),
            transform: None,
            pan: None,
            space_held: false,
            project_id: "project".into(),
            project_name: "Untitled".into(),
            created_at: 0,
            on_save: None,
        }
    }

    /// Create the drawing surface. Until this runs every edit fails with
    /// `CanvasNotReady`.
    pub fn init_canvas(&mut self, width: f32, height: f32) {
        let mut surface = Surface::new(width, height);
        surface.set_background(Color::WHITE);
        self.surface = Some(surface);
        self.viewport.size = Size::new(width, height);
        self.viewport.reset();
        self.history.clear();
        log::debug!("editor: canvas ready ({width}×{height})");
    }

    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn adapter(&self) -> &SceneAdapter {
        &self.adapter
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn guides(&self) -> &[Guide] {
        &self.guides
    }

    pub fn marquee(&self) -> Option<Bounds> {
        self.select.marquee_rect
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.commit_text_edit();
        self.tool = tool;
    }

    pub fn set_project_info(&mut self, id: impl Into<String>, name: impl Into<String>, created_at: u64) {
        self.project_id = id.into();
        self.project_name = name.into();
        self.created_at = created_at;
    }

    pub fn set_on_save(&mut self, callback: SaveCallback) {
        self.on_save = Some(callback);
    }

    // ─── History plumbing ────────────────────────────────────────────────

    fn capture(&self) -> Option<Vec<u8>> {
        let surface = self.surface.as_ref()?;
        history::encode(&SceneState {
            surface: surface.snapshot(),
            adapter: self.adapter.state(),
        })
    }

    fn surface_mut(&mut self) -> Result<&mut Surface, EditorError> {
        self.surface.as_mut().ok_or(EditorError::CanvasNotReady)
    }

    /// Run one undoable edit. Errors leave the scene as it was.
    fn edit<R>(
        &mut self,
        description: &str,
        f: impl FnOnce(&mut Self) -> Result<R, EditorError>,
    ) -> Result<R, EditorError> {
        let before = self.capture().ok_or(EditorError::CanvasNotReady)?;
        let out = f(self)?;
        if let Some(after) = self.capture() {
            self.history.record(before, after, description);
        }
        self.mutation_render.schedule(self.clock_ms);
        Ok(out)
    }

    fn restore_scene(&mut self, bytes: &[u8]) -> bool {
        let Some(state) = history::decode::<SceneState>(bytes) else {
            return false;
        };
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        surface.restore(&state.surface);
        self.adapter.restore_state(state.adapter);
        self.editing_text = None;
        self.guides.clear();
        self.select.selected.retain(|id| surface.contains(*id));
        self.mutation_render.schedule(self.clock_ms);
        true
    }

    pub fn undo(&mut self) -> bool {
        self.commit_text_edit();
        let Some(bytes) = self.history.undo().map(|c| c.before.clone()) else {
            return false;
        };
        self.restore_scene(&bytes)
    }

    pub fn redo(&mut self) -> bool {
        self.commit_text_edit();
        let Some(bytes) = self.history.redo().map(|c| c.after.clone()) else {
            return false;
        };
        self.restore_scene(&bytes)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── Templates ───────────────────────────────────────────────────────

    pub fn load_template(&mut self, template: &Template, clear: bool) -> Result<usize, EditorError> {
        self.commit_text_edit();
        self.edit("load template", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            let placed = ed
                .adapter
                .load_template(surface, template, clear, &ed.config, &mut ed.loader);
            ed.select.selected.clear();
            Ok(placed)
        })
    }

    pub fn apply_color_variation(&mut self, variation_id: &str) -> Result<bool, EditorError> {
        let Some(template) = self.adapter.template().cloned() else {
            log::warn!("editor: no template loaded for color variation {variation_id}");
            return Ok(false);
        };
        self.edit("color variation", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            Ok(ed.adapter.apply_color_variation(surface, &template, variation_id))
        })
    }

    pub fn apply_text_variation(&mut self, variation_id: &str) -> Result<bool, EditorError> {
        let Some(template) = self.adapter.template().cloned() else {
            log::warn!("editor: no template loaded for text variation {variation_id}");
            return Ok(false);
        };
        self.commit_text_edit();
        self.edit("text variation", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            Ok(ed.adapter.apply_text_variation(surface, &template, variation_id))
        })
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn state(&self) -> EditorState {
        match (self.editing_text, self.select.selected.len()) {
            (Some(id), _) => EditorState::EditingText(id),
            (None, 0) => EditorState::Idle,
            (None, n) => EditorState::Selected(n),
        }
    }

    pub fn selection(&self) -> &[InstanceId] {
        &self.select.selected
    }

    /// Replace the selection. Unknown or locked instances are dropped.
    pub fn select(&mut self, ids: &[InstanceId]) {
        self.commit_text_edit();
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        self.select.selected = ids
            .iter()
            .copied()
            .filter(|id| surface.get(*id).is_some_and(|i| i.selectable))
            .collect();
    }

    /// Add to the selection (layer panel multi-select).
    pub fn extend_selection(&mut self, id: InstanceId) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        if surface.get(id).is_some_and(|i| i.selectable) && !self.select.selected.contains(&id) {
            self.select.selected.push(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.commit_text_edit();
        self.select.selected.clear();
    }

    pub fn selection_bounds(&self) -> Option<Bounds> {
        let surface = self.surface.as_ref()?;
        Bounds::union_all(self.select.selected.iter().filter_map(|&id| surface.bounds(id)))
    }

    fn require_selection(&self) -> Result<Vec<InstanceId>, EditorError> {
        if self.surface.is_none() {
            return Err(EditorError::CanvasNotReady);
        }
        if self.select.selected.is_empty() {
            return Err(EditorError::NoSelection);
        }
        Ok(self.select.selected.clone())
    }

    pub fn editing_text(&self) -> Option<InstanceId> {
        self.editing_text
    }

    pub fn begin_text_edit(&mut self, id: InstanceId) -> bool {
        let is_text = self
            .surface
            .as_ref()
            .and_then(|s| s.get(id))
            .is_some_and(Instance::is_text);
        if is_text {
            self.select.selected = vec![id];
            self.editing_text = Some(id);
            log::debug!("editor: editing text {id:?}");
        }
        is_text
    }

    pub fn commit_text_edit(&mut self) {
        if let Some(id) = self.editing_text.take() {
            log::debug!("editor: committed text {id:?}");
        }
    }

    // ─── Adding objects ──────────────────────────────────────────────────

    fn insert_new(&mut self, inst: Instance, meta: TemplateMetadata) -> Result<InstanceId, EditorError> {
        let surface = self.surface_mut()?;
        let id = surface.add(inst);
        self.adapter.stamp(id, meta);
        self.select.selected = vec![id];
        Ok(id)
    }

    fn shape_at(&self, kind: ToolKind, x: f32, y: f32) -> Instance {
        let size = self.config.default_shape_size;
        match kind {
            ToolKind::Text => {
                let mut payload = TextPayload::new("New Text");
                payload.font_size = self.config.default_font_size;
                Instance::new(
                    InstanceKind::Text(payload),
                    Geometry::new(x, y, size * 2.0, self.config.default_font_size * 1.2),
                )
                .with_paint(PaintStyle::filled(Color::BLACK))
            }
            ToolKind::Rectangle | ToolKind::Select => Instance::new(InstanceKind::Rect, Geometry::new(x, y, size, size))
                .with_paint(PaintStyle::filled(Color::rgb8(59, 130, 246))),
            ToolKind::Circle => Instance::new(
                InstanceKind::Circle { radius: size / 2.0 },
                Geometry::new(x, y, size, size),
            )
            .with_paint(PaintStyle::filled(Color::rgb8(239, 68, 68))),
            ToolKind::Image => {
                let s = self.config.default_image_size;
                Instance::new(InstanceKind::Rect, Geometry::new(x, y, s.width, s.height))
                    .with_paint(placeholder_paint())
            }
        }
    }

    fn add_kind_at(&mut self, kind: ToolKind, x: f32, y: f32) -> Result<InstanceId, EditorError> {
        let inst = self.shape_at(kind, x, y);
        let mut meta = TemplateMetadata::added(match kind {
            ToolKind::Text => "text",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Circle => "circle",
            _ => "image",
        });
        if kind == ToolKind::Image {
            meta.placeholder = Some("Click to add image".into());
        }
        self.edit("add", |ed| ed.insert_new(inst, meta))
    }

    pub fn add_text(&mut self) -> Result<InstanceId, EditorError> {
        let (x, y) = self.config.insert_at;
        self.add_kind_at(ToolKind::Text, x, y)
    }

    pub fn add_rectangle(&mut self) -> Result<InstanceId, EditorError> {
        let (x, y) = self.config.insert_at;
        self.add_kind_at(ToolKind::Rectangle, x, y)
    }

    pub fn add_circle(&mut self) -> Result<InstanceId, EditorError> {
        let (x, y) = self.config.insert_at;
        self.add_kind_at(ToolKind::Circle, x, y)
    }

    pub fn add_triangle(&mut self) -> Result<InstanceId, EditorError> {
        let (x, y) = self.config.insert_at;
        let size = self.config.default_shape_size;
        let inst = Instance::new(InstanceKind::Triangle, Geometry::new(x, y, size, size))
            .with_paint(PaintStyle::filled(Color::rgb8(34, 197, 94)));
        self.edit("add", |ed| ed.insert_new(inst, TemplateMetadata::added("triangle")))
    }

    pub fn add_line(&mut self) -> Result<InstanceId, EditorError> {
        let (x, y) = self.config.insert_at;
        let size = self.config.default_shape_size;
        let mut paint = PaintStyle::default();
        paint.stroke = Some(Stroke::solid(Color::BLACK, 2.0));
        let inst = Instance::new(InstanceKind::Line, Geometry::new(x, y, size * 2.0, 0.0)).with_paint(paint);
        self.edit("add", |ed| ed.insert_new(inst, TemplateMetadata::added("line")))
    }

    /// Add an image at the default location. Without a file this is a
    /// labeled placeholder.
    pub fn add_image(&mut self, file: Option<&UploadedFile>) -> Result<InstanceId, EditorError> {
        let Some(file) = file else {
            let (x, y) = self.config.insert_at;
            return self.add_kind_at(ToolKind::Image, x, y);
        };
        let image = file.load(self.config.max_upload_bytes)?;
        let (x, y) = self.config.insert_at;
        let s = self.config.default_image_size;
        let placed = FitMode::Contain.place(
            Size::new(image.width as f32, image.height as f32),
            Bounds::new(x, y, s.width, s.height),
        );
        let src = file.data_uri();
        let inst = Instance::new(
            InstanceKind::Image(ImageContent {
                src: src.clone(),
                natural_width: image.width,
                natural_height: image.height,
                filters: Default::default(),
            }),
            Geometry::new(x, y, placed.width, placed.height),
        );
        self.edit("add image", |ed| {
            ed.surface_mut()?.cache_image(src, Arc::new(image));
            ed.insert_new(inst, TemplateMetadata::added("image"))
        })
    }

    /// Swap the image of the object `object_id` for `file`, keeping its
    /// position, rotation, z-order and template metadata. The image is
    /// scaled to fit the old box.
    pub fn replace_image(&mut self, object_id: ObjectId, file: &UploadedFile) -> Result<InstanceId, EditorError> {
        let surface = self.surface.as_ref().ok_or(EditorError::CanvasNotReady)?;
        let Some(target) = self.adapter.find_by_object_id(surface, object_id) else {
            log::warn!("editor: replace_image: no instance for {object_id}");
            return Err(EditorError::ObjectNotFound(object_id));
        };
        let image = file.load(self.config.max_upload_bytes)?;
        let src = file.data_uri();
        self.edit("replace image", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            let old = surface
                .get(target)
                .cloned()
                .ok_or(EditorError::ObjectNotFound(object_id))?;
            let (tw, th) = (old.geometry.scaled_width(), old.geometry.scaled_height());
            let (iw, ih) = (image.width as f32, image.height as f32);
            let s = if iw > 0.0 && ih > 0.0 { (tw / iw).min(th / ih) } else { 1.0 };
            let filters = match &old.kind {
                InstanceKind::Image(c) => c.filters.clone(),
                _ => ed
                    .adapter
                    .metadata(target)
                    .map(|m| m.pending_filters.clone())
                    .unwrap_or_default(),
            };
            let mut inst = Instance::new(
                InstanceKind::Image(ImageContent {
                    src: src.clone(),
                    natural_width: image.width,
                    natural_height: image.height,
                    filters,
                }),
                Geometry {
                    left: old.geometry.left,
                    top: old.geometry.top,
                    width: iw * s,
                    height: ih * s,
                    angle: old.geometry.angle,
                    scale_x: 1.0,
                    scale_y: 1.0,
                },
            );
            inst.paint.opacity = old.paint.opacity;
            inst.paint.visible = old.paint.visible;
            inst.selectable = old.selectable;
            inst.evented = old.evented;
            inst.locks = old.locks;
            inst.controls = old.controls;
            if !surface.replace(target, inst) {
                log::warn!("editor: replace_image: {object_id} cannot hold an image");
                return Err(EditorError::ObjectNotFound(object_id));
            }
            surface.cache_image(src, Arc::new(image));
            if let Some(meta) = ed.adapter.metadata_mut(target) {
                meta.pending_src = None;
                meta.pending_filters.clear();
            }
            Ok(target)
        })
    }

    /// Delete the selection. Required template objects are kept; a region's
    /// background goes with it.
    pub fn delete_selected(&mut self) -> Result<usize, EditorError> {
        let selected = self.require_selection()?;
        let surface = self.surface.as_ref().ok_or(EditorError::CanvasNotReady)?;
        // A group is as required as anything inside it.
        let required_in = |id: InstanceId| {
            surface
                .paint_order()
                .into_iter()
                .filter(|x| surface.is_within(*x, id))
                .find_map(|x| self.adapter.metadata(x).filter(|m| m.is_required).map(|m| m.object_id))
        };
        let mut deletable = Vec::new();
        let mut required = Vec::new();
        let mut first_required = None;
        for id in selected {
            match required_in(id) {
                Some(object_id) => {
                    log::warn!("editor: {id:?} holds required {object_id}; not deleting");
                    first_required.get_or_insert(object_id);
                    required.push(id);
                }
                None => deletable.push(id),
            }
        }
        if deletable.is_empty() {
            return Err(first_required.map_or(EditorError::NoSelection, EditorError::RequiredObject));
        }
        self.editing_text = None;
        self.edit("delete", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            let mut removed = 0;
            for id in &deletable {
                if let Some(object_id) = ed.adapter.metadata(*id).map(|m| m.object_id) {
                    for bg in ed.adapter.backgrounds_for(object_id) {
                        surface.remove(bg);
                    }
                }
                if surface.remove(*id).is_some() {
                    removed += 1;
                }
            }
            ed.adapter.prune(surface);
            ed.select.selected = required.clone();
            Ok(removed)
        })
    }

    // ─── Styling ─────────────────────────────────────────────────────────

    fn modify_selected(&mut self, description: &str, mut f: impl FnMut(&mut Instance)) -> Result<(), EditorError> {
        let selected = self.require_selection()?;
        self.edit(description, |ed| {
            let surface = ed.surface_mut()?;
            for id in selected {
                if let Some(inst) = surface.get_mut(id) {
                    f(inst);
                }
            }
            Ok(())
        })
    }

    pub fn set_fill(&mut self, color: Color) -> Result<(), EditorError> {
        self.modify_selected("fill", |inst| inst.paint.fill = Some(Paint::Solid(color)))
    }

    pub fn set_stroke(&mut self, stroke: Option<Stroke>) -> Result<(), EditorError> {
        self.modify_selected("stroke", |inst| inst.paint.stroke = stroke.clone())
    }

    pub fn set_opacity(&mut self, opacity: f32) -> Result<(), EditorError> {
        let opacity = opacity.clamp(0.0, 1.0);
        self.modify_selected("opacity", |inst| inst.paint.opacity = opacity)
    }

    /// Replace the text of the edited (or selected) text instances.
    pub fn set_text(&mut self, text: &str) -> Result<(), EditorError> {
        self.modify_selected("text", |inst| {
            if let InstanceKind::Text(t) = &mut inst.kind {
                t.text = text.to_string();
            }
        })
    }

    pub fn set_font_size(&mut self, size: f32) -> Result<(), EditorError> {
        self.modify_selected("font size", |inst| {
            if let InstanceKind::Text(t) = &mut inst.kind {
                t.font_size = size.max(1.0);
            }
        })
    }

    pub fn set_font_family(&mut self, family: &str) -> Result<(), EditorError> {
        self.modify_selected("font family", |inst| {
            if let InstanceKind::Text(t) = &mut inst.kind {
                t.font_family = family.to_string();
            }
        })
    }

    pub fn set_image_filters(&mut self, filters: &[ImageFilter]) -> Result<(), EditorError> {
        self.modify_selected("filters", |inst| {
            if let InstanceKind::Image(c) = &mut inst.kind {
                c.filters = filters.iter().copied().collect();
            }
        })
    }

    pub fn set_background_color(&mut self, color: Color) -> Result<(), EditorError> {
        self.edit("background color", |ed| {
            ed.surface_mut()?.set_background(color);
            Ok(())
        })
    }

    // ─── Z-order & grouping ──────────────────────────────────────────────

    fn reorder_selected(&mut self, description: &str, f: fn(&mut Surface, InstanceId) -> bool) -> Result<(), EditorError> {
        let mut selected = self.require_selection()?;
        self.edit(description, |ed| {
            let surface = ed.surface_mut()?;
            // Bottom first so relative order survives.
            selected.sort_by_key(|id| surface.position(*id));
            for id in selected {
                f(surface, id);
            }
            Ok(())
        })
    }

    pub fn bring_forward(&mut self) -> Result<(), EditorError> {
        self.reorder_selected("bring forward", Surface::bring_forward)
    }

    pub fn send_backward(&mut self) -> Result<(), EditorError> {
        self.reorder_selected("send backward", Surface::send_backward)
    }

    pub fn bring_to_front(&mut self) -> Result<(), EditorError> {
        self.reorder_selected("bring to front", Surface::bring_to_front)
    }

    pub fn send_to_back(&mut self) -> Result<(), EditorError> {
        let mut selected = self.require_selection()?;
        self.edit("send to back", |ed| {
            let surface = ed.surface_mut()?;
            // Top first, each goes under the previous one.
            selected.sort_by_key(|id| std::cmp::Reverse(surface.position(*id)));
            for id in selected {
                surface.send_to_back(id);
            }
            Ok(())
        })
    }

    pub fn group_selected(&mut self) -> Result<InstanceId, EditorError> {
        let selected = self.require_selection()?;
        self.edit("group", |ed| {
            let surface = ed.surface_mut()?;
            let id = surface.group(&selected).ok_or(EditorError::NoSelection)?;
            ed.adapter.stamp(id, TemplateMetadata::added("group"));
            ed.select.selected = vec![id];
            Ok(id)
        })
    }

    pub fn ungroup_selected(&mut self) -> Result<Vec<InstanceId>, EditorError> {
        let selected = self.require_selection()?;
        self.edit("ungroup", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            let mut freed = Vec::new();
            for id in selected {
                freed.extend(surface.ungroup(id));
            }
            ed.adapter.prune(surface);
            ed.select.selected = freed.clone();
            Ok(freed)
        })
    }

    // ─── Backgrounds ─────────────────────────────────────────────────────

    pub fn apply_background_preset(&mut self, preset: &BackgroundPreset) -> Result<InstanceId, EditorError> {
        let region = self.require_selection()?.first().copied();
        self.edit("background", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            ed.backgrounds
                .apply_preset(surface, &mut ed.adapter, &mut ed.loader, region, preset)
        })
    }

    pub fn apply_background_image(&mut self, file: &UploadedFile, mode: FitMode) -> Result<InstanceId, EditorError> {
        let region = self.require_selection()?.first().copied();
        file.validate(self.config.max_upload_bytes)?;
        self.edit("background image", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            ed.backgrounds.apply_image(surface, &mut ed.adapter, region, file, mode)
        })
    }

    pub fn remove_background(&mut self) -> Result<usize, EditorError> {
        let region = self.require_selection()?.first().copied();
        self.edit("remove background", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            ed.backgrounds.remove_for(surface, &mut ed.adapter, region)
        })
    }

    pub fn remove_all_backgrounds(&mut self) -> Result<usize, EditorError> {
        self.edit("remove backgrounds", |ed| {
            let surface = ed.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
            Ok(ed.backgrounds.remove_all(surface, &mut ed.adapter))
        })
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    pub fn layers(&self) -> Vec<LayerNode> {
        self.surface.as_ref().map(layers::objects_to_layers).unwrap_or_default()
    }

    pub fn filtered_layers(&self, filter: &LayerFilter) -> Vec<LayerNode> {
        layers::filter_layers(&self.layers(), filter)
    }

    /// Move a layer and commit the new order to the surface.
    pub fn reorder_layer(&mut self, id: InstanceId, parent: Option<InstanceId>, index: usize) -> Result<bool, EditorError> {
        let Some(tree) = layers::reorder_layers(&self.layers(), id, parent, index) else {
            return Ok(false);
        };
        self.edit("reorder layers", |ed| {
            layers::apply_layer_order(ed.surface_mut()?, &tree);
            Ok(true)
        })
    }

    pub fn set_layer_visible(&mut self, id: InstanceId, visible: bool) -> Result<bool, EditorError> {
        self.edit("visibility", |ed| Ok(layers::set_layer_visible(ed.surface_mut()?, id, visible)))
    }

    pub fn set_layer_locked(&mut self, id: InstanceId, locked: bool) -> Result<bool, EditorError> {
        let done = self.edit("lock", |ed| Ok(layers::set_layer_locked(ed.surface_mut()?, id, locked)))?;
        if locked {
            self.select.selected.retain(|s| *s != id);
        }
        Ok(done)
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn zoom(&self) -> f32 {
        self.viewport.zoom
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.wheel_render.schedule(self.clock_ms);
        self.viewport.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.wheel_render.schedule(self.clock_ms);
        self.viewport.zoom_out()
    }

    pub fn reset_zoom(&mut self) {
        self.wheel_render.schedule(self.clock_ms);
        self.viewport.reset();
    }

    /// Zoom so every visible top-level instance fits, centered.
    pub fn fit_to_canvas(&mut self) -> bool {
        let Some(surface) = self.surface.as_ref() else {
            return false;
        };
        let content = Bounds::union_all(
            surface
                .top_level()
                .into_iter()
                .filter(|id| surface.get(*id).is_some_and(|i| i.paint.visible))
                .filter_map(|id| surface.bounds(id)),
        )
        .unwrap_or_else(|| Bounds::new(0.0, 0.0, surface.width(), surface.height()));
        self.wheel_render.schedule(self.clock_ms);
        self.viewport.fit_to_content(content)
    }

    /// True once per debounced burst of view or scene changes.
    pub fn poll_render(&mut self, now_ms: u64) -> bool {
        self.clock_ms = self.clock_ms.max(now_ms);
        let wheel = self.wheel_render.poll(now_ms);
        let mutation = self.mutation_render.poll(now_ms);
        wheel || mutation
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Route a screen-space input event. Returns the shortcut that fired,
    /// if any; `Export` is left for the host to act on.
    pub fn handle_input(&mut self, event: &InputEvent, now_ms: u64) -> Option<ShortcutAction> {
        self.clock_ms = self.clock_ms.max(now_ms);
        match event {
            InputEvent::KeyDown {
                key,
                modifiers,
                in_text_field,
            } => {
                if key == " " && !in_text_field {
                    self.space_held = true;
                }
                let action = ShortcutMap::resolve(key, *modifiers, *in_text_field || self.editing_text.is_some())?;
                self.run_shortcut(action);
                Some(action)
            }
            InputEvent::KeyUp { key } => {
                if key == " " {
                    self.space_held = false;
                }
                None
            }
            InputEvent::Wheel { x, y, delta_y } => {
                self.viewport.wheel(*x, *y, *delta_y);
                self.wheel_render.schedule(self.clock_ms);
                None
            }
            _ => {
                self.pointer(event);
                None
            }
        }
    }

    fn run_shortcut(&mut self, action: ShortcutAction) {
        let result = match action {
            ShortcutAction::Tool(kind) => {
                self.set_tool(kind);
                Ok(())
            }
            ShortcutAction::Delete => self.delete_selected().map(|_| ()),
            ShortcutAction::Undo => {
                self.undo();
                Ok(())
            }
            ShortcutAction::Redo => {
                self.redo();
                Ok(())
            }
            ShortcutAction::Save => {
                self.save(self.clock_ms);
                Ok(())
            }
            ShortcutAction::Export => Ok(()),
            ShortcutAction::ZoomIn => {
                self.zoom_in();
                Ok(())
            }
            ShortcutAction::ZoomOut => {
                self.zoom_out();
                Ok(())
            }
            ShortcutAction::ResetZoom => {
                self.reset_zoom();
                Ok(())
            }
            ShortcutAction::FitToCanvas => {
                self.fit_to_canvas();
                Ok(())
            }
        };
        if let Err(e) = result {
            log::debug!("editor: shortcut {action:?}: {e}");
        }
    }

    fn pointer(&mut self, event: &InputEvent) {
        let Some((sx, sy)) = event.position() else {
            return;
        };

        // ── Panning ──
        match event {
            InputEvent::PointerDown { button, .. }
                if *button == PointerButton::Middle || (self.space_held && *button == PointerButton::Primary) =>
            {
                self.pan = Some((sx, sy));
                return;
            }
            InputEvent::PointerMove { .. } if self.pan.is_some() => {
                if let Some((lx, ly)) = self.pan {
                    self.viewport.pan_by(sx - lx, sy - ly);
                    self.pan = Some((sx, sy));
                    self.wheel_render.schedule(self.clock_ms);
                }
                return;
            }
            InputEvent::PointerUp { .. } if self.pan.is_some() => {
                self.pan = None;
                return;
            }
            _ => {}
        }

        let (cx, cy) = self.viewport.screen_to_canvas(sx, sy);
        let canvas_event = event.with_position(cx, cy);
        let Some(surface) = self.surface.as_ref() else {
            return;
        };

        let mut hit = Hit {
            instance: hit_test(surface, cx, cy),
            handle: None,
        };
        if self.tool == ToolKind::Select
            && let Some(b) = self.selection_bounds()
        {
            let radius = ControlStyle::default().corner_size / self.viewport.zoom;
            hit.handle = Handle::at(&b, cx, cy, radius);
        }

        if matches!(event, InputEvent::PointerDown { .. })
            && let Some(editing) = self.editing_text
            && hit.instance != Some(editing)
        {
            self.commit_text_edit();
        }

        let gestures = if self.tool == ToolKind::Select {
            self.select.handle(&canvas_event, hit)
        } else {
            CreateTool::new(self.tool).handle(&canvas_event, hit)
        };
        for gesture in gestures {
            self.apply_gesture(gesture);
        }
    }

    fn apply_gesture(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::Selected(_) => {
                self.guides.clear();
            }
            Gesture::BeginTransform => {
                if let Some(bytes) = self.capture() {
                    self.history.begin_batch(bytes);
                }
                let start = self.selection_bounds().map(|bounds| TransformStart {
                    bounds,
                    geometries: self.transform_targets(),
                });
                self.transform = start;
            }
            Gesture::Move { dx, dy } => self.drag_move(dx, dy),
            Gesture::Scale { handle, x, y } => self.drag_scale(handle, x, y),
            Gesture::Rotate { x, y } => self.drag_rotate(x, y),
            Gesture::EndTransform => {
                self.guides.clear();
                self.transform = None;
                if let Some(bytes) = self.capture() {
                    self.history.end_batch(bytes, "transform");
                }
                self.mutation_render.schedule(self.clock_ms);
            }
            Gesture::Marquee(rect) => {
                if let Some(surface) = self.surface.as_ref() {
                    let mut ids = hit_test_rect(surface, rect);
                    for id in std::mem::take(&mut self.select.selected) {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                    self.select.selected = ids;
                }
            }
            Gesture::Create { kind, x, y } => {
                if let Err(e) = self.add_kind_at(kind, x, y) {
                    log::debug!("editor: create {kind:?}: {e}");
                }
                self.tool = ToolKind::Select;
            }
            Gesture::EditText(id) => {
                self.begin_text_edit(id);
            }
        }
    }

    /// Geometry of every leaf under the selection.
    fn transform_targets(&self) -> HashMap<InstanceId, Geometry> {
        let Some(surface) = self.surface.as_ref() else {
            return HashMap::new();
        };
        surface
            .paint_order()
            .into_iter()
            .filter(|id| self.select.selected.iter().any(|s| surface.is_within(*id, *s)))
            .filter_map(|id| surface.get(id).filter(|i| !i.is_group()).map(|i| (id, i.geometry)))
            .collect()
    }

    fn refresh_selected_groups(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        for id in &self.select.selected {
            if surface.get(*id).is_some_and(Instance::is_group) {
                surface.refresh_group_bounds(*id);
            }
        }
    }

    fn drag_move(&mut self, dx: f32, dy: f32) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        for id in &self.select.selected {
            if surface.get(*id).is_some_and(|i| !i.locks.movement) {
                surface.translate(*id, dx, dy);
            }
        }
        let surface: &Surface = surface;
        let selected = &self.select.selected;
        let Some(moving) = Bounds::union_all(selected.iter().filter_map(|&id| surface.bounds(id))) else {
            return;
        };
        let others: Vec<Bounds> = surface
            .top_level()
            .into_iter()
            .filter(|id| !selected.iter().any(|s| surface.is_within(*id, *s)))
            .filter(|id| surface.get(*id).is_some_and(|i| i.paint.visible && i.evented))
            .filter_map(|id| surface.bounds(id))
            .collect();
        let canvas = Size::new(surface.width(), surface.height());
        self.guides = alignment_guides(moving, &others, canvas, self.config.guide_tolerance);
        self.mutation_render.schedule(self.clock_ms);
    }

    fn drag_scale(&mut self, handle: Handle, x: f32, y: f32) {
        let Some(start) = self.transform.as_ref() else {
            return;
        };
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let b = start.bounds;
        let (ax, ay) = handle.anchor(&b);
        let (hx, hy) = handle.position(&b);
        let ratio = |p: f32, a: f32, h: f32| {
            if (h - a).abs() < f32::EPSILON {
                1.0
            } else {
                ((p - a) / (h - a)).max(0.01)
            }
        };
        let (sx, sy) = (ratio(x, ax, hx), ratio(y, ay, hy));
        for (id, g0) in &start.geometries {
            if let Some(inst) = surface.get_mut(*id)
                && !inst.locks.scaling
            {
                inst.geometry.left = ax + (g0.left - ax) * sx;
                inst.geometry.top = ay + (g0.top - ay) * sy;
                inst.geometry.scale_x = g0.scale_x * sx;
                inst.geometry.scale_y = g0.scale_y * sy;
            }
        }
        self.refresh_selected_groups();
        self.mutation_render.schedule(self.clock_ms);
    }

    fn drag_rotate(&mut self, x: f32, y: f32) {
        let Some(start) = self.transform.as_ref() else {
            return;
        };
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let (cx, cy) = start.bounds.center();
        let raw = (y - cy).atan2(x - cx).to_degrees() + 90.0;
        let angle = snap_rotation(raw.rem_euclid(360.0), self.config.rotation_snap_step, self.config.rotation_snap_tolerance)
            .rem_euclid(360.0);
        for id in start.geometries.keys() {
            if let Some(inst) = surface.get_mut(*id)
                && !inst.locks.rotation
            {
                inst.geometry.angle = angle;
            }
        }
        self.refresh_selected_groups();
        self.mutation_render.schedule(self.clock_ms);
    }

    // ─── Images ──────────────────────────────────────────────────────────

    /// Loads the host must perform; see `complete_image_load`.
    pub fn drain_image_requests(&mut self) -> Vec<ImageRequest> {
        self.loader.drain_requests()
    }

    /// Resolve a ticket. A no-op (false) if the ticket is unknown or its
    /// target was deleted in the meantime.
    pub fn complete_image_load(&mut self, ticket: u64, result: Result<DecodedImage, String>) -> bool {
        let Some(req) = self.loader.complete(ticket) else {
            log::debug!("editor: unknown image ticket {ticket}");
            return false;
        };
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        if !surface.contains(req.target) {
            log::debug!("editor: image target {:?} is gone", req.target);
            return false;
        }
        let superseded = req.purpose == ImagePurpose::TemplateImage
            && self
                .adapter
                .metadata(req.target)
                .is_some_and(|m| m.pending_src.as_deref() != Some(req.src.as_str()));
        if superseded {
            log::debug!("editor: image {} was replaced before it loaded", req.src);
            return false;
        }
        let swapped = match (result, req.purpose) {
            (Ok(image), ImagePurpose::TemplateImage) => {
                self.adapter
                    .swap_in_image(surface, req.target, &req.src, Arc::new(image), FitMode::Contain)
            }
            (Ok(image), ImagePurpose::RegionBackground { mode, .. }) => {
                self.adapter
                    .swap_in_image(surface, req.target, &req.src, Arc::new(image), mode)
            }
            (Err(e), ImagePurpose::TemplateImage) => {
                log::warn!("editor: image {} failed to load: {e}", req.src);
                false
            }
            (Err(e), ImagePurpose::RegionBackground { .. }) => {
                log::warn!("editor: background {} failed to load: {e}", req.src);
                if let Some(inst) = surface.get_mut(req.target) {
                    inst.paint = crate::adapter::failure_paint();
                }
                false
            }
        };
        self.mutation_render.schedule(self.clock_ms);
        swapped
    }

    // ─── Export & save ───────────────────────────────────────────────────

    /// PNG data URL of the scene at 1:1, or `None` when there is nothing to
    /// export from.
    pub fn export_png(&self) -> Option<String> {
        self.export_png_scaled(1.0)
    }

    pub fn export_png_scaled(&self, scale: f32) -> Option<String> {
        let surface = self.surface.as_ref()?;
        match export_png_data_url(surface, scale) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("editor: {}", EditorError::Export(e.to_string()));
                None
            }
        }
    }

    pub fn to_project(&self, now: u64) -> Option<Project> {
        let surface = self.surface.as_ref()?;
        let mut project = Project::new(
            self.project_id.clone(),
            self.project_name.clone(),
            surface.width(),
            surface.height(),
            self.created_at,
        );
        project.background_color = surface.background();
        project.objects = self.adapter.to_saved_objects(surface);
        project.template_id = self.adapter.template().map(|t| t.id.clone());
        project.template_fit = self.adapter.fit();
        project.touch(now);
        Some(project)
    }

    /// Build the project and hand it to the save callback.
    pub fn save(&mut self, now: u64) -> Option<Project> {
        self.commit_text_edit();
        let project = self.to_project(now)?;
        if let Some(cb) = self.on_save.as_mut() {
            cb(&project);
        }
        log::debug!("editor: saved {} ({} objects)", project.id, project.objects.len());
        Some(project)
    }

    /// Replace the scene with a saved project. `template` restores variation
    /// support when the project came from one. Clears history.
    pub fn restore_project(&mut self, project: &Project, template: Option<&Template>) -> Result<usize, EditorError> {
        let surface = self.surface.as_mut().ok_or(EditorError::CanvasNotReady)?;
        surface.set_size(project.width, project.height);
        surface.set_background(project.background_color);
        let placed = self
            .adapter
            .restore_objects(surface, &project.objects, &mut self.loader);
        if let Some(t) = template {
            self.adapter
                .set_template(t, project.template_fit.unwrap_or(signcraft_core::TemplateFit::IDENTITY));
        }
        self.project_id = project.id.clone();
        self.project_name = project.name.clone();
        self.created_at = project.created_at;
        self.select.selected.clear();
        self.editing_text = None;
        self.history.clear();
        self.viewport.size = Size::new(project.width, project.height);
        self.mutation_render.schedule(self.clock_ms);
        Ok(placed)
    }
}
