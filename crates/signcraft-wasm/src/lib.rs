//! WASM bridge for Signcraft: exposes the template editor to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. Structured values cross the
//! boundary as JSON strings; user-facing failures come back as rejected
//! results carrying the error message.

mod render2d;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use signcraft_core::geometry::FitMode;
use signcraft_core::model::{Color, ImageFilter, Stroke};
use signcraft_core::{EditorConfig, ObjectId, Project, TemplateCategory, TemplateStore, css};
use signcraft_editor::layers::{LayerFilter, LayerNode};
use signcraft_editor::{
    CanvasEditor, InputEvent, Modifiers, PointerButton, ShortcutAction, ToolKind,
    UploadedFile,
};
use signcraft_render::{DecodedImage, InstanceId};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The JS-facing editor handle. One per `<canvas>`.
#[wasm_bindgen]
pub struct SignCanvas {
    editor: CanvasEditor,
    store: TemplateStore,
    images: render2d::ImageCache,
    width: f64,
    height: f64,
}

#[wasm_bindgen]
impl SignCanvas {
    /// Create an editor over a `width × height` canvas. `config_json` may
    /// override any `EditorConfig` field.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, config_json: Option<String>) -> Result<SignCanvas, JsValue> {
        setup_panic_hook();
        init_logging();
        let config = match config_json.as_deref() {
            Some(json) => EditorConfig::from_json(json).map_err(to_js)?,
            None => EditorConfig::default(),
        };
        let store = TemplateStore::builtin().map_err(to_js)?;
        let mut editor = CanvasEditor::new(config);
        editor.init_canvas(width as f32, height as f32);
        Ok(Self {
            editor,
            store,
            images: render2d::ImageCache::default(),
            width,
            height,
        })
    }

    /// Draw the scene and overlays.
    pub fn render(&mut self, ctx: &CanvasRenderingContext2d) {
        render2d::render_scene(
            ctx,
            &self.editor,
            &mut self.images,
            self.width,
            self.height,
            &render2d::CanvasTheme::light(),
        );
    }

    /// True when a debounced redraw is due.
    pub fn needs_render(&mut self, now_ms: f64) -> bool {
        self.editor.poll_render(now_ms as u64)
    }

    // ─── Catalog ─────────────────────────────────────────────────────────

    /// Templates as JSON, optionally narrowed by category and search text.
    pub fn templates_json(&self, category: Option<String>, query: Option<String>) -> String {
        templates_json(&self.store, category.as_deref(), query.as_deref())
    }

    pub fn background_presets_json(&self) -> String {
        serde_json::to_string(self.store.background_presets()).unwrap_or_else(|_| "[]".into())
    }

    pub fn load_template(&mut self, id: &str, clear: bool) -> Result<u32, JsValue> {
        let template = self
            .store
            .by_id(id)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown template `{id}`.")))?
            .clone();
        self.images.clear();
        self.editor.load_template(&template, clear).map(|n| n as u32).map_err(to_js)
    }

    pub fn apply_color_variation(&mut self, id: &str) -> Result<bool, JsValue> {
        self.editor.apply_color_variation(id).map_err(to_js)
    }

    pub fn apply_text_variation(&mut self, id: &str) -> Result<bool, JsValue> {
        self.editor.apply_text_variation(id).map_err(to_js)
    }

    // ─── Objects ─────────────────────────────────────────────────────────

    /// Add an object of `kind` (`text`, `rectangle`, `circle`, `triangle`,
    /// `line`, `image`) at the default location. Returns its instance id.
    pub fn add_object(&mut self, kind: &str) -> Result<f64, JsValue> {
        let id = match kind {
            "text" => self.editor.add_text(),
            "rectangle" | "rect" => self.editor.add_rectangle(),
            "circle" => self.editor.add_circle(),
            "triangle" => self.editor.add_triangle(),
            "line" => self.editor.add_line(),
            "image" => self.editor.add_image(None),
            other => return Err(JsValue::from_str(&format!("Unknown object kind `{other}`."))),
        };
        id.map(raw).map_err(to_js)
    }

    pub fn add_image(&mut self, name: &str, mime: &str, bytes: Vec<u8>) -> Result<f64, JsValue> {
        let file = UploadedFile::new(name, mime, bytes);
        self.editor.add_image(Some(&file)).map(raw).map_err(to_js)
    }

    pub fn replace_image(&mut self, object_id: &str, name: &str, mime: &str, bytes: Vec<u8>) -> Result<f64, JsValue> {
        let file = UploadedFile::new(name, mime, bytes);
        self.editor
            .replace_image(ObjectId::intern(object_id), &file)
            .map(raw)
            .map_err(to_js)
    }

    pub fn delete_selected(&mut self) -> Result<u32, JsValue> {
        self.editor.delete_selected().map(|n| n as u32).map_err(to_js)
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Replace the selection with a JSON array of instance ids.
    pub fn select_ids(&mut self, ids_json: &str) -> bool {
        match parse_ids(ids_json) {
            Some(ids) => {
                self.editor.select(&ids);
                true
            }
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        self.editor.clear_selection();
    }

    /// Selection as JSON: instance ids plus the design-space read-back of
    /// the first selected object.
    pub fn selection_json(&self) -> String {
        selection_json(&self.editor)
    }

    pub fn begin_text_edit(&mut self, id: f64) -> bool {
        self.editor.begin_text_edit(InstanceId::from_raw(id as u64))
    }

    pub fn commit_text_edit(&mut self) {
        self.editor.commit_text_edit();
    }

    // ─── Properties ──────────────────────────────────────────────────────

    pub fn set_fill(&mut self, color: &str) -> Result<(), JsValue> {
        let color = parse_css_color(color)?;
        self.editor.set_fill(color).map_err(to_js)
    }

    /// Empty `color` removes the stroke.
    pub fn set_stroke(&mut self, color: &str, width: f32) -> Result<(), JsValue> {
        let stroke = if color.is_empty() {
            None
        } else {
            Some(Stroke::solid(parse_css_color(color)?, width))
        };
        self.editor.set_stroke(stroke).map_err(to_js)
    }

    pub fn set_opacity(&mut self, opacity: f32) -> Result<(), JsValue> {
        self.editor.set_opacity(opacity).map_err(to_js)
    }

    pub fn set_text(&mut self, text: &str) -> Result<(), JsValue> {
        self.editor.set_text(text).map_err(to_js)
    }

    pub fn set_font_size(&mut self, size: f32) -> Result<(), JsValue> {
        self.editor.set_font_size(size).map_err(to_js)
    }

    pub fn set_font_family(&mut self, family: &str) -> Result<(), JsValue> {
        self.editor.set_font_family(family).map_err(to_js)
    }

    /// `filters_json` is an array like `[{"type":"grayscale"}]`.
    pub fn set_image_filters(&mut self, filters_json: &str) -> Result<(), JsValue> {
        let filters: Vec<ImageFilter> = serde_json::from_str(filters_json).map_err(to_js)?;
        self.editor.set_image_filters(&filters).map_err(to_js)
    }

    pub fn set_background_color(&mut self, color: &str) -> Result<(), JsValue> {
        let color = parse_css_color(color)?;
        self.editor.set_background_color(color).map_err(to_js)
    }

    // ─── Arrange ─────────────────────────────────────────────────────────

    /// `forward`, `backward`, `front` or `back`.
    pub fn arrange(&mut self, verb: &str) -> Result<(), JsValue> {
        match verb {
            "forward" => self.editor.bring_forward(),
            "backward" => self.editor.send_backward(),
            "front" => self.editor.bring_to_front(),
            "back" => self.editor.send_to_back(),
            other => return Err(JsValue::from_str(&format!("Unknown arrange verb `{other}`."))),
        }
        .map_err(to_js)
    }

    pub fn group_selected(&mut self) -> Result<f64, JsValue> {
        self.editor.group_selected().map(raw).map_err(to_js)
    }

    pub fn ungroup_selected(&mut self) -> Result<u32, JsValue> {
        self.editor.ungroup_selected().map(|v| v.len() as u32).map_err(to_js)
    }

    // ─── Backgrounds ─────────────────────────────────────────────────────

    pub fn apply_background_preset(&mut self, preset_id: &str) -> Result<f64, JsValue> {
        let preset = self
            .store
            .background_preset(preset_id)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown background `{preset_id}`.")))?
            .clone();
        self.editor.apply_background_preset(&preset).map(raw).map_err(to_js)
    }

    /// `mode` is one of `cover`, `contain`, `stretch`, `fill`, `smart`.
    pub fn apply_background_image(&mut self, name: &str, mime: &str, bytes: Vec<u8>, mode: &str) -> Result<f64, JsValue> {
        let file = UploadedFile::new(name, mime, bytes);
        self.editor
            .apply_background_image(&file, parse_fit_mode(mode))
            .map(raw)
            .map_err(to_js)
    }

    pub fn remove_background(&mut self) -> Result<u32, JsValue> {
        self.editor.remove_background().map(|n| n as u32).map_err(to_js)
    }

    pub fn remove_all_backgrounds(&mut self) -> Result<u32, JsValue> {
        self.editor.remove_all_backgrounds().map(|n| n as u32).map_err(to_js)
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    /// Layer tree as JSON, topmost first. `filter_json` is an optional
    /// `{search, category, showHidden}` object.
    pub fn layers_json(&self, filter_json: Option<String>) -> String {
        let filter = filter_json
            .as_deref()
            .and_then(parse_layer_filter)
            .unwrap_or_default();
        layers_json(&self.editor.filtered_layers(&filter))
    }

    pub fn reorder_layer(&mut self, id: f64, parent: Option<f64>, index: u32) -> Result<bool, JsValue> {
        self.editor
            .reorder_layer(
                InstanceId::from_raw(id as u64),
                parent.map(|p| InstanceId::from_raw(p as u64)),
                index as usize,
            )
            .map_err(to_js)
    }

    pub fn set_layer_visible(&mut self, id: f64, visible: bool) -> Result<bool, JsValue> {
        self.editor
            .set_layer_visible(InstanceId::from_raw(id as u64), visible)
            .map_err(to_js)
    }

    pub fn set_layer_locked(&mut self, id: f64, locked: bool) -> Result<bool, JsValue> {
        self.editor
            .set_layer_locked(InstanceId::from_raw(id as u64), locked)
            .map_err(to_js)
    }

    // ─── Input ───────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f32,
        y: f32,
        button: i16,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        now_ms: f64,
    ) {
        let event = InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::from_dom(button),
            modifiers: mods(shift, ctrl, alt, meta),
        };
        self.editor.handle_input(&event, now_ms as u64);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_move(&mut self, x: f32, y: f32, shift: bool, ctrl: bool, alt: bool, meta: bool, now_ms: f64) {
        let event = InputEvent::PointerMove {
            x,
            y,
            modifiers: mods(shift, ctrl, alt, meta),
        };
        self.editor.handle_input(&event, now_ms as u64);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_up(&mut self, x: f32, y: f32, shift: bool, ctrl: bool, alt: bool, meta: bool, now_ms: f64) {
        let event = InputEvent::PointerUp {
            x,
            y,
            modifiers: mods(shift, ctrl, alt, meta),
        };
        self.editor.handle_input(&event, now_ms as u64);
    }

    pub fn handle_double_click(&mut self, x: f32, y: f32, now_ms: f64) {
        self.editor.handle_input(&InputEvent::DoubleClick { x, y }, now_ms as u64);
    }

    pub fn handle_wheel(&mut self, x: f32, y: f32, delta_y: f32, now_ms: f64) {
        self.editor
            .handle_input(&InputEvent::Wheel { x, y, delta_y }, now_ms as u64);
    }

    /// Returns the name of the shortcut that fired, or an empty string.
    /// `"export"` is left for the host, which calls `export_png`.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_key(
        &mut self,
        key: &str,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
        in_text_field: bool,
        now_ms: f64,
    ) -> String {
        let event = InputEvent::KeyDown {
            key: key.to_string(),
            modifiers: mods(shift, ctrl, alt, meta),
            in_text_field,
        };
        self.editor
            .handle_input(&event, now_ms as u64)
            .map(action_name)
            .unwrap_or_default()
    }

    pub fn handle_key_up(&mut self, key: &str, now_ms: f64) {
        self.editor.handle_input(
            &InputEvent::KeyUp {
                key: key.to_string(),
            },
            now_ms as u64,
        );
    }

    pub fn set_tool(&mut self, name: &str) -> bool {
        match ToolKind::parse(name) {
            Some(kind) => {
                self.editor.set_tool(kind);
                true
            }
            None => false,
        }
    }

    pub fn tool_name(&self) -> String {
        self.editor.tool().as_str().to_string()
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn zoom(&self) -> f32 {
        self.editor.zoom()
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.editor.zoom_in()
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.editor.zoom_out()
    }

    pub fn reset_zoom(&mut self) {
        self.editor.reset_zoom();
    }

    pub fn fit_to_canvas(&mut self) -> bool {
        self.editor.fit_to_canvas()
    }

    // ─── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.editor.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.editor.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.editor.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.editor.can_redo()
    }

    // ─── Images ──────────────────────────────────────────────────────────

    /// Loads the host should fetch, as `[{ticket, src}]`.
    pub fn take_image_requests(&mut self) -> String {
        let requests: Vec<ImageTicket> = self
            .editor
            .drain_image_requests()
            .into_iter()
            .map(|r| ImageTicket {
                ticket: r.ticket,
                src: r.src,
            })
            .collect();
        serde_json::to_string(&requests).unwrap_or_else(|_| "[]".into())
    }

    /// Deliver fetched bytes for a ticket.
    pub fn complete_image_load(&mut self, ticket: f64, bytes: Vec<u8>) -> bool {
        let result = DecodedImage::decode(&bytes).map_err(|e| e.to_string());
        self.editor.complete_image_load(ticket as u64, result)
    }

    pub fn fail_image_load(&mut self, ticket: f64, message: &str) -> bool {
        self.editor
            .complete_image_load(ticket as u64, Err(message.to_string()))
    }

    // ─── Export & projects ───────────────────────────────────────────────

    /// PNG data URL of the scene without editor chrome.
    pub fn export_png(&self) -> Option<String> {
        self.editor.export_png()
    }

    /// Font file bytes for text in PNG exports; the browser exposes no
    /// system fonts. Returns the number of faces added.
    pub fn register_font(&mut self, bytes: Vec<u8>) -> u32 {
        let added = signcraft_render::register_font(bytes);
        log::debug!("wasm: registered {added} font faces");
        added as u32
    }

    pub fn set_project_info(&mut self, id: &str, name: &str, created_at: f64) {
        self.editor.set_project_info(id, name, created_at as u64);
    }

    /// Project JSON for persistence.
    pub fn save(&mut self, now_ms: f64) -> Option<String> {
        let project = self.editor.save(now_ms as u64)?;
        match project.to_json() {
            Ok(json) => Some(json),
            Err(e) => {
                log::error!("wasm: project serialization failed: {e}");
                None
            }
        }
    }

    pub fn restore_project(&mut self, json: &str) -> Result<u32, JsValue> {
        let project = Project::from_json(json).map_err(to_js)?;
        let template = project
            .template_id
            .as_deref()
            .and_then(|id| self.store.by_id(id))
            .cloned();
        self.images.clear();
        self.editor
            .restore_project(&project, template.as_ref())
            .map(|n| n as u32)
            .map_err(to_js)
    }
}

// ─── JSON shapes ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ImageTicket {
    ticket: u64,
    src: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TemplateSummary<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    category: TemplateCategory,
    tags: &'a BTreeSet<String>,
    width: f32,
    height: f32,
    color_variations: Vec<&'a str>,
    text_variations: Vec<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayerJson {
    id: u64,
    name: String,
    kind: &'static str,
    visible: bool,
    locked: bool,
    z_index: usize,
    children: Vec<LayerJson>,
}

impl From<&LayerNode> for LayerJson {
    fn from(node: &LayerNode) -> Self {
        Self {
            id: node.id.raw(),
            name: node.name.clone(),
            kind: node.kind.as_str(),
            visible: node.visible,
            locked: node.locked,
            z_index: node.z_index,
            children: node.children.iter().map(LayerJson::from).collect(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct LayerFilterJson {
    search: String,
    category: Option<String>,
    show_hidden: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectionJson {
    ids: Vec<u64>,
    editing_text: Option<u64>,
    object: Option<signcraft_core::DrawableObject>,
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn templates_json(store: &TemplateStore, category: Option<&str>, query: Option<&str>) -> String {
    let category = category.and_then(TemplateCategory::parse);
    let summaries: Vec<TemplateSummary<'_>> = store
        .all()
        .iter()
        .filter(|t| category.is_none_or(|c| t.category == c))
        .filter(|t| query.is_none_or(|q| t.matches_query(q)))
        .map(|t| TemplateSummary {
            id: &t.id,
            name: &t.name,
            description: &t.description,
            category: t.category,
            tags: &t.tags,
            width: t.dimensions.width,
            height: t.dimensions.height,
            color_variations: t.color_variations.iter().map(|v| v.id.as_str()).collect(),
            text_variations: t.text_variations.iter().map(|v| v.id.as_str()).collect(),
        })
        .collect();
    serde_json::to_string(&summaries).unwrap_or_else(|_| "[]".into())
}

fn layers_json(layers: &[LayerNode]) -> String {
    let out: Vec<LayerJson> = layers.iter().map(LayerJson::from).collect();
    serde_json::to_string(&out).unwrap_or_else(|_| "[]".into())
}

fn selection_json(editor: &CanvasEditor) -> String {
    let selection = editor.selection();
    let object = selection.first().and_then(|id| {
        editor
            .surface()
            .and_then(|surface| editor.adapter().read_back(surface, *id))
    });
    let out = SelectionJson {
        ids: selection.iter().map(|id| id.raw()).collect(),
        editing_text: editor.editing_text().map(InstanceId::raw),
        object,
    };
    serde_json::to_string(&out).unwrap_or_else(|_| "{}".into())
}

fn parse_ids(json: &str) -> Option<Vec<InstanceId>> {
    let raw: Vec<u64> = serde_json::from_str(json).ok()?;
    Some(raw.into_iter().map(InstanceId::from_raw).collect())
}

fn parse_layer_filter(json: &str) -> Option<LayerFilter> {
    let parsed: LayerFilterJson = serde_json::from_str(json).ok()?;
    Some(LayerFilter {
        search: parsed.search,
        category: parsed
            .category
            .as_deref()
            .and_then(signcraft_editor::LayerCategory::parse)
            .unwrap_or_default(),
        show_hidden: parsed.show_hidden,
    })
}

fn parse_fit_mode(mode: &str) -> FitMode {
    match mode.to_ascii_lowercase().as_str() {
        "contain" => FitMode::Contain,
        "stretch" => FitMode::Stretch,
        "fill" => FitMode::Fill,
        "smart" => FitMode::Smart,
        _ => FitMode::Cover,
    }
}

fn action_name(action: ShortcutAction) -> String {
    match action {
        ShortcutAction::Tool(kind) => format!("tool:{}", kind.as_str()),
        ShortcutAction::Delete => "delete".into(),
        ShortcutAction::Undo => "undo".into(),
        ShortcutAction::Redo => "redo".into(),
        ShortcutAction::Save => "save".into(),
        ShortcutAction::Export => "export".into(),
        ShortcutAction::ZoomIn => "zoom-in".into(),
        ShortcutAction::ZoomOut => "zoom-out".into(),
        ShortcutAction::ResetZoom => "reset-zoom".into(),
        ShortcutAction::FitToCanvas => "fit".into(),
    }
}

fn mods(shift: bool, ctrl: bool, alt: bool, meta: bool) -> Modifiers {
    Modifiers {
        shift,
        ctrl,
        alt,
        meta,
    }
}

fn raw(id: InstanceId) -> f64 {
    id.raw() as f64
}

fn parse_css_color(s: &str) -> Result<Color, JsValue> {
    css::parse_color(s).map_err(to_js)
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Route panics to the browser console.
fn setup_panic_hook() {
    console_error_panic_hook::set_once();
}

// ─── Logging ─────────────────────────────────────────────────────────────

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = JsValue::from_str(&format!("[{}] {}", record.target(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg),
            log::Level::Warn => web_sys::console::warn_1(&msg),
            _ => web_sys::console::log_1(&msg),
        }
    }

    fn flush(&self) {}
}

fn init_logging() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(log::LevelFilter::Info);
    }
}

/// Validate a catalog document; returns the error message or an empty
/// string.
#[wasm_bindgen]
pub fn validate_catalog(json: &str) -> String {
    match TemplateStore::from_json(json) {
        Ok(_) => String::new(),
        Err(e) => e.to_string(),
    }
}
