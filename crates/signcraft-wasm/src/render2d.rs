//! Canvas2D renderer.
//!
//! Walks the surface in paint order and draws to an HTML `<canvas>` via
//! `CanvasRenderingContext2d`, then overlays selection chrome, alignment
//! guides and the marquee. Overlays live only here, never in the scene, so
//! exports stay clean.

use signcraft_core::geometry::Bounds;
use signcraft_core::model::{Color, ImageFilter, Paint, Stroke, TextAlign, TextPayload};
use signcraft_editor::CanvasEditor;
use signcraft_editor::snapping::{Guide, GuideAxis};
use signcraft_editor::tools::Handle;
use signcraft_render::{ControlStyle, Instance, InstanceKind, Surface};
use std::collections::HashMap;
use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

/// Workspace and overlay colors.
pub struct CanvasTheme {
    pub workspace: &'static str,
    pub selection: &'static str,
    pub guide: &'static str,
    pub marquee_fill: &'static str,
    pub placeholder_text: &'static str,
}

impl CanvasTheme {
    pub fn light() -> Self {
        Self {
            workspace: "#E5E7EB",
            selection: "#2196F3",
            guide: "#FF4081",
            marquee_fill: "rgba(33, 150, 243, 0.08)",
            placeholder_text: "#6B7280",
        }
    }
}

/// Decoded images uploaded into scratch canvases, keyed by source and
/// filter list.
#[derive(Default)]
pub struct ImageCache {
    canvases: HashMap<String, HtmlCanvasElement>,
}

impl ImageCache {
    fn canvas_for(&mut self, surface: &Surface, src: &str, filters: &[ImageFilter]) -> Option<&HtmlCanvasElement> {
        let key = format!("{src}|{filters:?}");
        if !self.canvases.contains_key(&key) {
            let image = surface.cached_image(src)?;
            let image = if filters.is_empty() {
                (*image).clone()
            } else {
                image.filtered(filters)
            };
            let canvas = upload(&image.pixels, image.width, image.height)?;
            self.canvases.insert(key.clone(), canvas);
        }
        self.canvases.get(&key)
    }

    pub fn clear(&mut self) {
        self.canvases.clear();
    }
}

fn upload(pixels: &[u8], width: u32, height: u32) -> Option<HtmlCanvasElement> {
    let document = web_sys::window()?.document()?;
    let canvas: HtmlCanvasElement = document.create_element("canvas").ok()?.dyn_into().ok()?;
    canvas.set_width(width);
    canvas.set_height(height);
    let ctx: CanvasRenderingContext2d = canvas.get_context("2d").ok()??.dyn_into().ok()?;
    let data = ImageData::new_with_u8_clamped_array_and_sh(Clamped(pixels), width, height).ok()?;
    ctx.put_image_data(&data, 0.0, 0.0).ok()?;
    Some(canvas)
}

/// Draw the editor's scene and overlays into a `view_w × view_h` canvas.
pub fn render_scene(
    ctx: &CanvasRenderingContext2d,
    editor: &CanvasEditor,
    images: &mut ImageCache,
    view_w: f64,
    view_h: f64,
    theme: &CanvasTheme,
) {
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
    ctx.set_fill_style_str(theme.workspace);
    ctx.fill_rect(0.0, 0.0, view_w, view_h);

    let Some(surface) = editor.surface() else {
        return;
    };
    let vp = editor.viewport();
    let zoom = vp.zoom as f64;
    let _ = ctx.set_transform(zoom, 0.0, 0.0, zoom, vp.pan_x as f64, vp.pan_y as f64);

    ctx.set_fill_style_str(&css(surface.background()));
    ctx.fill_rect(0.0, 0.0, surface.width() as f64, surface.height() as f64);

    for id in surface.paint_order() {
        let Some(inst) = surface.get(id) else {
            continue;
        };
        if !inst.paint.visible || hidden_ancestor(surface, inst) {
            continue;
        }
        let label = editor
            .adapter()
            .metadata(id)
            .filter(|m| m.pending_src.is_some() || (m.placeholder.is_some() && is_dashed_rect(inst)))
            .and_then(|m| m.placeholder.as_deref());
        draw_instance(ctx, surface, inst, images, label, theme);
    }

    // ── Overlays ──
    let px = 1.0 / zoom;
    for id in editor.selection() {
        if let Some(b) = surface.bounds(*id) {
            draw_selection(ctx, &b, theme, px, editor.editing_text() == Some(*id));
        }
    }
    if editor.editing_text().is_none()
        && let Some(b) = editor.selection_bounds()
    {
        draw_handles(ctx, &b, theme, px);
    }
    for guide in editor.guides() {
        draw_guide(ctx, guide, theme, px);
    }
    if let Some(rect) = editor.marquee() {
        draw_marquee(ctx, &rect, theme, px);
    }
}

fn hidden_ancestor(surface: &Surface, inst: &Instance) -> bool {
    let mut cur = surface.parent(inst.id);
    while let Some(p) = cur {
        if surface.get(p).is_some_and(|g| !g.paint.visible) {
            return true;
        }
        cur = surface.parent(p);
    }
    false
}

fn is_dashed_rect(inst: &Instance) -> bool {
    matches!(inst.kind, InstanceKind::Rect)
        && inst.paint.stroke.as_ref().is_some_and(|s| s.dash.is_some())
}

// ─── Instances ───────────────────────────────────────────────────────────

fn draw_instance(
    ctx: &CanvasRenderingContext2d,
    surface: &Surface,
    inst: &Instance,
    images: &mut ImageCache,
    label: Option<&str>,
    theme: &CanvasTheme,
) {
    let b = inst.local_bounds();
    let (x, y, w, h) = (b.x as f64, b.y as f64, b.width as f64, b.height as f64);
    let (cx, cy) = (x + w / 2.0, y + h / 2.0);

    ctx.save();
    if inst.geometry.angle != 0.0 {
        let _ = ctx.translate(cx, cy);
        let _ = ctx.rotate((inst.geometry.angle as f64).to_radians());
        let _ = ctx.translate(-cx, -cy);
    }
    ctx.set_global_alpha(inst.paint.opacity.clamp(0.0, 1.0) as f64);

    match &inst.kind {
        InstanceKind::Group => {}
        InstanceKind::Text(text) => draw_text(ctx, inst, text, &b),
        InstanceKind::Image(content) => {
            if let Some(canvas) = images.canvas_for(surface, &content.src, &content.filters) {
                let _ = ctx.draw_image_with_html_canvas_element_and_dw_and_dh(canvas, x, y, w, h);
            }
        }
        InstanceKind::Rect => {
            ctx.begin_path();
            ctx.rect(x, y, w, h);
            fill_and_stroke(ctx, inst, &b);
        }
        InstanceKind::Circle { .. } => {
            ctx.begin_path();
            let r = w.min(h) / 2.0;
            let _ = ctx.arc(cx, cy, r, 0.0, std::f64::consts::TAU);
            fill_and_stroke(ctx, inst, &b);
        }
        InstanceKind::Triangle => {
            ctx.begin_path();
            ctx.move_to(cx, y);
            ctx.line_to(x + w, y + h);
            ctx.line_to(x, y + h);
            ctx.close_path();
            fill_and_stroke(ctx, inst, &b);
        }
        InstanceKind::Line => {
            ctx.begin_path();
            ctx.move_to(x, y);
            ctx.line_to(x + w, y + h);
            if let Some(stroke) = &inst.paint.stroke {
                apply_stroke(ctx, stroke);
                ctx.stroke();
            }
        }
    }

    if let Some(label) = label {
        ctx.set_font("14px Arial, sans-serif");
        ctx.set_fill_style_str(theme.placeholder_text);
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        let _ = ctx.fill_text(label, cx, cy);
    }

    ctx.restore();
}

fn fill_and_stroke(ctx: &CanvasRenderingContext2d, inst: &Instance, b: &Bounds) {
    if let Some(fill) = &inst.paint.fill {
        apply_fill(ctx, fill, b);
        ctx.fill();
    }
    if let Some(stroke) = &inst.paint.stroke
        && stroke.width > 0.0
    {
        apply_stroke(ctx, stroke);
        ctx.stroke();
    }
}

/// Text is laid out line by line inside the box, vertically centered.
fn draw_text(ctx: &CanvasRenderingContext2d, inst: &Instance, text: &TextPayload, b: &Bounds) {
    let size = (text.font_size * inst.geometry.scale_y) as f64;
    ctx.set_font(&format!("{} {size}px {}", text.font_weight, text.font_family));
    if let Some(fill) = &inst.paint.fill {
        apply_fill(ctx, fill, b);
    } else {
        ctx.set_fill_style_str("#000000");
    }
    let (x, align) = match text.text_align {
        TextAlign::Left => (b.x as f64, "left"),
        TextAlign::Center => ((b.x + b.width / 2.0) as f64, "center"),
        TextAlign::Right => (b.right() as f64, "right"),
    };
    ctx.set_text_align(align);
    ctx.set_text_baseline("middle");

    let lines: Vec<&str> = text.text.lines().collect();
    let line_height = size * 1.2;
    let first = (b.y + b.height / 2.0) as f64 - line_height * (lines.len().saturating_sub(1)) as f64 / 2.0;
    for (i, line) in lines.iter().enumerate() {
        let _ = ctx.fill_text(line, x, first + line_height * i as f64);
    }
}

fn apply_fill(ctx: &CanvasRenderingContext2d, fill: &Paint, b: &Bounds) {
    match fill {
        Paint::Solid(c) => ctx.set_fill_style_str(&css(*c)),
        Paint::LinearGradient { x1, y1, x2, y2, stops } => {
            let (ox, oy) = (b.x as f64, b.y as f64);
            let grad = ctx.create_linear_gradient(
                ox + *x1 as f64,
                oy + *y1 as f64,
                ox + *x2 as f64,
                oy + *y2 as f64,
            );
            for stop in stops {
                let _ = grad.add_color_stop(stop.offset, &css(stop.color));
            }
            ctx.set_fill_style_canvas_gradient(&grad);
        }
    }
}

fn apply_stroke(ctx: &CanvasRenderingContext2d, stroke: &Stroke) {
    ctx.set_stroke_style_str(&css(stroke.color));
    ctx.set_line_width(stroke.width as f64);
    let dash = js_sys::Array::new();
    if let Some(pattern) = &stroke.dash {
        for d in pattern {
            dash.push(&JsValue::from_f64(*d as f64));
        }
    }
    let _ = ctx.set_line_dash(&dash);
}

fn css(c: Color) -> String {
    let [r, g, b, _] = c.to_rgba8();
    format!("rgba({r}, {g}, {b}, {})", c.a.clamp(0.0, 1.0))
}

// ─── Overlays ────────────────────────────────────────────────────────────

fn draw_selection(ctx: &CanvasRenderingContext2d, b: &Bounds, theme: &CanvasTheme, px: f64, editing: bool) {
    ctx.save();
    ctx.set_stroke_style_str(theme.selection);
    ctx.set_line_width(px * if editing { 2.0 } else { 1.0 });
    let _ = ctx.set_line_dash(&js_sys::Array::new());
    ctx.stroke_rect(b.x as f64, b.y as f64, b.width as f64, b.height as f64);
    ctx.restore();
}

fn draw_handles(ctx: &CanvasRenderingContext2d, b: &Bounds, theme: &CanvasTheme, px: f64) {
    let style = ControlStyle::default();
    let size = style.corner_size as f64 * px;
    let half = size / 2.0;

    ctx.save();
    ctx.set_fill_style_str(&css(style.corner_color));
    ctx.set_stroke_style_str(theme.selection);
    ctx.set_line_width(px);

    // Stem from the top edge to the rotation knob.
    let (tx, ty) = ((b.x + b.width / 2.0) as f64, b.y as f64);
    let (rx, ry) = Handle::Rotate.position(b);
    ctx.begin_path();
    ctx.move_to(tx, ty);
    ctx.line_to(rx as f64, ry as f64);
    ctx.stroke();

    for handle in Handle::CORNERS {
        let (hx, hy) = handle.position(b);
        let (hx, hy) = (hx as f64 - half, hy as f64 - half);
        ctx.fill_rect(hx, hy, size, size);
        ctx.stroke_rect(hx, hy, size, size);
    }
    ctx.begin_path();
    let _ = ctx.arc(rx as f64, ry as f64, half, 0.0, std::f64::consts::TAU);
    ctx.fill();
    ctx.stroke();
    ctx.restore();
}

fn draw_guide(ctx: &CanvasRenderingContext2d, guide: &Guide, theme: &CanvasTheme, px: f64) {
    ctx.save();
    ctx.set_stroke_style_str(theme.guide);
    ctx.set_line_width(px);
    let dash = js_sys::Array::of2(&JsValue::from_f64(4.0 * px), &JsValue::from_f64(4.0 * px));
    let _ = ctx.set_line_dash(&dash);
    ctx.begin_path();
    let (p, s, e) = (guide.position as f64, guide.start as f64, guide.end as f64);
    match guide.axis {
        GuideAxis::Vertical => {
            ctx.move_to(p, s);
            ctx.line_to(p, e);
        }
        GuideAxis::Horizontal => {
            ctx.move_to(s, p);
            ctx.line_to(e, p);
        }
    }
    ctx.stroke();
    ctx.restore();
}

fn draw_marquee(ctx: &CanvasRenderingContext2d, r: &Bounds, theme: &CanvasTheme, px: f64) {
    let (x, y, w, h) = (r.x as f64, r.y as f64, r.width as f64, r.height as f64);
    if w < px && h < px {
        return;
    }
    ctx.save();
    ctx.set_fill_style_str(theme.marquee_fill);
    ctx.fill_rect(x, y, w, h);
    ctx.set_stroke_style_str(theme.selection);
    ctx.set_line_width(px);
    let dash = js_sys::Array::of2(&JsValue::from_f64(4.0 * px), &JsValue::from_f64(4.0 * px));
    let _ = ctx.set_line_dash(&dash);
    ctx.stroke_rect(x, y, w, h);
    ctx.restore();
}
