//! Surface → tiny-skia pixmap → PNG data URL.
//!
//! CPU rasterization for export. Shapes, gradients, strokes, images and
//! text (through the font database in `text`) are drawn.

use crate::bitmap::DecodedImage;
use crate::surface::{Instance, InstanceKind, Surface};
use crate::text;
use base64::Engine;
use signcraft_core::model::{Color, Paint as ModelPaint, Stroke as ModelStroke};
use std::io::Cursor;
use thiserror::Error;
use tiny_skia::{
    FillRule, FilterQuality, GradientStop, IntSize, LinearGradient, Paint, PathBuilder, Pixmap,
    PixmapPaint, Point, Rect, Shader, SpreadMode, Stroke, StrokeDash, Transform,
};

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("surface size {0}×{1} cannot be rasterized")]
    BadSize(f32, f32),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Rasterize the whole surface at `scale` (1.0 = one pixel per unit).
pub fn rasterize(surface: &Surface, scale: f32) -> Result<Pixmap, RasterError> {
    let w = (surface.width() * scale).round();
    let h = (surface.height() * scale).round();
    let mut pixmap = Pixmap::new(w.max(0.0) as u32, h.max(0.0) as u32)
        .ok_or(RasterError::BadSize(surface.width(), surface.height()))?;
    pixmap.fill(to_skia_color(surface.background()));

    let base = Transform::from_scale(scale, scale);
    for id in surface.paint_order() {
        if let Some(inst) = surface.get(id)
            && inst.paint.visible
            && !ancestors_hidden(surface, inst)
        {
            paint_instance(&mut pixmap, surface, inst, base);
        }
    }
    Ok(pixmap)
}

fn ancestors_hidden(surface: &Surface, inst: &Instance) -> bool {
    let mut cur = surface.parent(inst.id);
    while let Some(p) = cur {
        if surface.get(p).is_some_and(|g| !g.paint.visible) {
            return true;
        }
        cur = surface.parent(p);
    }
    false
}

/// PNG bytes of a pixmap (straight alpha).
pub fn encode_png(pixmap: &Pixmap) -> Result<Vec<u8>, RasterError> {
    let pixels = unpremultiply(pixmap.data());
    let img = image::RgbaImage::from_raw(pixmap.width(), pixmap.height(), pixels)
        .ok_or(RasterError::BadSize(pixmap.width() as f32, pixmap.height() as f32))?;
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)?;
    Ok(out)
}

/// `data:image/png;base64,...` for the whole surface.
pub fn export_png_data_url(surface: &Surface, scale: f32) -> Result<String, RasterError> {
    let pixmap = rasterize(surface, scale)?;
    let png = encode_png(&pixmap)?;
    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}

// ─── Instance painters ───────────────────────────────────────────────────

fn paint_instance(pixmap: &mut Pixmap, surface: &Surface, inst: &Instance, base: Transform) {
    let b = inst.local_bounds();
    let (cx, cy) = b.center();
    let transform = base.pre_concat(Transform::from_rotate_at(inst.geometry.angle, cx, cy));
    let opacity = inst.paint.opacity.clamp(0.0, 1.0);

    let path = match &inst.kind {
        InstanceKind::Group => return,
        InstanceKind::Text(payload) => {
            let fill = inst.paint.fill.clone().unwrap_or(ModelPaint::Solid(Color::BLACK));
            let font_size = payload.font_size * inst.geometry.scale_y;
            if let Some(paint) = fill_paint(&fill, b.x, b.y, opacity)
                && !text::draw_text(pixmap, payload, &b, font_size, &paint, transform)
            {
                log::trace!("raster: text {:?} not drawn", payload.text);
            }
            return;
        }
        InstanceKind::Image(content) => {
            match surface.cached_image(&content.src) {
                Some(img) => draw_image(pixmap, &img.filtered(&content.filters), inst, transform, opacity),
                None => log::debug!("raster: image {} not in cache", content.src),
            }
            return;
        }
        InstanceKind::Rect => Rect::from_xywh(b.x, b.y, b.width, b.height).map(PathBuilder::from_rect),
        InstanceKind::Circle { .. } => PathBuilder::from_circle(cx, cy, b.width.min(b.height) / 2.0),
        InstanceKind::Triangle => {
            let mut pb = PathBuilder::new();
            pb.move_to(cx, b.y);
            pb.line_to(b.right(), b.bottom());
            pb.line_to(b.x, b.bottom());
            pb.close();
            pb.finish()
        }
        InstanceKind::Line => {
            let mut pb = PathBuilder::new();
            pb.move_to(b.x, b.y);
            pb.line_to(b.right(), b.bottom());
            pb.finish()
        }
    };
    let Some(path) = path else {
        return;
    };

    if !matches!(inst.kind, InstanceKind::Line)
        && let Some(fill) = &inst.paint.fill
        && let Some(paint) = fill_paint(fill, b.x, b.y, opacity)
    {
        pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
    }

    if let Some(stroke) = &inst.paint.stroke
        && stroke.width > 0.0
    {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.set_color(to_skia_color(stroke.color.with_alpha_factor(opacity)));
        pixmap.stroke_path(&path, &paint, &skia_stroke(stroke), transform, None);
    }
}

fn fill_paint(fill: &ModelPaint, ox: f32, oy: f32, opacity: f32) -> Option<Paint<'static>> {
    let mut paint = Paint::default();
    paint.anti_alias = true;
    match fill {
        ModelPaint::Solid(c) => paint.set_color(to_skia_color(c.with_alpha_factor(opacity))),
        ModelPaint::LinearGradient {
            x1,
            y1,
            x2,
            y2,
            stops,
        } => {
            let stops: Vec<GradientStop> = stops
                .iter()
                .map(|s| GradientStop::new(s.offset, to_skia_color(s.color.with_alpha_factor(opacity))))
                .collect();
            let shader = LinearGradient::new(
                Point::from_xy(ox + x1, oy + y1),
                Point::from_xy(ox + x2, oy + y2),
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            );
            // Degenerate gradients fall back to the first stop.
            paint.shader = match shader {
                Some(s) => s,
                None => Shader::SolidColor(to_skia_color(fill.representative_color()?)),
            };
        }
    }
    Some(paint)
}

fn skia_stroke(stroke: &ModelStroke) -> Stroke {
    Stroke {
        width: stroke.width,
        dash: stroke
            .dash
            .as_ref()
            .filter(|d| !d.is_empty())
            .and_then(|d| StrokeDash::new(d.to_vec(), 0.0)),
        ..Stroke::default()
    }
}

fn draw_image(pixmap: &mut Pixmap, img: &DecodedImage, inst: &Instance, transform: Transform, opacity: f32) {
    let Some(size) = IntSize::from_wh(img.width, img.height) else {
        return;
    };
    let Some(src) = Pixmap::from_vec(premultiply(&img.pixels), size) else {
        return;
    };
    let b = inst.local_bounds();
    let fit = Transform::from_row(
        b.width / img.width as f32,
        0.0,
        0.0,
        b.height / img.height as f32,
        b.x,
        b.y,
    );
    let paint = PixmapPaint {
        opacity,
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, src.as_ref(), &paint, transform.pre_concat(fit), None);
}

// ─── Color helpers ───────────────────────────────────────────────────────

fn to_skia_color(c: Color) -> tiny_skia::Color {
    let [r, g, b, a] = c.to_rgba8();
    tiny_skia::Color::from_rgba8(r, g, b, a)
}

fn premultiply(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(4) {
        let a = px[3] as u16;
        out.extend_from_slice(&[
            ((px[0] as u16 * a + 127) / 255) as u8,
            ((px[1] as u16 * a + 127) / 255) as u8,
            ((px[2] as u16 * a + 127) / 255) as u8,
            px[3],
        ]);
    }
    out
}

fn unpremultiply(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(4) {
        let a = px[3];
        if a == 0 {
            out.extend_from_slice(&[0, 0, 0, 0]);
        } else {
            let un = |v: u8| ((v as u16 * 255 + a as u16 / 2) / a as u16).min(255) as u8;
            out.extend_from_slice(&[un(px[0]), un(px[1]), un(px[2]), a]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Instance;
    use signcraft_core::model::{Geometry, PaintStyle, TextPayload};

    fn pixel(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let c = pixmap.pixel(x, y).unwrap();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    #[test]
    fn background_and_rect_fill() {
        let mut s = Surface::new(20.0, 20.0);
        s.set_background(Color::rgb8(0, 0, 255));
        s.add(
            Instance::new(InstanceKind::Rect, Geometry::new(0.0, 0.0, 10.0, 20.0))
                .with_paint(PaintStyle::filled(Color::rgb8(255, 0, 0))),
        );
        let pixmap = rasterize(&s, 1.0).unwrap();
        assert_eq!(pixel(&pixmap, 5, 10), [255, 0, 0, 255]);
        assert_eq!(pixel(&pixmap, 15, 10), [0, 0, 255, 255]);
    }

    #[test]
    fn hidden_instances_are_not_drawn() {
        let mut s = Surface::new(10.0, 10.0);
        let mut paint = PaintStyle::filled(Color::BLACK);
        paint.visible = false;
        s.add(Instance::new(InstanceKind::Rect, Geometry::new(0.0, 0.0, 10.0, 10.0)).with_paint(paint));
        let pixmap = rasterize(&s, 1.0).unwrap();
        assert_eq!(pixel(&pixmap, 5, 5), [255, 255, 255, 255]);
    }

    #[test]
    fn export_scale_changes_pixel_size() {
        let s = Surface::new(40.0, 30.0);
        let pixmap = rasterize(&s, 2.0).unwrap();
        assert_eq!((pixmap.width(), pixmap.height()), (80, 60));
    }

    #[test]
    fn data_url_has_png_header() {
        let s = Surface::new(4.0, 4.0);
        let url = export_png_data_url(&s, 1.0).unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn text_is_drawn_in_its_fill() {
        if text::face_count() == 0 {
            return;
        }
        let mut s = Surface::new(120.0, 60.0);
        let mut payload = TextPayload::new("HI");
        payload.font_size = 40.0;
        s.add(
            Instance::new(InstanceKind::Text(payload), Geometry::new(0.0, 0.0, 120.0, 60.0))
                .with_paint(PaintStyle::filled(Color::rgb8(200, 0, 0))),
        );
        let pixmap = rasterize(&s, 1.0).unwrap();
        let red = pixmap
            .pixels()
            .iter()
            .filter(|p| p.red() > 150 && p.green() < 60 && p.blue() < 60)
            .count();
        assert!(red > 50, "only {red} text pixels");
    }

    #[test]
    fn empty_surface_cannot_rasterize() {
        let s = Surface::new(0.0, 10.0);
        assert!(matches!(rasterize(&s, 1.0), Err(RasterError::BadSize(..))));
    }
}
