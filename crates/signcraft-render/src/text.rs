//! Text for CPU export.
//!
//! Faces come from a process-wide font database seeded with the system
//! fonts. Hosts without system fonts (the browser) register font bytes with
//! [`register_font`]. Glyph outlines are read with ttf-parser and filled as
//! tiny-skia paths, laid out the way the Canvas2D renderer lays them out:
//! lines stacked around the box's vertical middle, aligned per `TextAlign`.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use signcraft_core::geometry::Bounds;
use signcraft_core::model::{TextAlign, TextPayload};
use std::sync::{LazyLock, RwLock};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

static FONTS: LazyLock<RwLock<Database>> = LazyLock::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    log::debug!("text: {} system faces", db.len());
    RwLock::new(db)
});

/// Line advance as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.2;

/// Add a font file (TTF/OTF/TTC). Returns the number of faces added.
pub fn register_font(data: Vec<u8>) -> usize {
    match FONTS.write() {
        Ok(mut db) => {
            let before = db.len();
            db.load_font_data(data);
            db.len() - before
        }
        Err(_) => 0,
    }
}

/// Faces available for export.
pub fn face_count() -> usize {
    FONTS.read().map(|db| db.len()).unwrap_or(0)
}

// ─── Face lookup ─────────────────────────────────────────────────────────

fn query(db: &Database, family: Family<'_>, weight: u16) -> Option<fontdb::ID> {
    db.query(&Query {
        families: &[family],
        weight: Weight(weight),
        stretch: Stretch::Normal,
        style: Style::Normal,
    })
}

/// Generic families often have no configured default; try common names.
fn generic(db: &Database, family: Family<'_>, weight: u16) -> Option<fontdb::ID> {
    let fallbacks: &[&str] = match family {
        Family::Serif => &["DejaVu Serif", "Liberation Serif", "Noto Serif", "Times New Roman"],
        Family::Monospace => &["DejaVu Sans Mono", "Liberation Mono", "Noto Sans Mono", "Courier New"],
        _ => &["Arial", "Helvetica", "Liberation Sans", "DejaVu Sans", "Noto Sans", "Roboto"],
    };
    query(db, family, weight).or_else(|| {
        fallbacks
            .iter()
            .find_map(|name| query(db, Family::Name(*name), weight))
    })
}

/// Resolve a CSS-style family list (`"Inter", Arial, sans-serif`). Falls
/// back to any sans face, then to any face at all.
fn find_face(db: &Database, families: &str, weight: u16) -> Option<fontdb::ID> {
    let names = families
        .split(',')
        .map(|s| s.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|s| !s.is_empty());
    for name in names {
        let id = match name.to_ascii_lowercase().as_str() {
            "sans-serif" | "system-ui" => generic(db, Family::SansSerif, weight),
            "serif" => generic(db, Family::Serif, weight),
            "monospace" => generic(db, Family::Monospace, weight),
            _ => query(db, Family::Name(name), weight),
        };
        if id.is_some() {
            return id;
        }
    }
    generic(db, Family::SansSerif, weight).or_else(|| db.faces().next().map(|f| f.id))
}

// ─── Layout & fill ───────────────────────────────────────────────────────

/// Fill `text` inside the box `b`. False when no face is available or the
/// text has no visible glyphs.
pub(crate) fn draw_text(
    pixmap: &mut Pixmap,
    text: &TextPayload,
    b: &Bounds,
    font_size: f32,
    paint: &Paint<'_>,
    transform: Transform,
) -> bool {
    let Ok(db) = FONTS.read() else {
        return false;
    };
    let Some(id) = find_face(&db, &text.font_family, text.font_weight) else {
        log::debug!("text: no face for {:?}", text.font_family);
        return false;
    };
    let path = db
        .with_face_data(id, |data, index| {
            let face = ttf_parser::Face::parse(data, index).ok()?;
            text_path(&face, text, b, font_size)
        })
        .flatten();
    match path {
        Some(path) => {
            pixmap.fill_path(&path, paint, FillRule::Winding, transform, None);
            true
        }
        None => false,
    }
}

fn line_advance(face: &ttf_parser::Face<'_>, line: &str) -> f32 {
    line.chars()
        .filter_map(|ch| face.glyph_index(ch))
        .map(|gid| face.glyph_hor_advance(gid).unwrap_or(0) as f32)
        .sum()
}

fn text_path(face: &ttf_parser::Face<'_>, text: &TextPayload, b: &Bounds, font_size: f32) -> Option<tiny_skia::Path> {
    let upem = face.units_per_em() as f32;
    if upem <= 0.0 || font_size <= 0.0 {
        return None;
    }
    let s = font_size / upem;
    let line_height = font_size * LINE_HEIGHT;
    let lines: Vec<&str> = text.text.lines().collect();
    let first_middle = b.y + b.height / 2.0 - line_height * lines.len().saturating_sub(1) as f32 / 2.0;
    // Baseline sits half the ascent-plus-descent below the line's middle.
    let middle_to_baseline = (face.ascender() as f32 + face.descender() as f32) / 2.0 * s;

    let mut pb = PathBuilder::new();
    for (i, line) in lines.iter().enumerate() {
        let width = line_advance(face, line) * s;
        let mut pen = match text.text_align {
            TextAlign::Left => b.x,
            TextAlign::Center => b.x + (b.width - width) / 2.0,
            TextAlign::Right => b.right() - width,
        };
        let baseline = first_middle + line_height * i as f32 + middle_to_baseline;
        for ch in line.chars() {
            let Some(gid) = face.glyph_index(ch) else {
                continue;
            };
            let mut outline = GlyphOutline {
                pb: &mut pb,
                x: pen,
                y: baseline,
                s,
            };
            face.outline_glyph(gid, &mut outline);
            pen += face.glyph_hor_advance(gid).unwrap_or(0) as f32 * s;
        }
    }
    pb.finish()
}

/// Font units (y up) into surface space (y down) at a pen position.
struct GlyphOutline<'a> {
    pb: &'a mut PathBuilder,
    x: f32,
    y: f32,
    s: f32,
}

impl GlyphOutline<'_> {
    fn at(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.s, self.y - y * self.s)
    }
}

impl ttf_parser::OutlineBuilder for GlyphOutline<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.at(x, y);
        self.pb.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.at(x, y);
        self.pb.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.at(x1, y1);
        let (x, y) = self.at(x, y);
        self.pb.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.at(x1, y1);
        let (x2, y2) = self.at(x2, y2);
        let (x, y) = self.at(x, y);
        self.pb.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.pb.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_list_falls_back_to_some_face() {
        let Ok(db) = FONTS.read() else {
            return;
        };
        if db.len() == 0 {
            return;
        }
        assert!(find_face(&db, "\"No Such Font\", sans-serif", 400).is_some());
        assert!(find_face(&db, "", 700).is_some());
    }

    #[test]
    fn centered_line_is_centered_in_its_box() {
        let Ok(db) = FONTS.read() else {
            return;
        };
        let Some(id) = find_face(&db, "sans-serif", 400) else {
            return;
        };
        let b = Bounds::new(0.0, 0.0, 200.0, 50.0);
        let text = TextPayload::new("HH");
        let bounds = db
            .with_face_data(id, |data, index| {
                let face = ttf_parser::Face::parse(data, index).ok()?;
                text_path(&face, &text, &b, 30.0).map(|p| p.bounds())
            })
            .flatten()
            .unwrap();
        let left = bounds.left();
        let right = 200.0 - bounds.right();
        assert!((left - right).abs() < 6.0, "{left} vs {right}");
        assert!(bounds.top() > 0.0 && bounds.bottom() < 50.0);
    }
}
