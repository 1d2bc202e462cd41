//! Drawable object model.
//!
//! A `DrawableObject` is one element of a template (or of a serialized live
//! scene): a shape, a text block, or an image, with design-space geometry,
//! paint, and the template metadata the editor uses to find it again after
//! instantiation. Kind-specific payloads live inside the `ObjectKind`
//! variant, so a text payload on a rectangle cannot be expressed.

use crate::css;
use crate::id::ObjectId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;

// ─── Colors & Paint ──────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
///
/// Serialized as a hex string (`#RRGGBB` / `#RRGGBBAA`). Deserialization
/// accepts any CSS color the `css` module understands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build from 8-bit channels.
    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        let nibble2 = |i: usize| -> Option<u8> { Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) };
        let short = |i: usize| -> Option<f32> { Some((hex_val(bytes[i])? * 17) as f32 / 255.0) };

        match bytes.len() {
            3 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, 1.0)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgba(
                nibble2(0)? as f32 / 255.0,
                nibble2(2)? as f32 / 255.0,
                nibble2(4)? as f32 / 255.0,
                1.0,
            )),
            8 => Some(Self::rgba(
                nibble2(0)? as f32 / 255.0,
                nibble2(2)? as f32 / 255.0,
                nibble2(4)? as f32 / 255.0,
                nibble2(6)? as f32 / 255.0,
            )),
            _ => None,
        }
    }

    /// Emit as `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    /// Quantize to 8-bit channels.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// Same color with its alpha multiplied by `factor`.
    pub fn with_alpha_factor(self, factor: f32) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        css::parse_color(&s).map_err(serde::de::Error::custom)
    }
}

/// A gradient stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32, // 0.0 .. 1.0
    pub color: Color,
}

/// Fill paint.
///
/// Gradient endpoints are in the object's local, unscaled coordinate space
/// (origin at the object's top-left corner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Paint {
    Solid(Color),
    LinearGradient {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stops: SmallVec<[GradientStop; 2]>,
    },
}

impl Paint {
    /// Two-stop gradient running corner to corner across `width × height`.
    pub fn diagonal_gradient(width: f32, height: f32, from: Color, to: Color) -> Self {
        Paint::LinearGradient {
            x1: 0.0,
            y1: 0.0,
            x2: width,
            y2: height,
            stops: SmallVec::from_buf([
                GradientStop {
                    offset: 0.0,
                    color: from,
                },
                GradientStop {
                    offset: 1.0,
                    color: to,
                },
            ]),
        }
    }

    /// The solid color, or the first gradient stop as a representative.
    pub fn representative_color(&self) -> Option<Color> {
        match self {
            Paint::Solid(c) => Some(*c),
            Paint::LinearGradient { stops, .. } => stops.first().map(|s| s.color),
        }
    }

    /// Scale gradient endpoints (used when fitting geometry by a factor).
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        match self {
            Paint::Solid(c) => Paint::Solid(*c),
            Paint::LinearGradient {
                x1,
                y1,
                x2,
                y2,
                stops,
            } => Paint::LinearGradient {
                x1: x1 * sx,
                y1: y1 * sy,
                x2: x2 * sx,
                y2: y2 * sy,
                stops: stops.clone(),
            },
        }
    }
}

impl From<Color> for Paint {
    fn from(c: Color) -> Self {
        Paint::Solid(c)
    }
}

// ─── Stroke ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
    /// Dash pattern (on, off, ...). Empty or absent means solid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash: Option<SmallVec<[f32; 2]>>,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1.0,
            dash: None,
        }
    }
}

impl Stroke {
    pub fn solid(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            dash: None,
        }
    }

    pub fn dashed(color: Color, width: f32, on: f32, off: f32) -> Self {
        Self {
            color,
            width,
            dash: Some(SmallVec::from_buf([on, off])),
        }
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────

fn one() -> f32 {
    1.0
}

fn yes() -> bool {
    true
}

/// Position, size, rotation, and per-axis scale of an object.
///
/// `left`/`top` address the unrotated top-left corner; rotation is about the
/// object's center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees, clockwise.
    #[serde(default)]
    pub angle: f32,
    #[serde(default = "one")]
    pub scale_x: f32,
    #[serde(default = "one")]
    pub scale_y: f32,
}

impl Geometry {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
            angle: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Width after applying `scale_x`.
    pub fn scaled_width(&self) -> f32 {
        self.width * self.scale_x
    }

    /// Height after applying `scale_y`.
    pub fn scaled_height(&self) -> f32 {
        self.height * self.scale_y
    }
}

// ─── Paint style ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Paint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(default = "one")]
    pub opacity: f32,
    #[serde(default = "yes")]
    pub visible: bool,
}

impl Default for PaintStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            opacity: 1.0,
            visible: true,
        }
    }
}

impl PaintStyle {
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Some(Paint::Solid(color)),
            ..Default::default()
        }
    }
}

// ─── Interactivity ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interactivity {
    #[serde(default = "yes")]
    pub selectable: bool,
    /// Hit-testable.
    #[serde(default = "yes")]
    pub evented: bool,
    /// Explicit z-order index. Template order is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl Default for Interactivity {
    fn default() -> Self {
        Self {
            selectable: true,
            evented: true,
            z_index: None,
        }
    }
}

// ─── Text / Image payloads ───────────────────────────────────────────────

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

fn default_font_family() -> String {
    "Arial".into()
}

fn default_font_size() -> f32 {
    24.0
}

fn default_font_weight() -> u16 {
    400
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPayload {
    pub text: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// 100..900
    #[serde(default = "default_font_weight")]
    pub font_weight: u16,
    #[serde(default)]
    pub text_align: TextAlign,
}

impl TextPayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            font_weight: default_font_weight(),
            text_align: TextAlign::default(),
        }
    }
}

/// A post-load pixel filter, applied in list order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageFilter {
    Grayscale,
    Sepia,
    Invert,
    /// -1.0 .. 1.0
    Brightness { value: f32 },
    /// -1.0 .. 1.0
    Contrast { value: f32 },
    /// -1.0 .. 1.0
    Saturation { value: f32 },
    /// Box-blur radius in pixels.
    Blur { radius: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// URL or `data:` URI.
    pub src: String,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub filters: SmallVec<[ImageFilter; 2]>,
}

impl ImagePayload {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            filters: SmallVec::new(),
        }
    }
}

// ─── Drawable object ─────────────────────────────────────────────────────

/// The kind of a drawable object, carrying the kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ObjectKind {
    Text(TextPayload),
    Rectangle,
    Circle,
    Triangle,
    Image(ImagePayload),
    /// A straight segment from the top-left to the bottom-right of the box.
    Line,
}

impl ObjectKind {
    /// Every `kind` tag this crate can draw.
    pub const NAMES: [&'static str; 6] = ["text", "rectangle", "circle", "triangle", "image", "line"];

    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Text(_) => "text",
            ObjectKind::Rectangle => "rectangle",
            ObjectKind::Circle => "circle",
            ObjectKind::Triangle => "triangle",
            ObjectKind::Image(_) => "image",
            ObjectKind::Line => "line",
        }
    }
}

/// Deserialize an object list, skipping entries whose `kind` is not one of
/// [`ObjectKind::NAMES`]. A malformed object of a known kind is still an
/// error.
pub fn known_objects<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = Vec::<serde_json::Value>::deserialize(de)?;
    let mut out = Vec::with_capacity(raw.len());
    for value in raw {
        let kind = value.get("kind").and_then(|k| k.as_str()).unwrap_or_default();
        if !ObjectKind::NAMES.contains(&kind) {
            let id = value.get("id").and_then(|v| v.as_str()).unwrap_or("?");
            log::warn!("skipping object {id}: unsupported kind {kind:?}");
            continue;
        }
        out.push(serde_json::from_value(value).map_err(serde::de::Error::custom)?);
    }
    Ok(out)
}

/// Semantic tag attached to template objects. Not a rendering directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateRole {
    Background,
    Text,
    Logo,
    #[default]
    Decoration,
    Border,
}

impl TemplateRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateRole::Background => "background",
            TemplateRole::Text => "text",
            TemplateRole::Logo => "logo",
            TemplateRole::Decoration => "decoration",
            TemplateRole::Border => "border",
        }
    }
}

/// One element of a template or serialized scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawableObject {
    pub id: ObjectId,
    #[serde(flatten)]
    pub kind: ObjectKind,
    pub geometry: Geometry,
    #[serde(default)]
    pub paint: PaintStyle,
    #[serde(default)]
    pub interactivity: Interactivity,
    #[serde(default)]
    pub template_role: TemplateRole,
    #[serde(default = "yes")]
    pub is_editable: bool,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl DrawableObject {
    pub fn new(id: ObjectId, kind: ObjectKind, geometry: Geometry) -> Self {
        Self {
            id,
            kind,
            geometry,
            paint: PaintStyle::default(),
            interactivity: Interactivity::default(),
            template_role: TemplateRole::default(),
            is_editable: true,
            is_required: false,
            placeholder: None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ObjectKind::Text(_))
    }

    pub fn text(&self) -> Option<&TextPayload> {
        match &self.kind {
            ObjectKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        match &self.kind {
            ObjectKind::Image(i) => Some(i),
            _ => None,
        }
    }
}

// ─── Collaboration ───────────────────────────────────────────────────────

/// A remote collaborator's presence. Collaboration is not implemented; the
/// type exists so saved projects from collaborative hosts still deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollaborationUser {
    pub id: String,
    pub name: String,
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<(f32, f32)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");

        let c2 = Color::from_hex("#FF000080").unwrap();
        assert!((c2.a - 128.0 / 255.0).abs() < 0.01);
        assert_eq!(c2.to_hex().len(), 9);

        let short = Color::from_hex("fff").unwrap();
        assert_eq!(short, Color::WHITE);
        assert!(Color::from_hex("#12345").is_none());
    }

    #[test]
    fn drawable_text_from_json() {
        let json = r##"{
            "id": "headline",
            "kind": "text",
            "text": "OPEN",
            "fontSize": 48,
            "fontWeight": 700,
            "geometry": { "left": 10, "top": 20, "width": 200, "height": 60 },
            "paint": { "fill": "#ffffff" },
            "templateRole": "text",
            "placeholder": "Shop status"
        }"##;
        let obj: DrawableObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.id.as_str(), "headline");
        let text = obj.text().expect("text payload");
        assert_eq!(text.text, "OPEN");
        assert_eq!(text.font_family, "Arial");
        assert_eq!(text.font_weight, 700);
        assert_eq!(obj.geometry.scale_x, 1.0);
        assert_eq!(obj.paint.fill, Some(Paint::Solid(Color::WHITE)));
        assert!(obj.paint.visible);
        assert!(obj.is_editable);
        assert!(!obj.is_required);
        assert_eq!(obj.template_role, TemplateRole::Text);
    }

    #[test]
    fn drawable_image_with_filters() {
        let json = r#"{
            "id": "logo",
            "kind": "image",
            "src": "https://example.com/logo.png",
            "filters": [{ "type": "grayscale" }, { "type": "brightness", "value": 0.2 }],
            "geometry": { "left": 0, "top": 0, "width": 50, "height": 50 },
            "templateRole": "logo"
        }"#;
        let obj: DrawableObject = serde_json::from_str(json).unwrap();
        let image = obj.image().expect("image payload");
        assert_eq!(image.filters.len(), 2);
        assert_eq!(image.filters[1], ImageFilter::Brightness { value: 0.2 });
        assert!(obj.text().is_none());
    }

    #[test]
    fn drawable_json_roundtrip_keeps_kind() {
        let mut obj = DrawableObject::new(
            ObjectId::intern("frame"),
            ObjectKind::Rectangle,
            Geometry::new(0.0, 0.0, 10.0, 10.0),
        );
        obj.paint.stroke = Some(Stroke::dashed(Color::BLACK, 2.0, 5.0, 5.0));
        let json = serde_json::to_string(&obj).unwrap();
        assert!(json.contains(r#""kind":"rectangle""#));
        let back: DrawableObject = serde_json::from_str(&json).unwrap();
        assert_eq!(back, obj);
    }

    #[test]
    fn gradient_paint_scales_endpoints() {
        let p = Paint::diagonal_gradient(100.0, 50.0, Color::WHITE, Color::BLACK);
        match p.scaled(0.5, 2.0) {
            Paint::LinearGradient { x2, y2, stops, .. } => {
                assert_eq!(x2, 50.0);
                assert_eq!(y2, 100.0);
                assert_eq!(stops.len(), 2);
            }
            Paint::Solid(_) => panic!("expected gradient"),
        }
        assert_eq!(p.representative_color(), Some(Color::WHITE));
    }
}
