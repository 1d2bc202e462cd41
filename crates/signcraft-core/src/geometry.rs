//! Geometry primitives and fit math.
//!
//! Two kinds of fitting happen in the editor: a whole template is fitted
//! into the canvas (`TemplateFit`, uniform scale capped and centered), and an
//! image is fitted into a region (`FitMode`, per-axis scale factors).

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in canvas space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// AABB overlap.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Union of an iterator of boxes, `None` when empty.
    pub fn union_all(mut iter: impl Iterator<Item = Bounds>) -> Option<Bounds> {
        let first = iter.next()?;
        Some(iter.fold(first, |acc, b| acc.union(&b)))
    }
}

/// Width/height pair: a canvas, a template's design space, or an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

// ─── Template fit ────────────────────────────────────────────────────────

/// Uniform scale and centering offset mapping template design space onto
/// the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemplateFit {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl TemplateFit {
    pub const IDENTITY: TemplateFit = TemplateFit {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// `scale = min(cw/tw, ch/th, max_scale)`, then center the scaled
    /// template. An empty template maps with the identity.
    pub fn compute(template: Size, canvas: Size, max_scale: f32) -> Self {
        if template.is_empty() {
            return Self::IDENTITY;
        }
        let scale = (canvas.width / template.width)
            .min(canvas.height / template.height)
            .min(max_scale);
        Self {
            scale,
            offset_x: (canvas.width - template.width * scale) / 2.0,
            offset_y: (canvas.height - template.height * scale) / 2.0,
        }
    }

    /// Design-space point to canvas space.
    pub fn to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.offset_x, y * self.scale + self.offset_y)
    }

    /// Canvas-space point back to design space.
    pub fn to_design(&self, x: f32, y: f32) -> (f32, f32) {
        if self.scale == 0.0 {
            return (x, y);
        }
        ((x - self.offset_x) / self.scale, (y - self.offset_y) / self.scale)
    }

    /// The scaled template's box on the canvas.
    pub fn placed(&self, template: Size) -> Bounds {
        Bounds::new(
            self.offset_x,
            self.offset_y,
            template.width * self.scale,
            template.height * self.scale,
        )
    }
}

// ─── Region fit ──────────────────────────────────────────────────────────

/// How an image is fitted into a target region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fill the region, cropping overflow.
    #[default]
    Cover,
    /// Fit inside the region, letterboxing.
    Contain,
    /// Independent axis scales.
    Stretch,
    /// Same as `Stretch`.
    Fill,
    /// Currently `Cover`.
    Smart,
}

impl FitMode {
    /// Per-axis scale factors for fitting `image` into `region`.
    pub fn scale(self, image: Size, region: Size) -> (f32, f32) {
        if image.is_empty() {
            return (1.0, 1.0);
        }
        let sx = region.width / image.width;
        let sy = region.height / image.height;
        match self {
            FitMode::Cover | FitMode::Smart => {
                let s = sx.max(sy);
                (s, s)
            }
            FitMode::Contain => {
                let s = sx.min(sy);
                (s, s)
            }
            FitMode::Stretch | FitMode::Fill => (sx, sy),
        }
    }

    /// The fitted image box, centered on `region`.
    pub fn place(self, image: Size, region: Bounds) -> Bounds {
        let (sx, sy) = self.scale(image, Size::new(region.width, region.height));
        let w = image.width * sx;
        let h = image.height * sy;
        let (cx, cy) = region.center();
        Bounds::new(cx - w / 2.0, cy - h / 2.0, w, h)
    }
}
