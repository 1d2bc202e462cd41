//! Image decoding and pixel filters.

use base64::Engine;
use image::GenericImageView;
use signcraft_core::model::ImageFilter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("not a base64 data URI")]
    NotDataUri,
    #[error("pixel buffer is {actual} bytes, expected {expected}")]
    BadLength { expected: usize, actual: usize },
}

/// Decoded RGBA pixels (straight alpha).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn from_rgba(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(ImageError::BadLength {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode PNG or JPEG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let img = image::load_from_memory(bytes)?;
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            pixels: img.to_rgba8().into_raw(),
        })
    }

    /// Decode a `data:<mime>;base64,<payload>` URI.
    pub fn decode_data_uri(uri: &str) -> Result<Self, ImageError> {
        let payload = uri
            .strip_prefix("data:")
            .and_then(|rest| rest.find(";base64,").map(|pos| &rest[pos + 8..]))
            .ok_or(ImageError::NotDataUri)?;
        let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
        Self::decode(&bytes)
    }

    /// Apply filters in list order.
    #[must_use]
    pub fn filtered(&self, filters: &[ImageFilter]) -> Self {
        let mut out = self.clone();
        for filter in filters {
            out.apply(*filter);
        }
        out
    }

    fn apply(&mut self, filter: ImageFilter) {
        if let ImageFilter::Blur { radius } = filter {
            self.box_blur(radius);
            return;
        }
        for px in self.pixels.chunks_exact_mut(4) {
            let [r, g, b] = [px[0] as f32, px[1] as f32, px[2] as f32];
            let (r, g, b) = match filter {
                ImageFilter::Grayscale => {
                    let l = 0.299 * r + 0.587 * g + 0.114 * b;
                    (l, l, l)
                }
                ImageFilter::Sepia => (
                    0.393 * r + 0.769 * g + 0.189 * b,
                    0.349 * r + 0.686 * g + 0.168 * b,
                    0.272 * r + 0.534 * g + 0.131 * b,
                ),
                ImageFilter::Invert => (255.0 - r, 255.0 - g, 255.0 - b),
                ImageFilter::Brightness { value } => {
                    let d = value * 255.0;
                    (r + d, g + d, b + d)
                }
                ImageFilter::Contrast { value } => {
                    let c = value * 255.0;
                    let f = (259.0 * (c + 255.0)) / (255.0 * (259.0 - c));
                    (
                        f * (r - 128.0) + 128.0,
                        f * (g - 128.0) + 128.0,
                        f * (b - 128.0) + 128.0,
                    )
                }
                ImageFilter::Saturation { value } => {
                    let l = 0.299 * r + 0.587 * g + 0.114 * b;
                    let s = 1.0 + value;
                    (l + (r - l) * s, l + (g - l) * s, l + (b - l) * s)
                }
                ImageFilter::Blur { .. } => (r, g, b),
            };
            px[0] = r.round().clamp(0.0, 255.0) as u8;
            px[1] = g.round().clamp(0.0, 255.0) as u8;
            px[2] = b.round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Separable box blur, edges clamped.
    fn box_blur(&mut self, radius: u32) {
        if radius == 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let (w, h) = (self.width as i64, self.height as i64);
        let r = radius as i64;
        let pass = |src: &[u8], horizontal: bool| -> Vec<u8> {
            let mut dst = vec![0u8; src.len()];
            for y in 0..h {
                for x in 0..w {
                    let mut acc = [0u32; 4];
                    let mut n = 0u32;
                    for k in -r..=r {
                        let (sx, sy) = if horizontal {
                            ((x + k).clamp(0, w - 1), y)
                        } else {
                            (x, (y + k).clamp(0, h - 1))
                        };
                        let i = ((sy * w + sx) * 4) as usize;
                        for c in 0..4 {
                            acc[c] += src[i + c] as u32;
                        }
                        n += 1;
                    }
                    let o = ((y * w + x) * 4) as usize;
                    for c in 0..4 {
                        dst[o + c] = (acc[c] / n) as u8;
                    }
                }
            }
            dst
        };
        let horizontal = pass(&self.pixels, true);
        self.pixels = pass(&horizontal, false);
    }
}
