//! Source texture
//!
//! The flag artwork as a fixed-resolution RGBA raster, either decoded from
//! a PNG banner, painted procedurally (background + three emblems at the
//! banner's anchor points), or both. Replaced wholesale when the emblem or
//! palette changes; never partially mutated, so an in-flight frame can keep
//! sampling the old one.

use serde::{Deserialize, Serialize};

use crate::render::{Color, Framebuffer, SRC_H, SRC_W};
use crate::shapes;

/// Banner artwork viewbox the emblem anchors were authored in; halved into
/// source-texture space.
const ART_SCALE: f32 = 0.5;

/// Emblem anchor centres in the authored viewbox.
const EMBLEM_ANCHORS: [(f32, f32); 3] = [
    (1280.95, 1133.84),
    (1081.89, 1118.19),
    (875.19, 1133.84),
];

/// Emblem radius in the authored viewbox.
const EMBLEM_R: f32 = 78.0;

/// Background and emblem colors for the painted artwork.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub background: Color,
    pub accent: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::new(0x33, 0x39, 0x3d),
            accent: Color::new(0xff, 0xff, 0xff),
        }
    }
}

/// Selectable emblem shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Emblem {
    #[default]
    Star5,
    Circle,
    Triangle,
    Square,
    Diamond,
    Pentagon,
    Hexagon,
    Octagon,
    Star4,
    Star6,
    Heart,
    Ring,
    Cross,
    Arrow,
}

impl Emblem {
    pub const ALL: [Emblem; 14] = [
        Emblem::Star5,
        Emblem::Circle,
        Emblem::Triangle,
        Emblem::Square,
        Emblem::Diamond,
        Emblem::Pentagon,
        Emblem::Hexagon,
        Emblem::Octagon,
        Emblem::Star4,
        Emblem::Star6,
        Emblem::Heart,
        Emblem::Ring,
        Emblem::Cross,
        Emblem::Arrow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Emblem::Star5 => "star 5-pt",
            Emblem::Circle => "circle",
            Emblem::Triangle => "triangle",
            Emblem::Square => "square",
            Emblem::Diamond => "diamond",
            Emblem::Pentagon => "pentagon",
            Emblem::Hexagon => "hexagon",
            Emblem::Octagon => "octagon",
            Emblem::Star4 => "star 4-pt",
            Emblem::Star6 => "star 6-pt",
            Emblem::Heart => "heart",
            Emblem::Ring => "ring",
            Emblem::Cross => "cross",
            Emblem::Arrow => "arrow",
        }
    }

    pub fn next(self) -> Emblem {
        let i = Emblem::ALL.iter().position(|&e| e == self).unwrap_or(0);
        Emblem::ALL[(i + 1) % Emblem::ALL.len()]
    }

    /// Contours for this emblem centred on (cx, cy), even-odd filled.
    fn contours(self, cx: f32, cy: f32, r: f32) -> Vec<shapes::Contour> {
        use std::f32::consts::PI;
        match self {
            Emblem::Star5 => vec![shapes::star(cx, cy, r, r * 0.382, 5)],
            Emblem::Circle => vec![shapes::circle(cx, cy, r)],
            Emblem::Triangle => vec![shapes::regular_polygon(cx, cy, r, 3, -PI / 2.0)],
            Emblem::Square => vec![shapes::regular_polygon(cx, cy, r, 4, -PI / 4.0)],
            Emblem::Diamond => vec![shapes::regular_polygon(cx, cy, r, 4, 0.0)],
            Emblem::Pentagon => vec![shapes::regular_polygon(cx, cy, r, 5, -PI / 2.0)],
            Emblem::Hexagon => vec![shapes::regular_polygon(cx, cy, r, 6, 0.0)],
            Emblem::Octagon => vec![shapes::regular_polygon(cx, cy, r, 8, PI / 8.0)],
            Emblem::Star4 => vec![shapes::star(cx, cy, r, r * 0.38, 4)],
            Emblem::Star6 => vec![shapes::star(cx, cy, r, r * 0.50, 6)],
            Emblem::Heart => vec![shapes::heart(cx, cy, r)],
            Emblem::Ring => shapes::ring(cx, cy, r),
            Emblem::Cross => vec![shapes::cross(cx, cy, r)],
            Emblem::Arrow => vec![shapes::arrow(cx, cy, r)],
        }
    }
}

/// Decoded flag artwork at the fixed logical resolution.
pub struct SourceTexture {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u8>,
}

impl SourceTexture {
    /// A uniformly colored texture.
    pub fn solid(color: Color) -> Self {
        let mut pixels = Vec::with_capacity(SRC_W * SRC_H * 4);
        for _ in 0..SRC_W * SRC_H {
            pixels.extend_from_slice(&color.to_bytes());
        }
        Self {
            width: SRC_W,
            height: SRC_H,
            pixels,
        }
    }

    /// Decode PNG bytes and resample to the fixed logical size if needed.
    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, String> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| format!("Failed to decode banner image: {}", e))?;
        let rgba = image::imageops::resize(
            &img.to_rgba8(),
            SRC_W as u32,
            SRC_H as u32,
            image::imageops::FilterType::Triangle,
        );
        Ok(Self {
            width: SRC_W,
            height: SRC_H,
            pixels: rgba.into_raw(),
        })
    }

    /// Paint the artwork: background fill, optional base banner underneath,
    /// then the three emblems in the accent color.
    pub fn painted(palette: &Palette, emblem: Emblem, base: Option<&SourceTexture>) -> Self {
        let mut fb = Framebuffer::new(SRC_W, SRC_H);
        for i in 0..SRC_W * SRC_H {
            fb.pixels[i * 4..i * 4 + 4].copy_from_slice(&palette.background.to_bytes());
        }
        if let Some(base) = base {
            for y in 0..SRC_H {
                for x in 0..SRC_W {
                    let i = (y * base.width + x) * 4;
                    let c = Color::with_alpha(
                        base.pixels[i],
                        base.pixels[i + 1],
                        base.pixels[i + 2],
                        base.pixels[i + 3],
                    );
                    fb.blend_pixel(x, y, c);
                }
            }
        }
        for (ax, ay) in EMBLEM_ANCHORS {
            let contours = emblem.contours(ax * ART_SCALE, ay * ART_SCALE, EMBLEM_R * ART_SCALE);
            fb.fill_polygon(&contours, palette.accent);
        }
        Self {
            width: SRC_W,
            height: SRC_H,
            pixels: fb.pixels,
        }
    }

    fn texel(&self, x: usize, y: usize) -> [f32; 4] {
        let i = (y * self.width + x) * 4;
        [
            self.pixels[i] as f32,
            self.pixels[i + 1] as f32,
            self.pixels[i + 2] as f32,
            self.pixels[i + 3] as f32,
        ]
    }

    /// Bilinear sample at a texture-space position, clamped to the edges.
    pub fn sample_bilinear(&self, u: f32, v: f32) -> Color {
        let x = (u - 0.5).clamp(0.0, (self.width - 1) as f32);
        let y = (v - 0.5).clamp(0.0, (self.height - 1) as f32);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let t00 = self.texel(x0, y0);
        let t10 = self.texel(x1, y0);
        let t01 = self.texel(x0, y1);
        let t11 = self.texel(x1, y1);

        let mut out = [0u8; 4];
        for c in 0..4 {
            let top = t00[c] * (1.0 - fx) + t10[c] * fx;
            let bot = t01[c] * (1.0 - fx) + t11[c] * fx;
            out[c] = (top * (1.0 - fy) + bot * fy).round() as u8;
        }
        Color::with_alpha(out[0], out[1], out[2], out[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solid_texture_samples_uniformly() {
        let tex = SourceTexture::solid(Color::new(10, 200, 30));
        for (u, v) in [(0.0, 0.0), (525.0, 350.0), (1049.9, 699.9), (3.3, 697.2)] {
            assert_eq!(tex.sample_bilinear(u, v), Color::new(10, 200, 30));
        }
    }

    #[test]
    fn bilinear_interpolates_between_texels() {
        let mut tex = SourceTexture::solid(Color::new(0, 0, 0));
        // Make texel (1, 0) white
        let i = 1 * 4;
        tex.pixels[i..i + 3].copy_from_slice(&[255, 255, 255]);
        // Halfway between texel centres (0.5, 0.5) and (1.5, 0.5)
        let c = tex.sample_bilinear(1.0, 0.5);
        assert!((c.r as i32 - 128).abs() <= 1, "r = {}", c.r);
    }

    #[test]
    fn painted_texture_has_background_and_emblems() {
        let palette = Palette::default();
        let tex = SourceTexture::painted(&palette, Emblem::Circle, None);
        // Corner is background
        assert_eq!(tex.sample_bilinear(2.0, 2.0), palette.background);
        // Centre of the first emblem anchor is accent
        let (ax, ay) = EMBLEM_ANCHORS[0];
        let c = tex.sample_bilinear(ax * ART_SCALE, ay * ART_SCALE);
        assert_eq!(c, palette.accent);
    }

    #[test]
    fn ring_emblem_keeps_background_in_its_hole() {
        let palette = Palette::default();
        let tex = SourceTexture::painted(&palette, Emblem::Ring, None);
        let (ax, ay) = EMBLEM_ANCHORS[0];
        let c = tex.sample_bilinear(ax * ART_SCALE, ay * ART_SCALE);
        assert_eq!(c, palette.background);
    }

    #[test]
    fn emblem_cycle_visits_every_shape_once() {
        let mut seen = vec![Emblem::Star5];
        let mut e = Emblem::Star5;
        loop {
            e = e.next();
            if e == Emblem::Star5 {
                break;
            }
            seen.push(e);
        }
        assert_eq!(seen.len(), Emblem::ALL.len());
    }
}
