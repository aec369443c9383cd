//! Software raster surface and drawing primitives
//!
//! Everything renders into straight-alpha RGBA framebuffers. Layers draw
//! with source-over blending; the textured flag itself is opaque so its
//! triangles simply overwrite.

use serde::{Deserialize, Serialize};

use crate::source::SourceTexture;

use super::mesh::GridPoint;

/// RGBA color (0-255 per channel, straight alpha)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with its alpha scaled by `f` (0.0-1.0).
    pub fn faded(self, f: f32) -> Self {
        Self {
            a: (self.a as f32 * f.clamp(0.0, 1.0)).round() as u8,
            ..self
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A resizable RGBA surface with an optional write mask standing in for a
/// canvas clip region.
pub struct Framebuffer {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    clip: Option<Vec<bool>>,
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 4],
            width,
            height,
            clip: None,
        }
    }

    /// Reallocate only when dimensions actually change; contents are
    /// undefined afterwards (callers clear before drawing).
    pub fn resize(&mut self, width: usize, height: usize) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width * height * 4];
        }
    }

    /// Clear to fully transparent.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Restrict subsequent writes to pixels where `mask` is true. The mask
    /// must cover the whole surface.
    pub fn set_clip(&mut self, mask: Vec<bool>) {
        debug_assert_eq!(mask.len(), self.width * self.height);
        self.clip = Some(mask);
    }

    pub fn clear_clip(&mut self) {
        self.clip = None;
    }

    fn writable(&self, idx: usize) -> bool {
        match &self.clip {
            Some(mask) => mask[idx],
            None => true,
        }
    }

    /// Overwrite a pixel (no blending).
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            if self.writable(idx) {
                self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
            }
        }
    }

    /// Source-over blend a pixel onto the surface.
    pub fn blend_pixel(&mut self, x: usize, y: usize, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y * self.width + x;
        if !self.writable(idx) {
            return;
        }
        if color.a == 255 {
            self.pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_bytes());
            return;
        }
        if color.a == 0 {
            return;
        }
        let i = idx * 4;
        let sa = color.a as f32 / 255.0;
        let da = self.pixels[i + 3] as f32 / 255.0;
        let oa = sa + da * (1.0 - sa);
        if oa <= 0.0 {
            return;
        }
        let blend = |s: u8, d: u8| -> u8 {
            let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / oa;
            v.round().clamp(0.0, 255.0) as u8
        };
        self.pixels[i] = blend(color.r, self.pixels[i]);
        self.pixels[i + 1] = blend(color.g, self.pixels[i + 1]);
        self.pixels[i + 2] = blend(color.b, self.pixels[i + 2]);
        self.pixels[i + 3] = (oa * 255.0).round() as u8;
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        let i = (y * self.width + x) * 4;
        Color::with_alpha(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        )
    }

    /// Source-over composite another surface of identical size onto this one.
    pub fn composite(&mut self, layer: &Framebuffer) {
        debug_assert_eq!((self.width, self.height), (layer.width, layer.height));
        for y in 0..self.height {
            for x in 0..self.width {
                let c = layer.get_pixel(x, y);
                if c.a != 0 {
                    self.blend_pixel(x, y, c);
                }
            }
        }
    }

    /// Fill a polygon (possibly multiple contours) under the even-odd rule.
    pub fn fill_polygon(&mut self, contours: &[Vec<(f32, f32)>], color: Color) {
        let (y0, y1) = match vertical_extent(contours, self.height) {
            Some(range) => range,
            None => return,
        };
        let mut xs: Vec<f32> = Vec::new();
        for y in y0..y1 {
            scanline_crossings(contours, y as f32 + 0.5, &mut xs);
            for pair in xs.chunks_exact(2) {
                let x_start = (pair[0] - 0.5).ceil().max(0.0) as usize;
                let x_end = ((pair[1] - 0.5).floor() as isize + 1).max(0) as usize;
                for x in x_start..x_end.min(self.width) {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }

    /// Fill a disc centred on (cx, cy).
    pub fn fill_disc(&mut self, cx: f32, cy: f32, radius: f32, color: Color) {
        if radius <= 0.0 {
            return;
        }
        let r_sq = radius * radius;
        let y0 = (cy - radius).floor().max(0.0) as usize;
        let y1 = ((cy + radius).ceil() as isize + 1).max(0) as usize;
        let x0 = (cx - radius).floor().max(0.0) as usize;
        let x1 = ((cx + radius).ceil() as isize + 1).max(0) as usize;
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r_sq {
                    self.blend_pixel(x, y, color);
                }
            }
        }
    }

    /// Stroke a closed polyline with round joins: each segment is a filled
    /// quad, each vertex a disc of half the stroke width.
    pub fn stroke_closed_polyline(&mut self, pts: &[(f32, f32)], width: f32, color: Color) {
        if pts.len() < 2 || width <= 0.0 {
            return;
        }
        let half = width / 2.0;
        for i in 0..pts.len() {
            let (x0, y0) = pts[i];
            let (x1, y1) = pts[(i + 1) % pts.len()];
            let dx = x1 - x0;
            let dy = y1 - y0;
            let len = (dx * dx + dy * dy).sqrt();
            if len > 1e-3 {
                let px = -dy / len * half;
                let py = dx / len * half;
                let quad = vec![
                    (x0 + px, y0 + py),
                    (x1 + px, y1 + py),
                    (x1 - px, y1 - py),
                    (x0 - px, y0 - py),
                ];
                self.fill_polygon(&[quad], color);
            }
            self.fill_disc(x0, y0, half, color);
        }
    }
}

/// Even-odd coverage of a polygon, one flag per pixel. Used to build clip
/// masks from the flag silhouette.
pub fn polygon_coverage(
    contours: &[Vec<(f32, f32)>],
    width: usize,
    height: usize,
) -> Vec<bool> {
    let mut mask = vec![false; width * height];
    let (y0, y1) = match vertical_extent(contours, height) {
        Some(range) => range,
        None => return mask,
    };
    let mut xs: Vec<f32> = Vec::new();
    for y in y0..y1 {
        scanline_crossings(contours, y as f32 + 0.5, &mut xs);
        for pair in xs.chunks_exact(2) {
            let x_start = (pair[0] - 0.5).ceil().max(0.0) as usize;
            let x_end = ((pair[1] - 0.5).floor() as isize + 1).max(0) as usize;
            for x in x_start..x_end.min(width) {
                mask[y * width + x] = true;
            }
        }
    }
    mask
}

fn vertical_extent(contours: &[Vec<(f32, f32)>], height: usize) -> Option<(usize, usize)> {
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for contour in contours {
        for &(_, y) in contour {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }
    if !min_y.is_finite() {
        return None;
    }
    let y0 = min_y.floor().max(0.0) as usize;
    let y1 = ((max_y.ceil() as isize + 1).max(0) as usize).min(height);
    (y0 < y1).then_some((y0, y1))
}

/// X positions where contour edges cross the horizontal line at `sy`,
/// sorted. Consecutive pairs bound the even-odd interior.
fn scanline_crossings(contours: &[Vec<(f32, f32)>], sy: f32, xs: &mut Vec<f32>) {
    xs.clear();
    for contour in contours {
        let n = contour.len();
        for i in 0..n {
            let (x0, y0) = contour[i];
            let (x1, y1) = contour[(i + 1) % n];
            // Half-open interval so shared vertices count once
            if (y0 <= sy && sy < y1) || (y1 <= sy && sy < y0) {
                xs.push(x0 + (sy - y0) * (x1 - x0) / (y1 - y0));
            }
        }
    }
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
}

/// The 2-D affine transform taking texture coordinates to screen
/// coordinates: `x = a*u + c*v + e`, `y = b*u + d*v + f`.
#[derive(Debug, Clone, Copy)]
pub struct AffineMap {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

/// Degenerate triangles in texture space are skipped below this
/// determinant magnitude.
const DEGENERATE_EPS: f32 = 0.001;

impl AffineMap {
    /// Solve the unique affine transform satisfying all three
    /// (texture, screen) correspondences. Returns `None` for a degenerate
    /// (near-collinear) triangle, which contributes no visible area.
    pub fn from_correspondences(p0: &GridPoint, p1: &GridPoint, p2: &GridPoint) -> Option<Self> {
        let denom = (p0.u - p2.u) * (p1.v - p2.v) - (p1.u - p2.u) * (p0.v - p2.v);
        if denom.abs() < DEGENERATE_EPS {
            return None;
        }
        let a = ((p0.sx - p2.sx) * (p1.v - p2.v) - (p1.sx - p2.sx) * (p0.v - p2.v)) / denom;
        let b = ((p0.sy - p2.sy) * (p1.v - p2.v) - (p1.sy - p2.sy) * (p0.v - p2.v)) / denom;
        let c = ((p0.u - p2.u) * (p1.sx - p2.sx) - (p1.u - p2.u) * (p0.sx - p2.sx)) / denom;
        let d = ((p0.u - p2.u) * (p1.sy - p2.sy) - (p1.u - p2.u) * (p0.sy - p2.sy)) / denom;
        let e = p0.sx - a * p0.u - c * p0.v;
        let f = p0.sy - b * p0.u - d * p0.v;
        Some(Self { a, b, c, d, e, f })
    }

    pub fn apply(&self, u: f32, v: f32) -> (f32, f32) {
        (
            self.a * u + self.c * v + self.e,
            self.b * u + self.d * v + self.f,
        )
    }

    /// Inverse transform (screen back to texture space); `None` if the
    /// screen triangle has collapsed.
    pub fn invert(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-6 {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Self {
            a,
            b,
            c,
            d,
            e: -(a * self.e + c * self.f),
            f: -(b * self.e + d * self.f),
        })
    }
}

/// Map the source texture through the triangle's affine transform, clipped
/// to the triangle. Pixels take the bilinearly-filtered source sample at
/// the inverse-mapped texture position.
pub fn draw_textured_tri(
    fb: &mut Framebuffer,
    src: &SourceTexture,
    p0: &GridPoint,
    p1: &GridPoint,
    p2: &GridPoint,
) {
    let forward = match AffineMap::from_correspondences(p0, p1, p2) {
        Some(m) => m,
        None => return,
    };
    let inverse = match forward.invert() {
        Some(m) => m,
        None => return,
    };

    let min_x = p0.sx.min(p1.sx).min(p2.sx).max(0.0) as usize;
    let max_x = ((p0.sx.max(p1.sx).max(p2.sx) + 1.0) as usize).min(fb.width);
    let min_y = p0.sy.min(p1.sy).min(p2.sy).max(0.0) as usize;
    let max_y = ((p0.sy.max(p1.sy).max(p2.sy) + 1.0) as usize).min(fb.height);

    // Screen-space edge setup (same form as texture-space, different plane)
    let d = (p1.sy - p2.sy) * (p0.sx - p2.sx) + (p2.sx - p1.sx) * (p0.sy - p2.sy);
    if d.abs() < 1e-4 {
        return;
    }

    const EDGE_ERR: f32 = -0.0001;
    for y in min_y..max_y {
        let py = y as f32 + 0.5;
        for x in min_x..max_x {
            let px = x as f32 + 0.5;
            let w0 = ((p1.sy - p2.sy) * (px - p2.sx) + (p2.sx - p1.sx) * (py - p2.sy)) / d;
            let w1 = ((p2.sy - p0.sy) * (px - p2.sx) + (p0.sx - p2.sx) * (py - p2.sy)) / d;
            let w2 = 1.0 - w0 - w1;
            if w0 >= EDGE_ERR && w1 >= EDGE_ERR && w2 >= EDGE_ERR {
                let (u, v) = inverse.apply(px, py);
                fb.set_pixel(x, y, src.sample_bilinear(u, v));
            }
        }
    }
}
