//! Per-frame render passes
//!
//! Each visual layer is a content generator plus an optional dither
//! post-filter. Unfiltered layers draw straight into the output surface;
//! filtered layers render into a scratch surface, get dithered there, and
//! composite on top. The three layers (texture, shadow, outline) route
//! through the same pipeline.

use crate::source::SourceTexture;

use super::dither::{quantize_colors, threshold_alpha, ThresholdMatrix};
use super::mesh::Grid;
use super::raster::{draw_textured_tri, polygon_coverage, Color, Framebuffer};
use super::{COLS, ROWS};

/// Post-filter applied to a finished layer before compositing.
pub enum LayerFilter {
    Direct,
    ColorQuantize {
        matrix: &'static ThresholdMatrix,
        levels: u32,
    },
    AlphaScreen {
        matrix: &'static ThresholdMatrix,
        density: f32,
    },
}

/// Run one layer through the pipeline: generate content, filter, composite.
pub fn render_layer<F>(
    target: &mut Framebuffer,
    scratch: &mut Framebuffer,
    filter: LayerFilter,
    draw: F,
) where
    F: FnOnce(&mut Framebuffer),
{
    match filter {
        LayerFilter::Direct => draw(target),
        LayerFilter::ColorQuantize { matrix, levels } => {
            scratch.resize(target.width, target.height);
            scratch.clear();
            draw(scratch);
            quantize_colors(scratch, matrix, levels);
            target.composite(scratch);
        }
        LayerFilter::AlphaScreen { matrix, density } => {
            scratch.resize(target.width, target.height);
            scratch.clear();
            draw(scratch);
            threshold_alpha(scratch, matrix, density);
            target.composite(scratch);
        }
    }
}

/// Texture pass: two affine-mapped triangles per grid cell, top-left and
/// bottom-right split. This is the dominant per-frame cost.
pub fn texture_pass(fb: &mut Framebuffer, grid: &Grid, src: &SourceTexture) {
    for r in 0..ROWS {
        for c in 0..COLS {
            let [p00, p10, p01, p11] = grid.quad(r, c);
            draw_textured_tri(fb, src, &p00, &p10, &p11);
            draw_textured_tri(fb, src, &p00, &p11, &p01);
        }
    }
}

/// Compression ratio below which a cell gets shadowed.
const SHADE_THRESHOLD: f32 = 0.99;
/// Global damping of shadow opacity.
const SHADE_OPACITY: f32 = 0.75;

/// Shadow alpha factor for a signed-area ratio: zero at ratio 1.0,
/// saturating as the cell collapses.
pub fn shade_intensity(ratio: f32) -> f32 {
    (1.0 - ratio).clamp(0.0, 1.0)
}

/// Shading pass: flat semi-transparent quads wherever the fabric
/// compresses. Quads paint independently; overlap is not corrected.
pub fn shading_pass(
    fb: &mut Framebuffer,
    grid: &Grid,
    orig_area: f32,
    shading: f32,
    shadow_color: Color,
) {
    for r in 0..ROWS {
        for c in 0..COLS {
            let ratio = grid.quad_area(r, c) / orig_area;
            if ratio < SHADE_THRESHOLD {
                let alpha = shading * shade_intensity(ratio) * SHADE_OPACITY;
                let [p00, p10, p01, p11] = grid.quad(r, c);
                let quad = vec![
                    (p00.sx, p00.sy),
                    (p10.sx, p10.sy),
                    (p11.sx, p11.sy),
                    (p01.sx, p01.sy),
                ];
                fb.fill_polygon(&[quad], shadow_color.faded(alpha));
            }
        }
    }
}

/// Outline pass: stroke the mesh perimeter at twice the outline parameter
/// with round joins, clipped so only the part outside the flag's own
/// silhouette survives (an even-odd XOR of the full surface against the
/// perimeter path).
pub fn outline_pass(fb: &mut Framebuffer, grid: &Grid, outline: f32) {
    let perim = grid.perimeter();
    let inside = polygon_coverage(&[perim.clone()], fb.width, fb.height);
    fb.set_clip(inside.iter().map(|&covered| !covered).collect());
    fb.stroke_closed_polyline(&perim, outline * 2.0, Color::WHITE);
    fb.clear_clip();
}
