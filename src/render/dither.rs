//! Ordered dithering
//!
//! Quantizes a raster layer against a tileable threshold matrix. Two modes:
//! color quantization (posterize RGB to a fixed number of levels) and a
//! binary alpha screen (used for halftone-style shadow and outline fills).
//! Fully transparent pixels are always passed through untouched.

use serde::{Deserialize, Serialize};

use super::raster::Framebuffer;

/// Square matrix of integer thresholds in [0, n*n), tiled over the surface.
pub struct ThresholdMatrix {
    pub cells: &'static [&'static [u8]],
}

impl ThresholdMatrix {
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Normalised threshold for a pixel, centred within its quantization
    /// bucket: (cell + 0.5) / n^2.
    pub fn threshold(&self, x: usize, y: usize) -> f32 {
        let n = self.size();
        (self.cells[y % n][x % n] as f32 + 0.5) / (n * n) as f32
    }
}

// Dispersed-dot Bayer matrices
pub static BAYER2: ThresholdMatrix = ThresholdMatrix {
    cells: &[&[0, 2], &[3, 1]],
};

pub static BAYER4: ThresholdMatrix = ThresholdMatrix {
    cells: &[
        &[0, 8, 2, 10],
        &[12, 4, 14, 6],
        &[3, 11, 1, 9],
        &[15, 7, 13, 5],
    ],
};

pub static BAYER8: ThresholdMatrix = ThresholdMatrix {
    cells: &[
        &[0, 32, 8, 40, 2, 34, 10, 42],
        &[48, 16, 56, 24, 50, 18, 58, 26],
        &[12, 44, 4, 36, 14, 46, 6, 38],
        &[60, 28, 52, 20, 62, 30, 54, 22],
        &[3, 35, 11, 43, 1, 33, 9, 41],
        &[51, 19, 59, 27, 49, 17, 57, 25],
        &[15, 47, 7, 39, 13, 45, 5, 37],
        &[63, 31, 55, 23, 61, 29, 53, 21],
    ],
};

/// 4x4 clustered dot: pixels grow from the cell centre outward, the print
/// halftone look.
pub static DOT4: ThresholdMatrix = ThresholdMatrix {
    cells: &[
        &[12, 4, 5, 13],
        &[6, 0, 1, 8],
        &[7, 2, 3, 9],
        &[14, 10, 11, 15],
    ],
};

/// Horizontal line screen: full rows switch on together.
pub static HLINES: ThresholdMatrix = ThresholdMatrix {
    cells: &[
        &[0, 0, 0, 0, 0, 0, 0, 0],
        &[8, 8, 8, 8, 8, 8, 8, 8],
        &[16, 16, 16, 16, 16, 16, 16, 16],
        &[24, 24, 24, 24, 24, 24, 24, 24],
        &[32, 32, 32, 32, 32, 32, 32, 32],
        &[40, 40, 40, 40, 40, 40, 40, 40],
        &[48, 48, 48, 48, 48, 48, 48, 48],
        &[56, 56, 56, 56, 56, 56, 56, 56],
    ],
};

/// 45-degree diagonal line screen.
pub static DLINES: ThresholdMatrix = ThresholdMatrix {
    cells: &[
        &[0, 8, 16, 24, 32, 40, 48, 56],
        &[56, 0, 8, 16, 24, 32, 40, 48],
        &[48, 56, 0, 8, 16, 24, 32, 40],
        &[40, 48, 56, 0, 8, 16, 24, 32],
        &[32, 40, 48, 56, 0, 8, 16, 24],
        &[24, 32, 40, 48, 56, 0, 8, 16],
        &[16, 24, 32, 40, 48, 56, 0, 8],
        &[8, 16, 24, 32, 40, 48, 56, 0],
    ],
};

/// Per-layer dither selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DitherMode {
    #[default]
    None,
    Bayer2,
    Bayer4,
    Bayer8,
    Dot4,
    HLines,
    DLines,
}

impl DitherMode {
    pub const ALL: [DitherMode; 7] = [
        DitherMode::None,
        DitherMode::Bayer2,
        DitherMode::Bayer4,
        DitherMode::Bayer8,
        DitherMode::Dot4,
        DitherMode::HLines,
        DitherMode::DLines,
    ];

    pub fn matrix(self) -> Option<&'static ThresholdMatrix> {
        match self {
            DitherMode::None => None,
            DitherMode::Bayer2 => Some(&BAYER2),
            DitherMode::Bayer4 => Some(&BAYER4),
            DitherMode::Bayer8 => Some(&BAYER8),
            DitherMode::Dot4 => Some(&DOT4),
            DitherMode::HLines => Some(&HLINES),
            DitherMode::DLines => Some(&DLINES),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DitherMode::None => "none",
            DitherMode::Bayer2 => "bayer 2x2",
            DitherMode::Bayer4 => "bayer 4x4",
            DitherMode::Bayer8 => "bayer 8x8",
            DitherMode::Dot4 => "dot 4x4",
            DitherMode::HLines => "h-lines",
            DitherMode::DLines => "d-lines",
        }
    }
}

/// Posterize each RGB channel to `levels` values, offsetting by the
/// per-pixel threshold before flooring. Alpha is untouched; transparent
/// pixels are skipped.
pub fn quantize_colors(fb: &mut Framebuffer, matrix: &ThresholdMatrix, levels: u32) {
    let levels = levels.max(2);
    let scale = 1.0 / (levels - 1) as f32;
    for y in 0..fb.height {
        for x in 0..fb.width {
            let i = (y * fb.width + x) * 4;
            if fb.pixels[i + 3] == 0 {
                continue;
            }
            let t = matrix.threshold(x, y);
            for c in 0..3 {
                let val = fb.pixels[i + c] as f32 / 255.0;
                let q = ((val / scale + t).floor() * scale).clamp(0.0, 1.0);
                fb.pixels[i + c] = (q * 255.0).round() as u8;
            }
        }
    }
}

/// Binary alpha screen: a pixel becomes fully opaque where its alpha times
/// `density` reaches the local threshold, fully transparent otherwise.
pub fn threshold_alpha(fb: &mut Framebuffer, matrix: &ThresholdMatrix, density: f32) {
    for y in 0..fb.height {
        for x in 0..fb.width {
            let i = (y * fb.width + x) * 4;
            if fb.pixels[i + 3] == 0 {
                continue;
            }
            let t = matrix.threshold(x, y);
            let a = fb.pixels[i + 3] as f32 / 255.0;
            fb.pixels[i + 3] = if a * density >= t { 255 } else { 0 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::raster::Color;

    /// 1x1 matrix whose only threshold lands exactly mid-bucket.
    static NOOP: ThresholdMatrix = ThresholdMatrix { cells: &[&[0]] };

    #[test]
    fn noop_matrix_at_full_levels_is_identity() {
        let mut fb = Framebuffer::new(16, 1);
        for x in 0..16 {
            let v = (x * 17) as u8;
            fb.set_pixel(x, 0, Color::new(v, v.wrapping_add(3), 255 - v));
        }
        let before = fb.pixels.clone();
        quantize_colors(&mut fb, &NOOP, 256);
        assert_eq!(fb.pixels, before);
    }

    #[test]
    fn two_levels_posterizes_to_extremes() {
        let mut fb = Framebuffer::new(2, 2);
        for y in 0..2 {
            for x in 0..2 {
                fb.set_pixel(x, y, Color::new(128, 128, 128));
            }
        }
        quantize_colors(&mut fb, &BAYER2, 2);
        for y in 0..2 {
            for x in 0..2 {
                let c = fb.get_pixel(x, y);
                assert!(c.r == 0 || c.r == 255);
            }
        }
        // Mid-gray against Bayer 2x2 turns on exactly half the cells
        let on = (0..2)
            .flat_map(|y| (0..2).map(move |x| (x, y)))
            .filter(|&(x, y)| fb.get_pixel(x, y).r == 255)
            .count();
        assert_eq!(on, 2);
    }

    #[test]
    fn transparent_pixels_are_skipped() {
        let mut fb = Framebuffer::new(4, 4);
        quantize_colors(&mut fb, &BAYER4, 2);
        assert!(fb.pixels.iter().all(|&b| b == 0));
        threshold_alpha(&mut fb, &BAYER4, 1.0);
        assert!(fb.pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn alpha_screen_is_binary() {
        let mut fb = Framebuffer::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                fb.set_pixel(x, y, Color::with_alpha(10, 10, 10, (x * 30 + y) as u8));
            }
        }
        threshold_alpha(&mut fb, &BAYER8, 0.8);
        for y in 0..8 {
            for x in 0..8 {
                let a = fb.get_pixel(x, y).a;
                assert!(a == 0 || a == 255, "alpha {} is not binary", a);
            }
        }
    }

    #[test]
    fn density_zero_blanks_the_layer() {
        let mut fb = Framebuffer::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                fb.set_pixel(x, y, Color::WHITE);
            }
        }
        threshold_alpha(&mut fb, &DOT4, 0.0);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(fb.get_pixel(x, y).a, 0);
            }
        }
    }

    #[test]
    fn matrices_cover_their_value_range() {
        for (m, n) in [(&BAYER2, 2usize), (&BAYER4, 4), (&BAYER8, 8), (&DOT4, 4)] {
            let max = (n * n) as u8;
            let mut seen = vec![false; max as usize];
            for row in m.cells {
                assert_eq!(row.len(), n);
                for &v in *row {
                    assert!(v < max);
                    seen[v as usize] = true;
                }
            }
            // Dispersed and clustered matrices are permutations of 0..n^2
            assert!(seen.iter().all(|&s| s));
        }
    }
}
