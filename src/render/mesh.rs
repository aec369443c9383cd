//! Mesh builder
//!
//! Samples the displacement field over a fixed-topology lattice. Texture
//! coordinates never move; only screen positions are displaced, which is
//! what makes the artwork appear to ripple.

use super::field::{displace, WaveParams};
use super::{COLS, ROWS, SRC_H, SRC_W};

/// One lattice vertex: displaced screen position plus its fixed texture
/// coordinate in source-pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GridPoint {
    pub sx: f32,
    pub sy: f32,
    pub u: f32,
    pub v: f32,
}

/// The full (ROWS+1) x (COLS+1) vertex lattice, rebuilt from scratch every
/// frame.
pub struct Grid {
    points: Vec<GridPoint>,
}

impl Grid {
    pub fn at(&self, r: usize, c: usize) -> GridPoint {
        self.points[r * (COLS + 1) + c]
    }

    /// The four corners of cell (r, c): top-left, top-right, bottom-left,
    /// bottom-right.
    pub fn quad(&self, r: usize, c: usize) -> [GridPoint; 4] {
        [
            self.at(r, c),
            self.at(r, c + 1),
            self.at(r + 1, c),
            self.at(r + 1, c + 1),
        ]
    }

    /// Signed area of cell (r, c) from the cross product of its two edge
    /// vectors at the top-left corner. Shrinks below the undisplaced cell
    /// area where the fabric compresses.
    pub fn quad_area(&self, r: usize, c: usize) -> f32 {
        let [p00, p10, p01, _] = self.quad(r, c);
        let ex = p10.sx - p00.sx;
        let ey = p01.sx - p00.sx;
        let fx = p10.sy - p00.sy;
        let fy = p01.sy - p00.sy;
        ex * fy - fx * ey
    }

    /// Closed perimeter polyline: top row left-to-right, right column down,
    /// bottom row right-to-left, left column back up.
    pub fn perimeter(&self) -> Vec<(f32, f32)> {
        let mut pts = Vec::with_capacity(2 * (ROWS + COLS));
        for c in 0..=COLS {
            let p = self.at(0, c);
            pts.push((p.sx, p.sy));
        }
        for r in 1..=ROWS {
            let p = self.at(r, COLS);
            pts.push((p.sx, p.sy));
        }
        for c in (0..COLS).rev() {
            let p = self.at(ROWS, c);
            pts.push((p.sx, p.sy));
        }
        for r in (1..ROWS).rev() {
            let p = self.at(r, 0);
            pts.push((p.sx, p.sy));
        }
        pts
    }
}

/// Build the vertex lattice for one frame.
///
/// `persp` linearly scales the vertical extent around the flag's centre line
/// as a function of nx - a shear approximation of the far edge tilting
/// toward or away from the viewer, not a true projection.
pub fn build_grid(
    flag_w: f32,
    flag_h: f32,
    t: f32,
    wave: &WaveParams,
    persp: f32,
    ox: f32,
    oy: f32,
) -> Grid {
    let mut points = Vec::with_capacity((ROWS + 1) * (COLS + 1));
    for r in 0..=ROWS {
        for c in 0..=COLS {
            let nx = c as f32 / COLS as f32;
            let ny = r as f32 / ROWS as f32;
            let (dx, dy) = displace(nx, ny, t, wave);
            let persp_scale = 1.0 + persp * nx;
            points.push(GridPoint {
                sx: ox + nx * flag_w + dx,
                sy: oy + flag_h * 0.5 + (ny - 0.5) * flag_h * persp_scale + dy,
                u: nx * SRC_W as f32,
                v: ny * SRC_H as f32,
            });
        }
    }
    Grid { points }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still_air() -> WaveParams {
        WaveParams {
            amp: 0.0,
            freq: 1.0,
            angle: 0.0,
            chaos: 0.0,
            hfold: 0.0,
            vfold: 0.0,
            droop: 0.0,
            crinkle: 0.0,
        }
    }

    #[test]
    fn flat_rectangle_when_undeformed() {
        let grid = build_grid(520.0, 300.0, 0.0, &still_air(), 0.0, 48.0, 48.0);
        for r in 0..=ROWS {
            for c in 0..=COLS {
                let p = grid.at(r, c);
                let nx = c as f32 / COLS as f32;
                let ny = r as f32 / ROWS as f32;
                assert!((p.sx - (48.0 + nx * 520.0)).abs() < 1e-3);
                assert!((p.sy - (48.0 + ny * 300.0)).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn texture_coordinates_are_fixed() {
        let mut wild = still_air();
        wild.amp = 40.0;
        wild.chaos = 0.1;
        wild.droop = -60.0;
        let grid = build_grid(520.0, 300.0, 3.3, &wild, 0.4, 0.0, 0.0);
        for r in 0..=ROWS {
            for c in 0..=COLS {
                let p = grid.at(r, c);
                assert_eq!(p.u, c as f32 / COLS as f32 * SRC_W as f32);
                assert_eq!(p.v, r as f32 / ROWS as f32 * SRC_H as f32);
            }
        }
    }

    #[test]
    fn rebuild_is_bit_identical() {
        let mut wave = still_air();
        wave.amp = 25.0;
        wave.crinkle = 0.05;
        let a = build_grid(500.0, 280.0, 7.25, &wave, -0.3, 10.0, 20.0);
        let b = build_grid(500.0, 280.0, 7.25, &wave, -0.3, 10.0, 20.0);
        for r in 0..=ROWS {
            for c in 0..=COLS {
                assert_eq!(a.at(r, c), b.at(r, c));
            }
        }
    }

    #[test]
    fn perspective_scales_far_edge_only() {
        let grid = build_grid(520.0, 300.0, 0.0, &still_air(), 0.5, 0.0, 0.0);
        // Anchored edge keeps the full height
        let left = grid.at(ROWS, 0).sy - grid.at(0, 0).sy;
        assert!((left - 300.0).abs() < 1e-3);
        // Free edge is stretched by 1 + persp
        let right = grid.at(ROWS, COLS).sy - grid.at(0, COLS).sy;
        assert!((right - 450.0).abs() < 1e-3);
        // Both scale about the centre line
        let mid = 0.5 * (grid.at(0, COLS).sy + grid.at(ROWS, COLS).sy);
        assert!((mid - 150.0).abs() < 1e-3);
    }

    #[test]
    fn perimeter_is_closed_loop_of_expected_length() {
        let grid = build_grid(520.0, 300.0, 0.0, &still_air(), 0.0, 0.0, 0.0);
        let perim = grid.perimeter();
        assert_eq!(perim.len(), 2 * (ROWS + COLS));
        assert_eq!(perim[0], (grid.at(0, 0).sx, grid.at(0, 0).sy));
        // Last point is one step above the start on the left column
        let last = *perim.last().unwrap();
        assert_eq!(last, (grid.at(1, 0).sx, grid.at(1, 0).sy));
    }

    #[test]
    fn quad_area_matches_cell_size_when_flat() {
        let grid = build_grid(520.0, 300.0, 0.0, &still_air(), 0.0, 0.0, 0.0);
        let orig = (520.0 / COLS as f32) * (300.0 / ROWS as f32);
        for r in 0..ROWS {
            for c in 0..COLS {
                assert!((grid.quad_area(r, c) - orig).abs() < 1e-2);
            }
        }
    }
}
