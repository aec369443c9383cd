//! Emblem shape generators
//!
//! Each generator returns polygon contours in source-texture pixel space,
//! filled under the even-odd rule. Curved shapes are flattened to short
//! segments; at emblem scale the facets are invisible.

use std::f32::consts::PI;

pub type Contour = Vec<(f32, f32)>;

/// Regular n-gon with one vertex at angle `rot`.
pub fn regular_polygon(cx: f32, cy: f32, r: f32, n: usize, rot: f32) -> Contour {
    (0..n)
        .map(|i| {
            let a = rot + i as f32 / n as f32 * 2.0 * PI;
            (cx + r * a.cos(), cy + r * a.sin())
        })
        .collect()
}

pub fn circle(cx: f32, cy: f32, r: f32) -> Contour {
    regular_polygon(cx, cy, r, 64, 0.0)
}

/// Star with `points` tips alternating between outer and inner radius,
/// first tip pointing up.
pub fn star(cx: f32, cy: f32, outer: f32, inner: f32, points: usize) -> Contour {
    (0..points * 2)
        .map(|i| {
            let a = -PI / 2.0 + i as f32 / (points * 2) as f32 * 2.0 * PI;
            let rad = if i % 2 == 0 { outer } else { inner };
            (cx + rad * a.cos(), cy + rad * a.sin())
        })
        .collect()
}

/// The classic parametric heart (16 sin^3 curve), 72 segments.
pub fn heart(cx: f32, cy: f32, r: f32) -> Contour {
    let scale = r / 16.0;
    (0..=72)
        .map(|i| {
            let t = i as f32 / 72.0 * 2.0 * PI;
            let hx = 16.0 * t.sin().powi(3);
            let hy = 13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos() - (4.0 * t).cos();
            (cx + hx * scale, cy - (hy + 2.75) * scale)
        })
        .collect()
}

/// Annulus: outer circle plus an inner circle at 0.48 r, even-odd.
pub fn ring(cx: f32, cy: f32, r: f32) -> Vec<Contour> {
    vec![circle(cx, cy, r), circle(cx, cy, r * 0.48)]
}

/// Greek cross with arm half-width 0.34 r.
pub fn cross(cx: f32, cy: f32, r: f32) -> Contour {
    let t = r * 0.34;
    vec![
        (cx - t, cy - r),
        (cx + t, cy - r),
        (cx + t, cy - t),
        (cx + r, cy - t),
        (cx + r, cy + t),
        (cx + t, cy + t),
        (cx + t, cy + r),
        (cx - t, cy + r),
        (cx - t, cy + t),
        (cx - r, cy + t),
        (cx - r, cy - t),
        (cx - t, cy - t),
    ]
}

/// Upward arrow: stem half-width 0.32 r, head depth 0.52 r.
pub fn arrow(cx: f32, cy: f32, r: f32) -> Contour {
    let stem = r * 0.32;
    let head = r * 0.52;
    vec![
        (cx, cy - r),
        (cx + r, cy - r + head),
        (cx + stem, cy - r + head),
        (cx + stem, cy + r),
        (cx - stem, cy + r),
        (cx - stem, cy - r + head),
        (cx - r, cy - r + head),
    ]
}
