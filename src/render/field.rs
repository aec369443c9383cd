//! Procedural displacement field
//!
//! Pure function of (surface position, time, parameters). The flag is
//! anchored at nx=0 and free at nx=1; every animated layer is a closed-form
//! sum of sines, so the same inputs always give the same offsets.

use super::TAU;

/// Wave and deformation inputs to the displacement field.
///
/// All magnitudes are in pixels except `freq` (cycles across the flag),
/// `angle` (degrees) and the unitless `chaos` / `crinkle` factors. `droop`
/// is signed: negative lifts the free edge.
#[derive(Debug, Clone, Copy)]
pub struct WaveParams {
    pub amp: f32,
    pub freq: f32,
    pub angle: f32,
    pub chaos: f32,
    pub hfold: f32,
    pub vfold: f32,
    pub droop: f32,
    pub crinkle: f32,
}

/// Crinkle contributes at most this many pixels per unit of the parameter.
const CRINKLE_SCALE: f32 = 20.0;

/// Displacement in pixels for a normalised surface point (nx, ny in 0..1)
/// at time `t`.
///
/// Layers, summed independently:
///   1. Primary wave    - travels along the wind angle, displaces perpendicular
///   2. Second harmonic - sqrt(3) frequency ratio, never exactly repeats
///   3. Chaos field     - diagonal 2-D waves in screen x/y
///   4. H fold          - lateral wave driven by ny (strips slide sideways)
///   5. V fold          - vertical wave driven by nx (transpose of H fold)
///   6. Droop           - static sag growing toward the free end
///   7. Crinkle         - high-frequency micro-waves for fabric texture
pub fn displace(nx: f32, ny: f32, t: f32, w: &WaveParams) -> (f32, f32) {
    let theta = w.angle * TAU / 360.0;

    // Envelope: anchored at the pole, free at the right edge
    let env = nx.powf(0.6);

    // Wave phase along the travel direction (cos theta, sin theta)
    let proj = nx * theta.cos() + ny * theta.sin();
    let phase = w.freq * proj * TAU - t;
    let phase2 = w.freq * 1.732 * proj * TAU - t * 1.28;

    let p = phase.sin();
    let q = 0.30 * phase2.sin();

    // Displacement is perpendicular to travel, so rotating the wind angle
    // rotates the direction the fabric flaps
    let perp_x = -theta.sin();
    let perp_y = theta.cos();

    // Chaos: 2-D diagonal waves, always in screen x/y space
    let cx = (w.freq * 1.91 * ny * TAU + t * 0.82).sin()
        * (w.freq * 1.37 * nx * TAU - t * 0.56).cos();
    let cy = (w.freq * 1.61 * (nx + ny * 0.68) * TAU - t * 1.04).sin()
        * (w.freq * 2.13 * ny * TAU + t * 0.73).cos();

    // H fold: lateral (x) wave driven by vertical position; neighbouring
    // vertical strips slide in opposite directions and cross over
    let fx = (w.freq * 0.77 * ny * TAU - t * 0.88).sin()
        * (0.65 + 0.35 * (w.freq * 0.51 * nx * TAU + t * 0.31).cos())
        + 0.38
            * (w.freq * 1.23 * ny * TAU + t * 0.63).sin()
            * (w.freq * 0.89 * (nx + ny * 0.42) * TAU - t * 0.47).cos();

    // V fold: vertical (y) wave driven by horizontal position
    let gy = (w.freq * 0.82 * nx * TAU - t * 0.96).sin()
        * (0.65 + 0.35 * (w.freq * 0.56 * ny * TAU + t * 0.33).cos())
        + 0.38
            * (w.freq * 1.19 * nx * TAU + t * 0.71).sin()
            * (w.freq * 0.87 * (nx * 0.44 + ny) * TAU - t * 0.52).cos();

    // Crinkle: high-frequency micro-waves layered on top
    let cr_x = (w.freq * 5.7 * nx * TAU - t * 2.1).sin()
        * (w.freq * 4.3 * ny * TAU + t * 1.8).cos();
    let cr_y = (w.freq * 6.1 * ny * TAU + t * 1.9).sin()
        * (w.freq * 5.2 * nx * TAU - t * 2.3).cos();

    // Droop: static, time-independent sag
    let droop_env = nx.powf(0.8);

    let dx = w.amp * (env * (p + q) * perp_x + w.chaos * cx)
        + w.hfold * fx
        + w.crinkle * CRINKLE_SCALE * cr_x;
    let dy = w.amp * (env * (p + q) * perp_y + w.chaos * cy)
        + w.vfold * gy
        + w.droop * droop_env
        + w.crinkle * CRINKLE_SCALE * cr_y;

    (dx, dy)
}
