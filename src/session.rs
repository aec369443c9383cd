//! Render session
//!
//! Owns everything mutable between frames: the parameter set, the animation
//! clock, the playback state machine, the source texture, and the output
//! surfaces. The host loop drives it through setters and `step()`; nothing
//! here lives in globals.

use std::path::Path;

use macroquad::rand::gen_range;
use serde::{Deserialize, Serialize};

use crate::render::{
    build_grid, outline_pass, render_layer, shading_pass, texture_pass, Color, DitherMode,
    Framebuffer, LayerFilter, WaveParams, COLS, ROWS,
};
use crate::source::{Emblem, Palette, SourceTexture};

/// Clock advance per rendered frame, multiplied by the speed parameter.
pub const TIME_STEP: f32 = 0.022;

/// Fixed padding around the worst-case displacement extents.
pub const BASE_PAD: f32 = 48.0;

/// The full per-frame parameter set. The session does not validate ranges;
/// producers are expected to stay within the documented bounds (see
/// `RANDOM_RANGES`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlagParams {
    pub amp: f32,
    pub speed: f32,
    pub freq: f32,
    pub angle: f32,
    pub chaos: f32,
    pub hfold: f32,
    pub vfold: f32,
    pub droop: f32,
    pub crinkle: f32,
    pub shading: f32,
    pub persp: f32,
    pub outline: f32,
    pub flag_dither: DitherMode,
    pub shadow_dither: DitherMode,
    pub outline_dither: DitherMode,
    pub flag_levels: u32,
    pub dither_density: f32,
    pub shadow_color: Color,
    pub background: Color,
    pub accent: Color,
    pub emblem: Emblem,
}

impl Default for FlagParams {
    fn default() -> Self {
        let palette = Palette::default();
        Self {
            amp: 24.0,
            speed: 1.5,
            freq: 1.0,
            angle: 12.0,
            chaos: 0.05,
            hfold: 2.0,
            vfold: 2.0,
            droop: 20.0,
            crinkle: 0.05,
            shading: 0.4,
            persp: 0.0,
            outline: 2.0,
            flag_dither: DitherMode::None,
            shadow_dither: DitherMode::None,
            outline_dither: DitherMode::None,
            flag_levels: 4,
            dither_density: 1.0,
            shadow_color: Color::BLACK,
            background: palette.background,
            accent: palette.accent,
            emblem: Emblem::default(),
        }
    }
}

impl FlagParams {
    pub fn wave(&self) -> WaveParams {
        WaveParams {
            amp: self.amp,
            freq: self.freq,
            angle: self.angle,
            chaos: self.chaos,
            hfold: self.hfold,
            vfold: self.vfold,
            droop: self.droop,
            crinkle: self.crinkle,
        }
    }

    pub fn palette(&self) -> Palette {
        Palette {
            background: self.background,
            accent: self.accent,
        }
    }
}

/// Canonical randomize bounds: (min, max, step) per animated field, in
/// declaration order amp, speed, freq, angle, chaos, hfold, vfold, droop,
/// crinkle, shading, persp.
pub const RANDOM_RANGES: [(f32, f32, f32); 11] = [
    (10.0, 40.0, 1.0),
    (0.5, 5.0, 0.1),
    (0.5, 2.0, 0.5),
    (0.0, 100.0, 1.0),
    (0.0, 0.10, 0.05),
    (0.0, 5.0, 1.0),
    (0.0, 5.0, 1.0),
    (-80.0, 80.0, 1.0),
    (0.0, 0.10, 0.05),
    (0.1, 0.7, 0.05),
    (-0.5, 0.5, 0.05),
];

/// Uniform pick from the step-aligned lattice of [min, max].
fn rand_step(min: f32, max: f32, step: f32) -> f32 {
    let steps = ((max - min) / step).round();
    min + (gen_range(0.0f32, 1.0) * steps).round() * step
}

/// A saved pose: parameters plus the clock, enough to reproduce a frame
/// exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub params: FlagParams,
    pub time: f32,
}

pub fn save_preset(preset: &Preset, path: &Path) -> Result<(), String> {
    let text = ron::ser::to_string_pretty(preset, ron::ser::PrettyConfig::default())
        .map_err(|e| format!("Failed to serialize preset: {}", e))?;
    std::fs::write(path, text).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

pub fn load_preset(path: &Path) -> Result<Preset, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    ron::from_str(&text).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Running,
    Paused,
}

/// Join of the two startup loads (banner raster, palette definition). A
/// pending preset restore fires exactly once, when the second load lands,
/// regardless of completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyGate {
    #[default]
    NeitherReady,
    RasterReady,
    PaletteReady,
    BothReady,
}

impl ReadyGate {
    /// Record the raster load; true when this completes the join.
    pub fn raster_done(&mut self) -> bool {
        match self {
            ReadyGate::NeitherReady => {
                *self = ReadyGate::RasterReady;
                false
            }
            ReadyGate::PaletteReady => {
                *self = ReadyGate::BothReady;
                true
            }
            _ => false,
        }
    }

    /// Record the palette load; true when this completes the join.
    pub fn palette_done(&mut self) -> bool {
        match self {
            ReadyGate::NeitherReady => {
                *self = ReadyGate::PaletteReady;
                false
            }
            ReadyGate::RasterReady => {
                *self = ReadyGate::BothReady;
                true
            }
            _ => false,
        }
    }

    pub fn is_complete(&self) -> bool {
        *self == ReadyGate::BothReady
    }
}

pub struct Session {
    pub params: FlagParams,
    pub time: f32,
    pub playback: Playback,
    /// The composited output surface, valid after any `step()` that
    /// returned true.
    pub frame: Framebuffer,
    scratch: Framebuffer,
    dirty: bool,
    gate: ReadyGate,
    pending_preset: Option<Preset>,
    base_art: Option<SourceTexture>,
    source: Option<SourceTexture>,
    flag_w: f32,
    flag_h: f32,
}

impl Session {
    pub fn new() -> Self {
        Self {
            params: FlagParams::default(),
            time: 0.0,
            playback: Playback::Running,
            frame: Framebuffer::new(1, 1),
            scratch: Framebuffer::new(1, 1),
            dirty: false,
            gate: ReadyGate::default(),
            pending_preset: None,
            base_art: None,
            source: None,
            flag_w: 520.0,
            flag_h: 320.0,
        }
    }

    /// Flag dimensions in pixels, normally a fraction of the window.
    pub fn set_view_size(&mut self, w: f32, h: f32) {
        if (w, h) != (self.flag_w, self.flag_h) {
            self.flag_w = w;
            self.flag_h = h;
            self.dirty = true;
        }
    }

    /// A preset to restore once both startup loads have completed.
    pub fn set_pending_preset(&mut self, preset: Preset) {
        self.pending_preset = Some(preset);
    }

    /// Report the banner raster load. A decode failure keeps whatever was
    /// loaded before (initially nothing, which just means the painted
    /// artwork has no base layer) but still completes the gate.
    pub fn raster_loaded(&mut self, result: Result<SourceTexture, String>) {
        match result {
            Ok(tex) => self.base_art = Some(tex),
            Err(e) => eprintln!("Banner load failed: {}", e),
        }
        if self.gate.raster_done() {
            self.finish_gate();
        }
    }

    /// Report the palette definition load.
    pub fn palette_loaded(&mut self, palette: Option<Palette>) {
        if let Some(p) = palette {
            self.params.background = p.background;
            self.params.accent = p.accent;
        }
        if self.gate.palette_done() {
            self.finish_gate();
        }
    }

    fn finish_gate(&mut self) {
        self.rebuild_source();
        if let Some(preset) = self.pending_preset.take() {
            self.apply_preset(preset);
        }
    }

    /// Repaint the source texture from the current palette and emblem. The
    /// old texture stays valid until the swap, so an in-flight frame never
    /// sees a half-built one.
    fn rebuild_source(&mut self) {
        self.source = Some(SourceTexture::painted(
            &self.params.palette(),
            self.params.emblem,
            self.base_art.as_ref(),
        ));
        self.dirty = true;
    }

    /// Drive the session to an exact frame: pauses, installs the pose, and
    /// requests a single deterministic render.
    pub fn apply_preset(&mut self, preset: Preset) {
        self.playback = Playback::Paused;
        self.params = preset.params;
        self.time = preset.time;
        if self.gate.is_complete() {
            self.rebuild_source();
        }
        self.dirty = true;
    }

    pub fn toggle_pause(&mut self) {
        self.playback = match self.playback {
            Playback::Running => Playback::Paused,
            Playback::Paused => Playback::Running,
        };
    }

    pub fn cycle_emblem(&mut self) {
        self.params.emblem = self.params.emblem.next();
        if self.gate.is_complete() {
            self.rebuild_source();
        }
    }

    /// Request a render on the next step even while paused.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Randomize the animated parameters within their canonical ranges.
    /// Forces Paused and schedules a single clean render.
    pub fn randomize(&mut self) {
        self.playback = Playback::Paused;
        let picks: Vec<f32> = RANDOM_RANGES
            .iter()
            .map(|&(min, max, step)| rand_step(min, max, step))
            .collect();
        let p = &mut self.params;
        p.amp = picks[0];
        p.speed = picks[1];
        p.freq = picks[2];
        p.angle = picks[3];
        p.chaos = picks[4];
        p.hfold = picks[5];
        p.vfold = picks[6];
        p.droop = picks[7];
        p.crinkle = picks[8];
        p.shading = picks[9];
        p.persp = picks[10];
        self.dirty = true;
    }

    /// Advance one host frame: render if running or if something changed,
    /// then tick the clock. Returns whether a frame was rendered.
    pub fn step(&mut self) -> bool {
        match self.playback {
            Playback::Running => {
                self.dirty = false;
                self.render_frame();
                self.time += self.params.speed * TIME_STEP;
                true
            }
            Playback::Paused => {
                if self.dirty {
                    self.dirty = false;
                    self.render_frame();
                    true
                } else {
                    false
                }
            }
        }
    }

    /// One full synchronous frame: size the surface for the worst-case
    /// displacement, build the grid, then run the layer pipeline.
    pub fn render_frame(&mut self) {
        let p = self.params;
        let (flag_w, flag_h) = (self.flag_w, self.flag_h);

        let h_pad = (p.amp + p.hfold + p.crinkle * 20.0).ceil() + BASE_PAD;
        let v_pad = (p.amp + p.vfold + p.droop.abs() + p.persp.abs() * flag_h / 2.0
            + p.crinkle * 20.0)
            .ceil()
            + BASE_PAD;
        let cw = (flag_w + h_pad * 2.0).round() as usize;
        let ch = (flag_h + v_pad * 2.0).round() as usize;

        self.frame.resize(cw, ch);
        self.frame.clear();

        let src = match &self.source {
            Some(s) => s,
            // No decoded artwork yet: render nothing rather than garbage
            None => return,
        };

        let ox = h_pad;
        let oy = (ch as f32 / 2.0 - flag_h / 2.0).round();
        let grid = build_grid(flag_w, flag_h, self.time, &p.wave(), p.persp, ox, oy);
        let orig_area = (flag_w / COLS as f32) * (flag_h / ROWS as f32);

        render_layer(
            &mut self.frame,
            &mut self.scratch,
            color_filter(p.flag_dither, p.flag_levels),
            |fb| texture_pass(fb, &grid, src),
        );

        if p.shading > 0.0 {
            render_layer(
                &mut self.frame,
                &mut self.scratch,
                screen_filter(p.shadow_dither, p.dither_density),
                |fb| shading_pass(fb, &grid, orig_area, p.shading, p.shadow_color),
            );
        }

        if p.outline > 0.0 {
            render_layer(
                &mut self.frame,
                &mut self.scratch,
                screen_filter(p.outline_dither, p.dither_density),
                |fb| outline_pass(fb, &grid, p.outline),
            );
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn color_filter(mode: DitherMode, levels: u32) -> LayerFilter {
    match mode.matrix() {
        Some(matrix) => LayerFilter::ColorQuantize { matrix, levels },
        None => LayerFilter::Direct,
    }
}

fn screen_filter(mode: DitherMode, density: f32) -> LayerFilter {
    match mode.matrix() {
        Some(matrix) => LayerFilter::AlphaScreen { matrix, density },
        None => LayerFilter::Direct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::rand::srand;

    fn ready_session() -> Session {
        let mut s = Session::new();
        s.raster_loaded(Err("no banner".to_string()));
        s.palette_loaded(None);
        s
    }

    fn still_params() -> FlagParams {
        FlagParams {
            amp: 0.0,
            chaos: 0.0,
            hfold: 0.0,
            vfold: 0.0,
            droop: 0.0,
            crinkle: 0.0,
            shading: 0.0,
            persp: 0.0,
            outline: 0.0,
            ..FlagParams::default()
        }
    }

    #[test]
    fn gate_fires_once_in_either_order() {
        let mut g = ReadyGate::default();
        assert!(!g.raster_done());
        assert!(g.palette_done());
        assert!(!g.palette_done());
        assert!(!g.raster_done());
        assert!(g.is_complete());

        let mut g = ReadyGate::default();
        assert!(!g.palette_done());
        assert!(g.raster_done());
        assert!(!g.raster_done());
    }

    #[test]
    fn pending_preset_applies_after_both_loads() {
        let mut s = Session::new();
        let preset = Preset {
            params: FlagParams {
                amp: 33.0,
                ..FlagParams::default()
            },
            time: 4.5,
        };
        s.set_pending_preset(preset);
        s.palette_loaded(None);
        // Only one load in: nothing restored yet
        assert_eq!(s.playback, Playback::Running);
        s.raster_loaded(Err("missing".to_string()));
        assert_eq!(s.playback, Playback::Paused);
        assert_eq!(s.params.amp, 33.0);
        assert_eq!(s.time, 4.5);
    }

    #[test]
    fn randomize_respects_ranges_and_steps() {
        srand(7);
        let mut s = ready_session();
        for _ in 0..50 {
            s.randomize();
            let p = s.params;
            let picked = [
                p.amp, p.speed, p.freq, p.angle, p.chaos, p.hfold, p.vfold, p.droop, p.crinkle,
                p.shading, p.persp,
            ];
            for (&v, &(min, max, step)) in picked.iter().zip(RANDOM_RANGES.iter()) {
                assert!(v >= min - 1e-4 && v <= max + 1e-4, "{} out of [{}, {}]", v, min, max);
                let k = ((v - min) / step).round();
                assert!((min + k * step - v).abs() < 1e-4, "{} off the {} lattice", v, step);
            }
        }
    }

    #[test]
    fn randomize_pauses_and_renders_once() {
        srand(11);
        let mut s = ready_session();
        s.randomize();
        assert_eq!(s.playback, Playback::Paused);
        assert!(s.step());
        // Second step has nothing new to draw
        assert!(!s.step());
    }

    #[test]
    fn paused_clock_does_not_advance() {
        let mut s = ready_session();
        s.playback = Playback::Paused;
        let t = s.time;
        s.mark_dirty();
        s.step();
        s.step();
        assert_eq!(s.time, t);

        s.playback = Playback::Running;
        s.step();
        assert!((s.time - (t + s.params.speed * TIME_STEP)).abs() < 1e-6);
    }

    #[test]
    fn surface_sized_for_worst_case_displacement() {
        let mut s = Session::new();
        s.set_view_size(520.0, 320.0);
        s.params = FlagParams {
            amp: 30.0,
            hfold: 5.0,
            vfold: 3.0,
            droop: -60.0,
            crinkle: 0.1,
            persp: 0.5,
            ..FlagParams::default()
        };
        // No source yet: still sizes and clears, draws nothing
        s.render_frame();
        let h_pad = (30.0f32 + 5.0 + 0.1 * 20.0).ceil() + BASE_PAD;
        let v_pad = (30.0f32 + 3.0 + 60.0 + 0.5 * 160.0 + 2.0).ceil() + BASE_PAD;
        assert_eq!(s.frame.width, (520.0 + h_pad * 2.0) as usize);
        assert_eq!(s.frame.height, (320.0 + v_pad * 2.0) as usize);
        assert!(s.frame.pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn repeated_renders_are_identical() {
        let mut s = ready_session();
        s.playback = Playback::Paused;
        s.params.speed = 2.0;
        s.time = 3.25;
        s.render_frame();
        let first = s.frame.pixels.clone();
        s.render_frame();
        assert_eq!(s.frame.pixels, first);
    }

    #[test]
    fn zero_shading_and_outline_skip_their_passes() {
        let mut s = ready_session();
        s.playback = Playback::Paused;
        s.params = still_params();
        s.render_frame();
        let bare = s.frame.pixels.clone();

        // A flat grid never compresses, so enabling shading changes nothing
        s.params.shading = 0.5;
        s.render_frame();
        assert_eq!(s.frame.pixels, bare);

        // Enabling the outline does draw outside the silhouette
        s.params.outline = 3.0;
        s.render_frame();
        assert_ne!(s.frame.pixels, bare);
    }

    #[test]
    fn preset_round_trips_through_ron() {
        let preset = Preset {
            params: FlagParams {
                amp: 17.0,
                droop: -42.0,
                flag_dither: DitherMode::Dot4,
                emblem: Emblem::Heart,
                ..FlagParams::default()
            },
            time: 12.75,
        };
        let text = ron::ser::to_string_pretty(&preset, ron::ser::PrettyConfig::default()).unwrap();
        let back: Preset = ron::from_str(&text).unwrap();
        assert_eq!(back.params, preset.params);
        assert_eq!(back.time, preset.time);
    }
}
