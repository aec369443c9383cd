//! Pennon: animated cloth-flag renderer
//!
//! A software renderer for a waving flag:
//! - Closed-form wave displacement over a fixed vertex lattice
//! - Per-triangle affine texture mapping
//! - Compression shading, silhouette outline, ordered dithering
//!
//! All pixels come out of a CPU framebuffer; the GPU only blits it.

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod render;
mod session;
mod shapes;
mod source;

use std::path::{Path, PathBuf};

use macroquad::prelude::*;

use render::DitherMode;
use session::{load_preset, save_preset, Playback, Preset, Session};
use source::{Palette, SourceTexture};

/// Flag size as a fraction of the window.
const VIEW_FRACTION: f32 = 0.75;

const PRESET_PATH: &str = "flag.ron";

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Pennon v{}", VERSION),
        window_width: 1280,
        window_height: 800,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    let mut session = Session::new();

    // A preset on the command line is restored once startup loads finish
    if let Some(arg) = std::env::args().nth(1) {
        match load_preset(&PathBuf::from(&arg)) {
            Ok(preset) => {
                println!("Queued preset {}", arg);
                session.set_pending_preset(preset);
            }
            Err(e) => eprintln!("{}", e),
        }
    }

    // Optional banner artwork underneath the painted emblems
    let raster = match load_file("assets/banner.png").await {
        Ok(bytes) => SourceTexture::from_png_bytes(&bytes),
        Err(e) => Err(format!("No banner artwork: {}", e)),
    };
    session.raster_loaded(raster);

    // Optional palette definition
    let palette = match load_string("assets/palette.ron").await {
        Ok(text) => match ron::from_str::<Palette>(&text) {
            Ok(p) => Some(p),
            Err(e) => {
                eprintln!("Bad palette file: {}", e);
                None
            }
        },
        Err(_) => None,
    };
    session.palette_loaded(palette);

    println!("=== Pennon ===");
    println!("space pause/resume | r randomize | e emblem | d/o dither | s/l preset");

    let mut texture: Option<Texture2D> = None;
    let mut tex_size = (0usize, 0usize);

    loop {
        let screen_w = screen_width();
        let screen_h = screen_height();
        session.set_view_size(
            (screen_w * VIEW_FRACTION).round(),
            (screen_h * VIEW_FRACTION * 0.6).round(),
        );

        handle_input(&mut session);

        if session.step() {
            let fb = &session.frame;
            if tex_size != (fb.width, fb.height) {
                let t = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
                t.set_filter(FilterMode::Nearest);
                tex_size = (fb.width, fb.height);
                texture = Some(t);
            } else if let Some(t) = &texture {
                t.update(&Image {
                    bytes: fb.pixels.clone(),
                    width: fb.width as u16,
                    height: fb.height as u16,
                });
            }
        }

        clear_background(Color::from_rgba(18, 18, 22, 255));

        if let Some(t) = &texture {
            let x = (screen_w - t.width()) / 2.0;
            let y = (screen_h - t.height()) / 2.0;
            draw_texture(t, x.round(), y.round(), WHITE);
        }

        draw_hud(&session, screen_h);

        next_frame().await;
    }
}

fn handle_input(session: &mut Session) {
    if is_key_pressed(KeyCode::Space) {
        session.toggle_pause();
    }
    if is_key_pressed(KeyCode::R) {
        session.randomize();
    }
    if is_key_pressed(KeyCode::E) {
        session.cycle_emblem();
    }
    if is_key_pressed(KeyCode::D) {
        session.params.flag_dither = next_mode(session.params.flag_dither);
        session.mark_dirty();
    }
    if is_key_pressed(KeyCode::O) {
        let next = next_mode(session.params.shadow_dither);
        session.params.shadow_dither = next;
        session.params.outline_dither = next;
        session.mark_dirty();
    }
    if is_key_pressed(KeyCode::Up) {
        session.params.amp = (session.params.amp + 1.0).min(40.0);
        session.mark_dirty();
    }
    if is_key_pressed(KeyCode::Down) {
        session.params.amp = (session.params.amp - 1.0).max(0.0);
        session.mark_dirty();
    }
    if is_key_pressed(KeyCode::Right) {
        session.params.speed = (session.params.speed + 0.1).min(5.0);
    }
    if is_key_pressed(KeyCode::Left) {
        session.params.speed = (session.params.speed - 0.1).max(0.1);
    }
    if is_key_pressed(KeyCode::S) {
        let preset = Preset {
            params: session.params,
            time: session.time,
        };
        match save_preset(&preset, Path::new(PRESET_PATH)) {
            Ok(()) => println!("Saved {}", PRESET_PATH),
            Err(e) => eprintln!("{}", e),
        }
    }
    if is_key_pressed(KeyCode::L) {
        match load_preset(Path::new(PRESET_PATH)) {
            Ok(preset) => {
                session.apply_preset(preset);
                println!("Loaded {}", PRESET_PATH);
            }
            Err(e) => eprintln!("{}", e),
        }
    }
}

fn next_mode(mode: DitherMode) -> DitherMode {
    let i = DitherMode::ALL
        .iter()
        .position(|&m| m == mode)
        .unwrap_or(0);
    DitherMode::ALL[(i + 1) % DitherMode::ALL.len()]
}

fn draw_hud(session: &Session, screen_h: f32) {
    let state = match session.playback {
        Playback::Running => "running",
        Playback::Paused => "paused",
    };
    let line = format!(
        "{} | t {:.2} | amp {:.0} speed {:.1} | emblem {} | dither {}/{}",
        state,
        session.time,
        session.params.amp,
        session.params.speed,
        session.params.emblem.label(),
        session.params.flag_dither.label(),
        session.params.shadow_dither.label(),
    );
    draw_text(&line, 12.0, screen_h - 14.0, 20.0, GRAY);
}
