//! Tile PPU binary.
//!
//! Renders the demo scene (or a JSON scene file) headless. Can time a run of
//! frames, save a screenshot, and dump a tile sheet.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]

use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use tile_ppu::{
    FOREGROUND_PALETTE_BASE, RenderConfig, Renderer, SCREEN_HEIGHT, SCREEN_PIXELS, SCREEN_WIDTH,
    Scene, StrategyPreference, TileSpace, capture, demo,
};

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

struct CliArgs {
    scene_path: Option<PathBuf>,
    frames: u32,
    workers: Option<usize>,
    scalar: bool,
    screenshot_path: Option<PathBuf>,
    tiles_path: Option<PathBuf>,
    verbosity: u8,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scene_path: None,
        frames: 1,
        workers: None,
        scalar: false,
        screenshot_path: None,
        tiles_path: None,
        verbosity: 0,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scene" => {
                i += 1;
                cli.scene_path = args.get(i).map(PathBuf::from);
            }
            "--frames" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.frames = s.parse().unwrap_or(1);
                }
            }
            "--workers" => {
                i += 1;
                cli.workers = args.get(i).and_then(|s| s.parse().ok());
            }
            "--scalar" => {
                cli.scalar = true;
            }
            "--screenshot" => {
                i += 1;
                cli.screenshot_path = args.get(i).map(PathBuf::from);
            }
            "--tiles" => {
                i += 1;
                cli.tiles_path = args.get(i).map(PathBuf::from);
            }
            "-v" => cli.verbosity = cli.verbosity.max(1),
            "-vv" => cli.verbosity = 2,
            "--help" | "-h" => {
                eprintln!("Usage: tile-ppu [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --scene <file>       JSON scene (default: built-in demo)");
                eprintln!("  --frames <n>         Frames to render and time [default: 1]");
                eprintln!("  --workers <n>        Worker threads [default: available cores]");
                eprintln!("  --scalar             Disable the AVX2 palette resolver");
                eprintln!("  --screenshot <file>  Save the last frame as PNG");
                eprintln!("  --tiles <file>       Save the background tile sheet as PNG");
                eprintln!("  -v, -vv              Debug / trace logging");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn load_scene(cli: &CliArgs) -> Option<Scene> {
    let path = cli.scene_path.as_ref()?;
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Failed to read scene {}: {e}", path.display());
            process::exit(1);
        }
    };
    match Scene::from_json(&json) {
        Ok(scene) => Some(scene),
        Err(e) => {
            eprintln!("Invalid scene {}: {e}", path.display());
            process::exit(1);
        }
    }
}

fn make_renderer(cli: &CliArgs) -> Renderer {
    let mut config = RenderConfig::default();
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    if cli.scalar {
        config.strategy = StrategyPreference::Scalar;
    }

    match Renderer::new(&config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to start render workers: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    let cli = parse_args();
    init_logging(cli.verbosity);

    let loaded = load_scene(&cli);
    let animate = loaded.is_none();
    let mut scene = loaded.unwrap_or_else(|| demo::demo_scene(0));
    let mut renderer = make_renderer(&cli);
    let mut fb = vec![0u32; SCREEN_PIXELS];

    let frames = cli.frames.max(1);
    let start = Instant::now();
    for frame in 0..frames {
        if animate && frame > 0 {
            scene = demo::demo_scene(frame);
        }
        renderer.render(&scene, &mut fb);
    }
    let elapsed = start.elapsed();

    eprintln!(
        "Rendered {frames} frame(s) with {} worker(s), {:?} resolver, in {:.2?} ({:.1} fps)",
        renderer.workers(),
        renderer.strategy(),
        elapsed,
        f64::from(frames) / elapsed.as_secs_f64().max(f64::EPSILON),
    );

    if let Some(ref path) = cli.screenshot_path {
        if let Err(e) = capture::save_framebuffer(&fb, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32, path) {
            eprintln!("Screenshot error: {e}");
            process::exit(1);
        }
        eprintln!("Screenshot saved to {}", path.display());
    }

    if let Some(ref path) = cli.tiles_path {
        if let Err(e) = capture::save_tile_sheet(&scene, TileSpace::Background, 0, path) {
            eprintln!("Tile sheet error: {e}");
            process::exit(1);
        }
        // Sprite sheet next to it, in the first foreground palette.
        let sprite_path = path.with_extension("sprites.png");
        if let Err(e) = capture::save_tile_sheet(&scene, TileSpace::Sprite, FOREGROUND_PALETTE_BASE, &sprite_path) {
            eprintln!("Tile sheet error: {e}");
            process::exit(1);
        }
        eprintln!("Tile sheets saved to {} and {}", path.display(), sprite_path.display());
    }
}
