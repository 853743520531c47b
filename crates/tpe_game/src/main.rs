use std::path::PathBuf;
use std::sync::Arc;

use tpe_assets::FsImageSource;
use tpe_core::input::KeyboardHub;
use tpe_core::model::load_bundle_from_path;
use tpe_core::time::ManualClock;
use tpe_devtools::{DebugOverlay, SceneProbe};
use tpe_game::engine::{load_config_from_path, EngineConfig, GameEngine};
use tpe_game::script::{load_script_from_path, InputScript, ScriptPlayback};
use tpe_render::PixelSurface;

const SURFACE_WIDTH: u32 = 800;
const SURFACE_HEIGHT: u32 = 600;
const DEFAULT_FRAMES: u32 = 120;
const OVERLAY_INTERVAL_FRAMES: u64 = 60;

struct Args {
    bundle: PathBuf,
    assets: Option<PathBuf>,
    script: Option<PathBuf>,
    frames: Option<u32>,
    out: PathBuf,
    config: Option<PathBuf>,
}

fn usage() -> String {
    "Usage: cargo run -p tpe_game --bin tpe_preview -- <bundle.json> [--assets DIR] [--script input.json] [--frames N] [--out frame.png] [--config engine.json]\nExample: cargo run -p tpe_game --bin tpe_preview -- demo/bundle.json --assets demo --script demo/walk.json --out preview.png".to_string()
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut bundle = None;
    let mut assets = None;
    let mut script = None;
    let mut frames = None;
    let mut out = PathBuf::from("preview.png");
    let mut config = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("Missing value for {flag}\n{}", usage()))
        };
        match arg.as_str() {
            "--assets" => assets = Some(PathBuf::from(value("--assets")?)),
            "--script" => script = Some(PathBuf::from(value("--script")?)),
            "--out" => out = PathBuf::from(value("--out")?),
            "--config" => config = Some(PathBuf::from(value("--config")?)),
            "--frames" => {
                let raw = value("--frames")?;
                let n = raw
                    .parse::<u32>()
                    .map_err(|e| format!("Invalid --frames value '{raw}': {e}"))?;
                frames = Some(n);
            }
            "-h" | "--help" => return Err(usage()),
            other if other.starts_with("--") => {
                return Err(format!("Unknown option {other}\n{}", usage()));
            }
            other => {
                if bundle.is_some() {
                    return Err(format!("Unexpected argument {other}\n{}", usage()));
                }
                bundle = Some(PathBuf::from(other));
            }
        }
    }

    Ok(Args {
        bundle: bundle.ok_or_else(usage)?,
        assets,
        script,
        frames,
        out,
        config,
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = run(&args) {
        log::error!("{err}");
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let args = parse_args(args)?;

    let bundle = load_bundle_from_path(&args.bundle)?;
    let config = match &args.config {
        Some(path) => load_config_from_path(path)?,
        None => EngineConfig::default(),
    };
    let script = match &args.script {
        Some(path) => load_script_from_path(path)?,
        None => InputScript::idle(args.frames.unwrap_or(DEFAULT_FRAMES)),
    };

    // Image paths in the bundle are relative to the asset root, which
    // defaults to the bundle's own directory.
    let asset_root = args.assets.clone().unwrap_or_else(|| {
        args.bundle
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    log::info!("Asset root: {}", asset_root.display());

    let mut surface = PixelSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT);
    let hub = KeyboardHub::new();
    let clock = ManualClock::new(0.0);
    let probe = SceneProbe::new();

    let mut engine = GameEngine::with_clock(
        &mut surface,
        Arc::new(FsImageSource::new(asset_root)),
        &hub,
        config,
        Box::new(clock.clone()),
    )?;
    engine.set_diagnostics(Box::new((
        DebugOverlay::new(OVERLAY_INTERVAL_FRAMES),
        probe.clone(),
    )));
    engine.register_characters(bundle.characters.clone());
    engine.register_sprites(bundle.sprites.clone());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    runtime.block_on(engine.init(&bundle.project, &bundle.maps, &bundle.tilesets));

    let mut playback = ScriptPlayback::new(&script);
    let frames = args.frames.unwrap_or(playback.len() as u32);
    log::info!("Running {frames} frames at {:.1} ms", script.frame_ms);

    engine.start();
    for _ in 0..frames {
        playback.advance(&hub);
        let timestamp = clock.advance(script.frame_ms);
        engine.frame(timestamp);
    }
    // Pause rather than stop: stopping wipes the surface.
    engine.pause();

    surface.save_png(&args.out)?;
    log::info!("Wrote {}", args.out.display());

    let stats = engine.frame_stats();
    log::info!(
        "Frames: {} | avg FPS {:.1} | draw calls last frame {}",
        probe.frames_seen(),
        stats.smoothed_fps,
        probe.render_stats().map(|r| r.draw_calls).unwrap_or(0)
    );
    log::info!("Final scene:\n{}", engine.snapshot().to_json()?);
    Ok(())
}
