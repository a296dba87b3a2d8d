mod config;
mod export;
mod sim;
mod watch;

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tessera_runtime::{Preview, PreviewMode, TerrainGenerator, TerrainSource};
use tessera_stream::TerrainStreamer;

use crate::config::{TerrainConfig, load_config_from_path};
use crate::sim::{LogHost, SimPath};

#[derive(Parser)]
#[command(name = "tessera", author, version, about = "Streamed procedural terrain")]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream chunks around a viewer walking a straight line, then report
    Simulate {
        /// Terrain config (TOML); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of update ticks
        #[arg(short, long, default_value = "600")]
        ticks: u32,

        /// World units moved per tick
        #[arg(short, long, default_value = "2.0")]
        step: f32,

        /// Walking direction in degrees, 0 along +x
        #[arg(long, default_value = "0.0")]
        heading: f32,

        /// Milliseconds to sleep between ticks
        #[arg(long, default_value = "0")]
        tick_ms: u64,

        /// Height and mesh worker threads (e.g. 2,4); split automatically when omitted
        #[arg(long, value_delimiter = ',', num_args = 2)]
        workers: Option<Vec<usize>>,
    },
    /// Generate one chunk around the origin and export it
    Preview {
        /// Terrain config (TOML); defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Overrides [preview] mode
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,

        /// Overrides [preview] lod (mesh mode)
        #[arg(short, long)]
        lod: Option<u8>,

        /// Output file; .png for maps, .obj for meshes
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,

        /// Regenerate whenever the config file changes
        #[arg(short, long)]
        watch: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Noise,
    Mesh,
    Falloff,
}

impl From<ModeArg> for PreviewMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Noise => PreviewMode::NoiseMap,
            ModeArg::Mesh => PreviewMode::Mesh,
            ModeArg::Falloff => PreviewMode::FalloffMap,
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            simplelog::WriteLogger::init(
                log::LevelFilter::Info,
                simplelog::Config::default(),
                File::create(path)?,
            )?;
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .init();
        }
    }
    Ok(())
}

fn load_or_default(path: Option<&Path>) -> Result<TerrainConfig, Box<dyn Error>> {
    match path {
        Some(p) => {
            let cfg = load_config_from_path(p)?;
            log::info!("loaded config from {}", p.display());
            Ok(cfg)
        }
        None => Ok(TerrainConfig::default()),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_file.as_deref()) {
        eprintln!("logging setup failed: {e}");
    }
    if let Err(e) = run(cli.command) {
        log::error!("{}", e);
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::Simulate {
            config,
            ticks,
            step,
            heading,
            tick_ms,
            workers,
        } => {
            let cfg = load_or_default(config.as_deref())?;
            simulate(&cfg, ticks, step, heading, tick_ms, workers.as_deref())
        }
        Commands::Preview {
            config,
            mode,
            lod,
            output,
            watch,
        } => {
            let render = |cfg: &TerrainConfig| {
                let mode = mode.map(PreviewMode::from).unwrap_or(cfg.preview.mode);
                let lod = lod.unwrap_or_else(|| cfg.preview_lod());
                preview(cfg, mode, lod, &output)
            };
            let cfg = load_or_default(config.as_deref())?;
            render(&cfg)?;
            if !watch {
                return Ok(());
            }
            let Some(path) = config else {
                return Err("--watch needs --config".into());
            };
            let rx = watch::watch_config_file(path.clone());
            while rx.recv().is_ok() {
                // Editors often save in several steps; let them finish.
                std::thread::sleep(Duration::from_millis(100));
                watch::take_changed(&rx);
                match load_config_from_path(&path) {
                    Ok(cfg) => {
                        log::info!("config reloaded from {}", path.display());
                        if let Err(e) = render(&cfg) {
                            log::warn!("preview failed: {}", e);
                        }
                    }
                    Err(e) => log::warn!("config reload failed ({}): {}", path.display(), e),
                }
            }
            Ok(())
        }
    }
}

fn generator(cfg: &TerrainConfig) -> TerrainGenerator {
    TerrainGenerator::new(cfg.height_settings(), cfg.mesh_settings())
}

fn simulate(
    cfg: &TerrainConfig,
    ticks: u32,
    step: f32,
    heading: f32,
    tick_ms: u64,
    workers: Option<&[usize]>,
) -> Result<(), Box<dyn Error>> {
    let source: Arc<dyn TerrainSource> = Arc::new(generator(cfg));
    let settings = cfg.stream_settings();
    let mut streamer = match workers {
        Some(&[h, m]) => {
            let runtime = tessera_runtime::Runtime::with_workers(source, h, m)?;
            TerrainStreamer::new(LogHost::default(), Arc::new(runtime), settings)
        }
        _ => TerrainStreamer::with_source(LogHost::default(), source, settings)?,
    };
    let (wh, wm) = streamer.runtime().worker_counts();
    log::info!("simulating {} ticks with {} height / {} mesh workers", ticks, wh, wm);

    let path = SimPath {
        ticks,
        step,
        heading,
        tick_interval: Duration::from_millis(tick_ms),
    };
    let stats = sim::run(&mut streamer, &path, Duration::from_secs(120));
    println!("chunks:         {}", stats.chunks);
    println!("visible:        {}", stats.visible);
    println!("rescans:        {}", stats.rescans);
    println!("mesh swaps:     {}", stats.meshes_applied);
    println!("pending height: {}", stats.pending_height);
    println!("pending mesh:   {}", stats.pending_mesh);
    let colliders = streamer
        .chunks()
        .filter(|c| c.object().has_collider)
        .count();
    println!("colliders:      {}", colliders);
    Ok(())
}

fn preview(
    cfg: &TerrainConfig,
    mode: PreviewMode,
    lod: u8,
    output: &Path,
) -> Result<(), Box<dyn Error>> {
    let started = std::time::Instant::now();
    match generator(cfg).preview(mode, lod) {
        Preview::NoiseMap(grid) if !cfg.preview.regions.is_empty() => {
            export::write_color_map_png(&grid, &cfg.preview.regions, output)?
        }
        Preview::NoiseMap(grid) | Preview::FalloffMap(grid) => {
            export::write_grayscale_png(&grid, output)?
        }
        Preview::Mesh { mesh, .. } => export::write_obj_file(&mesh, output)?,
    }
    log::info!("{:?} preview done in {:.2?}", mode, started.elapsed());
    Ok(())
}
