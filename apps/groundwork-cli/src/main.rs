use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use glam::Mat4;
use groundwork_physics::ChainWorld;
use groundwork_render::RecordingBackend;
use groundwork_terrain::{
    ChunkGeometry, GroundActor, Heightfield, MVP_UNIFORM, TerrainConfig, WaveProfile,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "groundwork-cli", about = "CLI tool for groundwork terrain")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Terrain config file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the config's waves with a named profile
    #[arg(short, long, global = true, value_enum)]
    profile: Option<Profile>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Hills,
    Rolling,
}

impl From<Profile> for WaveProfile {
    fn from(p: Profile) -> Self {
        match p {
            Profile::Hills => WaveProfile::Hills,
            Profile::Rolling => WaveProfile::Rolling,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and terrain parameters
    Info,
    /// Print the effective config as YAML
    Config,
    /// Print heightfield samples
    Sample {
        /// First world column
        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        start: i64,
        /// Number of columns
        #[arg(short = 'n', long, default_value = "16")]
        count: usize,
    },
    /// Generate one chunk and describe it
    Chunk {
        /// Chunk index (may be negative)
        #[arg(short, long, allow_hyphen_values = true)]
        index: i32,
        /// Dump the full geometry as JSON
        #[arg(long)]
        json: bool,
    },
    /// Scroll a ground actor across a range and report streaming work
    Scroll {
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        from: f32,
        #[arg(long, default_value = "200", allow_hyphen_values = true)]
        to: f32,
        /// Distance moved per load
        #[arg(long, default_value = "5")]
        step: f32,
    },
}

fn load_config(path: Option<&PathBuf>, profile: Option<Profile>) -> anyhow::Result<TerrainConfig> {
    let mut config = match path {
        Some(path) => TerrainConfig::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TerrainConfig::default(),
    };
    if let Some(profile) = profile {
        config.waves = WaveProfile::from(profile).waves();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = load_config(cli.config.as_ref(), cli.profile)?;

    match cli.command {
        Commands::Info => {
            println!("groundwork-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("terrain: {}", groundwork_terrain::crate_info());
            println!("physics: {}", groundwork_physics::crate_info());
            println!("render: {}", groundwork_render::crate_info());
            println!(
                "chunk: {} columns x {} units = {} units wide, {} deep",
                config.chunk_size,
                config.resolution,
                config.chunk_width(),
                config.chunk_depth
            );
            println!(
                "window: {} chunks ({} units)",
                config.window_length,
                config.window_length as f32 * config.chunk_width()
            );
            for wave in &config.waves {
                println!("wave: sin(x * {}) * {}", wave.frequency, wave.amplitude);
            }
        }
        Commands::Config => {
            print!("{}", config.to_yaml()?);
        }
        Commands::Sample { start, count } => {
            let field = Heightfield::from_config(&config);
            for (i, h) in field.sample(start, count).iter().enumerate() {
                let column = start + i as i64;
                println!("{column:>8} {:>10.3} {h:>10.4}", config.column_x(column));
            }
        }
        Commands::Chunk { index, json } => {
            config.validate()?;
            let field = Heightfield::from_config(&config);
            let geometry = ChunkGeometry::generate(index, &config, &field);
            if json {
                println!("{}", serde_json::to_string_pretty(&geometry)?);
            } else {
                let (min, max) = geometry
                    .heights
                    .iter()
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), h| {
                        (lo.min(*h), hi.max(*h))
                    });
                println!("chunk {index}");
                println!("  origin x: {}", config.chunk_origin_x(index));
                let first = config.first_column(index);
                println!("  columns: {first}..={}", first + config.chunk_size as i64);
                println!("  heights: {} (min {min:.3}, max {max:.3})", geometry.heights.len());
                println!("  mesh vertices: {}", geometry.vertices.len());
                println!("  chain vertices: {}", geometry.chain.len());
                println!(
                    "  ghosts: prev ({:.3}, {:.3}) next ({:.3}, {:.3})",
                    geometry.prev_ghost.x,
                    geometry.prev_ghost.y,
                    geometry.next_ghost.x,
                    geometry.next_ghost.y
                );
            }
        }
        Commands::Scroll { from, to, step } => {
            anyhow::ensure!(step > 0.0 && step.is_finite(), "step must be positive");
            let mut physics = ChainWorld::new();
            let mut graphics = RecordingBackend::new();
            let mut actor = GroundActor::new(&mut physics, &mut graphics, config)?;

            let direction = if to >= from { 1.0 } else { -1.0 };
            let steps = ((to - from).abs() / step).floor() as usize;
            println!("{:>10} {:>7} {:>6} {:>7}", "x", "center", "built", "evicted");
            for i in 0..=steps {
                let x = from + direction * step * i as f32;
                let report = actor.load(&mut physics, &mut graphics, x)?;
                println!(
                    "{x:>10.2} {:>7} {:>6} {:>7}",
                    report.window.center,
                    report.built.len(),
                    report.evicted.len()
                );
            }

            let shader = graphics.create_shader(&[MVP_UNIFORM]);
            actor.draw(&mut graphics, shader, Mat4::IDENTITY)?;
            tracing::debug!("\n{}", graphics.summary());

            let stats = actor.stats().clone();
            println!(
                "loads={} built={} evicted={} resident={:?}",
                stats.loads,
                stats.chunks_built,
                stats.chunks_evicted,
                actor.ring().resident_indices()
            );

            actor.destroy(&mut physics, &mut graphics)?;
            println!(
                "after destroy: bodies={} fixtures={} meshes={}",
                physics.body_count(),
                physics.total_fixtures(),
                graphics.mesh_count()
            );
        }
    }

    Ok(())
}
