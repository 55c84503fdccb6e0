mod play_scene;

use clap::Parser;
use playfield_ecs::EntityManager;
use playfield_input::{InputService, Key};
use playfield_kernel::{App, ConfigurationService};
use playfield_physics::{Clock, PhysicsService};
use playfield_render::{DebugTextRenderer, RenderingService};
use playfield_scene::SceneManager;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::play_scene::PlayScene;

/// Loop cap applied when the configuration sets none.
const DEFAULT_TICKS: u64 = 600;

#[derive(Parser)]
#[command(
    name = "playfield-demo",
    about = "Headless playfield demo: a steerable player among bouncing enemies"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Advance physics by a fixed step in milliseconds instead of wall-clock time
    #[arg(long, value_name = "MS")]
    fixed_step: Option<f64>,

    /// Number of bouncing enemies
    #[arg(long, default_value = "10")]
    enemies: usize,

    /// Seed for enemy placement
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Hold a key for the whole run (repeatable), e.g. `--hold right`
    #[arg(long, value_name = "KEY")]
    hold: Vec<Key>,

    /// Print merged service statistics as JSON
    #[arg(long)]
    stats: bool,

    /// Print the final entity store as JSON
    #[arg(long)]
    dump: bool,

    /// Print the last rendered frame
    #[arg(long)]
    frame: bool,

    /// Configuration tokens, e.g. `tc=120 gravity=0,0.981 dl=1`
    #[arg(trailing_var_arg = true, value_name = "KEY=VALUE")]
    args: Vec<String>,
}

/// Register every service and the play scene.
fn build_app(clock: Clock, enemies: usize, seed: u64) -> App {
    let scenes = SceneManager::builder()
        .register("play", move |name: &str| {
            PlayScene::new(name).with_enemies(enemies).with_seed(seed)
        })
        .default_scene("play")
        .build();

    App::new("playfield-demo")
        .with(ConfigurationService::new())
        .with(EntityManager::new())
        .with(PhysicsService::with_clock(clock))
        .with(scenes)
        .with(RenderingService::new(DebugTextRenderer::new()))
        .with(InputService::new())
}

fn report(app: &App, cli: &Cli) -> anyhow::Result<()> {
    if cli.frame {
        if let Some(frame) = app
            .get::<RenderingService<DebugTextRenderer>>()
            .and_then(|rendering| rendering.last_output())
        {
            print!("{frame}");
        }
    }
    if cli.stats {
        println!("{}", serde_json::to_string_pretty(&app.statistics())?);
    }
    if cli.dump {
        let store = app.require::<EntityManager>()?;
        let entities: Vec<_> = store.entities().collect();
        println!("{}", serde_json::to_string_pretty(&entities)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let clock = cli.fixed_step.map_or_else(Clock::system, Clock::fixed);
    let mut app = build_app(clock, cli.enemies, cli.seed);

    if let Some(input) = app.get::<InputService>() {
        for key in &cli.hold {
            input.press(*key);
        }
    }

    if let Err(err) = app.init(&cli.args) {
        app.dispose();
        return Err(err.into());
    }
    if app.max_loop_count().is_none() {
        app.set_test_loop_counter(DEFAULT_TICKS);
    }

    let result = app.process();
    // Report before disposal empties the store.
    let reported = report(&app, &cli);
    app.dispose();
    info!(loops = app.loop_count(), "demo finished");

    result?;
    reported
}
