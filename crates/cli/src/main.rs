use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use skyrace_shared::*;
use skyrace_sim::sensors::Arena;
use skyrace_sim::{run_race, BatchEnv, CheckpointSeeker, CheckpointTrack, ControlSource, Idle, WaypointPath};

#[derive(Parser)]
#[command(name = "skyrace", about = "Checkpoint air racing simulator")]
struct Cli {
    /// JSON race configuration; missing fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of checkpoints on the generated circuit
    #[arg(long, global = true, default_value_t = 8)]
    checkpoints: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive race between scripted pilots
    Race {
        /// Comma-separated pilots, the first one is followed (seeker, idle)
        #[arg(long, default_value = "seeker,seeker,idle")]
        pilots: String,

        /// Give up after this many seconds of simulated time
        #[arg(long, default_value_t = 300.0)]
        max_secs: f32,

        /// Output path for replay JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run training episodes in parallel with the scripted pilot
    Rollout {
        /// Number of parallel environments
        #[arg(long, default_value_t = 16)]
        envs: usize,

        /// Batch steps to run
        #[arg(long, default_value_t = 2000)]
        steps: u32,

        /// Ticks per action
        #[arg(long, default_value_t = 1)]
        action_repeat: u32,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    /// Print the effective configuration as JSON
    Config,
}

fn resolve_pilot(name: &str) -> Result<Box<dyn ControlSource>> {
    match name {
        "seeker" => Ok(Box::new(CheckpointSeeker::new())),
        "idle" => Ok(Box::new(Idle)),
        other => bail!("unknown pilot '{other}'. Valid options: seeker, idle"),
    }
}

fn load_config(path: Option<&Path>) -> Result<RaceConfig> {
    let Some(path) = path else {
        return Ok(RaceConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let config = RaceConfig::from_json_str(&text)
        .with_context(|| format!("invalid config: {}", path.display()))?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

fn build_course(checkpoints: usize) -> Result<(CheckpointTrack, Arena)> {
    let track = CheckpointTrack::from_geometry(&WaypointPath::circuit(checkpoints, 600.0, 450.0, 200.0, 30.0))?;
    let arena = Arena::around(&track, CHECKPOINT_RADIUS).with_ground(0.0);
    Ok((track, arena))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Race {
            pilots,
            max_secs,
            output,
        } => cmd_race(config, cli.checkpoints, &pilots, max_secs, output),

        Commands::Rollout {
            envs,
            steps,
            action_repeat,
            seed,
        } => cmd_rollout(config, cli.checkpoints, envs, steps, action_repeat, seed),

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn cmd_race(config: RaceConfig, checkpoints: usize, pilots: &str, max_secs: f32, output: Option<PathBuf>) -> Result<()> {
    let mut sources = pilots
        .split(',')
        .map(|s| resolve_pilot(s.trim()))
        .collect::<Result<Vec<_>>>()?;
    let (track, arena) = build_course(checkpoints)?;
    let max_ticks = (max_secs / config.dt).ceil() as u32;

    println!(
        "Racing {} pilots over {} laps of a {}-checkpoint circuit",
        sources.len(),
        config.num_laps,
        track.count()
    );

    let replay = run_race(&config, track, arena, &mut sources, max_ticks)?;
    let result = &replay.result;

    println!();
    println!("=== Race Result ===");
    println!("Finished:   {}", result.finished);
    println!("Race time:  {:.2}s", result.race_time);
    println!("Final tick: {}", result.final_tick);
    println!();
    println!("{:<6} {:<16} {:>4} {:>12}", "Place", "Pilot", "Lap", "Checkpoints");
    println!("{:-<6} {:-<16} {:->4} {:->12}", "", "", "", "");
    for standing in &result.standings {
        println!(
            "{:<6} {:<16} {:>4} {:>12}",
            standing.place, standing.name, standing.lap, standing.checkpoints
        );
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&replay).context("failed to serialize replay")?;
        std::fs::write(&path, json).with_context(|| format!("failed to write replay: {}", path.display()))?;
        println!("\nReplay written to {}", path.display());
    }
    Ok(())
}

#[derive(Default)]
struct RolloutStats {
    episodes: u32,
    total_reward: f32,
    step_limit: u32,
    timeout: u32,
    collision: u32,
}

fn cmd_rollout(config: RaceConfig, checkpoints: usize, envs: usize, steps: u32, action_repeat: u32, seed: u64) -> Result<()> {
    if envs == 0 {
        bail!("rollout needs at least one environment");
    }
    let (track, arena) = build_course(checkpoints)?;
    let mut batch = BatchEnv::new(envs, config, &track, &arena, seed, action_repeat)?;
    let mut pilots: Vec<CheckpointSeeker> = (0..envs).map(|_| CheckpointSeeker::new()).collect();

    println!("Rollout: {} envs x {} steps (action repeat {})", envs, steps, batch.action_repeat());

    let mut observations = batch.reset();
    let mut stats = RolloutStats::default();
    let mut running = vec![0.0f32; envs];

    for _ in 0..steps {
        let actions: Vec<[f32; ACTION_SIZE]> = pilots
            .iter_mut()
            .zip(&observations)
            .map(|(pilot, obs)| pilot.act(obs).to_raw())
            .collect();
        let results = batch.step(&actions)?;

        for (i, r) in results.iter().enumerate() {
            running[i] += r.reward;
            if r.done {
                stats.episodes += 1;
                stats.total_reward += running[i];
                running[i] = 0.0;
                match r.end {
                    Some(EpisodeEnd::StepLimit) => stats.step_limit += 1,
                    Some(EpisodeEnd::Timeout) => stats.timeout += 1,
                    Some(EpisodeEnd::Collision) => stats.collision += 1,
                    None => {}
                }
            }
        }
        observations = results.into_iter().map(|r| r.obs).collect();
    }

    println!();
    println!("=== Rollout Stats ===");
    println!("Episodes:    {}", stats.episodes);
    if stats.episodes > 0 {
        println!("Mean return: {:.3}", stats.total_reward / stats.episodes as f32);
    }
    println!("Step limit:  {}", stats.step_limit);
    println!("Timeout:     {}", stats.timeout);
    println!("Collision:   {}", stats.collision);
    Ok(())
}
