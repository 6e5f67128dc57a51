use anyhow::Result;
use clap::{Parser, ValueEnum};
use snake_dqn::game::GameConfig;
use snake_dqn::modes::{PlayConfig, PlayMode, TrainConfig, TrainMode};
use snake_dqn::rl::DqnConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snake_dqn")]
#[command(version, about = "Double-DQN agent for Snake on a dynamic grid")]
struct Cli {
    /// What to run
    #[arg(long, default_value = "train")]
    mode: Mode,

    /// Grid width
    #[arg(long, default_value = "20")]
    width: usize,

    /// Grid height
    #[arg(long, default_value = "15")]
    height: usize,

    /// Die at the edges instead of wrapping around
    #[arg(long)]
    no_wrap: bool,

    /// Keep the grid size fixed
    #[arg(long)]
    fixed_size: bool,

    /// Add ray-cast and look-ahead features to the observation
    #[arg(long)]
    extended: bool,

    /// Number of episodes to train or play
    #[arg(long, default_value = "1000")]
    episodes: u64,

    /// Model file to save to (train) or load from (play)
    #[arg(long, default_value = "models/snake_dqn.json")]
    model: PathBuf,

    /// Environment steps per training tick
    #[arg(long, default_value = "1")]
    speed: usize,

    /// Continue training from an existing model file
    #[arg(long)]
    resume: bool,

    /// Save a checkpoint every N episodes
    #[arg(long, default_value = "1000")]
    checkpoint_every: u64,

    /// Log progress every N episodes
    #[arg(long, default_value = "100")]
    log_every: u64,

    /// Learning rate
    #[arg(long, default_value = "0.001")]
    learning_rate: f32,
}

#[derive(Clone, ValueEnum)]
enum Mode {
    /// Train a new or resumed model
    Train,
    /// Play greedy episodes with a trained model
    Play,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let game_config = GameConfig {
        wrap_around: !cli.no_wrap,
        dynamic_size: !cli.fixed_size,
        extended_observation: cli.extended,
        ..GameConfig::new(cli.width, cli.height)
    };
    game_config.validate()?;

    match cli.mode {
        Mode::Train => {
            let dqn_config = DqnConfig {
                learning_rate: cli.learning_rate,
                ..Default::default()
            };
            dqn_config.validate()?;

            let mut train_config = TrainConfig::new(cli.episodes, cli.model);
            train_config.steps_per_tick = cli.speed;
            train_config.resume = cli.resume;
            train_config.checkpoint_frequency = cli.checkpoint_every;
            train_config.log_frequency = cli.log_every;
            train_config.min_buffer_size = dqn_config.batch_size;
            train_config.game_config = game_config;
            train_config.dqn_config = dqn_config;

            let mut train_mode = TrainMode::new(train_config)?;
            train_mode.run()?;
        }
        Mode::Play => {
            let episodes = u32::try_from(cli.episodes).unwrap_or(u32::MAX);
            let mut play_config = PlayConfig::new(cli.model, episodes);
            play_config.game_config = game_config;

            let mut play_mode = PlayMode::new(play_config)?;
            play_mode.run()?;
        }
    }

    Ok(())
}
