mod config;
mod game;
mod input;
mod scheduler;
mod session;
mod snake;
mod store;
mod term;

use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use simplelog::WriteLogger;

use crate::config::GameConfig;
use crate::game::SnakeGame;
use crate::session::Session;
use crate::store::{HighScoreStore, JsonFileStore, MemoryStore};
use crate::term::{required_size, TermInt, TermManager};

#[derive(Parser)]
#[command(name = "gridsnake")]
#[command(version, about = "Classic Snake in the terminal")]
struct Cli {
    /// Cells per side of the square board
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(i32).range(10..=60))]
    grid: i32,

    /// Starting tick interval in milliseconds
    #[arg(long, default_value_t = 250)]
    initial_speed: u64,

    /// Fastest tick interval in milliseconds
    #[arg(long, default_value_t = 80)]
    min_speed: u64,

    /// Milliseconds taken off the tick interval per food eaten
    #[arg(long, default_value_t = 2)]
    speed_step: u64,

    /// Where the high score is kept
    #[arg(long)]
    high_score_file: Option<PathBuf>,

    /// Keep the high score for this run only
    #[arg(long)]
    no_save: bool,

    #[arg(long, default_value = "gridsnake.log")]
    log_file: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

impl Cli {
    fn game_config(&self) -> GameConfig {
        GameConfig {
            grid_count: self.grid,
            initial_speed_ms: self.initial_speed,
            min_speed_ms: self.min_speed,
            speed_decrement_ms: self.speed_step,
            ..GameConfig::default()
        }
    }

    fn store(&self) -> Box<dyn HighScoreStore> {
        if self.no_save {
            return Box::new(MemoryStore::default());
        }

        let path = self.high_score_file.clone().unwrap_or_else(JsonFileStore::default_path);
        info!("High score file: {}", path.display());
        Box::new(JsonFileStore::new(path))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Stdout belongs to the game screen, so logs go to a file
    let log_file = File::create(&cli.log_file)
        .with_context(|| format!("creating log file {}", cli.log_file.display()))?;
    WriteLogger::init(cli.log_level, simplelog::Config::default(), log_file)
        .context("initializing logger")?;

    let config = cli.game_config();
    info!("Starting gridsnake with {:?}", config);

    let grid = config.grid_count as TermInt;
    let term = TermManager::new(grid).context("reading terminal size")?;
    let (need_w, need_h) = required_size(grid);
    let (w, h) = term.get_terminal_size();
    if w < need_w || h < need_h {
        bail!("terminal is {}x{}, a {} grid needs at least {}x{}", w, h, grid, need_w, need_h);
    }

    let session = Session::new(config, cli.store());
    let mut game = SnakeGame::new(term, session);
    game.run().context("running the game")?;

    info!("Bye");
    Ok(())
}
