mod app;
mod config;
mod error;
mod food;
mod game;
mod input;
mod render;
mod store;
mod term;
mod ticker;
mod worm;

use std::fs::File;

use anyhow::{Context, Result};
use log::info;
use simplelog::WriteLogger;

use crate::app::{App, Flow};
use crate::config::GameConfig;
use crate::store::FileStore;

/// A field position, in field units (multiples of `DOT_SIZE`).
pub type Coords = (i32, i32);
/// Per-tick displacement, in field units.
pub type Velocity = (i32, i32);

fn main() -> Result<()> {
    init_logging()?;

    let store = FileStore::open(config::store_path());
    info!("starting mimizu, high scores in {}", store.path().display());

    let mut app = App::new(GameConfig::default(), store)?;
    app.initialize()?;

    let res = run(&mut app);
    // The terminal must come back even when the game failed
    app.restore()?;
    res
}

fn run(app: &mut App<FileStore>) -> Result<()> {
    if app.show_intro()? == Flow::Quit {
        return Ok(());
    }

    while app.play()? == Flow::Again {}

    info!("quitting");
    Ok(())
}

fn init_logging() -> Result<()> {
    let file = File::create(config::LOG_FILE).context("could not create the log file")?;
    WriteLogger::init(config::log_level(), simplelog::Config::default(), file)
        .context("could not initialize logging")?;
    Ok(())
}
