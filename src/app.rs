use std::{thread::sleep, time::{Duration, Instant}};

use anyhow::{bail, Context, Result};
use log::info;

use crate::config::GameConfig;
use crate::game::{GameLoop, GameSummary, Phase, TickOutcome};
use crate::input::{is_ctrl_c, key_action, KeyAction};
use crate::store::KeyValueStore;
use crate::term::{TermManager, BOARD_HEIGHT, BOARD_WIDTH};
use crate::ticker::Ticker;

const POLL_INTERVAL_MS: u64 = 5;

/// Whether the player wants another round.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    Again,
    Quit,
}

pub struct App<S> {
    config: GameConfig,
    term: TermManager,
    store: S,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(config: GameConfig, store: S) -> Result<Self> {
        config.validate().context("invalid game configuration")?;
        let term = TermManager::new().context("could not read the terminal size")?;
        Ok(App { config, term, store })
    }

    pub fn initialize(&mut self) -> Result<()> {
        if !self.term.fits_board() {
            let (w, h) = self.term.get_terminal_size();
            bail!(
                "terminal is {}x{}, the board needs at least {}x{}",
                w,
                h,
                BOARD_WIDTH,
                BOARD_HEIGHT + 1
            );
        }

        self.term.setup().context("could not set up the terminal")?;
        Ok(())
    }

    pub fn restore(&mut self) -> Result<()> {
        self.term.restore().context("could not restore the terminal")?;
        Ok(())
    }

    pub fn show_intro(&mut self) -> Result<Flow> {
        let lines = &[
            "Eat as much as you can",
            "before the time runs out",
            "",
            "Arrow keys or WASD to move",
            "CTRL+C to quit",
            "",
            "Press Enter to begin",
        ];

        self.term.clear()?;
        self.term.draw_borders()?;
        self.term.show_message(lines)?;
        self.wait_for_start()
    }

    pub fn play(&mut self) -> Result<Flow> {
        self.term.clear()?;
        self.term.draw_borders()?;

        let mut game = GameLoop::new(self.config.clone(), &mut self.store, rand::thread_rng())?;
        let now = Instant::now();
        let mut countdown = Ticker::new(self.config.countdown_period, now);
        let mut ticker = Ticker::new(self.config.tick_period, now);

        game.start(now, &mut self.term)?;

        let summary = loop {
            sleep(Duration::from_millis(POLL_INTERVAL_MS));

            for key_ev in self.term.read_key_events_queue()? {
                match key_action(&key_ev) {
                    KeyAction::Quit => return Ok(Flow::Quit),
                    KeyAction::Steer(dir) => game.on_direction(dir),
                    KeyAction::Start | KeyAction::Ignore => {}
                }
            }

            let now = Instant::now();
            match game.phase() {
                Phase::Countdown => {
                    if countdown.poll(now) {
                        game.countdown_tick(now, &mut self.term)?;
                        ticker.reset(now);
                    }
                }
                Phase::Running => {
                    if ticker.poll(now) {
                        if let TickOutcome::Ended(summary) = game.tick(now, &mut self.term)? {
                            break summary;
                        }
                    }
                }
                Phase::Ended => {
                    if let Some(summary) = game.summary() {
                        break summary;
                    }
                }
                Phase::Idle => game.start(now, &mut self.term)?,
            }
        };

        self.game_over(summary)
    }

    ///////////////////////////////////////////////////////////////////////////

    fn game_over(&mut self, summary: GameSummary) -> Result<Flow> {
        info!("game over with {} points", summary.final_score);

        let score = format!("Score: {}", summary.final_score);
        let banner = if summary.new_high_score { "New high score!" } else { "" };

        self.term.show_message(&[
            "Time up!",
            &score,
            banner,
            "",
            "Press Enter to play again,",
            "or CTRL+C to quit.",
        ])?;

        self.wait_for_start()
    }

    fn wait_for_start(&mut self) -> Result<Flow> {
        loop {
            let key_ev = self.term.read_key_blocking()?;
            if is_ctrl_c(&key_ev) {
                return Ok(Flow::Quit);
            }
            if key_action(&key_ev) == KeyAction::Start {
                return Ok(Flow::Again);
            }
        }
    }
}
