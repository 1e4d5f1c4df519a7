use std::{env, path::PathBuf, time::Duration};

use log::LevelFilter;

use crate::error::ConfigError;
use crate::worm::is_unit_step;
use crate::Velocity;

/// Side length of one grid cell, in field units.
pub const DOT_SIZE: i32 = 10;
pub const FIELD_WIDTH: i32 = 200;
pub const FIELD_HEIGHT: i32 = 200;

pub const COLUMNS: i32 = FIELD_WIDTH / DOT_SIZE;
pub const ROWS: i32 = FIELD_HEIGHT / DOT_SIZE;

const _: () = assert!(FIELD_WIDTH % DOT_SIZE == 0 && FIELD_HEIGHT % DOT_SIZE == 0);

pub const WORM_LENGTH: usize = 10;
pub const INITIAL_VELOCITY: Velocity = (DOT_SIZE, 0);

pub const TICK_PERIOD: Duration = Duration::from_millis(100);
pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);
pub const COUNTDOWN_FROM: u32 = 3;
pub const SESSION_LENGTH: Duration = Duration::from_secs(30);

pub const HIGH_SCORE_KEY: &str = "high_score";
pub const HIGH_SCORE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

pub const DEFAULT_STORE_FILE: &str = ".mimizu_high_score.json";
pub const LOG_FILE: &str = "mimizu.log";

const STORE_ENV: &str = "MIMIZU_STORE";
const LOG_ENV: &str = "MIMIZU_LOG";

/// Tunables for one game session. Grid dimensions live in the constants
/// above.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub worm_length: usize,
    pub initial_velocity: Velocity,
    pub tick_period: Duration,
    pub countdown_period: Duration,
    pub countdown_from: u32,
    pub session_length: Duration,
    pub high_score_ttl: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            worm_length: WORM_LENGTH,
            initial_velocity: INITIAL_VELOCITY,
            tick_period: TICK_PERIOD,
            countdown_period: COUNTDOWN_PERIOD,
            countdown_from: COUNTDOWN_FROM,
            session_length: SESSION_LENGTH,
            high_score_ttl: HIGH_SCORE_TTL,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worm_length == 0 {
            return Err(ConfigError::EmptyWorm);
        }

        if !is_unit_step(self.initial_velocity) {
            let (dx, dy) = self.initial_velocity;
            return Err(ConfigError::InvalidDirection(dx, dy));
        }

        let periods = [
            ("tick period", self.tick_period),
            ("countdown period", self.countdown_period),
            ("session length", self.session_length),
        ];

        for (name, value) in periods.iter() {
            if value.as_nanos() == 0 {
                return Err(ConfigError::ZeroDuration(*name));
            }
        }

        Ok(())
    }
}

/// Location of the high-score file, overridable through `MIMIZU_STORE`.
pub fn store_path() -> PathBuf {
    env::var_os(STORE_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE))
}

pub fn log_level() -> LevelFilter {
    parse_level(env::var(LOG_ENV).ok().as_deref())
}

fn parse_level(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(LevelFilter::Info)
}
