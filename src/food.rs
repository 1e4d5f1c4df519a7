use log::{debug, error};
use rand::Rng;

use crate::config::{COLUMNS, DOT_SIZE, ROWS};
use crate::error::GameError;
use crate::worm::Worm;
use crate::Coords;

/// Upper bound on rejection sampling for a free cell. A fixed-length worm
/// can never cover the whole field, so hitting this means something broke.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 10_000;

pub struct Food {
    pos: Coords,
}

impl Food {
    pub fn spawn<R: Rng + ?Sized>(rng: &mut R, worm: &Worm) -> Result<Self, GameError> {
        let pos = free_cell(rng, worm, MAX_PLACEMENT_ATTEMPTS)?;
        Ok(Food { pos })
    }

    #[cfg(test)]
    pub fn at(pos: Coords) -> Self {
        Food { pos }
    }

    pub fn relocate<R: Rng + ?Sized>(&mut self, rng: &mut R, worm: &Worm) -> Result<(), GameError> {
        self.pos = free_cell(rng, worm, MAX_PLACEMENT_ATTEMPTS)?;
        debug!("food moved to {:?}", self.pos);
        Ok(())
    }

    pub fn position(&self) -> Coords {
        self.pos
    }
}

fn random_cell<R: Rng + ?Sized>(rng: &mut R) -> Coords {
    (rng.gen_range(0..COLUMNS) * DOT_SIZE, rng.gen_range(0..ROWS) * DOT_SIZE)
}

fn free_cell<R: Rng + ?Sized>(rng: &mut R, worm: &Worm, attempts: u32) -> Result<Coords, GameError> {
    for _ in 0..attempts {
        let cell = random_cell(rng);
        if !worm.is_collision(cell) {
            return Ok(cell);
        }
    }

    error!("gave up placing food after {} attempts", attempts);
    Err(GameError::NoFreeCell { attempts })
}
