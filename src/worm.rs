use crate::config::{DOT_SIZE, FIELD_HEIGHT, FIELD_WIDTH};
use crate::error::ConfigError;
use crate::{Coords, Velocity};
use Direction::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right
}

impl Direction {
    pub fn velocity(self) -> Velocity {
        match self {
            Up => (0, -DOT_SIZE),
            Down => (0, DOT_SIZE),
            Left => (-DOT_SIZE, 0),
            Right => (DOT_SIZE, 0),
        }
    }
}

/// True for `(±D, 0)` and `(0, ±D)`.
pub fn is_unit_step(velocity: Velocity) -> bool {
    matches!(velocity, (d, 0) | (0, d) if d == DOT_SIZE || d == -DOT_SIZE)
}

/// A fixed-length worm on the toroidal field. Segment 0 is the head.
///
/// Per-segment velocities form a shift register: every tick the head takes
/// the latched direction and each other segment takes the velocity its
/// predecessor had on the previous tick. The register is a ring buffer, so
/// shifting only rotates `head_slot` and never reallocates.
pub struct Worm {
    positions: Vec<Coords>,
    velocities: Vec<Velocity>,
    head_slot: usize,
    pending: Velocity,
    points: u32,
}

impl Worm {
    pub fn new(length: usize, initial: Velocity) -> Result<Self, ConfigError> {
        if length == 0 {
            return Err(ConfigError::EmptyWorm);
        }

        if !is_unit_step(initial) {
            return Err(ConfigError::InvalidDirection(initial.0, initial.1));
        }

        Ok(Worm {
            positions: vec![(0, 0); length],
            velocities: vec![(0, 0); length],
            head_slot: 0,
            pending: initial,
            points: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn head(&self) -> Coords {
        self.positions[0]
    }

    pub fn segments(&self) -> &[Coords] {
        &self.positions
    }

    pub fn velocity(&self, segment: usize) -> Velocity {
        self.velocities[(self.head_slot + segment) % self.len()]
    }

    pub fn pending_direction(&self) -> Velocity {
        self.pending
    }

    /// Latches the head velocity for the next shift. Reversing straight into
    /// the neck is allowed.
    pub fn set_direction(&mut self, direction: Direction) {
        self.pending = direction.velocity();
    }

    pub fn shift_direction(&mut self) {
        let len = self.len();
        // The slot that held the tail's velocity becomes the head's.
        self.head_slot = (self.head_slot + len - 1) % len;
        self.velocities[self.head_slot] = self.pending;
    }

    pub fn move_step(&mut self) {
        for i in 0..self.len() {
            let (dx, dy) = self.velocity(i);
            let (x, y) = self.positions[i];
            self.positions[i] = (wrap(x + dx, FIELD_WIDTH), wrap(y + dy, FIELD_HEIGHT));
        }
    }

    pub fn is_collision(&self, pos: Coords) -> bool {
        self.positions.contains(&pos)
    }

    pub fn increment_score(&mut self) {
        self.points += 1;
    }

    pub fn score(&self) -> u32 {
        self.points
    }

    #[cfg(test)]
    pub fn place(&mut self, segment: usize, pos: Coords) {
        self.positions[segment] = pos;
    }
}

fn wrap(value: i32, extent: i32) -> i32 {
    if value < 0 {
        extent - DOT_SIZE
    } else if value >= extent {
        0
    } else {
        value
    }
}
