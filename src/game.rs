use std::time::Instant;

use log::{info, warn};
use rand::Rng;

use crate::config::GameConfig;
use crate::error::{ConfigError, GameError};
use crate::food::Food;
use crate::render::Render;
use crate::store::{load_high_score, save_high_score, KeyValueStore};
use crate::worm::{Direction, Worm};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Countdown,
    Running,
    Ended,
}

/// What the loop reports when a session is over.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GameSummary {
    pub final_score: u32,
    pub new_high_score: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing is running yet.
    Waiting,
    Continue,
    Ended(GameSummary),
}

struct Session {
    worm: Worm,
    food: Food,
    deadline: Instant,
}

enum State {
    Idle,
    Countdown { remaining: u32 },
    Running(Session),
    Ended { session: Session, summary: GameSummary },
}

/// One game session, from the start signal to time running out.
///
/// The loop owns no timers. The driver calls `countdown_tick` and `tick`
/// at their periods and passes the current time in, and direction input is
/// latched until the next `tick`.
pub struct GameLoop<S, R> {
    config: GameConfig,
    store: S,
    rng: R,
    state: State,
    high_score: u32,
    new_high_score: bool,
}

impl<S: KeyValueStore, R: Rng> GameLoop<S, R> {
    pub fn new(config: GameConfig, store: S, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let high_score = load_high_score(&store);

        Ok(GameLoop {
            config,
            store,
            rng,
            state: State::Idle,
            high_score,
            new_high_score: false,
        })
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Countdown { .. } => Phase::Countdown,
            State::Running(_) => Phase::Running,
            State::Ended { .. } => Phase::Ended,
        }
    }

    /// Leaves `Idle` and shows the first count. With a zero-length countdown
    /// the session begins right away.
    pub fn start(&mut self, now: Instant, sink: &mut impl Render) -> Result<(), GameError> {
        if !matches!(self.state, State::Idle) {
            return Ok(());
        }

        sink.high_score(self.high_score);

        let remaining = self.config.countdown_from;
        if remaining == 0 {
            return self.begin(now, sink);
        }

        sink.countdown(remaining);
        self.state = State::Countdown { remaining };
        Ok(())
    }

    pub fn countdown_tick(&mut self, now: Instant, sink: &mut impl Render) -> Result<(), GameError> {
        let remaining = match self.state {
            State::Countdown { remaining } => remaining - 1,
            _ => return Ok(()),
        };

        if remaining == 0 {
            return self.begin(now, sink);
        }

        sink.countdown(remaining);
        self.state = State::Countdown { remaining };
        Ok(())
    }

    fn begin(&mut self, now: Instant, sink: &mut impl Render) -> Result<(), GameError> {
        let worm = Worm::new(self.config.worm_length, self.config.initial_velocity)?;
        let food = Food::spawn(&mut self.rng, &worm)?;
        let deadline = now + self.config.session_length;

        info!(
            "session started: worm of {} segments, food at {:?}, high score {}",
            worm.len(),
            food.position(),
            self.high_score
        );

        sink.score(worm.score());
        sink.time(self.config.session_length.as_secs_f64());
        sink.frame(worm.segments(), 0, food.position());

        self.state = State::Running(Session { worm, food, deadline });
        Ok(())
    }

    pub fn on_direction(&mut self, direction: Direction) {
        if let State::Running(session) = &mut self.state {
            session.worm.set_direction(direction);
        }
    }

    /// Advances the running session by one step.
    pub fn tick(&mut self, now: Instant, sink: &mut impl Render) -> Result<TickOutcome, GameError> {
        let session = match &mut self.state {
            State::Running(session) => session,
            State::Ended { summary, .. } => return Ok(TickOutcome::Ended(*summary)),
            _ => return Ok(TickOutcome::Waiting),
        };

        let remaining = seconds_until(session.deadline, now);
        if remaining <= 0.0 {
            sink.time(0.0);
            return Ok(TickOutcome::Ended(self.finish()));
        }

        session.worm.shift_direction();
        session.worm.move_step();

        if session.worm.is_collision(session.food.position()) {
            session.worm.increment_score();

            let score = session.worm.score();
            if score > self.high_score {
                self.high_score = score;
                self.new_high_score = true;
                sink.high_score(score);

                if let Err(e) = save_high_score(&mut self.store, score, self.config.high_score_ttl) {
                    warn!("could not save high score {}: {}", score, e);
                }
            }

            session.food.relocate(&mut self.rng, &session.worm)?;
        }

        sink.frame(session.worm.segments(), 0, session.food.position());
        sink.score(session.worm.score());
        sink.time(remaining);

        Ok(TickOutcome::Continue)
    }

    fn finish(&mut self) -> GameSummary {
        let summary = GameSummary {
            final_score: self.score(),
            new_high_score: self.new_high_score,
        };

        if let State::Running(session) = std::mem::replace(&mut self.state, State::Idle) {
            info!(
                "session ended: score {}, high score {}{}",
                summary.final_score,
                self.high_score,
                if summary.new_high_score { " (new)" } else { "" }
            );
            self.state = State::Ended { session, summary };
        }

        summary
    }

    pub fn summary(&self) -> Option<GameSummary> {
        match &self.state {
            State::Ended { summary, .. } => Some(*summary),
            _ => None,
        }
    }

    pub fn score(&self) -> u32 {
        self.worm().map(Worm::score).unwrap_or(0)
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn is_new_high_score(&self) -> bool {
        self.new_high_score
    }

    /// Signed seconds left in the session, before any clamping.
    pub fn remaining(&self, now: Instant) -> Option<f64> {
        self.session().map(|session| seconds_until(session.deadline, now))
    }

    pub fn worm(&self) -> Option<&Worm> {
        self.session().map(|session| &session.worm)
    }

    pub fn food(&self) -> Option<&Food> {
        self.session().map(|session| &session.food)
    }

    fn session(&self) -> Option<&Session> {
        match &self.state {
            State::Running(session) | State::Ended { session, .. } => Some(session),
            _ => None,
        }
    }

    #[cfg(test)]
    fn place_food(&mut self, pos: crate::Coords) {
        if let State::Running(session) = &mut self.state {
            session.food = Food::at(pos);
        }
    }

    #[cfg(test)]
    fn store(&self) -> &S {
        &self.store
    }
}

fn seconds_until(deadline: Instant, now: Instant) -> f64 {
    match deadline.checked_duration_since(now) {
        Some(left) => left.as_secs_f64(),
        None => -now.duration_since(deadline).as_secs_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DOT_SIZE, FIELD_HEIGHT, FIELD_WIDTH};
    use crate::render::recorder::{Call, Recorder};
    use crate::store::MemoryStore;
    use crate::worm::Direction::*;
    use crate::Coords;
    use rand::{rngs::StdRng, SeedableRng};
    use std::time::Duration;

    type TestLoop = GameLoop<MemoryStore, StdRng>;

    const TICK: Duration = Duration::from_millis(100);
    const SECOND: Duration = Duration::from_secs(1);

    fn new_loop(high_score: u32) -> TestLoop {
        let mut store = MemoryStore::default();
        if high_score > 0 {
            save_high_score(&mut store, high_score, SECOND).unwrap();
        }
        GameLoop::new(GameConfig::default(), store, StdRng::seed_from_u64(17)).unwrap()
    }

    /// Runs start and the full countdown; returns the time the session began.
    fn run_countdown(game: &mut TestLoop, sink: &mut Recorder, start: Instant) -> Instant {
        game.start(start, sink).unwrap();
        let mut now = start;
        for _ in 0..3 {
            now += SECOND;
            game.countdown_tick(now, sink).unwrap();
        }
        now
    }

    fn next_head(game: &TestLoop) -> Coords {
        let worm = game.worm().unwrap();
        let (x, y) = worm.head();
        let (dx, dy) = worm.pending_direction();
        ((x + dx).rem_euclid(FIELD_WIDTH), (y + dy).rem_euclid(FIELD_HEIGHT))
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = GameConfig { worm_length: 0, ..Default::default() };
        let res = GameLoop::new(config, MemoryStore::default(), StdRng::seed_from_u64(1));
        assert_eq!(res.err(), Some(ConfigError::EmptyWorm));
    }

    #[test]
    fn counts_down_three_two_one_then_runs() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let start = Instant::now();

        assert_eq!(game.phase(), Phase::Idle);
        assert_eq!(game.tick(start, &mut sink).unwrap(), TickOutcome::Waiting);

        game.start(start, &mut sink).unwrap();
        assert_eq!(game.phase(), Phase::Countdown);
        assert!(game.worm().is_none());

        game.countdown_tick(start + SECOND, &mut sink).unwrap();
        game.countdown_tick(start + SECOND * 2, &mut sink).unwrap();
        assert_eq!(game.phase(), Phase::Countdown);
        game.countdown_tick(start + SECOND * 3, &mut sink).unwrap();
        assert_eq!(game.phase(), Phase::Running);

        let counts: Vec<u32> = sink
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Countdown(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(counts, vec![3, 2, 1]);

        let food = game.food().unwrap().position();
        assert!(!game.worm().unwrap().is_collision(food));
    }

    #[test]
    fn zero_countdown_starts_immediately() {
        let config = GameConfig { countdown_from: 0, ..Default::default() };
        let mut game = GameLoop::new(config, MemoryStore::default(), StdRng::seed_from_u64(2)).unwrap();
        let mut sink = Recorder::default();

        game.start(Instant::now(), &mut sink).unwrap();

        assert_eq!(game.phase(), Phase::Running);
        assert!(!sink.calls.iter().any(|c| matches!(c, Call::Countdown(_))));
    }

    #[test]
    fn start_is_ignored_once_started() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let start = Instant::now();
        let began = run_countdown(&mut game, &mut sink, start);

        game.start(began, &mut sink).unwrap();
        assert_eq!(game.phase(), Phase::Running);
    }

    #[test]
    fn first_tick_moves_only_the_head() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let began = run_countdown(&mut game, &mut sink, Instant::now());

        assert_eq!(game.tick(began + TICK, &mut sink).unwrap(), TickOutcome::Continue);

        let worm = game.worm().unwrap();
        assert_eq!(worm.head(), (DOT_SIZE, 0));
        assert!(worm.segments()[1..].iter().all(|&p| p == (0, 0)));

        match sink.frames().last() {
            Some(Call::Frame { segments, head_index, food }) => {
                assert_eq!(segments[0], (DOT_SIZE, 0));
                assert_eq!(*head_index, 0);
                assert_eq!(*food, game.food().unwrap().position());
            }
            other => panic!("expected a frame, got {:?}", other),
        }
    }

    #[test]
    fn eating_scores_one_and_moves_the_food_off_the_worm() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let began = run_countdown(&mut game, &mut sink, Instant::now());

        let target = next_head(&game);
        game.place_food(target);
        game.tick(began + TICK, &mut sink).unwrap();

        assert_eq!(game.score(), 1);
        let food = game.food().unwrap().position();
        assert_ne!(food, target);
        assert!(!game.worm().unwrap().is_collision(food));
        assert_eq!(sink.calls.iter().rev().find(|c| matches!(c, Call::Score(_))), Some(&Call::Score(1)));
    }

    #[test]
    fn direction_input_is_latched_until_the_next_tick() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let began = run_countdown(&mut game, &mut sink, Instant::now());
        game.place_food((100, 100));

        game.on_direction(Up);
        game.on_direction(Left);
        game.on_direction(Down);
        assert_eq!(game.worm().unwrap().head(), (0, 0));
        assert_eq!(game.worm().unwrap().velocity(0), (0, 0));

        game.tick(began + TICK, &mut sink).unwrap();

        assert_eq!(game.worm().unwrap().head(), (0, DOT_SIZE));
    }

    #[test]
    fn direction_before_running_is_ignored() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let start = Instant::now();

        game.on_direction(Up);
        let began = run_countdown(&mut game, &mut sink, start);

        assert_eq!(game.worm().unwrap().pending_direction(), (DOT_SIZE, 0));
        game.tick(began + TICK, &mut sink).unwrap();
    }

    #[test]
    fn time_up_ends_without_moving() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let began = run_countdown(&mut game, &mut sink, Instant::now());

        game.place_food((100, 100));
        game.tick(began + TICK, &mut sink).unwrap();
        let before = game.worm().unwrap().segments().to_vec();
        let frames_before = sink.frames().len();

        let deadline = began + Duration::from_secs(30);
        let outcome = game.tick(deadline, &mut sink).unwrap();

        let summary = GameSummary { final_score: 0, new_high_score: false };
        assert_eq!(outcome, TickOutcome::Ended(summary));
        assert_eq!(game.phase(), Phase::Ended);
        assert_eq!(game.worm().unwrap().segments(), before.as_slice());
        assert_eq!(sink.last_time(), Some(0.0));

        // Later ticks are inert.
        let outcome = game.tick(deadline + TICK * 5, &mut sink).unwrap();
        assert_eq!(outcome, TickOutcome::Ended(summary));
        assert_eq!(game.worm().unwrap().segments(), before.as_slice());
        assert_eq!(sink.frames().len(), frames_before);
        assert_eq!(game.summary(), Some(summary));
    }

    #[test]
    fn overdue_tick_ends_the_session() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let began = run_countdown(&mut game, &mut sink, Instant::now());

        let late = began + Duration::from_secs(45);
        assert!(game.remaining(late).unwrap() < 0.0);

        let outcome = game.tick(late, &mut sink).unwrap();
        assert!(matches!(outcome, TickOutcome::Ended(_)));
    }

    #[test]
    fn remaining_time_is_reported_raw() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let began = run_countdown(&mut game, &mut sink, Instant::now());
        game.place_food((100, 100));

        game.tick(began + Duration::from_millis(250), &mut sink).unwrap();

        let reported = sink.last_time().unwrap();
        assert!((reported - 29.75).abs() < 1e-9);
        assert_eq!(game.remaining(began + Duration::from_secs(31)), Some(-1.0));
    }

    #[test]
    fn beating_the_stored_high_score_sets_the_flag() {
        let mut game = new_loop(3);
        let mut sink = Recorder::default();
        let began = run_countdown(&mut game, &mut sink, Instant::now());
        let mut now = began;

        for _ in 0..5 {
            let target = next_head(&game);
            game.place_food(target);
            now += TICK;
            game.tick(now, &mut sink).unwrap();
        }

        assert_eq!(game.score(), 5);
        assert_eq!(game.high_score(), 5);
        assert!(game.is_new_high_score());
        assert_eq!(sink.high_scores(), vec![3, 4, 5]);
        assert_eq!(load_high_score(game.store()), 5);
        assert_eq!(game.store().writes, 1 + 2);

        // Flag stays set for the rest of the session.
        game.place_food((190, 190));
        now += TICK;
        game.tick(now, &mut sink).unwrap();
        assert!(game.is_new_high_score());

        let outcome = game.tick(began + Duration::from_secs(30), &mut sink).unwrap();
        assert_eq!(outcome, TickOutcome::Ended(GameSummary { final_score: 5, new_high_score: true }));
    }

    #[test]
    fn lower_score_leaves_high_score_alone() {
        let mut game = new_loop(10);
        let mut sink = Recorder::default();
        let began = run_countdown(&mut game, &mut sink, Instant::now());

        let target = next_head(&game);
        game.place_food(target);
        game.tick(began + TICK, &mut sink).unwrap();

        assert_eq!(game.score(), 1);
        assert_eq!(game.high_score(), 10);
        assert!(!game.is_new_high_score());
        assert_eq!(game.store().writes, 1);
    }

    #[test]
    fn score_never_decreases_and_food_never_overlaps() {
        let mut game = new_loop(0);
        let mut sink = Recorder::default();
        let began = run_countdown(&mut game, &mut sink, Instant::now());
        let turns = [Down, Right, Up, Right, Down, Left];
        let mut now = began;
        let mut last_score = 0;

        for step in 0..250 {
            if step % 9 == 0 {
                game.on_direction(turns[(step / 9) % turns.len()]);
            }
            if step % 4 == 0 {
                let target = next_head(&game);
                game.place_food(target);
            }
            now += TICK;
            game.tick(now, &mut sink).unwrap();

            assert!(game.score() >= last_score);
            last_score = game.score();

            let worm = game.worm().unwrap();
            assert!(!worm.is_collision(game.food().unwrap().position()));
            assert!(worm
                .segments()
                .iter()
                .all(|&(x, y)| (0..FIELD_WIDTH).contains(&x) && (0..FIELD_HEIGHT).contains(&y)));
        }

        assert!(last_score > 0);
    }

    #[test]
    fn high_score_carries_into_the_next_session() {
        let mut store = MemoryStore::default();
        let mut sink = Recorder::default();

        {
            let mut game = GameLoop::new(GameConfig::default(), &mut store, StdRng::seed_from_u64(9)).unwrap();
            game.start(Instant::now(), &mut sink).unwrap();
            let start = Instant::now();
            for i in 1..=3u32 {
                game.countdown_tick(start + SECOND * i, &mut sink).unwrap();
            }
            let target = {
                let worm = game.worm().unwrap();
                (worm.head().0 + DOT_SIZE, worm.head().1)
            };
            game.place_food(target);
            game.tick(start + SECOND * 3 + TICK, &mut sink).unwrap();
            assert_eq!(game.high_score(), 1);
        }

        let game = GameLoop::new(GameConfig::default(), &mut store, StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(game.high_score(), 1);
        assert!(!game.is_new_high_score());
    }
}
