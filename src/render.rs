use crate::Coords;

/// Presentation side of the game. The simulation pushes state through this
/// and never reads anything back.
pub trait Render {
    /// Clears the field, draws every non-head segment, the head on top of
    /// them, then the food.
    fn frame(&mut self, segments: &[Coords], head_index: usize, food: Coords);
    fn countdown(&mut self, n: u32);
    fn score(&mut self, n: u32);
    /// Raw remaining seconds; flooring for display is up to the sink.
    fn time(&mut self, seconds: f64);
    fn high_score(&mut self, n: u32);
}

#[cfg(test)]
pub mod recorder {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Frame { segments: Vec<Coords>, head_index: usize, food: Coords },
        Countdown(u32),
        Score(u32),
        Time(f64),
        HighScore(u32),
    }

    #[derive(Default)]
    pub struct Recorder {
        pub calls: Vec<Call>,
    }

    impl Recorder {
        pub fn frames(&self) -> Vec<&Call> {
            self.calls.iter().filter(|c| matches!(c, Call::Frame { .. })).collect()
        }

        pub fn high_scores(&self) -> Vec<u32> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::HighScore(n) => Some(*n),
                    _ => None,
                })
                .collect()
        }

        pub fn last_time(&self) -> Option<f64> {
            self.calls.iter().rev().find_map(|c| match c {
                Call::Time(t) => Some(*t),
                _ => None,
            })
        }
    }

    impl Render for Recorder {
        fn frame(&mut self, segments: &[Coords], head_index: usize, food: Coords) {
            self.calls.push(Call::Frame { segments: segments.to_vec(), head_index, food });
        }

        fn countdown(&mut self, n: u32) {
            self.calls.push(Call::Countdown(n));
        }

        fn score(&mut self, n: u32) {
            self.calls.push(Call::Score(n));
        }

        fn time(&mut self, seconds: f64) {
            self.calls.push(Call::Time(seconds));
        }

        fn high_score(&mut self, n: u32) {
            self.calls.push(Call::HighScore(n));
        }
    }
}
