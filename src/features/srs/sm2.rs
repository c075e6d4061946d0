//! SM-2 spaced repetition scheduling.
//!
//! Source: https://www.supermemo.com/en/archives1990-2015/english/ol/sm2
//!
//! Grades (0-5): 0-2 mean the answer was not recalled and the card starts
//! over, 3-5 mean successful recall with increasing confidence.

/// Minimum easiness factor a card can reach.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Scheduling strategy interface. The study handlers only ever talk to this
/// trait, never to a concrete algorithm.
pub trait SpacedRepetitionAlgo {
    /// Maps a review grade and the card's prior state to
    /// `(new_interval, new_repetitions, new_easiness_factor)`.
    ///
    /// Total over grade in 0..=5, repetitions >= 0, interval >= 0,
    /// easiness_factor >= 1.3. No I/O, deterministic.
    fn calculate(
        &self,
        grade: i32,
        repetitions: i32,
        interval: i32,
        easiness_factor: f64,
    ) -> (i32, i32, f64);
}

pub struct Sm2Algorithm;

impl SpacedRepetitionAlgo for Sm2Algorithm {
    fn calculate(
        &self,
        grade: i32,
        repetitions: i32,
        interval: i32,
        easiness_factor: f64,
    ) -> (i32, i32, f64) {
        // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
        let miss = (5 - grade) as f64;
        let new_ef = (easiness_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR);

        let (new_interval, new_repetitions) = if grade < 3 {
            // Not recalled. Start over again
            (1, 0)
        } else {
            let new_repetitions = repetitions + 1;
            let new_interval = match new_repetitions {
                1 => 1,
                2 => 6,
                _ => (interval as f64 * new_ef).round() as i32,
            };
            (new_interval, new_repetitions)
        };

        (new_interval, new_repetitions, round2(new_ef))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
