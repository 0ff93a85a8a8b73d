use serde::Serialize;

use crate::model::guess::Guess;

/// Running or final score of a round.
///
/// `total` counts resolved guesses (answered or skipped), not the round length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Score {
    pub correct: u32,
    pub total: u32,
}

impl Score {
    #[must_use]
    pub fn from_guesses<'a>(guesses: impl IntoIterator<Item = &'a Guess>) -> Self {
        guesses.into_iter().fold(Self::default(), |mut acc, guess| {
            if guess.is_correct() == Some(true) {
                acc.correct = acc.correct.saturating_add(1);
            }
            if guess.is_finalized() {
                acc.total = acc.total.saturating_add(1);
            }
            acc
        })
    }

    /// Rounded percentage of correct answers; 0 when nothing has been resolved.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let pct = (100.0 * f64::from(self.correct) / f64::from(self.total)).round();
        // bounded to 0..=100
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = pct as u32;
        pct
    }
}
