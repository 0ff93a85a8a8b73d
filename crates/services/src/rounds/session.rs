use drill_core::model::{
    AttemptOutcome, Guess, GuessId, GuessState, Resolution, Round, RoundId, Score,
};

use crate::error::RoundError;

/// Result of applying one submission or skip to a tracked guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessUpdate {
    /// The guess after the call. Unchanged while a retry is pending.
    pub guess: Guess,
    /// `None` for skips.
    pub outcome: Option<AttemptOutcome>,
    /// Set when this call finalized the guess and the result must be persisted.
    pub resolution: Option<Resolution>,
}

#[derive(Debug, Clone)]
struct Tracked {
    guess: Guess,
    state: GuessState,
}

impl Tracked {
    fn from_guess(guess: Guess) -> Self {
        let state = if guess.skipped() {
            GuessState::Finalized(Resolution::Skipped)
        } else if let Some(answer) = guess.user_answer() {
            GuessState::Finalized(Resolution::Answered {
                user_answer: answer.to_string(),
                is_correct: guess.is_correct() == Some(true),
            })
        } else {
            GuessState::Unanswered
        };
        Self { guess, state }
    }
}

/// In-memory answer tracking for one round.
///
/// This is the source of truth for the running score while the round is open; persistence
/// of finalized guesses trails behind it.
#[derive(Debug, Clone)]
pub struct RoundSession {
    round: Round,
    tracked: Vec<Tracked>,
}

impl RoundSession {
    /// Rebuild tracking state from persisted guesses. A retry that was pending before a
    /// restart is forgotten, the guess simply reads as unanswered.
    #[must_use]
    pub fn new(round: Round, guesses: Vec<Guess>) -> Self {
        Self {
            round,
            tracked: guesses.into_iter().map(Tracked::from_guess).collect(),
        }
    }

    #[must_use]
    pub fn round(&self) -> &Round {
        &self.round
    }

    #[must_use]
    pub fn round_id(&self) -> RoundId {
        self.round.id()
    }

    #[must_use]
    pub fn contains(&self, id: GuessId) -> bool {
        self.tracked.iter().any(|t| t.guess.id() == id)
    }

    /// Guesses in presentation order.
    #[must_use]
    pub fn guesses(&self) -> Vec<Guess> {
        self.tracked.iter().map(|t| t.guess.clone()).collect()
    }

    #[must_use]
    pub fn is_retry_pending(&self, id: GuessId) -> bool {
        self.tracked
            .iter()
            .any(|t| t.guess.id() == id && t.state.is_retry_pending())
    }

    #[must_use]
    pub fn score(&self) -> Score {
        Score::from_guesses(self.tracked.iter().map(|t| &t.guess))
    }

    /// Submit an answer under the round's retry policy.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::GuessNotFound` if the guess is not part of this round and
    /// `RoundError::GuessAlreadyFinalized` if it was resolved before.
    pub fn submit(&mut self, id: GuessId, user_answer: &str) -> Result<GuessUpdate, RoundError> {
        let allow_retry = self.round.filters().allow_retry();
        self.answer(id, user_answer, allow_retry)
    }

    /// Submit an answer that is final regardless of the retry policy.
    ///
    /// # Errors
    ///
    /// Same as [`RoundSession::submit`].
    pub fn submit_final(
        &mut self,
        id: GuessId,
        user_answer: &str,
    ) -> Result<GuessUpdate, RoundError> {
        self.answer(id, user_answer, false)
    }

    /// # Errors
    ///
    /// Same as [`RoundSession::submit`].
    pub fn skip(&mut self, id: GuessId) -> Result<GuessUpdate, RoundError> {
        let tracked = self.find(id)?;
        tracked
            .state
            .skip()
            .map_err(|_| RoundError::GuessAlreadyFinalized(id))?;
        tracked
            .guess
            .finalize_skip()
            .map_err(|_| RoundError::GuessAlreadyFinalized(id))?;
        Ok(GuessUpdate {
            guess: tracked.guess.clone(),
            outcome: None,
            resolution: Some(Resolution::Skipped),
        })
    }

    fn answer(
        &mut self,
        id: GuessId,
        user_answer: &str,
        allow_retry: bool,
    ) -> Result<GuessUpdate, RoundError> {
        let tracked = self.find(id)?;
        let correct_answer = tracked.guess.correct_answer().to_string();
        let outcome = tracked
            .state
            .submit(user_answer, &correct_answer, allow_retry)
            .map_err(|_| RoundError::GuessAlreadyFinalized(id))?;

        let resolution = match &tracked.state {
            GuessState::Finalized(resolution) => {
                tracked
                    .guess
                    .finalize_answer(user_answer)
                    .map_err(|_| RoundError::GuessAlreadyFinalized(id))?;
                Some(resolution.clone())
            }
            _ => None,
        };

        Ok(GuessUpdate {
            guess: tracked.guess.clone(),
            outcome: Some(outcome),
            resolution,
        })
    }

    fn find(&mut self, id: GuessId) -> Result<&mut Tracked, RoundError> {
        self.tracked
            .iter_mut()
            .find(|t| t.guess.id() == id)
            .ok_or(RoundError::GuessNotFound(id))
    }
}
