use serde::{Deserialize, Serialize};

use crate::model::guess::answers_match;

//
// ─── GUESS STATE ───────────────────────────────────────────────────────────────
//

/// How a finalized guess was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Answered { user_answer: String, is_correct: bool },
    Skipped,
}

/// Per-guess answer state machine.
///
/// `Unanswered -> RetryPending -> Finalized` or `Unanswered -> Finalized`.
/// A submission made while `RetryPending` always finalizes, so at most one retry is granted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GuessState {
    #[default]
    Unanswered,
    RetryPending {
        first_attempt: String,
    },
    Finalized(Resolution),
}

/// Result of a single submission, as shown to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    Correct,
    Incorrect,
    /// Wrong, but one more attempt is allowed; nothing was finalized.
    Retry,
}

/// Returned when a finalized guess receives another submission or skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyFinalized;

impl GuessState {
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        matches!(self, GuessState::Finalized(_))
    }

    #[must_use]
    pub fn is_retry_pending(&self) -> bool {
        matches!(self, GuessState::RetryPending { .. })
    }

    /// Apply a submission.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyFinalized` if the guess was already resolved.
    pub fn submit(
        &mut self,
        user_answer: &str,
        correct_answer: &str,
        allow_retry: bool,
    ) -> Result<AttemptOutcome, AlreadyFinalized> {
        let is_correct = answers_match(user_answer, correct_answer);
        let retry_available = match self {
            GuessState::Finalized(_) => return Err(AlreadyFinalized),
            GuessState::Unanswered => allow_retry,
            GuessState::RetryPending { .. } => false,
        };

        if !is_correct && retry_available {
            *self = GuessState::RetryPending {
                first_attempt: user_answer.to_string(),
            };
            return Ok(AttemptOutcome::Retry);
        }

        *self = GuessState::Finalized(Resolution::Answered {
            user_answer: user_answer.to_string(),
            is_correct,
        });
        Ok(if is_correct {
            AttemptOutcome::Correct
        } else {
            AttemptOutcome::Incorrect
        })
    }

    /// Skip, regardless of retry state.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyFinalized` if the guess was already resolved.
    pub fn skip(&mut self) -> Result<(), AlreadyFinalized> {
        if self.is_finalized() {
            return Err(AlreadyFinalized);
        }
        *self = GuessState::Finalized(Resolution::Skipped);
        Ok(())
    }
}
