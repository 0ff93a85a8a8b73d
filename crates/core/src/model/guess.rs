use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{GuessId, RoundId};
use crate::model::linguistics::{Mood, Pronoun, Tense};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GuessError {
    #[error("guess {0} is already finalized")]
    AlreadyFinalized(GuessId),

    #[error("guess {0} has an answer but no correctness flag")]
    MissingCorrectness(GuessId),

    #[error("skipped guess {0} cannot carry an answer")]
    SkippedWithAnswer(GuessId),
}

/// Lower-cases and trims an answer before comparison.
#[must_use]
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Returns true if `user_answer` matches `correct_answer` ignoring case and surrounding
/// whitespace.
#[must_use]
pub fn answers_match(user_answer: &str, correct_answer: &str) -> bool {
    normalize_answer(user_answer) == normalize_answer(correct_answer)
}

//
// ─── QUESTION SEED ─────────────────────────────────────────────────────────────
//

/// A sampled question with its answer already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSeed {
    pub verb: String,
    pub pronoun: Pronoun,
    pub tense: Tense,
    pub mood: Mood,
    pub correct_answer: String,
}

impl QuestionSeed {
    /// The (verb, pronoun, tense, mood) combination this question asks about.
    #[must_use]
    pub fn combination(&self) -> (&str, Pronoun, Tense, Mood) {
        (&self.verb, self.pronoun, self.tense, self.mood)
    }
}

//
// ─── GUESS ─────────────────────────────────────────────────────────────────────
//

/// One question instance within a round plus the learner's eventual response.
///
/// `correct_answer` is frozen at creation; it is never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guess {
    id: GuessId,
    round_id: RoundId,
    verb: String,
    pronoun: Pronoun,
    tense: Tense,
    mood: Mood,
    correct_answer: String,
    user_answer: Option<String>,
    is_correct: Option<bool>,
    skipped: bool,
    created_at: DateTime<Utc>,
}

impl Guess {
    /// A freshly created, unanswered guess.
    #[must_use]
    pub fn new(id: GuessId, round_id: RoundId, seed: QuestionSeed, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            round_id,
            verb: seed.verb,
            pronoun: seed.pronoun,
            tense: seed.tense,
            mood: seed.mood,
            correct_answer: seed.correct_answer,
            user_answer: None,
            is_correct: None,
            skipped: false,
            created_at,
        }
    }

    /// Rehydrate a guess from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `GuessError` if the answer/correctness/skip columns are inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: GuessId,
        round_id: RoundId,
        seed: QuestionSeed,
        user_answer: Option<String>,
        is_correct: Option<bool>,
        skipped: bool,
        created_at: DateTime<Utc>,
    ) -> Result<Self, GuessError> {
        if skipped && user_answer.is_some() {
            return Err(GuessError::SkippedWithAnswer(id));
        }
        if user_answer.is_some() && is_correct.is_none() {
            return Err(GuessError::MissingCorrectness(id));
        }
        let mut guess = Self::new(id, round_id, seed, created_at);
        guess.user_answer = user_answer;
        guess.is_correct = if skipped { Some(false) } else { is_correct };
        guess.skipped = skipped;
        Ok(guess)
    }

    #[must_use]
    pub fn id(&self) -> GuessId {
        self.id
    }

    #[must_use]
    pub fn round_id(&self) -> RoundId {
        self.round_id
    }

    #[must_use]
    pub fn verb(&self) -> &str {
        &self.verb
    }

    #[must_use]
    pub fn pronoun(&self) -> Pronoun {
        self.pronoun
    }

    #[must_use]
    pub fn tense(&self) -> Tense {
        self.tense
    }

    #[must_use]
    pub fn mood(&self) -> Mood {
        self.mood
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn user_answer(&self) -> Option<&str> {
        self.user_answer.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.is_correct
    }

    #[must_use]
    pub fn skipped(&self) -> bool {
        self.skipped
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Answered or skipped; either way immutable from here on.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.user_answer.is_some() || self.skipped
    }

    /// Record the final answer, computing correctness against the frozen answer.
    ///
    /// # Errors
    ///
    /// Returns `GuessError::AlreadyFinalized` if the guess was answered or skipped before.
    pub fn finalize_answer(&mut self, user_answer: &str) -> Result<bool, GuessError> {
        if self.is_finalized() {
            return Err(GuessError::AlreadyFinalized(self.id));
        }
        let correct = answers_match(user_answer, &self.correct_answer);
        self.user_answer = Some(user_answer.to_string());
        self.is_correct = Some(correct);
        Ok(correct)
    }

    /// Mark the guess as skipped.
    ///
    /// # Errors
    ///
    /// Returns `GuessError::AlreadyFinalized` if the guess was answered or skipped before.
    pub fn finalize_skip(&mut self) -> Result<(), GuessError> {
        if self.is_finalized() {
            return Err(GuessError::AlreadyFinalized(self.id));
        }
        self.user_answer = None;
        self.is_correct = Some(false);
        self.skipped = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn seed() -> QuestionSeed {
        QuestionSeed {
            verb: "hablar".into(),
            pronoun: Pronoun::Yo,
            tense: Tense::Present,
            mood: Mood::Indicative,
            correct_answer: "hablo".into(),
        }
    }

    fn guess() -> Guess {
        Guess::new(GuessId::new(1), RoundId::new(1), seed(), fixed_now())
    }

    #[test]
    fn matching_ignores_case_and_whitespace_only() {
        assert!(answers_match("  Hablo ", "hablo"));
        assert!(!answers_match("hablé", "hable"));
    }

    #[test]
    fn answer_finalizes_once() {
        let mut g = guess();
        assert!(g.finalize_answer("HABLO").unwrap());
        assert_eq!(g.user_answer(), Some("HABLO"));
        assert_eq!(g.is_correct(), Some(true));

        let err = g.finalize_answer("habla").unwrap_err();
        assert_eq!(err, GuessError::AlreadyFinalized(GuessId::new(1)));
        assert_eq!(g.user_answer(), Some("HABLO"));
    }

    #[test]
    fn skip_marks_incorrect_without_answer() {
        let mut g = guess();
        g.finalize_skip().unwrap();
        assert!(g.skipped());
        assert_eq!(g.user_answer(), None);
        assert_eq!(g.is_correct(), Some(false));
        assert!(g.finalize_skip().is_err());
    }

    #[test]
    fn persisted_skip_with_answer_is_rejected() {
        let err = Guess::from_persisted(
            GuessId::new(2),
            RoundId::new(1),
            seed(),
            Some("hablo".into()),
            Some(true),
            true,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, GuessError::SkippedWithAnswer(GuessId::new(2)));
    }
}
