use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use tracing::warn;

use drill_core::ConjugationSource;
use drill_core::model::{FilterError, Filters, QuestionSeed, verb_class};

/// Draws question batches for a filter set.
///
/// Correct answers are resolved while building the eligible set, so every returned seed
/// already carries its frozen answer.
#[derive(Clone)]
pub struct QuestionSampler {
    source: Arc<dyn ConjugationSource>,
    rng: Arc<Mutex<StdRng>>,
}

impl QuestionSampler {
    #[must_use]
    pub fn new(source: Arc<dyn ConjugationSource>) -> Self {
        Self {
            source,
            rng: Arc::new(Mutex::new(StdRng::from_os_rng())),
        }
    }

    /// Use a deterministic RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn ConjugationSource> {
        &self.source
    }

    /// Every (verb, pronoun, tense, mood) combination the filters allow and the
    /// conjugation source defines, with its answer resolved.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::UnknownVerbClass` if the filters name an unknown vocabulary.
    pub fn eligible(&self, filters: &Filters) -> Result<Vec<QuestionSeed>, FilterError> {
        let class = verb_class(filters.verb_class())
            .ok_or_else(|| FilterError::UnknownVerbClass(filters.verb_class().to_string()))?;

        let mut out = Vec::new();
        for verb in class.verbs() {
            for &pronoun in filters.pronouns() {
                for &tense in filters.tenses() {
                    for &mood in filters.moods() {
                        let Some(answer) = self.source.correct_form(verb, pronoun, tense, mood)
                        else {
                            continue;
                        };
                        out.push(QuestionSeed {
                            verb: (*verb).to_string(),
                            pronoun,
                            tense,
                            mood,
                            correct_answer: answer,
                        });
                    }
                }
            }
        }
        Ok(out)
    }

    /// Exactly `count` questions in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `FilterError::NoEligibleQuestions` if the filters leave nothing to ask, or
    /// `FilterError::UnknownVerbClass` for an unknown vocabulary.
    pub fn sample(&self, filters: &Filters, count: usize) -> Result<Vec<QuestionSeed>, FilterError> {
        let eligible = self.eligible(filters)?;
        if eligible.is_empty() {
            return Err(FilterError::NoEligibleQuestions);
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(draw(eligible, count, &mut *rng))
    }
}

/// Uniform draw without replacement; tops up with replacement when `eligible` is too small.
pub(crate) fn draw<R: Rng + ?Sized>(
    mut eligible: Vec<QuestionSeed>,
    count: usize,
    rng: &mut R,
) -> Vec<QuestionSeed> {
    eligible.shuffle(rng);
    if eligible.len() >= count {
        eligible.truncate(count);
        return eligible;
    }

    warn!(
        eligible = eligible.len(),
        requested = count,
        "not enough distinct questions, sampling with replacement"
    );
    let mut batch = eligible.clone();
    while batch.len() < count {
        let Some(extra) = eligible.choose(rng) else {
            break;
        };
        batch.push(extra.clone());
    }
    batch.shuffle(rng);
    batch
}
