//! Stateless question sampling and conjugation lookups. Nothing here touches storage.

use serde::Serialize;

use drill_core::conjugation::ConjugatedForm;
use drill_core::model::{Filters, Mood, Pronoun, RawFilters, Tense, fold_code};

use crate::error::QuestionError;
use crate::rounds::QuestionSampler;

pub const MAX_QUESTION_COUNT: u32 = 100;

/// One stateless question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub verb: String,
    pub pronoun: Pronoun,
    pub tense: Tense,
    pub mood: Mood,
    pub answer: String,
}

#[derive(Clone)]
pub struct QuestionService {
    sampler: QuestionSampler,
}

impl QuestionService {
    #[must_use]
    pub fn new(sampler: QuestionSampler) -> Self {
        Self { sampler }
    }

    /// Sample `count` questions without creating a round.
    ///
    /// Only the pronoun, tense and mood selections of `raw` are used; omitted dimensions take
    /// the usual defaults.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::CountOutOfRange` unless `1 <= count <= 100`, and
    /// `QuestionError::InvalidFilters` for unusable selections.
    pub fn questions(&self, count: u32, raw: &RawFilters) -> Result<Vec<Question>, QuestionError> {
        if !(1..=MAX_QUESTION_COUNT).contains(&count) {
            return Err(QuestionError::CountOutOfRange {
                count,
                max: MAX_QUESTION_COUNT,
            });
        }
        let filters = Filters::validate(&RawFilters {
            pronouns: raw.pronouns.clone(),
            tenses: raw.tenses.clone(),
            moods: raw.moods.clone(),
            verb_class: raw.verb_class.clone(),
            ..RawFilters::default()
        })?;
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let seeds = self.sampler.sample(&filters, count)?;
        Ok(seeds
            .into_iter()
            .map(|seed| Question {
                verb: seed.verb,
                pronoun: seed.pronoun,
                tense: seed.tense,
                mood: seed.mood,
                answer: seed.correct_answer,
            })
            .collect())
    }

    /// Every defined form of `verb`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownVerb` if the conjugation source defines no form.
    pub fn conjugations(&self, verb: &str) -> Result<Vec<ConjugatedForm>, QuestionError> {
        let verb = fold_code(verb);
        let forms = self.sampler.source().conjugation_table(&verb);
        if forms.is_empty() {
            return Err(QuestionError::UnknownVerb(verb));
        }
        Ok(forms)
    }
}
