use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::linguistics::{Mood, Pronoun, Tense};
use crate::model::vocabulary::{DEFAULT_VERB_CLASS, verb_class};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterError {
    #[error("at least one pronoun must be selected")]
    EmptyPronouns,

    #[error("at least one tense must be selected")]
    EmptyTenses,

    #[error("at least one mood must be selected")]
    EmptyMoods,

    #[error("unknown pronoun: {0}")]
    UnknownPronoun(String),

    #[error("unknown tense: {0}")]
    UnknownTense(String),

    #[error("unknown mood: {0}")]
    UnknownMood(String),

    #[error("unsupported question count: {0}")]
    UnsupportedQuestionCount(u32),

    #[error("unknown verb class: {0}")]
    UnknownVerbClass(String),

    #[error("no conjugable forms match the selected filters")]
    NoEligibleQuestions,
}

//
// ─── DEFAULTS ──────────────────────────────────────────────────────────────────
//

/// Question counts a round may be created with.
pub const NUM_QUESTIONS_OPTIONS: [u32; 6] = [5, 10, 15, 20, 30, 50];

pub const DEFAULT_NUM_QUESTIONS: u32 = 10;
pub const DEFAULT_PRONOUNS: [Pronoun; 2] = [Pronoun::Yo, Pronoun::Tu];
pub const DEFAULT_TENSES: [Tense; 1] = [Tense::Present];
pub const DEFAULT_MOODS: [Mood; 1] = [Mood::Indicative];

//
// ─── RAW INPUT ─────────────────────────────────────────────────────────────────
//

/// Unvalidated filter selection as submitted by a client.
///
/// `None` means "not provided" and falls back to the documented default;
/// `Some(vec![])` is an explicit empty selection and is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronouns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenses: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moods: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verb_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_questions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_retry: Option<bool>,
}

//
// ─── VALIDATED FILTERS ─────────────────────────────────────────────────────────
//

/// Normalized filter set governing how a round is sampled.
///
/// Only constructed through [`Filters::validate`] (or rehydrated from storage), so the
/// pronoun, tense and mood sets are never empty and the verb class is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    pronouns: BTreeSet<Pronoun>,
    tenses: BTreeSet<Tense>,
    moods: BTreeSet<Mood>,
    verb_class: String,
    num_questions: u32,
    allow_retry: bool,
}

impl Filters {
    /// Normalizes and validates a raw filter selection.
    ///
    /// # Errors
    ///
    /// Returns `FilterError` if a dimension is explicitly empty, a code is unknown, the
    /// question count is not one of [`NUM_QUESTIONS_OPTIONS`], or the verb class is unknown.
    pub fn validate(raw: &RawFilters) -> Result<Self, FilterError> {
        let pronouns: BTreeSet<Pronoun> = match &raw.pronouns {
            None => DEFAULT_PRONOUNS.into_iter().collect(),
            Some(codes) => expand_pronoun_groups(codes)?.into_iter().collect(),
        };
        if pronouns.is_empty() {
            return Err(FilterError::EmptyPronouns);
        }

        let tenses: BTreeSet<Tense> = match &raw.tenses {
            None => DEFAULT_TENSES.into_iter().collect(),
            Some(codes) => codes
                .iter()
                .map(|c| Tense::from_code(c).ok_or_else(|| FilterError::UnknownTense(c.clone())))
                .collect::<Result<_, _>>()?,
        };
        if tenses.is_empty() {
            return Err(FilterError::EmptyTenses);
        }

        let moods: BTreeSet<Mood> = match &raw.moods {
            None => DEFAULT_MOODS.into_iter().collect(),
            Some(codes) => codes
                .iter()
                .map(|c| Mood::from_code(c).ok_or_else(|| FilterError::UnknownMood(c.clone())))
                .collect::<Result<_, _>>()?,
        };
        if moods.is_empty() {
            return Err(FilterError::EmptyMoods);
        }

        let num_questions = raw.num_questions.unwrap_or(DEFAULT_NUM_QUESTIONS);
        if !NUM_QUESTIONS_OPTIONS.contains(&num_questions) {
            return Err(FilterError::UnsupportedQuestionCount(num_questions));
        }

        let requested_class = raw.verb_class.as_deref().unwrap_or(DEFAULT_VERB_CLASS);
        let class = verb_class(requested_class)
            .ok_or_else(|| FilterError::UnknownVerbClass(requested_class.to_string()))?;

        Ok(Self {
            pronouns,
            tenses,
            moods,
            verb_class: class.key().to_string(),
            num_questions,
            allow_retry: raw.allow_retry.unwrap_or(false),
        })
    }

    /// Filters with every documented default applied.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            pronouns: DEFAULT_PRONOUNS.into_iter().collect(),
            tenses: DEFAULT_TENSES.into_iter().collect(),
            moods: DEFAULT_MOODS.into_iter().collect(),
            verb_class: DEFAULT_VERB_CLASS.to_string(),
            num_questions: DEFAULT_NUM_QUESTIONS,
            allow_retry: false,
        }
    }

    #[must_use]
    pub fn pronouns(&self) -> &BTreeSet<Pronoun> {
        &self.pronouns
    }

    #[must_use]
    pub fn tenses(&self) -> &BTreeSet<Tense> {
        &self.tenses
    }

    #[must_use]
    pub fn moods(&self) -> &BTreeSet<Mood> {
        &self.moods
    }

    #[must_use]
    pub fn verb_class(&self) -> &str {
        &self.verb_class
    }

    #[must_use]
    pub fn num_questions(&self) -> u32 {
        self.num_questions
    }

    #[must_use]
    pub fn allow_retry(&self) -> bool {
        self.allow_retry
    }

    /// Converts back to the raw shape, e.g. to echo the selection to a client.
    #[must_use]
    pub fn to_raw(&self) -> RawFilters {
        RawFilters {
            pronouns: Some(self.pronouns.iter().map(|p| p.as_str().to_string()).collect()),
            tenses: Some(self.tenses.iter().map(|t| t.as_str().to_string()).collect()),
            moods: Some(self.moods.iter().map(|m| m.as_str().to_string()).collect()),
            verb_class: Some(self.verb_class.clone()),
            num_questions: Some(self.num_questions),
            allow_retry: Some(self.allow_retry),
        }
    }
}

//
// ─── PRONOUN GROUPS ────────────────────────────────────────────────────────────
//

/// Expands UI pronoun groups such as `"él/ella"` into atomic pronoun codes.
///
/// The result is sorted and de-duplicated, so expanding an already expanded list is a no-op.
///
/// # Errors
///
/// Returns `FilterError::UnknownPronoun` for any segment that is not an atomic code.
pub fn expand_pronoun_groups<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Pronoun>, FilterError> {
    let mut out = BTreeSet::new();
    for entry in raw {
        let entry = entry.as_ref();
        for part in entry.split('/') {
            let pronoun = Pronoun::from_code(part)
                .ok_or_else(|| FilterError::UnknownPronoun(entry.trim().to_string()))?;
            out.insert(pronoun);
        }
    }
    Ok(out.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn raw_codes(codes: &[&str]) -> Option<Vec<String>> {
        Some(codes.iter().map(|c| (*c).to_string()).collect())
    }

    #[test]
    fn omitted_fields_fall_back_to_defaults() {
        let filters = Filters::validate(&RawFilters::default()).unwrap();
        assert_eq!(filters, Filters::defaults());
        assert_eq!(filters.num_questions(), 10);
        assert!(!filters.allow_retry());
        assert!(filters.pronouns().contains(&Pronoun::Yo));
        assert!(filters.pronouns().contains(&Pronoun::Tu));
    }

    #[test]
    fn explicit_empty_dimensions_are_rejected() {
        let raw = RawFilters {
            pronouns: Some(Vec::new()),
            ..RawFilters::default()
        };
        assert_eq!(Filters::validate(&raw), Err(FilterError::EmptyPronouns));

        let raw = RawFilters {
            tenses: Some(Vec::new()),
            ..RawFilters::default()
        };
        assert_eq!(Filters::validate(&raw), Err(FilterError::EmptyTenses));

        let raw = RawFilters {
            moods: Some(Vec::new()),
            ..RawFilters::default()
        };
        assert_eq!(Filters::validate(&raw), Err(FilterError::EmptyMoods));
    }

    #[test]
    fn question_count_must_be_supported() {
        let raw = RawFilters {
            num_questions: Some(7),
            ..RawFilters::default()
        };
        assert_eq!(
            Filters::validate(&raw),
            Err(FilterError::UnsupportedQuestionCount(7))
        );
    }

    #[test]
    fn unknown_verb_class_is_rejected() {
        let raw = RawFilters {
            verb_class: Some("top5000".into()),
            ..RawFilters::default()
        };
        assert_eq!(
            Filters::validate(&raw),
            Err(FilterError::UnknownVerbClass("top5000".into()))
        );
    }

    #[test]
    fn compound_groups_expand_to_atomic_codes() {
        let raw = RawFilters {
            pronouns: raw_codes(&["yo", "él/ella", "ellos/ellas/ustedes"]),
            ..RawFilters::default()
        };
        let filters = Filters::validate(&raw).unwrap();
        let codes: Vec<_> = filters.pronouns().iter().map(|p| p.as_str()).collect();
        assert_eq!(codes, vec!["yo", "el", "ella", "ellos", "ellas", "ustedes"]);
    }

    #[test]
    fn unknown_pronoun_names_the_offending_entry() {
        let err = expand_pronoun_groups(&["él/vos"]).unwrap_err();
        assert_eq!(err, FilterError::UnknownPronoun("él/vos".into()));
    }

    #[test]
    fn filters_serialize_with_camel_case_keys() {
        let json = serde_json::to_value(Filters::defaults()).unwrap();
        assert_eq!(json["verbClass"], "top20");
        assert_eq!(json["numQuestions"], 10);
        assert_eq!(json["pronouns"], serde_json::json!(["yo", "tu"]));
    }

    fn pronoun_entry() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(Pronoun::ALL.to_vec()), 1..4)
            .prop_map(|ps| ps.iter().map(|p| p.as_str()).collect::<Vec<_>>().join("/"))
    }

    proptest! {
        #[test]
        fn expansion_is_idempotent(entries in prop::collection::vec(pronoun_entry(), 0..6)) {
            let once = expand_pronoun_groups(&entries).unwrap();
            let codes: Vec<&str> = once.iter().map(|p| p.as_str()).collect();
            let twice = expand_pronoun_groups(&codes).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
