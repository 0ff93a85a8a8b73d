//! Coverage reporting over historical guesses.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use drill_core::model::{Mood, Pronoun, Tense};
use storage::repository::{CoverageBinRecord, CoverageQuery, CoverageRepository};

use crate::error::CoverageError;

/// Caller-facing coverage filters. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageOptions {
    pub moods: Option<BTreeSet<Mood>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Defaults to 1.
    pub min_questions: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageBin {
    pub pronoun: Pronoun,
    pub tense: Tense,
    pub mood: Mood,
    pub question_count: u32,
}

impl From<CoverageBinRecord> for CoverageBin {
    fn from(r: CoverageBinRecord) -> Self {
        Self {
            pronoun: r.pronoun,
            tense: r.tense,
            mood: r.mood,
            question_count: r.question_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageMetadata {
    pub total_questions: u32,
    pub unique_bins: usize,
    pub mood_filter: Option<Vec<Mood>>,
    pub date_range: DateRange,
    pub min_questions: u32,
}

/// Pronoun × tense counts, summed over moods.
pub type CoverageMatrix = BTreeMap<Pronoun, BTreeMap<Tense, u32>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub metadata: CoverageMetadata,
    /// Largest bins first.
    pub bins: Vec<CoverageBin>,
    pub matrix: CoverageMatrix,
}

#[must_use]
pub fn pronoun_tense_matrix(bins: &[CoverageBin]) -> CoverageMatrix {
    let mut matrix = CoverageMatrix::new();
    for bin in bins {
        *matrix
            .entry(bin.pronoun)
            .or_default()
            .entry(bin.tense)
            .or_default() += bin.question_count;
    }
    matrix
}

#[derive(Clone)]
pub struct CoverageService {
    coverage: Arc<dyn CoverageRepository>,
}

impl CoverageService {
    #[must_use]
    pub fn new(coverage: Arc<dyn CoverageRepository>) -> Self {
        Self { coverage }
    }

    /// Aggregate guesses from open and completed rounds.
    ///
    /// # Errors
    ///
    /// Returns `CoverageError::InvalidDateRange` if `start` is after `end`, or
    /// `CoverageError::Storage` on storage failures.
    pub async fn report(&self, options: &CoverageOptions) -> Result<CoverageReport, CoverageError> {
        if let (Some(start), Some(end)) = (options.start, options.end)
            && start > end
        {
            return Err(CoverageError::InvalidDateRange);
        }

        let query = CoverageQuery {
            moods: options.moods.clone(),
            created_from: options.start,
            created_until: options.end,
            min_questions: options.min_questions.unwrap_or(1),
        };
        let bins: Vec<CoverageBin> = self
            .coverage
            .coverage_bins(&query)
            .await?
            .into_iter()
            .map(CoverageBin::from)
            .collect();

        let metadata = CoverageMetadata {
            total_questions: bins.iter().map(|b| b.question_count).sum(),
            unique_bins: bins.len(),
            mood_filter: options.moods.as_ref().map(|m| m.iter().copied().collect()),
            date_range: DateRange {
                start: options.start,
                end: options.end,
            },
            min_questions: query.min_questions,
        };
        let matrix = pronoun_tense_matrix(&bins);
        Ok(CoverageReport {
            metadata,
            bins,
            matrix,
        })
    }
}
