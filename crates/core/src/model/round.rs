use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::filters::Filters;
use crate::model::ids::RoundId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoundError {
    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("round status {status} does not match ended_at presence")]
    InconsistentStatus { status: &'static str },

    #[error("correct answers ({correct}) exceed question count ({total})")]
    CountMismatch { correct: u32, total: u32 },

    #[error("invalid round status: {0}")]
    InvalidStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Active,
    Completed,
}

impl RoundStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Active => "active",
            RoundStatus::Completed => "completed",
        }
    }

    /// # Errors
    ///
    /// Returns `RoundError::InvalidStatus` for anything but `active` / `completed`.
    pub fn parse(s: &str) -> Result<Self, RoundError> {
        match s {
            "active" => Ok(RoundStatus::Active),
            "completed" => Ok(RoundStatus::Completed),
            other => Err(RoundError::InvalidStatus(other.to_string())),
        }
    }
}

//
// ─── ROUND ─────────────────────────────────────────────────────────────────────
//

/// One bounded practice session with fixed filters and question count.
///
/// Filters are embedded by value; later changes to the learner's selection never touch a
/// stored round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    id: RoundId,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    filters: Filters,
    num_questions: u32,
    num_correct_answers: u32,
    status: RoundStatus,
}

impl Round {
    /// Rehydrate a round from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `RoundError` if the status and `ended_at` disagree, the time range is inverted,
    /// or the correct count exceeds the question count.
    pub fn from_persisted(
        id: RoundId,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        filters: Filters,
        num_questions: u32,
        num_correct_answers: u32,
        status: RoundStatus,
    ) -> Result<Self, RoundError> {
        match (status, ended_at) {
            (RoundStatus::Active, Some(_)) | (RoundStatus::Completed, None) => {
                return Err(RoundError::InconsistentStatus {
                    status: status.as_str(),
                });
            }
            (_, Some(ended)) if ended < started_at => return Err(RoundError::InvalidTimeRange),
            _ => {}
        }
        if num_correct_answers > num_questions {
            return Err(RoundError::CountMismatch {
                correct: num_correct_answers,
                total: num_questions,
            });
        }

        Ok(Self {
            id,
            started_at,
            ended_at,
            filters,
            num_questions,
            num_correct_answers,
            status,
        })
    }

    #[must_use]
    pub fn id(&self) -> RoundId {
        self.id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    #[must_use]
    pub fn num_questions(&self) -> u32 {
        self.num_questions
    }

    #[must_use]
    pub fn num_correct_answers(&self) -> u32 {
        self.num_correct_answers
    }

    #[must_use]
    pub fn status(&self) -> RoundStatus {
        self.status
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }

    /// Close the round. Returns `false` (and changes nothing) if it was already completed.
    pub fn complete(&mut self, ended_at: DateTime<Utc>, num_correct_answers: u32) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = RoundStatus::Completed;
        self.ended_at = Some(ended_at.max(self.started_at));
        self.num_correct_answers = num_correct_answers.min(self.num_questions);
        true
    }
}
