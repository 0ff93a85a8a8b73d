#![forbid(unsafe_code)]

pub mod coverage;
pub mod error;
pub mod questions;
pub mod rounds;

pub use drill_core::Clock;

pub use coverage::{CoverageOptions, CoverageReport, CoverageService};
pub use error::{CoverageError, QuestionError, RoundError};
pub use questions::{Question, QuestionService};
pub use rounds::{
    HistoryEntry, QuestionSampler, RoundManager, RoundView, SkipResult, SubmitResult,
    TransitionOutcome, TransitionReason,
};
