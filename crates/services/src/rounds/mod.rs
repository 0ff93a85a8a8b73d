mod manager;
mod sampler;
mod session;

// Public API of the round subsystem.
pub use crate::error::RoundError;
pub use manager::{
    DEFAULT_HISTORY_LIMIT, HistoryEntry, MAX_HISTORY_LIMIT, RoundManager, RoundView, SkipResult,
    SubmitResult, TransitionOutcome, TransitionReason,
};
pub use sampler::QuestionSampler;
pub use session::{GuessUpdate, RoundSession};
