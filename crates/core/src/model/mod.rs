mod attempt;
mod filters;
mod guess;
mod ids;
mod linguistics;
mod round;
mod score;
pub mod vocabulary;

pub use ids::{GuessId, ParseIdError, RoundId};
pub use linguistics::{Mood, Pronoun, Tense, fold_code};

pub use attempt::{AlreadyFinalized, AttemptOutcome, GuessState, Resolution};
pub use filters::{
    DEFAULT_MOODS, DEFAULT_NUM_QUESTIONS, DEFAULT_PRONOUNS, DEFAULT_TENSES, FilterError, Filters,
    NUM_QUESTIONS_OPTIONS, RawFilters, expand_pronoun_groups,
};
pub use guess::{Guess, GuessError, QuestionSeed, answers_match, normalize_answer};
pub use round::{Round, RoundError, RoundStatus};
pub use score::Score;
pub use vocabulary::{DEFAULT_VERB_CLASS, VerbClass, verb_class};
