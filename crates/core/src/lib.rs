#![forbid(unsafe_code)]

pub mod conjugation;
pub mod model;
pub mod time;

pub use conjugation::{ConjugationSource, TableConjugator};
pub use time::Clock;
