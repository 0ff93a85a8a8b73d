//! HTTP surface for rounds, guesses, questions and coverage.

#![forbid(unsafe_code)]

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
