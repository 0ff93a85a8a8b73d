//! Persistence for rounds and guesses.
//!
//! [`repository`] defines the async repository traits plus an in-memory backend;
//! [`sqlite`] is the durable backend built on `sqlx`.

#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;
