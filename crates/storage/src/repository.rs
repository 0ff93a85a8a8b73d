use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drill_core::model::{
    Filters, Guess, GuessId, Mood, Pronoun, QuestionSeed, Resolution, Round, RoundId,
    RoundStatus, Tense,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("an active round already exists")]
    ActiveRoundExists,

    #[error("guess already finalized")]
    AlreadyFinalized,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Input for atomically creating a round together with its full guess batch.
#[derive(Debug, Clone)]
pub struct NewRoundRecord {
    pub filters: Filters,
    pub started_at: DateTime<Utc>,
    /// Presentation order; persisted ids follow this order.
    pub seeds: Vec<QuestionSeed>,
}

/// A round with its guesses in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundWithGuesses {
    pub round: Round,
    pub guesses: Vec<Guess>,
}

/// Aggregation window for coverage queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageQuery {
    /// Restrict to these moods; `None` means all moods.
    pub moods: Option<BTreeSet<Mood>>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_until: Option<DateTime<Utc>>,
    /// Bins with fewer guesses are dropped.
    pub min_questions: u32,
}

impl Default for CoverageQuery {
    fn default() -> Self {
        Self {
            moods: None,
            created_from: None,
            created_until: None,
            min_questions: 1,
        }
    }
}

impl CoverageQuery {
    #[must_use]
    pub fn matches(&self, guess: &Guess) -> bool {
        if let Some(moods) = &self.moods
            && !moods.contains(&guess.mood())
        {
            return false;
        }
        if self.created_from.is_some_and(|from| guess.created_at() < from) {
            return false;
        }
        if self.created_until.is_some_and(|until| guess.created_at() > until) {
            return false;
        }
        true
    }
}

/// Number of guesses that asked a given pronoun/tense/mood combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageBinRecord {
    pub pronoun: Pronoun,
    pub tense: Tense,
    pub mood: Mood,
    pub question_count: u32,
}

/// Repository contract for rounds.
///
/// Implementations must guarantee that at most one round has status `active`, and that the
/// check happens atomically with the insert.
#[async_trait]
pub trait RoundRepository: Send + Sync {
    /// Insert an active round and its guesses in one unit of work.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ActiveRoundExists` if another round is active.
    async fn create_round(&self, new: NewRoundRecord) -> Result<RoundWithGuesses, StorageError>;

    /// Fetch a round and its guesses.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_round(&self, id: RoundId) -> Result<Option<RoundWithGuesses>, StorageError>;

    /// Fetch the active round, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn active_round(&self) -> Result<Option<RoundWithGuesses>, StorageError>;

    /// Mark a round completed. Completing a completed round returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the round does not exist.
    async fn complete_round(
        &self,
        id: RoundId,
        ended_at: DateTime<Utc>,
        num_correct_answers: u32,
    ) -> Result<Round, StorageError>;

    /// Complete `id` and create `new` in one unit of work. Nothing is written on failure.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if `id` does not exist, or
    /// `StorageError::ActiveRoundExists` if a different round is still active.
    async fn transition_round(
        &self,
        id: RoundId,
        ended_at: DateTime<Utc>,
        num_correct_answers: u32,
        new: NewRoundRecord,
    ) -> Result<(Round, RoundWithGuesses), StorageError>;

    /// Most recent rounds first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_rounds(&self, limit: u32) -> Result<Vec<Round>, StorageError>;

    /// Cheap reachability check.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the backend is unreachable.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[async_trait]
pub trait GuessRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_guess(&self, id: GuessId) -> Result<Option<Guess>, StorageError>;

    /// Guesses of a round in presentation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn guesses_for_round(&self, round_id: RoundId) -> Result<Vec<Guess>, StorageError>;

    /// Write the final answer or skip. The first finalization wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown ids and
    /// `StorageError::AlreadyFinalized` if the guess was answered or skipped before.
    async fn finalize_guess(
        &self,
        id: GuessId,
        resolution: &Resolution,
    ) -> Result<Guess, StorageError>;
}

#[async_trait]
pub trait CoverageRepository: Send + Sync {
    /// Guess counts grouped by pronoun/tense/mood, largest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn coverage_bins(
        &self,
        query: &CoverageQuery,
    ) -> Result<Vec<CoverageBinRecord>, StorageError>;
}

/// Sort order shared by every coverage implementation.
pub(crate) fn sort_bins(bins: &mut [CoverageBinRecord]) {
    bins.sort_by(|a, b| {
        b.question_count
            .cmp(&a.question_count)
            .then_with(|| (a.pronoun, a.tense, a.mood).cmp(&(b.pronoun, b.tense, b.mood)))
    });
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct InMemoryState {
    rounds: BTreeMap<RoundId, Round>,
    guesses: BTreeMap<GuessId, Guess>,
    next_round_id: u64,
    next_guess_id: u64,
}

impl InMemoryState {
    fn active_id(&self) -> Option<RoundId> {
        self.rounds
            .values()
            .find(|round| round.is_active())
            .map(Round::id)
    }

    fn guesses_for(&self, round_id: RoundId) -> Vec<Guess> {
        self.guesses
            .values()
            .filter(|g| g.round_id() == round_id)
            .cloned()
            .collect()
    }

    fn insert_round(&mut self, new: NewRoundRecord) -> Result<RoundWithGuesses, StorageError> {
        if self.active_id().is_some() {
            return Err(StorageError::ActiveRoundExists);
        }
        let num_questions = u32::try_from(new.seeds.len())
            .map_err(|_| StorageError::Serialization("too many guesses".into()))?;

        self.next_round_id += 1;
        let round_id = RoundId::new(self.next_round_id);
        let round = Round::from_persisted(
            round_id,
            new.started_at,
            None,
            new.filters,
            num_questions,
            0,
            RoundStatus::Active,
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut guesses = Vec::with_capacity(new.seeds.len());
        for seed in new.seeds {
            self.next_guess_id += 1;
            let guess = Guess::new(GuessId::new(self.next_guess_id), round_id, seed, new.started_at);
            self.guesses.insert(guess.id(), guess.clone());
            guesses.push(guess);
        }
        self.rounds.insert(round_id, round.clone());

        Ok(RoundWithGuesses { round, guesses })
    }

    fn complete(
        &mut self,
        id: RoundId,
        ended_at: DateTime<Utc>,
        num_correct_answers: u32,
    ) -> Result<Round, StorageError> {
        let round = self.rounds.get_mut(&id).ok_or(StorageError::NotFound)?;
        round.complete(ended_at, num_correct_answers);
        Ok(round.clone())
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// A single lock guards all tables, so every operation is atomic.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl RoundRepository for InMemoryRepository {
    async fn create_round(&self, new: NewRoundRecord) -> Result<RoundWithGuesses, StorageError> {
        self.lock()?.insert_round(new)
    }

    async fn get_round(&self, id: RoundId) -> Result<Option<RoundWithGuesses>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.rounds.get(&id).map(|round| RoundWithGuesses {
            round: round.clone(),
            guesses: guard.guesses_for(id),
        }))
    }

    async fn active_round(&self) -> Result<Option<RoundWithGuesses>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.active_id().and_then(|id| {
            guard.rounds.get(&id).map(|round| RoundWithGuesses {
                round: round.clone(),
                guesses: guard.guesses_for(id),
            })
        }))
    }

    async fn complete_round(
        &self,
        id: RoundId,
        ended_at: DateTime<Utc>,
        num_correct_answers: u32,
    ) -> Result<Round, StorageError> {
        self.lock()?.complete(id, ended_at, num_correct_answers)
    }

    async fn transition_round(
        &self,
        id: RoundId,
        ended_at: DateTime<Utc>,
        num_correct_answers: u32,
        new: NewRoundRecord,
    ) -> Result<(Round, RoundWithGuesses), StorageError> {
        let mut guard = self.lock()?;
        let Some(previous) = guard.rounds.get(&id).cloned() else {
            return Err(StorageError::NotFound);
        };
        let completed = guard.complete(id, ended_at, num_correct_answers)?;
        match guard.insert_round(new) {
            Ok(created) => Ok((completed, created)),
            Err(err) => {
                // undo the completion so the failed transition leaves no trace
                guard.rounds.insert(id, previous);
                Err(err)
            }
        }
    }

    async fn list_rounds(&self, limit: u32) -> Result<Vec<Round>, StorageError> {
        let guard = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut rounds: Vec<Round> = guard.rounds.values().cloned().collect();
        rounds.sort_by(|a, b| {
            b.started_at()
                .cmp(&a.started_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        rounds.truncate(limit);
        Ok(rounds)
    }
}

#[async_trait]
impl GuessRepository for InMemoryRepository {
    async fn get_guess(&self, id: GuessId) -> Result<Option<Guess>, StorageError> {
        Ok(self.lock()?.guesses.get(&id).cloned())
    }

    async fn guesses_for_round(&self, round_id: RoundId) -> Result<Vec<Guess>, StorageError> {
        Ok(self.lock()?.guesses_for(round_id))
    }

    async fn finalize_guess(
        &self,
        id: GuessId,
        resolution: &Resolution,
    ) -> Result<Guess, StorageError> {
        let mut guard = self.lock()?;
        let guess = guard.guesses.get_mut(&id).ok_or(StorageError::NotFound)?;
        let result = match resolution {
            Resolution::Answered { user_answer, .. } => {
                guess.finalize_answer(user_answer).map(|_| ())
            }
            Resolution::Skipped => guess.finalize_skip(),
        };
        result.map_err(|_| StorageError::AlreadyFinalized)?;
        Ok(guess.clone())
    }
}

#[async_trait]
impl CoverageRepository for InMemoryRepository {
    async fn coverage_bins(
        &self,
        query: &CoverageQuery,
    ) -> Result<Vec<CoverageBinRecord>, StorageError> {
        let guard = self.lock()?;
        let mut counts: HashMap<(Pronoun, Tense, Mood), u32> = HashMap::new();
        for guess in guard.guesses.values().filter(|g| query.matches(g)) {
            *counts
                .entry((guess.pronoun(), guess.tense(), guess.mood()))
                .or_default() += 1;
        }
        let mut bins: Vec<CoverageBinRecord> = counts
            .into_iter()
            .filter(|(_, count)| *count >= query.min_questions)
            .map(|((pronoun, tense, mood), question_count)| CoverageBinRecord {
                pronoun,
                tense,
                mood,
                question_count,
            })
            .collect();
        sort_bins(&mut bins);
        Ok(bins)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub rounds: Arc<dyn RoundRepository>,
    pub guesses: Arc<dyn GuessRepository>,
    pub coverage: Arc<dyn CoverageRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            rounds: Arc::new(repo.clone()),
            guesses: Arc::new(repo.clone()),
            coverage: Arc::new(repo),
        }
    }
}
