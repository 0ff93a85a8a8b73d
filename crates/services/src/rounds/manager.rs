use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use drill_core::model::{
    AttemptOutcome, Filters, Guess, GuessId, RawFilters, Resolution, Round, RoundId, Score,
};
use storage::repository::{
    GuessRepository, NewRoundRecord, RoundRepository, RoundWithGuesses, Storage, StorageError,
};

use super::sampler::QuestionSampler;
use super::session::{GuessUpdate, RoundSession};
use crate::Clock;
use crate::error::RoundError;

pub const DEFAULT_HISTORY_LIMIT: u32 = 20;
pub const MAX_HISTORY_LIMIT: u32 = 100;

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// A round with its guesses and the score derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub round: Round,
    pub guesses: Vec<Guess>,
    pub score: Score,
}

impl RoundView {
    fn from_session(session: &RoundSession) -> Self {
        Self {
            round: session.round().clone(),
            guesses: session.guesses(),
            score: session.score(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    FiltersChanged,
    /// Same filters, fresh questions.
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub completed_round: Round,
    pub new_round: RoundView,
    pub reason: TransitionReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub guess: Guess,
    pub outcome: AttemptOutcome,
    /// Revealed once the guess is final; withheld while a retry is pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipResult {
    pub guess: Guess,
    pub correct_answer: String,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub round: Round,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guesses: Option<Vec<Guess>>,
}

//
// ─── MANAGER ───────────────────────────────────────────────────────────────────
//

/// Owns the round lifecycle and routes answers through the in-memory guess tracker.
///
/// Finalized guesses are written back in background tasks. Completion and transition wait for
/// those writes before closing a round.
#[derive(Clone)]
pub struct RoundManager {
    clock: Clock,
    rounds: Arc<dyn RoundRepository>,
    guesses: Arc<dyn GuessRepository>,
    sampler: QuestionSampler,
    sessions: Arc<Mutex<HashMap<RoundId, RoundSession>>>,
    syncs: Arc<SyncMutex<JoinSet<()>>>,
}

impl RoundManager {
    #[must_use]
    pub fn new(
        clock: Clock,
        rounds: Arc<dyn RoundRepository>,
        guesses: Arc<dyn GuessRepository>,
        sampler: QuestionSampler,
    ) -> Self {
        Self {
            clock,
            rounds,
            guesses,
            sampler,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            syncs: Arc::new(SyncMutex::new(JoinSet::new())),
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage, sampler: QuestionSampler) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.rounds),
            Arc::clone(&storage.guesses),
            sampler,
        )
    }

    /// Validate `raw`, sample a batch and persist the round with its guesses.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::InvalidFilters` for unusable filters,
    /// `RoundError::ActiveRoundExists` if a round is already active, and
    /// `RoundError::PersistenceUnavailable` if the store cannot be reached.
    pub async fn create_round(&self, raw: &RawFilters) -> Result<RoundView, RoundError> {
        let record = self.new_round_record(raw)?;
        let created = self.rounds.create_round(record).await?;
        info!(
            round_id = %created.round.id(),
            num_questions = created.round.num_questions(),
            "round created"
        );
        Ok(self.track(created).await)
    }

    /// The active round with live guess state.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::NoActiveRound` if every round is completed.
    pub async fn get_active_round(&self) -> Result<RoundView, RoundError> {
        let active = self
            .rounds
            .active_round()
            .await?
            .ok_or(RoundError::NoActiveRound)?;
        Ok(self.view(active).await)
    }

    /// # Errors
    ///
    /// Returns `RoundError::RoundNotFound` for unknown ids.
    pub async fn get_round(&self, id: RoundId) -> Result<RoundView, RoundError> {
        let found = self
            .rounds
            .get_round(id)
            .await?
            .ok_or(RoundError::RoundNotFound(id))?;
        Ok(self.view(found).await)
    }

    /// Close a round with its current score. Completing a completed round returns it as is.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::RoundNotFound` for unknown ids.
    pub async fn complete_round(&self, id: RoundId) -> Result<Round, RoundError> {
        self.flush_pending_syncs().await;
        let mut sessions = self.sessions.lock().await;
        let num_correct = self.correct_answers(&sessions, id).await?;
        let round = self
            .rounds
            .complete_round(id, self.clock.now(), num_correct)
            .await
            .map_err(|e| round_not_found(e, id))?;
        sessions.remove(&id);
        drop(sessions);
        info!(
            round_id = %id,
            num_correct_answers = round.num_correct_answers(),
            "round completed"
        );
        Ok(round)
    }

    /// Complete `id` and open a round with new filters in one storage transaction.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::InvalidFilters` before anything is written,
    /// `RoundError::RoundNotFound` for unknown ids, and `RoundError::ActiveRoundExists` if
    /// some other round is active.
    pub async fn transition_round(
        &self,
        id: RoundId,
        raw: &RawFilters,
    ) -> Result<TransitionOutcome, RoundError> {
        let record = self.new_round_record(raw)?;
        self.flush_pending_syncs().await;
        let mut sessions = self.sessions.lock().await;
        let num_correct = self.correct_answers(&sessions, id).await?;

        let (completed, created) = self
            .rounds
            .transition_round(id, self.clock.now(), num_correct, record)
            .await
            .map_err(|e| round_not_found(e, id))?;
        sessions.remove(&id);
        let new_round = track_in(&mut sessions, created);
        drop(sessions);

        let reason = if completed.filters() == new_round.round.filters() {
            TransitionReason::Restart
        } else {
            TransitionReason::FiltersChanged
        };
        info!(
            completed_round_id = %completed.id(),
            new_round_id = %new_round.round.id(),
            ?reason,
            "round transitioned"
        );

        Ok(TransitionOutcome {
            completed_round: completed,
            new_round,
            reason,
        })
    }

    /// Most recent rounds first. `limit` defaults to 20 and is capped at 100.
    ///
    /// # Errors
    ///
    /// Returns `RoundError` on storage failures.
    pub async fn history(
        &self,
        limit: Option<u32>,
        include_questions: bool,
    ) -> Result<Vec<HistoryEntry>, RoundError> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        let rounds = self.rounds.list_rounds(limit).await?;

        let mut out = Vec::with_capacity(rounds.len());
        for round in rounds {
            let guesses = if include_questions {
                Some(self.guesses.guesses_for_round(round.id()).await?)
            } else {
                None
            };
            out.push(HistoryEntry { round, guesses });
        }
        Ok(out)
    }

    /// Filters of the most recently started round.
    ///
    /// # Errors
    ///
    /// Returns `RoundError` on storage failures.
    pub async fn last_used_filters(&self) -> Result<Option<Filters>, RoundError> {
        let latest = self.rounds.list_rounds(1).await?;
        Ok(latest.into_iter().next().map(|r| r.filters().clone()))
    }

    /// Submit an answer under the round's retry policy.
    ///
    /// # Errors
    ///
    /// Returns `RoundError::GuessNotFound` for unknown guesses,
    /// `RoundError::GuessAlreadyFinalized` if the guess was already resolved and
    /// `RoundError::RoundCompleted` once its round is closed.
    pub async fn submit_answer(
        &self,
        guess_id: GuessId,
        user_answer: &str,
    ) -> Result<SubmitResult, RoundError> {
        let (update, score) = self
            .apply(guess_id, |session| session.submit(guess_id, user_answer))
            .await?;
        let outcome = update.outcome.unwrap_or(AttemptOutcome::Incorrect);
        debug!(guess_id = %guess_id, ?outcome, "answer submitted");

        let correct_answer = update
            .guess
            .is_finalized()
            .then(|| update.guess.correct_answer().to_string());
        Ok(SubmitResult {
            guess: update.guess,
            outcome,
            correct_answer,
            score,
        })
    }

    /// # Errors
    ///
    /// Same as [`RoundManager::submit_answer`].
    pub async fn skip_guess(&self, guess_id: GuessId) -> Result<SkipResult, RoundError> {
        let (update, score) = self
            .apply(guess_id, |session| session.skip(guess_id))
            .await?;
        debug!(guess_id = %guess_id, "guess skipped");
        Ok(SkipResult {
            correct_answer: update.guess.correct_answer().to_string(),
            guess: update.guess,
            score,
        })
    }

    /// Finalize a guess in one step, as older clients do after checking the answer locally.
    ///
    /// Correctness is always recomputed here; `client_is_correct` is only compared and logged.
    ///
    /// # Errors
    ///
    /// Same as [`RoundManager::submit_answer`].
    pub async fn record_answer(
        &self,
        guess_id: GuessId,
        user_answer: &str,
        client_is_correct: Option<bool>,
    ) -> Result<Guess, RoundError> {
        let (update, _) = self
            .apply(guess_id, |session| session.submit_final(guess_id, user_answer))
            .await?;
        let is_correct = update.guess.is_correct();
        if let Some(claimed) = client_is_correct
            && Some(claimed) != is_correct
        {
            warn!(
                guess_id = %guess_id,
                claimed,
                ?is_correct,
                "client correctness disagrees with server, keeping server value"
            );
        }
        Ok(update.guess)
    }

    /// Wait for every background guess write started so far.
    pub async fn flush_pending_syncs(&self) {
        let mut pending = {
            let mut syncs = self.syncs.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *syncs)
        };
        while let Some(joined) = pending.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "guess sync task did not finish");
            }
        }
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn new_round_record(&self, raw: &RawFilters) -> Result<NewRoundRecord, RoundError> {
        let filters = Filters::validate(raw)?;
        let count = usize::try_from(filters.num_questions()).unwrap_or(usize::MAX);
        let seeds = self.sampler.sample(&filters, count)?;
        Ok(NewRoundRecord {
            filters,
            started_at: self.clock.now(),
            seeds,
        })
    }

    async fn track(&self, created: RoundWithGuesses) -> RoundView {
        track_in(&mut *self.sessions.lock().await, created)
    }

    /// Prefer the live session over stored guesses, which may lag behind.
    async fn view(&self, stored: RoundWithGuesses) -> RoundView {
        let sessions = self.sessions.lock().await;
        match sessions.get(&stored.round.id()) {
            Some(session) => RoundView {
                round: stored.round,
                guesses: session.guesses(),
                score: session.score(),
            },
            None => RoundView {
                score: Score::from_guesses(&stored.guesses),
                round: stored.round,
                guesses: stored.guesses,
            },
        }
    }

    /// Takes the locked session map so no answer can land between reading the score and
    /// closing the round.
    async fn correct_answers(
        &self,
        sessions: &HashMap<RoundId, RoundSession>,
        id: RoundId,
    ) -> Result<u32, RoundError> {
        if let Some(session) = sessions.get(&id) {
            return Ok(session.score().correct);
        }
        let guesses = self.guesses.guesses_for_round(id).await?;
        Ok(Score::from_guesses(&guesses).correct)
    }

    /// Run `f` against the session owning `guess_id` and queue persistence of any
    /// finalization. The session lock serializes concurrent submissions and orders them
    /// against completion, so only active rounds are ever tracked here.
    async fn apply<F>(&self, guess_id: GuessId, f: F) -> Result<(GuessUpdate, Score), RoundError>
    where
        F: FnOnce(&mut RoundSession) -> Result<GuessUpdate, RoundError>,
    {
        let mut sessions = self.sessions.lock().await;
        let round_id = match sessions.values().find(|s| s.contains(guess_id)) {
            Some(session) => session.round_id(),
            None => {
                let session = self.load_session(guess_id).await?;
                let round_id = session.round_id();
                sessions.insert(round_id, session);
                round_id
            }
        };
        let session = sessions
            .get_mut(&round_id)
            .ok_or(RoundError::GuessNotFound(guess_id))?;

        let update = f(session)?;
        let score = session.score();
        drop(sessions);

        if let Some(resolution) = update.resolution.clone() {
            self.persist(guess_id, resolution);
        }
        Ok((update, score))
    }

    async fn load_session(&self, guess_id: GuessId) -> Result<RoundSession, RoundError> {
        self.flush_pending_syncs().await;
        let guess = self
            .guesses
            .get_guess(guess_id)
            .await?
            .ok_or(RoundError::GuessNotFound(guess_id))?;
        let stored = self
            .rounds
            .get_round(guess.round_id())
            .await?
            .ok_or(RoundError::GuessNotFound(guess_id))?;
        if !stored.round.is_active() {
            return Err(RoundError::RoundCompleted(stored.round.id()));
        }
        Ok(RoundSession::new(stored.round, stored.guesses))
    }

    fn persist(&self, guess_id: GuessId, resolution: Resolution) {
        let guesses = Arc::clone(&self.guesses);
        let mut syncs = self.syncs.lock().unwrap_or_else(PoisonError::into_inner);
        while syncs.try_join_next().is_some() {}
        syncs.spawn(async move {
            match guesses.finalize_guess(guess_id, &resolution).await {
                Ok(_) => debug!(guess_id = %guess_id, "guess persisted"),
                Err(err) => warn!(
                    guess_id = %guess_id,
                    error = %err,
                    "failed to persist guess, in-memory state stays authoritative"
                ),
            }
        });
    }
}

fn track_in(sessions: &mut HashMap<RoundId, RoundSession>, created: RoundWithGuesses) -> RoundView {
    let session = RoundSession::new(created.round, created.guesses);
    let view = RoundView::from_session(&session);
    sessions.insert(session.round_id(), session);
    view
}

fn round_not_found(err: StorageError, id: RoundId) -> RoundError {
    match err {
        StorageError::NotFound => RoundError::RoundNotFound(id),
        other => other.into(),
    }
}
