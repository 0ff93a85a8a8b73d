use std::sync::Arc;

use drill_core::{Clock, ConjugationSource};
use services::{CoverageService, QuestionSampler, QuestionService, RoundManager};
use storage::repository::{RoundRepository, Storage};

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    rounds: RoundManager,
    questions: QuestionService,
    coverage: CoverageService,
    store: Arc<dyn RoundRepository>,
}

impl AppState {
    #[must_use]
    pub fn new(storage: &Storage, clock: Clock, sampler: QuestionSampler) -> Self {
        Self {
            rounds: RoundManager::from_storage(clock, storage, sampler.clone()),
            questions: QuestionService::new(sampler),
            coverage: CoverageService::new(Arc::clone(&storage.coverage)),
            store: Arc::clone(&storage.rounds),
        }
    }

    /// State with the given conjugation source and an OS-seeded sampler.
    #[must_use]
    pub fn with_source(storage: &Storage, source: Arc<dyn ConjugationSource>) -> Self {
        Self::new(storage, Clock::System, QuestionSampler::new(source))
    }

    #[must_use]
    pub fn rounds(&self) -> &RoundManager {
        &self.rounds
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionService {
        &self.questions
    }

    #[must_use]
    pub fn coverage(&self) -> &CoverageService {
        &self.coverage
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RoundRepository> {
        &self.store
    }
}
