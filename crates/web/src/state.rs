use std::sync::Arc;

use storage::{
    repository::MatchStore,
    services::{MatchService, ParticipantCountSynchronizer},
};

use crate::middleware::auth::ApiKeys;

#[derive(Clone)]
pub struct AppState {
    pub matches: MatchService,
    pub api_keys: ApiKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn MatchStore>, api_keys: ApiKeys, repair_sample_limit: usize) -> Self {
        let counts =
            ParticipantCountSynchronizer::new(store.clone()).with_sample_limit(repair_sample_limit);

        Self {
            matches: MatchService::new(store, counts),
            api_keys,
        }
    }

    pub fn counts(&self) -> &ParticipantCountSynchronizer {
        self.matches.counts()
    }
}
