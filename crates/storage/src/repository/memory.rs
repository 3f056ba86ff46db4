use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::MatchStore;
use crate::dto::padel_match::MatchListQuery;
use crate::error::{Result, StorageError};
use crate::models::{
    CounterDrift, CounterWrite, Match, MatchStatus, NewMatch, Participant, ParticipantEvent,
    ParticipantStatus,
};

#[derive(Default)]
struct State {
    matches: HashMap<Uuid, Match>,
    participants: HashMap<(Uuid, Uuid), Participant>,
    fail_participant_writes: bool,
    fail_counter_writes: bool,
    failing_counter_matches: HashSet<Uuid>,
}

impl State {
    fn joined_count(&self, match_id: Uuid) -> i32 {
        let count = self
            .participants
            .values()
            .filter(|p| p.match_id == match_id && p.status.counts_toward_capacity())
            .count();
        i32::try_from(count).unwrap_or(i32::MAX)
    }
}

/// Process-local [`MatchStore`] guarded by a single mutex.
///
/// Behaves like the PostgreSQL store for every operation of the port; with
/// the `test-support` feature it can also simulate outages and corrupt the
/// cached counters.
#[derive(Default)]
pub struct InMemoryMatchStore {
    state: Mutex<State>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl InMemoryMatchStore {
    /// Makes every participant upsert fail with `Unavailable`.
    pub async fn fail_participant_writes(&self, fail: bool) {
        self.state.lock().await.fail_participant_writes = fail;
    }

    /// Makes every counter refresh fail with `Unavailable`.
    pub async fn fail_counter_writes(&self, fail: bool) {
        self.state.lock().await.fail_counter_writes = fail;
    }

    /// Makes counter refreshes of one match fail with `Unavailable`.
    pub async fn fail_counter_writes_for(&self, match_id: Uuid) {
        self.state
            .lock()
            .await
            .failing_counter_matches
            .insert(match_id);
    }

    /// Overwrites a cached counter directly, bypassing the synchronizer.
    pub async fn force_current_players(&self, match_id: Uuid, value: i32) -> Result<()> {
        let mut state = self.state.lock().await;
        let found = state
            .matches
            .get_mut(&match_id)
            .ok_or(StorageError::NotFound)?;
        found.current_players = value;
        Ok(())
    }

    pub async fn participant_row_count(&self, match_id: Uuid) -> usize {
        let state = self.state.lock().await;
        state
            .participants
            .values()
            .filter(|p| p.match_id == match_id)
            .count()
    }

    pub async fn match_count(&self) -> usize {
        self.state.lock().await.matches.len()
    }
}

#[async_trait]
impl MatchStore for InMemoryMatchStore {
    async fn insert_match(&self, new_match: &NewMatch) -> Result<Match> {
        if new_match.max_players < 1 {
            return Err(StorageError::ConstraintViolation(
                "max_players must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let created = Match {
            match_id: Uuid::new_v4(),
            title: new_match.title.clone(),
            description: new_match.description.clone(),
            location: new_match.location.clone(),
            scheduled_at: new_match.scheduled_at,
            duration_minutes: new_match.duration_minutes,
            max_players: new_match.max_players,
            current_players: 0,
            status: MatchStatus::Upcoming,
            is_public: new_match.is_public,
            created_by: new_match.created_by,
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.lock().await;
        state.matches.insert(created.match_id, created.clone());
        Ok(created)
    }

    async fn delete_match(&self, match_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .matches
            .remove(&match_id)
            .ok_or(StorageError::NotFound)?;
        state.participants.retain(|(m, _), _| *m != match_id);
        Ok(())
    }

    async fn find_match(&self, match_id: Uuid) -> Result<Match> {
        let state = self.state.lock().await;
        state
            .matches
            .get(&match_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_matches(&self, query: &MatchListQuery) -> Result<(Vec<Match>, i64)> {
        let state = self.state.lock().await;
        let mut selected: Vec<Match> = state
            .matches
            .values()
            .filter(|m| m.is_public)
            .filter(|m| query.status.is_none_or(|s| m.status == s))
            .cloned()
            .collect();
        selected.sort_by_key(|m| (m.scheduled_at, m.created_at));

        let total = i64::try_from(selected.len()).unwrap_or(i64::MAX);
        let pagination = query.pagination();
        let page = selected
            .into_iter()
            .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
            .take(pagination.limit() as usize)
            .collect();

        Ok((page, total))
    }

    async fn update_match_status(&self, match_id: Uuid, status: MatchStatus) -> Result<Match> {
        let mut state = self.state.lock().await;
        let found = state
            .matches
            .get_mut(&match_id)
            .ok_or(StorageError::NotFound)?;
        found.status = status;
        found.updated_at = Utc::now();
        Ok(found.clone())
    }

    async fn find_participant(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>> {
        let state = self.state.lock().await;
        Ok(state.participants.get(&(match_id, user_id)).cloned())
    }

    async fn list_participants(&self, match_id: Uuid) -> Result<Vec<Participant>> {
        let state = self.state.lock().await;
        let mut participants: Vec<Participant> = state
            .participants
            .values()
            .filter(|p| p.match_id == match_id)
            .cloned()
            .collect();
        participants.sort_by_key(|p| (p.joined_at, p.user_id));
        Ok(participants)
    }

    async fn upsert_participant(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<ParticipantEvent> {
        let mut state = self.state.lock().await;
        if state.fail_participant_writes {
            return Err(StorageError::Unavailable(
                "participant writes are failing".to_string(),
            ));
        }
        let max_players = state
            .matches
            .get(&match_id)
            .map(|m| m.max_players)
            .ok_or(StorageError::NotFound)?;

        let existing = state.participants.get(&(match_id, user_id)).cloned();
        let takes_spot = status.counts_toward_capacity()
            && !existing
                .as_ref()
                .is_some_and(|p| p.status.counts_toward_capacity());
        if takes_spot && state.joined_count(match_id) >= max_players {
            return Err(StorageError::CapacityExceeded { max_players });
        }

        let now = Utc::now();
        let event = match existing {
            Some(old) => {
                let joined_at = if status == ParticipantStatus::Joined
                    && old.status != ParticipantStatus::Joined
                {
                    now
                } else {
                    old.joined_at
                };
                let new = Participant {
                    status,
                    joined_at,
                    ..old.clone()
                };
                ParticipantEvent::Updated { old, new }
            }
            None => ParticipantEvent::Inserted {
                new: Participant {
                    match_id,
                    user_id,
                    status,
                    joined_at: now,
                },
            },
        };

        if let Some(row) = event.current() {
            state.participants.insert((match_id, user_id), row.clone());
        }
        Ok(event)
    }

    async fn count_joined(&self, match_id: Uuid) -> Result<i32> {
        let state = self.state.lock().await;
        Ok(state.joined_count(match_id))
    }

    async fn refresh_current_players(&self, match_id: Uuid) -> Result<CounterWrite> {
        let mut state = self.state.lock().await;
        if state.fail_counter_writes || state.failing_counter_matches.contains(&match_id) {
            return Err(StorageError::Unavailable(
                "counter writes are failing".to_string(),
            ));
        }

        let current = state.joined_count(match_id);
        let found = state
            .matches
            .get_mut(&match_id)
            .ok_or(StorageError::NotFound)?;
        let previous = found.current_players;
        if previous != current {
            found.current_players = current;
        }

        Ok(CounterWrite { previous, current })
    }

    async fn list_match_ids(&self) -> Result<Vec<Uuid>> {
        let state = self.state.lock().await;
        let mut matches: Vec<&Match> = state.matches.values().collect();
        matches.sort_by_key(|m| (m.created_at, m.match_id));
        Ok(matches.into_iter().map(|m| m.match_id).collect())
    }

    async fn list_counter_drift(&self) -> Result<Vec<CounterDrift>> {
        let state = self.state.lock().await;
        let mut drift: Vec<CounterDrift> = state
            .matches
            .values()
            .filter_map(|m| {
                let live_count = state.joined_count(m.match_id);
                (m.current_players != live_count).then(|| CounterDrift {
                    match_id: m.match_id,
                    cached_count: m.current_players,
                    live_count,
                })
            })
            .collect();
        drift.sort_by_key(|d| d.match_id);
        Ok(drift)
    }
}
