//! Match lifecycle and the participant write path.
//!
//! Every participant mutation in the system goes through [`MatchService`],
//! which hands the committed change to the participant count synchronizer.
//! Nothing here touches `current_players` directly.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::participant_count::ParticipantCountSynchronizer;
use crate::dto::padel_match::{CreateMatchRequest, MatchListQuery};
use crate::error::{ServiceError, ServiceResult, StorageError};
use crate::models::{Match, MatchStatus, Participant, ParticipantStatus};
use crate::repository::MatchStore;

#[derive(Clone)]
pub struct MatchService {
    store: Arc<dyn MatchStore>,
    counts: ParticipantCountSynchronizer,
}

impl MatchService {
    pub fn new(store: Arc<dyn MatchStore>, counts: ParticipantCountSynchronizer) -> Self {
        Self { store, counts }
    }

    pub fn counts(&self) -> &ParticipantCountSynchronizer {
        &self.counts
    }

    async fn load_match(&self, match_id: Uuid) -> ServiceResult<Match> {
        self.store.find_match(match_id).await.map_err(|e| match e {
            StorageError::NotFound => ServiceError::MatchNotFound(match_id),
            other => ServiceError::Storage(other),
        })
    }

    pub async fn get_match(&self, match_id: Uuid) -> ServiceResult<Match> {
        self.load_match(match_id).await
    }

    pub async fn list_matches(&self, query: &MatchListQuery) -> ServiceResult<(Vec<Match>, i64)> {
        query
            .pagination()
            .validate()
            .map_err(ServiceError::Validation)?;
        Ok(self.store.list_matches(query).await?)
    }

    pub async fn list_participants(&self, match_id: Uuid) -> ServiceResult<Vec<Participant>> {
        self.load_match(match_id).await?;
        Ok(self.store.list_participants(match_id).await?)
    }

    /// Creates a match together with its creator's `joined` row.
    ///
    /// The two inserts form one unit: when the creator row cannot be written
    /// the match is deleted again before the error is returned.
    pub async fn create_match(
        &self,
        request: CreateMatchRequest,
        creator: Uuid,
    ) -> ServiceResult<Match> {
        request.validate()?;
        request
            .validate_schedule(Utc::now())
            .map_err(|e| ServiceError::Validation(e.to_string()))?;

        let created = self
            .store
            .insert_match(&request.into_new_match(creator))
            .await?;

        let event = match self
            .store
            .upsert_participant(created.match_id, creator, ParticipantStatus::Joined)
            .await
        {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    match_id = %created.match_id,
                    error = %e,
                    "creator participant insert failed, rolling back match"
                );
                if let Err(cleanup) = self.store.delete_match(created.match_id).await {
                    tracing::error!(
                        match_id = %created.match_id,
                        error = %cleanup,
                        "failed to delete partially created match"
                    );
                }
                return Err(ServiceError::MatchCreationFailed(e));
            }
        };

        self.counts.on_participant_change(&event).await;
        tracing::info!(match_id = %created.match_id, %creator, "match created");

        self.load_match(created.match_id).await
    }

    /// Moves the match through its lifecycle. Only the creator may do this
    /// and terminal matches reject every change.
    pub async fn update_status(
        &self,
        match_id: Uuid,
        actor: Uuid,
        status: MatchStatus,
    ) -> ServiceResult<Match> {
        let current = self.load_match(match_id).await?;

        if current.created_by != actor {
            return Err(ServiceError::Forbidden);
        }
        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(ServiceError::InvalidMatchTransition {
                from: current.status,
                to: status,
            });
        }

        let updated = self.store.update_match_status(match_id, status).await?;
        tracing::info!(%match_id, from = %current.status, to = %status, "match status changed");
        Ok(updated)
    }

    pub async fn join_match(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<(Participant, Match)> {
        self.change_participation(match_id, user_id, ParticipantStatus::Joined)
            .await
    }

    /// Only `joined` players can leave. A `maybe` player has to rejoin
    /// first, which needs a free spot.
    pub async fn leave_match(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<(Participant, Match)> {
        self.change_participation(match_id, user_id, ParticipantStatus::Left)
            .await
    }

    /// Toggles between `joined` and `maybe`.
    pub async fn set_attendance(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> ServiceResult<(Participant, Match)> {
        if status == ParticipantStatus::Left {
            return Err(ServiceError::Validation(
                "use leave to stop participating".to_string(),
            ));
        }
        self.change_participation(match_id, user_id, status).await
    }

    async fn change_participation(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        target: ParticipantStatus,
    ) -> ServiceResult<(Participant, Match)> {
        let current = self.load_match(match_id).await?;
        if !current.status.accepts_participant_changes() {
            return Err(ServiceError::MatchNotOpen {
                status: current.status,
            });
        }

        let existing = self.store.find_participant(match_id, user_id).await?;
        if let Some(row) = existing.as_ref().filter(|p| p.status == target) {
            return Ok((row.clone(), current));
        }

        let from = existing.as_ref().map(|p| p.status);
        if !ParticipantStatus::can_transition(from, target) {
            return Err(ServiceError::InvalidTransition { from, to: target });
        }

        // Capacity is checked by the store against the participant rows, in
        // the same locked write, not against the cached counter.
        let event = self
            .store
            .upsert_participant(match_id, user_id, target)
            .await
            .map_err(|e| match e {
                StorageError::CapacityExceeded { max_players } => {
                    ServiceError::CapacityExceeded {
                        match_id,
                        max_players,
                    }
                }
                other => ServiceError::Storage(other),
            })?;
        self.counts.on_participant_change(&event).await;

        tracing::info!(%match_id, %user_id, status = %target, "participation changed");

        let participant = event
            .current()
            .cloned()
            .ok_or(ServiceError::Storage(StorageError::NotFound))?;
        let refreshed = self.load_match(match_id).await?;

        Ok((participant, refreshed))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rstest::rstest;

    use async_trait::async_trait;
    use tokio::task::JoinSet;

    use super::*;
    use crate::error::Result;
    use crate::models::{CounterDrift, CounterWrite, NewMatch, ParticipantEvent};
    use crate::repository::InMemoryMatchStore;

    /// Adds a round-trip delay to the reads the join path makes before it
    /// writes, widening the window in which concurrent joins interleave.
    struct SlowStore(InMemoryMatchStore);

    impl SlowStore {
        async fn pause() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }

    #[async_trait]
    impl MatchStore for SlowStore {
        async fn insert_match(&self, new_match: &NewMatch) -> Result<Match> {
            self.0.insert_match(new_match).await
        }

        async fn delete_match(&self, match_id: Uuid) -> Result<()> {
            self.0.delete_match(match_id).await
        }

        async fn find_match(&self, match_id: Uuid) -> Result<Match> {
            Self::pause().await;
            self.0.find_match(match_id).await
        }

        async fn list_matches(&self, query: &MatchListQuery) -> Result<(Vec<Match>, i64)> {
            self.0.list_matches(query).await
        }

        async fn update_match_status(&self, match_id: Uuid, status: MatchStatus) -> Result<Match> {
            self.0.update_match_status(match_id, status).await
        }

        async fn find_participant(
            &self,
            match_id: Uuid,
            user_id: Uuid,
        ) -> Result<Option<Participant>> {
            Self::pause().await;
            self.0.find_participant(match_id, user_id).await
        }

        async fn list_participants(&self, match_id: Uuid) -> Result<Vec<Participant>> {
            self.0.list_participants(match_id).await
        }

        async fn upsert_participant(
            &self,
            match_id: Uuid,
            user_id: Uuid,
            status: ParticipantStatus,
        ) -> Result<ParticipantEvent> {
            self.0.upsert_participant(match_id, user_id, status).await
        }

        async fn count_joined(&self, match_id: Uuid) -> Result<i32> {
            Self::pause().await;
            self.0.count_joined(match_id).await
        }

        async fn refresh_current_players(&self, match_id: Uuid) -> Result<CounterWrite> {
            self.0.refresh_current_players(match_id).await
        }

        async fn list_match_ids(&self) -> Result<Vec<Uuid>> {
            self.0.list_match_ids().await
        }

        async fn list_counter_drift(&self) -> Result<Vec<CounterDrift>> {
            self.0.list_counter_drift().await
        }
    }

    fn request(max_players: i32) -> CreateMatchRequest {
        CreateMatchRequest {
            title: "Sunday americano".to_string(),
            description: Some("Bring spare balls".to_string()),
            location: Some("Padel Center Sur".to_string()),
            scheduled_at: Utc::now() + Duration::days(3),
            duration_minutes: 90,
            max_players,
            is_public: true,
        }
    }

    fn service() -> (Arc<InMemoryMatchStore>, MatchService) {
        let store = Arc::new(InMemoryMatchStore::new());
        let counts = ParticipantCountSynchronizer::new(store.clone());
        let service = MatchService::new(store.clone(), counts);
        (store, service)
    }

    #[tokio::test]
    async fn created_match_has_its_creator_joined() {
        let (store, service) = service();
        let creator = Uuid::new_v4();

        let created = service.create_match(request(4), creator).await.unwrap();

        assert_eq!(created.current_players, 1);
        assert_eq!(created.status, MatchStatus::Upcoming);
        assert_eq!(created.created_by, creator);
        let participants = store.list_participants(created.match_id).await.unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].user_id, creator);
        assert_eq!(participants[0].status, ParticipantStatus::Joined);
    }

    #[tokio::test]
    async fn failed_creator_insert_leaves_no_match_behind() {
        let (store, service) = service();
        store.fail_participant_writes(true).await;

        let err = service
            .create_match(request(4), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::MatchCreationFailed(_)));
        assert_eq!(store.match_count().await, 0);
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected_before_any_write() {
        let (store, service) = service();

        let mut past = request(4);
        past.scheduled_at = Utc::now() - Duration::hours(1);
        let err = service.create_match(past, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let err = service
            .create_match(request(1), Uuid::new_v4())
            .await
            .unwrap_err();
        match err {
            ServiceError::InvalidRequest(errors) => {
                assert!(errors.field_errors().contains_key("max_players"));
            }
            other => panic!("expected field errors, got {other:?}"),
        }

        assert_eq!(store.match_count().await, 0);
    }

    #[tokio::test]
    async fn full_match_rejects_join_before_touching_counter() {
        let (store, service) = service();
        let created = service
            .create_match(request(2), Uuid::new_v4())
            .await
            .unwrap();

        let (_, after_second) = service
            .join_match(created.match_id, Uuid::new_v4())
            .await
            .unwrap();
        assert_eq!(after_second.current_players, 2);
        assert!(after_second.is_full());
        assert_eq!(after_second.spots_left(), 0);

        let third = Uuid::new_v4();
        let err = service
            .join_match(created.match_id, third)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::CapacityExceeded { max_players: 2, .. }
        ));

        let reloaded = store.find_match(created.match_id).await.unwrap();
        assert_eq!(reloaded.current_players, 2);
        assert!(
            store
                .find_participant(created.match_id, third)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn rejoin_reuses_the_same_row() {
        let (store, service) = service();
        let created = service
            .create_match(request(4), Uuid::new_v4())
            .await
            .unwrap();
        let match_id = created.match_id;
        let player = Uuid::new_v4();

        let (row, m) = service.join_match(match_id, player).await.unwrap();
        assert_eq!(row.status, ParticipantStatus::Joined);
        assert_eq!(m.current_players, 2);

        let (row, m) = service.leave_match(match_id, player).await.unwrap();
        assert_eq!(row.status, ParticipantStatus::Left);
        assert_eq!(m.current_players, 1);

        let (row, m) = service.join_match(match_id, player).await.unwrap();
        assert_eq!(row.status, ParticipantStatus::Joined);
        assert_eq!(m.current_players, 2);

        assert_eq!(store.participant_row_count(match_id).await, 2);
    }

    #[tokio::test]
    async fn joining_twice_is_a_no_op() {
        let (_store, service) = service();
        let creator = Uuid::new_v4();
        let created = service.create_match(request(4), creator).await.unwrap();

        let (row, m) = service
            .join_match(created.match_id, creator)
            .await
            .unwrap();
        assert_eq!(row.status, ParticipantStatus::Joined);
        assert_eq!(m.current_players, 1);
    }

    #[tokio::test]
    async fn maybe_does_not_take_a_spot() {
        let (_store, service) = service();
        let creator = Uuid::new_v4();
        let created = service.create_match(request(2), creator).await.unwrap();
        let match_id = created.match_id;

        let (_, m) = service
            .set_attendance(match_id, creator, ParticipantStatus::Maybe)
            .await
            .unwrap();
        assert_eq!(m.current_players, 0);

        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        service.join_match(match_id, a).await.unwrap();
        let (_, m) = service.join_match(match_id, b).await.unwrap();
        assert!(m.is_full());

        let err = service
            .set_attendance(match_id, creator, ParticipantStatus::Joined)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CapacityExceeded { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_never_overfill_a_match() {
        let store = Arc::new(SlowStore(InMemoryMatchStore::new()));
        let counts = ParticipantCountSynchronizer::new(store.clone());
        let service = MatchService::new(store.clone(), counts);
        let created = service
            .create_match(request(4), Uuid::new_v4())
            .await
            .unwrap();
        let match_id = created.match_id;

        let mut joins = JoinSet::new();
        for _ in 0..8 {
            let service = service.clone();
            joins.spawn(async move { service.join_match(match_id, Uuid::new_v4()).await });
        }

        let mut accepted = 0;
        let mut rejected = 0;
        while let Some(outcome) = joins.join_next().await {
            match outcome.unwrap() {
                Ok(_) => accepted += 1,
                Err(ServiceError::CapacityExceeded { max_players: 4, .. }) => rejected += 1,
                Err(other) => panic!("unexpected join failure: {other:?}"),
            }
        }

        assert_eq!(accepted, 3);
        assert_eq!(rejected, 5);
        assert_eq!(store.count_joined(match_id).await.unwrap(), 4);
        let settled = service.get_match(match_id).await.unwrap();
        assert_eq!(settled.current_players, 4);
        assert!(settled.is_full());
    }

    #[tokio::test]
    async fn maybe_player_must_rejoin_before_leaving() {
        let (_store, service) = service();
        let creator = Uuid::new_v4();
        let created = service.create_match(request(4), creator).await.unwrap();
        let match_id = created.match_id;

        service
            .set_attendance(match_id, creator, ParticipantStatus::Maybe)
            .await
            .unwrap();
        let err = service.leave_match(match_id, creator).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidTransition {
                from: Some(ParticipantStatus::Maybe),
                to: ParticipantStatus::Left
            }
        ));

        service.join_match(match_id, creator).await.unwrap();
        let (row, m) = service.leave_match(match_id, creator).await.unwrap();
        assert_eq!(row.status, ParticipantStatus::Left);
        assert_eq!(m.current_players, 0);
    }

    #[tokio::test]
    async fn listing_far_past_the_last_page_is_empty() {
        let (_store, service) = service();
        service
            .create_match(request(4), Uuid::new_v4())
            .await
            .unwrap();

        let query = MatchListQuery {
            page: u32::MAX,
            page_size: 100,
            ..MatchListQuery::default()
        };
        let (page, total) = service.list_matches(&query).await.unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn leaving_without_joining_is_rejected() {
        let (_store, service) = service();
        let created = service
            .create_match(request(4), Uuid::new_v4())
            .await
            .unwrap();

        let err = service
            .leave_match(created.match_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::InvalidTransition {
                from: None,
                to: ParticipantStatus::Left
            }
        ));
    }

    #[tokio::test]
    async fn join_succeeds_even_when_counter_write_fails() {
        let (store, service) = service();
        let created = service
            .create_match(request(4), Uuid::new_v4())
            .await
            .unwrap();
        store.fail_counter_writes(true).await;

        let player = Uuid::new_v4();
        let (row, m) = service.join_match(created.match_id, player).await.unwrap();
        assert_eq!(row.status, ParticipantStatus::Joined);
        assert_eq!(m.current_players, 1);

        store.fail_counter_writes(false).await;
        let report = service.counts().repair_all().await.unwrap();
        assert_eq!(report.corrected, 1);
        assert_eq!(
            service
                .get_match(created.match_id)
                .await
                .unwrap()
                .current_players,
            2
        );
    }

    #[tokio::test]
    async fn only_creator_changes_status_and_terminal_is_final() {
        let (_store, service) = service();
        let creator = Uuid::new_v4();
        let created = service.create_match(request(4), creator).await.unwrap();
        let match_id = created.match_id;

        let err = service
            .update_status(match_id, Uuid::new_v4(), MatchStatus::Cancelled)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden));

        let cancelled = service
            .update_status(match_id, creator, MatchStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, MatchStatus::Cancelled);

        let err = service
            .update_status(match_id, creator, MatchStatus::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidMatchTransition { .. }));

        let err = service
            .join_match(match_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::MatchNotOpen {
                status: MatchStatus::Cancelled
            }
        ));
    }

    #[tokio::test]
    async fn unknown_match_is_reported_by_id() {
        let (_store, service) = service();
        let missing = Uuid::new_v4();
        let err = service.join_match(missing, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::MatchNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn listing_hides_private_matches_and_filters_by_status() {
        let (_store, service) = service();
        let creator = Uuid::new_v4();
        let open = service.create_match(request(4), creator).await.unwrap();
        let mut private = request(4);
        private.is_public = false;
        service.create_match(private, creator).await.unwrap();
        let cancelled = service.create_match(request(4), creator).await.unwrap();
        service
            .update_status(cancelled.match_id, creator, MatchStatus::Cancelled)
            .await
            .unwrap();

        let (all, total) = service
            .list_matches(&MatchListQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);

        let query = MatchListQuery {
            status: Some(MatchStatus::Upcoming),
            ..MatchListQuery::default()
        };
        let (upcoming, total) = service.list_matches(&query).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(upcoming[0].match_id, open.match_id);
    }

    #[rstest]
    #[case(None, ParticipantStatus::Joined, true)]
    #[case(None, ParticipantStatus::Maybe, false)]
    #[case(None, ParticipantStatus::Left, false)]
    #[case(Some(ParticipantStatus::Joined), ParticipantStatus::Left, true)]
    #[case(Some(ParticipantStatus::Left), ParticipantStatus::Joined, true)]
    #[case(Some(ParticipantStatus::Joined), ParticipantStatus::Maybe, true)]
    #[case(Some(ParticipantStatus::Maybe), ParticipantStatus::Joined, true)]
    #[case(Some(ParticipantStatus::Maybe), ParticipantStatus::Left, false)]
    #[case(Some(ParticipantStatus::Left), ParticipantStatus::Maybe, false)]
    fn participant_transitions(
        #[case] from: Option<ParticipantStatus>,
        #[case] to: ParticipantStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(ParticipantStatus::can_transition(from, to), allowed);
    }

    #[rstest]
    #[case(MatchStatus::Upcoming, MatchStatus::InProgress, true)]
    #[case(MatchStatus::Upcoming, MatchStatus::Cancelled, true)]
    #[case(MatchStatus::InProgress, MatchStatus::Completed, true)]
    #[case(MatchStatus::InProgress, MatchStatus::Cancelled, true)]
    #[case(MatchStatus::Upcoming, MatchStatus::Completed, false)]
    #[case(MatchStatus::Completed, MatchStatus::Upcoming, false)]
    #[case(MatchStatus::Cancelled, MatchStatus::InProgress, false)]
    fn match_transitions(#[case] from: MatchStatus, #[case] to: MatchStatus, #[case] allowed: bool) {
        assert_eq!(from.can_transition_to(to), allowed);
    }
}
