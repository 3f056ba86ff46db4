pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::dto::padel_match::MatchListQuery;
use crate::error::Result;
use crate::models::{
    CounterDrift, CounterWrite, Match, MatchStatus, NewMatch, Participant, ParticipantEvent,
    ParticipantStatus,
};

pub use memory::InMemoryMatchStore;
pub use postgres::PgMatchStore;

/// Persistence port for matches and their participants.
///
/// Implementations must keep `refresh_current_players` the only operation
/// that writes `matches.current_players`, and must make it atomic with
/// respect to other refreshes of the same match.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn insert_match(&self, new_match: &NewMatch) -> Result<Match>;

    /// Deletes a match and, through the cascade, its participant rows.
    async fn delete_match(&self, match_id: Uuid) -> Result<()>;

    async fn find_match(&self, match_id: Uuid) -> Result<Match>;

    /// Public matches, optionally filtered by status, ordered by start time.
    /// Returns the page and the total number of matching rows.
    async fn list_matches(&self, query: &MatchListQuery) -> Result<(Vec<Match>, i64)>;

    async fn update_match_status(&self, match_id: Uuid, status: MatchStatus) -> Result<Match>;

    async fn find_participant(&self, match_id: Uuid, user_id: Uuid)
    -> Result<Option<Participant>>;

    async fn list_participants(&self, match_id: Uuid) -> Result<Vec<Participant>>;

    /// Inserts or updates the single row for `(match_id, user_id)` and
    /// returns the committed change.
    ///
    /// Runs under the match's row lock. A move into a status that counts
    /// toward capacity is refused with [`StorageError::CapacityExceeded`]
    /// when the live joined count has already reached `max_players`, so
    /// concurrent joins can never overfill a match.
    ///
    /// [`StorageError::CapacityExceeded`]: crate::error::StorageError::CapacityExceeded
    async fn upsert_participant(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<ParticipantEvent>;

    async fn count_joined(&self, match_id: Uuid) -> Result<i32>;

    /// Recounts joined participants and writes the result into the counter
    /// column only. Writes nothing when the stored value is already right.
    async fn refresh_current_players(&self, match_id: Uuid) -> Result<CounterWrite>;

    async fn list_match_ids(&self) -> Result<Vec<Uuid>>;

    /// Every match whose cached counter differs from its live joined count.
    async fn list_counter_drift(&self) -> Result<Vec<CounterDrift>>;
}
