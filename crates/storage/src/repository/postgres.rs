use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::MatchStore;
use crate::dto::padel_match::MatchListQuery;
use crate::error::{Result, StorageError};
use crate::models::{
    CounterDrift, CounterWrite, Match, MatchStatus, NewMatch, Participant, ParticipantEvent,
    ParticipantStatus,
};

/// PostgreSQL implementation of [`MatchStore`]
#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_error(e: sqlx::Error) -> StorageError {
    let error = StorageError::from(e);

    // A missing match surfaces as a foreign key failure on participant writes.
    if error.is_foreign_key_violation() {
        return StorageError::NotFound;
    }
    if error.is_check_violation() {
        return StorageError::ConstraintViolation(error.to_string());
    }

    error
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn insert_match(&self, new_match: &NewMatch) -> Result<Match> {
        let created = sqlx::query_as::<_, Match>(
            r#"
            INSERT INTO matches (
                title, description, location, scheduled_at, duration_minutes,
                max_players, is_public, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING match_id, title, description, location, scheduled_at, duration_minutes,
                      max_players, current_players, status, is_public, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(&new_match.title)
        .bind(&new_match.description)
        .bind(&new_match.location)
        .bind(new_match.scheduled_at)
        .bind(new_match.duration_minutes)
        .bind(new_match.max_players)
        .bind(new_match.is_public)
        .bind(new_match.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(created)
    }

    async fn delete_match(&self, match_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM matches
            WHERE match_id = $1
            "#,
        )
        .bind(match_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }

    async fn find_match(&self, match_id: Uuid) -> Result<Match> {
        let found = sqlx::query_as::<_, Match>(
            r#"
            SELECT match_id, title, description, location, scheduled_at, duration_minutes,
                   max_players, current_players, status, is_public, created_by,
                   created_at, updated_at
            FROM matches
            WHERE match_id = $1
            "#,
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(found)
    }

    async fn list_matches(&self, query: &MatchListQuery) -> Result<(Vec<Match>, i64)> {
        let pagination = query.pagination();

        let matches = sqlx::query_as::<_, Match>(
            r#"
            SELECT match_id, title, description, location, scheduled_at, duration_minutes,
                   max_players, current_players, status, is_public, created_by,
                   created_at, updated_at
            FROM matches
            WHERE is_public
              AND ($1::match_status IS NULL OR status = $1)
            ORDER BY scheduled_at ASC, created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(query.status)
        .bind(i64::from(pagination.limit()))
        .bind(i64::try_from(pagination.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM matches
            WHERE is_public
              AND ($1::match_status IS NULL OR status = $1)
            "#,
        )
        .bind(query.status)
        .fetch_one(&self.pool)
        .await?;

        Ok((matches, total))
    }

    async fn update_match_status(&self, match_id: Uuid, status: MatchStatus) -> Result<Match> {
        let updated = sqlx::query_as::<_, Match>(
            r#"
            UPDATE matches
            SET status = $2,
                updated_at = now()
            WHERE match_id = $1
            RETURNING match_id, title, description, location, scheduled_at, duration_minutes,
                      max_players, current_players, status, is_public, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(match_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or(StorageError::NotFound)?;

        Ok(updated)
    }

    async fn find_participant(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            SELECT match_id, user_id, status, joined_at
            FROM participants
            WHERE match_id = $1 AND user_id = $2
            "#,
        )
        .bind(match_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn list_participants(&self, match_id: Uuid) -> Result<Vec<Participant>> {
        let participants = sqlx::query_as::<_, Participant>(
            r#"
            SELECT match_id, user_id, status, joined_at
            FROM participants
            WHERE match_id = $1
            ORDER BY joined_at ASC, user_id ASC
            "#,
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn upsert_participant(
        &self,
        match_id: Uuid,
        user_id: Uuid,
        status: ParticipantStatus,
    ) -> Result<ParticipantEvent> {
        let mut tx = self.pool.begin().await?;

        // The match row lock serializes every participant write of the match,
        // including first inserts that have no participant row to lock yet.
        let max_players: i32 = sqlx::query_scalar(
            r#"
            SELECT max_players
            FROM matches
            WHERE match_id = $1
            FOR UPDATE
            "#,
        )
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::NotFound)?;

        let old = sqlx::query_as::<_, Participant>(
            r#"
            SELECT match_id, user_id, status, joined_at
            FROM participants
            WHERE match_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(match_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let takes_spot = status.counts_toward_capacity()
            && !old
                .as_ref()
                .is_some_and(|p| p.status.counts_toward_capacity());
        if takes_spot {
            let joined: i32 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*)::INT4
                FROM participants
                WHERE match_id = $1 AND status = 'joined'
                "#,
            )
            .bind(match_id)
            .fetch_one(&mut *tx)
            .await?;

            if joined >= max_players {
                return Err(StorageError::CapacityExceeded { max_players });
            }
        }

        // joined_at moves forward only when the row (re)enters `joined`.
        let new = sqlx::query_as::<_, Participant>(
            r#"
            INSERT INTO participants (match_id, user_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (match_id, user_id)
            DO UPDATE SET
                status = EXCLUDED.status,
                joined_at = CASE
                    WHEN EXCLUDED.status = 'joined' AND participants.status <> 'joined'
                        THEN now()
                    ELSE participants.joined_at
                END
            RETURNING match_id, user_id, status, joined_at
            "#,
        )
        .bind(match_id)
        .bind(user_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;

        Ok(match old {
            Some(old) => ParticipantEvent::Updated { old, new },
            None => ParticipantEvent::Inserted { new },
        })
    }

    async fn count_joined(&self, match_id: Uuid) -> Result<i32> {
        let count: i32 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)::INT4
            FROM participants
            WHERE match_id = $1 AND status = 'joined'
            "#,
        )
        .bind(match_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn refresh_current_players(&self, match_id: Uuid) -> Result<CounterWrite> {
        let mut tx = self.pool.begin().await?;

        // Locking the match row serializes concurrent refreshes of one match.
        let previous: i32 = sqlx::query_scalar(
            r#"
            SELECT current_players
            FROM matches
            WHERE match_id = $1
            FOR UPDATE
            "#,
        )
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::NotFound)?;

        let current: i32 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)::INT4
            FROM participants
            WHERE match_id = $1 AND status = 'joined'
            "#,
        )
        .bind(match_id)
        .fetch_one(&mut *tx)
        .await?;

        if previous != current {
            sqlx::query(
                r#"
                UPDATE matches
                SET current_players = $2
                WHERE match_id = $1
                "#,
            )
            .bind(match_id)
            .bind(current)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(CounterWrite { previous, current })
    }

    async fn list_match_ids(&self) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT match_id
            FROM matches
            ORDER BY created_at ASC, match_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn list_counter_drift(&self) -> Result<Vec<CounterDrift>> {
        let drift = sqlx::query_as::<_, CounterDrift>(
            r#"
            SELECT m.match_id,
                   m.current_players AS cached_count,
                   COALESCE(p.live_count, 0) AS live_count
            FROM matches m
            LEFT JOIN (
                SELECT match_id, COUNT(*)::INT4 AS live_count
                FROM participants
                WHERE status = 'joined'
                GROUP BY match_id
            ) p ON p.match_id = m.match_id
            WHERE m.current_players <> COALESCE(p.live_count, 0)
            ORDER BY m.match_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(drift)
    }
}
