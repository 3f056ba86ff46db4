use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::models::{MatchStatus, ParticipantStatus};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Match is full ({max_players} players)")]
    CapacityExceeded { max_players: i32 },
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e))
                if e.code().as_deref() == Some("23503")
        )
    }

    pub fn is_check_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e))
                if e.code().as_deref() == Some("23514")
        )
    }
}

/// Errors raised by the match and participant services.
///
/// Capacity and transition rejections leave every row untouched.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Match {0} not found")]
    MatchNotFound(Uuid),

    #[error("Match {match_id} is full ({max_players} players)")]
    CapacityExceeded { match_id: Uuid, max_players: i32 },

    #[error("Cannot change participation from {} to {to}", display_status(.from))]
    InvalidTransition {
        from: Option<ParticipantStatus>,
        to: ParticipantStatus,
    },

    #[error("Match is {status} and no longer accepts participant changes")]
    MatchNotOpen { status: MatchStatus },

    #[error("Cannot move match from {from} to {to}")]
    InvalidMatchTransition { from: MatchStatus, to: MatchStatus },

    #[error("Only the match creator can do that")]
    Forbidden,

    #[error("Match creation failed: {0}")]
    MatchCreationFailed(#[source] StorageError),

    #[error("Validation failed")]
    InvalidRequest(#[from] ValidationErrors),

    #[error("{0}")]
    Validation(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

fn display_status(status: &Option<ParticipantStatus>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}
