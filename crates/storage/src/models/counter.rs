use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Outcome of rewriting a match's cached participant counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterWrite {
    pub previous: i32,
    pub current: i32,
}

impl CounterWrite {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// A match whose cached counter disagrees with its joined participant rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CounterDrift {
    pub match_id: Uuid,
    pub cached_count: i32,
    pub live_count: i32,
}
