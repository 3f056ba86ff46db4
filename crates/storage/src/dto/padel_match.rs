use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::common::{PaginationParams, default_page, default_page_size};
use crate::models::{Match, MatchStatus, NewMatch};

/// Request payload for creating a new match. The creator is taken from the
/// authenticated user, never from the body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMatchRequest {
    #[validate(length(
        min = 1,
        max = 120,
        message = "Title must be between 1 and 120 characters"
    ))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[validate(length(max = 255))]
    pub location: Option<String>,

    pub scheduled_at: DateTime<Utc>,

    #[validate(range(
        min = 30,
        max = 300,
        message = "Duration must be between 30 and 300 minutes"
    ))]
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,

    #[validate(range(
        min = 2,
        max = 16,
        message = "A match needs between 2 and 16 players"
    ))]
    #[serde(default = "default_max_players")]
    pub max_players: i32,

    #[serde(default = "default_is_public")]
    pub is_public: bool,
}

fn default_duration() -> i32 {
    90
}

fn default_max_players() -> i32 {
    4
}

fn default_is_public() -> bool {
    true
}

impl CreateMatchRequest {
    /// Checks that need the current time, kept apart from the derive rules.
    pub fn validate_schedule(&self, now: DateTime<Utc>) -> Result<(), &'static str> {
        if self.scheduled_at <= now {
            return Err("Match must be scheduled in the future");
        }
        Ok(())
    }

    pub fn into_new_match(self, created_by: Uuid) -> NewMatch {
        NewMatch {
            title: self.title,
            description: self.description,
            location: self.location,
            scheduled_at: self.scheduled_at,
            duration_minutes: self.duration_minutes,
            max_players: self.max_players,
            is_public: self.is_public,
            created_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateMatchStatusRequest {
    pub status: MatchStatus,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MatchListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub status: Option<MatchStatus>,
}

impl Default for MatchListQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            status: None,
        }
    }
}

impl MatchListQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// Match as seen by clients, including the capacity figures derived from
/// the cached counter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MatchResponse {
    pub match_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub max_players: i32,
    pub current_players: i32,
    pub spots_left: i32,
    pub is_full: bool,
    pub status: MatchStatus,
    pub is_public: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Match> for MatchResponse {
    fn from(m: Match) -> Self {
        Self {
            spots_left: m.spots_left(),
            is_full: m.is_full(),
            match_id: m.match_id,
            title: m.title,
            description: m.description,
            location: m.location,
            scheduled_at: m.scheduled_at,
            duration_minutes: m.duration_minutes,
            max_players: m.max_players,
            current_players: m.current_players,
            status: m.status,
            is_public: m.is_public,
            created_by: m.created_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
