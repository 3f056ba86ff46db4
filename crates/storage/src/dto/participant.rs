use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::padel_match::MatchResponse;
use crate::models::{Match, Participant, ParticipantStatus};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRequest {
    pub status: ParticipantStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantResponse {
    pub user_id: Uuid,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
}

impl From<Participant> for ParticipantResponse {
    fn from(p: Participant) -> Self {
        Self {
            user_id: p.user_id,
            status: p.status,
            joined_at: p.joined_at,
        }
    }
}

/// Result of a join, leave or attendance change: the caller's row plus the
/// match re-read after the counter was refreshed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipationResponse {
    pub participant: ParticipantResponse,
    #[serde(rename = "match")]
    pub match_summary: MatchResponse,
}

impl From<(Participant, Match)> for ParticipationResponse {
    fn from((participant, m): (Participant, Match)) -> Self {
        Self {
            participant: participant.into(),
            match_summary: m.into(),
        }
    }
}
