use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Attendance intent of a user for a match.
///
/// Only `Joined` counts toward capacity; `Maybe` is treated as not joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "participant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Joined,
    Left,
    Maybe,
}

impl ParticipantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::Left => "left",
            Self::Maybe => "maybe",
        }
    }

    pub fn counts_toward_capacity(self) -> bool {
        self == Self::Joined
    }

    /// Whether a participant currently in `from` (or with no row at all) may
    /// move to `to`. Staying in the same status is handled by callers as a
    /// no-op and is not a transition.
    pub fn can_transition(from: Option<Self>, to: Self) -> bool {
        matches!(
            (from, to),
            (None, Self::Joined)
                | (Some(Self::Joined), Self::Left)
                | (Some(Self::Left), Self::Joined)
                | (Some(Self::Joined), Self::Maybe)
                | (Some(Self::Maybe), Self::Joined)
        )
    }
}

impl fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Participant {
    pub match_id: Uuid,
    pub user_id: Uuid,
    pub status: ParticipantStatus,
    pub joined_at: DateTime<Utc>,
}

/// A committed change to a participant row, carrying the row images the way
/// a row-level trigger sees them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantEvent {
    Inserted { new: Participant },
    Updated { old: Participant, new: Participant },
    Deleted { old: Participant },
}

impl ParticipantEvent {
    /// Match whose counter the change affects: the new row's match for
    /// inserts and updates, the old row's match for deletes.
    pub fn match_id(&self) -> Uuid {
        match self {
            Self::Inserted { new } | Self::Updated { new, .. } => new.match_id,
            Self::Deleted { old } => old.match_id,
        }
    }

    /// Row state after the change, if the row still exists.
    pub fn current(&self) -> Option<&Participant> {
        match self {
            Self::Inserted { new } | Self::Updated { new, .. } => Some(new),
            Self::Deleted { .. } => None,
        }
    }
}
