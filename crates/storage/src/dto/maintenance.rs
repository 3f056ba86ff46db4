use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// One corrected counter, as reported by a repair run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CounterCorrection {
    pub match_id: Uuid,
    pub previous_count: i32,
    pub corrected_count: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RepairReport {
    /// Matches whose counter was recomputed.
    pub scanned: u64,
    /// Matches whose cached counter had drifted and was rewritten.
    pub corrected: u64,
    /// Matches whose recount failed; they keep their previous value.
    pub failed: u64,
    /// First corrections, capped at the configured sample size.
    pub sample: Vec<CounterCorrection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecountResponse {
    pub match_id: Uuid,
    pub current_players: i32,
}
