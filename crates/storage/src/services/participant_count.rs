//! Keeps `matches.current_players` equal to the number of joined
//! participants.
//!
//! The counter is derived state. It is never incremented or decremented:
//! every write recomputes it from the participant rows, which makes each
//! write idempotent and independent of the order in which participant
//! changes arrived.

use std::sync::Arc;

use uuid::Uuid;

use crate::dto::maintenance::{CounterCorrection, RepairReport};
use crate::error::Result;
use crate::models::{CounterDrift, ParticipantEvent};
use crate::repository::MatchStore;

pub const DEFAULT_REPAIR_SAMPLE_LIMIT: usize = 50;

#[derive(Clone)]
pub struct ParticipantCountSynchronizer {
    store: Arc<dyn MatchStore>,
    sample_limit: usize,
}

impl ParticipantCountSynchronizer {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        Self {
            store,
            sample_limit: DEFAULT_REPAIR_SAMPLE_LIMIT,
        }
    }

    /// Caps how many corrections a repair run reports back.
    pub fn with_sample_limit(mut self, sample_limit: usize) -> Self {
        self.sample_limit = sample_limit;
        self
    }

    /// Recomputes the joined count of one match and stores it in the counter
    /// column. No other match column is written.
    pub async fn recount(&self, match_id: Uuid) -> Result<i32> {
        let write = self.store.refresh_current_players(match_id).await?;

        if write.changed() {
            tracing::debug!(
                %match_id,
                previous = write.previous,
                current = write.current,
                "participant counter updated"
            );
        }

        Ok(write.current)
    }

    /// Reacts to a committed participant change by recounting the affected
    /// match.
    ///
    /// The participant row is the source of truth, so a failed recount is
    /// logged and swallowed: the counter stays stale until the next
    /// successful recount or repair.
    pub async fn on_participant_change(&self, event: &ParticipantEvent) -> Option<i32> {
        let match_id = event.match_id();

        match self.recount(match_id).await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(
                    %match_id,
                    error = %e,
                    "failed to refresh participant counter, leaving it stale"
                );
                None
            }
        }
    }

    /// Lists matches whose cached counter disagrees with the participant
    /// rows, without changing anything.
    pub async fn check_consistency(&self) -> Result<Vec<CounterDrift>> {
        self.store.list_counter_drift().await
    }

    /// Recounts every match, whether or not it is known to have drifted.
    ///
    /// Matches are independent: one failing recount is recorded in the
    /// report and the run continues.
    pub async fn repair_all(&self) -> Result<RepairReport> {
        let match_ids = self.store.list_match_ids().await?;
        let mut report = RepairReport::default();

        tracing::info!(matches = match_ids.len(), "repairing participant counters");

        for match_id in match_ids {
            match self.store.refresh_current_players(match_id).await {
                Ok(write) => {
                    report.scanned += 1;
                    if write.changed() {
                        report.corrected += 1;
                        tracing::info!(
                            %match_id,
                            previous = write.previous,
                            corrected = write.current,
                            "corrected drifted participant counter"
                        );
                        if report.sample.len() < self.sample_limit {
                            report.sample.push(CounterCorrection {
                                match_id,
                                previous_count: write.previous,
                                corrected_count: write.current,
                            });
                        }
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::error!(%match_id, error = %e, "failed to repair participant counter");
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            corrected = report.corrected,
            failed = report.failed,
            "participant counter repair finished"
        );

        Ok(report)
    }
}
