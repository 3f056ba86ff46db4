pub mod matches;
pub mod participant_count;

pub use matches::MatchService;
pub use participant_count::ParticipantCountSynchronizer;
