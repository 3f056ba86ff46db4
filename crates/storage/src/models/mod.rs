mod counter;
mod padel_match;
mod participant;

pub use counter::{CounterDrift, CounterWrite};
pub use padel_match::{Match, MatchStatus, NewMatch};
pub use participant::{Participant, ParticipantEvent, ParticipantStatus};
