pub mod maintenance;
pub mod matches;
pub mod participants;
