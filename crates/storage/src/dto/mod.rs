pub mod common;
pub mod maintenance;
pub mod padel_match;
pub mod participant;
