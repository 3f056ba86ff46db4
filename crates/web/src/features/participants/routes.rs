use axum::{
    Router,
    routing::{get, post, put},
};

use super::handlers::{join_match, leave_match, list_participants, set_attendance};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:match_id/participants", get(list_participants))
        .route("/:match_id/join", post(join_match))
        .route("/:match_id/leave", post(leave_match))
        .route("/:match_id/attendance", put(set_attendance))
}
