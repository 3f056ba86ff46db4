use axum::{
    Router,
    routing::{get, patch},
};

use super::handlers::{create_match, get_match, list_matches, update_match_status};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_matches).post(create_match))
        .route("/:match_id", get(get_match))
        .route("/:match_id/status", patch(update_match_status))
}
