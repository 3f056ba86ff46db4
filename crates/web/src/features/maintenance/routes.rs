use axum::{
    Router, middleware,
    routing::{get, post},
};

use super::handlers::{list_counter_drift, recount_match, repair_counters};
use crate::middleware::auth::{ApiKeys, require_auth};
use crate::state::AppState;

pub fn routes(api_keys: ApiKeys) -> Router<AppState> {
    Router::new()
        .route("/participant-counts/drift", get(list_counter_drift))
        .route("/participant-counts/repair", post(repair_counters))
        .route("/matches/:match_id/recount", post(recount_match))
        .route_layer(middleware::from_fn_with_state(api_keys, require_auth))
}
