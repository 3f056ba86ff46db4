use utoipa::OpenApi;

use crate::features::{maintenance, matches, participants};

#[derive(OpenApi)]
#[openapi(
    paths(
        matches::handlers::list_matches,
        matches::handlers::create_match,
        matches::handlers::get_match,
        matches::handlers::update_match_status,
        participants::handlers::list_participants,
        participants::handlers::join_match,
        participants::handlers::leave_match,
        participants::handlers::set_attendance,
        maintenance::handlers::list_counter_drift,
        maintenance::handlers::repair_counters,
        maintenance::handlers::recount_match,
    ),
    components(
        schemas(
            storage::dto::padel_match::CreateMatchRequest,
            storage::dto::padel_match::UpdateMatchStatusRequest,
            storage::dto::padel_match::MatchResponse,
            storage::dto::participant::AttendanceRequest,
            storage::dto::participant::ParticipantResponse,
            storage::dto::participant::ParticipationResponse,
            storage::dto::maintenance::RepairReport,
            storage::dto::maintenance::CounterCorrection,
            storage::dto::maintenance::RecountResponse,
            storage::dto::common::PaginationMeta,
            storage::models::MatchStatus,
            storage::models::ParticipantStatus,
            storage::models::CounterDrift,
        )
    ),
    tags(
        (name = "matches", description = "Match creation, listing and lifecycle"),
        (name = "participants", description = "Joining, leaving and attendance"),
        (name = "maintenance", description = "Participant counter consistency checks and repair"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("API Key")
                        .build(),
                ),
            )
        }
    }
}
