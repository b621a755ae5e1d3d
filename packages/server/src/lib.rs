pub mod aggregate;
pub mod config;
pub mod consumers;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Parsley Grading API",
        version = "1.0.0",
        description = "Submission intake, judging and grading for coding assignments"
    ),
    paths(
        handlers::submission::create_submission,
        handlers::submission::create_assignment_submission,
        handlers::submission::list_submissions,
        handlers::submission::get_submission,
        handlers::assignment::start_assignment,
        handlers::assignment::record_activity,
        handlers::assignment::list_best_submissions,
        handlers::grading::grade_best_submission,
    ),
    tags(
        (name = "Submissions", description = "Submission intake and status polling"),
        (name = "Assignments", description = "Assignment lifecycle and best submissions"),
        (name = "Grading", description = "Manual grading overlay"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let api = ApiDoc::openapi();

    axum::Router::new()
        .nest("/api", routes::api_routes())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
