use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/problems", problem_routes())
        .nest("/assignments", assignment_routes())
        .nest("/submissions", submission_routes())
}

fn problem_routes() -> Router<AppState> {
    Router::new().route(
        "/{id}/submissions",
        post(handlers::submission::create_submission),
    )
}

fn assignment_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}/start", post(handlers::assignment::start_assignment))
        .route("/{id}/activity", post(handlers::assignment::record_activity))
        .route(
            "/{id}/best-submissions",
            get(handlers::assignment::list_best_submissions),
        )
        .route(
            "/{id}/problems/{pid}/submissions",
            post(handlers::submission::create_assignment_submission),
        )
        .route(
            "/{id}/problems/{pid}/users/{uid}/grade",
            put(handlers::grading::grade_best_submission),
        )
}

fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::submission::list_submissions))
        .route("/{id}", get(handlers::submission::get_submission))
}
