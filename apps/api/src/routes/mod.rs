pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::insights::handlers as insights;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Insights
        .route("/api/v1/insights", get(insights::handle_get_insights))
        // Users
        .route("/api/v1/users/me", post(users::handle_sync_user))
        .route("/api/v1/users/profile", put(users::handle_update_profile))
        .route(
            "/api/v1/users/onboarding-status",
            get(users::handle_onboarding_status),
        )
        .with_state(state)
}
