//! HTTP surface of the CareLink backend.
//!
//! REST resources live under `/api/v1`; `/health` and the chat socket at
//! `/ws` sit at the root.

mod error;
mod middleware;
mod state;
mod util;

pub mod routes;
pub mod services;

pub use error::{ApiError, ApiJson, ApiPath, ApiQuery, ErrorResponse};
pub use services::stats::{
    CountryFigures, CovidStats, Figures, HttpStatsSource, StatsError, StatsService, StatsSource,
};
pub use state::{AppState, SessionSettings};

use axum::{
    http::header::{AUTHORIZATION, CONTENT_TYPE},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/ws", get(routes::websocket::websocket_handler))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .layer(middleware::trace_layer())
        .layer(cors_layer())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Patient auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", get(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/updatedetails", put(routes::auth::update_details))
        .route("/auth/updatepassword", put(routes::auth::update_password))
        .route("/auth/forgotpassword", post(routes::auth::forgot_password))
        .route(
            "/auth/resetpassword/:token",
            put(routes::auth::reset_password),
        )
        // Patient administration
        .route(
            "/auth/patients",
            get(routes::patients::list_patients).post(routes::patients::create_patient),
        )
        .route(
            "/auth/patients/:id",
            get(routes::patients::get_patient)
                .put(routes::patients::update_patient)
                .delete(routes::patients::delete_patient),
        )
        // Doctors
        .route("/doctors", get(routes::doctors::list_doctors))
        .route("/doctors/register", post(routes::doctors::register))
        .route("/doctors/login", post(routes::doctors::login))
        .route("/doctors/me", get(routes::doctors::me))
        .route("/doctors/:id", get(routes::doctors::get_doctor))
        // Donation points
        .route(
            "/points",
            get(routes::points::list_points).post(routes::points::create_point),
        )
        .route(
            "/points/radius/:lat/:lng/:distance",
            get(routes::points::points_in_radius),
        )
        .route(
            "/points/:id",
            get(routes::points::get_point)
                .put(routes::points::update_point)
                .delete(routes::points::delete_point),
        )
        .route(
            "/points/:id/plasmas",
            get(routes::plasmas::list_for_point).post(routes::plasmas::create_for_point),
        )
        .route(
            "/points/:id/reviews",
            get(routes::reviews::list_for_point).post(routes::reviews::create_for_point),
        )
        // Plasma
        .route("/plasmas", get(routes::plasmas::list_plasmas))
        .route(
            "/plasmas/:id",
            get(routes::plasmas::get_plasma)
                .put(routes::plasmas::update_plasma)
                .delete(routes::plasmas::delete_plasma),
        )
        // Reviews
        .route("/reviews", get(routes::reviews::list_reviews))
        .route(
            "/reviews/:id",
            get(routes::reviews::get_review)
                .put(routes::reviews::update_review)
                .delete(routes::reviews::delete_review),
        )
        // Doctor-patient conversations
        .route(
            "/conversations",
            post(routes::conversations::open_conversation),
        )
        .route(
            "/conversations/:id",
            get(routes::conversations::list_for_user),
        )
        .route("/messages", post(routes::conversations::post_message))
        .route("/messages/:id", get(routes::conversations::list_messages))
        .route("/chat/inbox", get(routes::chat::inbox))
        .route("/stats", get(routes::stats::covid_stats))
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}
