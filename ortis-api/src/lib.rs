use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod cases;
pub mod dictionaries;
pub mod error;
pub mod invoices;
pub mod middleware;
pub mod orders;
pub mod state;
pub mod users;
pub mod warehouse;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Everything except login requires a verified bearer token
    let protected = Router::new()
        .merge(auth::session_routes())
        .merge(cases::routes())
        .merge(orders::routes())
        .merge(invoices::routes())
        .merge(warehouse::routes())
        .merge(dictionaries::routes())
        .merge(users::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(auth::routes())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
