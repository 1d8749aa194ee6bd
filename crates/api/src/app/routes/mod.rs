use axum::Router;

pub mod accounts;
pub mod auth;
pub mod system;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new().nest("/auth", auth::router())
}

/// Endpoints that require an authenticated caller.
pub fn protected_router() -> Router {
    Router::new().nest("/accounts", accounts::router())
}
