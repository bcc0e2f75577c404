pub mod auth;
pub mod middleware;
pub mod rest;
pub mod router;
pub mod state;

// Re-export the pieces the binaries and integration tests need.
pub use middleware::require_auth;
pub use rest::ApiDoc;
pub use router::router;
pub use state::AppState;
