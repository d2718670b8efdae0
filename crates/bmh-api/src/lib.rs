//! JSON REST API for BookMyHelper.
//!
//! Exposes an axum [`Router`] over a running [`Engine`]. Roles in request
//! bodies are taken at face value; auth, TLS and transport concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", bmh_api::api_router(engine.clone()))
//! ```

pub mod bookings;
pub mod error;
pub mod ops;

use axum::{
  Router,
  routing::{get, post},
};
use bmh_engine::Engine;

pub use error::ApiError;

/// Build the API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router(engine: Engine) -> Router<()> {
  Router::new()
    // Bookings
    .route(
      "/bookings",
      get(bookings::list).post(bookings::create).delete(bookings::clear),
    )
    .route("/bookings/{id}", get(bookings::get_one))
    .route("/bookings/{id}/status", post(bookings::set_status))
    .route("/bookings/{id}/actions", get(bookings::actions))
    // Operations feed
    .route("/audit", get(ops::audit))
    .route("/stats", get(ops::stats))
    .route("/providers", get(ops::providers))
    .with_state(engine)
}
