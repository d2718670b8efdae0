//! Read-only operations endpoints: `/audit`, `/stats`, `/providers`.

use axum::{Json, extract::State};
use bmh_core::{booking::LifecycleEvent, ledger::Stats, provider::Provider};
use bmh_engine::Engine;

/// `GET /audit`: every lifecycle event, newest first.
pub async fn audit(State(engine): State<Engine>) -> Json<Vec<LifecycleEvent>> {
  Json(engine.audit_log().await)
}

/// `GET /stats`
pub async fn stats(State(engine): State<Engine>) -> Json<Stats> {
  Json(engine.stats().await)
}

/// `GET /providers`
pub async fn providers(State(engine): State<Engine>) -> Json<Vec<Provider>> {
  Json(engine.directory().providers().to_vec())
}
