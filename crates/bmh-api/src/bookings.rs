//! Handlers for `/bookings` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/bookings` | Optional `?providerId=p1` for the provider view |
//! | `POST`   | `/bookings` | Body: `{"customerName","serviceType","address"}` |
//! | `DELETE` | `/bookings` | Clears every booking and the audit log |
//! | `GET`    | `/bookings/:id` | 404 if not found |
//! | `POST`   | `/bookings/:id/status` | Body: `{"status":"ASSIGNED","actor":{"role":"provider","providerId":"p1"}}` |
//! | `GET`    | `/bookings/:id/actions` | `?role=customer\|provider\|admin` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bmh_core::{
  booking::{Booking, BookingStatus, NewBooking},
  ledger::BookingFilter,
  lifecycle::{Action, Actor, Role, suggested_actions},
};
use bmh_engine::Engine;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
  pub provider_id: Option<String>,
}

/// `GET /bookings[?providerId=<id>]`
pub async fn list(
  State(engine): State<Engine>,
  Query(params): Query<ListParams>,
) -> Json<Vec<Booking>> {
  let filter = params
    .provider_id
    .map_or(BookingFilter::All, BookingFilter::ForProvider);
  Json(engine.bookings(&filter).await)
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /bookings`
pub async fn create(
  State(engine): State<Engine>,
  Json(body): Json<NewBooking>,
) -> Result<impl IntoResponse, ApiError> {
  for (field, value) in [
    ("customerName", &body.customer_name),
    ("serviceType", &body.service_type),
    ("address", &body.address),
  ] {
    if value.trim().is_empty() {
      return Err(ApiError::BadRequest(format!("`{field}` must not be blank")));
    }
  }

  let booking = engine.create_booking(body).await;
  Ok((StatusCode::CREATED, Json(booking)))
}

// ─── Clear ────────────────────────────────────────────────────────────────────

/// `DELETE /bookings`
pub async fn clear(State(engine): State<Engine>) -> StatusCode {
  engine.clear_all().await;
  StatusCode::NO_CONTENT
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /bookings/:id`
pub async fn get_one(
  State(engine): State<Engine>,
  Path(id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
  let booking = engine
    .booking(id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("booking {id} not found")))?;
  Ok(Json(booking))
}

// ─── Status ───────────────────────────────────────────────────────────────────

/// Who is asking, as sent by the client.
#[derive(Debug, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ActorBody {
  Customer {
    name: String,
  },
  Provider {
    #[serde(rename = "providerId")]
    provider_id: String,
  },
  Admin,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
  pub status: BookingStatus,
  pub actor:  ActorBody,
}

/// `POST /bookings/:id/status`
pub async fn set_status(
  State(engine): State<Engine>,
  Path(id): Path<Uuid>,
  Json(body): Json<StatusBody>,
) -> Result<Json<Booking>, ApiError> {
  let actor = match body.actor {
    ActorBody::Customer { name } => Actor::Customer(name),
    ActorBody::Provider { provider_id } => engine
      .directory()
      .get(&provider_id)
      .map(Actor::from)
      .ok_or_else(|| {
        ApiError::BadRequest(format!("unknown provider {provider_id:?}"))
      })?,
    ActorBody::Admin => Actor::Admin,
  };

  let booking = engine.transition(id, body.status, actor).await?;
  Ok(Json(booking))
}

// ─── Actions ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ActionParams {
  pub role: Role,
}

/// `GET /bookings/:id/actions?role=<role>`
pub async fn actions(
  State(engine): State<Engine>,
  Path(id): Path<Uuid>,
  Query(params): Query<ActionParams>,
) -> Result<Json<Vec<Action>>, ApiError> {
  let booking = engine
    .booking(id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("booking {id} not found")))?;
  Ok(Json(suggested_actions(booking.status, params.role)))
}
