// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! REST API server example for the point ledger.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `GET /point/{id}` - Current balance of a user
//! - `GET /point/{id}/histories` - Transaction history of a user
//! - `PATCH /point/{id}/charge` - Charge points (body: JSON integer amount)
//! - `PATCH /point/{id}/use` - Use points (body: JSON integer amount)
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X PATCH http://localhost:3000/point/1/charge \
//!   -H "Content-Type: application/json" -d '1000'
//!
//! curl -X PATCH http://localhost:3000/point/1/use \
//!   -H "Content-Type: application/json" -d '400'
//!
//! curl http://localhost:3000/point/1
//! curl http://localhost:3000/point/1/histories
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use point_ledger::{
    PointError, PointLedger, TransactionRecord, UserBalance, validate_amount, validate_user_id,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

// === Response DTOs ===

/// Response body for errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// === Application State ===

/// Shared application state containing the ledger.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<PointLedger>,
}

// === Error Handling ===

/// Wrapper for converting `PointError` into HTTP responses.
pub struct AppError(PointError);

impl From<PointError> for AppError {
    fn from(err: PointError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Every ledger error is a client error.
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                code: self.0.code().to_string(),
                message: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// GET /point/{id}
async fn get_point(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserBalance>, AppError> {
    Ok(Json(state.ledger.get_point(id)?))
}

/// GET /point/{id}/histories
async fn get_histories(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<TransactionRecord>>, AppError> {
    Ok(Json(state.ledger.get_history(id)?))
}

/// PATCH /point/{id}/charge
///
/// The gate wait blocks the worker thread. Critical sections are short
/// in-memory updates, so the handler calls the ledger inline.
async fn charge(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(amount): Json<Option<i64>>,
) -> Result<Json<UserBalance>, AppError> {
    // A null body is an invalid amount, reported after the user id check.
    validate_user_id(Some(id), state.ledger.config())?;
    let amount = validate_amount(amount, state.ledger.config())?;
    Ok(Json(state.ledger.charge(id, amount.0)?))
}

/// PATCH /point/{id}/use
async fn use_point(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(amount): Json<Option<i64>>,
) -> Result<Json<UserBalance>, AppError> {
    validate_user_id(Some(id), state.ledger.config())?;
    let amount = validate_amount(amount, state.ledger.config())?;
    Ok(Json(state.ledger.use_point(id, amount.0)?))
}

// === Router ===

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/point/{id}", get(get_point))
        .route("/point/{id}/histories", get(get_histories))
        .route("/point/{id}/charge", patch(charge))
        .route("/point/{id}/use", patch(use_point))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let state = AppState {
        ledger: Arc::new(PointLedger::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    info!(addr = %listener.local_addr()?, "point ledger API listening");

    axum::serve(listener, app).await?;
    Ok(())
}
