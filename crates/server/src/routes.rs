use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Local, NaiveDateTime};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use timetable_transit::{
    ApiStop, DepartureQueryEngine, DeparturesTimetable, StopIdentifier, TransitError,
    default_window,
};

pub const WINDOW_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn create_router(engine: Arc<DepartureQueryEngine>) -> Router {
    Router::new()
        .route("/departures/{stop_id}", get(departures))
        .route("/stops", get(stops))
        .route("/stops/", get(stops))
        .route("/health", get(health))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(engine)
}

#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Transit(#[from] TransitError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) | Self::Transit(TransitError::InvalidWindow(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Transit(TransitError::StopNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Transit(e) => {
                error!("Departure query failed: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match self {
            Self::BadRequest(message) => message,
            Self::Transit(e) => e.to_string(),
        };
        (status, message).into_response()
    }
}

fn parse_timestamp(name: &str, value: &str) -> Result<NaiveDateTime, ApiError> {
    NaiveDateTime::parse_from_str(value, WINDOW_FORMAT).map_err(|e| {
        ApiError::BadRequest(format!("Invalid {name} '{value}', expected {WINDOW_FORMAT}: {e}"))
    })
}

/// Fill in whatever bound the caller left out
///
/// No bounds gives the default window around `now`. A lone `from` keeps the
/// default window's length, a lone `to` keeps its lead time.
pub fn resolve_window(
    params: &WindowParams,
    now: NaiveDateTime,
) -> Result<(NaiveDateTime, NaiveDateTime), ApiError> {
    let (default_start, default_end) = default_window(now);
    let span = default_end - default_start;

    let start = params
        .from
        .as_deref()
        .map(|value| parse_timestamp("from", value))
        .transpose()?;
    let end = params
        .to
        .as_deref()
        .map(|value| parse_timestamp("to", value))
        .transpose()?;

    Ok(match (start, end) {
        (Some(start), Some(end)) => (start, end),
        (Some(start), None) => (start, start + span),
        (None, Some(end)) => (end - span, end),
        (None, None) => (default_start, default_end),
    })
}

async fn departures(
    State(engine): State<Arc<DepartureQueryEngine>>,
    Path(stop_id): Path<String>,
    Query(params): Query<WindowParams>,
) -> Result<Json<DeparturesTimetable>, ApiError> {
    let (start, end) = resolve_window(&params, Local::now().naive_local())?;
    let board = engine
        .create_departures_timetable(&StopIdentifier::new(stop_id), start, end)
        .await?;
    Ok(Json(board))
}

async fn stops(State(engine): State<Arc<DepartureQueryEngine>>) -> Json<Vec<ApiStop>> {
    Json(engine.list_queryable_stops())
}

async fn health() -> &'static str {
    "OK"
}
