pub mod config;
pub mod error;
pub mod gpx_export;
pub mod route_planner;
pub mod routing;
pub mod store;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
};
use shared::{ApiError, Coordinate, GpxExport, RouteView};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ExportError;
use crate::gpx_export::encode_route_as_gpx;
use crate::route_planner::{MapEvent, RoutePlanner};

#[derive(Clone)]
pub struct AppState {
    pub planner: Arc<RoutePlanner>,
}

/// HTTP port the map widget drives the planner through.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/route", get(route_handler))
        .route("/api/route/reset", post(reset_handler))
        .route("/api/route/gpx", get(gpx_handler))
        .route("/api/waypoints", post(add_waypoint_handler))
        .route("/api/waypoints/:index", delete(remove_waypoint_handler))
        .route("/api/location", put(location_handler))
        .layer(cors)
        .with_state(state)
}

async fn route_handler(State(state): State<AppState>) -> Json<RouteView> {
    Json(state.planner.snapshot().await)
}

async fn dispatch(state: &AppState, event: MapEvent) -> Json<RouteView> {
    let outcome = state.planner.handle(event).await;
    tracing::debug!("map event handled: {outcome:?}");
    Json(state.planner.snapshot().await)
}

async fn add_waypoint_handler(
    State(state): State<AppState>,
    Json(coord): Json<Coordinate>,
) -> Json<RouteView> {
    dispatch(&state, MapEvent::MapClicked(coord)).await
}

async fn remove_waypoint_handler(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Json<RouteView> {
    dispatch(&state, MapEvent::MarkerClicked(index)).await
}

async fn reset_handler(State(state): State<AppState>) -> Json<RouteView> {
    dispatch(&state, MapEvent::Reset).await
}

async fn location_handler(
    State(state): State<AppState>,
    Json(coord): Json<Coordinate>,
) -> Json<RouteView> {
    dispatch(&state, MapEvent::LocationFound(coord)).await
}

async fn gpx_handler(
    State(state): State<AppState>,
) -> Result<Json<GpxExport>, (StatusCode, Json<ApiError>)> {
    let view = state.planner.snapshot().await;
    if !view.has_polyline() {
        return Err((
            StatusCode::CONFLICT,
            Json(ApiError {
                message: "route needs at least two points to export".into(),
            }),
        ));
    }
    let gpx_base64 = encode_route_as_gpx(&view).map_err(internal_error)?;
    Ok(Json(GpxExport { gpx_base64 }))
}

fn internal_error(err: ExportError) -> (StatusCode, Json<ApiError>) {
    tracing::error!("{err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
