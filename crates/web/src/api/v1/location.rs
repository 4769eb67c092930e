use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, on, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use mobility::{
    geofence,
    location::{Permission, PushLocationFeed},
};
use model::location::LocationSample;
use serde::{Deserialize, Serialize};

use crate::{
    common::{route_not_found, RouteResult, METHOD_FILTER_ALL},
    WebState,
};

/// Position fixes are pushed here by the device. The tracker subscribes to
/// the same feed.
pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/permission", get(get_permission).put(set_permission))
        .route("/", post(push_location))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationUpdate {
    latitude: f64,
    longitude: f64,
    speed: Option<f64>,
    heading: Option<f64>,
    accuracy: Option<f64>,
    /// Defaults to the time of arrival.
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushedLocation {
    delivered_to: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionBody {
    permission: Permission,
}

async fn push_location(
    State(feed): State<Arc<PushLocationFeed>>,
    Json(update): Json<LocationUpdate>,
) -> RouteResult<Json<PushedLocation>> {
    geofence::validate_coordinate(update.latitude, update.longitude)?;
    let sample = LocationSample {
        latitude: update.latitude,
        longitude: update.longitude,
        speed: update.speed,
        heading: update.heading,
        accuracy: update.accuracy,
        timestamp: update.timestamp.unwrap_or_else(Utc::now),
    };
    Ok(Json(PushedLocation {
        delivered_to: feed.push(sample),
    }))
}

async fn get_permission(State(feed): State<Arc<PushLocationFeed>>) -> Json<PermissionBody> {
    Json(PermissionBody {
        permission: feed.permission(),
    })
}

async fn set_permission(
    State(feed): State<Arc<PushLocationFeed>>,
    Json(body): Json<PermissionBody>,
) -> Json<PermissionBody> {
    feed.set_permission(body.permission);
    log::info!("Location permission set to {:?}", body.permission);
    Json(body)
}
