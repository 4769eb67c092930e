use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, on},
    Json, Router,
};
use mobility::geofence;
use model::geofence::{GeofenceStatus, Zone};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    common::{route_not_found, schema, RouteErrorResponse, RouteResult, METHOD_FILTER_ALL},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<GeofencesDto>))
        .route("/", get(get_geofences))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
struct PointQuery {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// The configured zones and, if a point was given, which of them contain it.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct GeofencesDto {
    zones: Vec<Zone>,
    containing: Option<Vec<String>>,
    status: Option<GeofenceStatus>,
}

async fn get_geofences(
    State(zones): State<Arc<Vec<Zone>>>,
    Query(params): Query<PointQuery>,
) -> RouteResult<Json<GeofencesDto>> {
    let (containing, status) = match (params.latitude, params.longitude) {
        (Some(latitude), Some(longitude)) => {
            let containing = geofence::zones_containing(latitude, longitude, &zones)?
                .into_iter()
                .map(str::to_owned)
                .collect();
            let status = geofence::evaluate(latitude, longitude, &zones)?;
            (Some(containing), Some(status))
        }
        (None, None) => (None, None),
        _ => {
            return Err(RouteErrorResponse::bad_request(
                "latitude and longitude must be given together.",
            ))
        }
    };
    Ok(Json(GeofencesDto {
        zones: zones.as_ref().clone(),
        containing,
        status,
    }))
}
