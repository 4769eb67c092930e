use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode, Uri},
    routing::{get, on, post},
    Extension, Json, Router,
};
use gbfs::GbfsClient;
use mobility::{geofence, session::RideSnapshot, tracker::Tracker};
use model::{scooter::Scooter, WithDistance};
use serde::Deserialize;
use utility::id::Id;

use crate::{
    api::v1::ride::ride_hateoas,
    common::{
        in_request, route_not_found, HateoasResult, RouteErrorResponse, RouteResult,
        VecResponse, METHOD_FILTER_ALL,
    },
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

const DEFAULT_RADIUS_KM: f64 = 0.5;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/unlock", post(unlock_scooter))
        .route("/:id", get(get_scooter))
        .route("/", get(nearby_scooters))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

fn feed_not_configured(method: &Method, uri: &Uri) -> RouteErrorResponse {
    RouteErrorResponse::new(StatusCode::SERVICE_UNAVAILABLE)
        .with_method(method)
        .with_uri(uri.path())
        .with_message("No vehicle feed is configured.")
}

/// Looks the scooter up in the feed and makes sure it can be rented.
pub(crate) async fn rentable_scooter(
    client: &GbfsClient,
    id: &Id<Scooter>,
    method: Method,
    uri: &Uri,
) -> RouteResult<Scooter> {
    let scooter = client
        .vehicle(id)
        .await
        .map_err(in_request(method.clone(), uri))?;
    match scooter {
        Some(scooter) if scooter.is_available => Ok(scooter),
        Some(_) => Err(RouteErrorResponse::new(StatusCode::CONFLICT)
            .with_method(&method)
            .with_uri(uri.path())
            .with_message(format!("Scooter {} is not available.", id))),
        None => Err(RouteErrorResponse::not_found(&method, uri.path())
            .with_message(format!("There is no scooter {}.", id))),
    }
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    latitude: f64,
    longitude: f64,
    /// kilometers
    radius: Option<f64>,
}

async fn nearby_scooters(
    OriginalUri(original_uri): OriginalUri,
    State(client): State<Option<GbfsClient>>,
    Query(params): Query<NearbyQuery>,
) -> RouteResult<Json<VecResponse<WithDistance<Scooter>>>> {
    let Some(client) = client else {
        return Err(feed_not_configured(&Method::GET, &original_uri));
    };
    geofence::validate_coordinate(params.latitude, params.longitude)?;
    let radius = params.radius.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius.is_finite() || radius <= 0.0 {
        return Err(RouteErrorResponse::bad_request("radius must be positive."));
    }

    client
        .nearby(params.latitude, params.longitude, radius)
        .await
        .map(|scooters| VecResponse::new(scooters).json())
        .map_err(in_request(Method::GET, &original_uri))
}

async fn get_scooter(
    OriginalUri(original_uri): OriginalUri,
    State(client): State<Option<GbfsClient>>,
    Path(id): Path<String>,
) -> RouteResult<Json<Scooter>> {
    let Some(client) = client else {
        return Err(feed_not_configured(&Method::GET, &original_uri));
    };
    client
        .vehicle(&Id::new(id))
        .await
        .map_err(in_request(Method::GET, &original_uri))?
        .map(Json)
        .ok_or_else(|| RouteErrorResponse::not_found(&Method::GET, original_uri.path()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnlockRequest {
    qr_code: String,
}

/// Unlocks the scooter behind a scanned QR code and starts the ride on it.
async fn unlock_scooter(
    OriginalUri(original_uri): OriginalUri,
    State(client): State<Option<GbfsClient>>,
    State(tracker): State<Tracker>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(request): Json<UnlockRequest>,
) -> HateoasResult<RideSnapshot> {
    let Some(client) = client else {
        return Err(feed_not_configured(&Method::POST, &original_uri));
    };
    let Some(id) = gbfs::vehicle_id_from_qr(&request.qr_code) else {
        return Err(RouteErrorResponse::bad_request(
            "The QR code does not belong to a scooter.",
        ));
    };
    let scooter = rentable_scooter(&client, &id, Method::POST, &original_uri).await?;
    log::info!("Unlocking scooter {}", scooter.id);

    tracker
        .start(scooter.id, scooter.battery_level)
        .await
        .map(|snapshot| ride_hateoas(snapshot, base_url).json())
        .map_err(in_request(Method::POST, &original_uri))
}
