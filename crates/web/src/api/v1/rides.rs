use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    routing::{get, on, put},
    Extension, Json, Router,
};
use mobility::services::history::RideHistory;
use model::ride::{RideRecord, RideStatistics};
use serde::Deserialize;
use utility::id::Id;

use crate::{
    common::{
        in_request, route_not_found, schema, HateoasResult, RouteResult, VecResponse,
        METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/rides{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<RideRecord>))
        .route("/statistics", get(get_statistics))
        .route("/:id/rating", put(rate_ride))
        .route("/:id", get(get_ride))
        .route("/", get(get_rides))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
struct RatingRequest {
    rating: u8,
}

async fn get_rides(
    OriginalUri(original_uri): OriginalUri,
    State(history): State<RideHistory>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<RideRecord>>> {
    history
        .list()
        .await
        .map(|rides| {
            rides
                .into_iter()
                .map(|ride| ride_record_hateoas(ride, base_url.clone()))
                .collect::<Vec<_>>()
        })
        .map(|data| VecResponse::new(data).hateoas().json())
        .map_err(in_request(Method::GET, &original_uri))
}

async fn get_ride(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(history): State<RideHistory>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<RideRecord> {
    history
        .get(&Id::new(id))
        .await
        .map(|ride| ride_record_hateoas(ride, base_url).json())
        .map_err(in_request(Method::GET, &original_uri))
}

async fn rate_ride(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(history): State<RideHistory>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(request): Json<RatingRequest>,
) -> HateoasResult<RideRecord> {
    history
        .rate(&Id::new(id), request.rating)
        .await
        .map(|ride| ride_record_hateoas(ride, base_url).json())
        .map_err(in_request(Method::PUT, &original_uri))
}

async fn get_statistics(
    OriginalUri(original_uri): OriginalUri,
    State(history): State<RideHistory>,
) -> RouteResult<Json<RideStatistics>> {
    history
        .statistics()
        .await
        .map(Json)
        .map_err(in_request(Method::GET, &original_uri))
}

pub(crate) fn ride_record_hateoas(
    ride: RideRecord,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<RideRecord> {
    let id = ride.id.raw();
    hateoas::Response::builder(ride, base_url)
        .link("self", resource!("/{}", id))
        .link("rating", resource!("/{}/rating", id))
        .build()
}
