use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{OriginalUri, State},
    http::Method,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, on, post},
    Extension, Json, Router,
};
use futures::Stream;
use gbfs::GbfsClient;
use mobility::{session::RideSnapshot, tracker::Tracker};
use model::{
    ride::{RideRecord, RideStatus},
    scooter::Scooter,
};
use serde::Deserialize;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt as _,
};
use utility::id::Id;

use crate::{
    api::v1::scooters::rentable_scooter,
    common::{in_request, route_not_found, schema, HateoasResult, RouteErrorResponse, METHOD_FILTER_ALL},
    hateoas,
    middleware::base_url::{base_url_middleware, BaseUrl},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/ride{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<RideSnapshot>))
        .route("/events", get(ride_events))
        .route("/start", post(start_ride))
        .route("/pause", post(pause_ride))
        .route("/resume", post(resume_ride))
        .route("/end", post(end_ride))
        .route("/", get(get_ride))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRideRequest {
    scooter_id: Id<Scooter>,
    /// 0 to 100
    battery_level: Option<f64>,
}

async fn get_ride(
    OriginalUri(original_uri): OriginalUri,
    State(tracker): State<Tracker>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<RideSnapshot> {
    match tracker
        .current()
        .await
        .map_err(in_request(Method::GET, &original_uri))?
    {
        Some(snapshot) => Ok(ride_hateoas(snapshot, base_url).json()),
        None => Err(RouteErrorResponse::not_found(&Method::GET, original_uri.path())
            .with_message("There is no ride in progress.")),
    }
}

/// Without a vehicle feed any scooter id is accepted.
async fn start_ride(
    OriginalUri(original_uri): OriginalUri,
    State(tracker): State<Tracker>,
    State(scooters): State<Option<GbfsClient>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(request): Json<StartRideRequest>,
) -> HateoasResult<RideSnapshot> {
    if let Some(level) = request.battery_level {
        if !level.is_finite() || !(0.0..=100.0).contains(&level) {
            return Err(RouteErrorResponse::bad_request(
                "batteryLevel must be between 0 and 100.",
            ));
        }
    }
    if let Some(client) = scooters {
        rentable_scooter(&client, &request.scooter_id, Method::POST, &original_uri).await?;
    }
    tracker
        .start(request.scooter_id, request.battery_level)
        .await
        .map(|snapshot| ride_hateoas(snapshot, base_url).json())
        .map_err(in_request(Method::POST, &original_uri))
}

async fn pause_ride(
    OriginalUri(original_uri): OriginalUri,
    State(tracker): State<Tracker>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<RideSnapshot> {
    tracker
        .pause()
        .await
        .map(|snapshot| ride_hateoas(snapshot, base_url).json())
        .map_err(in_request(Method::POST, &original_uri))
}

async fn resume_ride(
    OriginalUri(original_uri): OriginalUri,
    State(tracker): State<Tracker>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<RideSnapshot> {
    tracker
        .resume()
        .await
        .map(|snapshot| ride_hateoas(snapshot, base_url).json())
        .map_err(in_request(Method::POST, &original_uri))
}

async fn end_ride(
    OriginalUri(original_uri): OriginalUri,
    State(tracker): State<Tracker>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<RideRecord> {
    tracker
        .end()
        .await
        .map(|record| crate::api::v1::rides::ride_record_hateoas(record, base_url).json())
        .map_err(in_request(Method::POST, &original_uri))
}

/// Server-sent events of the tracker. The event name is the kind of ride
/// event, the data its JSON payload.
async fn ride_events(
    State(tracker): State<Tracker>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(tracker.subscribe()).filter_map(|event| match event {
        Ok(event) => match Event::default().event(event.name()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(why) => {
                log::error!("Could not encode {} event: {}", event.name(), why);
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            log::warn!("Ride event subscriber lagged behind, skipped {} events", skipped);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub(crate) fn ride_hateoas(
    snapshot: RideSnapshot,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<RideSnapshot> {
    let status = snapshot.status;
    hateoas::Response::builder(snapshot, base_url)
        .link("self", resource!(""))
        .link("events", resource!("/events"))
        .link_if(status == RideStatus::Active, "pause", resource!("/pause"))
        .link_if(status == RideStatus::Paused, "resume", resource!("/resume"))
        .link_if(status.in_progress(), "end", resource!("/end"))
        .build()
}
