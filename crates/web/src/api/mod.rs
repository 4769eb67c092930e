use axum::{
    extract::State,
    routing::{get, on},
    Json, Router,
};
use mobility::tracker::Tracker;
use serde::Serialize;

pub mod v1;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        format!("/api{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub fn routes(state: WebState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .nest_service("/v1", v1::routes(state.clone()))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Pong {
    message: &'static str,
    /// `false` if the tracker stopped answering.
    tracker_running: bool,
}

async fn ping(State(tracker): State<Tracker>) -> Json<Pong> {
    Json(Pong {
        message: "pong!",
        tracker_running: tracker.current().await.is_ok(),
    })
}
