use axum::{routing::on, Router};

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

mod favorites;
mod geofences;
mod location;
mod notifications;
mod payments;
mod preferences;
mod ride;
mod rides;
mod scooters;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::resource!("/v1{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .nest_service("/ride", ride::routes(state.clone()))
        .nest_service("/location", location::routes(state.clone()))
        .nest_service("/rides", rides::routes(state.clone()))
        .nest_service("/geofences", geofences::routes(state.clone()))
        .nest_service("/scooters", scooters::routes(state.clone()))
        .nest_service("/favorites", favorites::routes(state.clone()))
        .nest_service("/recents", favorites::recent_routes(state.clone()))
        .nest_service("/notifications", notifications::routes(state.clone()))
        .nest_service("/preferences", preferences::routes(state.clone()))
        .nest_service("/payment-methods", payments::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}
