use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{delete, get, on},
    Json, Router,
};
use mobility::services::preferences::Preferences;
use model::preferences::UserPreferences;
use serde_json::Value;

use crate::{
    common::{in_request, route_not_found, schema, RouteResult, METHOD_FILTER_ALL},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<UserPreferences>))
        .route("/data", delete(clear_all_data))
        .route(
            "/",
            get(get_preferences)
                .put(save_preferences)
                .patch(patch_preferences),
        )
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_preferences(
    OriginalUri(original_uri): OriginalUri,
    State(preferences): State<Preferences>,
) -> RouteResult<Json<UserPreferences>> {
    preferences
        .get()
        .await
        .map(Json)
        .map_err(in_request(Method::GET, &original_uri))
}

async fn save_preferences(
    OriginalUri(original_uri): OriginalUri,
    State(preferences): State<Preferences>,
    Json(replacement): Json<UserPreferences>,
) -> RouteResult<Json<UserPreferences>> {
    preferences
        .save(&replacement)
        .await
        .map(|_| Json(replacement))
        .map_err(in_request(Method::PUT, &original_uri))
}

/// Merges a partial document into the stored preferences.
async fn patch_preferences(
    OriginalUri(original_uri): OriginalUri,
    State(preferences): State<Preferences>,
    Json(patch): Json<Value>,
) -> RouteResult<Json<UserPreferences>> {
    preferences
        .merge(patch)
        .await
        .map(Json)
        .map_err(in_request(Method::PATCH, &original_uri))
}

async fn clear_all_data(
    OriginalUri(original_uri): OriginalUri,
    State(preferences): State<Preferences>,
) -> RouteResult<StatusCode> {
    preferences
        .clear_all_data()
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(in_request(Method::DELETE, &original_uri))
}
