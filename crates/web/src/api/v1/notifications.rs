use axum::{
    extract::{OriginalUri, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, on, post},
    Json, Router,
};
use mobility::services::notifications::NotificationCenterRef;
use model::notification::{
    Notification, NotificationKind, NotificationSettings, NotificationSettingsUpdate,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utility::id::Id;

use crate::{
    common::{in_request, route_not_found, schema, RouteResult, VecResponse, METHOD_FILTER_ALL},
    WebState,
};

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<Notification>))
        .route("/settings", get(get_settings).patch(update_settings))
        .route("/unread-count", get(get_unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
        .route("/:id", axum::routing::delete(delete_notification))
        .route(
            "/",
            get(get_notifications)
                .post(announce)
                .delete(clear_notifications),
        )
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
struct AnnounceRequest {
    kind: NotificationKind,
    title: String,
    body: String,
    data: Option<Value>,
}

#[derive(Debug, Serialize)]
struct UnreadCount {
    count: usize,
}

async fn get_notifications(
    OriginalUri(original_uri): OriginalUri,
    State(notifications): State<NotificationCenterRef>,
) -> RouteResult<Json<VecResponse<Notification>>> {
    notifications
        .list()
        .await
        .map(|list| VecResponse::new(list).json())
        .map_err(in_request(Method::GET, &original_uri))
}

/// Creates a notification. Answers `204` if the settings mute its kind.
async fn announce(
    OriginalUri(original_uri): OriginalUri,
    State(notifications): State<NotificationCenterRef>,
    Json(request): Json<AnnounceRequest>,
) -> RouteResult<Response> {
    let delivered = notifications
        .announce(request.kind, request.title, request.body, request.data)
        .await
        .map_err(in_request(Method::POST, &original_uri))?;
    Ok(match delivered {
        Some(notification) => (StatusCode::CREATED, Json(notification)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn get_unread_count(
    OriginalUri(original_uri): OriginalUri,
    State(notifications): State<NotificationCenterRef>,
) -> RouteResult<Json<UnreadCount>> {
    notifications
        .unread_count()
        .await
        .map(|count| Json(UnreadCount { count }))
        .map_err(in_request(Method::GET, &original_uri))
}

async fn mark_read(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(notifications): State<NotificationCenterRef>,
) -> RouteResult<StatusCode> {
    notifications
        .mark_read(Id::new(id))
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(in_request(Method::POST, &original_uri))
}

async fn mark_all_read(
    OriginalUri(original_uri): OriginalUri,
    State(notifications): State<NotificationCenterRef>,
) -> RouteResult<StatusCode> {
    notifications
        .mark_all_read()
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(in_request(Method::POST, &original_uri))
}

async fn delete_notification(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(notifications): State<NotificationCenterRef>,
) -> RouteResult<StatusCode> {
    notifications
        .delete(Id::new(id))
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(in_request(Method::DELETE, &original_uri))
}

async fn clear_notifications(
    OriginalUri(original_uri): OriginalUri,
    State(notifications): State<NotificationCenterRef>,
) -> RouteResult<StatusCode> {
    notifications
        .clear()
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(in_request(Method::DELETE, &original_uri))
}

async fn get_settings(
    OriginalUri(original_uri): OriginalUri,
    State(notifications): State<NotificationCenterRef>,
) -> RouteResult<Json<NotificationSettings>> {
    notifications
        .settings()
        .await
        .map(Json)
        .map_err(in_request(Method::GET, &original_uri))
}

async fn update_settings(
    OriginalUri(original_uri): OriginalUri,
    State(notifications): State<NotificationCenterRef>,
    Json(update): Json<NotificationSettingsUpdate>,
) -> RouteResult<Json<NotificationSettings>> {
    notifications
        .update_settings(update)
        .await
        .map(Json)
        .map_err(in_request(Method::PATCH, &original_uri))
}
