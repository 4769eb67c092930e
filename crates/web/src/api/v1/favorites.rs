use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, on, post, put},
    Extension, Json, Router,
};
use mobility::services::favorites::Favorites;
use model::{
    favorite::{
        FavoriteKind, FavoriteLocation, FavoriteStatistics, FavoriteUpdate, NewFavorite,
        NewRecentLocation, RecentLocation, SavedLocation,
    },
    WithDistance,
};
use serde::{Deserialize, Serialize};
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
        crate::api::v1::resource!("/favorites{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

const DEFAULT_NEARBY_RADIUS_KM: f64 = 1.0;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/schema", get(schema::<FavoriteLocation>))
        .route("/statistics", get(get_statistics))
        .route("/suggestions", get(get_suggestions))
        .route("/search", get(search))
        .route("/nearby", get(get_nearby))
        .route("/check", get(check_favorite))
        .route("/export", get(export))
        .route("/import", post(import))
        .route("/:id/use", post(mark_used))
        .route("/:id", put(update_favorite).delete(delete_favorite))
        .route("/", get(get_favorites).post(add_favorite))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

pub(crate) fn recent_routes(state: WebState) -> Router {
    Router::new()
        .route("/frequent", get(get_frequent))
        .route(
            "/",
            get(get_recents).post(add_recent).delete(clear_recents),
        )
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
struct KindQuery {
    kind: Option<FavoriteKind>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    latitude: f64,
    longitude: f64,
    /// kilometers
    radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CheckQuery {
    latitude: f64,
    longitude: f64,
    /// degrees
    tolerance: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResult {
    is_favorite: bool,
}

async fn get_favorites(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
    Query(params): Query<KindQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<FavoriteLocation>>> {
    let list = match params.kind {
        Some(kind) => favorites.by_kind(kind).await,
        None => favorites.list().await,
    };
    list.map(|list| {
        list.into_iter()
            .map(|favorite| favorite_hateoas(favorite, base_url.clone()))
            .collect::<Vec<_>>()
    })
    .map(|data| VecResponse::new(data).hateoas().json())
    .map_err(in_request(Method::GET, &original_uri))
}

async fn add_favorite(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(favorite): Json<NewFavorite>,
) -> RouteResult<impl IntoResponse> {
    favorites
        .add(favorite)
        .await
        .map(|favorite| (StatusCode::CREATED, favorite_hateoas(favorite, base_url).json()))
        .map_err(in_request(Method::POST, &original_uri))
}

async fn update_favorite(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(favorites): State<Favorites>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    Json(update): Json<FavoriteUpdate>,
) -> HateoasResult<FavoriteLocation> {
    favorites
        .update(&Id::new(id), update)
        .await
        .map(|favorite| favorite_hateoas(favorite, base_url).json())
        .map_err(in_request(Method::PUT, &original_uri))
}

async fn delete_favorite(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(favorites): State<Favorites>,
) -> RouteResult<StatusCode> {
    favorites
        .remove(&Id::new(id))
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(in_request(Method::DELETE, &original_uri))
}

async fn mark_used(
    OriginalUri(original_uri): OriginalUri,
    Path(id): Path<String>,
    State(favorites): State<Favorites>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<FavoriteLocation> {
    favorites
        .mark_used(&Id::new(id))
        .await
        .map(|favorite| favorite_hateoas(favorite, base_url).json())
        .map_err(in_request(Method::POST, &original_uri))
}

async fn get_statistics(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
) -> RouteResult<Json<FavoriteStatistics>> {
    favorites
        .statistics()
        .await
        .map(Json)
        .map_err(in_request(Method::GET, &original_uri))
}

async fn get_suggestions(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
) -> RouteResult<Json<VecResponse<FavoriteLocation>>> {
    favorites
        .suggestions()
        .await
        .map(|suggestions| VecResponse::new(suggestions).json())
        .map_err(in_request(Method::GET, &original_uri))
}

async fn search(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
    Query(params): Query<SearchQuery>,
) -> RouteResult<Json<VecResponse<SavedLocation>>> {
    favorites
        .search(&params.q)
        .await
        .map(|found| VecResponse::new(found).json())
        .map_err(in_request(Method::GET, &original_uri))
}

async fn get_nearby(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
    Query(params): Query<NearbyQuery>,
) -> RouteResult<Json<VecResponse<WithDistance<FavoriteLocation>>>> {
    favorites
        .nearby(
            params.latitude,
            params.longitude,
            params.radius.unwrap_or(DEFAULT_NEARBY_RADIUS_KM),
        )
        .await
        .map(|nearby| VecResponse::new(nearby).json())
        .map_err(in_request(Method::GET, &original_uri))
}

async fn check_favorite(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
    Query(params): Query<CheckQuery>,
) -> RouteResult<Json<CheckResult>> {
    favorites
        .is_favorite(params.latitude, params.longitude, params.tolerance)
        .await
        .map(|is_favorite| Json(CheckResult { is_favorite }))
        .map_err(in_request(Method::GET, &original_uri))
}

async fn export(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
) -> RouteResult<impl IntoResponse> {
    favorites
        .export()
        .await
        .map(|backup| ([(header::CONTENT_TYPE, "application/json")], backup))
        .map_err(in_request(Method::GET, &original_uri))
}

async fn import(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
    backup: String,
) -> RouteResult<StatusCode> {
    favorites
        .import(&backup)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(in_request(Method::POST, &original_uri))
}

async fn get_recents(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
) -> RouteResult<Json<VecResponse<RecentLocation>>> {
    favorites
        .recents()
        .await
        .map(|recents| VecResponse::new(recents).json())
        .map_err(in_request(Method::GET, &original_uri))
}

async fn get_frequent(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
) -> RouteResult<Json<VecResponse<RecentLocation>>> {
    favorites
        .frequent()
        .await
        .map(|frequent| VecResponse::new(frequent).json())
        .map_err(in_request(Method::GET, &original_uri))
}

async fn add_recent(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
    Json(location): Json<NewRecentLocation>,
) -> RouteResult<Json<RecentLocation>> {
    favorites
        .add_recent(location)
        .await
        .map(Json)
        .map_err(in_request(Method::POST, &original_uri))
}

async fn clear_recents(
    OriginalUri(original_uri): OriginalUri,
    State(favorites): State<Favorites>,
) -> RouteResult<StatusCode> {
    favorites
        .clear_recents()
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(in_request(Method::DELETE, &original_uri))
}

fn favorite_hateoas(
    favorite: FavoriteLocation,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<FavoriteLocation> {
    let id = favorite.id.raw();
    hateoas::Response::builder(favorite, base_url)
        .link("self", resource!("/{}", id))
        .link("use", resource!("/{}/use", id))
        .build()
}
