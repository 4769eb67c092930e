pub use crate::common::RouteResult;

use std::sync::Arc;

use axum::{extract::FromRef, routing::on, Router};
use gbfs::GbfsClient;
use mobility::{
    location::PushLocationFeed,
    services::{
        favorites::Favorites, history::RideHistory, notifications::NotificationCenterRef,
        payments::PaymentMethods, preferences::Preferences,
    },
    tracker::Tracker,
};
use model::geofence::Zone;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::CorsLayer;

use crate::common::{route_not_found, METHOD_FILTER_ALL};

pub mod api;
pub mod common;
pub mod hateoas;
pub mod middleware;

#[derive(Clone, FromRef)]
pub struct WebState {
    pub tracker: Tracker,
    pub feed: Arc<PushLocationFeed>,
    pub history: RideHistory,
    pub favorites: Favorites,
    pub notifications: NotificationCenterRef,
    pub preferences: Preferences,
    pub payments: PaymentMethods,
    pub zones: Arc<Vec<Zone>>,
    pub scooters: Option<GbfsClient>,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
        .layer(CorsLayer::permissive())
}

pub async fn start_web_server<A: ToSocketAddrs>(state: WebState, address: A) -> std::io::Result<()> {
    let listener = TcpListener::bind(address).await?;
    log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state).into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use mobility::{config::TrackerConfig, store::MemoryStore};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const VEHICLE_STATUS: &str = r#"{
        "last_updated": "2024-01-01T00:00:00Z",
        "ttl": 0,
        "version": "3.0",
        "data": {
            "vehicles": [
                { "vehicle_id": "sc-1", "lat": 37.7750, "lon": -122.4195, "is_reserved": false, "is_disabled": false, "current_fuel_percent": 0.87 },
                { "vehicle_id": "sc-2", "lat": 37.7751, "lon": -122.4194, "is_reserved": true, "is_disabled": false }
            ]
        }
    }"#;

    /// Serves a fixed vehicle feed on a local port.
    async fn vehicle_feed() -> GbfsClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let feed = Router::new().route(
            "/vehicle_status.json",
            axum::routing::get(|| async { VEHICLE_STATUS }),
        );
        tokio::spawn(async move { axum::serve(listener, feed).await });
        GbfsClient::new(format!("http://{}/vehicle_status.json", address))
    }

    fn state() -> WebState {
        state_with(None)
    }

    fn state_with(scooters: Option<GbfsClient>) -> WebState {
        let store: Arc<dyn mobility::store::PersistenceStore> = Arc::new(MemoryStore::new());
        let config = TrackerConfig::default();
        let feed = Arc::new(PushLocationFeed::default());
        let history = RideHistory::new(store.clone());
        let notifications = NotificationCenterRef::spawn(store.clone());
        let zones = Arc::new(config.zones.clone());
        let tracker = Tracker::spawn(
            config,
            feed.clone(),
            store.clone(),
            history.clone(),
            Arc::new(notifications.clone()),
        );
        WebState {
            tracker,
            feed,
            history,
            favorites: Favorites::new(store.clone()),
            notifications,
            preferences: Preferences::new(store.clone()),
            payments: PaymentMethods::new(store),
            zones,
            scooters,
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let app = router(state());
        let (status, body) = send(&app, "GET", "/api/ping", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "pong!");
        assert_eq!(body["trackerRunning"], true);
    }

    #[tokio::test]
    async fn ride_lifecycle_over_http() {
        let app = router(state());

        let (status, _) = send(&app, "GET", "/api/v1/ride", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/ride/start",
            Some(json!({ "scooterId": "scooter-7", "batteryLevel": 80.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active");
        assert_eq!(body["scooterId"], "scooter-7");
        let relations: Vec<&str> = body["links"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|link| link["rel"].as_str())
            .collect();
        assert!(relations.contains(&"pause"));
        assert!(!relations.contains(&"resume"));

        let (status, _) = send(&app, "POST", "/api/v1/ride/resume", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, "POST", "/api/v1/ride/end", None).await;
        assert_eq!(status, StatusCode::OK);
        let ride_id = body["id"].as_str().unwrap().to_owned();

        let (status, body) = send(&app, "GET", "/api/v1/rides", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["id"], ride_id.as_str());
    }

    #[tokio::test]
    async fn out_of_range_battery_is_rejected() {
        let app = router(state());
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/ride/start",
            Some(json!({ "scooterId": "scooter-7", "batteryLevel": 140.0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn geofences_evaluate_a_point() {
        let app = router(state());
        let (status, body) = send(
            &app,
            "GET",
            "/api/v1/geofences?latitude=37.7749&longitude=-122.4194",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["containing"], json!(["Downtown"]));
        assert_eq!(body["status"]["inSlowZone"], true);
        assert_eq!(body["status"]["inNoRideZone"], false);

        let (status, _) = send(&app, "GET", "/api/v1/geofences?latitude=95&longitude=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn scooters_need_a_configured_feed() {
        let app = router(state());
        let (status, _) = send(
            &app,
            "GET",
            "/api/v1/scooters?latitude=37.7749&longitude=-122.4194",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn scooters_are_looked_up_by_id() {
        let app = router(state_with(Some(vehicle_feed().await)));

        let (status, body) = send(&app, "GET", "/api/v1/scooters/sc-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "sc-1");
        assert_eq!(body["batteryLevel"], 87.0);
        assert_eq!(body["isAvailable"], true);

        let (status, _) = send(&app, "GET", "/api/v1/scooters/sc-9", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let app = router(state());
        let (status, _) = send(&app, "GET", "/api/v1/scooters/sc-1", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unlocking_a_scanned_scooter_starts_the_ride() {
        let app = router(state_with(Some(vehicle_feed().await)));
        let unlock = |code: &str| Some(json!({ "qrCode": code }));

        let (status, _) = send(&app, "POST", "/api/v1/scooters/unlock", unlock("not a scooter")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "POST", "/api/v1/scooters/unlock", unlock("sc-9")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "POST", "/api/v1/scooters/unlock", unlock("sc-2")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(&app, "GET", "/api/v1/ride", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/scooters/unlock",
            unlock("https://scoot.example/s/sc-1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active");
        assert_eq!(body["scooterId"], "sc-1");

        let (status, body) = send(&app, "GET", "/api/v1/ride", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["scooterId"], "sc-1");
    }

    #[tokio::test]
    async fn starting_checks_the_scooter_against_the_feed() {
        let app = router(state_with(Some(vehicle_feed().await)));

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/ride/start",
            Some(json!({ "scooterId": "scooter-7" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/ride/start",
            Some(json!({ "scooterId": "sc-2" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/ride/start",
            Some(json!({ "scooterId": "sc-1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active");
    }

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let app = router(state());
        let (status, body) = send(&app, "GET", "/api/v1/nothing-here", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["httpMethod"], "GET");
    }
}
