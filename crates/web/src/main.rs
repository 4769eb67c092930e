use std::{env, process, sync::Arc};

use gbfs::GbfsClient;
use mobility::{
    config::TrackerConfig,
    location::PushLocationFeed,
    services::{
        favorites::Favorites, history::RideHistory, notifications::NotificationCenterRef,
        payments::PaymentMethods, preferences::Preferences,
    },
    store::PersistenceStore,
    tracker::Tracker,
};
use storage::{SqliteStore, StorageConnectionInfo};
use web::{start_web_server, WebState};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() {
    env_logger::init();

    // configuration
    let config = match TrackerConfig::from_env() {
        Ok(config) => config,
        Err(why) => {
            log::error!("Invalid configuration: {}", why);
            process::exit(1);
        }
    };

    // storage
    let store: Arc<dyn PersistenceStore> =
        match SqliteStore::connect(StorageConnectionInfo::from_env()).await {
            Ok(store) => Arc::new(store),
            Err(why) => {
                log::error!("Could not open the database: {}", why);
                process::exit(1);
            }
        };

    // services
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

    match tracker.restore().await {
        Ok(Some(ride)) => log::info!("Restored ride {} as paused", ride.ride_id),
        Ok(None) => {}
        Err(why) => log::error!("Could not restore the saved ride: {}", why),
    }

    let scooters = env::var("GBFS_VEHICLE_STATUS_URL").ok().map(GbfsClient::new);
    if let Some(client) = &scooters {
        log::info!("Nearby scooters from {}", client.url());
    }

    // web server
    let state = WebState {
        tracker,
        feed,
        history,
        favorites: Favorites::new(store.clone()),
        notifications,
        preferences: Preferences::new(store.clone()),
        payments: PaymentMethods::new(store),
        zones,
        scooters,
    };
    let address =
        env::var("WEB_BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_owned());

    if let Err(why) = start_web_server(state, address).await {
        log::error!("Web server stopped: {}", why);
        process::exit(1);
    }
}
