use std::{any::Any, sync::Arc};

use actors::{
    actor::{Actor, SupervisionStrategy},
    actor_ref::ActorRef,
    handler::{Handler, Message},
};
use async_trait::async_trait;
use chrono::Utc;
use model::notification::{
    Notification, NotificationKind, NotificationSettings, NotificationSettingsUpdate,
    RideNotificationKind,
};
use serde_json::{json, Value};
use utility::id::Id;

use super::Document;
use crate::{
    notifier::NotificationEmitter,
    store::{keys, PersistenceStore},
    MobilityError, MobilityResult,
};

/// Title and body of a ride notification. `payload` is the ride snapshot or,
/// for an ended ride, the ride record.
fn ride_message(kind: RideNotificationKind, payload: &Value) -> (String, String) {
    let field = |name: &str| {
        payload
            .get(name)
            .map(|value| match value {
                Value::String(value) => value.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    };
    match kind {
        RideNotificationKind::Started => (
            "Ride Started".to_owned(),
            format!(
                "Your ride on scooter #{} has begun. Enjoy!",
                field("scooterId")
            ),
        ),
        RideNotificationKind::Paused => (
            "Ride Paused".to_owned(),
            "Your ride is paused. Tap to resume when ready.".to_owned(),
        ),
        RideNotificationKind::Resumed => (
            "Ride Resumed".to_owned(),
            "Your ride has been resumed. Safe travels!".to_owned(),
        ),
        RideNotificationKind::Ended => {
            let cost = payload
                .get("cost")
                .and_then(Value::as_f64)
                .unwrap_or_default();
            (
                "Ride Completed".to_owned(),
                format!(
                    "Total cost: ${:.2}. Duration: {}",
                    cost,
                    field("duration")
                ),
            )
        }
        RideNotificationKind::LowBattery => {
            let body = match payload
                .get("batteryRemainingPercent")
                .and_then(Value::as_f64)
            {
                Some(remaining) => format!(
                    "Your scooter battery is down to {:.0}%. Consider ending your ride soon.",
                    remaining
                ),
                None => "Your scooter battery is running low. Consider ending your ride soon."
                    .to_owned(),
            };
            ("Low Battery Warning".to_owned(), body)
        }
    }
}

/// The in-app notification inbox.
pub struct NotificationCenter {
    notifications: Document<Vec<Notification>>,
    settings: Document<NotificationSettings>,
}

impl Actor for NotificationCenter {
    fn on_fail(&mut self, _error: Box<dyn Any + Send>) -> SupervisionStrategy {
        SupervisionStrategy::Resume
    }
}

impl NotificationCenter {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Self {
        Self {
            notifications: Document::new(store.clone(), keys::NOTIFICATIONS),
            settings: Document::new(store, keys::NOTIFICATION_SETTINGS),
        }
    }

    /// Stores a notification unless the settings block its kind.
    async fn deliver(
        &self,
        kind: NotificationKind,
        title: String,
        body: String,
        data: Value,
    ) -> MobilityResult<Option<Notification>> {
        let settings = self.settings.read().await?;
        if !settings.allows(kind) {
            log::debug!("{:?} notification {:?} suppressed by settings", kind, title);
            return Ok(None);
        }
        let notification = Notification {
            id: Id::generate(),
            title,
            body,
            data: Some(data),
            timestamp: Utc::now(),
            read: false,
            kind,
        };
        log::info!("notification: {}: {}", notification.title, notification.body);
        self.notifications
            .update(|notifications| {
                notifications.insert(0, notification.clone());
                Ok(Some(notification))
            })
            .await
    }
}

#[derive(Debug, Clone)]
pub struct RideUpdate {
    pub kind: RideNotificationKind,
    pub payload: Value,
}

impl Message for RideUpdate {
    type Response = MobilityResult<Option<Notification>>;
}

#[async_trait]
impl Handler<RideUpdate> for NotificationCenter {
    async fn handle(&mut self, message: RideUpdate) -> MobilityResult<Option<Notification>> {
        let (title, body) = ride_message(message.kind, &message.payload);
        let ride_id = message
            .payload
            .get("rideId")
            .or_else(|| message.payload.get("id"))
            .cloned()
            .unwrap_or(Value::Null);
        let data = json!({
            "type": "ride",
            "event": message.kind,
            "rideId": ride_id,
            "action": "ride",
        });
        self.deliver(NotificationKind::Ride, title, body, data).await
    }
}

/// A promotion, maintenance or general notification.
#[derive(Debug, Clone)]
pub struct Announce {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub data: Option<Value>,
}

impl Message for Announce {
    type Response = MobilityResult<Option<Notification>>;
}

#[async_trait]
impl Handler<Announce> for NotificationCenter {
    async fn handle(&mut self, message: Announce) -> MobilityResult<Option<Notification>> {
        let action = match message.kind {
            NotificationKind::Ride => "ride",
            NotificationKind::Promotion => "promotions",
            NotificationKind::Maintenance => "maintenance",
            NotificationKind::General => "home",
        };
        let data = json!({
            "type": message.kind,
            "action": action,
            "details": message.data,
        });
        self.deliver(message.kind, message.title, message.body, data)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct ListNotifications;

impl Message for ListNotifications {
    type Response = MobilityResult<Vec<Notification>>;
}

#[async_trait]
impl Handler<ListNotifications> for NotificationCenter {
    async fn handle(&mut self, _: ListNotifications) -> MobilityResult<Vec<Notification>> {
        let mut notifications = self.notifications.read().await?;
        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(notifications)
    }
}

#[derive(Debug, Clone)]
pub struct UnreadCount;

impl Message for UnreadCount {
    type Response = MobilityResult<usize>;
}

#[async_trait]
impl Handler<UnreadCount> for NotificationCenter {
    async fn handle(&mut self, _: UnreadCount) -> MobilityResult<usize> {
        let notifications = self.notifications.read().await?;
        Ok(notifications.iter().filter(|n| !n.read).count())
    }
}

#[derive(Debug, Clone)]
pub struct MarkRead(pub Id<Notification>);

impl Message for MarkRead {
    type Response = MobilityResult<()>;
}

#[async_trait]
impl Handler<MarkRead> for NotificationCenter {
    async fn handle(&mut self, message: MarkRead) -> MobilityResult<()> {
        let id = message.0;
        self.notifications
            .update(|notifications| {
                let notification = notifications
                    .iter_mut()
                    .find(|n| n.id == id)
                    .ok_or(MobilityError::NotFound)?;
                notification.read = true;
                Ok(())
            })
            .await
    }
}

#[derive(Debug, Clone)]
pub struct MarkAllRead;

impl Message for MarkAllRead {
    type Response = MobilityResult<()>;
}

#[async_trait]
impl Handler<MarkAllRead> for NotificationCenter {
    async fn handle(&mut self, _: MarkAllRead) -> MobilityResult<()> {
        self.notifications
            .update(|notifications| {
                notifications.iter_mut().for_each(|n| n.read = true);
                Ok(())
            })
            .await
    }
}

#[derive(Debug, Clone)]
pub struct DeleteNotification(pub Id<Notification>);

impl Message for DeleteNotification {
    type Response = MobilityResult<()>;
}

#[async_trait]
impl Handler<DeleteNotification> for NotificationCenter {
    async fn handle(&mut self, message: DeleteNotification) -> MobilityResult<()> {
        let id = message.0;
        self.notifications
            .update(|notifications| {
                let before = notifications.len();
                notifications.retain(|n| n.id != id);
                if notifications.len() == before {
                    Err(MobilityError::NotFound)
                } else {
                    Ok(())
                }
            })
            .await
    }
}

#[derive(Debug, Clone)]
pub struct ClearNotifications;

impl Message for ClearNotifications {
    type Response = MobilityResult<()>;
}

#[async_trait]
impl Handler<ClearNotifications> for NotificationCenter {
    async fn handle(&mut self, _: ClearNotifications) -> MobilityResult<()> {
        self.notifications.clear().await
    }
}

#[derive(Debug, Clone)]
pub struct GetSettings;

impl Message for GetSettings {
    type Response = MobilityResult<NotificationSettings>;
}

#[async_trait]
impl Handler<GetSettings> for NotificationCenter {
    async fn handle(&mut self, _: GetSettings) -> MobilityResult<NotificationSettings> {
        self.settings.read().await
    }
}

#[derive(Debug, Clone)]
pub struct UpdateSettings(pub NotificationSettingsUpdate);

impl Message for UpdateSettings {
    type Response = MobilityResult<NotificationSettings>;
}

#[async_trait]
impl Handler<UpdateSettings> for NotificationCenter {
    async fn handle(&mut self, message: UpdateSettings) -> MobilityResult<NotificationSettings> {
        let update = message.0;
        self.settings
            .update(|settings| {
                settings.apply(&update);
                Ok(*settings)
            })
            .await
    }
}

/// Cloneable handle to a running [`NotificationCenter`].
#[derive(Clone)]
pub struct NotificationCenterRef {
    actor: ActorRef<NotificationCenter>,
}

impl NotificationCenterRef {
    pub fn spawn(store: Arc<dyn PersistenceStore>) -> Self {
        let actor = actors::run(move || NotificationCenter::new(store.clone()));
        Self { actor }
    }

    async fn ask<M>(&self, message: M) -> MobilityResult<M::Response>
    where
        M: Message,
        NotificationCenter: Handler<M>,
    {
        self.actor
            .ask(message)
            .await
            .map_err(MobilityError::unavailable)
    }

    pub async fn ride_update(
        &self,
        kind: RideNotificationKind,
        payload: Value,
    ) -> MobilityResult<Option<Notification>> {
        self.ask(RideUpdate { kind, payload }).await?
    }

    pub async fn announce(
        &self,
        kind: NotificationKind,
        title: String,
        body: String,
        data: Option<Value>,
    ) -> MobilityResult<Option<Notification>> {
        self.ask(Announce {
            kind,
            title,
            body,
            data,
        })
        .await?
    }

    /// Newest first.
    pub async fn list(&self) -> MobilityResult<Vec<Notification>> {
        self.ask(ListNotifications).await?
    }

    pub async fn unread_count(&self) -> MobilityResult<usize> {
        self.ask(UnreadCount).await?
    }

    pub async fn mark_read(&self, id: Id<Notification>) -> MobilityResult<()> {
        self.ask(MarkRead(id)).await?
    }

    pub async fn mark_all_read(&self) -> MobilityResult<()> {
        self.ask(MarkAllRead).await?
    }

    pub async fn delete(&self, id: Id<Notification>) -> MobilityResult<()> {
        self.ask(DeleteNotification(id)).await?
    }

    pub async fn clear(&self) -> MobilityResult<()> {
        self.ask(ClearNotifications).await?
    }

    pub async fn settings(&self) -> MobilityResult<NotificationSettings> {
        self.ask(GetSettings).await?
    }

    pub async fn update_settings(
        &self,
        update: NotificationSettingsUpdate,
    ) -> MobilityResult<NotificationSettings> {
        self.ask(UpdateSettings(update)).await?
    }
}

impl NotificationEmitter for NotificationCenterRef {
    fn emit(&self, kind: RideNotificationKind, payload: Value) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("no runtime to deliver {:?} notification", kind);
            return;
        };
        let actor = self.actor.clone();
        runtime.spawn(async move {
            if let Err(why) = actor.tell(RideUpdate { kind, payload }).await {
                log::warn!("notification center unavailable: {}", why);
            }
        });
    }
}
