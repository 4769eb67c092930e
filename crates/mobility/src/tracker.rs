//! The ride tracker: an actor owning the device's single in-progress ride.
//!
//! The tracker drives a [`RideSession`] from two pumps, a tick timer and a
//! location subscription. Both run as tasks that message the actor, so the
//! session itself is only ever touched from the actor's handlers. Every pump
//! message carries the epoch it was started in. Pausing or ending stops the
//! pumps before it returns and bumps the epoch, so anything still queued is
//! ignored and no event follows a pause or an end.
//!
//! Ticks that fell due but were not handled yet are credited when pausing or
//! ending, and the unfinished part of the current tick carries over to the
//! next resume. Billed seconds always equal the whole seconds spent active.
//!
//! A location subscription that closes mid-ride is retried on every tick
//! until the feed accepts it again.

use std::{any::Any, sync::Arc, time::Duration};

use actors::{
    actor::{Actor, SupervisionStrategy},
    actor_ref::{ActorRef, WeakActorRef},
    handler::{Handler, Message},
};
use async_trait::async_trait;
use chrono::Utc;
use model::{
    geofence::GeofenceStatus,
    location::LocationSample,
    notification::RideNotificationKind,
    ride::{RideAction, RideRecord, RideStatus},
    scooter::Scooter,
};
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use utility::id::Id;

use crate::{
    config::TrackerConfig,
    geofence,
    location::{LocationError, LocationFeed, Permission},
    notifier::NotificationEmitter,
    services::history::RideHistory,
    session::{InvalidTransition, RideSession, RideSnapshot},
    store::{keys, PersistenceStore, PersistenceStoreExt},
    MobilityError, MobilityResult,
};

/// What subscribers of a tracker observe. Every payload is a copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum RideEvent {
    Started(RideSnapshot),
    Tick(RideSnapshot),
    #[serde(rename_all = "camelCase")]
    Location {
        snapshot: RideSnapshot,
        zones: Vec<String>,
        geofence: GeofenceStatus,
    },
    Paused(RideSnapshot),
    Resumed(RideSnapshot),
    LowBattery(RideSnapshot),
    Ended(RideRecord),
}

impl RideEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started(_) => "started",
            Self::Tick(_) => "tick",
            Self::Location { .. } => "location",
            Self::Paused(_) => "paused",
            Self::Resumed(_) => "resumed",
            Self::LowBattery(_) => "lowBattery",
            Self::Ended(_) => "ended",
        }
    }
}

pub struct RideTracker {
    config: TrackerConfig,
    feed: Arc<dyn LocationFeed>,
    store: Arc<dyn PersistenceStore>,
    history: RideHistory,
    notifier: Arc<dyn NotificationEmitter>,
    events: broadcast::Sender<RideEvent>,
    session: Option<RideSession>,
    me: Option<WeakActorRef<RideTracker>>,
    epoch: u64,
    /// deadline of the next tick while active
    next_tick_at: Option<Instant>,
    /// time left until the next tick while paused
    tick_carry: Duration,
    ticks_since_save: u64,
    tick_pump: Option<JoinHandle<()>>,
    location_pump: Option<JoinHandle<()>>,
}

impl Actor for RideTracker {
    fn started(&mut self, me: ActorRef<Self>) {
        self.me = Some(me.downgrade());
    }

    fn on_fail(&mut self, _error: Box<dyn Any + Send>) -> SupervisionStrategy {
        // keep the ride, a restart would lose it
        SupervisionStrategy::Resume
    }
}

impl Drop for RideTracker {
    fn drop(&mut self) {
        self.abort_pumps();
    }
}

impl RideTracker {
    fn new(
        config: TrackerConfig,
        feed: Arc<dyn LocationFeed>,
        store: Arc<dyn PersistenceStore>,
        history: RideHistory,
        notifier: Arc<dyn NotificationEmitter>,
        events: broadcast::Sender<RideEvent>,
    ) -> Self {
        let tick_carry = config.tick_interval;
        Self {
            config,
            feed,
            store,
            history,
            notifier,
            events,
            session: None,
            me: None,
            epoch: 0,
            next_tick_at: None,
            tick_carry,
            ticks_since_save: 0,
            tick_pump: None,
            location_pump: None,
        }
    }

    fn status(&self) -> RideStatus {
        self.session
            .as_ref()
            .map(RideSession::status)
            .unwrap_or(RideStatus::Idle)
    }

    fn publish(&self, event: RideEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn notify<T: Serialize>(&self, kind: RideNotificationKind, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(payload) => self.notifier.emit(kind, payload),
            Err(why) => log::error!("can not serialize {:?} notification: {}", kind, why),
        }
    }

    async fn persist(&mut self) {
        self.ticks_since_save = 0;
        let Some(session) = &self.session else {
            return;
        };
        if let Err(why) = self.store.save(keys::ACTIVE_RIDE, session).await {
            log::error!("failed to save ride {}: {}", session.ride_id(), why);
        }
    }

    /// Starts both pumps. The first tick fires after `first_tick`.
    async fn start_pumps(
        &mut self,
        samples: Option<mpsc::Receiver<LocationSample>>,
        first_tick: Duration,
    ) {
        self.stop_pumps().await;
        let Some(me) = self.me.clone() else {
            log::error!("ride tracker has no self reference, can not start timers");
            return;
        };
        let period = self.config.tick_interval;
        let first = Instant::now() + first_tick;
        self.next_tick_at = Some(first);
        self.tick_pump = Some(tokio::spawn(tick_pump(me, self.epoch, first, period)));
        if let Some(samples) = samples {
            self.spawn_location_pump(samples);
        }
    }

    fn spawn_location_pump(&mut self, samples: mpsc::Receiver<LocationSample>) {
        let Some(me) = self.me.clone() else {
            log::error!("ride tracker has no self reference, can not follow the feed");
            return;
        };
        self.location_pump = Some(tokio::spawn(location_pump(me, self.epoch, samples)));
    }

    /// Cancels both pumps and invalidates their queued messages. Returns once
    /// both tasks are gone, so the feed subscription is closed by then.
    async fn stop_pumps(&mut self) {
        self.epoch += 1;
        for pump in [self.tick_pump.take(), self.location_pump.take()]
            .into_iter()
            .flatten()
        {
            pump.abort();
            if let Err(why) = pump.await {
                if !why.is_cancelled() {
                    log::error!("ride tracker pump failed: {}", why);
                }
            }
        }
    }

    fn abort_pumps(&mut self) {
        self.epoch += 1;
        if let Some(pump) = self.tick_pump.take() {
            pump.abort();
        }
        if let Some(pump) = self.location_pump.take() {
            pump.abort();
        }
    }

    /// Credits every tick due by `now` and returns the time left until the
    /// next one.
    fn settle_ticks(&mut self, now: Instant) -> Duration {
        let period = self.config.tick_interval;
        let (Some(mut next), Some(session)) = (self.next_tick_at.take(), self.session.as_mut())
        else {
            return period;
        };
        while next <= now && !period.is_zero() && session.tick() {
            next += period;
        }
        next.saturating_duration_since(now).min(period)
    }

    /// Subscribes again after the feed closed on an active ride.
    async fn resubscribe(&mut self) {
        if self.location_pump.is_some() || self.status() != RideStatus::Active {
            return;
        }
        match self.feed.subscribe().await {
            Ok(samples) => {
                log::info!("location updates are back");
                self.spawn_location_pump(samples);
            }
            Err(why) => log::debug!("still no location updates: {}", why),
        }
    }

    /// Subscribes to the feed. Only a denied permission is fatal, without a
    /// subscription the ride still accrues time.
    async fn subscribe_feed(&self) -> MobilityResult<Option<mpsc::Receiver<LocationSample>>> {
        match self.feed.subscribe().await {
            Ok(samples) => Ok(Some(samples)),
            Err(LocationError::PermissionDenied) => Err(MobilityError::PermissionDenied),
            Err(LocationError::Unavailable(why)) => {
                log::warn!("location updates unavailable, retrying while riding: {}", why);
                Ok(None)
            }
        }
    }

    fn check_low_battery(&mut self) {
        let threshold = self.config.low_battery_threshold;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.take_low_battery(threshold) {
            let snapshot = session.snapshot();
            log::info!(
                "battery of scooter {} low: {:?}%",
                snapshot.scooter_id,
                snapshot.battery_remaining_percent
            );
            self.notify(RideNotificationKind::LowBattery, &snapshot);
            self.publish(RideEvent::LowBattery(snapshot));
        }
    }
}

async fn tick_pump(me: WeakActorRef<RideTracker>, epoch: u64, first: Instant, period: Duration) {
    let mut interval = time::interval_at(first, period);
    // every missed tick is still a second of riding
    interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
    loop {
        let at = interval.tick().await;
        let Some(tracker) = me.upgrade() else {
            break;
        };
        if tracker.tell(Tick { epoch, at }).await.is_err() {
            break;
        }
    }
}

async fn location_pump(
    me: WeakActorRef<RideTracker>,
    epoch: u64,
    mut samples: mpsc::Receiver<LocationSample>,
) {
    while let Some(sample) = samples.recv().await {
        let Some(tracker) = me.upgrade() else {
            return;
        };
        if tracker.tell(Sample { epoch, sample }).await.is_err() {
            return;
        }
    }
    if let Some(tracker) = me.upgrade() {
        // the actor is gone if this fails, nothing left to tell
        let _ = tracker.tell(FeedClosed { epoch }).await;
    }
}

#[derive(Debug, Clone)]
pub struct StartRide {
    pub scooter_id: Id<Scooter>,
    pub battery_level: Option<f64>,
}

impl Message for StartRide {
    type Response = MobilityResult<RideSnapshot>;
}

#[async_trait]
impl Handler<StartRide> for RideTracker {
    async fn handle(&mut self, message: StartRide) -> MobilityResult<RideSnapshot> {
        let status = self.status();
        if status.in_progress() {
            return Err(InvalidTransition::new(status, RideAction::Start).into());
        }
        if self.feed.request_permission().await == Permission::Denied {
            return Err(MobilityError::PermissionDenied);
        }
        let origin = match self.feed.current_position().await {
            Ok(sample) if geofence::validate_coordinate(sample.latitude, sample.longitude).is_ok() => {
                Some(sample)
            }
            Ok(sample) => {
                log::warn!(
                    "ignoring invalid start position ({}, {})",
                    sample.latitude,
                    sample.longitude
                );
                None
            }
            Err(LocationError::PermissionDenied) => return Err(MobilityError::PermissionDenied),
            Err(LocationError::Unavailable(why)) => {
                log::warn!("starting ride without a position fix: {}", why);
                None
            }
        };
        let samples = self.subscribe_feed().await?;

        let mut session = RideSession::new(
            Id::generate(),
            message.scooter_id,
            self.config.pricing,
        );
        if let Some(battery_level) = message.battery_level {
            session = session.with_battery_level(battery_level);
        }
        session.start(origin, Utc::now())?;
        log::info!(
            "ride {} started on scooter {}",
            session.ride_id(),
            session.scooter_id()
        );
        let snapshot = session.snapshot();
        self.session = Some(session);
        self.start_pumps(samples, self.config.tick_interval).await;
        self.persist().await;

        self.notify(RideNotificationKind::Started, &snapshot);
        self.publish(RideEvent::Started(snapshot.clone()));
        self.check_low_battery();
        Ok(snapshot)
    }
}

#[derive(Debug, Clone)]
pub struct PauseRide;

impl Message for PauseRide {
    type Response = MobilityResult<RideSnapshot>;
}

#[async_trait]
impl Handler<PauseRide> for RideTracker {
    async fn handle(&mut self, _: PauseRide) -> MobilityResult<RideSnapshot> {
        let status = self.status();
        if status != RideStatus::Active {
            return Err(InvalidTransition::new(status, RideAction::Pause).into());
        }
        self.tick_carry = self.settle_ticks(Instant::now());
        self.stop_pumps().await;
        let Some(session) = self.session.as_mut() else {
            return Err(InvalidTransition::new(RideStatus::Idle, RideAction::Pause).into());
        };
        session.pause()?;
        let snapshot = session.snapshot();
        self.persist().await;

        log::info!("ride {} paused", snapshot.ride_id);
        self.notify(RideNotificationKind::Paused, &snapshot);
        self.publish(RideEvent::Paused(snapshot.clone()));
        Ok(snapshot)
    }
}

#[derive(Debug, Clone)]
pub struct ResumeRide;

impl Message for ResumeRide {
    type Response = MobilityResult<RideSnapshot>;
}

#[async_trait]
impl Handler<ResumeRide> for RideTracker {
    async fn handle(&mut self, _: ResumeRide) -> MobilityResult<RideSnapshot> {
        let status = self.status();
        if status != RideStatus::Paused {
            return Err(InvalidTransition::new(status, RideAction::Resume).into());
        }
        let samples = self.subscribe_feed().await?;
        let Some(session) = self.session.as_mut() else {
            return Err(InvalidTransition::new(RideStatus::Idle, RideAction::Resume).into());
        };
        session.resume()?;
        let snapshot = session.snapshot();
        self.start_pumps(samples, self.tick_carry).await;
        self.persist().await;

        log::info!("ride {} resumed", snapshot.ride_id);
        self.notify(RideNotificationKind::Resumed, &snapshot);
        self.publish(RideEvent::Resumed(snapshot.clone()));
        Ok(snapshot)
    }
}

#[derive(Debug, Clone)]
pub struct EndRide;

impl Message for EndRide {
    type Response = MobilityResult<RideRecord>;
}

#[async_trait]
impl Handler<EndRide> for RideTracker {
    async fn handle(&mut self, _: EndRide) -> MobilityResult<RideRecord> {
        let status = self.status();
        if !status.in_progress() {
            return Err(InvalidTransition::new(status, RideAction::End).into());
        }
        if status == RideStatus::Active {
            self.settle_ticks(Instant::now());
        }
        self.stop_pumps().await;
        self.tick_carry = self.config.tick_interval;
        let Some(session) = self.session.as_mut() else {
            return Err(InvalidTransition::new(RideStatus::Idle, RideAction::End).into());
        };
        let record = session.end(Utc::now())?;
        self.session = None;

        log::info!(
            "ride {} ended after {}s, {:.0}m, cost {:.2}",
            record.id,
            record.duration.num_seconds(),
            record.distance_meters,
            record.cost
        );
        if let Err(why) = self.store.remove(keys::ACTIVE_RIDE).await {
            log::error!("failed to clear active ride {}: {}", record.id, why);
        }
        if let Err(why) = self.history.append(record.clone()).await {
            log::error!("failed to store ride {} in history: {}", record.id, why);
        }
        self.notify(RideNotificationKind::Ended, &record);
        self.publish(RideEvent::Ended(record.clone()));
        Ok(record)
    }
}

#[derive(Debug, Clone)]
pub struct CurrentRide;

impl Message for CurrentRide {
    type Response = Option<RideSnapshot>;
}

#[async_trait]
impl Handler<CurrentRide> for RideTracker {
    async fn handle(&mut self, _: CurrentRide) -> Option<RideSnapshot> {
        self.session.as_ref().map(RideSession::snapshot)
    }
}

#[derive(Debug, Clone)]
pub struct Restore;

impl Message for Restore {
    type Response = MobilityResult<Option<RideSnapshot>>;
}

#[async_trait]
impl Handler<Restore> for RideTracker {
    async fn handle(&mut self, _: Restore) -> MobilityResult<Option<RideSnapshot>> {
        if let Some(session) = &self.session {
            return Ok(Some(session.snapshot()));
        }
        let stored: Option<RideSession> = self.store.load(keys::ACTIVE_RIDE).await?;
        match stored {
            Some(session) if session.status().in_progress() => {
                let session = session.into_restored();
                log::info!(
                    "restored ride {} ({}s, {:.0}m) as paused",
                    session.ride_id(),
                    session.elapsed_seconds(),
                    session.distance_meters()
                );
                let snapshot = session.snapshot();
                self.session = Some(session);
                self.tick_carry = self.config.tick_interval;
                self.persist().await;
                Ok(Some(snapshot))
            }
            Some(_) => {
                log::warn!("discarding stored ride that is not in progress");
                self.store.remove(keys::ACTIVE_RIDE).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone)]
struct Tick {
    epoch: u64,
    /// when the tick fell due
    at: Instant,
}

impl Message for Tick {
    type Response = ();
}

#[async_trait]
impl Handler<Tick> for RideTracker {
    async fn handle(&mut self, message: Tick) {
        if message.epoch != self.epoch {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.tick() {
            return;
        }
        self.next_tick_at = Some(message.at + self.config.tick_interval);
        let snapshot = session.snapshot();
        self.publish(RideEvent::Tick(snapshot));

        self.ticks_since_save += 1;
        let every = self.config.persist_every_ticks;
        if every > 0 && self.ticks_since_save >= every {
            self.persist().await;
        }
        self.resubscribe().await;
    }
}

#[derive(Debug, Clone)]
struct FeedClosed {
    epoch: u64,
}

impl Message for FeedClosed {
    type Response = ();
}

#[async_trait]
impl Handler<FeedClosed> for RideTracker {
    async fn handle(&mut self, message: FeedClosed) {
        if message.epoch != self.epoch {
            return;
        }
        log::warn!("location feed closed, retrying on the next tick");
        self.location_pump = None;
    }
}

#[derive(Debug, Clone)]
struct Sample {
    epoch: u64,
    sample: LocationSample,
}

impl Message for Sample {
    type Response = ();
}

#[async_trait]
impl Handler<Sample> for RideTracker {
    async fn handle(&mut self, message: Sample) {
        if message.epoch != self.epoch {
            return;
        }
        let Sample { sample, .. } = message;
        if let Err(why) = geofence::validate_coordinate(sample.latitude, sample.longitude) {
            log::warn!("dropping location sample: {}", why);
            return;
        }
        let (latitude, longitude) = (sample.latitude, sample.longitude);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.ingest(sample).is_none() {
            return;
        }
        let snapshot = session.snapshot();

        let zones = &self.config.zones;
        let (names, status) = match (
            geofence::zones_containing(latitude, longitude, zones),
            geofence::evaluate(latitude, longitude, zones),
        ) {
            (Ok(names), Ok(status)) => (
                names.into_iter().map(str::to_owned).collect(),
                status,
            ),
            (Err(why), _) | (_, Err(why)) => {
                log::error!("geofence evaluation failed: {}", why);
                (Vec::new(), GeofenceStatus::default())
            }
        };
        if status.in_no_ride_zone {
            log::warn!(
                "ride {} entered a no-ride zone at ({}, {})",
                snapshot.ride_id,
                latitude,
                longitude
            );
        }
        self.publish(RideEvent::Location {
            snapshot,
            zones: names,
            geofence: status,
        });
        self.check_low_battery();
    }
}

/// Cloneable handle to a running [`RideTracker`].
#[derive(Clone)]
pub struct Tracker {
    actor: ActorRef<RideTracker>,
    events: broadcast::Sender<RideEvent>,
}

impl Tracker {
    pub fn spawn(
        config: TrackerConfig,
        feed: Arc<dyn LocationFeed>,
        store: Arc<dyn PersistenceStore>,
        history: RideHistory,
        notifier: Arc<dyn NotificationEmitter>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        let tracker_events = events.clone();
        let actor = actors::run(move || {
            RideTracker::new(
                config.clone(),
                feed.clone(),
                store.clone(),
                history.clone(),
                notifier.clone(),
                tracker_events.clone(),
            )
        });
        Self { actor, events }
    }

    /// Events published from now on. A receiver that falls behind by more
    /// than the configured buffer skips the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<RideEvent> {
        self.events.subscribe()
    }

    pub async fn start(
        &self,
        scooter_id: Id<Scooter>,
        battery_level: Option<f64>,
    ) -> MobilityResult<RideSnapshot> {
        self.actor
            .ask(StartRide {
                scooter_id,
                battery_level,
            })
            .await
            .map_err(MobilityError::unavailable)?
    }

    pub async fn pause(&self) -> MobilityResult<RideSnapshot> {
        self.actor
            .ask(PauseRide)
            .await
            .map_err(MobilityError::unavailable)?
    }

    pub async fn resume(&self) -> MobilityResult<RideSnapshot> {
        self.actor
            .ask(ResumeRide)
            .await
            .map_err(MobilityError::unavailable)?
    }

    pub async fn end(&self) -> MobilityResult<RideRecord> {
        self.actor
            .ask(EndRide)
            .await
            .map_err(MobilityError::unavailable)?
    }

    pub async fn current(&self) -> MobilityResult<Option<RideSnapshot>> {
        self.actor
            .ask(CurrentRide)
            .await
            .map_err(MobilityError::unavailable)
    }

    /// Picks up a ride saved before the last shutdown. It comes back paused.
    pub async fn restore(&self) -> MobilityResult<Option<RideSnapshot>> {
        self.actor
            .ask(Restore)
            .await
            .map_err(MobilityError::unavailable)?
    }
}
