//! Sync Session - orchestrates push/pull synchronization for one family
//!
//! On activation: initial pull seeds the store, the fallback watchdog is
//! armed, topics are subscribed, and push events start flowing into the
//! store through the staleness comparison. Every accepted update re-arms
//! the watchdog (sliding window); if the window elapses silently, the timer
//! fires one pull and re-arms. Deactivation cancels the timer, releases the
//! subscriptions and discards the store.
//!
//! Sessions are single-use: switching the tracked resource tears the old
//! session down fully before a new one is created, so events from the old
//! identity can never leak into the new store.

use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::api::DataSource;
use crate::message::{EventClient, ResourceUpdateEvent};
use crate::sync::resource::{ResourceFamily, ResourceKey, ResourceValue};
use crate::sync::scheduler::FallbackScheduler;
use crate::sync::store::ResourceStore;
use crate::sync::subscription::SubscriptionManager;
use crate::{SyncConfig, SyncResult};
use shared::util::now_millis;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Live,
    TearingDown,
}

/// One tracked resource family's synchronization session
#[derive(Clone)]
pub struct SyncSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    family: ResourceFamily,
    config: SyncConfig,
    source: Arc<dyn DataSource>,
    client: EventClient,
    store: Arc<ResourceStore>,
    scheduler: Arc<FallbackScheduler>,
    subscriptions: SubscriptionManager,
    state: Mutex<SessionState>,
    /// Cancelled exactly once, at teardown. Late pull responses and pending
    /// timers check it before touching the store.
    liveness: CancellationToken,
    last_pull: Mutex<Option<Instant>>,
}

impl SyncSession {
    pub fn new(
        family: ResourceFamily,
        config: SyncConfig,
        source: Arc<dyn DataSource>,
        client: EventClient,
    ) -> Self {
        let subscriptions = SubscriptionManager::new(client.clone());
        Self {
            inner: Arc::new(SessionInner {
                family,
                config,
                source,
                client,
                store: Arc::new(ResourceStore::new()),
                scheduler: Arc::new(FallbackScheduler::new()),
                subscriptions,
                state: Mutex::new(SessionState::Idle),
                liveness: CancellationToken::new(),
                last_pull: Mutex::new(None),
            }),
        }
    }

    /// Activate the session: initial pull, subscriptions, watchdog, event loop.
    ///
    /// An initial pull failure still transitions to `Live` with an empty
    /// store and a recorded error - the view shows a banner instead of
    /// blocking, and the next fallback cycle retries.
    pub async fn activate(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            if *state != SessionState::Idle {
                tracing::warn!(family = %self.inner.family, "Activate ignored: session already used");
                return;
            }
            *state = SessionState::Loading;
        }
        tracing::info!(family = %self.inner.family, "Session activating");

        if let Err(e) = self.pull().await {
            tracing::warn!(family = %self.inner.family, "Initial pull failed: {}", e);
        }

        *self.inner.state.lock().unwrap() = SessionState::Live;

        self.inner
            .subscriptions
            .activate(&self.inner.family.topics())
            .await;
        self.arm_fallback();

        let session = self.clone();
        tokio::spawn(async move {
            session.run_event_loop().await;
        });
    }

    /// Tear the session down: cancel the timer, release subscriptions,
    /// discard the store.
    pub async fn deactivate(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            if matches!(*state, SessionState::Idle | SessionState::TearingDown) {
                return;
            }
            *state = SessionState::TearingDown;
        }
        tracing::info!(family = %self.inner.family, "Session tearing down");

        self.inner.liveness.cancel();
        self.inner.scheduler.cancel(&self.inner.family.timer_key());
        self.inner
            .subscriptions
            .deactivate(&self.inner.family.topics())
            .await;
        self.inner.store.clear();
        self.inner.store.set_last_error(None);

        *self.inner.state.lock().unwrap() = SessionState::Idle;
    }

    /// Manual refresh: immediate rate-limited pull, then restart the watchdog
    pub async fn refresh(&self) {
        if self.state() != SessionState::Live {
            return;
        }
        if let Err(e) = self.pull().await {
            tracing::warn!(family = %self.inner.family, "Manual refresh failed: {}", e);
        }
        if !self.inner.liveness.is_cancelled() {
            self.arm_fallback();
        }
    }

    pub fn store(&self) -> Arc<ResourceStore> {
        self.inner.store.clone()
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock().unwrap()
    }

    pub fn family(&self) -> ResourceFamily {
        self.inner.family
    }

    /// Topics currently held by this session
    pub fn active_topics(&self) -> Vec<String> {
        self.inner.subscriptions.active_topics()
    }

    // ========== Event handling ==========

    async fn run_event_loop(self) {
        let mut rx = self.inner.client.subscribe_events();
        loop {
            tokio::select! {
                _ = self.inner.liveness.cancelled() => break,
                result = rx.recv() => match result {
                    Ok(event) => self.handle_event(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // 丢失的事件由回退拉取补齐
                        tracing::warn!(
                            skipped,
                            family = %self.inner.family,
                            "Event receiver lagged; fallback pull will reconcile"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
        tracing::debug!(family = %self.inner.family, "Event loop stopped");
    }

    /// Apply one push event. Runs synchronously with respect to event
    /// delivery - no suspension between receiving and mutating.
    fn handle_event(&self, event: ResourceUpdateEvent) {
        let now = now_millis();
        let changed = match (self.inner.family, event) {
            (ResourceFamily::Devices, ResourceUpdateEvent::DeviceCreated(device)) => {
                // 新设备尚无读数
                self.inner
                    .store
                    .upsert(ResourceValue::from_device(&device, false, now))
            }
            (ResourceFamily::Devices, ResourceUpdateEvent::DeviceDeleted { id }) => {
                self.inner.store.remove(&ResourceKey::Device(id))
            }
            (
                ResourceFamily::DeviceSensors(device_id),
                ResourceUpdateEvent::SensorsBulkUpdate {
                    device_id: event_device_id,
                    readings,
                },
            ) if device_id == event_device_id => {
                let mut changed = false;
                for reading in &readings {
                    changed |= self
                        .inner
                        .store
                        .upsert(ResourceValue::from_reading(reading, now));
                }
                changed
            }
            (
                ResourceFamily::DeviceSensors(_),
                ResourceUpdateEvent::SensorUpdate {
                    device_sensor_id,
                    value,
                    time,
                },
            ) => {
                let key = ResourceKey::DeviceSensor(device_sensor_id);
                match self.inner.store.get(&key) {
                    Some(mut candidate) => {
                        candidate.value = serde_json::json!(value);
                        candidate.observed_at =
                            Some(time.map(|t| t.timestamp_millis()).unwrap_or(now));
                        self.inner.store.upsert(candidate)
                    }
                    None => {
                        // 未知传感器：等下一次拉取带来完整属性
                        tracing::debug!(key = %key, "Update for untracked sensor dropped");
                        false
                    }
                }
            }
            // Event belongs to another family; not ours
            _ => false,
        };

        if changed {
            // Sliding watchdog window: delay counts from the most recent
            // accepted update, not from session start
            self.arm_fallback();
        }
    }

    // ========== Pull side ==========

    fn arm_fallback(&self) {
        let session = self.clone();
        self.inner.scheduler.arm(
            &self.inner.family.timer_key(),
            self.inner.config.poll_delay,
            move || async move {
                session.fallback_fire().await;
            },
        );
    }

    async fn fallback_fire(&self) {
        if self.inner.liveness.is_cancelled() {
            return;
        }
        tracing::debug!(family = %self.inner.family, "Push channel silent; issuing fallback pull");
        if let Err(e) = self.pull().await {
            tracing::warn!(family = %self.inner.family, "Fallback pull failed: {}", e);
        }
        // Re-arm after success AND failure; the scheduler itself never
        // re-arms, and a silent stop here would starve the family forever
        if !self.inner.liveness.is_cancelled() {
            self.arm_fallback();
        }
    }

    async fn pull(&self) -> SyncResult<()> {
        // 同族拉取限速：mount、回退、手动刷新撞车时只发一次
        {
            let mut last_pull = self.inner.last_pull.lock().unwrap();
            if let Some(last) = *last_pull {
                if last.elapsed() < self.inner.config.min_fetch_interval {
                    tracing::debug!(family = %self.inner.family, "Pull skipped by rate limit");
                    return Ok(());
                }
            }
            *last_pull = Some(Instant::now());
        }

        let pulled_at = now_millis();
        let result = match self.inner.family {
            ResourceFamily::Devices => self.fetch_devices(pulled_at).await,
            ResourceFamily::DeviceSensors(device_id) => {
                self.fetch_readings(device_id, pulled_at).await
            }
        };

        let values = match result {
            Ok(values) => values,
            Err(e) => {
                // A failure landing after teardown stays invisible too
                if !self.inner.liveness.is_cancelled() {
                    self.inner.store.set_last_error(Some(e.to_string()));
                }
                return Err(e);
            }
        };

        // A response that lands after teardown must not revive the session's
        // data - check liveness before mutating the store
        if self.inner.liveness.is_cancelled() {
            tracing::debug!(family = %self.inner.family, "Discarding pull response after teardown");
            return Ok(());
        }

        self.inner
            .store
            .merge_family(self.inner.family, values, pulled_at);
        self.inner.store.set_last_error(None);
        tracing::debug!(
            family = %self.inner.family,
            entries = self.inner.store.len(),
            "Pull merged"
        );
        Ok(())
    }

    async fn fetch_devices(&self, obtained_at: i64) -> SyncResult<Vec<ResourceValue>> {
        let devices = self.inner.source.list_devices().await?;

        // 设备行附带活跃标记：有读数的排在前面
        let lookups = devices
            .iter()
            .map(|device| self.inner.source.list_sensors_for_device(device.id));
        let sensor_lists = futures::future::try_join_all(lookups).await?;

        Ok(devices
            .iter()
            .zip(sensor_lists)
            .map(|(device, sensors)| {
                ResourceValue::from_device(device, !sensors.is_empty(), obtained_at)
            })
            .collect())
    }

    async fn fetch_readings(
        &self,
        device_id: i64,
        obtained_at: i64,
    ) -> SyncResult<Vec<ResourceValue>> {
        let readings = self
            .inner
            .source
            .list_sensor_readings_for_device(device_id)
            .await?;
        Ok(readings
            .iter()
            .map(|reading| ResourceValue::from_reading(reading, obtained_at))
            .collect())
    }
}
