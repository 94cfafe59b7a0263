// ── Poller ──
//
// Drives the session on a fixed interval and publishes the latest filtered
// device snapshot. Polls are serialized through the session mutex, so a
// manual `refresh()` never overlaps the background task.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use govee_cloud_api::DeviceCollection;

use crate::config::PollerConfig;
use crate::entity::{SensorEntity, sensor_entities};
use crate::error::CoreError;
use crate::filter::filter_supported;
use crate::sensor::DeviceReadings;
use crate::session::Session;

/// Supported devices from one successful poll.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub devices: DeviceCollection,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Derived values for every device, evaluated at `now`.
    pub fn readings(&self, now: DateTime<Utc>) -> Vec<DeviceReadings> {
        self.devices
            .values()
            .map(|record| DeviceReadings::from_record(record, now))
            .collect()
    }
}

/// Polling driver. Cheaply cloneable via `Arc<PollerInner>`.
#[derive(Clone)]
pub struct Poller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    config: PollerConfig,
    session: Mutex<Session>,
    snapshot: watch::Sender<Option<Arc<Snapshot>>>,
    /// Cancellation handle and join handle of the running background task.
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Poller {
    /// Build the HTTP client and session. Does NOT poll -- call
    /// [`start()`](Self::start) or [`refresh()`](Self::refresh).
    pub fn new(config: PollerConfig) -> Result<Self, CoreError> {
        let client = config.build_client()?;
        let session = Session::new(client, config.credentials.clone());
        let (snapshot, _) = watch::channel(None);

        Ok(Self {
            inner: Arc::new(PollerInner {
                config,
                session: Mutex::new(session),
                snapshot,
                task: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &PollerConfig {
        &self.inner.config
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Poll once: fetch, filter to supported models, publish.
    ///
    /// On failure the previous snapshot is kept.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        debug!("Updating data");
        let devices = self.inner.session.lock().await.fetch_devices().await?;
        let devices = filter_supported(devices, &self.inner.config.supported_models);

        let snapshot = Arc::new(Snapshot {
            devices,
            fetched_at: Utc::now(),
        });
        self.inner.snapshot.send_replace(Some(Arc::clone(&snapshot)));
        debug!(devices = snapshot.devices.len(), "snapshot published");
        Ok(snapshot)
    }

    /// Perform the first poll, then spawn the periodic refresh task.
    ///
    /// The first poll's error is returned and no task is spawned, so a
    /// host can refuse to set up with bad credentials. The task slot stays
    /// locked throughout, so concurrent calls leave exactly one task running.
    pub async fn start(&self) -> Result<Arc<Snapshot>, CoreError> {
        let mut task = self.inner.task.lock().await;
        shutdown(task.take()).await;

        let snapshot = self.refresh().await?;

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(refresh_task(self.clone(), interval, cancel.clone()));
            *task = Some((cancel, handle));
            info!(interval_secs = interval.as_secs(), "poller started");
        }

        Ok(snapshot)
    }

    /// Stop the background task, if running, and wait for it to finish.
    pub async fn stop(&self) {
        let mut task = self.inner.task.lock().await;
        shutdown(task.take()).await;
    }

    // ── Observation ──────────────────────────────────────────────

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.inner.snapshot.subscribe()
    }

    /// Sensor entities for every device in the latest snapshot.
    pub fn entities(&self) -> Result<Vec<SensorEntity>, CoreError> {
        let snapshot = self.snapshot().ok_or(CoreError::NotStarted)?;
        Ok(sensor_entities(
            &snapshot.devices,
            self.inner.config.credentials.email(),
        ))
    }
}

/// Cancel a background task and wait for it to exit.
async fn shutdown(task: Option<(CancellationToken, JoinHandle<()>)>) {
    if let Some((cancel, handle)) = task {
        cancel.cancel();
        if let Err(e) = handle.await {
            warn!(error = %e, "refresh task ended abnormally");
        }
        info!("poller stopped");
    }
}

/// Periodically refresh until cancelled. Failures are logged and the
/// previous snapshot stays published.
async fn refresh_task(poller: Poller, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = poller.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
