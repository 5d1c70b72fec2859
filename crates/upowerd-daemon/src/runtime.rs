//! The single-threaded cooperative event loop: wires native sources, the
//! aggregator, history, and the bus surface together, and drives them
//! until shutdown.
//!
//! Registry mutation (everything that touches [`Aggregator`]) happens only
//! on this loop's task; native sources only ever produce [`SourceEvent`]s
//! onto a channel, never touch the registry directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use upowerd_backend::{Debouncer, NativeSource, RefreshSchedule, SourceEvent};
use upowerd_bus::{BusServer, ManagerObject};
use upowerd_config::Config;
use upowerd_device::{Device, DeviceKind};
use upowerd_history::HistoryStore;
use zbus::zvariant::OwnedObjectPath;

use crate::aggregator::{Aggregator, DISPLAY_DEVICE_PATH};
use crate::error::Error;
use crate::identity::peripheral_identity;

/// Upper bound on how long shutdown is allowed to take before stragglers
/// are dropped rather than waited on.
const SHUTDOWN_BUDGET: Duration = Duration::from_secs(2);

/// Per-source refresh budget; a source that doesn't answer within this
/// window reports its fields as unknown for this tick rather than
/// blocking the loop.
const REFRESH_BUDGET: Duration = Duration::from_secs(2);

/// How often the main loop re-evaluates refresh schedules and sweeps the
/// debounce quarantine.
const TICK_INTERVAL: Duration = Duration::from_secs(5);

/// How often history is flushed to disk.
const HISTORY_FLUSH_INTERVAL: Duration = Duration::from_secs(120);

/// How many times to retry acquiring the bus name before giving up.
const NAME_ACQUISITION_ATTEMPTS: u32 = 3;

/// Bounded so a burst of udev events can't grow memory unboundedly; per the
/// concurrency model, a full channel means the producing source's task
/// waits rather than events being dropped.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// What to do once startup completes and the loop would otherwise run
/// forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Run until `shutdown` fires.
    #[default]
    Normal,
    /// Exit immediately after the first coldplug enumeration completes.
    Immediate,
    /// Exit after `Duration` has elapsed since startup.
    Timed(Duration),
}

/// Per-device refresh bookkeeping, keyed by native path.
struct Tracked {
    kind: DeviceKind,
    schedule: RefreshSchedule,
    last_refreshed: Instant,
}

/// Owns every long-lived piece of daemon state and runs the event loop.
pub struct Daemon {
    aggregator: Aggregator,
    bus: BusServer,
    history: Arc<HistoryStore>,
    sources: Vec<Arc<dyn NativeSource>>,
    debouncer: Debouncer,
    tracked: HashMap<String, Tracked>,
    exit_policy: ExitPolicy,
    display_registered: bool,
}

impl Daemon {
    /// Connects to the bus, registers the manager object, and claims the
    /// well-known name, retrying acquisition up to
    /// [`NAME_ACQUISITION_ATTEMPTS`] times before giving up.
    ///
    /// # Errors
    /// Returns an error if the bus connection, object registration, or name
    /// acquisition fails after every retry.
    pub async fn init(
        config: Config,
        sources: Vec<Arc<dyn NativeSource>>,
        exit_policy: ExitPolicy,
        replace: bool,
    ) -> Result<Self, Error> {
        let history = Arc::new(HistoryStore::new(config.history_dir.clone()));
        let bus = BusServer::connect().await?;

        let display_path = OwnedObjectPath::try_from(DISPLAY_DEVICE_PATH.to_string())?;
        let manager = ManagerObject::new(display_path, config.critical_power_action);
        bus.register_manager(manager).await?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            match bus.request_name(replace).await {
                Ok(()) => break,
                Err(err) if attempts < NAME_ACQUISITION_ATTEMPTS => {
                    warn!(attempt = attempts, %err, "bus name acquisition failed, retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(err) => {
                    warn!(%err, "bus name acquisition exhausted retry budget");
                    return Err(Error::NameAcquisitionExhausted {
                        name: upowerd_bus::BUS_NAME.to_string(),
                        attempts,
                    });
                }
            }
        }

        Ok(Self {
            aggregator: Aggregator::new(config),
            bus,
            history,
            sources,
            debouncer: Debouncer::new(),
            tracked: HashMap::new(),
            exit_policy,
            display_registered: false,
        })
    }

    /// Enumerates every source once and publishes the resulting devices,
    /// establishing `OnBattery` before the run loop starts reacting to
    /// individual changes.
    pub async fn coldplug(&mut self) -> Result<(), Error> {
        let mut raw_snapshots = Vec::new();
        for source in &self.sources {
            match source.enumerate().await {
                Ok(snapshots) => raw_snapshots.extend(snapshots),
                Err(err) => warn!(%err, "source failed to enumerate, continuing without it"),
            }
        }

        let ac_online = raw_snapshots
            .iter()
            .any(|raw| matches!(raw.kind, DeviceKind::LinePower) && raw.online == Some(true));

        let now = monotonic_now();
        for raw in raw_snapshots {
            let device = Device::normalize(None, &raw, now, ac_online);
            self.note_refreshed(&device);
            self.publish_upsert(device).await?;
        }

        self.publish_on_battery().await?;
        self.publish_display_device().await?;
        Ok(())
    }

    /// Runs the event loop until `shutdown` fires or the configured exit
    /// policy ends it first.
    ///
    /// # Errors
    /// Propagates a bus I/O failure encountered while publishing a device
    /// update; source-level errors are absorbed and logged instead, per the
    /// daemon's error-handling semantics.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), Error> {
        let (tx, mut rx) = mpsc::channel::<SourceEvent>(EVENT_CHANNEL_CAPACITY);
        let source_cancel = CancellationToken::new();

        for source in &self.sources {
            let source = Arc::clone(source);
            let tx = tx.clone();
            let cancel = source_cancel.clone();
            tokio::spawn(async move {
                if let Err(err) = source.subscribe(tx, cancel).await {
                    warn!(%err, "source's change-event stream ended, relying on polling");
                }
            });
        }
        drop(tx);

        if matches!(self.exit_policy, ExitPolicy::Immediate) {
            info!("immediate exit after coldplug");
            self.shutdown().await;
            return Ok(());
        }

        let started_at = Instant::now();
        let mut tick = tokio::time::interval(TICK_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut history_flush = tokio::time::interval(HISTORY_FLUSH_INTERVAL);
        history_flush.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if let ExitPolicy::Timed(duration) = self.exit_policy {
                if started_at.elapsed() >= duration {
                    info!("timed exit elapsed, shutting down");
                    break;
                }
            }

            tokio::select! {
                biased;

                () = shutdown.cancelled() => {
                    info!("shutdown requested");
                    break;
                }

                Some(event) = rx.recv() => {
                    self.handle_event(event).await?;
                }

                _ = tick.tick() => {
                    self.handle_tick().await?;
                }

                _ = history_flush.tick() => {
                    if let Err(err) = self.history.flush().await {
                        warn!(%err, "history flush failed, in-memory ring continues");
                    }
                }
            }
        }

        source_cancel.cancel();
        self.shutdown().await;
        Ok(())
    }

    async fn handle_event(&mut self, event: SourceEvent) -> Result<(), Error> {
        match event {
            SourceEvent::Added(raw) => {
                let identity = peripheral_identity(&raw);
                if self.debouncer.resurrect(&identity, Instant::now()) {
                    info!(%identity, "peripheral reconnected within the debounce window");
                }
                self.upsert_from_raw(raw).await?;
            }
            SourceEvent::Changed(raw) => {
                self.upsert_from_raw(raw).await?;
            }
            SourceEvent::Removed { native_path } => {
                self.handle_removed(&native_path).await?;
            }
        }
        Ok(())
    }

    async fn upsert_from_raw(&mut self, raw: upowerd_device::RawSnapshot) -> Result<(), Error> {
        let now = monotonic_now();
        let path = upowerd_device::object_path_for(raw.kind, &raw.native_path);
        let prior = self.aggregator.registry().get(&path).cloned();
        let device = Device::normalize(prior.as_ref(), &raw, now, self.aggregator.on_battery());
        self.note_refreshed(&device);

        if prior.as_ref().map(|p| p.state) != Some(device.state) {
            if let Some(tracked) = self.tracked.get_mut(&device.native_path) {
                tracked.schedule.note_transition(Instant::now());
            }
        }

        self.publish_upsert(device).await?;
        self.publish_on_battery().await?;
        self.publish_display_device().await?;
        Ok(())
    }

    async fn handle_removed(&mut self, native_path: &str) -> Result<(), Error> {
        let Some(device) = self.aggregator.registry().iter().find(|d| d.native_path == native_path).cloned() else {
            return Ok(());
        };

        if device.power_supply {
            // System-scope sources don't get the peripheral debounce: a
            // battery or line-power adapter disappearing means it's gone.
            self.retire(&device).await?;
            self.publish_on_battery().await?;
            self.publish_display_device().await?;
            return Ok(());
        }

        let identity = format!("{}:{}", device.kind.slug(), native_path);
        self.debouncer.quarantine(identity, Instant::now());
        Ok(())
    }

    async fn handle_tick(&mut self) -> Result<(), Error> {
        let expired = self.debouncer.sweep_expired(Instant::now());
        for identity in expired {
            let device = self
                .aggregator
                .registry()
                .iter()
                .find(|d| format!("{}:{}", d.kind.slug(), d.native_path) == identity)
                .cloned();
            if let Some(device) = device {
                self.retire(&device).await?;
            }
        }

        let now = Instant::now();
        let due: Vec<String> = self
            .tracked
            .iter()
            .filter(|(_, tracked)| now.saturating_duration_since(tracked.last_refreshed) >= tracked.schedule.interval_for(tracked.kind, now))
            .map(|(native_path, _)| native_path.clone())
            .collect();

        for native_path in due {
            self.refresh_one(&native_path).await?;
        }

        self.publish_on_battery().await?;
        self.publish_display_device().await?;
        Ok(())
    }

    /// Tries each source in turn and uses whichever recognizes
    /// `native_path`. Adapters that don't own it simply fail fast with
    /// [`upowerd_backend::Error::Enumerate`], which is cheap enough that
    /// explicit source ownership tracking isn't worth the bookkeeping.
    async fn refresh_one(&mut self, native_path: &str) -> Result<(), Error> {
        for source in self.sources.clone() {
            match tokio::time::timeout(REFRESH_BUDGET, source.refresh(native_path)).await {
                Ok(Ok(raw)) => {
                    self.upsert_from_raw(raw).await?;
                    return Ok(());
                }
                Ok(Err(_)) => continue,
                Err(_) => {
                    warn!(native_path, "refresh exceeded its budget, keeping last known values");
                    return Ok(());
                }
            }
        }
        warn!(native_path, "no source recognized this native path on refresh");
        Ok(())
    }

    fn note_refreshed(&mut self, device: &Device) {
        let tracked = self.tracked.entry(device.native_path.clone()).or_insert_with(|| Tracked {
            kind: device.kind,
            schedule: RefreshSchedule::new(),
            last_refreshed: Instant::now(),
        });
        tracked.kind = device.kind;
        tracked.last_refreshed = Instant::now();
    }

    async fn retire(&mut self, device: &Device) -> Result<(), Error> {
        self.aggregator.remove(&device.object_path);
        self.tracked.remove(&device.native_path);
        self.history.forget(&device.object_path).await;
        self.bus.remove_device(&device.object_path).await?;
        Ok(())
    }

    async fn publish_upsert(&mut self, device: Device) -> Result<(), Error> {
        let is_new = self.aggregator.registry().get(&device.object_path).is_none();
        let device = self.aggregator.upsert(device);

        self.history
            .record_tick(
                &device.object_path,
                device.update_time,
                device.energy_rate,
                device.energy,
                device.time_to_full as f64,
                device.time_to_empty as f64,
                device.state,
            )
            .await;

        if is_new {
            self.bus.add_device(&device.object_path, device, self.history.clone()).await?;
        } else {
            self.bus.update_device(&device.object_path, device).await?;
        }
        Ok(())
    }

    async fn publish_on_battery(&self) -> Result<(), Error> {
        self.bus.set_on_battery(self.aggregator.on_battery()).await?;
        Ok(())
    }

    async fn publish_display_device(&mut self) -> Result<(), Error> {
        let display = self.aggregator.display_device();
        if self.display_registered {
            self.bus.update_device(DISPLAY_DEVICE_PATH, display).await?;
        } else {
            self.bus.register_display_device(DISPLAY_DEVICE_PATH, display, self.history.clone()).await?;
            self.display_registered = true;
        }
        Ok(())
    }

    /// Flushes history and tears down the bus connection. Bounded by
    /// [`SHUTDOWN_BUDGET`]: a straggling flush is abandoned rather than
    /// blocking process exit.
    async fn shutdown(&self) {
        match tokio::time::timeout(SHUTDOWN_BUDGET, self.history.flush_on_shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(%err, "history flush failed during shutdown"),
            Err(_) => warn!("history flush did not complete within the shutdown budget"),
        }
    }
}

fn monotonic_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
