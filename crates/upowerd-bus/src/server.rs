//! Registration and lifecycle of the bus surface: connecting to the system
//! bus, claiming the well-known name, and keeping device objects' exported
//! properties in sync with the registry.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tracing::warn;
use upowerd_device::Device;
use upowerd_history::HistoryStore;
use zbus::Connection;
use zbus::zvariant::OwnedObjectPath;

use crate::device::DeviceObject;
use crate::error::Error;
use crate::manager::ManagerObject;

/// Well-known bus name this daemon claims.
pub const BUS_NAME: &str = "org.freedesktop.UPower";

/// Object path of the manager singleton.
pub const MANAGER_PATH: &str = "/org/freedesktop/UPower";

/// Object path of the synthetic aggregate device.
pub const DISPLAY_DEVICE_PATH: &str = "/org/freedesktop/UPower/devices/DisplayDevice";

/// How long to let rapid-fire property updates on one device settle before
/// emitting a single `PropertiesChanged` for it.
pub const COALESCE_WINDOW: Duration = Duration::from_millis(200);

/// Owns the system bus connection and the object tree rooted at
/// [`MANAGER_PATH`].
#[derive(Debug, Clone)]
pub struct BusServer {
    connection: Connection,
}

impl BusServer {
    /// Connects to the system bus without yet exporting anything.
    pub async fn connect() -> Result<Self, Error> {
        let connection = Connection::system().await.map_err(Error::Connect)?;
        Ok(Self { connection })
    }

    /// Exports the manager singleton at [`MANAGER_PATH`].
    pub async fn register_manager(&self, manager: ManagerObject) -> Result<(), Error> {
        self.connection
            .object_server()
            .at(MANAGER_PATH, manager)
            .await
            .map_err(|source| Error::Register {
                path: MANAGER_PATH.to_string(),
                source,
            })?;
        Ok(())
    }

    /// Claims [`BUS_NAME`]. Must happen after the manager object is
    /// registered, so clients never observe the name without an object
    /// tree behind it.
    ///
    /// When `replace` is set, an already-running owner is asked to give up
    /// the name rather than causing this call to fail.
    pub async fn request_name(&self, replace: bool) -> Result<(), Error> {
        let result = if replace {
            self.connection
                .request_name_with_flags(BUS_NAME, zbus::fdo::RequestNameFlags::ReplaceExisting.into())
                .await
                .map(|_| ())
        } else {
            self.connection.request_name(BUS_NAME).await
        };

        result.map_err(|source| Error::RequestName {
            name: BUS_NAME.to_string(),
            source,
        })
    }

    /// Exports a device object at `path`, records it in the manager's
    /// registry, emits `DeviceAdded`, and starts the coalescing task that
    /// mirrors future [`Device`] updates onto the bus.
    pub async fn add_device(
        &self,
        path: &str,
        device: Device,
        history: Arc<HistoryStore>,
    ) -> Result<(), Error> {
        self.export_device(path, device, history).await?;
        self.push_registry_path(path).await?;
        self.emit_device_added(path).await?;
        Ok(())
    }

    /// Exports the synthetic display device at `path`. Unlike
    /// [`Self::add_device`], this never touches the manager's registry
    /// listing or emits `DeviceAdded`: the display device is
    /// registry-independent and doesn't appear in `EnumerateDevices`.
    pub async fn register_display_device(
        &self,
        path: &str,
        device: Device,
        history: Arc<HistoryStore>,
    ) -> Result<(), Error> {
        self.export_device(path, device, history).await
    }

    async fn export_device(&self, path: &str, device: Device, history: Arc<HistoryStore>) -> Result<(), Error> {
        let object = DeviceObject::new(device, history);
        let updates = object.device.watch();

        self.connection
            .object_server()
            .at(path, object)
            .await
            .map_err(|source| Error::Register {
                path: path.to_string(),
                source,
            })?;

        self.spawn_coalescer(path.to_string(), updates);
        Ok(())
    }

    /// Unexports the device at `path`, drops it from the registry, and
    /// emits `DeviceRemoved`.
    pub async fn remove_device(&self, path: &str) -> Result<(), Error> {
        self.connection
            .object_server()
            .remove::<DeviceObject, _>(path)
            .await
            .map_err(|source| Error::Unregister {
                path: path.to_string(),
                source,
            })?;

        self.drop_registry_path(path).await?;
        self.emit_device_removed(path).await?;

        Ok(())
    }

    /// Pushes a new [`Device`] snapshot onto an already-registered object.
    /// The coalescing task spawned by [`Self::add_device`] picks this up
    /// through the same [`Property`] watch and emits `PropertiesChanged`
    /// once it settles.
    pub async fn update_device(&self, path: &str, device: Device) -> Result<(), Error> {
        let iface_ref = self
            .connection
            .object_server()
            .interface::<_, DeviceObject>(path)
            .await
            .map_err(Error::Signal)?;
        iface_ref.get().await.device.set(device);
        Ok(())
    }

    /// Updates the manager's `OnBattery` property and emits the matching
    /// `PropertiesChanged` signal.
    pub async fn set_on_battery(&self, on_battery: bool) -> Result<(), Error> {
        let iface_ref = self
            .connection
            .object_server()
            .interface::<_, ManagerObject>(MANAGER_PATH)
            .await
            .map_err(Error::Signal)?;

        let emitter = iface_ref.signal_emitter();
        let manager = iface_ref.get().await;
        manager.on_battery.set(on_battery);
        manager
            .on_battery_changed(emitter)
            .await
            .map_err(Error::Signal)
    }

    async fn push_registry_path(&self, path: &str) -> Result<(), Error> {
        let iface_ref = self
            .connection
            .object_server()
            .interface::<_, ManagerObject>(MANAGER_PATH)
            .await
            .map_err(Error::Signal)?;
        let manager = iface_ref.get().await;
        let mut paths = manager.device_paths.get();
        if !paths.iter().any(|existing| existing == path) {
            paths.push(path.to_string());
        }
        manager.device_paths.set(paths);
        Ok(())
    }

    async fn drop_registry_path(&self, path: &str) -> Result<(), Error> {
        let iface_ref = self
            .connection
            .object_server()
            .interface::<_, ManagerObject>(MANAGER_PATH)
            .await
            .map_err(Error::Signal)?;
        let manager = iface_ref.get().await;
        let mut paths = manager.device_paths.get();
        paths.retain(|existing| existing != path);
        manager.device_paths.set(paths);
        Ok(())
    }

    async fn emit_device_added(&self, path: &str) -> Result<(), Error> {
        let Ok(object_path) = OwnedObjectPath::try_from(path.to_string()) else {
            warn!(path, "not a valid object path, skipping DeviceAdded");
            return Ok(());
        };

        let iface_ref = self
            .connection
            .object_server()
            .interface::<_, ManagerObject>(MANAGER_PATH)
            .await
            .map_err(Error::Signal)?;
        ManagerObject::device_added(iface_ref.signal_emitter(), object_path)
            .await
            .map_err(Error::Signal)
    }

    async fn emit_device_removed(&self, path: &str) -> Result<(), Error> {
        let Ok(object_path) = OwnedObjectPath::try_from(path.to_string()) else {
            warn!(path, "not a valid object path, skipping DeviceRemoved");
            return Ok(());
        };

        let iface_ref = self
            .connection
            .object_server()
            .interface::<_, ManagerObject>(MANAGER_PATH)
            .await
            .map_err(Error::Signal)?;
        ManagerObject::device_removed(iface_ref.signal_emitter(), object_path)
            .await
            .map_err(Error::Signal)
    }

    /// `updates` yields the current device value immediately on
    /// subscription; that first yield is discarded since there's nothing
    /// to notify about yet. Because the underlying channel only keeps the
    /// latest value, changes that land during [`COALESCE_WINDOW`] collapse
    /// into the single `PropertiesChanged` emitted once it elapses.
    fn spawn_coalescer(&self, path: String, mut updates: impl Stream<Item = Device> + Send + Unpin + 'static) {
        let connection = self.connection.clone();
        tokio::spawn(async move {
            updates.next().await;

            while updates.next().await.is_some() {
                tokio::time::sleep(COALESCE_WINDOW).await;
                if let Err(err) = notify_device_changed(&connection, &path).await {
                    warn!(%path, %err, "failed to emit device property change");
                }
            }
        });
    }
}

async fn notify_device_changed(connection: &Connection, path: &str) -> Result<(), Error> {
    let iface_ref = connection
        .object_server()
        .interface::<_, DeviceObject>(path)
        .await
        .map_err(Error::Signal)?;

    let emitter = iface_ref.signal_emitter();
    let device = iface_ref.get().await;

    device.update_time_changed(emitter).await.map_err(Error::Signal)?;
    device.online_changed(emitter).await.map_err(Error::Signal)?;
    device.energy_changed(emitter).await.map_err(Error::Signal)?;
    device.energy_rate_changed(emitter).await.map_err(Error::Signal)?;
    device.voltage_changed(emitter).await.map_err(Error::Signal)?;
    device.temperature_changed(emitter).await.map_err(Error::Signal)?;
    device.time_to_empty_changed(emitter).await.map_err(Error::Signal)?;
    device.time_to_full_changed(emitter).await.map_err(Error::Signal)?;
    device.percentage_changed(emitter).await.map_err(Error::Signal)?;
    device.is_present_changed(emitter).await.map_err(Error::Signal)?;
    device.state_changed(emitter).await.map_err(Error::Signal)?;
    device.warning_level_changed(emitter).await.map_err(Error::Signal)?;
    device.icon_name_changed(emitter).await.map_err(Error::Signal)?;

    Ok(())
}
