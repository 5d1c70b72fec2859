//! The `org.freedesktop.UPower` bus surface: the manager singleton, one
//! `Device` object per registry entry, and the wire-format mapping between
//! them and the internal, already-normalized device model.

mod device;
mod error;
mod manager;
mod server;
mod wire;

pub use device::DeviceObject;
pub use error::Error;
pub use manager::ManagerObject;
pub use server::{BusServer, BUS_NAME, COALESCE_WINDOW, DISPLAY_DEVICE_PATH, MANAGER_PATH};
