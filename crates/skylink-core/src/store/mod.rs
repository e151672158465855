// ── Device stores ──

mod device_store;

pub use device_store::{
    DeviceCategory, DeviceMonitor, DeviceStore, DroneStore, Drones, RemoteControlStore,
    RemoteControls,
};
