// ── Device store ──
//
// Concurrent per-category device storage with monitor callbacks and a
// `watch` version counter. Devices report their own state changes back
// to the store through a weak listener installed on `add`.

use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::CoreError;
use crate::model::{DeviceCore, DeviceKind, DeviceUid};

/// Category marker for a [`DeviceStore`].
pub trait DeviceCategory: Send + Sync + 'static {
    const KIND: DeviceKind;
}

/// Marker for the drone store.
#[derive(Debug)]
pub enum Drones {}

/// Marker for the remote-control store.
#[derive(Debug)]
pub enum RemoteControls {}

impl DeviceCategory for Drones {
    const KIND: DeviceKind = DeviceKind::Drone;
}

impl DeviceCategory for RemoteControls {
    const KIND: DeviceKind = DeviceKind::RemoteControl;
}

pub type DroneStore = DeviceStore<Drones>;
pub type RemoteControlStore = DeviceStore<RemoteControls>;

/// Observer of a device store.
///
/// Callbacks run on the thread that mutated the store, with no store lock
/// held. Monitors may (de)register themselves from within a callback.
pub trait DeviceMonitor: Send + Sync {
    /// A tracked device changed.
    fn on_device_changed(&self, _device: &DeviceCore) {}

    /// A device was added or removed, or a tracked device changed.
    fn on_change(&self);
}

type Monitors = Vec<Arc<dyn DeviceMonitor>>;

/// Devices of one category, keyed by uid.
pub struct DeviceStore<C: DeviceCategory> {
    devices: DashMap<DeviceUid, Arc<DeviceCore>>,
    monitors: ArcSwap<Monitors>,
    /// Bumped on every add, remove and device change.
    version: watch::Sender<u64>,
    _category: PhantomData<fn() -> C>,
}

impl<C: DeviceCategory> DeviceStore<C> {
    pub fn new() -> Arc<Self> {
        let (version, _) = watch::channel(0u64);
        Arc::new(Self {
            devices: DashMap::new(),
            monitors: ArcSwap::from_pointee(Vec::new()),
            version,
            _category: PhantomData,
        })
    }

    /// Adds a device and starts tracking its changes.
    pub fn add(self: &Arc<Self>, device: Arc<DeviceCore>) -> Result<(), CoreError> {
        if device.kind() != C::KIND {
            return Err(CoreError::WrongCategory {
                uid: device.uid().clone(),
                expected: C::KIND,
                actual: device.kind(),
            });
        }
        match self.devices.entry(device.uid().clone()) {
            Entry::Occupied(_) => {
                return Err(CoreError::DeviceAlreadyPresent {
                    uid: device.uid().clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&device));
            }
        }

        let store: Weak<Self> = Arc::downgrade(self);
        device.set_listener(Some(Box::new(move |changed: &DeviceCore| {
            if let Some(store) = store.upgrade() {
                store.notify_device_changed(changed);
            }
        })));

        debug!(kind = %C::KIND, uid = %device.uid(), "device added");
        self.notify_change();
        Ok(())
    }

    /// Removes a device and stops tracking it.
    pub fn remove(&self, uid: &DeviceUid) -> Option<Arc<DeviceCore>> {
        let (_, device) = self.devices.remove(uid)?;
        device.set_listener(None);
        debug!(kind = %C::KIND, %uid, "device removed");
        self.notify_change();
        Some(device)
    }

    pub fn get(&self, uid: &DeviceUid) -> Option<Arc<DeviceCore>> {
        self.devices.get(uid).map(|r| Arc::clone(r.value()))
    }

    /// Snapshot of every device, ordered by uid.
    pub fn all(&self) -> Vec<Arc<DeviceCore>> {
        let mut devices: Vec<_> = self
            .devices
            .iter()
            .map(|r| Arc::clone(r.value()))
            .collect();
        devices.sort_by(|a, b| a.uid().cmp(b.uid()));
        devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn monitor_with(&self, monitor: Arc<dyn DeviceMonitor>) {
        self.monitors.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&monitor));
            next
        });
    }

    pub fn dispose_monitor(&self, monitor: &Arc<dyn DeviceMonitor>) {
        self.monitors.rcu(|current| {
            current
                .iter()
                .filter(|m| !Arc::ptr_eq(m, monitor))
                .cloned()
                .collect::<Monitors>()
        });
    }

    /// Subscribe to the store version counter.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn notify_device_changed(&self, device: &DeviceCore) {
        trace!(kind = %C::KIND, uid = %device.uid(), "device changed");
        self.bump_version();
        let monitors = self.monitors.load_full();
        for monitor in monitors.iter() {
            monitor.on_device_changed(device);
        }
        for monitor in monitors.iter() {
            monitor.on_change();
        }
    }

    fn notify_change(&self) {
        self.bump_version();
        let monitors = self.monitors.load_full();
        for monitor in monitors.iter() {
            monitor.on_change();
        }
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}
