// ── Auto-connection arbiter ──
//
// Observes both device stores and decides which single remote control
// and which single drone should be connected. Store notifications arriving
// while a pass runs (typically caused by the pass's own connect and
// disconnect requests) are coalesced into one more pass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, trace};

use super::facade::{
    AutoConnection, AutoConnectionBackend, AutoConnectionState, AutoConnectionStatus,
    SelectedDevice,
};
use super::ranking::RankingPolicy;
use crate::model::{ConnectionState, DeviceCore};
use crate::store::{DeviceMonitor, DroneStore, RemoteControlStore};

#[derive(Debug, Default)]
struct Selection {
    remote_control: Option<Arc<DeviceCore>>,
    drone: Option<Arc<DeviceCore>>,
    /// Drone forced off its link, to be reconnected through the selected
    /// remote control or on a better connector.
    drone_to_reconnect: Option<Arc<DeviceCore>>,
}

/// What [`ensure_best_connection`] did with the top-ranked device.
enum Outcome {
    /// Not connecting yet; a connection was requested if possible.
    Idle,
    /// Disconnected to move to a better connector.
    Moving,
    /// Connecting or connected, nothing to do.
    Settled,
}

/// Auto-connection control loop.
pub struct AutoConnectionArbiter {
    drones: Arc<DroneStore>,
    remote_controls: Arc<RemoteControlStore>,
    facade: AutoConnection,
    /// Only locked by the pass itself.
    selection: Mutex<Selection>,
    started: AtomicBool,
    /// Set by start so that the next pass forgets the previous selection.
    reset: AtomicBool,
    busy: AtomicBool,
    pending: AtomicBool,
    monitor: Arc<dyn DeviceMonitor>,
}

impl AutoConnectionArbiter {
    pub fn new(drones: Arc<DroneStore>, remote_controls: Arc<RemoteControlStore>) -> Arc<Self> {
        Arc::new_cyclic(|arbiter: &Weak<Self>| {
            let backend: Weak<dyn AutoConnectionBackend> = arbiter.clone();
            Self {
                drones,
                remote_controls,
                facade: AutoConnection::new(backend),
                selection: Mutex::new(Selection::default()),
                started: AtomicBool::new(false),
                reset: AtomicBool::new(false),
                busy: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                monitor: Arc::new(StoreMonitor {
                    arbiter: arbiter.clone(),
                }),
            }
        })
    }

    pub fn facade(&self) -> &AutoConnection {
        &self.facade
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Runs passes until no notification arrived during the latest one.
    ///
    /// A call made while another call is draining only flags a pending
    /// change and returns.
    fn on_devices_changed(&self) {
        self.pending.store(true, Ordering::Release);
        loop {
            if self
                .busy
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }
            while self.pending.swap(false, Ordering::AcqRel) {
                if self.is_started() {
                    self.process_devices();
                }
            }
            self.busy.store(false, Ordering::Release);
            // a notification may have slipped in between the last swap and
            // releasing `busy`
            if !self.pending.load(Ordering::Acquire) {
                return;
            }
        }
    }

    fn lock_selection(&self) -> MutexGuard<'_, Selection> {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn process_devices(&self) {
        let mut selection = self.lock_selection();
        if self.reset.swap(false, Ordering::AcqRel) {
            *selection = Selection::default();
        }
        trace!("auto-connection pass");

        self.select_remote_control(&mut selection);
        match selection.remote_control.clone() {
            Some(rc) => self.select_coupled_drone(&mut selection, &rc),
            None => self.select_drone(&mut selection),
        }

        if self.is_started() {
            self.facade.update(AutoConnectionState {
                status: AutoConnectionStatus::Started,
                drone: selection.drone.as_deref().map(SelectedDevice::of),
                remote_control: selection.remote_control.as_deref().map(SelectedDevice::of),
            });
        }
    }

    /// Keeps the best visible remote control connected and every other one
    /// disconnected.
    fn select_remote_control(&self, selection: &mut Selection) {
        let mut ranked = RankingPolicy::new(selection.drone_to_reconnect.as_deref())
            .rank_visible(self.remote_controls.all())
            .into_iter();
        let Some(best) = ranked.next() else {
            selection.remote_control = None;
            return;
        };
        ensure_best_connection(&best.device);
        selection.remote_control = Some(best.device);

        for other in ranked {
            let rc = other.device;
            if !rc.can_be_disconnected() {
                continue;
            }
            if selection.drone_to_reconnect.is_none() {
                selection.drone_to_reconnect = self.find_drone_connected_with(&rc, None);
            }
            debug!(uid = %rc.uid(), "disconnecting remote control");
            rc.disconnect();
        }
    }

    /// Drone selection while a remote control is selected: only drones
    /// reached through that remote control may stay connected.
    fn select_coupled_drone(&self, selection: &mut Selection, rc: &Arc<DeviceCore>) {
        let elsewhere = RankingPolicy::new(selection.drone_to_reconnect.as_deref()).rank(
            self.drones
                .all()
                .into_iter()
                .filter(|drone| drone.state().is_connected_but_not_through(rc.uid())),
        );
        for candidate in elsewhere {
            let drone = candidate.device;
            if !drone.can_be_disconnected() {
                continue;
            }
            if selection.drone_to_reconnect.is_none() {
                selection.drone_to_reconnect = Some(Arc::clone(&drone));
            }
            debug!(uid = %drone.uid(), rc = %rc.uid(), "disconnecting drone not reached through remote control");
            drone.disconnect();
        }

        if let Some(drone) =
            self.find_drone_connected_with(rc, selection.drone_to_reconnect.as_deref())
        {
            selection.drone = Some(drone);
            selection.drone_to_reconnect = None;
            return;
        }

        // the remote control may connect a drone by itself: wait until it is
        // fully connected before picking one
        if rc.connection_state() != ConnectionState::Connected {
            return;
        }
        let Some(target) = selection.drone_to_reconnect.clone() else {
            return;
        };
        if !self.tracks(&target) {
            selection.drone_to_reconnect = None;
            selection.drone = None;
            return;
        }
        let state = target.state();
        let connector = state
            .can_be_connected()
            .then(|| state.connector_through(rc.uid()))
            .flatten();
        match connector {
            Some(connector) => {
                debug!(uid = %target.uid(), rc = %rc.uid(), "reconnecting drone through remote control");
                selection.drone = Some(Arc::clone(&target));
                target.connect(Some(connector), None);
            }
            None => selection.drone = None,
        }
    }

    /// Drone selection without a remote control: keep the best visible
    /// drone connected on its best connector, disconnect every other one.
    fn select_drone(&self, selection: &mut Selection) {
        let mut ranked = RankingPolicy::new(selection.drone_to_reconnect.as_deref())
            .rank_visible(self.drones.all())
            .into_iter();
        let Some(best) = ranked.next() else {
            selection.drone = None;
            return;
        };
        let drone = best.device;
        match ensure_best_connection(&drone) {
            Outcome::Moving => selection.drone_to_reconnect = Some(Arc::clone(&drone)),
            Outcome::Settled => selection.drone_to_reconnect = None,
            Outcome::Idle => {}
        }
        selection.drone = Some(drone);

        for other in ranked {
            if other.device.can_be_disconnected() {
                debug!(uid = %other.device.uid(), "disconnecting drone");
                other.device.disconnect();
            }
        }
    }

    /// Best-ranked drone whose active connector goes through `rc`.
    fn find_drone_connected_with(
        &self,
        rc: &DeviceCore,
        reconnect: Option<&DeviceCore>,
    ) -> Option<Arc<DeviceCore>> {
        RankingPolicy::new(reconnect)
            .rank(
                self.drones
                    .all()
                    .into_iter()
                    .filter(|drone| drone.state().is_connected_through(rc.uid())),
            )
            .into_iter()
            .next()
            .map(|candidate| candidate.device)
    }

    fn tracks(&self, drone: &Arc<DeviceCore>) -> bool {
        self.drones
            .get(drone.uid())
            .is_some_and(|tracked| Arc::ptr_eq(&tracked, drone))
    }
}

fn ensure_best_connection(device: &DeviceCore) -> Outcome {
    let state = device.state();
    if !state.is_at_least_connecting() {
        if state.can_be_connected() {
            debug!(kind = %device.kind(), uid = %device.uid(), "connecting");
            if !device.connect(None, None) {
                debug!(uid = %device.uid(), "connection request refused");
            }
        }
        Outcome::Idle
    } else if !state.uses_best_connector() && state.can_be_disconnected() {
        debug!(kind = %device.kind(), uid = %device.uid(), "disconnecting to move to a better connector");
        device.disconnect();
        Outcome::Moving
    } else {
        Outcome::Settled
    }
}

impl AutoConnectionBackend for AutoConnectionArbiter {
    fn start_auto_connection(&self) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        info!("auto-connection started");
        self.reset.store(true, Ordering::Release);
        self.drones.monitor_with(Arc::clone(&self.monitor));
        self.remote_controls.monitor_with(Arc::clone(&self.monitor));
        self.on_devices_changed();
        true
    }

    fn stop_auto_connection(&self) -> bool {
        if self
            .started
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.drones.dispose_monitor(&self.monitor);
        self.remote_controls.dispose_monitor(&self.monitor);
        self.facade.update(AutoConnectionState::default());
        info!("auto-connection stopped");
        true
    }
}

impl std::fmt::Debug for AutoConnectionArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoConnectionArbiter")
            .field("started", &self.is_started())
            .field("busy", &self.busy.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

struct StoreMonitor {
    arbiter: Weak<AutoConnectionArbiter>,
}

impl DeviceMonitor for StoreMonitor {
    fn on_device_changed(&self, device: &DeviceCore) {
        trace!(uid = %device.uid(), state = %device.connection_state(), "observed device change");
    }

    fn on_change(&self) {
        if let Some(arbiter) = self.arbiter.upgrade() {
            arbiter.on_devices_changed();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::sync::watch;

    use super::*;
    use crate::model::{DeviceConnector, Technology};
    use crate::testing::{
        Call, MockTransport, add_connectors, mock_connected, mock_connecting,
        mock_disconnected, mock_disconnecting, remove_connectors,
    };

    fn usb() -> DeviceConnector {
        DeviceConnector::local(Technology::Usb)
    }

    fn wifi() -> DeviceConnector {
        DeviceConnector::local(Technology::Wifi)
    }

    fn ble() -> DeviceConnector {
        DeviceConnector::local(Technology::Ble)
    }

    fn via(rc: &str) -> DeviceConnector {
        DeviceConnector::remote_control(rc)
    }

    struct Fixture {
        drones: Arc<DroneStore>,
        remote_controls: Arc<RemoteControlStore>,
        arbiter: Arc<AutoConnectionArbiter>,
        transport: Arc<MockTransport>,
        updates: watch::Receiver<AutoConnectionState>,
    }

    impl Fixture {
        fn new() -> Self {
            let drones = DroneStore::new();
            let remote_controls = RemoteControlStore::new();
            let arbiter = AutoConnectionArbiter::new(Arc::clone(&drones), Arc::clone(&remote_controls));
            let updates = arbiter.facade().subscribe();
            Self {
                drones,
                remote_controls,
                arbiter,
                transport: MockTransport::new(),
                updates,
            }
        }

        fn drone(&self, uid: &str, connectors: &[DeviceConnector]) -> Arc<DeviceCore> {
            let device = Arc::new(DeviceCore::drone(uid, uid, self.transport.clone()));
            add_connectors(&device, connectors);
            self.drones.add(Arc::clone(&device)).unwrap();
            device
        }

        fn rc(&self, uid: &str, connectors: &[DeviceConnector]) -> Arc<DeviceCore> {
            let device = Arc::new(DeviceCore::remote_control(uid, uid, self.transport.clone()));
            add_connectors(&device, connectors);
            self.remote_controls.add(Arc::clone(&device)).unwrap();
            device
        }

        fn facade(&self) -> &AutoConnection {
            self.arbiter.facade()
        }

        fn calls(&self) -> Vec<Call> {
            self.transport.take_calls()
        }

        /// Uids of the selected (drone, remote control).
        fn selected(&self) -> (Option<String>, Option<String>) {
            let state = self.facade().snapshot();
            (
                state.drone.map(|d| d.uid.to_string()),
                state.remote_control.map(|d| d.uid.to_string()),
            )
        }

        /// Whether subscribers were notified since the last call.
        fn notified(&mut self) -> bool {
            let changed = self.updates.has_changed().unwrap();
            self.updates.borrow_and_update();
            changed
        }

        /// Completes pending transitions until nothing moves anymore.
        fn settle(&self) {
            for _ in 0..32 {
                let mut moved = false;
                let devices = self.drones.all().into_iter().chain(self.remote_controls.all());
                for device in devices {
                    match device.connection_state() {
                        ConnectionState::Connecting => mock_connected(&device),
                        ConnectionState::Disconnecting => mock_disconnected(&device),
                        _ => continue,
                    }
                    moved = true;
                }
                if !moved {
                    return;
                }
            }
            panic!("devices never settled");
        }

        fn active(&self) -> (usize, usize) {
            let count = |devices: Vec<Arc<DeviceCore>>| {
                devices
                    .iter()
                    .filter(|d| d.connection_state().is_at_least_connecting())
                    .count()
            };
            (count(self.drones.all()), count(self.remote_controls.all()))
        }
    }

    fn some(uid: &str) -> Option<String> {
        Some(uid.to_owned())
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut fx = Fixture::new();
        assert_eq!(fx.facade().status(), AutoConnectionStatus::Stopped);
        assert!(!fx.facade().stop());
        assert!(!fx.notified());

        assert!(fx.facade().start());
        assert_eq!(fx.facade().status(), AutoConnectionStatus::Started);
        assert!(fx.notified());

        assert!(!fx.facade().start());
        assert!(!fx.notified());

        assert!(fx.facade().stop());
        assert_eq!(fx.facade().status(), AutoConnectionStatus::Stopped);
        assert!(fx.notified());
        assert!(!fx.facade().stop());
    }

    #[test]
    fn two_wifi_drones_connect_exactly_one() {
        let mut fx = Fixture::new();
        let d1 = fx.drone("1", &[wifi()]);
        let d2 = fx.drone("2", &[wifi()]);

        fx.facade().start();
        assert_eq!(fx.calls(), vec![Call::connect("1", wifi())]);
        assert_eq!(d1.connection_state(), ConnectionState::Connecting);
        assert_eq!(d2.connection_state(), ConnectionState::Disconnected);
        assert_eq!(fx.selected(), (some("1"), None));
        assert!(fx.notified());

        mock_connected(&d1);
        assert!(fx.calls().is_empty());
        assert!(fx.notified());
        assert_eq!(
            fx.facade().drone().unwrap().connection_state,
            ConnectionState::Connected
        );

        mock_disconnecting(&d1);
        assert!(fx.calls().is_empty());
        assert_eq!(fx.selected(), (some("1"), None));

        mock_disconnected(&d1);
        assert_eq!(fx.calls(), vec![Call::connect("1", wifi())]);
        assert_eq!(d1.connection_state(), ConnectionState::Connecting);
        assert_eq!(d2.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn drone_moves_to_better_connector() {
        let fx = Fixture::new();
        let d1 = fx.drone("1", &[ble()]);
        let d2 = fx.drone("2", &[]);

        fx.facade().start();
        assert_eq!(fx.calls(), vec![Call::connect("1", ble())]);
        mock_connected(&d1);

        add_connectors(&d1, &[wifi()]);
        assert_eq!(fx.calls(), vec![Call::disconnect("1")]);
        assert_eq!(d1.connection_state(), ConnectionState::Disconnecting);

        add_connectors(&d2, &[wifi()]);
        assert!(fx.calls().is_empty());
        assert_eq!(fx.selected(), (some("1"), None));

        // remembered for reconnection, so it wins the tie against '2'
        mock_disconnected(&d1);
        assert_eq!(fx.calls(), vec![Call::connect("1", wifi())]);
        assert_eq!(d1.active_connector(), Some(wifi()));

        mock_connected(&d1);
        assert!(fx.calls().is_empty());
        assert_eq!(d2.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn better_drone_takes_over() {
        let fx = Fixture::new();
        let d1 = fx.drone("1", &[ble()]);
        let d2 = fx.drone("2", &[]);

        fx.facade().start();
        fx.calls();
        mock_connected(&d1);

        add_connectors(&d2, &[wifi()]);
        assert_eq!(
            fx.calls(),
            vec![Call::connect("2", wifi()), Call::disconnect("1")]
        );
        assert_eq!(fx.selected(), (some("2"), None));

        mock_disconnected(&d1);
        assert!(fx.calls().is_empty());
        mock_connected(&d2);
        assert!(fx.calls().is_empty());
        assert_eq!(fx.selected(), (some("2"), None));
    }

    #[test]
    fn usb_drone_wins_over_connected_wifi_drone() {
        let fx = Fixture::new();
        let a = fx.drone("A", &[wifi()]);
        let b = fx.drone("B", &[]);

        fx.facade().start();
        fx.settle();
        assert_eq!(a.connection_state(), ConnectionState::Connected);
        fx.calls();

        add_connectors(&b, &[usb()]);
        assert_eq!(
            fx.calls(),
            vec![Call::connect("B", usb()), Call::disconnect("A")]
        );

        mock_disconnected(&a);
        mock_connected(&b);
        assert!(fx.calls().is_empty());
        assert_eq!(b.active_connector(), Some(usb()));
        assert_eq!(a.connection_state(), ConnectionState::Disconnected);
        assert_eq!(fx.selected(), (some("B"), None));
    }

    #[test]
    fn better_remote_control_takes_over() {
        let fx = Fixture::new();
        let rc1 = fx.rc("1", &[wifi()]);
        let rc2 = fx.rc("2", &[]);

        fx.facade().start();
        assert_eq!(fx.calls(), vec![Call::connect("1", wifi())]);
        mock_connected(&rc1);
        assert_eq!(fx.selected(), (None, some("1")));

        add_connectors(&rc2, &[usb()]);
        assert_eq!(
            fx.calls(),
            vec![Call::connect("2", usb()), Call::disconnect("1")]
        );
        assert_eq!(fx.selected(), (None, some("2")));

        mock_disconnected(&rc1);
        mock_connected(&rc2);
        assert!(fx.calls().is_empty());
    }

    #[test]
    fn remote_control_takes_over_drone_and_reconnects_it() {
        let fx = Fixture::new();
        let drone = fx.drone("1", &[wifi()]);
        let rc = fx.rc("2", &[]);

        fx.facade().start();
        assert_eq!(fx.calls(), vec![Call::connect("1", wifi())]);
        mock_connected(&drone);

        add_connectors(&rc, &[usb()]);
        assert_eq!(
            fx.calls(),
            vec![Call::connect("2", usb()), Call::disconnect("1")]
        );
        assert_eq!(fx.selected(), (some("1"), some("2")));

        mock_disconnected(&drone);
        assert!(fx.calls().is_empty());

        // remote control not connected yet: nothing is attempted
        let other = fx.drone("3", &[via("2")]);
        add_connectors(&drone, &[via("2")]);
        assert!(fx.calls().is_empty());

        mock_connected(&rc);
        assert_eq!(fx.calls(), vec![Call::connect("1", via("2"))]);
        assert_eq!(drone.connection_state(), ConnectionState::Connecting);
        assert_eq!(other.connection_state(), ConnectionState::Disconnected);
        assert_eq!(fx.selected(), (some("1"), some("2")));

        // the remote control handles its own drone from now on
        mock_disconnecting(&drone);
        mock_disconnected(&drone);
        assert!(fx.calls().is_empty());
        assert_eq!(fx.selected(), (some("1"), some("2")));
    }

    #[test]
    fn vanished_drone_is_not_reconnected_through_remote_control() {
        let fx = Fixture::new();
        let drone = fx.drone("1", &[wifi()]);
        let rc = fx.rc("2", &[]);

        fx.facade().start();
        assert_eq!(fx.calls(), vec![Call::connect("1", wifi())]);
        mock_connected(&drone);

        add_connectors(&rc, &[usb()]);
        assert_eq!(
            fx.calls(),
            vec![Call::connect("2", usb()), Call::disconnect("1")]
        );
        mock_disconnected(&drone);

        // the drone goes out of range before the remote control is up
        remove_connectors(&drone, &[wifi()]);
        assert!(fx.drones.remove(drone.uid()).is_some());
        assert!(fx.calls().is_empty());

        mock_connected(&rc);
        assert!(fx.calls().is_empty());
        assert_eq!(drone.connection_state(), ConnectionState::Disconnected);
        assert_eq!(fx.selected(), (None, some("2")));
    }

    #[test]
    fn start_disconnects_everything_but_the_best() {
        let fx = Fixture::new();
        let rc1 = fx.rc("1", &[usb()]);
        let rc2 = fx.rc("2", &[wifi()]);
        mock_connecting(&rc2, wifi());
        mock_connected(&rc2);
        let rc3 = fx.rc("3", &[ble()]);
        mock_connecting(&rc3, ble());

        let d4 = fx.drone("4", &[wifi(), via("1")]);
        mock_connecting(&d4, wifi());
        mock_connected(&d4);
        let d5 = fx.drone("5", &[ble()]);
        mock_connecting(&d5, ble());
        let d6 = fx.drone("6", &[wifi()]);

        fx.facade().start();
        assert_eq!(
            fx.calls(),
            vec![
                Call::connect("1", usb()),
                Call::disconnect("2"),
                Call::disconnect("3"),
                Call::disconnect("4"),
                Call::disconnect("5"),
            ]
        );
        assert_eq!(d6.connection_state(), ConnectionState::Disconnected);
        assert_eq!(fx.selected(), (None, some("1")));

        mock_connected(&rc1);
        mock_disconnected(&rc2);
        mock_disconnected(&rc3);
        mock_disconnected(&d5);
        assert!(fx.calls().is_empty());
        assert_eq!(fx.selected(), (None, some("1")));

        mock_disconnected(&d4);
        assert_eq!(fx.calls(), vec![Call::connect("4", via("1"))]);
        assert_eq!(fx.selected(), (some("4"), some("1")));
    }

    #[test]
    fn forgotten_drone_is_not_selected_when_rc_cannot_reach_it() {
        let fx = Fixture::new();
        let drone = fx.drone("1", &[wifi()]);
        let rc = fx.rc("2", &[]);

        fx.facade().start();
        mock_connected(&drone);
        add_connectors(&rc, &[usb()]);
        mock_disconnected(&drone);
        fx.calls();

        mock_connected(&rc);
        assert!(fx.calls().is_empty());
        assert_eq!(fx.selected(), (None, some("2")));
    }

    #[test]
    fn devices_stay_connected_when_stopped() {
        let mut fx = Fixture::new();
        let drone = fx.drone("1", &[wifi()]);
        let rc = fx.rc("2", &[wifi()]);

        fx.facade().start();
        assert_eq!(fx.calls(), vec![Call::connect("2", wifi())]);
        assert_eq!(fx.selected(), (None, some("2")));

        mock_connected(&rc);
        assert!(fx.calls().is_empty());

        add_connectors(&drone, &[via("2")]);
        mock_connecting(&drone, via("2"));
        assert!(fx.calls().is_empty());
        assert_eq!(fx.selected(), (some("1"), some("2")));
        fx.notified();

        assert!(fx.facade().stop());
        assert!(fx.notified());
        assert_eq!(fx.facade().snapshot(), AutoConnectionState::default());
        assert_eq!(drone.connection_state(), ConnectionState::Connecting);
        assert_eq!(rc.connection_state(), ConnectionState::Connected);

        // no longer observing
        mock_disconnected(&drone);
        mock_disconnected(&rc);
        assert!(fx.calls().is_empty());
        assert!(!fx.notified());
    }

    #[test]
    fn restart_forgets_previous_selection() {
        let fx = Fixture::new();
        let d1 = fx.drone("1", &[wifi()]);
        fx.facade().start();
        fx.settle();
        fx.facade().stop();
        fx.drones.remove(d1.uid());

        fx.facade().start();
        assert_eq!(fx.selected(), (None, None));
        assert_eq!(fx.facade().status(), AutoConnectionStatus::Started);
    }

    #[test]
    fn rejected_connect_leaves_device_disconnected() {
        let fx = Fixture::new();
        fx.transport.reject_requests(true);
        let d1 = fx.drone("1", &[wifi()]);

        fx.facade().start();
        assert_eq!(fx.calls(), vec![Call::connect("1", wifi())]);
        assert_eq!(d1.connection_state(), ConnectionState::Disconnected);
        assert_eq!(fx.selected(), (some("1"), None));
    }

    #[test]
    fn single_winner_after_convergence() {
        let fx = Fixture::new();
        let rcs = [fx.rc("r1", &[wifi()]), fx.rc("r2", &[ble()]), fx.rc("r3", &[usb()])];
        for rc in &rcs[..2] {
            mock_connecting(rc, rc.connectors()[0].clone());
        }
        let drones = [
            fx.drone("d1", &[usb(), via("r3")]),
            fx.drone("d2", &[wifi(), via("r1")]),
            fx.drone("d3", &[ble()]),
        ];
        for drone in &drones {
            mock_connecting(drone, drone.connectors()[0].clone());
        }

        fx.facade().start();
        fx.settle();

        assert_eq!(fx.active(), (1, 1));
        assert_eq!(rcs[2].connection_state(), ConnectionState::Connected);
        let (drone, rc) = fx.selected();
        assert_eq!(rc, some("r3"));
        assert_eq!(drone, some("d1"));
        assert_eq!(drones[0].active_connector(), Some(via("r3")));
    }

    #[test]
    fn single_winner_without_remote_control() {
        let fx = Fixture::new();
        let a = fx.drone("a", &[ble()]);
        let b = fx.drone("b", &[wifi()]);
        let c = fx.drone("c", &[usb(), ble()]);
        mock_connecting(&a, ble());
        mock_connecting(&c, ble());

        fx.facade().start();
        fx.settle();

        assert_eq!(fx.active(), (1, 0));
        assert_eq!(fx.selected(), (some("c"), None));
        assert_eq!(c.active_connector(), Some(usb()));
        assert_eq!(b.connection_state(), ConnectionState::Disconnected);
    }
}
