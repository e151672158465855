// ── Auto-connection ranking ──
//
// Strict total order over devices, most eligible first. Each device's
// state is snapshotted once before sorting so the order stays consistent
// while transports mutate devices concurrently.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::model::{DeviceCore, DeviceState};

/// A device together with the state it is ranked on.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub device: Arc<DeviceCore>,
    pub state: Arc<DeviceState>,
}

impl Candidate {
    pub fn new(device: Arc<DeviceCore>) -> Self {
        let state = device.state();
        Self { device, state }
    }
}

/// Ranking criteria, most significant first:
///
/// 1. best connector technology (no connector ranks last);
/// 2. connection state, `Connected` first;
/// 3. the device to reconnect, if any;
/// 4. uid, ascending.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankingPolicy<'a> {
    reconnect: Option<&'a DeviceCore>,
}

impl<'a> RankingPolicy<'a> {
    pub fn new(reconnect: Option<&'a DeviceCore>) -> Self {
        Self { reconnect }
    }

    /// Orders `a` before `b` when `a` is more eligible.
    ///
    /// # Panics
    ///
    /// Panics if two distinct devices share a uid.
    pub fn compare(&self, a: &Candidate, b: &Candidate) -> Ordering {
        b.state
            .best_technology_rank()
            .cmp(&a.state.best_technology_rank())
            .then_with(|| {
                b.state
                    .connection_state
                    .rank()
                    .cmp(&a.state.connection_state.rank())
            })
            .then_with(|| self.is_reconnect(&b.device).cmp(&self.is_reconnect(&a.device)))
            .then_with(|| {
                let by_uid = a.device.uid().cmp(b.device.uid());
                assert!(
                    by_uid != Ordering::Equal || Arc::ptr_eq(&a.device, &b.device),
                    "distinct devices share uid {}",
                    a.device.uid()
                );
                by_uid
            })
    }

    /// Snapshots and sorts `devices`, most eligible first.
    pub fn rank(&self, devices: impl IntoIterator<Item = Arc<DeviceCore>>) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = devices.into_iter().map(Candidate::new).collect();
        candidates.sort_by(|a, b| self.compare(a, b));
        candidates
    }

    /// Like [`rank`](Self::rank), keeping only visible devices.
    pub fn rank_visible(
        &self,
        devices: impl IntoIterator<Item = Arc<DeviceCore>>,
    ) -> Vec<Candidate> {
        let mut candidates = self.rank(devices);
        candidates.retain(|candidate| candidate.state.is_visible());
        candidates
    }

    fn is_reconnect(&self, device: &DeviceCore) -> bool {
        self.reconnect
            .is_some_and(|target| std::ptr::eq(target, device))
    }
}
