// ── Automatic connection ──
//
// Ranking policy, arbiter control loop, the published facility and the
// engine tying them to the SDK lifecycle.

mod arbiter;
mod engine;
mod facade;
mod ranking;

pub use arbiter::AutoConnectionArbiter;
pub use engine::AutoConnectionEngine;
pub use facade::{
    AutoConnection, AutoConnectionBackend, AutoConnectionState, AutoConnectionStatus,
    SelectedDevice,
};
pub use ranking::{Candidate, RankingPolicy};
