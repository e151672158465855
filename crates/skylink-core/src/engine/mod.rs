// ── Engine framework ──
//
// Lifecycle state machine, group coordinator and the utility registry
// engines use to find each other.

mod coordinator;
pub(crate) mod lifecycle;
mod registry;

pub use coordinator::EngineGroupCoordinator;
pub use lifecycle::{Engine, EngineLifecycle, LifecycleState, StopListener, StopRequest};
pub use registry::UtilityRegistry;
