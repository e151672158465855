// ── Utility registry ──
//
// Type-indexed service lookup shared by all engines. Populated while the
// SDK is built, before any engine starts.

use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::error::CoreError;

/// Map from a utility type to its single shared instance.
#[derive(Default)]
pub struct UtilityRegistry {
    utilities: DashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl UtilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the instance of utility `U`. `U` may be a trait object.
    pub fn register<U>(&self, utility: Arc<U>) -> Result<(), CoreError>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        match self.utilities.entry(TypeId::of::<U>()) {
            Entry::Occupied(_) => Err(CoreError::UtilityAlreadyRegistered {
                name: type_name::<U>(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(Box::new(utility));
                debug!(utility = type_name::<U>(), "utility registered");
                Ok(())
            }
        }
    }

    pub fn get<U>(&self) -> Option<Arc<U>>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.utilities
            .get(&TypeId::of::<U>())
            .and_then(|entry| entry.value().downcast_ref::<Arc<U>>().cloned())
    }

    /// Like [`get`](Self::get), failing when the utility is missing.
    pub fn require<U>(&self) -> Result<Arc<U>, CoreError>
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.get::<U>().ok_or(CoreError::UtilityMissing {
            name: type_name::<U>(),
        })
    }

    pub fn contains<U>(&self) -> bool
    where
        U: ?Sized + Send + Sync + 'static,
    {
        self.utilities.contains_key(&TypeId::of::<U>())
    }
}

impl std::fmt::Debug for UtilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtilityRegistry")
            .field("utilities", &self.utilities.len())
            .finish()
    }
}
