//! Laptop store with filtered, interruptible search.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use super::StoreError;
use crate::interrupt::Interrupt;
use crate::model::{Filter, Laptop};

/// Storage for catalog laptops.
pub trait LaptopStore: Send + Sync {
    /// Store a copy of `laptop` and return its id.
    ///
    /// An empty id is replaced by a fresh UUID; a non-empty one must parse as
    /// a UUID. Fails with [`StoreError::AlreadyExists`] if the id is taken.
    fn save(&self, laptop: &Laptop) -> Result<String, StoreError>;

    /// Look up a laptop. A miss is `Ok(None)`, not an error.
    fn find(&self, id: &str) -> Result<Option<Laptop>, StoreError>;

    /// Call `on_match` with a copy of every laptop that satisfies `filter`.
    ///
    /// `interrupt` is polled before each laptop; when it fires the scan stops
    /// with the matching error. Laptops already passed to `on_match` stay
    /// delivered. An error from `on_match` also stops the scan and is
    /// returned as is. Visiting order is unspecified.
    fn search(
        &self,
        interrupt: &dyn Interrupt,
        filter: &Filter,
        on_match: &mut dyn FnMut(Laptop) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
}

/// Process-lifetime laptop store.
#[derive(Debug, Default)]
pub struct InMemoryLaptopStore {
    data: RwLock<HashMap<String, Laptop>>,
}

impl InMemoryLaptopStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored laptops.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

/// Return the canonical id for `laptop`, generating one if it has none.
fn resolve_id(laptop: &Laptop) -> Result<String, StoreError> {
    if laptop.id.is_empty() {
        return Ok(Uuid::new_v4().to_string());
    }
    Uuid::parse_str(&laptop.id)
        .map(|id| id.hyphenated().to_string())
        .map_err(|e| StoreError::InvalidId {
            id: laptop.id.clone(),
            reason: e.to_string(),
        })
}

impl LaptopStore for InMemoryLaptopStore {
    fn save(&self, laptop: &Laptop) -> Result<String, StoreError> {
        let id = resolve_id(laptop)?;

        let mut data = self.data.write();
        if data.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        let mut stored = laptop.clone();
        stored.id = id.clone();
        data.insert(id.clone(), stored);
        Ok(id)
    }

    fn find(&self, id: &str) -> Result<Option<Laptop>, StoreError> {
        Ok(self.data.read().get(id).cloned())
    }

    fn search(
        &self,
        interrupt: &dyn Interrupt,
        filter: &Filter,
        on_match: &mut dyn FnMut(Laptop) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        // The read lock spans the whole scan, callbacks included, so writers
        // wait until the caller has consumed every match.
        let data = self.data.read();
        for laptop in data.values() {
            if let Some(interruption) = interrupt.check() {
                tracing::debug!(?interruption, "laptop search interrupted");
                return Err(interruption.into());
            }
            if filter.matches(laptop) {
                on_match(laptop.clone())?;
            }
        }
        Ok(())
    }
}
