use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Store, StoreError};
use crate::paste::Paste;

/// Keeps pastes in process memory. Nothing survives a restart.
pub struct MemoryStore {
    pastes: Mutex<HashMap<String, Paste>>,
    reachable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            pastes: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Simulates losing (or regaining) the backend. While unreachable every
    /// operation fails with [`StoreError::Unavailable`].
    #[cfg(test)]
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Release);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pastes.lock().unwrap().len()
    }

    fn pastes(&self) -> Result<MutexGuard<'_, HashMap<String, Paste>>, StoreError> {
        if !self.reachable.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }

        self.pastes
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Paste>, StoreError> {
        Ok(self.pastes()?.get(id).cloned())
    }

    async fn consume_view(&self, id: &str) -> Result<Option<Paste>, StoreError> {
        let mut pastes = self.pastes()?;
        match pastes.get_mut(id) {
            Some(paste) if paste.has_views_left() => {
                paste.view_count = paste
                    .view_count
                    .checked_add(1)
                    .ok_or_else(|| StoreError::ViewCountOverflow(id.to_string()))?;
                Ok(Some(paste.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert(&self, paste: Paste) -> Result<(), StoreError> {
        match self.pastes()?.entry(paste.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict),
            Entry::Vacant(slot) => {
                slot.insert(paste);
                Ok(())
            }
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.pastes().map(|_| ())
    }
}
