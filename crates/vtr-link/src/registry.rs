//! Channel registry
//!
//! Maps a stable logical channel id to a live channel instance. Construction
//! and destruction are controlled here, with no hidden global state and no
//! ref-counting beyond the handed-out `Arc`s.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::LinkError;

/// Registry of live channels, keyed by logical id
///
/// Registration is idempotent-last-write: re-registering an id simply
/// replaces the stored channel. Generic over the channel type so the
/// registry's own behavior is testable without hardware.
pub struct ChannelRegistry<C> {
    inner: Mutex<HashMap<String, Arc<C>>>,
}

impl<C> ChannelRegistry<C> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<C>>> {
        // A poisoned map is still a usable map
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a channel under `id`, replacing any previous holder
    pub fn register(&self, id: &str, channel: Arc<C>) {
        let previous = self.lock().insert(id.to_string(), channel);
        if previous.is_some() {
            debug!(id, "replaced registered channel");
        } else {
            debug!(id, "registered channel");
        }
    }

    /// Remove and return the channel under `id`
    ///
    /// Dropping the returned handle (once all exchanges on it finish)
    /// closes the port.
    pub fn unregister(&self, id: &str) -> Option<Arc<C>> {
        let removed = self.lock().remove(id);
        if removed.is_some() {
            debug!(id, "unregistered channel");
        }
        removed
    }

    /// Resolve `id` to its live channel
    pub fn lookup(&self, id: &str) -> Result<Arc<C>, LinkError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| LinkError::NotRegistered(id.to_string()))
    }

    /// All registered ids, in no particular order
    pub fn ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Number of registered channels
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<C> Default for ChannelRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}
