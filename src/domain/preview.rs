use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::SlotKind;

/// Handle that lets a selected file be rendered before any network round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreviewReference {
    pub id: u64,
    pub slot: SlotKind,
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    live: BTreeSet<u64>,
}

/// Issues preview references and tracks which of them are still held.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, slot: SlotKind) -> PreviewLease {
        let mut state = self
            .state
            .lock()
            .expect("preview registry lock poisoned while acquiring");
        state.next_id = state.next_id.saturating_add(1);
        let id = state.next_id;
        state.live.insert(id);

        PreviewLease {
            reference: PreviewReference { id, slot },
            registry: Arc::clone(&self.state),
        }
    }

    pub fn is_live(&self, id: u64) -> bool {
        self.state
            .lock()
            .expect("preview registry lock poisoned while reading")
            .live
            .contains(&id)
    }

    pub fn live_ids(&self) -> Vec<u64> {
        self.state
            .lock()
            .expect("preview registry lock poisoned while reading")
            .live
            .iter()
            .copied()
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.state
            .lock()
            .expect("preview registry lock poisoned while reading")
            .live
            .len()
    }
}

/// Owns one live preview reference; dropping it releases the reference.
pub struct PreviewLease {
    reference: PreviewReference,
    registry: Arc<Mutex<RegistryState>>,
}

impl PreviewLease {
    pub fn reference(&self) -> PreviewReference {
        self.reference
    }
}

impl fmt::Debug for PreviewLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewLease")
            .field("reference", &self.reference)
            .finish()
    }
}

impl PartialEq for PreviewLease {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl Drop for PreviewLease {
    fn drop(&mut self) {
        if let Ok(mut state) = self.registry.lock() {
            state.live.remove(&self.reference.id);
        }
    }
}
