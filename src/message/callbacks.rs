//! Ordered registry of message consumers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use wacore::types::events::{Delivery, MessageHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

struct CallbackRecord {
    id: CallbackId,
    callback: Option<Arc<dyn MessageHandler>>,
    remove_after_use: bool,
}

#[derive(Default)]
pub struct CallbackRegistry {
    records: RwLock<Vec<Arc<CallbackRecord>>>,
    next_id: AtomicU64,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. A record without a callback keeps its slot but is
    /// skipped on dispatch.
    pub fn push(
        &self,
        callback: Option<Arc<dyn MessageHandler>>,
        remove_after_use: bool,
    ) -> CallbackId {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.records
            .write()
            .expect("RwLock should not be poisoned")
            .push(Arc::new(CallbackRecord {
                id,
                callback,
                remove_after_use,
            }));
        id
    }

    pub fn remove(&self, id: CallbackId) -> bool {
        let mut records = self.records.write().expect("RwLock should not be poisoned");
        match records.iter().position(|r| r.id == id) {
            Some(index) => {
                records.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .expect("RwLock should not be poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<CallbackId> {
        self.records
            .read()
            .expect("RwLock should not be poisoned")
            .iter()
            .map(|r| r.id)
            .collect()
    }

    // Callbacks run on a snapshot so they may register or remove consumers
    // without deadlocking on the registry.
    fn snapshot(&self) -> Vec<Arc<CallbackRecord>> {
        self.records
            .read()
            .expect("RwLock should not be poisoned")
            .clone()
    }

    /// Delivers a batch to every consumer in registration order, then prunes
    /// the one-shot records that took part in this round.
    pub fn dispatch(&self, delivery: &Delivery) {
        let mut fired = Vec::new();

        for record in self.snapshot() {
            if let Some(callback) = &record.callback {
                callback.handle_delivery(delivery);
            }
            if record.remove_after_use {
                fired.push(record);
            }
        }

        if fired.is_empty() {
            return;
        }
        let mut records = self.records.write().expect("RwLock should not be poisoned");
        for done in fired {
            if let Some(index) = records.iter().position(|r| Arc::ptr_eq(r, &done)) {
                records.remove(index);
            }
        }
    }

    /// Delivers to every consumer without pruning anything.
    pub fn notify_all(&self, delivery: &Delivery) {
        for record in self.snapshot() {
            if let Some(callback) = &record.callback {
                callback.handle_delivery(delivery);
            }
        }
    }
}
