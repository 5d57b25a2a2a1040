//! Pending queue and durable buffer behind the debounce window.

use std::mem;
use std::sync::Mutex;
use wacore::types::message::NormalizedMessage;

#[derive(Debug, Default)]
struct PendingQueue {
    messages: Vec<NormalizedMessage>,
    debounce_armed: bool,
}

#[derive(Debug, Default)]
pub struct DeliveryBuffer {
    pending: Mutex<PendingQueue>,
    durable: Mutex<Vec<NormalizedMessage>>,
}

impl DeliveryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a message for the next batch and records it durably.
    ///
    /// Returns `true` when the caller must arm the debounce timer. At most one
    /// caller sees `true` until the next [`take_pending`](Self::take_pending).
    pub fn enqueue(&self, message: NormalizedMessage) -> bool {
        let mut pending = self.pending.lock().expect("Mutex should not be poisoned");
        self.durable
            .lock()
            .expect("Mutex should not be poisoned")
            .push(message.clone());
        pending.messages.push(message);

        if !pending.debounce_armed && !pending.messages.is_empty() {
            pending.debounce_armed = true;
            true
        } else {
            false
        }
    }

    /// Takes the pending batch and disarms the debounce marker in one step.
    pub fn take_pending(&self) -> Vec<NormalizedMessage> {
        let mut pending = self.pending.lock().expect("Mutex should not be poisoned");
        pending.debounce_armed = false;
        mem::take(&mut pending.messages)
    }

    pub fn pending(&self) -> Vec<NormalizedMessage> {
        self.pending
            .lock()
            .expect("Mutex should not be poisoned")
            .messages
            .clone()
    }

    pub fn is_debounce_armed(&self) -> bool {
        self.pending
            .lock()
            .expect("Mutex should not be poisoned")
            .debounce_armed
    }

    pub fn durable(&self) -> Vec<NormalizedMessage> {
        self.durable
            .lock()
            .expect("Mutex should not be poisoned")
            .clone()
    }

    /// Strips undefined fields in place and returns the cleaned buffer.
    pub fn clean_durable(&self) -> Vec<NormalizedMessage> {
        let mut durable = self.durable.lock().expect("Mutex should not be poisoned");
        for message in durable.iter_mut() {
            message.strip_undefined();
        }
        durable.clone()
    }

    /// Puts messages saved by a previous session in front of the buffer.
    pub fn seed_durable(&self, saved: Vec<NormalizedMessage>) {
        let mut durable = self.durable.lock().expect("Mutex should not be poisoned");
        let current = mem::replace(&mut *durable, saved);
        durable.extend(current);
    }
}
