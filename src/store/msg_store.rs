use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use wacore::types::message::RawMessage;

/// Anything that announces newly added messages.
///
/// Every subscriber sees every message added after it subscribed; nothing
/// is dropped when a subscriber falls behind.
pub trait MessageSource: Send + Sync {
    fn subscribe_added(&self) -> mpsc::UnboundedReceiver<Arc<RawMessage>>;
}

/// In-memory message store that emits an `add` notification per message.
#[derive(Debug, Default)]
pub struct MsgStore {
    messages: DashMap<String, Arc<RawMessage>>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<Arc<RawMessage>>>>,
}

impl MsgStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the message and notifies listeners. Returns how many listeners
    /// were notified.
    pub fn add(&self, message: RawMessage) -> usize {
        let message = Arc::new(message);
        self.messages.insert(message.id.clone(), message.clone());

        let mut listeners = self.listeners.lock().expect("Mutex should not be poisoned");
        listeners.retain(|tx| tx.send(message.clone()).is_ok());
        listeners.len()
    }

    pub fn get(&self, id: &str) -> Option<Arc<RawMessage>> {
        self.messages.get(id).map(|m| m.value().clone())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Subscribers whose receiving side is still alive.
    pub fn listener_count(&self) -> usize {
        let mut listeners = self.listeners.lock().expect("Mutex should not be poisoned");
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }
}

impl MessageSource for MsgStore {
    fn subscribe_added(&self) -> mpsc::UnboundedReceiver<Arc<RawMessage>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners
            .lock()
            .expect("Mutex should not be poisoned")
            .push(tx);
        rx
    }
}
