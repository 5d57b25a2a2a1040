use crate::types::message::NormalizedMessage;
use serde::Serialize;
use std::sync::Arc;

pub const RELOAD_NOTICE_STATUS: i32 = -1;
pub const RELOAD_NOTICE_MESSAGE: &str = "page will be reloaded, wait and register callback again.";

/// Sent to every consumer right before the session is torn down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadNotice {
    pub status: i32,
    pub message: String,
}

impl Default for ReloadNotice {
    fn default() -> Self {
        Self {
            status: RELOAD_NOTICE_STATUS,
            message: RELOAD_NOTICE_MESSAGE.to_string(),
        }
    }
}

/// What a registered consumer receives.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// Messages coalesced within one debounce window, in completion order.
    Batch(Arc<[NormalizedMessage]>),
    /// The session is about to go away; register again afterwards.
    Reloading(ReloadNotice),
}

impl Delivery {
    pub fn messages(&self) -> Option<&[NormalizedMessage]> {
        match self {
            Delivery::Batch(batch) => Some(&batch[..]),
            Delivery::Reloading(_) => None,
        }
    }

    pub fn is_reload(&self) -> bool {
        matches!(self, Delivery::Reloading(_))
    }
}

pub trait MessageHandler: Send + Sync {
    fn handle_delivery(&self, delivery: &Delivery);
}

impl<F> MessageHandler for F
where
    F: Fn(&Delivery) + Send + Sync,
{
    fn handle_delivery(&self, delivery: &Delivery) {
        self(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_notice_shape() {
        let value = serde_json::to_value(ReloadNotice::default()).expect("notice should serialize");
        assert_eq!(value["status"], -1);
        assert_eq!(
            value["message"],
            "page will be reloaded, wait and register callback again."
        );
    }

    #[test]
    fn test_delivery_accessors() {
        let batch = Delivery::Batch(vec![NormalizedMessage::new("1", "chat")].into());
        assert_eq!(batch.messages().map(<[_]>::len), Some(1));
        assert!(!batch.is_reload());

        let reload = Delivery::Reloading(ReloadNotice::default());
        assert!(reload.messages().is_none());
        assert!(reload.is_reload());
    }
}
