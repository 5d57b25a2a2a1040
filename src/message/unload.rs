use super::MessagePipeline;
use crate::error::IngestError;
use log::{error, info};
use wacore::types::events::{Delivery, ReloadNotice};
use wacore::types::message::NormalizedMessage;

impl MessagePipeline {
    /// Teardown hook: persists the buffered messages, then tells every
    /// consumer (one-shot or not) that the session is about to reload.
    ///
    /// Consumers are notified even when persisting fails; the failure is
    /// returned afterwards. Neither queue is cleared.
    pub fn on_unload(&self) -> Result<(), IngestError> {
        let persisted = self.persist_buffered();
        if let Err(e) = &persisted {
            error!("Failed to persist buffered messages before unload: {e}");
        }

        self.inner
            .callbacks
            .notify_all(&Delivery::Reloading(ReloadNotice::default()));
        persisted
    }

    fn persist_buffered(&self) -> Result<(), IngestError> {
        let buffered = self.inner.buffer.clean_durable();
        let json = serde_json::to_string(&buffered)?;
        self.inner
            .storage
            .set_item(&self.inner.config.storage_key, json)?;
        info!(
            "Saved {} buffered message(s) under '{}'",
            buffered.len(),
            self.inner.config.storage_key
        );
        Ok(())
    }

    /// Loads messages saved by a previous session's teardown into the
    /// buffer. Returns how many were restored.
    pub fn restore_saved(&self) -> Result<usize, IngestError> {
        let Some(json) = self.inner.storage.get_item(&self.inner.config.storage_key)? else {
            return Ok(0);
        };
        let saved: Vec<NormalizedMessage> = serde_json::from_str(&json)?;
        let count = saved.len();
        self.inner.buffer.seed_durable(saved);
        info!("Restored {count} message(s) saved before the last reload");
        Ok(count)
    }
}
