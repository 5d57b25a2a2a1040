use std::time::Duration;
use wacore::retry::RetryPolicy;
use wacore::types::message::NormalizeOptions;

/// Session storage key holding undelivered messages across a reload.
pub const SAVED_MESSAGES_KEY: &str = "saved_msgs";
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub debounce_window: Duration,
    pub retry: RetryPolicy,
    pub storage_key: String,
    pub normalize_options: NormalizeOptions,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEBOUNCE_WINDOW,
            retry: RetryPolicy::default(),
            storage_key: SAVED_MESSAGES_KEY.to_string(),
            normalize_options: NormalizeOptions::default(),
        }
    }
}
