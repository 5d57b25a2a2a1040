//! Interfaces of the collaborators the pipeline drives but does not own.

use super::error::Result;
use crate::types::lid_pn::PnLidEntry;
use crate::types::message::{NormalizeOptions, NormalizedMessage, RawMessage};
use async_trait::async_trait;

/// Converts a store message into its public shape.
pub trait MessageNormalizer: Send + Sync {
    /// `None` means the message cannot be serialized yet.
    fn normalize(&self, raw: &RawMessage, options: NormalizeOptions)
    -> Option<NormalizedMessage>;
}

/// Optional client capability: resolve a LID to its phone number.
#[async_trait]
pub trait PnLidLookup: Send + Sync {
    async fn get_pn_lid_entry(&self, lid: &str) -> std::result::Result<PnLidEntry, anyhow::Error>;
}

/// A client as seen by phone resolution. Clients that cannot map LIDs to
/// phone numbers return `None`.
pub trait ChatClient: Send + Sync {
    fn pn_lid_lookup(&self) -> Option<&dyn PnLidLookup>;
}

/// Session-scoped string key/value storage that survives a reload.
pub trait SessionStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Overwrites any previous value.
    fn set_item(&self, key: &str, value: String) -> Result<()>;

    fn remove_item(&self, key: &str) -> Result<()>;
}
