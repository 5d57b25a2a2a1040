//! Types for LID (Linked ID) to phone number lookups.

use serde::{Deserialize, Serialize};

/// Answer from a client's LID lookup capability.
///
/// Only `phone_number` matters for resolution; an empty or missing number is
/// treated the same as "unresolvable".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnLidEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl PnLidEntry {
    pub fn new(lid: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            lid: Some(lid.into()),
            phone_number: Some(phone_number.into()),
        }
    }

    /// The phone number, if the lookup produced a non-empty one.
    pub fn into_phone(self) -> Option<String> {
        self.phone_number.filter(|p| !p.is_empty())
    }
}
