//! Chat id to phone number resolution.
//!
//! Plain user JIDs carry the phone number in their user part. LIDs do not:
//! resolving one needs the client's LID lookup, which is async and may be
//! slow, so LID results are memoized. Failed or impossible lookups are cached
//! as `None` too, so every distinct LID costs at most one lookup until the
//! cache is cleared.
//!
//! The cache has no eviction and grows with the number of distinct LIDs seen.

use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use wacore::store::traits::ChatClient;
use wacore::types::jid::ChatIdKind;

type Slot = Arc<OnceCell<Option<String>>>;

#[derive(Debug, Default)]
pub struct LidPnCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl LidPnCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `chat_id` to a phone number.
    ///
    /// Never fails: `None` covers groups, broadcasts, ids without a server
    /// part and LIDs the client could not (or cannot) resolve.
    pub async fn resolve_phone_from_chat_id<C>(
        &self,
        client: &C,
        chat_id: Option<&str>,
    ) -> Option<String>
    where
        C: ChatClient + ?Sized,
    {
        let chat_id = chat_id.filter(|id| !id.is_empty())?;

        let kind = ChatIdKind::classify(chat_id);
        if kind.is_multi_party() {
            return None;
        }
        match kind {
            ChatIdKind::Lid => self.resolve_lid(client, chat_id).await,
            ChatIdKind::User(user) if !user.is_empty() => Some(user.to_string()),
            _ => None,
        }
    }

    async fn resolve_lid<C>(&self, client: &C, lid: &str) -> Option<String>
    where
        C: ChatClient + ?Sized,
    {
        // Concurrent callers for the same LID share one slot, so only one of
        // them runs the lookup.
        let slot = self
            .entries
            .lock()
            .expect("Mutex should not be poisoned")
            .entry(lid.to_string())
            .or_default()
            .clone();

        slot.get_or_init(|| async {
            let Some(lookup) = client.pn_lid_lookup() else {
                debug!("Client has no LID lookup, caching {lid} as unresolvable");
                return None;
            };
            match lookup.get_pn_lid_entry(lid).await {
                Ok(entry) => entry.into_phone(),
                Err(e) => {
                    warn!("LID lookup for {lid} failed: {e:?}");
                    None
                }
            }
        })
        .await
        .clone()
    }

    /// Number of LIDs with a settled result. Lookups still in flight are
    /// not counted.
    pub fn size(&self) -> usize {
        self.entries
            .lock()
            .expect("Mutex should not be poisoned")
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Forgets every LID. A lookup still in flight completes for its callers
    /// but its result is not cached.
    pub fn clear(&self) {
        self.entries
            .lock()
            .expect("Mutex should not be poisoned")
            .clear();
    }
}

static RESOLVE_PHONE_CACHE: Lazy<LidPnCache> = Lazy::new(LidPnCache::new);

/// [`LidPnCache::resolve_phone_from_chat_id`] on the process-wide cache.
pub async fn resolve_phone_from_chat_id<C>(client: &C, chat_id: Option<&str>) -> Option<String>
where
    C: ChatClient + ?Sized,
{
    RESOLVE_PHONE_CACHE
        .resolve_phone_from_chat_id(client, chat_id)
        .await
}

pub fn clear_resolve_phone_cache() {
    RESOLVE_PHONE_CACHE.clear();
}

pub fn get_resolve_phone_cache_size() -> usize {
    RESOLVE_PHONE_CACHE.size()
}
