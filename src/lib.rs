// Core types and collaborator traits live in wacore
pub use wacore::{retry, store::traits};

pub mod types {
    pub use wacore::types::*;
}

pub mod config;
pub mod error;
pub mod lid_pn_cache;
pub mod message;
pub mod runtime;
pub mod store;

pub use config::IngestConfig;
pub use error::IngestError;
pub use lid_pn_cache::{
    LidPnCache, clear_resolve_phone_cache, get_resolve_phone_cache_size,
    resolve_phone_from_chat_id,
};
pub use message::{CallbackId, ListenerHandle, MessagePipeline, PipelineBuilder};
