//! Runtime-agnostic core of the incoming-message pipeline.
//!
//! Nothing in this crate spawns tasks or sleeps: it holds the data model,
//! the traits external collaborators implement, JID classification and the
//! per-message retry state machine. The `whatsapp-ingest` crate drives these
//! on tokio.

pub mod retry;
pub mod runtime;
pub mod store;
pub mod types;
