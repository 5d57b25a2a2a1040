pub mod filestore;
pub mod memory;
pub mod msg_store;

pub use filestore::FileSessionStorage;
pub use memory::MemorySessionStorage;
pub use msg_store::{MessageSource, MsgStore};
pub use wacore::store::error;
pub use wacore::store::traits;
