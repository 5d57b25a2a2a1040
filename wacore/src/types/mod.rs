pub mod events;
pub mod jid;
pub mod lid_pn;
pub mod message;

pub use events::{Delivery, MessageHandler, RELOAD_NOTICE_MESSAGE, RELOAD_NOTICE_STATUS, ReloadNotice};
pub use jid::ChatIdKind;
pub use lid_pn::PnLidEntry;
pub use message::{NormalizeOptions, NormalizedMessage, RawMessage};
