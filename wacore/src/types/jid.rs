//! Chat identifier classification.
//!
//! Chat ids arrive as plain strings (`user@server`). Resolution only cares
//! about the server part, so this module works on `&str` rather than a parsed
//! JID type.

pub const DEFAULT_USER_SERVER: &str = "s.whatsapp.net";
pub const LEGACY_USER_SERVER: &str = "c.us";
pub const GROUP_SERVER: &str = "g.us";
pub const BROADCAST_SERVER: &str = "broadcast";
pub const HIDDEN_USER_SERVER: &str = "lid";
pub const STATUS_BROADCAST_USER: &str = "status";
pub const STATUS_BROADCAST_JID: &str = "status@broadcast";

/// What a chat id refers to, as far as phone resolution is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatIdKind<'a> {
    /// The status broadcast list.
    StatusBroadcast,
    /// A group chat (`@g.us`).
    Group,
    /// A privacy-preserving linked id (`@lid`).
    Lid,
    /// Any other `user@server` form. The user part may be empty.
    User(&'a str),
    /// No `@` at all.
    Unaddressed,
}

impl<'a> ChatIdKind<'a> {
    pub fn classify(chat_id: &'a str) -> Self {
        if chat_id == STATUS_BROADCAST_JID {
            return Self::StatusBroadcast;
        }
        if has_server(chat_id, GROUP_SERVER) {
            return Self::Group;
        }
        if has_server(chat_id, HIDDEN_USER_SERVER) {
            return Self::Lid;
        }
        match chat_id.split_once('@') {
            Some((user, _)) => Self::User(user),
            None => Self::Unaddressed,
        }
    }

    /// Groups and broadcasts never map to a single phone number.
    pub fn is_multi_party(&self) -> bool {
        matches!(self, Self::StatusBroadcast | Self::Group)
    }
}

fn has_server(chat_id: &str, server: &str) -> bool {
    chat_id
        .strip_suffix(server)
        .is_some_and(|rest| rest.ends_with('@'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_user_servers() {
        assert_eq!(ChatIdKind::classify("12345@c.us"), ChatIdKind::User("12345"));
        assert_eq!(
            ChatIdKind::classify("5511999999999@s.whatsapp.net"),
            ChatIdKind::User("5511999999999")
        );
        assert_eq!(ChatIdKind::classify("@c.us"), ChatIdKind::User(""));
    }

    #[test]
    fn test_classify_multi_party() {
        assert_eq!(
            ChatIdKind::classify("00000-111111@g.us"),
            ChatIdKind::Group
        );
        assert_eq!(
            ChatIdKind::classify("status@broadcast"),
            ChatIdKind::StatusBroadcast
        );
        assert!(ChatIdKind::classify("x@g.us").is_multi_party());
        // Only the status list is special-cased; other broadcast lists keep their user part.
        assert_eq!(
            ChatIdKind::classify("1234@broadcast"),
            ChatIdKind::User("1234")
        );
    }

    #[test]
    fn test_classify_lid_and_bare() {
        assert_eq!(ChatIdKind::classify("100000012345678@lid"), ChatIdKind::Lid);
        assert_eq!(ChatIdKind::classify("just-a-number"), ChatIdKind::Unaddressed);
        // Suffix has to follow the separator.
        assert_eq!(ChatIdKind::classify("foo@bar.lid"), ChatIdKind::User("foo"));
    }
}
