//! The closed set of message kinds and their wire tags.

use std::fmt;

/// Reserved wire key holding the kind tag of every message.
pub const MSG_TYPE: &str = "msgType";

/// Discriminator identifying what a message represents.
///
/// The set is closed: peers agree on it through the symbolic tags returned
/// by [`MessageKind::tag`], never through language-level type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(clippy::exhaustive_enums)]
pub enum MessageKind {
    /// Run a command on the peer.
    Command,
    /// Declare a class interface.
    ClassDef,
    /// Open a session. Always the first message a client sends.
    NewConnection,
    /// Reply to [`MessageKind::NewConnection`] carrying the server version.
    Connected,
    /// The peer failed to handle a request.
    Exception,
}

impl MessageKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Command,
        Self::ClassDef,
        Self::NewConnection,
        Self::Connected,
        Self::Exception,
    ];

    /// Stable wire identifier of this kind.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::ClassDef => "CLASSDEF",
            Self::NewConnection => "NEWCONNECTION",
            Self::Connected => "CONNECTED",
            Self::Exception => "EXCEPTION",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
