use serde::Serialize;
use std::fmt;

/// Identity of one (chat, sender) pair. Scopes both cache tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConversationKey {
    chat_id: String,
    user_id: String,
}

impl ConversationKey {
    /// Build a key from raw host identifiers, stripping namespace decorations
    /// (host suffixes such as `@chatroom` and stray `@` markers). Everything
    /// else, underscores included, is part of the identity.
    pub fn new(session_id: &str, user_id: &str) -> Self {
        Self {
            chat_id: sanitize_id(session_id),
            user_id: sanitize_id(user_id),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filesum_{}_{}", self.chat_id, self.user_id)
    }
}

/// Domain suffixes the messaging host appends to chat and user ids
const HOST_SUFFIXES: [&str; 2] = ["@chatroom", "@openim"];

fn sanitize_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let base = HOST_SUFFIXES
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .unwrap_or(trimmed);
    let cleaned = base.replace('@', "");
    if cleaned.is_empty() {
        trimmed.to_string()
    } else {
        cleaned
    }
}
