use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::key::ConversationKey;

// ===== INBOUND (from host runtime) =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// `content` is the path of a file already materialized on local disk
    File,
    /// `content` is the raw message text
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub is_group: bool,
    pub kind: EventKind,
    pub content: String,
}

impl InboundEvent {
    pub fn file(session_id: &str, user_id: &str, is_group: bool, path: impl Into<PathBuf>) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            is_group,
            kind: EventKind::File,
            content: path.into().to_string_lossy().to_string(),
        }
    }

    pub fn text(session_id: &str, user_id: &str, is_group: bool, text: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            is_group,
            kind: EventKind::Text,
            content: text.to_string(),
        }
    }

    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(&self.session_id, &self.user_id)
    }
}

// ===== OUTBOUND (to host runtime) =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Text,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub kind: ReplyKind,
    pub content: String,
}

/// What the host should do with the event after this plugin looked at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Not handled here, let other collaborators see the event
    Continue,
    /// Stop other collaborators but let the host's default handling run
    /// (used together with a rewritten prompt)
    Break,
    /// Handled completely, send the reply and stop
    BreakPass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOutcome {
    pub action: EventAction,
    pub reply: Option<Reply>,
    /// Synthesized prompt handed to the host pipeline (delegate mode)
    pub prompt: Option<String>,
}

impl EventOutcome {
    pub fn pass() -> Self {
        Self {
            action: EventAction::Continue,
            reply: None,
            prompt: None,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self {
            action: EventAction::BreakPass,
            reply: Some(Reply {
                kind: ReplyKind::Text,
                content: content.into(),
            }),
            prompt: None,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            action: EventAction::BreakPass,
            reply: Some(Reply {
                kind: ReplyKind::Error,
                content: content.into(),
            }),
            prompt: None,
        }
    }

    pub fn delegate(prompt: String) -> Self {
        Self {
            action: EventAction::Break,
            reply: None,
            prompt: Some(prompt),
        }
    }

    pub fn is_handled(&self) -> bool {
        self.action != EventAction::Continue
    }
}
