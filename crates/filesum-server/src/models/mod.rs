pub mod event;
pub mod key;

pub use event::{EventAction, EventKind, EventOutcome, InboundEvent, Reply, ReplyKind};
pub use key::ConversationKey;
