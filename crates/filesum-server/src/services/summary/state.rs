//! Per-conversation state machine of the summarization flow.
//!
//! The state itself is never stored; the controller derives it from the two
//! cache tables plus its in-flight set, then asks [`transition`] what to do.
//! Keeping the decision pure makes every rule testable without a gateway.

use crate::config::{SummaryConfig, TriggerMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No pending file, no cached content
    Idle,
    /// A file was received and waits for its trigger
    FilePending,
    /// A summary was delivered and its content is still cached.
    /// `file_pending` is set when a newer upload is already queued.
    Summarized { file_pending: bool },
    /// A gateway exchange for this key is outstanding
    Answering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent<'a> {
    FileReceived,
    Text(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Not ours; let the host pass the event on
    Decline,
    /// Store the upload as the pending file, summarizing immediately in direct chats
    QueueFile { summarize_now: bool },
    /// Summarize the pending file
    Summarize,
    /// Follow-up question against cached content
    Answer { question: String },
    /// Question prefix with no question behind it
    AskForQuestion,
    /// Follow-up question but nothing is cached
    RejectExpired,
    /// A gateway exchange for this key is still running
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State the conversation lands in once the effect has completed successfully
    pub next: SessionState,
    pub effect: Effect,
}

/// Trigger configuration the transition function needs.
#[derive(Debug, Clone)]
pub struct TriggerRules {
    pub enabled: bool,
    pub group_enabled: bool,
    pub qa_prefix: String,
    pub trigger_keyword: String,
    pub trigger_match: TriggerMatch,
}

impl From<&SummaryConfig> for TriggerRules {
    fn from(config: &SummaryConfig) -> Self {
        Self {
            enabled: config.enabled,
            group_enabled: config.group,
            qa_prefix: config.qa_prefix.clone(),
            trigger_keyword: config.trigger_keyword.clone(),
            trigger_match: config.trigger_match,
        }
    }
}

impl TriggerRules {
    pub fn is_trigger(&self, text: &str) -> bool {
        match self.trigger_match {
            TriggerMatch::Exact => text.trim() == self.trigger_keyword,
            TriggerMatch::Contains => text.contains(&self.trigger_keyword),
        }
    }

    /// Question text after the prefix, with a leading colon dropped.
    /// None when the message is not a follow-up question at all.
    pub fn question<'a>(&self, text: &'a str) -> Option<&'a str> {
        let rest = text.strip_prefix(self.qa_prefix.as_str())?;
        Some(rest.trim().trim_start_matches([':', '：']).trim())
    }
}

pub fn transition(
    state: SessionState,
    event: FlowEvent<'_>,
    is_group: bool,
    rules: &TriggerRules,
) -> Transition {
    let stay = |effect| Transition { next: state, effect };

    if !rules.enabled || (is_group && !rules.group_enabled) {
        return stay(Effect::Decline);
    }

    if state == SessionState::Answering {
        // Anything we would otherwise act on waits; unrelated chatter still passes through
        let ours = match event {
            FlowEvent::FileReceived => true,
            FlowEvent::Text(text) => rules.question(text).is_some() || rules.is_trigger(text),
        };
        return stay(if ours { Effect::Busy } else { Effect::Decline });
    }

    match event {
        FlowEvent::FileReceived if is_group => Transition {
            next: match state {
                SessionState::Summarized { .. } => SessionState::Summarized { file_pending: true },
                _ => SessionState::FilePending,
            },
            effect: Effect::QueueFile {
                summarize_now: false,
            },
        },
        FlowEvent::FileReceived => Transition {
            next: SessionState::Summarized {
                file_pending: false,
            },
            effect: Effect::QueueFile {
                summarize_now: true,
            },
        },
        FlowEvent::Text(text) => {
            if let Some(question) = rules.question(text) {
                return match state {
                    SessionState::Summarized { .. } if question.is_empty() => {
                        stay(Effect::AskForQuestion)
                    }
                    SessionState::Summarized { .. } => Transition {
                        next: SessionState::Answering,
                        effect: Effect::Answer {
                            question: question.to_string(),
                        },
                    },
                    _ => stay(Effect::RejectExpired),
                };
            }

            let has_pending = matches!(
                state,
                SessionState::FilePending | SessionState::Summarized { file_pending: true }
            );
            if rules.is_trigger(text) && has_pending {
                return Transition {
                    next: SessionState::Summarized {
                        file_pending: false,
                    },
                    effect: Effect::Summarize,
                };
            }

            // Includes a trigger keyword with nothing pending: other plugins may want it
            stay(Effect::Decline)
        }
    }
}
