use dashmap::DashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::messages;
use super::state::{transition, Effect, FlowEvent, SessionState, TriggerRules};
use crate::config::{Settings, SummaryMode};
use crate::document::DocumentParser;
use crate::models::{ConversationKey, EventKind, EventOutcome, InboundEvent};
use crate::services::llm_service::{truncate_text, LlmProvider};
use crate::services::session_cache::{Clock, ExtractedContent, PendingFile, SessionStore};
use crate::utils::error::{ExtractError, FlowError};

/// Drives the per-conversation summarization flow.
///
/// Every failure is turned into a user-visible error reply here; nothing
/// escapes to the host adapter.
pub struct SummaryController {
    rules: TriggerRules,
    mode: SummaryMode,
    prompt: String,
    max_token_size: usize,
    store: Arc<SessionStore>,
    parser: DocumentParser,
    llm: Arc<dyn LlmProvider>,
    /// Keys with an outstanding gateway exchange
    in_flight: DashSet<ConversationKey>,
}

/// Holds a key in the in-flight set until dropped.
struct InFlight<'a> {
    set: &'a DashSet<ConversationKey>,
    key: ConversationKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

impl SummaryController {
    pub fn new(settings: &Settings, llm: Arc<dyn LlmProvider>, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(SessionStore::new(
            settings.cache.file_ttl(),
            settings.cache.content_ttl(),
            clock,
        ));

        Self {
            rules: TriggerRules::from(&settings.summary),
            mode: settings.summary.mode,
            prompt: settings.summary.prompt.clone(),
            max_token_size: settings.summary.max_token_size,
            store,
            parser: DocumentParser::new(settings.summary.max_file_size_kb, &settings.extractor),
            llm,
            in_flight: DashSet::new(),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Current state of a conversation, derived from the caches and the in-flight set.
    pub fn state_of(&self, key: &ConversationKey) -> SessionState {
        if self.in_flight.contains(key) {
            return SessionState::Answering;
        }

        let file_pending = self
            .store
            .pending
            .get(key)
            .is_some_and(|pending| !pending.processed);
        let summarized = self
            .store
            .content
            .get(key)
            .is_some_and(|content| content.processed);

        match (summarized, file_pending) {
            (true, file_pending) => SessionState::Summarized { file_pending },
            (false, true) => SessionState::FilePending,
            (false, false) => SessionState::Idle,
        }
    }

    pub async fn handle(&self, event: &InboundEvent) -> EventOutcome {
        let key = event.key();
        let state = self.state_of(&key);
        let flow_event = match event.kind {
            EventKind::File => FlowEvent::FileReceived,
            EventKind::Text => FlowEvent::Text(&event.content),
        };

        let step = transition(state, flow_event, event.is_group, &self.rules);
        debug!(
            "[{}] {:?} + {:?} -> {:?} ({:?})",
            key, state, event.kind, step.next, step.effect
        );

        match step.effect {
            Effect::Decline => EventOutcome::pass(),
            Effect::Busy => EventOutcome::text(messages::BUSY),
            Effect::QueueFile { summarize_now } => {
                self.store.pending.put(&key, PendingFile::new(&event.content));
                info!("[{}] File queued: {}", key, event.content);
                if summarize_now {
                    self.run(&key, self.summarize(&key)).await
                } else {
                    EventOutcome::pass()
                }
            }
            Effect::Summarize => self.run(&key, self.summarize(&key)).await,
            Effect::Answer { question } => self.run(&key, self.answer(&key, &question)).await,
            Effect::AskForQuestion => EventOutcome::text(messages::question_usage(&self.rules.qa_prefix)),
            Effect::RejectExpired => {
                info!("[{}] Follow-up question without cached content", key);
                EventOutcome::error(FlowError::ContentExpired.user_message())
            }
        }
    }

    /// Run one flow step with the key marked in-flight; errors become error replies.
    async fn run(
        &self,
        key: &ConversationKey,
        step: impl std::future::Future<Output = Result<EventOutcome, FlowError>>,
    ) -> EventOutcome {
        if !self.in_flight.insert(key.clone()) {
            return EventOutcome::text(messages::BUSY);
        }
        let _guard = InFlight {
            set: &self.in_flight,
            key: key.clone(),
        };

        match step.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("[{}] {}", key, e);
                EventOutcome::error(e.user_message())
            }
        }
    }

    async fn summarize(&self, key: &ConversationKey) -> Result<EventOutcome, FlowError> {
        let pending = self.store.pending.get(key).ok_or(FlowError::FileExpired)?;
        if pending.processed {
            debug!("[{}] Pending file already being processed", key);
            return Ok(EventOutcome::text(messages::BUSY));
        }
        self.store.pending.update(key, |p| p.processed = true);

        if !pending.path.exists() {
            self.reset(key);
            return Err(FlowError::FileExpired);
        }

        let text = match self.extract(&pending.path).await {
            Ok(text) => text,
            Err(e) => {
                self.reset(key);
                return Err(e.into());
            }
        };
        info!("[{}] Extracted {} characters", key, text.chars().count());

        self.store.content.put(
            key,
            ExtractedContent {
                text: text.clone(),
                processed: false,
            },
        );
        let truncated = truncate_text(&text, self.max_token_size);

        if self.mode == SummaryMode::Delegate {
            self.store.content.update(key, |c| c.processed = true);
            self.finish_pending(key, &pending.path).await;
            info!("[{}] Summary prompt handed to host pipeline", key);
            return Ok(EventOutcome::delegate(format!("{}\n\n{}", self.prompt, truncated)));
        }

        let summary = self.llm.summarize(&truncated, &self.prompt).await;
        self.finish_pending(key, &pending.path).await;

        match summary {
            Ok(summary) => {
                self.store.content.update(key, |c| c.processed = true);
                info!("[{}] Summary delivered", key);
                Ok(EventOutcome::text(format!(
                    "{}{}",
                    summary,
                    messages::follow_up_hint(&self.rules.qa_prefix, self.store.content.ttl())
                )))
            }
            Err(e) => {
                // No summary was delivered, so there is nothing to ask questions about
                self.reset(key);
                Err(e.into())
            }
        }
    }

    async fn answer(&self, key: &ConversationKey, question: &str) -> Result<EventOutcome, FlowError> {
        let content = self
            .store
            .content
            .get(key)
            .filter(|c| c.processed)
            .ok_or(FlowError::ContentExpired)?;

        debug!("[{}] Answering follow-up question: {}", key, question);
        let truncated = truncate_text(&content.text, self.max_token_size);
        let answer = self.llm.answer(&truncated, question).await?;
        Ok(EventOutcome::text(answer))
    }

    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let parser = self.parser.clone();
        let path = path.to_path_buf();

        match tokio::task::spawn_blocking(move || parser.extract(&path)).await {
            Ok(result) => result,
            Err(e) => Err(ExtractError::DecodeError(format!("Extraction task failed: {}", e))),
        }
    }

    /// Back to Idle: a failed upload also ends questions about the previous document.
    fn reset(&self, key: &ConversationKey) {
        self.store.pending.remove(key);
        self.store.content.remove(key);
    }

    /// Drop the pending entry and delete the uploaded file. Deletion is best effort.
    async fn finish_pending(&self, key: &ConversationKey, path: &Path) {
        self.store.pending.remove(key);
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("[{}] Deleted {:?}", key, path),
            Err(e) => warn!("[{}] Failed to delete {:?}: {}", key, path, e),
        }
    }

    /// Purge expired cache entries every `every` until the task is aborted.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.store.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let purged = store.purge_expired();
                if purged > 0 {
                    debug!("Sweeper purged {} expired entries", purged);
                }
            }
        })
    }
}
