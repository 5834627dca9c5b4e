//! At most one completion round-trip at a time.
//!
//! [`ProcessingCoordinator::start`] validates the snapshot, builds the prompt
//! and spawns the provider call; the result comes back to the pipeline as a
//! [`PipelineMsg::Completed`] message and is claimed with
//! [`ProcessingCoordinator::finish`]. A second start while a session is live
//! fails with [`ProcessingError::Busy`]; nothing is queued.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use scribe_providers::CompletionProvider;
use scribe_types::{
    AppId, FieldHandle, ProcessingError, SelectionSpan, SessionId, Settings, TriggerMethod,
};
use tokio::sync::mpsc;

use crate::pipeline::PipelineMsg;
use crate::surface::AnimationHost;

/// What to do with the generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SessionKind {
    /// Replace the whole field.
    Replace,
    /// Offer reply suggestions that replace the trigger.
    SmartReply,
    /// Offer rewrites that replace the matched text.
    ToneRewrite,
    /// Splice a single result into the captured selection.
    Selection(SelectionSpan),
}

#[derive(Debug, Clone)]
pub(crate) struct ProcessingRequest {
    pub(crate) kind: SessionKind,
    /// The field text the trigger was matched in.
    pub(crate) source_text: String,
    pub(crate) matched_trigger: String,
    pub(crate) field: FieldHandle,
    pub(crate) app: AppId,
}

#[derive(Debug, Clone)]
pub(crate) struct ProcessingSession {
    pub(crate) id: SessionId,
    pub(crate) kind: SessionKind,
    pub(crate) source_text: String,
    pub(crate) matched_trigger: String,
    pub(crate) prompt: String,
    pub(crate) field: FieldHandle,
    pub(crate) app: AppId,
    pub(crate) started_at: Instant,
}

pub(crate) struct ProcessingCoordinator {
    provider: Arc<dyn CompletionProvider>,
    animation: Arc<dyn AnimationHost>,
    tx: mpsc::UnboundedSender<PipelineMsg>,
    session: Option<ProcessingSession>,
    last_id: SessionId,
}

impl ProcessingCoordinator {
    pub(crate) fn new(
        provider: Arc<dyn CompletionProvider>,
        animation: Arc<dyn AnimationHost>,
        tx: mpsc::UnboundedSender<PipelineMsg>,
    ) -> Self {
        Self {
            provider,
            animation,
            tx,
            session: None,
            last_id: SessionId::new(0),
        }
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.session.is_some()
    }

    #[cfg(test)]
    pub(crate) fn session(&self) -> Option<&ProcessingSession> {
        self.session.as_ref()
    }

    /// Validate, build the prompt and spawn the provider call.
    ///
    /// Checks run in order: busy, feature and input method, credential, offline.
    /// `build_prompt` only runs once every check has passed.
    pub(crate) fn start(
        &mut self,
        settings: &Settings,
        request: ProcessingRequest,
        build_prompt: impl FnOnce(&Settings) -> String,
    ) -> Result<SessionId, ProcessingError> {
        if self.session.is_some() {
            return Err(ProcessingError::Busy);
        }
        let service = &settings.service;
        if !service.enabled || service.trigger_method != TriggerMethod::Observer {
            return Err(ProcessingError::Disabled);
        }
        let credentials =
            settings
                .provider
                .credentials()
                .ok_or(ProcessingError::MissingCredential {
                    provider: settings.provider.kind,
                })?;
        if service.offline {
            return Err(ProcessingError::OfflineModeActive);
        }

        let prompt = build_prompt(settings);
        let id = self.last_id.next();
        self.last_id = id;

        tracing::info!(
            session = %id,
            trigger = %request.matched_trigger,
            app = %request.app,
            provider = credentials.provider().as_str(),
            "Starting completion"
        );
        if service.processing_indicator {
            self.animation.show_processing();
        }

        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        let task_prompt = prompt.clone();
        tokio::spawn(async move {
            let call = async { provider.complete(&credentials, &task_prompt).await };
            let result = match AssertUnwindSafe(call).catch_unwind().await {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(err)) => Err(ProcessingError::Provider(err.to_string())),
                Err(payload) => Err(ProcessingError::Unexpected(panic_message(payload.as_ref()))),
            };
            // The pipeline is gone when this fails; nothing is left to notify.
            let _ = tx.send(PipelineMsg::Completed {
                session: id,
                result,
            });
        });

        self.session = Some(ProcessingSession {
            id,
            kind: request.kind,
            source_text: request.source_text,
            matched_trigger: request.matched_trigger,
            prompt,
            field: request.field,
            app: request.app,
            started_at: Instant::now(),
        });
        Ok(id)
    }

    /// Claim the live session for a completion message.
    ///
    /// Always clears the slot and hides the indicator when `id` matches.
    pub(crate) fn finish(&mut self, id: SessionId) -> Option<ProcessingSession> {
        match self.session.take() {
            Some(session) if session.id == id => {
                self.animation.hide_processing();
                tracing::debug!(
                    session = %id,
                    elapsed_ms = session.started_at.elapsed().as_millis() as u64,
                    prompt_chars = session.prompt.chars().count(),
                    "Completion finished"
                );
                Some(session)
            }
            other => {
                tracing::warn!(session = %id, "Completion for unknown session ignored");
                self.session = other;
                None
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
