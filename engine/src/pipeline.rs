//! The trigger pipeline.
//!
//! One task owns every piece of mutable state. It consumes field events from
//! the [`TextSurface`](crate::TextSurface) and messages from its own channel: provider
//! completions, undo timer expiry, and commands sent by the UI through a
//! [`PipelineHandle`]. Events are handled strictly in arrival order.
//!
//! Text events run through a fixed chain of gates:
//!
//! 1. pause switch, service switch and app blacklist
//! 2. `@off` / `@on` toggle
//! 3. shortcut expansion
//! 4. trigger matching
//! 5. the anti-loop check: text identical to the last processed text is skipped
//!
//! Selection events go to the selection menu instead.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use scribe_config::ConfigStore;
use scribe_providers::CompletionProvider;
use scribe_types::{
    AppId, BuiltInTrigger, FieldEvent, FieldHandle, MutationRecord, ProcessingError, SessionId,
    Settings, ShortcutDefinition, TriggerDefinition, TriggerMethod, strip_suffix_trimmed,
    substring_before_last,
};
use tokio::sync::{mpsc, watch};

use crate::coordinator::{ProcessingCoordinator, ProcessingRequest, ProcessingSession, SessionKind};
use crate::matcher::{TriggerMatch, TriggerMatcher};
use crate::mutation::{MutationEngine, MutationMode, MutationOutcome};
use crate::prompt::{
    self, DEFAULT_SMART_REPLY_INSTRUCTIONS, DEFAULT_TONE_REWRITE_INSTRUCTIONS,
};
use crate::registry::TriggerRegistry;
use crate::selection::{
    SMART_REPLY_ON_SELECTION_MESSAGE, SelectionRefusal, SelectionScopedProcessor,
    TEXT_UPDATED_MESSAGE, TRIGGER_NOT_FOUND_MESSAGE,
};
use crate::shortcuts::ShortcutExpander;
use crate::surface::{Hosts, SuggestionKind, SuggestionList};
use crate::toggle::{AppToggleGate, ToggleDecision};
use crate::undo::UndoRedoController;

pub const NO_SUGGESTIONS_MESSAGE: &str = "No suggestions found";
pub const NO_REWRITES_MESSAGE: &str = "Could not generate rewrites";
pub const NO_COMMANDS_MESSAGE: &str = "No commands available";
pub const COPIED_MESSAGE: &str = "Could not write to the field, result copied to clipboard";

#[derive(Debug)]
pub(crate) enum PipelineMsg {
    Completed {
        session: SessionId,
        result: Result<String, ProcessingError>,
    },
    UndoExpired {
        generation: u64,
    },
    Command(Command),
}

/// Something the user did in the overlay UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    ChooseSuggestion(usize),
    DismissSuggestions,
    ApplySelectionTrigger(String),
    Undo,
    Redo,
    DismissUndo,
    BeginUndoDrag,
    EndUndoDrag { x: i32, y: i32 },
    Shutdown,
}

/// Sends UI commands to a running [`Pipeline`].
///
/// Cheap to clone. Commands sent after the pipeline stopped are dropped.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    tx: mpsc::UnboundedSender<PipelineMsg>,
}

impl PipelineHandle {
    fn send(&self, command: Command) {
        if self.tx.send(PipelineMsg::Command(command)).is_err() {
            tracing::debug!("Command sent to stopped pipeline");
        }
    }

    /// Pick entry `index` of the suggestion list on screen.
    pub fn choose_suggestion(&self, index: usize) {
        self.send(Command::ChooseSuggestion(index));
    }

    pub fn dismiss_suggestions(&self) {
        self.send(Command::DismissSuggestions);
    }

    /// Run `trigger` over the current selection.
    pub fn apply_selection_trigger(&self, trigger: impl Into<String>) {
        self.send(Command::ApplySelectionTrigger(trigger.into()));
    }

    pub fn undo(&self) {
        self.send(Command::Undo);
    }

    pub fn redo(&self) {
        self.send(Command::Redo);
    }

    pub fn dismiss_undo(&self) {
        self.send(Command::DismissUndo);
    }

    pub fn begin_undo_drag(&self) {
        self.send(Command::BeginUndoDrag);
    }

    pub fn end_undo_drag(&self, x: i32, y: i32) {
        self.send(Command::EndUndoDrag { x, y });
    }

    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }
}

/// Temporary pause, e.g. while a settings screen is open. Not persisted.
#[derive(Debug, Clone, Default)]
pub struct PauseSwitch(Arc<AtomicBool>);

impl PauseSwitch {
    pub fn set_paused(&self, paused: bool) {
        self.0.store(paused, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Suggestions on screen and where a choice goes.
#[derive(Debug)]
struct SuggestionMenu {
    field: FieldHandle,
    app: AppId,
    /// Replaced, last occurrence only, by the chosen item.
    target: String,
    items: Vec<String>,
}

pub struct Pipeline {
    hosts: Hosts,
    store: Arc<dyn ConfigStore>,
    settings: watch::Receiver<Arc<Settings>>,
    triggers: watch::Receiver<Arc<Vec<TriggerDefinition>>>,
    shortcuts: watch::Receiver<Arc<Vec<ShortcutDefinition>>>,
    pause: PauseSwitch,
    toggle: AppToggleGate,
    coordinator: ProcessingCoordinator,
    mutation: MutationEngine,
    undo: UndoRedoController,
    selection: SelectionScopedProcessor,
    menu: Option<SuggestionMenu>,
    last_processed: Option<String>,
    tx: mpsc::UnboundedSender<PipelineMsg>,
    rx: mpsc::UnboundedReceiver<PipelineMsg>,
}

impl Pipeline {
    pub fn new(
        hosts: Hosts,
        store: Arc<dyn ConfigStore>,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            settings: store.settings(),
            triggers: store.triggers(),
            shortcuts: store.shortcuts(),
            pause: PauseSwitch::default(),
            toggle: AppToggleGate,
            coordinator: ProcessingCoordinator::new(provider, Arc::clone(&hosts.animation), tx.clone()),
            mutation: MutationEngine::new(Arc::clone(&hosts.surface), Arc::clone(&hosts.clipboard)),
            undo: UndoRedoController::new(
                Arc::clone(&hosts.surface),
                Arc::clone(&hosts.overlay),
                Arc::clone(&store),
                tx.clone(),
            ),
            selection: SelectionScopedProcessor::new(Arc::clone(&hosts.overlay)),
            menu: None,
            last_processed: None,
            hosts,
            store,
            tx,
            rx,
        }
    }

    #[must_use]
    pub fn handle(&self) -> PipelineHandle {
        PipelineHandle {
            tx: self.tx.clone(),
        }
    }

    #[must_use]
    pub fn pause_switch(&self) -> PauseSwitch {
        self.pause.clone()
    }

    /// True while a provider round-trip is outstanding.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.coordinator.is_busy()
    }

    /// Consume events and messages until shutdown or the event stream ends.
    ///
    /// When events end, an in-flight completion is still applied.
    pub async fn run(mut self) {
        let mut events = self.hosts.surface.events();
        tracing::info!("Pipeline started");
        loop {
            tokio::select! {
                Some(msg) = self.rx.recv() => {
                    if self.handle_message(msg).await.is_break() {
                        break;
                    }
                }
                event = events.next() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        tracing::info!("Field events ended");
                        self.settle().await;
                        break;
                    }
                },
            }
        }
        self.close();
    }

    /// Handle queued messages until no completion is outstanding.
    pub async fn settle(&mut self) {
        loop {
            let msg = if self.coordinator.is_busy() {
                self.rx.recv().await
            } else {
                self.rx.try_recv().ok()
            };
            let Some(msg) = msg else {
                return;
            };
            if self.handle_message(msg).await.is_break() {
                return;
            }
        }
    }

    fn close(&mut self) {
        self.undo.dismiss();
        self.selection.clear();
        if self.menu.take().is_some() {
            self.hosts.overlay.hide_suggestions();
        }
        tracing::info!("Pipeline stopped");
    }

    fn snapshot(&self) -> Arc<Settings> {
        Arc::clone(&self.settings.borrow())
    }

    fn registry(&self) -> TriggerRegistry {
        TriggerRegistry::new(Arc::clone(&self.triggers.borrow()))
    }

    /// Live field text, or what the event carried when the field can't be read.
    fn read_text(&self, field: &FieldHandle) -> String {
        self.hosts
            .surface
            .read_text(field)
            .unwrap_or_else(|_| field.cached_text().to_string())
    }

    fn notify(&self, message: &str, force_show: bool) {
        self.hosts
            .notifier
            .notify(&format!("Scribe: {message}"), force_show);
    }

    fn report(&self, err: &ProcessingError) {
        if err.is_silent() {
            tracing::debug!("Trigger not processed: {err}");
        } else {
            tracing::warn!("Processing failed: {err}");
            self.hosts.notifier.notify(&err.user_message(), true);
        }
    }

    pub async fn handle_event(&mut self, event: FieldEvent) {
        let settings = self.snapshot();
        if self.pause.is_paused() {
            tracing::trace!(kind = event.kind(), "Paused, event ignored");
            return;
        }
        let service = &settings.service;
        if !service.enabled || service.trigger_method != TriggerMethod::Observer {
            tracing::trace!(kind = event.kind(), "Service off, event ignored");
            return;
        }
        if service.is_blacklisted(event.app()) {
            tracing::debug!(app = %event.app(), "Blacklisted app, event ignored");
            return;
        }

        match event {
            FieldEvent::TextChanged { field, app } | FieldEvent::Focused { field, app } => {
                let text = self.read_text(&field);
                self.handle_text(&settings, field, app, text).await;
            }
            FieldEvent::SelectionChanged {
                field,
                app,
                start,
                end,
            } => {
                let text = self.read_text(&field);
                let registry = self.registry();
                self.selection
                    .on_selection_changed(&settings, &registry, field, app, &text, (start, end));
            }
        }
    }

    async fn handle_text(&mut self, settings: &Settings, field: FieldHandle, app: AppId, text: String) {
        if text.is_empty() {
            return;
        }

        match self.toggle.evaluate(&settings.service, &text) {
            ToggleDecision::Pass => {}
            ToggleDecision::Suppressed => {
                tracing::trace!(app = %app, "Turned off, text ignored");
                return;
            }
            decision @ ToggleDecision::Switch { .. } => {
                self.apply_toggle(&field, &decision);
                return;
            }
        }

        if self.last_processed.as_deref() == Some(text.as_str()) {
            tracing::debug!(field = %field.id(), "Text already processed, skipping");
            return;
        }

        let shortcuts = Arc::clone(&self.shortcuts.borrow());
        if let Some(expansion) = ShortcutExpander::new(&shortcuts).expand(&text) {
            tracing::debug!(shortcut = expansion.shortcut.trigger(), field = %field.id(), "Expanding shortcut");
            let outcome = self.mutation.apply_instant(&field, &expansion.text);
            self.after_mutation(settings, &field, &text, &expansion.text, outcome);
            return;
        }

        let registry = self.registry();
        let Some(matched) = TriggerMatcher::new(settings, &registry).find(&text) else {
            return;
        };

        tracing::debug!(trigger = matched.trigger(), field = %field.id(), app = %app, "Trigger matched");
        self.fire(settings, &registry, matched, field, app, text);
    }

    fn apply_toggle(&mut self, field: &FieldHandle, decision: &ToggleDecision) {
        let ToggleDecision::Switch { active, text } = decision else {
            return;
        };
        if let Err(err) = self.store.set_app_active(*active) {
            tracing::warn!("Failed to persist app toggle: {err}");
        }
        if !self.mutation.apply_instant(field, text).delivered() {
            tracing::warn!(field = %field.id(), "Could not remove toggle command from field");
        }
        tracing::info!(active, "App toggled");
        if let Some(message) = decision.message() {
            self.notify(message, true);
        }
    }

    fn fire(
        &mut self,
        settings: &Settings,
        registry: &TriggerRegistry,
        matched: TriggerMatch,
        field: FieldHandle,
        app: AppId,
        text: String,
    ) {
        let (kind, trigger) = match matched {
            TriggerMatch::Custom(def) => {
                let source = strip_suffix_trimmed(&text, def.trigger())
                    .unwrap_or(text.trim())
                    .to_string();
                let request = ProcessingRequest {
                    kind: SessionKind::Replace,
                    source_text: text.clone(),
                    matched_trigger: def.trigger().to_string(),
                    field,
                    app,
                };
                self.start(settings, request, move |_| prompt::custom(def.instruction(), &source));
                return;
            }
            TriggerMatch::BuiltIn { kind, trigger } => {
                if !self.hosts.overlay.can_show_overlay() {
                    self.notify(
                        &format!("Allow drawing over other apps to use {kind}"),
                        true,
                    );
                    return;
                }
                (kind, trigger)
            }
        };

        match kind {
            BuiltInTrigger::SmartReply => {
                let surface = Arc::clone(&self.hosts.surface);
                let context_field = field.clone();
                let request = ProcessingRequest {
                    kind: SessionKind::SmartReply,
                    source_text: text,
                    matched_trigger: trigger,
                    field,
                    app,
                };
                self.start(settings, request, move |settings| {
                    prompt::smart_reply(
                        &surface.screen_context(&context_field),
                        settings.smart_reply.instructions(DEFAULT_SMART_REPLY_INSTRUCTIONS),
                    )
                });
            }
            BuiltInTrigger::ToneRewrite => {
                let source = substring_before_last(&text, &trigger).to_string();
                if source.is_empty() {
                    self.notify(&format!("Type something before {trigger}"), true);
                    return;
                }
                let request = ProcessingRequest {
                    kind: SessionKind::ToneRewrite,
                    source_text: text,
                    matched_trigger: trigger,
                    field,
                    app,
                };
                self.start(settings, request, move |settings| {
                    prompt::tone_rewrite(
                        &source,
                        settings.tone_rewrite.instructions(DEFAULT_TONE_REWRITE_INSTRUCTIONS),
                    )
                });
            }
            BuiltInTrigger::AllMenu => {
                self.last_processed = Some(text);
                let entries = registry.all_menu_entries(settings);
                self.offer(SuggestionKind::AllMenu, field, app, trigger, entries, NO_COMMANDS_MESSAGE);
            }
            BuiltInTrigger::Search => {
                let query = substring_before_last(&text, &trigger).to_string();
                if query.is_empty() {
                    self.notify(&format!("Type something before {trigger}"), true);
                    return;
                }
                self.last_processed = Some(text);
                if let Some(url) = prompt::search_url(&settings.search, &query) {
                    tracing::info!(engine = %settings.search.engine, "Opening search");
                    self.hosts.overlay.show_search(&query, &url);
                }
            }
        }
    }

    fn start(
        &mut self,
        settings: &Settings,
        request: ProcessingRequest,
        build_prompt: impl FnOnce(&Settings) -> String,
    ) {
        let text = request.source_text.clone();
        match self.coordinator.start(settings, request, build_prompt) {
            Ok(_) => self.last_processed = Some(text),
            Err(ProcessingError::Busy) => {
                tracing::debug!("Completion in flight, trigger dropped");
            }
            Err(err) => {
                self.last_processed = Some(text);
                self.report(&err);
            }
        }
    }

    async fn handle_message(&mut self, msg: PipelineMsg) -> ControlFlow<()> {
        match msg {
            PipelineMsg::Completed { session, result } => {
                if let Some(session) = self.coordinator.finish(session) {
                    self.complete(session, result).await;
                }
            }
            PipelineMsg::UndoExpired { generation } => self.undo.on_expired(generation),
            PipelineMsg::Command(command) => return self.handle_command(command).await,
        }
        ControlFlow::Continue(())
    }

    async fn complete(&mut self, session: ProcessingSession, result: Result<String, ProcessingError>) {
        let generated = match result {
            Ok(text) => text,
            Err(err) => {
                self.report(&err);
                return;
            }
        };
        let settings = self.snapshot();

        match session.kind {
            SessionKind::Replace => {
                let original = self.read_text(&session.field);
                let outcome = self
                    .mutation
                    .apply(&session.field, &generated, mutation_mode(&settings))
                    .await;
                self.after_mutation(&settings, &session.field, &original, &generated, outcome);
            }
            SessionKind::SmartReply => {
                let items = prompt::parse_suggestions(&generated);
                self.offer(
                    SuggestionKind::SmartReply,
                    session.field,
                    session.app,
                    session.matched_trigger,
                    items,
                    NO_SUGGESTIONS_MESSAGE,
                );
            }
            SessionKind::ToneRewrite => {
                let items = prompt::parse_suggestions(&generated);
                self.offer(
                    SuggestionKind::ToneRewrite,
                    session.field,
                    session.app,
                    session.source_text,
                    items,
                    NO_REWRITES_MESSAGE,
                );
            }
            SessionKind::Selection(span) => {
                let spliced = span.splice(generated.trim());
                let outcome = self.mutation.apply_instant(span.field(), &spliced);
                if self.after_mutation(&settings, span.field(), span.full_text(), &spliced, outcome) {
                    self.notify(TEXT_UPDATED_MESSAGE, false);
                }
            }
        }
    }

    /// Record undo for a landed write. True when the field holds `generated`.
    fn after_mutation(
        &mut self,
        settings: &Settings,
        field: &FieldHandle,
        original: &str,
        generated: &str,
        outcome: MutationOutcome,
    ) -> bool {
        match outcome {
            MutationOutcome::Written | MutationOutcome::Pasted => {
                if settings.undo_redo.enabled {
                    self.undo.show(
                        MutationRecord::new(original, generated, field.clone()),
                        settings.undo_redo.display_position(),
                    );
                }
                true
            }
            MutationOutcome::Copied => {
                self.notify(COPIED_MESSAGE, true);
                false
            }
            MutationOutcome::Failed => {
                self.report(&ProcessingError::WriteFailed);
                false
            }
        }
    }

    fn offer(
        &mut self,
        kind: SuggestionKind,
        field: FieldHandle,
        app: AppId,
        target: String,
        items: Vec<String>,
        empty_message: &str,
    ) {
        if items.is_empty() {
            self.notify(empty_message, false);
            return;
        }
        tracing::debug!(?kind, count = items.len(), "Showing suggestions");
        self.hosts.overlay.show_suggestions(&SuggestionList {
            kind,
            items: items.clone(),
        });
        self.menu = Some(SuggestionMenu {
            field,
            app,
            target,
            items,
        });
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::ChooseSuggestion(index) => self.choose_suggestion(index).await,
            Command::DismissSuggestions => {
                if self.menu.take().is_some() {
                    self.hosts.overlay.hide_suggestions();
                }
            }
            Command::ApplySelectionTrigger(trigger) => self.apply_selection_trigger(&trigger),
            Command::Undo => {
                let restored = self.undo.record().map(|record| record.original_text().to_string());
                match self.undo.undo() {
                    // The host echoes the restored text back; it must not fire again.
                    Ok(()) => {
                        if restored.is_some() {
                            self.last_processed = restored;
                        }
                    }
                    Err(err) => self.report(&err),
                }
            }
            Command::Redo => {
                if let Err(err) = self.undo.redo() {
                    self.report(&err);
                }
            }
            Command::DismissUndo => self.undo.dismiss(),
            Command::BeginUndoDrag => self.undo.begin_drag(),
            Command::EndUndoDrag { x, y } => self.undo.end_drag(x, y),
            Command::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Put the chosen item in place of the menu target, then run the new text
    /// through the pipeline so a chosen trigger fires.
    async fn choose_suggestion(&mut self, index: usize) {
        let Some(menu) = self.menu.take() else {
            tracing::debug!(index, "No suggestions on screen");
            return;
        };
        let Some(choice) = menu.items.get(index).cloned() else {
            tracing::warn!(index, count = menu.items.len(), "Suggestion index out of range");
            self.menu = Some(menu);
            return;
        };
        self.hosts.overlay.hide_suggestions();

        let settings = self.snapshot();
        let current = self.read_text(&menu.field);
        let updated = replace_last(&current, &menu.target, &choice);
        let outcome = self
            .mutation
            .apply(&menu.field, &updated, mutation_mode(&settings))
            .await;
        if self.after_mutation(&settings, &menu.field, &current, &updated, outcome) {
            self.handle_text(&settings, menu.field, menu.app, updated).await;
        }
    }

    fn apply_selection_trigger(&mut self, trigger: &str) {
        let settings = self.snapshot();
        let registry = self.registry();
        match self.selection.plan(&settings, &registry, trigger) {
            Ok(plan) => {
                self.selection.clear();
                let span = plan.selection.span;
                let request = ProcessingRequest {
                    source_text: span.full_text().to_string(),
                    matched_trigger: trigger.to_string(),
                    field: span.field().clone(),
                    app: plan.selection.app,
                    kind: SessionKind::Selection(span),
                };
                let prompt = plan.prompt;
                if let Err(err) = self.coordinator.start(&settings, request, move |_| prompt) {
                    self.report(&err);
                }
            }
            Err(SelectionRefusal::NothingSelected) => {
                tracing::debug!(trigger, "Selection trigger without a selection");
            }
            Err(SelectionRefusal::SmartReply) => {
                self.notify(SMART_REPLY_ON_SELECTION_MESSAGE, true);
            }
            Err(SelectionRefusal::UnknownTrigger) => {
                self.notify(TRIGGER_NOT_FOUND_MESSAGE, true);
            }
        }
    }
}

fn mutation_mode(settings: &Settings) -> MutationMode {
    if settings.streaming.enabled {
        MutationMode::Streaming {
            delay: settings.streaming.delay,
        }
    } else {
        MutationMode::Instant
    }
}

/// `text` with the last occurrence of `target` replaced, or `replacement`
/// alone when `target` no longer occurs.
fn replace_last(text: &str, target: &str, replacement: &str) -> String {
    match text.rfind(target) {
        Some(idx) if !target.is_empty() => {
            let mut out = String::with_capacity(text.len() - target.len() + replacement.len());
            out.push_str(&text[..idx]);
            out.push_str(replacement);
            out.push_str(&text[idx + target.len()..]);
            out
        }
        _ => replacement.to_string(),
    }
}
