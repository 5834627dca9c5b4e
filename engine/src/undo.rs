//! Undo/redo of the most recent mutation.
//!
//! The controller is either hidden or showing one [`MutationRecord`]. Showing
//! a new record replaces the old one. Undo and redo write the original or the
//! generated text as often as the user likes; every interaction restarts the
//! auto-dismiss timer. Expiry arrives as a [`PipelineMsg::UndoExpired`]
//! carrying the timer generation, so a late message from a cancelled timer is
//! ignored.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{AbortHandle, Abortable};
use scribe_config::ConfigStore;
use scribe_types::{MutationRecord, ProcessingError};
use tokio::sync::mpsc;

use crate::mutation::write_with_refresh;
use crate::pipeline::PipelineMsg;
use crate::surface::{OverlayHost, TextSurface};

pub const UNDO_TTL: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct Shown {
    record: MutationRecord,
    timer: Option<AbortHandle>,
}

pub(crate) struct UndoRedoController {
    surface: Arc<dyn TextSurface>,
    overlay: Arc<dyn OverlayHost>,
    store: Arc<dyn ConfigStore>,
    tx: mpsc::UnboundedSender<PipelineMsg>,
    ttl: Duration,
    shown: Option<Shown>,
    generation: u64,
}

impl UndoRedoController {
    pub(crate) fn new(
        surface: Arc<dyn TextSurface>,
        overlay: Arc<dyn OverlayHost>,
        store: Arc<dyn ConfigStore>,
        tx: mpsc::UnboundedSender<PipelineMsg>,
    ) -> Self {
        Self {
            surface,
            overlay,
            store,
            tx,
            ttl: UNDO_TTL,
            shown: None,
            generation: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_shown(&self) -> bool {
        self.shown.is_some()
    }

    pub(crate) fn record(&self) -> Option<&MutationRecord> {
        self.shown.as_ref().map(|shown| &shown.record)
    }

    /// Show `record` at `position`, superseding whatever was shown.
    pub(crate) fn show(&mut self, record: MutationRecord, position: (i32, i32)) {
        self.cancel_timer();
        self.overlay.show_undo_control(position.0, position.1);
        tracing::debug!(field = %record.field().id(), "Undo control shown");
        self.shown = Some(Shown {
            record,
            timer: None,
        });
        self.restart_timer();
    }

    pub(crate) fn undo(&mut self) -> Result<(), ProcessingError> {
        self.write(|record| record.original_text())
    }

    pub(crate) fn redo(&mut self) -> Result<(), ProcessingError> {
        self.write(|record| record.generated_text())
    }

    fn write(&mut self, pick: impl Fn(&MutationRecord) -> &str) -> Result<(), ProcessingError> {
        let Some(shown) = &self.shown else {
            tracing::debug!("Undo/redo requested with nothing shown");
            return Ok(());
        };
        let result = write_with_refresh(self.surface.as_ref(), shown.record.field(), pick(&shown.record))
            .map(|_| ())
            .map_err(|err| {
                tracing::warn!(field = %shown.record.field().id(), "Undo/redo write failed: {err}");
                ProcessingError::WriteFailed
            });
        self.restart_timer();
        result
    }

    /// Hide the control and forget the record.
    pub(crate) fn dismiss(&mut self) {
        self.cancel_timer();
        if self.shown.take().is_some() {
            self.overlay.hide_undo_control();
            tracing::debug!("Undo control dismissed");
        }
    }

    /// Dragging pauses auto-dismiss.
    pub(crate) fn begin_drag(&mut self) {
        self.cancel_timer();
    }

    /// Persist where the control was dropped and resume auto-dismiss.
    pub(crate) fn end_drag(&mut self, x: i32, y: i32) {
        if let Err(err) = self.store.save_undo_position(x, y) {
            tracing::warn!("Failed to save undo control position: {err}");
        }
        if self.shown.is_some() {
            self.restart_timer();
        }
    }

    pub(crate) fn on_expired(&mut self, generation: u64) {
        if generation == self.generation && self.shown.is_some() {
            tracing::debug!("Undo control timed out");
            self.dismiss();
        }
    }

    fn cancel_timer(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(timer) = self.shown.as_mut().and_then(|shown| shown.timer.take()) {
            timer.abort();
        }
    }

    fn restart_timer(&mut self) {
        self.cancel_timer();
        let Some(shown) = self.shown.as_mut() else {
            return;
        };
        let generation = self.generation;
        let ttl = self.ttl;
        let tx = self.tx.clone();
        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        let task = async move {
            tokio::time::sleep(ttl).await;
            let _ = tx.send(PipelineMsg::UndoExpired { generation });
        };
        tokio::spawn(async move {
            let _ = Abortable::new(task, abort_registration).await;
        });
        shown.timer = Some(abort_handle);
    }
}

impl Drop for UndoRedoController {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
