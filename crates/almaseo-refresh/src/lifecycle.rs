//! Routes host-editor events into guard refreshes.

use std::time::Duration;

use tracing::debug;

use crate::guard::StaleResponseGuard;
use crate::types::{DraftFields, EntitySnapshot, RefreshToken, StatusSnapshot};

/// Something the surrounding editor reported.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Refresh button clicked.
    ManualRefresh,

    /// A tracked field changed; carries the unsaved values.
    FieldEdited(DraftFields),

    SaveStarted { autosave: bool },

    SaveFinished { success: bool },

    /// Tab became visible or window regained focus.
    FocusRegained,

    /// Panel is going away.
    Unmount,
}

/// What the controller did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Issued(RefreshToken),
    Debounced,
    Ignored,
    Disposed,
}

/// Owns a guard and applies the editor's refresh triggers to it.
#[derive(Debug)]
pub struct PanelController<T: EntitySnapshot = StatusSnapshot> {
    guard: StaleResponseGuard<T>,
    focus_min_interval: Duration,
    saving: bool,
}

impl<T: EntitySnapshot> PanelController<T> {
    pub const DEFAULT_FOCUS_MIN_INTERVAL: Duration = Duration::from_secs(30);

    pub fn new(guard: StaleResponseGuard<T>) -> Self {
        Self {
            guard,
            focus_min_interval: Self::DEFAULT_FOCUS_MIN_INTERVAL,
            saving: false,
        }
    }

    pub fn with_focus_min_interval(mut self, interval: Duration) -> Self {
        self.focus_min_interval = interval;
        self
    }

    pub fn guard(&self) -> &StaleResponseGuard<T> {
        &self.guard
    }

    pub fn handle(&mut self, event: EditorEvent) -> Dispatch {
        match event {
            EditorEvent::ManualRefresh => self.issue("manual"),
            EditorEvent::FieldEdited(draft) => {
                if self.guard.is_disposed() {
                    return Dispatch::Ignored;
                }
                self.guard.request_refresh_debounced("field-edit", Some(draft));
                Dispatch::Debounced
            }
            EditorEvent::SaveStarted { autosave } => {
                // Autosaves do not change the stored post the score is computed from.
                if !autosave {
                    self.saving = true;
                }
                Dispatch::Ignored
            }
            EditorEvent::SaveFinished { success } => {
                let was_saving = std::mem::take(&mut self.saving);
                if was_saving && success {
                    self.issue("post-saved")
                } else {
                    Dispatch::Ignored
                }
            }
            EditorEvent::FocusRegained => {
                let recent = self
                    .guard
                    .last_issued()
                    .is_some_and(|at| at.elapsed() < self.focus_min_interval);
                if recent {
                    debug!(
                        entity_id = self.guard.entity_id(),
                        "focus refresh skipped: recent refresh"
                    );
                    Dispatch::Ignored
                } else {
                    self.issue("visibility")
                }
            }
            EditorEvent::Unmount => {
                self.guard.dispose();
                Dispatch::Disposed
            }
        }
    }

    fn issue(&mut self, reason: &str) -> Dispatch {
        match self.guard.request_refresh(reason, None) {
            Some(token) => Dispatch::Issued(token),
            None => Dispatch::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::GuardConfig;
    use crate::test_support::{draft, snapshot, RecordingSink, ScriptedBackend};

    fn controller() -> (
        PanelController,
        tokio::sync::mpsc::UnboundedReceiver<crate::test_support::Call>,
        std::sync::Arc<RecordingSink>,
    ) {
        let (backend, calls) = ScriptedBackend::new();
        let sink = RecordingSink::new();
        let guard =
            StaleResponseGuard::new(11, backend, sink.clone(), GuardConfig::default()).unwrap();
        (PanelController::new(guard), calls, sink)
    }

    #[tokio::test]
    async fn test_manual_refresh_issues() {
        let (mut ctl, mut calls, sink) = controller();

        let dispatch = ctl.handle(EditorEvent::ManualRefresh);
        assert_eq!(dispatch, Dispatch::Issued(RefreshToken(1)));

        let call = calls.recv().await.unwrap();
        assert_eq!(call.request.reason, "manual");
        call.reply(Ok(snapshot(11, 77)));
        ctl.guard().settled().await;
        assert_eq!(sink.applied(), vec![77]);
    }

    #[tokio::test]
    async fn test_save_completion_triggers_refresh() {
        let (mut ctl, mut calls, _sink) = controller();

        assert_eq!(
            ctl.handle(EditorEvent::SaveStarted { autosave: false }),
            Dispatch::Ignored
        );
        let dispatch = ctl.handle(EditorEvent::SaveFinished { success: true });
        assert!(matches!(dispatch, Dispatch::Issued(_)));
        assert_eq!(calls.recv().await.unwrap().request.reason, "post-saved");

        // A second "finished" without a matching start does nothing.
        assert_eq!(
            ctl.handle(EditorEvent::SaveFinished { success: true }),
            Dispatch::Ignored
        );
    }

    #[tokio::test]
    async fn test_autosave_and_failed_save_do_not_refresh() {
        let (mut ctl, _calls, _sink) = controller();

        ctl.handle(EditorEvent::SaveStarted { autosave: true });
        assert_eq!(
            ctl.handle(EditorEvent::SaveFinished { success: true }),
            Dispatch::Ignored
        );

        ctl.handle(EditorEvent::SaveStarted { autosave: false });
        assert_eq!(
            ctl.handle(EditorEvent::SaveFinished { success: false }),
            Dispatch::Ignored
        );
        assert!(ctl.guard().current_token().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_refresh_is_rate_limited() {
        let (mut ctl, _calls, _sink) = controller();

        assert!(matches!(
            ctl.handle(EditorEvent::FocusRegained),
            Dispatch::Issued(_)
        ));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(ctl.handle(EditorEvent::FocusRegained), Dispatch::Ignored);

        tokio::time::advance(Duration::from_secs(25)).await;
        assert!(matches!(
            ctl.handle(EditorEvent::FocusRegained),
            Dispatch::Issued(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_field_edits_are_debounced() {
        let (mut ctl, mut calls, _sink) = controller();

        assert_eq!(
            ctl.handle(EditorEvent::FieldEdited(draft("meta_description", "a"))),
            Dispatch::Debounced
        );
        ctl.handle(EditorEvent::FieldEdited(draft("meta_description", "ab")));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let call = calls.recv().await.unwrap();
        assert_eq!(call.request.draft, Some(draft("meta_description", "ab")));
        assert!(calls.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_after_debounced_edit_is_rate_limited() {
        let (mut ctl, mut calls, _sink) = controller();

        ctl.handle(EditorEvent::FieldEdited(draft("title", "New")));
        tokio::time::sleep(Duration::from_secs(1)).await;
        let call = calls.recv().await.unwrap();
        assert_eq!(call.request.reason, "field-edit");

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(ctl.handle(EditorEvent::FocusRegained), Dispatch::Ignored);
        assert!(calls.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unmount_disposes() {
        let (mut ctl, _calls, _sink) = controller();

        assert_eq!(ctl.handle(EditorEvent::Unmount), Dispatch::Disposed);
        assert!(ctl.guard().is_disposed());
        assert_eq!(ctl.handle(EditorEvent::ManualRefresh), Dispatch::Ignored);
        assert_eq!(
            ctl.handle(EditorEvent::FieldEdited(draft("title", "x"))),
            Dispatch::Ignored
        );
    }
}
