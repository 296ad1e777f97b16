//! Debounced autosave.
//!
//! Every element-store mutation marks the project `Unsaved` and restarts a
//! fixed quiet-period timer. When the timer runs out the full element array
//! is written through `ProjectStore::update`. A failed save reverts to
//! `Unsaved` and is not retried until the next mutation (or `flush`).

use crate::backend::ProjectStore;
use crate::session::{Shared, lock};
use mb_core::ProjectUpdate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    #[default]
    Saved,
    Unsaved,
    Saving,
}

#[derive(Debug)]
pub struct AutosaveState {
    status: SaveStatus,
    /// Editor revision the store is known to hold.
    saved_revision: u64,
    /// Revision of the write currently in flight.
    in_flight: Option<u64>,
    saves: usize,
    failures: usize,
}

impl AutosaveState {
    /// State for an editor freshly loaded at `revision`.
    pub fn new(revision: u64) -> Self {
        Self {
            status: SaveStatus::Saved,
            saved_revision: revision,
            in_flight: None,
            saves: 0,
            failures: 0,
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// Completed successful saves.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    pub fn failure_count(&self) -> usize {
        self.failures
    }

    pub fn saved_revision(&self) -> u64 {
        self.saved_revision
    }

    pub fn mark_dirty(&mut self) {
        self.status = SaveStatus::Unsaved;
    }

    /// A write of `revision` is starting.
    pub fn begin(&mut self, revision: u64) {
        self.status = SaveStatus::Saving;
        self.in_flight = Some(revision);
    }

    /// The in-flight write ended. `current` is the editor revision now; the
    /// project only counts as saved if the write caught up with it.
    pub fn finish(&mut self, ok: bool, current: u64) {
        let written = self.in_flight.take();
        if ok {
            self.saves += 1;
            if let Some(revision) = written {
                self.saved_revision = revision;
            }
        } else {
            self.failures += 1;
        }
        self.status = if ok && self.saved_revision == current {
            SaveStatus::Saved
        } else {
            SaveStatus::Unsaved
        };
    }

    /// The store already holds `revision`; nothing to write.
    fn settle_at(&mut self, revision: u64) {
        if self.saved_revision == revision {
            self.status = SaveStatus::Saved;
        }
    }
}

/// Snapshot the editor and write it out. Returns whether the store holds
/// the snapshot afterwards.
///
/// Saves are serialized on `Shared::save_lock`, so an older snapshot can
/// never land after a newer one.
pub(crate) async fn save_now(shared: &Shared, store: &dyn ProjectStore, project_id: &str) -> bool {
    let _serial = shared.save_lock.lock().await;

    let snapshot = {
        let editor = lock(&shared.editor);
        let revision = editor.revision();
        let mut state = lock(&shared.autosave);
        if state.saved_revision() == revision {
            state.settle_at(revision);
            None
        } else {
            state.begin(revision);
            Some((revision, editor.elements().to_vec()))
        }
    };
    let Some((revision, elements)) = snapshot else {
        log::trace!("project {project_id} already saved");
        return true;
    };
    log::debug!("saving project {project_id} at revision {revision}");

    let result = store
        .update(project_id, ProjectUpdate::elements(elements))
        .await;
    let ok = match result {
        Ok(_) => true,
        Err(e) => {
            log::warn!("autosave of project {project_id} failed: {e}");
            false
        }
    };

    let editor = lock(&shared.editor);
    lock(&shared.autosave).finish(ok, editor.revision());
    ok
}

/// Wait for a revision change, debounce it, save; repeat until cancelled.
pub(crate) async fn run_autosave(
    shared: Arc<Shared>,
    store: Arc<dyn ProjectStore>,
    project_id: String,
    mut revisions: watch::Receiver<u64>,
    delay: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = revisions.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                changed = revisions.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    log::trace!("autosave timer restarted");
                }
                _ = tokio::time::sleep(delay) => break,
            }
        }

        save_now(&shared, store.as_ref(), &project_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_during_save_stays_unsaved() {
        let mut state = AutosaveState::new(0);
        state.mark_dirty();
        state.begin(1);
        state.mark_dirty();
        assert_eq!(state.status(), SaveStatus::Unsaved);
        state.finish(true, 2);
        assert_eq!(state.status(), SaveStatus::Unsaved);
        assert_eq!(state.saved_revision(), 1);
        assert_eq!(state.save_count(), 1);
    }

    #[test]
    fn failure_reverts_to_unsaved() {
        let mut state = AutosaveState::new(0);
        state.mark_dirty();
        state.begin(1);
        assert_eq!(state.status(), SaveStatus::Saving);
        state.finish(false, 1);
        assert_eq!(state.status(), SaveStatus::Unsaved);
        assert_eq!(state.saved_revision(), 0);
        assert_eq!(state.failure_count(), 1);

        state.begin(1);
        state.finish(true, 1);
        assert_eq!(state.status(), SaveStatus::Saved);
    }

    #[test]
    fn snapshot_already_written_settles_without_a_save() {
        let mut state = AutosaveState::new(3);
        state.begin(4);
        state.finish(true, 4);
        // The revision notification for 4 arrives after the write.
        state.mark_dirty();
        state.settle_at(4);
        assert_eq!(state.status(), SaveStatus::Saved);
        assert_eq!(state.save_count(), 1);
    }
}
