//! An open editing session on one project.
//!
//! `Session` owns the editor behind a mutex and runs two background tasks:
//! the generation processor and the autosave loop. Std mutex guards are
//! only taken inside synchronous blocks, so none is held across an `.await`.
//! The editor lock is always taken before the autosave lock.

use crate::autosave::{AutosaveState, SaveStatus, run_autosave, save_now};
use crate::backend::{FileStorage, ImageGenerator, ProjectStore};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::processor::run_processor;
use crate::queue::{GenerationTask, TaskQueue};
use mb_core::{CanvasElement, CustomCard, ElementId, ProjectUpdate, TaskId, Viewport};
use mb_editor::{Editor, EditorEffect, InputEvent, ToolKind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether the caller holds a valid credential. Issuing and checking
/// credentials is the auth service's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Authorized,
    Anonymous,
}

/// The collaborators a session talks to.
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn ProjectStore>,
    pub generator: Arc<dyn ImageGenerator>,
    pub files: Arc<dyn FileStorage>,
}

/// State shared with the background tasks.
pub(crate) struct Shared {
    pub(crate) editor: Mutex<Editor>,
    pub(crate) queue: Mutex<TaskQueue>,
    pub(crate) autosave: Mutex<AutosaveState>,
    /// Held for the whole of a save.
    pub(crate) save_lock: tokio::sync::Mutex<()>,
    /// Wakes the processor after a submit.
    pub(crate) wake: Notify,
    /// Fired whenever a job finishes or the processor stops.
    pub(crate) settled: Notify,
    revisions: watch::Sender<u64>,
    pub(crate) config: SessionConfig,
}

impl Shared {
    /// Record an element mutation for autosave.
    pub(crate) fn publish_revision(&self, revision: u64) {
        lock(&self.autosave).mark_dirty();
        self.revisions.send_replace(revision);
    }
}

/// Read-only copy of the editor state.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorSnapshot {
    pub elements: Vec<CanvasElement>,
    pub selection: Vec<ElementId>,
    pub viewport: Viewport,
    pub tool: ToolKind,
    pub revision: u64,
}

pub struct Session {
    project_id: String,
    title: String,
    shared: Arc<Shared>,
    backends: Backends,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Session {
    /// Load `project_id` and start the processor and autosave tasks.
    pub async fn open(
        project_id: &str,
        auth: AuthState,
        backends: Backends,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if auth != AuthState::Authorized {
            return Err(SessionError::Unauthorized(project_id.to_string()));
        }
        let project = backends.store.get(project_id).await?;

        let mut editor = Editor::new(config.editor.clone());
        editor.load(project.elements);
        let (revisions, revisions_rx) = watch::channel(editor.revision());

        let delay = config.autosave_delay();
        let autosave = AutosaveState::new(editor.revision());
        let shared = Arc::new(Shared {
            editor: Mutex::new(editor),
            queue: Mutex::new(TaskQueue::new()),
            autosave: Mutex::new(autosave),
            save_lock: tokio::sync::Mutex::new(()),
            wake: Notify::new(),
            settled: Notify::new(),
            revisions,
            config,
        });
        let cancel = CancellationToken::new();

        let handles = vec![
            tokio::spawn(run_processor(
                shared.clone(),
                backends.generator.clone(),
                cancel.child_token(),
            )),
            tokio::spawn(run_autosave(
                shared.clone(),
                backends.store.clone(),
                project_id.to_string(),
                revisions_rx,
                delay,
                cancel.child_token(),
            )),
        ];

        log::info!(
            "opened project {project_id} ({:?}, {} elements)",
            project.title,
            lock(&shared.editor).elements().len()
        );
        Ok(Self {
            project_id: project_id.to_string(),
            title: project.title,
            shared,
            backends,
            cancel,
            handles,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ─── Editor access ───────────────────────────────────────────────────

    /// Run `f` against the editor. Element changes schedule an autosave.
    pub fn with_editor<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> R {
        let (result, before, after) = {
            let mut editor = lock(&self.shared.editor);
            let before = editor.revision();
            let result = f(&mut editor);
            (result, before, editor.revision())
        };
        if after != before {
            self.shared.publish_revision(after);
        }
        result
    }

    pub fn handle_input(&self, event: &InputEvent) -> Vec<EditorEffect> {
        self.with_editor(|editor| editor.handle(event))
    }

    pub fn editor_snapshot(&self) -> EditorSnapshot {
        let editor = lock(&self.shared.editor);
        EditorSnapshot {
            elements: editor.elements().to_vec(),
            selection: editor.selection().iter().collect(),
            viewport: editor.viewport(),
            tool: editor.tool(),
            revision: editor.revision(),
        }
    }

    /// Upload an image and place it at the screen centre.
    pub async fn upload_image(
        &self,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<ElementId, SessionError> {
        let url = self.backends.files.upload(bytes, filename).await?;
        Ok(self.with_editor(|editor| editor.add_image(url)))
    }

    /// Like `upload_image`, for a base64 data URI such as a pasted image.
    pub async fn upload_data_uri(&self, data: &str) -> Result<ElementId, SessionError> {
        let url = self.backends.files.upload_data_uri(data).await?;
        Ok(self.with_editor(|editor| editor.add_image(url)))
    }

    /// Place a card from the user's card library.
    pub fn add_custom_card(&self, card: &CustomCard) -> ElementId {
        self.with_editor(|editor| editor.add_card(&card.to_template()))
    }

    // ─── Generation ──────────────────────────────────────────────────────

    pub fn submit_prompt(&self, prompt: &str) -> Result<TaskId, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let id = lock(&self.shared.queue)
            .enqueue(prompt)
            .ok_or(SessionError::EmptyPrompt)?;
        self.shared.wake.notify_one();
        Ok(id)
    }

    pub fn tasks(&self) -> Vec<GenerationTask> {
        lock(&self.shared.queue).tasks().to_vec()
    }

    pub fn task(&self, id: TaskId) -> Option<GenerationTask> {
        lock(&self.shared.queue).get(id).cloned()
    }

    pub fn clear_finished_tasks(&self) -> usize {
        lock(&self.shared.queue).clear_finished()
    }

    /// Resolve once no task is pending or running, or the session closes.
    pub async fn wait_idle(&self) {
        loop {
            let settled = self.shared.settled.notified();
            tokio::pin!(settled);
            settled.as_mut().enable();
            if lock(&self.shared.queue).is_idle() || self.is_closed() {
                return;
            }
            tokio::select! {
                _ = settled => {}
                _ = self.cancel.cancelled() => return,
            }
        }
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    pub fn save_status(&self) -> SaveStatus {
        lock(&self.shared.autosave).status()
    }

    /// Successful saves so far, autosave and flush combined.
    pub fn save_count(&self) -> usize {
        lock(&self.shared.autosave).save_count()
    }

    /// Save right away if there are unsaved changes. Waits for a save that
    /// is already in flight, then writes whatever it missed.
    pub async fn flush(&self) -> bool {
        if self.save_status() == SaveStatus::Saved {
            return true;
        }
        save_now(&self.shared, self.backends.store.as_ref(), &self.project_id).await
    }

    pub async fn rename(&mut self, title: &str) -> Result<(), SessionError> {
        let update = ProjectUpdate {
            title: Some(title.to_string()),
            elements: None,
        };
        let project = self.backends.store.update(&self.project_id, update).await?;
        self.title = project.title;
        Ok(())
    }

    /// Stop background work. A running generation is abandoned and marked
    /// failed; pending tasks stay pending. Unsaved changes are not written,
    /// call `flush` first to keep them.
    pub async fn close(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                log::warn!("session task ended abnormally: {e}");
            }
        }
        log::info!("closed project {}", self.project_id);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
