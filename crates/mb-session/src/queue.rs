//! Generation task queue.
//!
//! A pure state machine over the task list. Each task moves
//! `pending → running → completed | failed` and never leaves a terminal
//! state except through `clear_finished`. At most one task is `running`;
//! `begin_next` is the only way a task starts and it refuses while another
//! is in flight, always picking the oldest pending task.

use chrono::{DateTime, Utc};
use mb_core::TaskId;
use serde::{Deserialize, Serialize};

/// Progress a task starts at when it begins running.
pub const START_PROGRESS: u8 = 10;
/// The simulated ticker never goes past this.
pub const PROGRESS_CAP: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationTask {
    pub id: TaskId,
    pub prompt: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GenerationTask {
    fn new(prompt: String) -> Self {
        Self {
            id: TaskId::generate(),
            prompt,
            status: TaskStatus::Pending,
            progress: 0,
            created_at: Utc::now(),
            result_image_url: None,
            error: None,
        }
    }

    /// Prompt shortened for the task panel.
    pub fn display_prompt(&self) -> String {
        truncate_prompt(&self.prompt, 20)
    }
}

/// Work handed to the processor by `begin_next`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: TaskId,
    pub prompt: String,
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Vec<GenerationTask>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pending task. Blank prompts are rejected.
    pub fn enqueue(&mut self, prompt: &str) -> Option<TaskId> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        let task = GenerationTask::new(prompt.to_string());
        let id = task.id;
        self.tasks.push(task);
        log::debug!("task {id} queued: {prompt:?}");
        Some(id)
    }

    pub fn tasks(&self) -> &[GenerationTask] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&GenerationTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TaskId) -> Option<&mut GenerationTask> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn oldest_pending(&self) -> Option<&GenerationTask> {
        self.tasks.iter().find(|t| t.status == TaskStatus::Pending)
    }

    pub fn running(&self) -> Option<&GenerationTask> {
        self.tasks.iter().find(|t| t.status == TaskStatus::Running)
    }

    /// Start the oldest pending task, unless one is already running.
    pub fn begin_next(&mut self) -> Option<Job> {
        if let Some(running) = self.running() {
            log::trace!("begin_next refused: {} still running", running.id);
            return None;
        }
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.status == TaskStatus::Pending)?;
        task.status = TaskStatus::Running;
        task.progress = START_PROGRESS;
        log::debug!("task {} running", task.id);
        Some(Job {
            id: task.id,
            prompt: task.prompt.clone(),
        })
    }

    /// Bump a running task's simulated progress, capped at `PROGRESS_CAP`.
    /// Returns whether the progress changed.
    pub fn advance_progress(&mut self, id: TaskId, increment: u8) -> bool {
        let Some(task) = self.get_mut(id) else {
            return false;
        };
        if task.status != TaskStatus::Running || task.progress >= PROGRESS_CAP {
            return false;
        }
        task.progress = task.progress.saturating_add(increment).min(PROGRESS_CAP);
        true
    }

    pub fn complete(&mut self, id: TaskId, url: impl Into<String>) -> bool {
        let Some(task) = self.running_task_mut(id, "complete") else {
            return false;
        };
        task.status = TaskStatus::Completed;
        task.progress = 100;
        task.result_image_url = Some(url.into());
        log::debug!("task {id} completed");
        true
    }

    pub fn fail(&mut self, id: TaskId, error: impl Into<String>) -> bool {
        let Some(task) = self.running_task_mut(id, "fail") else {
            return false;
        };
        let error = error.into();
        log::debug!("task {id} failed: {error}");
        task.status = TaskStatus::Failed;
        task.progress = 0;
        task.error = Some(error);
        true
    }

    fn running_task_mut(&mut self, id: TaskId, action: &str) -> Option<&mut GenerationTask> {
        match self.get_mut(id) {
            Some(task) if task.status == TaskStatus::Running => Some(task),
            Some(task) => {
                log::warn!("cannot {action} task {id} in state {:?}", task.status);
                None
            }
            None => {
                log::warn!("cannot {action} unknown task {id}");
                None
            }
        }
    }

    /// Drop every completed or failed task. Returns how many were removed.
    pub fn clear_finished(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.status.is_finished());
        before - self.tasks.len()
    }

    fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    pub fn pending_count(&self) -> usize {
        self.count(TaskStatus::Pending)
    }

    pub fn running_count(&self) -> usize {
        self.count(TaskStatus::Running)
    }

    pub fn completed_count(&self) -> usize {
        self.count(TaskStatus::Completed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(TaskStatus::Failed)
    }

    /// No task pending or running.
    pub fn is_idle(&self) -> bool {
        self.tasks.iter().all(|t| t.status.is_finished())
    }
}

/// First `max_chars` characters of `prompt`, with `...` when cut.
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> String {
    match prompt.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &prompt[..cut]),
        None => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blank_prompt_is_rejected() {
        let mut queue = TaskQueue::new();
        assert_eq!(queue.enqueue("   "), None);
        assert!(queue.is_empty());
    }

    #[test]
    fn begin_next_is_fifo_and_exclusive() {
        let mut queue = TaskQueue::new();
        let a = queue.enqueue("first").unwrap();
        let b = queue.enqueue("second").unwrap();

        let job = queue.begin_next().unwrap();
        assert_eq!(job.id, a);
        assert_eq!(queue.get(a).unwrap().progress, START_PROGRESS);
        assert_eq!(queue.begin_next(), None, "guard holds while running");

        queue.complete(a, "https://example/a.png");
        assert_eq!(queue.begin_next().unwrap().id, b);
        assert_eq!(queue.running_count(), 1);
    }

    #[test]
    fn progress_is_capped_and_only_while_running() {
        let mut queue = TaskQueue::new();
        let id = queue.enqueue("p").unwrap();
        assert!(!queue.advance_progress(id, 5), "pending task has no progress");

        queue.begin_next();
        for _ in 0..20 {
            queue.advance_progress(id, 10);
        }
        assert_eq!(queue.get(id).unwrap().progress, PROGRESS_CAP);
        assert!(!queue.advance_progress(id, 1));
    }

    #[test]
    fn terminal_states_are_final() {
        let mut queue = TaskQueue::new();
        let id = queue.enqueue("p").unwrap();
        assert!(!queue.complete(id, "x"), "cannot complete a pending task");

        queue.begin_next();
        assert!(queue.fail(id, "backend down"));
        let task = queue.get(id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.progress, 0);
        assert_eq!(task.error.as_deref(), Some("backend down"));

        assert!(!queue.complete(id, "x"));
        assert!(!queue.fail(id, "again"));
        assert!(!queue.advance_progress(id, 5));
        assert_eq!(queue.get(id).unwrap().result_image_url, None);
    }

    #[test]
    fn clear_finished_keeps_live_tasks() {
        let mut queue = TaskQueue::new();
        let done = queue.enqueue("done").unwrap();
        let failed = queue.enqueue("failed").unwrap();
        let waiting = queue.enqueue("waiting").unwrap();
        queue.begin_next();
        queue.complete(done, "u");
        queue.begin_next();
        queue.fail(failed, "e");

        assert_eq!(queue.clear_finished(), 2);
        let ids: Vec<TaskId> = queue.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![waiting]);
        assert!(!queue.is_idle());
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_prompt("short", 20), "short");
        assert_eq!(
            truncate_prompt("a very long prompt about sunsets", 20),
            "a very long prompt a..."
        );
        assert_eq!(truncate_prompt("ééééé", 3), "ééé...");
        assert_eq!(truncate_prompt("exactly twenty chars", 20), "exactly twenty chars");
    }

    #[test]
    fn task_serializes_camel_case() {
        let mut queue = TaskQueue::new();
        let id = queue.enqueue("sunset").unwrap();
        queue.begin_next();
        queue.complete(id, "https://example/img.png");
        let json = serde_json::to_value(queue.get(id).unwrap()).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["resultImageUrl"], "https://example/img.png");
        assert!(json.get("error").is_none());
    }
}
