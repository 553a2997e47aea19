//! In-memory task registry owned by an agent server.

use super::types::{Event, Task, TaskStatus};
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default number of finished tasks kept for `tasks/get`.
pub const DEFAULT_RETENTION: usize = 128;

/// Tasks keyed by id.
///
/// Finished tasks stay queryable until more than `retention` of them have
/// accumulated; the oldest finished task is evicted first.
pub struct TaskRegistry {
    inner: RwLock<Inner>,
    retention: usize,
}

#[derive(Default)]
struct Inner {
    tasks: HashMap<String, Task>,
    finished: VecDeque<String>,
}

impl TaskRegistry {
    pub fn new(retention: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            retention,
        }
    }

    pub async fn get(&self, task_id: &str) -> Option<Task> {
        self.inner.read().await.tasks.get(task_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Apply one event and return the task as it stands afterwards.
    ///
    /// Direct message replies are not tracked and return `None`. Updates
    /// addressed to a task that already finished are dropped.
    pub async fn apply(&self, event: &Event) -> Option<Task> {
        let mut inner = self.inner.write().await;

        let task_id = match event {
            Event::Message(_) => return None,
            Event::Task(task) => {
                if is_finished(&inner, &task.id) {
                    warn!("Ignoring resubmission of finished task {}", task.id);
                    return inner.tasks.get(&task.id).cloned();
                }
                inner.tasks.insert(task.id.clone(), task.clone());
                task.id.clone()
            }
            Event::StatusUpdate(update) => {
                if is_finished(&inner, &update.task_id) {
                    warn!(
                        "Ignoring {} update for finished task {}",
                        update.status.state, update.task_id
                    );
                    return inner.tasks.get(&update.task_id).cloned();
                }
                let task = inner
                    .tasks
                    .entry(update.task_id.clone())
                    .or_insert_with(|| Task {
                        id: update.task_id.clone(),
                        context_id: update.context_id.clone(),
                        status: TaskStatus::new(update.status.state, None),
                        artifacts: Vec::new(),
                        history: Vec::new(),
                    });
                if let Some(message) = &update.status.message {
                    task.history.push(message.clone());
                }
                task.status = update.status.clone();
                update.task_id.clone()
            }
            Event::ArtifactUpdate(update) => {
                if is_finished(&inner, &update.task_id) {
                    warn!("Ignoring artifact for finished task {}", update.task_id);
                    return inner.tasks.get(&update.task_id).cloned();
                }
                let Some(task) = inner.tasks.get_mut(&update.task_id) else {
                    warn!("Ignoring artifact for unknown task {}", update.task_id);
                    return None;
                };
                let existing = task
                    .artifacts
                    .iter_mut()
                    .find(|a| a.artifact_id == update.artifact.artifact_id);
                match existing {
                    Some(artifact) if update.append == Some(true) => {
                        artifact.parts.extend(update.artifact.parts.iter().cloned());
                    }
                    Some(artifact) => *artifact = update.artifact.clone(),
                    None => task.artifacts.push(update.artifact.clone()),
                }
                update.task_id.clone()
            }
        };

        let snapshot = inner.tasks.get(&task_id).cloned();
        if snapshot
            .as_ref()
            .is_some_and(|task| task.status.state.is_terminal())
        {
            self.retire(&mut inner, task_id);
        }
        snapshot
    }

    fn retire(&self, inner: &mut Inner, task_id: String) {
        debug!("Task {} finished", task_id);
        inner.finished.push_back(task_id);
        while inner.finished.len() > self.retention {
            if let Some(evicted) = inner.finished.pop_front() {
                debug!("Evicting finished task {}", evicted);
                inner.tasks.remove(&evicted);
            }
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

fn is_finished(inner: &Inner, task_id: &str) -> bool {
    inner
        .tasks
        .get(task_id)
        .is_some_and(|task| task.status.state.is_terminal())
}
