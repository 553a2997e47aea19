//! Per-task event channel and the updater executors publish through.

use super::types::{
    Artifact, Event, Message, Part, Task, TaskArtifactUpdateEvent, TaskState, TaskStatus,
    TaskStatusUpdateEvent,
};
use crate::error::{RelayError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Create a connected queue/receiver pair for one task.
pub fn channel() -> (EventQueue, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventQueue { tx }, EventReceiver { rx, done: false })
}

/// Producer side of a task's event channel.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventQueue {
    pub fn enqueue(&self, event: Event) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| RelayError::TaskClosed("event consumer has gone away".to_string()))
    }
}

/// Consumer side; yields events in FIFO order up to and including the first terminal one.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
    done: bool,
}

impl EventReceiver {
    /// Next event, or `None` once the terminal event has been seen or all producers are gone.
    pub async fn next(&mut self) -> Option<Event> {
        if self.done {
            return None;
        }
        let event = self.rx.recv().await?;
        if event.is_terminal() {
            self.done = true;
            self.rx.close();
        }
        Some(event)
    }
}

/// Publishes lifecycle events for a single task.
///
/// Refuses everything after the first terminal event, so a task can never
/// end twice.
#[derive(Debug)]
pub struct TaskUpdater {
    queue: EventQueue,
    task_id: String,
    context_id: String,
    closed: AtomicBool,
}

impl TaskUpdater {
    pub fn new(queue: EventQueue, task_id: &str, context_id: &str) -> Self {
        Self {
            queue,
            task_id: task_id.to_string(),
            context_id: context_id.to_string(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Whether a terminal event has already been published.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn publish(&self, event: Event) -> Result<()> {
        let already_closed = if event.is_terminal() {
            self.closed.swap(true, Ordering::SeqCst)
        } else {
            self.is_closed()
        };
        if already_closed {
            return Err(RelayError::TaskClosed(self.task_id.clone()));
        }
        self.queue.enqueue(event)
    }

    /// An agent message addressed to this task.
    pub fn agent_message(&self, text: &str) -> Message {
        Message::agent_text(text, &self.context_id, &self.task_id)
    }

    /// Announce a new task holding the user's message.
    pub fn submit(&self, message: Message) -> Result<()> {
        self.publish(Event::Task(Task::submitted(
            &self.task_id,
            &self.context_id,
            message,
        )))
    }

    pub fn start_work(&self) -> Result<()> {
        self.update_status(TaskState::Working, None)
    }

    pub fn update_status(&self, state: TaskState, message: Option<Message>) -> Result<()> {
        self.publish(Event::StatusUpdate(TaskStatusUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            status: TaskStatus::new(state, message),
            is_final: state.is_terminal(),
        }))
    }

    pub fn add_artifact(&self, parts: Vec<Part>, name: Option<&str>) -> Result<()> {
        self.publish(Event::ArtifactUpdate(TaskArtifactUpdateEvent {
            task_id: self.task_id.clone(),
            context_id: self.context_id.clone(),
            artifact: Artifact::new(parts, name),
            append: None,
            last_chunk: Some(true),
        }))
    }

    pub fn complete(&self) -> Result<()> {
        self.update_status(TaskState::Completed, None)
    }

    /// Fail the task with an agent message carrying the reason.
    pub fn failed(&self, reason: &str) -> Result<()> {
        let message = self.agent_message(reason);
        self.update_status(TaskState::Failed, Some(message))
    }

    pub fn cancel(&self) -> Result<()> {
        self.update_status(TaskState::Canceled, None)
    }

    /// Answer with a direct message instead of a task result.
    pub fn reply(&self, text: &str) -> Result<()> {
        let message = self.agent_message(text);
        self.publish(Event::Message(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_events_arrive_in_order_until_terminal() {
        let (queue, mut receiver) = channel();
        let updater = TaskUpdater::new(queue, "task-1", "ctx-1");

        assert_ok!(updater.submit(Message::user_text("hi")));
        assert_ok!(updater.start_work());
        assert_ok!(updater.add_artifact(vec![Part::text("answer")], None));
        assert_ok!(updater.complete());

        let mut kinds = Vec::new();
        while let Some(event) = receiver.next().await {
            kinds.push(match event {
                Event::Task(_) => "task",
                Event::StatusUpdate(u) => {
                    if u.status.state == TaskState::Working {
                        "working"
                    } else {
                        "completed"
                    }
                }
                Event::ArtifactUpdate(_) => "artifact",
                Event::Message(_) => "message",
            });
        }
        assert_eq!(kinds, vec!["task", "working", "artifact", "completed"]);
    }

    #[tokio::test]
    async fn test_updater_refuses_second_terminal_event() {
        let (queue, _receiver) = channel();
        let updater = TaskUpdater::new(queue, "task-1", "ctx-1");

        assert_ok!(updater.complete());
        assert!(updater.is_closed());
        assert_err!(updater.failed("late failure"));
        assert_err!(updater.start_work());
    }

    #[tokio::test]
    async fn test_receiver_stops_at_terminal_event() {
        let (queue, mut receiver) = channel();
        let updater = TaskUpdater::new(queue.clone(), "task-1", "ctx-1");

        assert_ok!(updater.reply("done"));
        // Stray events after the terminal one are never delivered.
        let _ = queue.enqueue(Event::Message(Message::user_text("stray")));

        assert!(matches!(receiver.next().await, Some(Event::Message(_))));
        assert!(receiver.next().await.is_none());
    }

    #[tokio::test]
    async fn test_receiver_ends_when_producers_drop() {
        let (queue, mut receiver) = channel();
        let updater = TaskUpdater::new(queue, "task-1", "ctx-1");
        assert_ok!(updater.start_work());
        drop(updater);

        assert!(receiver.next().await.is_some());
        assert!(receiver.next().await.is_none());
    }
}
