//! Task Channel
//!
//! Deferred work for the audio thread. Any number of control threads push
//! boxed closures; the node manager pops them between sub-blocks, which is the
//! only point at which graph topology changes.
//!
//! Backed by a bounded crossbeam channel so every slot is allocated up front
//! and pushing never blocks.

use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};

use super::error::EngineError;
use super::node_manager::NodeManager;

/// A unit of work executed on the audio thread with exclusive access to the manager.
pub type Task = Box<dyn FnOnce(&mut NodeManager) + Send>;

/// Creates a task channel with room for `capacity` pending tasks.
pub fn task_channel(capacity: usize) -> (TaskSender, TaskReceiver) {
    let (tx, rx) = channel::bounded(capacity.max(1));
    (TaskSender { tx }, TaskReceiver { rx })
}

/// Producer side. Cheap to clone; one per control thread is fine.
#[derive(Clone)]
pub struct TaskSender {
    tx: Sender<Task>,
}

impl TaskSender {
    /// Enqueues a task.
    /// A rejected task is dropped on the calling thread.
    ///
    /// Non-blocking.
    pub fn push(&self, task: Task) -> Result<(), EngineError> {
        self.tx.try_send(task).map_err(|err| match err {
            TrySendError::Full(_) => EngineError::TaskQueueFull,
            TrySendError::Disconnected(_) => EngineError::Disconnected,
        })
    }

    /// Check how many tasks can still be queued.
    pub fn slots_available(&self) -> usize {
        self.tx
            .capacity()
            .map_or(usize::MAX, |cap| cap.saturating_sub(self.tx.len()))
    }

    /// Check if the queue is full.
    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }
}

/// Consumer side, owned by the node manager.
///
/// REAL-TIME SAFE: popping never blocks or allocates.
pub struct TaskReceiver {
    rx: Receiver<Task>,
}

impl TaskReceiver {
    /// Number of tasks waiting.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Pops the oldest task, if any.
    pub fn try_recv(&self) -> Option<Task> {
        match self.rx.try_recv() {
            Ok(task) => Some(task),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}
