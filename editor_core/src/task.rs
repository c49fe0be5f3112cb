//! One-shot background workers polled from the editing thread.

use crossbeam_channel::{Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

/// Result of a non-blocking check on a [`BackgroundTask`].
#[derive(Debug)]
pub enum TaskPoll<T> {
    /// Still running.
    Pending,
    /// Finished with a value.
    Ready(T),
    /// Died without producing a value.
    Failed,
}

/// A worker thread computing a single value.
///
/// The owner polls with [`BackgroundTask::poll`] once per frame and never
/// blocks on it. Dropping the task joins the thread.
pub struct BackgroundTask<T> {
    name: String,
    rx: Receiver<T>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    /// Spawns `work` on a named thread.
    pub fn spawn<F>(name: &str, work: F) -> std::io::Result<Self>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            // the receiver may already be gone if the owner was dropped
            let _ = tx.send(work());
        })?;
        Ok(Self {
            name: name.to_string(),
            rx,
            handle: Some(handle),
        })
    }
}

impl<T> BackgroundTask<T> {
    /// Checks for a result without blocking.
    pub fn poll(&mut self) -> TaskPoll<T> {
        match self.rx.try_recv() {
            Ok(value) => {
                self.join();
                TaskPoll::Ready(value)
            }
            Err(TryRecvError::Empty) => TaskPoll::Pending,
            Err(TryRecvError::Disconnected) => {
                self.join();
                TaskPoll::Failed
            }
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("{} worker panicked", self.name);
            }
        }
    }
}

impl<T> Drop for BackgroundTask<T> {
    fn drop(&mut self) {
        self.join();
    }
}
