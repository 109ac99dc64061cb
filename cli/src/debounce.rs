//! Debouncer: collapse a burst of edits into one save.
//!
//! DESIGN
//! ======
//! A background task owns the pending value and a single resettable timer.
//! Every `push` replaces the pending value and restarts the quiet window; when
//! the window elapses the latest value is handed to `on_fire`. `on_fire` runs
//! on the debouncer task, so it must not block: callers spawn the real work
//! and return. `shutdown` closes the channel and flushes whatever is still
//! pending without waiting out the window.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<T>,
    task: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the debounce task. Must be called inside a Tokio runtime.
    pub fn spawn<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(rx, delay, on_fire));
        Self { tx, task }
    }

    /// Replace the pending value and restart the quiet window.
    pub fn push(&self, value: T) {
        if self.tx.send(value).is_err() {
            tracing::warn!("debouncer task stopped; edit dropped");
        }
    }

    /// Stop accepting edits and fire any pending value immediately.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "debouncer task failed");
        }
    }
}

async fn run<T, F>(mut rx: mpsc::UnboundedReceiver<T>, delay: Duration, mut on_fire: F)
where
    F: FnMut(T),
{
    let mut pending: Option<T> = None;
    let timer = tokio::time::sleep(delay);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            msg = rx.recv() => match msg {
                Some(value) => {
                    pending = Some(value);
                    timer.as_mut().reset(Instant::now() + delay);
                }
                None => {
                    if let Some(value) = pending.take() {
                        on_fire(value);
                    }
                    return;
                }
            },
            () = &mut timer, if pending.is_some() => {
                if let Some(value) = pending.take() {
                    on_fire(value);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "debounce_test.rs"]
mod tests;
