use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle};

/// Percentages published by the processing animation.
pub const PROGRESS_STEPS: [u8; 5] = [20, 40, 60, 80, 100];

/// Timed progress pacing for an analysis run.
///
/// The underlying task is aborted on drop, so an abandoned session never
/// leaves timers behind.
#[derive(Debug)]
pub struct ProcessingTask {
    handle: JoinHandle<()>,
    progress: watch::Receiver<u8>,
}

impl ProcessingTask {
    /// Spawns the pacing task. Must be called inside a tokio runtime.
    pub fn spawn(step_delay: Duration, sink: Arc<watch::Sender<u8>>) -> Self {
        sink.send_replace(0);
        let progress = sink.subscribe();
        let handle = tokio::spawn(async move {
            for pct in PROGRESS_STEPS {
                tokio::time::sleep(step_delay).await;
                sink.send_replace(pct);
                tracing::debug!(progress = pct, "Processing");
            }
        });
        Self { handle, progress }
    }

    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the final step. Returns early if the task was aborted.
    pub async fn finished(&mut self) {
        if !self.handle.is_finished() {
            let _ = (&mut self.handle).await;
        }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ProcessingTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
