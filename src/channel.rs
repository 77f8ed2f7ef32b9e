//! Progress channel between the pipeline worker and the presentation layer.
//!
//! ## Contract
//!
//! * Exactly one producer: the worker thread running the pipeline owns the
//!   [`ProgressSender`]. It is deliberately not `Clone`.
//! * Exactly one consumer: the UI/main thread owns the [`ProgressReceiver`],
//!   usually wrapped in a [`ProgressMonitor`].
//! * The queue is unbounded and FIFO, so the worker never blocks on a slow UI
//!   and events arrive in production order.
//! * The consumer drains everything queued on each tick without blocking and
//!   renders only the last-seen values.
//!
//! Nothing else crosses the thread boundary: pages, recognition results and
//! page records stay on the worker until the document is saved.

use crate::convert::RunSummary;
use crate::error::Pdf2DocxError;
use crate::progress::{ProgressEvent, ProgressReporter};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::time::Duration;
use tracing::debug;

/// Polling interval of the presentation loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the worker can publish.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// A status update.
    Progress(ProgressEvent),
    /// The run finished and the document was saved.
    Finished(RunSummary),
    /// The run aborted; carries the user-facing error message.
    Failed(String),
}

/// Create a connected sender/receiver pair.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = unbounded();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

/// Producer half, owned by the worker thread.
pub struct ProgressSender {
    tx: Sender<WorkerMessage>,
}

impl ProgressSender {
    /// Publish the terminal outcome of a run, consuming the sender.
    pub fn finish(self, result: &Result<RunSummary, Pdf2DocxError>) {
        let msg = match result {
            Ok(summary) => WorkerMessage::Finished(summary.clone()),
            Err(e) => WorkerMessage::Failed(e.to_string()),
        };
        self.send(msg);
    }

    fn send(&self, msg: WorkerMessage) {
        // A vanished consumer must not take the worker down with it.
        if self.tx.send(msg).is_err() {
            debug!("Progress receiver dropped; event discarded");
        }
    }
}

impl ProgressReporter for ProgressSender {
    fn report(&self, event: ProgressEvent) {
        self.send(WorkerMessage::Progress(event));
    }
}

/// Consumer half, owned by the UI thread.
pub struct ProgressReceiver {
    rx: Receiver<WorkerMessage>,
}

/// Result of one non-blocking drain.
#[derive(Debug, Default)]
pub struct Drained {
    pub messages: Vec<WorkerMessage>,
    /// The sender is gone and the queue is empty.
    pub disconnected: bool,
}

impl ProgressReceiver {
    /// Remove every queued message without blocking.
    pub fn drain(&self) -> Drained {
        let mut drained = Drained::default();
        loop {
            match self.rx.try_recv() {
                Ok(msg) => drained.messages.push(msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    drained.disconnected = true;
                    break;
                }
            }
        }
        drained
    }
}

// ── Presentation side ────────────────────────────────────────────────────

/// Terminal outcome as seen by the presentation layer.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Finished(RunSummary),
    Failed(String),
}

/// Last-seen values to render.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    /// Latest status message (replace semantics).
    pub message: String,
    /// Latest percentage (last value wins).
    pub percent: f32,
    /// Set once the worker reports completion or failure.
    pub outcome: Option<RunOutcome>,
}

impl DisplayState {
    fn apply(&mut self, msg: WorkerMessage) {
        match msg {
            WorkerMessage::Progress(event) => {
                self.message = event.message;
                if let Some(p) = event.percent {
                    self.percent = p;
                }
            }
            WorkerMessage::Finished(summary) => {
                self.percent = 100.0;
                self.outcome = Some(RunOutcome::Finished(summary));
            }
            WorkerMessage::Failed(error) => {
                self.outcome = Some(RunOutcome::Failed(error));
            }
        }
    }
}

/// Folds drained messages into a [`DisplayState`] on each tick.
pub struct ProgressMonitor {
    receiver: ProgressReceiver,
    state: DisplayState,
}

impl ProgressMonitor {
    pub fn new(receiver: ProgressReceiver) -> Self {
        Self {
            receiver,
            state: DisplayState::default(),
        }
    }

    /// Drain and apply everything queued. Returns `true` if anything arrived.
    pub fn tick(&mut self) -> bool {
        let drained = self.receiver.drain();
        let changed = !drained.messages.is_empty();
        for msg in drained.messages {
            self.state.apply(msg);
        }
        if drained.disconnected && self.state.outcome.is_none() {
            self.state.outcome = Some(RunOutcome::Failed(
                "worker stopped without reporting a result".to_string(),
            ));
        }
        changed
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state.outcome.is_some()
    }

    /// Poll every `interval`, calling `render` after each tick, until the run
    /// reaches a terminal outcome.
    pub fn poll_until_complete(
        mut self,
        interval: Duration,
        mut render: impl FnMut(&DisplayState),
    ) -> DisplayState {
        loop {
            self.tick();
            render(&self.state);
            if self.is_complete() {
                return self.state;
            }
            std::thread::sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn summary() -> RunSummary {
        RunSummary {
            output_path: PathBuf::from("out.docx"),
            pages: 2,
            ocr_failures: 0,
            empty_pages: 1,
            failed_chunks: 0,
            duration_ms: 10,
        }
    }

    #[test]
    fn drain_is_fifo_and_non_blocking() {
        let (tx, rx) = progress_channel();
        assert!(rx.drain().messages.is_empty());

        tx.report(ProgressEvent::new("a", Some(1.0)));
        tx.report(ProgressEvent::new("b", None));
        let drained = rx.drain();
        let messages: Vec<_> = drained
            .messages
            .iter()
            .map(|m| match m {
                WorkerMessage::Progress(e) => e.message.clone(),
                _ => panic!("unexpected {m:?}"),
            })
            .collect();
        assert_eq!(messages, ["a", "b"]);
        assert!(!drained.disconnected);
    }

    #[test]
    fn monitor_keeps_last_values() {
        let (tx, rx) = progress_channel();
        let mut monitor = ProgressMonitor::new(rx);
        tx.report(ProgressEvent::new("first", Some(10.0)));
        tx.report(ProgressEvent::new("second", Some(20.0)));
        tx.report(ProgressEvent::new("third", None));
        assert!(monitor.tick());
        assert_eq!(monitor.state().message, "third");
        assert_eq!(monitor.state().percent, 20.0);
        assert!(!monitor.is_complete());
        assert!(!monitor.tick());
    }

    #[test]
    fn finish_marks_outcome() {
        let (tx, rx) = progress_channel();
        let mut monitor = ProgressMonitor::new(rx);
        tx.finish(&Ok(summary()));
        monitor.tick();
        assert!(matches!(monitor.state().outcome, Some(RunOutcome::Finished(_))));
        assert_eq!(monitor.state().percent, 100.0);
    }

    #[test]
    fn failure_carries_message() {
        let (tx, rx) = progress_channel();
        let mut monitor = ProgressMonitor::new(rx);
        tx.finish(&Err(Pdf2DocxError::Internal("boom".into())));
        monitor.tick();
        match &monitor.state().outcome {
            Some(RunOutcome::Failed(msg)) => assert!(msg.contains("boom")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dropped_sender_without_outcome_is_a_failure() {
        let (tx, rx) = progress_channel();
        let mut monitor = ProgressMonitor::new(rx);
        drop(tx);
        monitor.tick();
        assert!(matches!(monitor.state().outcome, Some(RunOutcome::Failed(_))));
    }

    #[test]
    fn poll_until_complete_renders_until_terminal() {
        let (tx, rx) = progress_channel();
        let worker = std::thread::spawn(move || {
            for i in 0..5 {
                tx.report(ProgressEvent::new(format!("step {i}"), Some(i as f32 * 10.0)));
                std::thread::sleep(Duration::from_millis(5));
            }
            tx.finish(&Ok(summary()));
        });
        let mut renders = 0;
        let state = ProgressMonitor::new(rx)
            .poll_until_complete(Duration::from_millis(2), |_| renders += 1);
        worker.join().unwrap();
        assert!(renders >= 1);
        assert!(matches!(state.outcome, Some(RunOutcome::Finished(_))));
    }

    #[test]
    fn report_after_receiver_drop_does_not_panic() {
        let (tx, rx) = progress_channel();
        drop(rx);
        tx.report(ProgressEvent::new("nobody listening", None));
        tx.finish(&Ok(summary()));
    }
}
