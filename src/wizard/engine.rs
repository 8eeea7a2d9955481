use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::catalog::ToolTask;

/// Progress report from the worker, applied on the foreground in emission
/// order. `ItemCompleted` carries the 1-indexed count of finished tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StatusChanged(String),
    LogAppended(String),
    ItemCompleted(usize),
    RunFinished {
        cancelled: bool,
        succeeded: usize,
        failed: usize,
    },
}

/// Foreground-owned view of a run. Mutated only by applying `ProgressEvent`s
/// on the UI side; the worker never touches it.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub cancel_requested: bool,
    pub finished: bool,
    pub status_line: String,
    pub log: Vec<String>,
}

impl RunState {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            status_line: "Preparing installation...".to_string(),
            ..Default::default()
        }
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Handle to a spawned run: the event stream (single consumer) and the
/// cooperative cancellation flag (set from the foreground only).
pub struct RunHandle {
    pub events: mpsc::UnboundedReceiver<ProgressEvent>,
    pub cancel: Arc<AtomicBool>,
}

/// Run the selected tools sequentially on a background worker, streaming
/// progress back over an unbounded channel.
pub fn spawn_run(tasks: Vec<ToolTask>, pace: Duration) -> RunHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = Arc::new(AtomicBool::new(false));

    tokio::spawn(run_tasks(tasks, cancel.clone(), pace, tx));

    RunHandle { events: rx, cancel }
}

async fn run_tasks(
    tasks: Vec<ToolTask>,
    cancel: Arc<AtomicBool>,
    pace: Duration,
    tx: mpsc::UnboundedSender<ProgressEvent>,
) {
    let total = tasks.len();
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    let mut cancelled = false;

    for (idx, task) in tasks.into_iter().enumerate() {
        // Cancellation is polled at task boundaries only; a tool that has
        // started always runs to completion.
        if cancel.load(Ordering::Relaxed) {
            cancelled = true;
            break;
        }

        let position = idx + 1;
        let name = task.name;

        let _ = tx.send(ProgressEvent::StatusChanged(format!(
            "Installing {name} ({position} of {total})"
        )));
        let _ = tx.send(ProgressEvent::LogAppended(format!(
            "Starting {name} installation..."
        )));
        info!("Installing {name} ({position}/{total})");

        let runner = task.runner;
        let outcome = tokio::task::spawn_blocking(move || {
            panic::catch_unwind(AssertUnwindSafe(|| runner.attempt()))
        })
        .await;

        let ok = match outcome {
            Ok(Ok(ok)) => ok,
            Ok(Err(_)) => {
                warn!("Runner for {name} panicked, recording as failure");
                false
            }
            Err(e) => {
                warn!("Worker task for {name} failed: {e}");
                false
            }
        };

        if ok {
            succeeded += 1;
            let _ = tx.send(ProgressEvent::LogAppended(format!(
                "[ok] {name} installed successfully"
            )));
        } else {
            failed += 1;
            let _ = tx.send(ProgressEvent::LogAppended(format!(
                "[failed] {name} installation failed"
            )));
        }

        let _ = tx.send(ProgressEvent::ItemCompleted(position));

        if !pace.is_zero() {
            tokio::time::sleep(pace).await;
        }
    }

    let _ = tx.send(ProgressEvent::RunFinished {
        cancelled,
        succeeded,
        failed,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TaskRunner;
    use std::sync::atomic::AtomicUsize;

    struct FnRunner<F: Fn() -> bool + Send + Sync>(F);

    impl<F: Fn() -> bool + Send + Sync> TaskRunner for FnRunner<F> {
        fn attempt(&self) -> bool {
            (self.0)()
        }
    }

    fn task<F: Fn() -> bool + Send + Sync + 'static>(name: &str, f: F) -> ToolTask {
        ToolTask {
            name: name.to_string(),
            description: String::new(),
            runner: Arc::new(FnRunner(f)),
        }
    }

    async fn collect(
        tasks: Vec<ToolTask>,
        cancel: Arc<AtomicBool>,
    ) -> Vec<ProgressEvent> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        run_tasks(tasks, cancel, Duration::ZERO, tx).await;

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn completions(events: &[ProgressEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|ev| match ev {
                ProgressEvent::ItemCompleted(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    fn finished(events: &[ProgressEvent]) -> (bool, usize, usize) {
        let finishes: Vec<_> = events
            .iter()
            .filter_map(|ev| match ev {
                ProgressEvent::RunFinished {
                    cancelled,
                    succeeded,
                    failed,
                } => Some((*cancelled, *succeeded, *failed)),
                _ => None,
            })
            .collect();
        assert_eq!(finishes.len(), 1, "exactly one RunFinished expected");
        finishes[0]
    }

    #[tokio::test]
    async fn emits_one_completion_per_task_in_order() {
        let tasks = vec![
            task("a", || true),
            task("b", || true),
            task("c", || true),
        ];
        let events = collect(tasks, Arc::new(AtomicBool::new(false))).await;

        assert_eq!(completions(&events), [1, 2, 3]);
        assert_eq!(finished(&events), (false, 3, 0));
        // RunFinished comes last
        assert!(matches!(
            events.last(),
            Some(ProgressEvent::RunFinished { .. })
        ));
    }

    #[tokio::test]
    async fn failures_are_counted_but_do_not_stop_the_run() {
        let tasks = vec![
            task("a", || false),
            task("b", || false),
            task("c", || false),
        ];
        let events = collect(tasks, Arc::new(AtomicBool::new(false))).await;

        assert_eq!(completions(&events), [1, 2, 3]);
        assert_eq!(finished(&events), (false, 0, 3));
    }

    #[tokio::test]
    async fn panicking_runner_is_recorded_as_failure() {
        let tasks = vec![
            task("ok", || true),
            task("boom", || panic!("runner blew up")),
            task("after", || true),
        ];
        let events = collect(tasks, Arc::new(AtomicBool::new(false))).await;

        assert_eq!(completions(&events), [1, 2, 3]);
        assert_eq!(finished(&events), (false, 2, 1));
        assert!(events.iter().any(|ev| matches!(
            ev,
            ProgressEvent::LogAppended(line) if line == "[failed] boom installation failed"
        )));
    }

    #[tokio::test]
    async fn cancel_before_first_task_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let tasks = vec![task("a", move || {
            c.fetch_add(1, Ordering::SeqCst);
            true
        })];
        let events = collect(tasks, Arc::new(AtomicBool::new(true))).await;

        assert!(completions(&events).is_empty());
        assert_eq!(finished(&events), (true, 0, 0));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_at_boundary_skips_remaining_tasks() {
        let cancel = Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let later_calls = Arc::new(AtomicUsize::new(0));
        let later = later_calls.clone();

        // First tool requests cancellation mid-attempt; it still completes,
        // and the second tool must never start.
        let tasks = vec![
            task("first", move || {
                flag.store(true, Ordering::Relaxed);
                true
            }),
            task("second", move || {
                later.fetch_add(1, Ordering::SeqCst);
                true
            }),
        ];
        let events = collect(tasks, cancel).await;

        assert_eq!(completions(&events), [1]);
        assert_eq!(finished(&events), (true, 1, 0));
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn log_lines_follow_catalog_order() {
        let tasks = vec![task("a", || true), task("b", || false)];
        let events = collect(tasks, Arc::new(AtomicBool::new(false))).await;

        let log: Vec<_> = events
            .iter()
            .filter_map(|ev| match ev {
                ProgressEvent::LogAppended(line) => Some(line.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            log,
            [
                "Starting a installation...",
                "[ok] a installed successfully",
                "Starting b installation...",
                "[failed] b installation failed",
            ]
        );
    }
}
