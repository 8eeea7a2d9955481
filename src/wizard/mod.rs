pub mod engine;
pub mod finalize;
pub mod ui;

pub use engine::{ProgressEvent, RunHandle, RunState};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::catalog::{Catalog, ToolTask};
use crate::config::{FinalizeConfig, InstallerConfig};
use crate::ui::Theme;

/// Wizard screens. `Asking(i)` presents catalog entry i (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Welcome,
    Asking(usize),
    Summary,
    Running,
    Done,
}

/// Per-tool outcome of the survey phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accepted,
    Declined,
    Aborted,
}

/// Terminal result of a whole wizard run, the only summary a host needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    AbortedByUser,
    CancelledAtConfirmation,
    CompletedWithNoSelection,
    CompletedRun {
        selected: usize,
        succeeded: usize,
        failed: usize,
    },
    CancelledDuringExecution {
        completed: usize,
        total: usize,
    },
}

/// Actions the event loop carries out on the wizard's behalf.
#[derive(Debug)]
pub enum WizardAction {
    /// Spawn the execution engine for the confirmed selection.
    StartRun,
}

/// Main wizard application state. All fields live on the foreground; the
/// worker communicates exclusively through `ProgressEvent`s.
pub struct WizardApp {
    pub title: String,
    pub subtitle: String,
    pub theme: Theme,
    pub catalog: Catalog,
    pub phase: Phase,
    /// One slot per catalog entry. Entries after an abort stay `None`.
    pub decisions: Vec<Option<Decision>>,
    /// Accepted subset in catalog order, computed once on entering Summary.
    pub selected: Vec<ToolTask>,
    pub run: RunState,
    pub outcome: Option<RunOutcome>,
    pub finalizer_note: Option<String>,
    pub should_exit: bool,

    finalize_config: FinalizeConfig,
    dryrun: bool,
    pace: Duration,
    cancel: Option<Arc<AtomicBool>>,
    finalized: bool,
    spinner_frame: usize,
}

impl WizardApp {
    pub fn new(catalog: Catalog, config: &InstallerConfig) -> Self {
        let decisions = vec![None; catalog.len()];

        Self {
            title: config.general.title.clone(),
            subtitle: config.general.subtitle.clone(),
            theme: Theme::default(),
            catalog,
            phase: Phase::Welcome,
            decisions,
            selected: Vec::new(),
            run: RunState::default(),
            outcome: None,
            finalizer_note: None,
            should_exit: false,
            finalize_config: config.finalize.clone(),
            dryrun: config.general.dryrun,
            pace: Duration::from_millis(config.general.pace_ms),
            cancel: None,
            finalized: false,
            spinner_frame: 0,
        }
    }

    pub fn is_dryrun(&self) -> bool {
        self.dryrun
    }

    /// Current question position as (1-indexed, total), if asking.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self.phase {
            Phase::Asking(i) => Some((i + 1, self.catalog.len())),
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<WizardAction> {
        match self.phase {
            Phase::Welcome => self.handle_welcome_key(key),
            Phase::Asking(i) => self.handle_question_key(key, i),
            Phase::Summary => self.handle_summary_key(key),
            Phase::Running => {
                match key.code {
                    KeyCode::Esc | KeyCode::Char('c') => self.request_cancel(),
                    _ => {}
                }
                None
            }
            Phase::Done => {
                match key.code {
                    KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => {
                        self.should_exit = true;
                    }
                    _ => {}
                }
                None
            }
        }
    }

    fn handle_welcome_key(&mut self, key: KeyEvent) -> Option<WizardAction> {
        match key.code {
            KeyCode::Enter => {
                if self.catalog.is_empty() {
                    self.enter_summary();
                } else {
                    self.phase = Phase::Asking(0);
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                self.finish(RunOutcome::AbortedByUser);
            }
            _ => {}
        }
        None
    }

    fn handle_question_key(&mut self, key: KeyEvent, index: usize) -> Option<WizardAction> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => self.record(index, Decision::Accepted),
            KeyCode::Char('n') | KeyCode::Char('N') => self.record(index, Decision::Declined),
            KeyCode::Esc | KeyCode::Char('q') => {
                // Abort discards everything: later decisions stay undefined
                // and neither the engine nor the finalizer runs.
                self.decisions[index] = Some(Decision::Aborted);
                self.finish(RunOutcome::AbortedByUser);
            }
            _ => {}
        }
        None
    }

    fn handle_summary_key(&mut self, key: KeyEvent) -> Option<WizardAction> {
        match key.code {
            KeyCode::Enter => {
                if self.selected.is_empty() {
                    self.finish(RunOutcome::CompletedWithNoSelection);
                } else {
                    self.phase = Phase::Running;
                    return Some(WizardAction::StartRun);
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                self.finish(RunOutcome::CancelledAtConfirmation);
            }
            _ => {}
        }
        None
    }

    fn record(&mut self, index: usize, decision: Decision) {
        self.decisions[index] = Some(decision);
        if index + 1 < self.catalog.len() {
            self.phase = Phase::Asking(index + 1);
        } else {
            self.enter_summary();
        }
    }

    fn enter_summary(&mut self) {
        self.selected = self
            .catalog
            .iter()
            .zip(&self.decisions)
            .filter(|(_, d)| **d == Some(Decision::Accepted))
            .map(|(task, _)| task.clone())
            .collect();
        info!("Selected {} tool(s)", self.selected.len());
        self.phase = Phase::Summary;
    }

    /// Spawn the execution engine for the confirmed selection and hand the
    /// event stream to the caller, which drains it on the foreground.
    pub fn start_run(&mut self) -> mpsc::UnboundedReceiver<ProgressEvent> {
        let tasks = self.selected.clone();
        self.run = RunState::new(tasks.len());
        let handle = engine::spawn_run(tasks, self.pace);
        self.cancel = Some(handle.cancel);
        handle.events
    }

    /// Request cooperative cancellation. Idempotent; a no-op once finished.
    pub fn request_cancel(&mut self) {
        if self.run.finished {
            return;
        }
        if let Some(ref cancel) = self.cancel {
            cancel.store(true, Ordering::Relaxed);
            self.run.cancel_requested = true;
        }
    }

    /// Apply one progress event to the run state. Returns true when the run
    /// reached its terminal state.
    pub fn apply_progress(&mut self, event: ProgressEvent) -> bool {
        match event {
            ProgressEvent::StatusChanged(status) => {
                self.run.status_line = status;
            }
            ProgressEvent::LogAppended(line) => {
                self.run.log.push(line);
            }
            ProgressEvent::ItemCompleted(count) => {
                // completed is monotone and never exceeds total
                if count > self.run.completed && count <= self.run.total {
                    self.run.completed = count;
                }
            }
            ProgressEvent::RunFinished {
                cancelled,
                succeeded,
                failed,
            } => {
                self.run.finished = true;
                self.run.cancelled = cancelled;
                self.run.succeeded = succeeded;
                self.run.failed = failed;
                self.run.status_line = if cancelled {
                    "Installation cancelled".to_string()
                } else {
                    "Installation complete!".to_string()
                };

                let outcome = if cancelled {
                    RunOutcome::CancelledDuringExecution {
                        completed: self.run.completed,
                        total: self.run.total,
                    }
                } else {
                    RunOutcome::CompletedRun {
                        selected: self.run.total,
                        succeeded,
                        failed,
                    }
                };
                self.finish(outcome);
                return true;
            }
        }
        false
    }

    /// Record the terminal outcome. Every path except a decision-phase abort
    /// runs the finalizer, exactly once.
    fn finish(&mut self, outcome: RunOutcome) {
        if self.outcome.is_some() {
            return;
        }

        if !matches!(outcome, RunOutcome::AbortedByUser) {
            self.run_finalizer();
        }

        self.outcome = Some(outcome);
        match outcome {
            RunOutcome::AbortedByUser | RunOutcome::CancelledAtConfirmation => {
                self.should_exit = true;
            }
            _ => {
                self.phase = Phase::Done;
            }
        }
    }

    fn run_finalizer(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        if self.dryrun {
            info!("Dryrun: skipping finalizer");
            return;
        }

        if let Err(e) = finalize::run(&self.finalize_config) {
            warn!("Finalizer failed: {e}");
            self.finalizer_note =
                Some(format!("Note: could not install shell environment file: {e}"));
        }
    }

    pub fn tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % 4;
    }

    pub fn spinner_char(&self) -> char {
        const SPINNER: [char; 4] = ['|', '/', '-', '\\'];
        SPINNER[self.spinner_frame]
    }

    /// Status bar hints for the current screen.
    pub fn status_hints(&self) -> (&'static str, &'static str) {
        match self.phase {
            Phase::Welcome => ("", "Enter: start  q: quit"),
            Phase::Asking(_) => ("Install this tool?", "y: yes  n: no  Esc: cancel"),
            Phase::Summary => {
                if self.selected.is_empty() {
                    ("No tools selected", "Enter: finish  Esc: cancel")
                } else {
                    ("Ready to install", "Enter: install  Esc: cancel")
                }
            }
            Phase::Running => {
                if self.run.cancel_requested {
                    ("Cancelling after current tool...", "")
                } else {
                    ("Installing...", "Esc: cancel")
                }
            }
            Phase::Done => ("All done", "Enter: close"),
        }
    }
}
