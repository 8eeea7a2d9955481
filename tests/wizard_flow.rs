//! End-to-end wizard flows: survey, confirmation, execution, finalizer.

use std::fs;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use zush_installer::catalog::{Catalog, TaskRunner, ToolTask};
use zush_installer::config::InstallerConfig;
use zush_installer::wizard::{RunOutcome, WizardAction, WizardApp};

struct FnRunner<F: Fn() -> bool + Send + Sync>(F);

impl<F: Fn() -> bool + Send + Sync> TaskRunner for FnRunner<F> {
    fn attempt(&self) -> bool {
        (self.0)()
    }
}

fn task(name: &str, ok: bool) -> ToolTask {
    ToolTask {
        name: name.to_string(),
        description: format!("{name} description"),
        runner: Arc::new(FnRunner(move || ok)),
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn app_for(tasks: Vec<ToolTask>, config: &InstallerConfig) -> WizardApp {
    WizardApp::new(Catalog::new(tasks).unwrap(), config)
}

fn fast_dryrun_config() -> InstallerConfig {
    let mut config = InstallerConfig::default();
    config.general.dryrun = true;
    config.general.pace_ms = 0;
    config
}

#[tokio::test]
async fn mixed_results_run_reports_per_tool_outcomes() {
    let config = fast_dryrun_config();
    let mut app = app_for(
        vec![task("a", true), task("b", false), task("c", true)],
        &config,
    );

    // Survey: accept a and b, decline c
    app.handle_key(key(KeyCode::Enter));
    app.handle_key(key(KeyCode::Char('y')));
    app.handle_key(key(KeyCode::Char('y')));
    app.handle_key(key(KeyCode::Char('n')));

    let names: Vec<_> = app.selected.iter().map(|t| t.name.clone()).collect();
    assert_eq!(names, ["a", "b"]);

    // Confirm and run to completion
    let action = app.handle_key(key(KeyCode::Enter));
    assert!(matches!(action, Some(WizardAction::StartRun)));

    let mut rx = app.start_run();
    while let Some(ev) = rx.recv().await {
        if app.apply_progress(ev) {
            break;
        }
    }

    assert_eq!(
        app.outcome,
        Some(RunOutcome::CompletedRun {
            selected: 2,
            succeeded: 1,
            failed: 1
        })
    );
    assert_eq!(app.run.completed, 2);

    // Log covers a and b only, in catalog order
    let log = app.run.log.join("\n");
    let a_start = log.find("Starting a installation").unwrap();
    let b_start = log.find("Starting b installation").unwrap();
    assert!(a_start < b_start);
    assert!(log.contains("[ok] a installed successfully"));
    assert!(log.contains("[failed] b installation failed"));
    assert!(!log.contains("c installation"));
}

#[test]
fn declining_everything_still_runs_the_finalizer_once() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("zshenv.src");
    let target = dir.path().join(".zshenv");
    fs::write(&source, "export ZUSH=1\n").unwrap();

    let mut config = InstallerConfig::default();
    config.general.pace_ms = 0;
    config.finalize.source = source.to_string_lossy().into_owned();
    config.finalize.target = target.to_string_lossy().into_owned();

    let mut app = app_for(vec![task("a", true), task("b", true)], &config);
    app.handle_key(key(KeyCode::Enter));
    app.handle_key(key(KeyCode::Char('n')));
    app.handle_key(key(KeyCode::Char('n')));
    app.handle_key(key(KeyCode::Enter));

    assert_eq!(app.outcome, Some(RunOutcome::CompletedWithNoSelection));
    assert_eq!(fs::read_to_string(&target).unwrap(), "export ZUSH=1\n");
}

#[test]
fn aborting_mid_survey_skips_engine_and_finalizer() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("zshenv.src");
    let target = dir.path().join(".zshenv");
    fs::write(&source, "export ZUSH=1\n").unwrap();

    let mut config = InstallerConfig::default();
    config.finalize.source = source.to_string_lossy().into_owned();
    config.finalize.target = target.to_string_lossy().into_owned();

    let mut app = app_for(vec![task("a", true), task("b", true)], &config);
    app.handle_key(key(KeyCode::Enter));
    app.handle_key(key(KeyCode::Char('y')));
    app.handle_key(key(KeyCode::Esc));

    assert_eq!(app.outcome, Some(RunOutcome::AbortedByUser));
    assert!(app.should_exit);
    assert!(!target.exists());
}

#[tokio::test]
async fn all_failures_do_not_stop_the_sequence() {
    let config = fast_dryrun_config();
    let mut app = app_for(
        vec![task("a", false), task("b", false), task("c", false)],
        &config,
    );

    app.handle_key(key(KeyCode::Enter));
    for _ in 0..3 {
        app.handle_key(key(KeyCode::Char('y')));
    }
    app.handle_key(key(KeyCode::Enter));

    let mut rx = app.start_run();
    while let Some(ev) = rx.recv().await {
        if app.apply_progress(ev) {
            break;
        }
    }

    assert_eq!(
        app.outcome,
        Some(RunOutcome::CompletedRun {
            selected: 3,
            succeeded: 0,
            failed: 3
        })
    );
    assert_eq!(app.run.completed, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelling_mid_run_stops_at_the_next_boundary() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    let config = fast_dryrun_config();

    // The first tool blocks until the foreground has requested cancellation,
    // so the flag is guaranteed to be set before the next task boundary. The
    // tool itself still finishes; the second tool never starts.
    let release = Arc::new(AtomicBool::new(false));
    let gate = release.clone();
    let first = ToolTask {
        name: "first".to_string(),
        description: String::new(),
        runner: Arc::new(FnRunner(move || {
            while !gate.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            true
        })),
    };
    let mut app = app_for(vec![first, task("second", true)], &config);

    app.handle_key(key(KeyCode::Enter));
    app.handle_key(key(KeyCode::Char('y')));
    app.handle_key(key(KeyCode::Char('y')));
    app.handle_key(key(KeyCode::Enter));

    let mut rx = app.start_run();
    while let Some(ev) = rx.recv().await {
        let starting_first = matches!(
            &ev,
            zush_installer::wizard::ProgressEvent::LogAppended(line)
                if line.starts_with("Starting first")
        );
        if app.apply_progress(ev) {
            break;
        }
        if starting_first {
            app.request_cancel();
            release.store(true, Ordering::SeqCst);
        }
    }

    assert_eq!(
        app.outcome,
        Some(RunOutcome::CancelledDuringExecution {
            completed: 1,
            total: 2
        })
    );
    assert!(!app.run.log.iter().any(|l| l.contains("second")));
}
