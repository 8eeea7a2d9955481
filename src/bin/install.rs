use clap::Parser;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::stdout;
use std::panic;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zush_installer::catalog::Catalog;
use zush_installer::config::InstallerConfig;
use zush_installer::error::{InstallerError, Result};
use zush_installer::event::{Event, EventHandler};
use zush_installer::wizard::{ProgressEvent, RunOutcome, WizardAction, WizardApp};

#[derive(Parser, Debug)]
#[command(name = "zush-install")]
#[command(author, version, about = "Interactive installer for the Zush shell environment")]
struct Args {
    /// Path to installer config file (default: ~/.config/zush/installer.toml)
    #[arg(long)]
    config: Option<String>,

    /// Simulate all installations without running real commands
    #[arg(long)]
    dryrun: bool,

    /// Log file path (logging disabled if not specified)
    #[arg(long)]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging only if log file is specified
    if let Some(ref log_path) = args.log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .ok();

        if let Some(file) = file {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .init();

            info!("Starting zush-install");
        }
    }

    // Set up panic handler to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    // Initialize terminal
    let mut terminal = setup_terminal()?;

    // Run the wizard
    let result = run_wizard(&mut terminal, args.config.as_deref(), args.dryrun).await;

    // Restore terminal
    restore_terminal()?;

    match result {
        Ok(outcome) => {
            let message = outcome_message(outcome);
            info!("{message}");
            println!("{message}");
            Ok(())
        }
        Err(e) => {
            error!("Installer error: {e}");
            Err(e)
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<std::io::Stdout>>> {
    enable_raw_mode().map_err(|e| InstallerError::Terminal(e.to_string()))?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| InstallerError::Terminal(e.to_string()))?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).map_err(|e| InstallerError::Terminal(e.to_string()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode().map_err(|e| InstallerError::Terminal(e.to_string()))?;
    execute!(stdout(), LeaveAlternateScreen).map_err(|e| InstallerError::Terminal(e.to_string()))?;
    Ok(())
}

fn outcome_message(outcome: Option<RunOutcome>) -> String {
    match outcome {
        Some(RunOutcome::AbortedByUser) | None => "Installation cancelled by user.".to_string(),
        Some(RunOutcome::CancelledAtConfirmation) => {
            "Installation cancelled at summary.".to_string()
        }
        Some(RunOutcome::CompletedWithNoSelection) => {
            "No tools selected. Zush installation process finished!".to_string()
        }
        Some(RunOutcome::CompletedRun {
            selected,
            succeeded,
            failed,
        }) => {
            if failed == 0 {
                format!("Installed {succeeded} of {selected} tool(s). Zush installation process finished!")
            } else {
                format!(
                    "Installed {succeeded} of {selected} tool(s), {failed} failed. Zush installation process finished!"
                )
            }
        }
        Some(RunOutcome::CancelledDuringExecution { completed, total }) => {
            format!("Installation cancelled after {completed} of {total} tool(s).")
        }
    }
}

async fn run_wizard(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    config_path: Option<&str>,
    dryrun: bool,
) -> Result<Option<RunOutcome>> {
    let tick_rate = Duration::from_millis(250);
    let mut events = EventHandler::new(tick_rate);

    // Load config from specified path, default path, or use defaults
    let mut config = match config_path {
        Some(path) => InstallerConfig::load_from(path).unwrap_or_default(),
        None => InstallerConfig::load().unwrap_or_default(),
    };

    // --dryrun flag overrides config
    if dryrun {
        config.general.dryrun = true;
    }

    let catalog = Catalog::from_config(&config.tools, config.general.dryrun)?;
    let mut app = WizardApp::new(catalog, &config);

    // Event stream of the active run, if any. The foreground loop is the
    // single consumer; draining it here keeps all UI mutation on this task.
    let mut run_events: Option<mpsc::UnboundedReceiver<ProgressEvent>> = None;

    loop {
        terminal
            .draw(|frame| zush_installer::wizard::ui::draw(frame, &app))
            .map_err(|e| InstallerError::Terminal(e.to_string()))?;

        if let Some(rx) = run_events.as_mut() {
            tokio::select! {
                maybe_event = events.next() => {
                    if let Some(event) = maybe_event {
                        // StartRun cannot recur while a run is active; only
                        // cancellation and ticks are meaningful here.
                        dispatch(&mut app, event);
                    }
                }
                maybe_msg = rx.recv() => {
                    match maybe_msg {
                        Some(ev) => {
                            if app.apply_progress(ev) {
                                run_events = None;
                            }
                        }
                        None => run_events = None,
                    }
                }
            }
        } else if let Some(event) = events.next().await {
            if let Some(WizardAction::StartRun) = dispatch(&mut app, event) {
                run_events = Some(app.start_run());
            }
        }

        if app.should_exit {
            break;
        }
    }

    Ok(app.outcome)
}

fn dispatch(app: &mut WizardApp, event: Event) -> Option<WizardAction> {
    match event {
        Event::Key(key) => app.handle_key(key),
        Event::Tick => {
            app.tick();
            None
        }
        Event::Resize => None,
    }
}
