use std::collections::HashSet;
use std::env;
use std::process::{Command, Stdio};
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ToolConfig;
use crate::error::{InstallerError, Result};

/// A named unit of installable work.
///
/// Implementations should report failure through the return value rather
/// than panicking; the execution engine still contains a panicking runner
/// at its boundary and records it as a failure.
pub trait TaskRunner: Send + Sync {
    fn attempt(&self) -> bool;
}

/// One catalog entry: a tool the user may choose to install.
#[derive(Clone)]
pub struct ToolTask {
    pub name: String,
    pub description: String,
    pub runner: Arc<dyn TaskRunner>,
}

impl std::fmt::Debug for ToolTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolTask")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered, immutable list of installable tools. Built once at startup and
/// only ever read afterwards.
#[derive(Debug)]
pub struct Catalog {
    tasks: Vec<ToolTask>,
}

impl Catalog {
    pub fn new(tasks: Vec<ToolTask>) -> Result<Self> {
        let mut seen = HashSet::new();
        for task in &tasks {
            if task.name.is_empty() {
                return Err(InstallerError::Catalog(
                    "tool name must not be empty".to_string(),
                ));
            }
            if !seen.insert(task.name.clone()) {
                return Err(InstallerError::Catalog(format!(
                    "duplicate tool name: {}",
                    task.name
                )));
            }
        }
        Ok(Self { tasks })
    }

    pub fn from_config(tools: &[ToolConfig], dryrun: bool) -> Result<Self> {
        let tasks = tools
            .iter()
            .map(|tool| {
                let runner: Arc<dyn TaskRunner> = if dryrun {
                    Arc::new(DryrunRunner)
                } else {
                    Arc::new(CommandRunner {
                        command: tool.command.clone(),
                        check: tool.check.clone(),
                    })
                };
                ToolTask {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    runner,
                }
            })
            .collect();
        Self::new(tasks)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ToolTask> {
        self.tasks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ToolTask> {
        self.tasks.iter()
    }
}

/// Production runner: skip when the check binary is already on $PATH,
/// otherwise run the configured install command and report its exit status.
pub struct CommandRunner {
    pub command: String,
    pub check: Option<String>,
}

impl TaskRunner for CommandRunner {
    fn attempt(&self) -> bool {
        if let Some(ref bin) = self.check {
            if binary_on_path(bin) {
                debug!("{bin} already installed, skipping");
                return true;
            }
        }

        let argv = match shell_words::split(&self.command) {
            Ok(argv) if !argv.is_empty() => argv,
            _ => return false,
        };

        info!("Running: {:?}", argv);

        Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

/// Dryrun runner: always succeeds without side effects.
pub struct DryrunRunner;

impl TaskRunner for DryrunRunner {
    fn attempt(&self) -> bool {
        true
    }
}

fn binary_on_path(name: &str) -> bool {
    let Some(paths) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&paths).any(|dir| dir.join(name).is_file())
}
