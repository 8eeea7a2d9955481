use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::config::FinalizeConfig;
use crate::error::Result;

/// Expand a leading `~/` against the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Best-effort post-run step: put the Zush shell environment file in place.
/// A missing source is a quiet no-op. The caller swallows any error and
/// surfaces it only as an informational note.
pub fn run(config: &FinalizeConfig) -> Result<()> {
    let source = expand_home(&config.source);
    let target = expand_home(&config.target);

    if !source.exists() {
        info!("Finalize source {:?} not present, nothing to do", source);
        return Ok(());
    }

    if config.backup && target.exists() {
        let mut backup = target.clone().into_os_string();
        backup.push(".old");
        fs::copy(&target, PathBuf::from(backup))?;
    }

    fs::copy(&source, &target)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&target, fs::Permissions::from_mode(0o644))?;
    }

    info!("Installed {:?} to {:?}", source, target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path, backup: bool) -> FinalizeConfig {
        FinalizeConfig {
            source: dir.join("zshenv.src").to_string_lossy().into_owned(),
            target: dir.join(".zshenv").to_string_lossy().into_owned(),
            backup,
        }
    }

    #[test]
    fn copies_source_over_target_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), true);
        fs::write(&cfg.source, "export ZUSH=1\n").unwrap();
        fs::write(&cfg.target, "old contents\n").unwrap();

        run(&cfg).unwrap();

        assert_eq!(fs::read_to_string(&cfg.target).unwrap(), "export ZUSH=1\n");
        let backup = format!("{}.old", cfg.target);
        assert_eq!(fs::read_to_string(backup).unwrap(), "old contents\n");
    }

    #[test]
    fn missing_source_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), true);

        run(&cfg).unwrap();

        assert!(!PathBuf::from(&cfg.target).exists());
    }

    #[test]
    fn repeat_runs_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), false);
        fs::write(&cfg.source, "export ZUSH=1\n").unwrap();

        run(&cfg).unwrap();
        run(&cfg).unwrap();

        assert_eq!(fs::read_to_string(&cfg.target).unwrap(), "export ZUSH=1\n");
    }
}
