use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub general: GeneralConfig,
    pub finalize: FinalizeConfig,
    /// Catalog of installable tools, in presentation order
    pub tools: Vec<ToolConfig>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            finalize: FinalizeConfig::default(),
            tools: default_tools(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub title: String,
    pub subtitle: String,
    /// Dry run mode - simulates all installations without running real
    /// commands and skips the finalizer's file copy
    pub dryrun: bool,
    /// Pause between tools so the log stays readable. Zero disables pacing.
    pub pace_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            title: "Zush Installer".to_string(),
            subtitle: "Mid-Performance ZSH Configuration".to_string(),
            dryrun: false,
            pace_ms: 500,
        }
    }
}

/// One installable tool presented by the wizard
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    /// Display name, unique within the catalog
    pub name: String,
    /// Description shown on the question screen
    #[serde(default)]
    pub description: String,
    /// Install command line, parsed with shell-words
    pub command: String,
    /// Binary name that short-circuits to success when already on $PATH
    #[serde(default)]
    pub check: Option<String>,
}

/// Post-run shell environment file placement
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FinalizeConfig {
    pub source: String,
    pub target: String,
    pub backup: bool,
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self {
            source: "~/.config/zush/home/.zshenv".to_string(),
            target: "~/.zshenv".to_string(),
            backup: true,
        }
    }
}

impl InstallerConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: InstallerConfig = toml::from_str(&content)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("zush")
        .join("installer.toml")
}

fn tool(name: &str, description: &str, command: &str, check: Option<&str>) -> ToolConfig {
    ToolConfig {
        name: name.to_string(),
        description: description.to_string(),
        command: command.to_string(),
        check: check.map(str::to_string),
    }
}

/// The stock Zush tool catalog, used when no config file overrides it
fn default_tools() -> Vec<ToolConfig> {
    vec![
        tool(
            "hishtory",
            "Better shell history with sync, search, and context. Replaces ctrl+r with rich search.",
            "brew install hishtory",
            Some("hishtory"),
        ),
        tool(
            "claude-cli",
            "Claude AI assistant directly in your terminal for coding help and questions.",
            "npm install -g @anthropic-ai/claude-code",
            Some("claude"),
        ),
        tool(
            "llm",
            "Access multiple AI models (OpenAI, Anthropic, local) from the command line.",
            "pip3 install llm",
            Some("llm"),
        ),
        tool(
            "eza",
            "Modern ls replacement with git integration, colors, and tree views.",
            "brew install eza",
            Some("eza"),
        ),
        tool(
            "fd",
            "Blazingly fast find alternative with intuitive syntax and smart defaults.",
            "brew install fd",
            Some("fd"),
        ),
        tool(
            "ripgrep",
            "Lightning-fast grep replacement that respects .gitignore and has better output.",
            "brew install ripgrep",
            Some("rg"),
        ),
        tool(
            "bat",
            "Cat clone with syntax highlighting, line numbers, and git integration.",
            "brew install bat",
            Some("bat"),
        ),
        tool(
            "bat-extras",
            "Useful scripts that integrate bat with other tools (batgrep, batdiff, batman).",
            "brew install bat-extras",
            Some("batgrep"),
        ),
        tool(
            "fzf",
            "Interactive fuzzy finder for files, history, processes. Essential for productivity.",
            "brew install fzf",
            Some("fzf"),
        ),
        tool(
            "starship",
            "Fast, customizable shell prompt showing git status, languages, and more context.",
            "brew install starship",
            Some("starship"),
        ),
        tool(
            "trash-cli",
            "Safely delete files by moving to trash instead of permanent deletion.",
            "brew install trash-cli",
            Some("trash"),
        ),
        tool(
            "imagemagick",
            "Powerful command-line image editing and conversion toolkit.",
            "brew install imagemagick",
            Some("magick"),
        ),
        tool(
            "direnv",
            "Automatically load/unload environment variables when entering/leaving directories.",
            "brew install direnv",
            Some("direnv"),
        ),
        tool(
            "ov",
            "Modern pager with search, syntax highlighting, and better navigation than less.",
            "brew install ov",
            Some("ov"),
        ),
        tool(
            "btop",
            "Beautiful system monitor showing CPU, memory, disks, network with mouse support.",
            "brew install btop",
            Some("btop"),
        ),
        tool(
            "git-delta",
            "Enhanced git diff viewer with syntax highlighting and side-by-side diffs.",
            "brew install git-delta",
            Some("delta"),
        ),
        tool(
            "glow",
            "Beautiful markdown renderer for terminal with TUI for browsing files.",
            "brew install glow",
            Some("glow"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_catalog_has_stock_tools() {
        let config = InstallerConfig::default();
        assert_eq!(config.tools.len(), 17);
        assert_eq!(config.tools[0].name, "hishtory");
        assert_eq!(config.tools.last().unwrap().name, "glow");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = InstallerConfig::load_from("/nonexistent/zush/installer.toml").unwrap();
        assert_eq!(config.tools.len(), 17);
        assert!(!config.general.dryrun);
    }

    #[test]
    fn file_overrides_catalog_and_general() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[general]
title = "Custom Installer"
dryrun = true
pace_ms = 0

[[tools]]
name = "jq"
description = "JSON swiss army knife"
command = "brew install jq"
check = "jq"
"#
        )
        .unwrap();

        let config = InstallerConfig::load_from(file.path()).unwrap();
        assert_eq!(config.general.title, "Custom Installer");
        assert!(config.general.dryrun);
        assert_eq!(config.general.pace_ms, 0);
        assert_eq!(config.tools.len(), 1);
        assert_eq!(config.tools[0].check.as_deref(), Some("jq"));
        // Untouched sections keep their defaults
        assert_eq!(config.finalize.target, "~/.zshenv");
    }
}
