use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_ENV: &str = "TUBE_TUI_LOG";
const DEFAULT_DIRECTIVES: &str = "info,tube_tui=debug,reqwest=warn";

static INSTALLED: OnceCell<Option<PathBuf>> = OnceCell::new();

fn log_path() -> Option<PathBuf> {
    std::env::var(LOG_FILE_ENV)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

/// Routes `tracing` output to the file named by `TUBE_TUI_LOG`. The terminal
/// belongs to the UI, so nothing is installed when the variable is unset.
/// `RUST_LOG` still overrides the default directives.
pub fn init() -> Result<Option<PathBuf>> {
    if let Some(installed) = INSTALLED.get() {
        return Ok(installed.clone());
    }
    let Some(path) = log_path() else {
        let _ = INSTALLED.set(None);
        return Ok(None);
    };

    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("logging: create directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("logging: open {}", path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!("logging: install subscriber: {err}"))?;

    let _ = INSTALLED.set(Some(path.clone()));
    Ok(Some(path))
}
