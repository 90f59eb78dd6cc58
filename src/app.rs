use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config;
use crate::data::{self, CatalogService, CommentService};
use crate::logging;
use crate::router::Route;
use crate::session;
use crate::storage;
use crate::ui;
use crate::youtube::{self, API_KEY_ENV};

/// Starts the terminal UI. `initial_path` is an app path such as `/trending`
/// or `/results?search_query=rust`; unknown paths open the home feed.
pub fn run(initial_path: Option<String>) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let log_path = logging::init().context("init logging")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());
    info!(version = crate::VERSION, log = ?log_path, "starting tube-tui");

    let store =
        Arc::new(storage::Store::open(storage::Options::default()).context("open storage")?);
    let session_manager = Arc::new(session::Manager::open(store.clone()));

    let base_url = Some(cfg.catalog.base_url.trim().to_string()).filter(|url| !url.is_empty());
    let client = youtube::Client::new(youtube::ClientConfig {
        api_key: cfg.catalog.api_key.clone(),
        base_url,
        user_agent: cfg.catalog.user_agent.clone(),
        region_code: cfg.catalog.region_code.clone(),
        timeout: Some(cfg.catalog.timeout),
        http_client: None,
    })
    .context("create catalog client")?;
    let has_api_key = client.has_api_key();
    let service = Arc::new(data::YouTubeCatalogService::new(
        Arc::new(client),
        cfg.catalog.page_size,
    ));
    let catalog: Arc<dyn CatalogService> = service.clone();
    let comments: Arc<dyn CommentService> = service;

    let status = if !has_api_key {
        format!(
            "No API key configured. Set {} or catalog.api_key in {}.",
            API_KEY_ENV, display_path
        )
    } else {
        "Browsing videos. Press / to search, 1-8 for the menu, q to quit.".to_string()
    };

    let initial_route = initial_path
        .as_deref()
        .map(Route::parse)
        .unwrap_or(Route::Home);

    let options = ui::Options {
        status_message: status,
        catalog,
        comments,
        session: session_manager,
        player: cfg.player.clone(),
        config_path: display_path,
        initial_route,
    };

    let mut model = ui::Model::new(options);
    let result = model.run();
    drop(model);

    if let Ok(store) = Arc::try_unwrap(store) {
        store.close().context("close storage")?;
    }
    result
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/tube-tui/config.yaml".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn friendly_path_falls_back_to_default_location() {
        assert_eq!(friendly_path(None), "~/.config/tube-tui/config.yaml");
    }

    #[test]
    fn friendly_path_abbreviates_home() {
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".config").join("tube-tui").join("config.yaml");
            assert_eq!(
                friendly_path(Some(&path)),
                "~/.config/tube-tui/config.yaml"
            );
        }
        let outside = PathBuf::from("/etc/tube-tui/config.yaml");
        assert_eq!(friendly_path(Some(&outside)), "/etc/tube-tui/config.yaml");
    }
}
