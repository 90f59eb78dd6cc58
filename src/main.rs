fn main() {
    let Some(initial_path) = handle_cli_flags() else {
        return;
    };

    if let Err(err) = tube_tui::run(initial_path) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

/// Returns `None` when a flag was handled and the program should exit,
/// otherwise the optional start path.
fn handle_cli_flags() -> Option<Option<String>> {
    let mut saw_flag = false;
    let mut initial_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Tube-TUI {}", tube_tui::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "Tube-TUI - Browse videos from the terminal.\n\nUsage: tube-tui [PATH]\n\n  PATH                 Start page, e.g. /trending, /shorts, /results?search_query=rust\n  --set-api-key KEY    Save a YouTube Data API key to the config file and exit\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n\nThe YOUTUBE_API_KEY environment variable overrides the saved key.\nSet TUBE_TUI_LOG to a file path to write debug logs."
                );
                saw_flag = true;
            }
            "--set-api-key" => {
                saw_flag = true;
                let key = args.next().unwrap_or_default();
                match tube_tui::config::save_api_key(None, &key) {
                    Ok(path) => println!("Saved API key to {}", path.display()),
                    Err(err) => {
                        eprintln!("error: {err:?}");
                        std::process::exit(1);
                    }
                }
            }
            path if path.starts_with('/') && initial_path.is_none() => {
                initial_path = Some(path.to_string());
            }
            other => {
                eprintln!("warning: ignoring unknown argument {other}");
            }
        }
    }
    if saw_flag {
        None
    } else {
        Some(initial_path)
    }
}
