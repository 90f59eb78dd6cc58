use std::process::{Command, Stdio};
use std::thread;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

const WATCH_BASE: &str = "https://www.youtube.com/watch?v=";
const CHANNEL_BASE: &str = "https://www.youtube.com/channel/";
const URL_PLACEHOLDER: &str = "%URL%";
const TITLE_PLACEHOLDER: &str = "%TITLE%";

pub fn watch_url(video_id: &str) -> String {
    format!("{WATCH_BASE}{}", video_id.trim())
}

pub fn channel_url(channel_id: &str) -> String {
    format!("{CHANNEL_BASE}{}", channel_id.trim())
}

pub struct ExternalLaunchOptions<'a> {
    /// Program followed by its arguments. `%URL%` and `%TITLE%` are replaced.
    pub command: &'a [String],
    pub url: &'a str,
    pub title: &'a str,
    pub detach: bool,
}

/// Expands the configured player command for one video. When the command has
/// no `%URL%` placeholder the URL is appended as the last argument.
pub fn player_args(command: &[String], url: &str, title: &str) -> Result<(String, Vec<String>)> {
    let (program, rest) = command
        .split_first()
        .ok_or_else(|| anyhow!("player command is empty"))?;
    if program.trim().is_empty() {
        return Err(anyhow!("player command is empty"));
    }

    let mut saw_url = false;
    let mut args = Vec::with_capacity(rest.len() + 1);
    for arg in rest {
        if arg.contains(URL_PLACEHOLDER) {
            saw_url = true;
        }
        args.push(
            arg.replace(URL_PLACEHOLDER, url)
                .replace(TITLE_PLACEHOLDER, title),
        );
    }
    if !saw_url {
        args.push(url.to_string());
    }
    Ok((program.clone(), args))
}

pub fn spawn_external_player(opts: ExternalLaunchOptions<'_>) -> Result<()> {
    if opts.url.trim().is_empty() {
        return Err(anyhow!("video URL missing"));
    }
    let (program, args) = player_args(opts.command, opts.url, opts.title)?;
    debug!(program = %program, ?args, detach = opts.detach, "launching player");

    let mut command = Command::new(&program);
    command.args(&args);
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());
    let mut child = command
        .spawn()
        .with_context(|| format!("launch {program} for {}", opts.url))?;

    if opts.detach {
        return Ok(());
    }
    thread::spawn(move || match child.wait() {
        Ok(status) if status.success() => debug!(program = %program, "player exited"),
        Ok(status) => warn!(program = %program, %status, "player exited with failure"),
        Err(err) => warn!(program = %program, error = %err, "waiting on player failed"),
    });
    Ok(())
}

pub fn open_in_browser(url: &str) -> Result<()> {
    webbrowser::open(url).with_context(|| format!("open {url} in browser"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[test]
    fn builds_public_urls() {
        assert_eq!(watch_url(" abc123 "), "https://www.youtube.com/watch?v=abc123");
        assert_eq!(channel_url("UC1"), "https://www.youtube.com/channel/UC1");
    }

    #[test]
    fn substitutes_placeholders() {
        let (program, args) = player_args(
            &command(&["mpv", "--fs", "--title=%TITLE%", "%URL%"]),
            "https://example.test/v",
            "Lofi",
        )
        .unwrap();
        assert_eq!(program, "mpv");
        assert_eq!(args, vec!["--fs", "--title=Lofi", "https://example.test/v"]);
    }

    #[test]
    fn appends_url_without_placeholder() {
        let (_, args) = player_args(&command(&["vlc"]), "https://example.test/v", "").unwrap();
        assert_eq!(args, vec!["https://example.test/v"]);
    }

    #[test]
    fn empty_command_is_an_error() {
        assert!(player_args(&[], "u", "t").is_err());
        assert!(player_args(&command(&[" "]), "u", "t").is_err());
    }

    #[test]
    fn blank_url_is_rejected_before_spawning() {
        let cmd = command(&["mpv", "%URL%"]);
        let result = spawn_external_player(ExternalLaunchOptions {
            command: &cmd,
            url: "  ",
            title: "",
            detach: true,
        });
        assert!(result.is_err());
    }
}
