use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::app::{App, UiMode};
use crate::constants::DEFAULT_EXPORT_PATH;

#[derive(Debug, Clone)]
pub struct CommandItem {
    pub name: &'static str,
    pub shortcut: Option<&'static str>,
    pub description: &'static str,
    pub action: &'static str,
}

pub fn commands_list() -> Vec<CommandItem> {
    vec![
        CommandItem {
            name: "new",
            shortcut: Some("n"),
            description: "Start a new conversation",
            action: "session:new",
        },
        CommandItem {
            name: "clear",
            shortcut: Some("c"),
            description: "Clear the screen, keep the conversation",
            action: "session:clear",
        },
        CommandItem {
            name: "guide",
            shortcut: Some("g"),
            description: "Switch between chat and guided questions",
            action: "view:toggle",
        },
        CommandItem {
            name: "theme",
            shortcut: Some("t"),
            description: "Toggle light and dark theme",
            action: "settings:theme",
        },
        CommandItem {
            name: "copy",
            shortcut: Some("y"),
            description: "Copy the latest code block",
            action: "tool:copy",
        },
        CommandItem {
            name: "export",
            shortcut: Some("e"),
            description: "Save the conversation as HTML",
            action: "tool:export",
        },
        CommandItem {
            name: "about",
            shortcut: None,
            description: "About Sona",
            action: "help:about",
        },
        CommandItem {
            name: "quit",
            shortcut: Some("q"),
            description: "Leave Sona",
            action: "app:quit",
        },
    ]
}

pub fn filter_commands(commands: &[CommandItem], query: &str) -> Vec<CommandItem> {
    if query.trim().is_empty() {
        return commands.to_vec();
    }
    let q = query.trim().to_lowercase();
    commands
        .iter()
        .filter(|c| {
            c.name.starts_with(&q)
                || c.description.to_lowercase().contains(&q)
                || c.shortcut.map(|s| s.starts_with(&q)).unwrap_or(false)
        })
        .cloned()
        .collect()
}

pub fn parse_command(input: &str) -> Option<(CommandItem, Option<String>)> {
    let trimmed = input.trim();
    let rest = trimmed.strip_prefix('/')?;
    let mut parts = rest.splitn(2, ' ');
    let name = parts.next()?.to_lowercase();
    let arg = parts
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    commands_list()
        .into_iter()
        .find(|c| c.name == name || c.shortcut == Some(name.as_str()))
        .map(|c| (c, arg))
}

pub fn execute_command(app: &mut App, cmd: &CommandItem, arg: Option<String>) {
    log::debug!("command /{} {:?}", cmd.name, arg);
    app.mode = UiMode::Normal;
    match cmd.action {
        "session:new" => {
            if app.reset_conversation() {
                app.set_toast("Started a new conversation");
            }
        }
        "session:clear" => {
            if app.is_loading() {
                app.set_toast("Please wait for the current reply");
            } else {
                app.messages.clear();
                app.scroll_from_bottom = 0;
                app.needs_clear = true;
            }
        }
        "view:toggle" => app.toggle_view(),
        "settings:theme" => app.toggle_theme(),
        "tool:copy" => match copy_last_code_block(app) {
            Ok(()) => app.set_toast("Copied code block"),
            Err(err) => {
                log::warn!("copy failed: {err}");
                app.set_toast(err.to_string());
            }
        },
        "tool:export" => {
            let path = arg.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH));
            match export_transcript(app, &path) {
                Ok(()) => app.set_toast(format!("Saved {}", path.display())),
                Err(err) => {
                    log::error!("export failed: {err}");
                    app.set_toast(format!("Export failed: {err}"));
                }
            }
        }
        "help:about" => app.mode = UiMode::HelpAbout,
        "app:quit" => app.should_quit = true,
        _ => {}
    }
    app.mark_dirty();
}

fn copy_last_code_block(app: &App) -> Result<()> {
    let text = app
        .last_code_block()
        .ok_or_else(|| anyhow!("No code block to copy"))?;
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text)?;
    Ok(())
}

pub fn export_transcript(app: &App, path: &std::path::Path) -> Result<()> {
    if app.messages.is_empty() {
        return Err(anyhow!("nothing to export yet"));
    }
    std::fs::write(path, app.transcript_html())?;
    log::info!("exported {} messages to {}", app.messages.len(), path.display());
    Ok(())
}
