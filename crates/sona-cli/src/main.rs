use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod app;
mod backend;
mod catalog;
mod commands;
mod config;
mod constants;
mod format;
mod input;
mod media;
mod navigator;
mod ui;

use app::{validate_message, App, Dispatcher, UiUpdate, View};
use backend::BackendClient;
use config::Config;
use constants::{SPINNER_FRAMES, TOAST_SECS};
use input::{handle_key, handle_paste};
use media::MediaPanel;
use ui::render_ui;

#[derive(Parser, Debug)]
#[command(name = "sona", version = env!("CARGO_PKG_VERSION"), about = "Maternal and child health chat in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Chat server base URL
    #[arg(short, long)]
    server: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Preferred reply language, passed to the server
    #[arg(short, long)]
    language: Option<String>,

    /// Start in the guided question view
    #[arg(long)]
    guided: bool,

    /// Ask one question and print the reply
    #[arg(long)]
    prompt: Option<String>,

    /// With --prompt, print the reply as HTML
    #[arg(long, requires = "prompt")]
    html: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that the chat server is up
    Health,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = cli.command.is_none() && cli.prompt.is_none();
    init_logging(interactive);

    let config_path = Config::config_path();
    let mut config = Config::load_from(&config_path)?;
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if cli.language.is_some() {
        config.language = cli.language.clone();
    }

    let client = BackendClient::new(&config.server_url, Duration::from_secs(config.timeout_secs))?
        .with_language(config.language.clone());

    if let Some(Commands::Health) = cli.command {
        return run_health(&client);
    }
    if let Some(prompt) = cli.prompt.as_deref() {
        return run_non_interactive(&client, prompt, cli.html);
    }
    run_interactive(client, config, config_path, cli.guided)
}

/// Logs go to a file while the terminal UI owns the screen.
fn init_logging(interactive: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if interactive {
        let Some(dir) = dirs::data_local_dir().map(|d| d.join("sona")) else {
            builder.filter_level(log::LevelFilter::Off);
            builder.init();
            return;
        };
        let file = std::fs::create_dir_all(&dir).and_then(|_| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join("sona.log"))
        });
        match file {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(_) => {
                builder.filter_level(log::LevelFilter::Off);
            }
        }
    }
    builder.init();
}

fn run_health(client: &BackendClient) -> Result<()> {
    let status = client
        .health()
        .with_context(|| format!("server at {} is not healthy", client.base_url()))?;
    println!("{}: {}", client.base_url(), status);
    Ok(())
}

fn run_non_interactive(client: &BackendClient, prompt: &str, html: bool) -> Result<()> {
    let message = validate_message(prompt)?;
    let reply = match client.ask(None, &message) {
        Ok(reply) => reply,
        Err(err) => {
            eprintln!("{}", err.user_message());
            return Err(err.into());
        }
    };
    let panel = reply
        .media
        .and_then(|media| MediaPanel::new(media, client.base_url()));

    if html {
        println!("{}", format::render(&reply.response));
        if let Some(panel) = &panel {
            println!("{}", panel.to_html());
        }
    } else {
        println!("{}", format::parse(&reply.response).plain_text());
        if let Some(panel) = &panel {
            for kind in panel.kinds() {
                if let Some(url) = panel.resolve(kind) {
                    println!("{}: {}", panel.label(kind), url);
                }
            }
        }
    }
    log::info!("session {}", reply.session_id);
    Ok(())
}

fn run_interactive(client: BackendClient, config: Config, config_path: std::path::PathBuf, guided: bool) -> Result<()> {
    let base_url = client.base_url().to_string();
    log::info!("starting interactive session against {base_url}");
    let (ui_tx, ui_rx) = mpsc::channel::<UiUpdate>();
    let dispatcher = Dispatcher::new(Arc::new(client), ui_tx);

    let mut app = App::new(config, config_path, base_url);
    if guided {
        app.view = View::Guided;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &dispatcher, &ui_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    dispatcher: &Dispatcher,
    ui_rx: &mpsc::Receiver<UiUpdate>,
) -> Result<()> {
    let mut last_tick = Instant::now();
    loop {
        let tick_rate = if app.is_loading() {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(220)
        };
        if app.dirty || last_tick.elapsed() >= tick_rate {
            if app.is_loading() {
                app.spinner_index = (app.spinner_index + 1) % SPINNER_FRAMES.len();
                app.mark_dirty();
            }
            if app.needs_clear {
                terminal.clear()?;
                app.needs_clear = false;
            }
            render_ui(terminal, app)?;
            app.dirty = false;
            last_tick = Instant::now();
        }

        while let Ok(update) = ui_rx.try_recv() {
            match update {
                UiUpdate::Reply(result) => app.finish_request(result),
            }
        }

        if event::poll(Duration::from_millis(10))? {
            match event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    handle_key(app, key, dispatcher)
                }
                Event::Paste(text) => handle_paste(app, text),
                Event::Resize(_, _) => app.mark_dirty(),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }

        if let Some((_, at)) = app.toast {
            if at.elapsed() > Duration::from_secs(TOAST_SECS) {
                app.toast = None;
                app.mark_dirty();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn html_requires_prompt() {
        assert!(Cli::try_parse_from(["sona", "--html"]).is_err());
        let cli = Cli::try_parse_from(["sona", "--prompt", "hi", "--html", "-s", "http://x"]).unwrap();
        assert!(cli.html);
        assert_eq!(cli.server.as_deref(), Some("http://x"));
    }

    #[test]
    fn health_subcommand_parses() {
        let cli = Cli::try_parse_from(["sona", "health"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Health)));
    }

    #[test]
    fn prompt_is_validated_before_sending() {
        let client = BackendClient::new("http://127.0.0.1:9", Duration::from_millis(100)).unwrap();
        let err = run_non_interactive(&client, "   ", false).unwrap_err();
        assert_eq!(err.to_string(), "Type a message first");
    }
}
