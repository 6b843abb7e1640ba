use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::backend::{AskError, BackendClient, ChatReply, Session};
use crate::catalog::CATEGORIES;
use crate::config::{Config, Theme};
use crate::constants::{ASSISTANT_NAME, MAX_MESSAGE_CHARS, USER_NAME};
use crate::format::{self, escape_html, Document};
use crate::media::{MediaKind, MediaPanel};
use crate::navigator::{Answer, Navigator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiMode {
    Normal,
    CommandPalette,
    HelpAbout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Chat,
    Guided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub author: Author,
    pub text: String,
    pub timestamp: DateTime<Local>,
    pub document: Option<Document>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            author: Author::User,
            text: text.into(),
            timestamp: Local::now(),
            document: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        let text = text.into();
        let document = format::parse(&text);
        Self {
            author: Author::Assistant,
            text,
            timestamp: Local::now(),
            document: Some(document),
        }
    }

    pub fn sender_name(&self) -> &'static str {
        match self.author {
            Author::User => USER_NAME,
            Author::Assistant => ASSISTANT_NAME,
        }
    }

    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }

    /// Body markup; user text is escaped and keeps its line breaks.
    pub fn body_html(&self) -> String {
        match &self.document {
            Some(document) => document.to_html(),
            None => escape_html(&self.text).replace('\n', "<br>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Type a message first")]
    Empty,
    #[error("Message is too long ({len}/{max} characters)")]
    TooLong { len: usize, max: usize },
}

pub fn validate_message(input: &str) -> Result<String, InputError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty);
    }
    let len = trimmed.chars().count();
    if len > MAX_MESSAGE_CHARS {
        return Err(InputError::TooLong {
            len,
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

pub enum UiUpdate {
    Reply(Result<ChatReply, AskError>),
}

/// Runs chat requests off the UI thread and reports back over a channel.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<BackendClient>,
    tx: mpsc::Sender<UiUpdate>,
}

impl Dispatcher {
    pub fn new(client: Arc<BackendClient>, tx: mpsc::Sender<UiUpdate>) -> Self {
        Self { client, tx }
    }

    pub fn send(&self, session_id: Option<String>, message: String) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = client.ask(session_id.as_deref(), &message);
            let _ = tx.send(UiUpdate::Reply(result));
        });
    }
}

pub struct App {
    pub messages: Vec<Message>,
    pub input: String,
    pub cursor: usize,
    pub session: Session,
    pub navigator: Navigator,
    pub view: View,
    pub mode: UiMode,
    pub in_flight: Option<View>,
    pub theme: Theme,
    pub config: Config,
    pub config_path: PathBuf,
    pub base_url: String,
    pub command_query: String,
    pub command_selected: usize,
    pub command_offset: usize,
    pub should_quit: bool,
    pub dirty: bool,
    pub needs_clear: bool,
    pub toast: Option<(String, Instant)>,
    pub spinner_index: usize,
    pub scroll_from_bottom: usize,
    pub auto_scroll: bool,
}

impl App {
    pub fn new(config: Config, config_path: PathBuf, base_url: String) -> Self {
        let theme = config.effective_theme();
        Self {
            messages: Vec::new(),
            input: String::new(),
            cursor: 0,
            session: Session::default(),
            navigator: Navigator::new(CATEGORIES),
            view: View::Chat,
            mode: UiMode::Normal,
            in_flight: None,
            theme,
            config,
            config_path,
            base_url,
            command_query: String::new(),
            command_selected: 0,
            command_offset: 0,
            should_quit: false,
            dirty: true,
            needs_clear: false,
            toast: None,
            spinner_index: 0,
            scroll_from_bottom: 0,
            auto_scroll: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn set_toast(&mut self, msg: impl Into<String>) {
        self.toast = Some((msg.into(), Instant::now()));
        self.mark_dirty();
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn char_count(&self) -> usize {
        self.input.trim().chars().count()
    }

    /// Validates the input box and, if accepted, records it as a sent message.
    pub fn begin_chat(&mut self) -> Option<String> {
        if self.is_loading() {
            self.set_toast("Please wait for the current reply");
            return None;
        }
        let message = match validate_message(&self.input) {
            Ok(message) => message,
            Err(err) => {
                self.set_toast(err.to_string());
                return None;
            }
        };
        self.input.clear();
        self.cursor = 0;
        self.start_request(View::Chat, &message);
        Some(message)
    }

    /// Records a catalog question chosen in the guided view.
    pub fn begin_guided(&mut self, question: &str) {
        self.start_request(View::Guided, question);
    }

    fn start_request(&mut self, origin: View, message: &str) {
        log::info!("sending {origin:?} message ({} chars)", message.chars().count());
        self.messages.push(Message::user(message));
        self.in_flight = Some(origin);
        self.auto_scroll = true;
        self.scroll_from_bottom = 0;
        self.mark_dirty();
    }

    pub fn finish_request(&mut self, result: Result<ChatReply, AskError>) {
        let origin = self.in_flight.take();
        let (message, media) = match result {
            Ok(reply) => {
                self.session.absorb(&reply);
                let media = reply
                    .media
                    .and_then(|media| MediaPanel::new(media, &self.base_url));
                (Message::assistant(reply.response), media)
            }
            Err(err) => {
                log::warn!("chat request failed: {err}");
                (Message::assistant(err.user_message()), None)
            }
        };
        if origin == Some(View::Guided) {
            self.navigator.finish_request(Answer {
                document: message.document.clone().unwrap_or_default(),
                media,
            });
        }
        self.messages.push(message);
        if self.auto_scroll {
            self.scroll_from_bottom = 0;
        }
        self.mark_dirty();
    }

    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            View::Chat => View::Guided,
            View::Guided => View::Chat,
        };
        self.needs_clear = true;
        self.mark_dirty();
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.config.theme = Some(self.theme);
        match self.config.save_to(&self.config_path) {
            Ok(()) => log::info!("theme set to {}", self.theme.as_str()),
            Err(err) => {
                log::error!("failed to save theme: {err}");
                self.set_toast("Theme changed but could not be saved");
            }
        }
        self.mark_dirty();
    }

    /// Forgets the conversation and the session id.
    pub fn reset_conversation(&mut self) -> bool {
        if self.is_loading() {
            self.set_toast("Please wait for the current reply");
            return false;
        }
        self.messages.clear();
        self.session.reset();
        self.navigator.reset();
        self.input.clear();
        self.cursor = 0;
        self.scroll_from_bottom = 0;
        self.auto_scroll = true;
        self.needs_clear = true;
        self.mark_dirty();
        true
    }

    pub fn last_code_block(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .filter_map(|m| m.document.as_ref())
            .find_map(|doc| doc.code_blocks().pop())
    }

    pub fn play_media(&mut self, kind: MediaKind) {
        let result = match self.navigator.answer().and_then(|a| a.media.as_ref()) {
            Some(panel) => panel.play(kind),
            None => return,
        };
        match result {
            Ok(url) => self.set_toast(format!("Opening {url}")),
            Err(err) => {
                log::warn!("media playback failed: {err}");
                self.set_toast(err.to_string());
            }
        }
    }

    /// Standalone HTML page of the conversation.
    pub fn transcript_html(&self) -> String {
        let mut body = String::new();
        for message in &self.messages {
            let class = match message.author {
                Author::User => "user-message",
                Author::Assistant => "bot-message",
            };
            body.push_str(&format!(
                "<div class=\"message {class}\"><div class=\"message-header\"><span class=\"sender-name\">{}</span><span class=\"message-time\">{}</span></div><div class=\"message-text\">{}</div></div>\n",
                message.sender_name(),
                message.time_label(),
                message.body_html()
            ));
        }
        if let Some(panel) = self.navigator.answer().and_then(|a| a.media.as_ref()) {
            body.push_str(&panel.to_html());
            body.push('\n');
        }
        format!(
            "<!DOCTYPE html>\n<html lang=\"en\" data-theme=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{} conversation</title>\n<style>{}</style>\n</head>\n<body>\n<div id=\"chat-messages\">\n{}</div>\n</body>\n</html>\n",
            self.theme.as_str(),
            ASSISTANT_NAME,
            TRANSCRIPT_CSS,
            body
        )
    }
}

const TRANSCRIPT_CSS: &str = "body{font-family:system-ui,sans-serif;max-width:760px;margin:2rem auto;padding:0 1rem}\
[data-theme=dark] body{background:#0a0e14;color:#e0e0e0}\
.message{margin:1rem 0;padding:.75rem 1rem;border-radius:12px}\
.user-message{background:#fbe4ee}[data-theme=dark] .user-message{background:#2a1f2a}\
.bot-message{background:#f3f0fa}[data-theme=dark] .bot-message{background:#151c2a}\
.message-header{font-size:.8rem;opacity:.7;display:flex;gap:.5rem}\
.code-block{position:relative;background:#1e1e1e;color:#ddd;border-radius:8px;padding:.5rem}\
.code-block-label{font-size:.7rem;text-transform:uppercase;opacity:.7}\
.copy-code-btn{float:right}\
.key{color:#56b6c2}.string{color:#7fd88f}.number{color:#f5a742}.boolean,.null{color:#9d7cd8}\
video{max-width:100%}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Media, VideoSource};
    use crate::navigator::NavState;

    fn app() -> App {
        let dir = std::env::temp_dir().join("sona-app-tests-unused");
        App::new(Config::default(), dir.join("config.toml"), "http://h".to_string())
    }

    fn reply(session: &str, text: &str) -> ChatReply {
        ChatReply {
            session_id: session.to_string(),
            response: text.to_string(),
            media: None,
        }
    }

    #[test]
    fn validation_rejects_empty_and_long_input() {
        assert_eq!(validate_message("   \n"), Err(InputError::Empty));
        assert_eq!(validate_message("  hi  "), Ok("hi".to_string()));
        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert_eq!(
            validate_message(&long),
            Err(InputError::TooLong {
                len: MAX_MESSAGE_CHARS + 1,
                max: MAX_MESSAGE_CHARS
            })
        );
        let exact = "é".repeat(MAX_MESSAGE_CHARS);
        assert!(validate_message(&exact).is_ok());
    }

    #[test]
    fn begin_chat_admits_one_request_at_a_time() {
        let mut app = app();
        app.input = "first".to_string();
        assert_eq!(app.begin_chat(), Some("first".to_string()));
        assert!(app.input.is_empty());
        assert!(app.is_loading());

        app.input = "second".to_string();
        assert_eq!(app.begin_chat(), None);
        assert_eq!(app.input, "second");
        assert_eq!(app.messages.len(), 1);
    }

    #[test]
    fn invalid_input_issues_no_request() {
        let mut app = app();
        app.input = "   ".to_string();
        assert_eq!(app.begin_chat(), None);
        assert!(!app.is_loading());
        assert!(app.messages.is_empty());
        assert!(app.toast.is_some());
    }

    #[test]
    fn successful_reply_updates_session_and_conversation() {
        let mut app = app();
        app.input = "hello".to_string();
        app.begin_chat();
        app.finish_request(Ok(reply("s-9", "**Hi** there")));
        assert!(!app.is_loading());
        assert_eq!(app.session.id(), Some("s-9"));
        let last = app.messages.last().unwrap();
        assert_eq!(last.author, Author::Assistant);
        assert_eq!(last.body_html(), "<p><strong>Hi</strong> there</p>");
    }

    #[test]
    fn failed_reply_keeps_session_and_renders_error() {
        let mut app = app();
        app.session.absorb(&reply("keep", ""));
        app.input = "hello".to_string();
        app.begin_chat();
        app.finish_request(Err(AskError::Status {
            code: 429,
            detail: Some("rate limited".to_string()),
        }));
        assert_eq!(app.session.id(), Some("keep"));
        assert!(!app.is_loading());
        assert!(app.messages.last().unwrap().body_html().contains("rate limited"));
    }

    #[test]
    fn guided_answer_reaches_navigator_with_media() {
        let mut app = app();
        app.navigator.select_category(0);
        let question = app.navigator.select_question(0).unwrap();
        app.begin_guided(&question);
        let mut answer = reply("g", "Feed on demand.");
        answer.media = Some(Media {
            video: Some(VideoSource {
                url: "/v.mp4".to_string(),
                mime: "video/mp4".to_string(),
                poster: None,
            }),
            audio: None,
        });
        app.finish_request(Ok(answer));

        assert!(!app.navigator.is_busy());
        assert!(matches!(app.navigator.state(), NavState::Answer { category: 0, .. }));
        let shown = app.navigator.answer().unwrap();
        assert_eq!(shown.document.to_html(), "<p>Feed on demand.</p>");
        assert_eq!(
            shown.media.as_ref().unwrap().resolve(MediaKind::Video).as_deref(),
            Some("http://h/v.mp4")
        );
        assert_eq!(app.messages.len(), 2);
    }

    #[test]
    fn chat_reply_media_is_not_shown_in_guided_panel() {
        let mut app = app();
        app.input = "free text".to_string();
        app.begin_chat();
        let mut answer = reply("c", "ok");
        answer.media = Some(Media::default());
        app.finish_request(Ok(answer));
        assert!(app.navigator.answer().is_none());
    }

    #[test]
    fn reset_forgets_session_and_messages() {
        let mut app = app();
        app.input = "x".to_string();
        app.begin_chat();
        assert!(!app.reset_conversation());
        app.finish_request(Ok(reply("s", "y")));
        assert!(app.reset_conversation());
        assert!(app.messages.is_empty());
        assert_eq!(app.session.id(), None);
    }

    #[test]
    fn theme_toggle_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            theme: Some(Theme::Light),
            ..Config::default()
        };
        let mut app = App::new(config, path.clone(), "http://h".to_string());
        app.toggle_theme();
        assert_eq!(app.theme, Theme::Dark);
        assert_eq!(Config::load_from(&path).unwrap().theme, Some(Theme::Dark));
    }

    #[test]
    fn last_code_block_prefers_newest_reply() {
        let mut app = app();
        app.messages.push(Message::assistant("```\nold\n```"));
        app.messages.push(Message::user("```\nmine\n```"));
        app.messages.push(Message::assistant("```sql\nSELECT 1;\n```\n```json\n{\"n\":1}\n```"));
        assert_eq!(app.last_code_block().as_deref(), Some("{\n  \"n\": 1\n}"));
    }

    #[test]
    fn transcript_escapes_user_text() {
        let mut app = app();
        app.messages.push(Message::user("<b>me</b>\nline"));
        app.messages.push(Message::assistant("- one\n- two"));
        let html = app.transcript_html();
        assert!(html.contains("&lt;b&gt;me&lt;/b&gt;<br>line"));
        assert!(html.contains("<ul><li>one</li><li>two</li></ul>"));
        assert!(!html.contains("<b>me"));
    }
}
