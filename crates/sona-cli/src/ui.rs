use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};

use textwrap::wrap;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, Author, UiMode, View};
use crate::commands::{commands_list, filter_commands};
use crate::constants::*;
use crate::format::{self, tokenize_json, Document, Inline, JsonToken};
use crate::navigator::{Control, NavState, Navigator};

const PALETTE_PAGE: usize = 8;

pub fn render_ui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    terminal.draw(|frame| draw(frame, app))?;
    Ok(())
}

fn draw(frame: &mut Frame, app: &mut App) {
    let pal = app.theme.palette();
    let size = frame.size();
    frame.render_widget(Block::default().style(Style::default().bg(pal.bg)), size);

    let inner_width = size.width.saturating_sub(2) as usize;
    let status_lines = format_status_lines(app, inner_width);
    let input_content_width = inner_width.saturating_sub(4).max(8);
    let input_lines = match app.view {
        View::Chat => wrap_plain_lines(&app.input, input_content_width),
        View::Guided => Vec::new(),
    };
    let max_input_lines = 4usize;
    let input_start = input_lines.len().saturating_sub(max_input_lines);
    let visible_input = &input_lines[input_start..];

    let bottom_height = (visible_input.len().max(1) as u16 + status_lines.len() as u16 + 2)
        .min(size.height.saturating_sub(3));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(bottom_height)])
        .split(size);
    let main_area = chunks[0];
    let bottom_area = chunks[1];

    match app.view {
        View::Chat if app.messages.is_empty() && !app.is_loading() => {
            render_splash(frame, main_area, app)
        }
        View::Chat => render_timeline(frame, main_area, app),
        View::Guided => render_guided(frame, main_area, app),
    }

    render_bottom_box(frame, bottom_area, app, visible_input, input_start, input_content_width, status_lines);
    render_overlay(frame, size, app);
}

fn panel_block(app: &App, title: &str) -> Block<'static> {
    let pal = app.theme.palette();
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(pal.border))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(pal.accent).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(pal.bg_alt))
}

fn render_timeline(frame: &mut Frame, rect: Rect, app: &mut App) {
    let block = panel_block(app, ASSISTANT_NAME);
    let inner = block.inner(rect);
    let lines = build_timeline_lines(app, inner.width as usize);

    let view_height = inner.height as usize;
    let total = lines.len();
    let max_scroll = total.saturating_sub(view_height);
    if app.scroll_from_bottom > max_scroll {
        app.scroll_from_bottom = max_scroll;
    }
    let start = total.saturating_sub(view_height + app.scroll_from_bottom);
    let end = (start + view_height).min(total);
    let para = Paragraph::new(Text::from(lines[start..end].to_vec())).block(block);
    frame.render_widget(para, rect);
}

pub fn build_timeline_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let pal = app.theme.palette();
    let content_width = width.saturating_sub(2).max(10);
    let mut lines: Vec<Line<'static>> = Vec::new();

    for message in &app.messages {
        if !lines.is_empty() {
            lines.push(Line::from(""));
        }
        let name_color = match message.author {
            Author::User => pal.accent,
            Author::Assistant => pal.heading,
        };
        lines.push(Line::from(vec![
            Span::styled("> ", Style::default().fg(name_color).add_modifier(Modifier::BOLD)),
            Span::styled(
                message.sender_name(),
                Style::default().fg(name_color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {}", message.time_label()), Style::default().fg(pal.text_dim)),
        ]));
        let body = match &message.document {
            Some(document) if document.is_empty() => vec![Line::from(Span::styled(
                "(empty reply)",
                Style::default().fg(pal.text_dim).add_modifier(Modifier::ITALIC),
            ))],
            Some(document) => render_document(document, content_width, pal),
            None => wrap_plain_lines(&message.text, content_width)
                .into_iter()
                .map(|l| Line::from(Span::styled(l, Style::default().fg(pal.text))))
                .collect(),
        };
        lines.extend(indent_lines(body, 2));
    }

    if app.in_flight == Some(View::Chat) {
        lines.push(Line::from(""));
        lines.push(spinner_line(app, "Sona is typing..."));
    }
    lines
}

fn spinner_line(app: &App, label: &str) -> Line<'static> {
    let pal = app.theme.palette();
    let spinner = SPINNER_FRAMES[app.spinner_index % SPINNER_FRAMES.len()];
    Line::from(vec![
        Span::styled(spinner, Style::default().fg(pal.accent)),
        Span::raw(" "),
        Span::styled(
            label.to_string(),
            Style::default().fg(pal.text_dim).add_modifier(Modifier::ITALIC),
        ),
    ])
}

fn render_guided(frame: &mut Frame, rect: Rect, app: &App) {
    let block = panel_block(app, "Guided questions");
    let inner = block.inner(rect);
    let lines = build_guided_lines(app, &app.navigator, inner.width as usize);

    // Keep the focused control on screen.
    let focus_row = lines
        .iter()
        .position(|l| l.spans.first().is_some_and(|s| s.content.as_ref() == FOCUS_MARK))
        .unwrap_or(0);
    let height = inner.height as usize;
    let offset = (focus_row + 1).saturating_sub(height);
    let end = (offset + height).min(lines.len());
    let para = Paragraph::new(Text::from(lines[offset.min(end)..end].to_vec())).block(block);
    frame.render_widget(para, rect);
}

const FOCUS_MARK: &str = "› ";

fn control_line(label: String, focused: bool, app: &App) -> Line<'static> {
    let pal = app.theme.palette();
    if focused {
        Line::from(vec![
            Span::styled(FOCUS_MARK, Style::default().fg(pal.accent).add_modifier(Modifier::BOLD)),
            Span::styled(
                label,
                Style::default().fg(pal.accent).add_modifier(Modifier::BOLD | Modifier::REVERSED),
            ),
        ])
    } else {
        Line::from(vec![
            Span::raw("  "),
            Span::styled(label, Style::default().fg(pal.text)),
        ])
    }
}

pub fn build_guided_lines(app: &App, nav: &Navigator, width: usize) -> Vec<Line<'static>> {
    let pal = app.theme.palette();
    let focused = nav.focused();
    let categories = nav.categories();
    let mut lines = Vec::new();
    let title = |text: String| {
        Line::from(Span::styled(
            text,
            Style::default().fg(pal.heading).add_modifier(Modifier::BOLD),
        ))
    };

    match nav.state() {
        NavState::Categories => {
            lines.push(title("What would you like to know about?".to_string()));
            lines.push(Line::from(""));
            for (i, category) in categories.iter().enumerate() {
                let label = format!("{} {}", category.icon, category.name);
                lines.push(control_line(label, focused == Some(Control::Category(i)), app));
            }
        }
        NavState::Questions { category } => {
            lines.push(control_line("‹ Back".to_string(), focused == Some(Control::Back), app));
            lines.push(Line::from(""));
            let category = &categories[*category];
            lines.push(title(format!("{} {}", category.icon, category.name)));
            lines.push(Line::from(""));
            for (i, question) in category.questions.iter().enumerate() {
                lines.push(control_line(
                    question.to_string(),
                    focused == Some(Control::Question(i)),
                    app,
                ));
            }
        }
        NavState::Answer { question, .. } => {
            lines.push(control_line("‹ Back".to_string(), focused == Some(Control::Back), app));
            lines.push(Line::from(""));
            for l in wrap_plain_lines(question, width.saturating_sub(2).max(10)) {
                lines.push(title(l));
            }
            lines.push(Line::from(""));
            if nav.is_busy() {
                lines.push(spinner_line(app, "Finding an answer..."));
            } else if let Some(answer) = nav.answer() {
                lines.extend(indent_lines(
                    render_document(&answer.document, width.saturating_sub(2).max(10), pal),
                    2,
                ));
                if let Some(panel) = &answer.media {
                    lines.push(Line::from(""));
                    for kind in panel.kinds() {
                        lines.push(control_line(
                            format!("▶ {}", panel.label(kind)),
                            focused == Some(Control::Media(kind)),
                            app,
                        ));
                    }
                }
            }
        }
    }
    lines
}

pub fn render_splash(frame: &mut Frame, rect: Rect, app: &App) {
    let pal = app.theme.palette();
    let block = panel_block(app, ASSISTANT_NAME);
    frame.render_widget(block.clone(), rect);
    let inner = block.inner(rect);

    let mut lines: Vec<Line> = SONA_LOGO
        .iter()
        .map(|row| {
            Line::from(Span::styled(
                *row,
                Style::default().fg(pal.accent).add_modifier(Modifier::BOLD),
            ))
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Your companion for pregnancy and the early years",
        Style::default().fg(pal.text),
    )));
    lines.push(Line::from(vec![
        Span::styled("Version ", Style::default().fg(pal.text_dim)),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(pal.text)),
        Span::styled("  •  Server ", Style::default().fg(pal.text_dim)),
        Span::styled(app.base_url.clone(), Style::default().fg(pal.text)),
    ]));
    lines.push(Line::from(Span::styled(
        "Ctrl+G for guided questions",
        Style::default().fg(pal.text_dim),
    )));

    let width = lines
        .iter()
        .map(line_width)
        .max()
        .unwrap_or(1)
        .min(inner.width as usize) as u16;
    let height = lines.len().min(inner.height as usize) as u16;
    let area = centered_rect(width, height, inner);
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_bottom_box(
    frame: &mut Frame,
    rect: Rect,
    app: &App,
    input_lines: &[String],
    input_start: usize,
    input_content_width: usize,
    status_lines: Vec<Line<'static>>,
) {
    let pal = app.theme.palette();
    let title = match app.view {
        View::Chat => "Message",
        View::Guided => "Keys: ↑↓ move • Enter select • Esc back",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(pal.border))
        .title(Span::styled(title, Style::default().fg(pal.text_dim)))
        .style(Style::default().bg(pal.bg_alt));
    frame.render_widget(block.clone(), rect);
    let inner = block.inner(rect);

    let mut input_spans: Vec<Line> = Vec::new();
    if app.view == View::Chat {
        let prompt = Span::styled("› ", Style::default().fg(pal.accent).add_modifier(Modifier::BOLD));
        if app.input.is_empty() {
            input_spans.push(Line::from(vec![
                prompt,
                Span::styled(
                    "Ask Sona anything • / for commands",
                    Style::default().fg(pal.text_dim),
                ),
            ]));
        } else {
            for (idx, line) in input_lines.iter().enumerate() {
                let lead = if idx == 0 && input_start == 0 {
                    prompt.clone()
                } else {
                    Span::raw("  ")
                };
                input_spans.push(Line::from(vec![
                    lead,
                    Span::styled(line.clone(), Style::default().fg(pal.text)),
                ]));
            }
        }
    }

    let input_height = input_spans.len() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(input_height),
            Constraint::Length(status_lines.len() as u16),
        ])
        .split(inner);
    frame.render_widget(Paragraph::new(input_spans), chunks[0]);
    frame.render_widget(Paragraph::new(status_lines), chunks[1]);

    if app.view == View::Chat && app.mode == UiMode::Normal && chunks[0].height > 0 {
        let cursor_index = app.input[..clamp_cursor(&app.input, app.cursor)].chars().count();
        let (row, col) = compute_cursor_position(&app.input, cursor_index, input_content_width);
        let visible_row = row.saturating_sub(input_start);
        if visible_row < chunks[0].height as usize {
            frame.set_cursor(chunks[0].x + 2 + col as u16, chunks[0].y + visible_row as u16);
        }
    }
}

pub fn render_overlay(frame: &mut Frame, rect: Rect, app: &App) {
    let pal = app.theme.palette();
    match app.mode {
        UiMode::CommandPalette => {
            let commands = filter_commands(&commands_list(), &app.command_query);
            let mut lines = vec![Line::from(vec![
                Span::styled("/", Style::default().fg(pal.accent).add_modifier(Modifier::BOLD)),
                Span::styled(app.command_query.clone(), Style::default().fg(pal.text)),
            ])];
            if commands.is_empty() {
                lines.push(Line::from(Span::styled(
                    "No matching commands",
                    Style::default().fg(pal.text_dim),
                )));
            }
            for (idx, cmd) in commands
                .iter()
                .enumerate()
                .skip(app.command_offset)
                .take(PALETTE_PAGE)
            {
                let selected = idx == app.command_selected;
                let name_style = if selected {
                    Style::default().fg(pal.bg_alt).bg(pal.accent).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(pal.accent)
                };
                let shortcut = cmd.shortcut.map(|s| format!(" ({s})")).unwrap_or_default();
                lines.push(Line::from(vec![
                    Span::styled(format!(" /{:<8}", cmd.name), name_style),
                    Span::styled(shortcut, Style::default().fg(pal.text_dim)),
                    Span::raw("  "),
                    Span::styled(cmd.description, Style::default().fg(pal.text_muted)),
                ]));
            }
            render_modal(frame, rect, app, "Commands", lines);
        }
        UiMode::HelpAbout => {
            let lines = vec![
                Line::from(Span::styled(
                    format!("{ASSISTANT_NAME} {}", env!("CARGO_PKG_VERSION")),
                    Style::default().fg(pal.heading).add_modifier(Modifier::BOLD),
                )),
                Line::from("A terminal companion for maternal and child health questions."),
                Line::from(""),
                Line::from(Span::styled(
                    "Answers are general guidance, not medical advice. If you are worried, contact a health professional.",
                    Style::default().fg(pal.warning),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Ctrl+G guided • Alt+T theme • Ctrl+N new • Ctrl+C quit",
                    Style::default().fg(pal.text_dim),
                )),
            ];
            render_modal(frame, rect, app, "About", lines);
        }
        UiMode::Normal => {
            if let Some((msg, _)) = &app.toast {
                let lines = vec![Line::from(Span::styled(msg.clone(), Style::default().fg(pal.text)))];
                render_modal(frame, rect, app, "Info", lines);
            }
        }
    }
}

fn render_modal(frame: &mut Frame, rect: Rect, app: &App, title: &str, lines: Vec<Line>) {
    let pal = app.theme.palette();
    let width = rect.width.saturating_sub(6).min(90);
    let height = (lines.len() as u16 + 4).min(rect.height.saturating_sub(4));
    let area = centered_rect(width, height, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(pal.border))
        .title(Span::styled(title.to_string(), Style::default().fg(pal.text_dim)))
        .style(Style::default().bg(pal.bg_alt));
    let para = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(pal.text).bg(pal.bg_alt));
    frame.render_widget(ratatui::widgets::Clear, area);
    frame.render_widget(para, area);
}

fn centered_rect(width: u16, height: u16, rect: Rect) -> Rect {
    let x = rect.x + (rect.width.saturating_sub(width)) / 2;
    let y = rect.y + (rect.height.saturating_sub(height)) / 2;
    Rect { x, y, width, height }
}

fn line_width(line: &Line) -> usize {
    line.spans.iter().map(|s| UnicodeWidthStr::width(s.content.as_ref())).sum()
}

fn clamp_cursor(value: &str, cursor: usize) -> usize {
    let mut idx = cursor.min(value.len());
    while idx > 0 && !value.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn compute_cursor_position(display: &str, cursor_index: usize, width: usize) -> (usize, usize) {
    let mut row = 0usize;
    let mut col = 0usize;
    for (idx, ch) in display.chars().enumerate() {
        if idx >= cursor_index {
            break;
        }
        if ch == '\n' || col >= width {
            row += 1;
            col = 0;
            if ch == '\n' {
                continue;
            }
        }
        col += UnicodeWidthChar::width(ch).unwrap_or(1);
    }
    (row, col)
}

pub fn format_status_lines(app: &App, _width: usize) -> Vec<Line<'static>> {
    let pal = app.theme.palette();
    let sep = || Span::styled(" | ", Style::default().fg(pal.text_dim));
    let mode = match app.view {
        View::Chat => "CHAT",
        View::Guided => "GUIDED",
    };
    let session = match app.session.id() {
        Some(id) => format!("session {}", id.chars().take(8).collect::<String>()),
        None => "new session".to_string(),
    };

    let mut line1: Vec<Span> = vec![
        Span::styled(
            format!(" {mode} "),
            Style::default().fg(pal.bg_alt).bg(pal.accent).add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled(app.base_url.clone(), Style::default().fg(pal.text_muted)),
        sep(),
        Span::styled(session, Style::default().fg(pal.text_muted)),
    ];
    if app.view == View::Chat {
        let count = app.char_count();
        let color = if count > MAX_MESSAGE_CHARS {
            pal.error
        } else if count * 10 >= MAX_MESSAGE_CHARS * 9 {
            pal.warning
        } else {
            pal.text_dim
        };
        line1.push(sep());
        line1.push(Span::styled(
            format!("{count}/{MAX_MESSAGE_CHARS}"),
            Style::default().fg(color),
        ));
    }
    line1.push(sep());
    line1.push(Span::styled(app.theme.as_str(), Style::default().fg(pal.text_dim)));
    if app.is_loading() {
        line1.push(sep());
        line1.push(Span::styled("waiting for reply", Style::default().fg(pal.success)));
    }

    let hints = match app.view {
        View::Chat => "Enter send • Alt+Enter newline • Ctrl+G guided • / commands • Ctrl+C quit",
        View::Guided => "Tab/↑↓ move • Enter select • Esc back • Ctrl+G chat • Ctrl+C quit",
    };
    vec![
        Line::from(line1),
        Line::from(Span::styled(hints, Style::default().fg(pal.text_dim))),
    ]
}

fn wrap_plain_lines(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }
        for line in wrap(raw, width) {
            lines.push(line.to_string());
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn indent_lines(lines: Vec<Line<'static>>, indent: usize) -> Vec<Line<'static>> {
    let prefix = Span::raw(" ".repeat(indent));
    lines
        .into_iter()
        .map(|line| {
            let mut spans = Vec::with_capacity(line.spans.len() + 1);
            spans.push(prefix.clone());
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

/// Terminal rendering of a formatted reply.
pub fn render_document(document: &Document, width: usize, pal: &Palette) -> Vec<Line<'static>> {
    let mut renderer = DocumentRenderer::new(width, pal);
    for (i, block) in document.blocks.iter().enumerate() {
        if i > 0 {
            renderer.blank_line();
        }
        renderer.render_block(block);
    }
    renderer.finish()
}

struct DocumentRenderer<'p> {
    pal: &'p Palette,
    width: usize,
    lines: Vec<Line<'static>>,
    current_spans: Vec<Span<'static>>,
    current_width: usize,
    pending_space: bool,
    pending_item_prefix: Option<(String, Style)>,
    style_stack: Vec<Style>,
}

impl<'p> DocumentRenderer<'p> {
    fn new(width: usize, pal: &'p Palette) -> Self {
        Self {
            pal,
            width: width.max(10),
            lines: Vec::new(),
            current_spans: Vec::new(),
            current_width: 0,
            pending_space: false,
            pending_item_prefix: None,
            style_stack: vec![Style::default().fg(pal.text)],
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        self.lines
    }

    fn render_block(&mut self, block: &format::Block) {
        match block {
            format::Block::Heading { level, content } => {
                let mut style = Style::default().fg(self.pal.heading).add_modifier(Modifier::BOLD);
                if *level == 1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                self.with_style(style, |r| r.push_inlines(content));
                self.new_line();
            }
            format::Block::Paragraph(content) => {
                self.push_inlines(content);
                self.new_line();
            }
            format::Block::List { ordered, items } => {
                for (i, item) in items.iter().enumerate() {
                    let prefix = if *ordered {
                        format!("{}. ", i + 1)
                    } else {
                        "• ".to_string()
                    };
                    self.pending_item_prefix = Some((prefix, Style::default().fg(self.pal.accent)));
                    self.push_inlines(item);
                    self.new_line();
                }
            }
            format::Block::Code { language, body } => self.render_code(language.as_deref(), body),
        }
    }

    fn render_code(&mut self, language: Option<&str>, body: &str) {
        let dim = Style::default().fg(self.pal.text_dim);
        if let Some(language) = language {
            self.push_span(&format!("[{}]", language.to_uppercase()), dim);
            self.new_line();
        }
        let pretty = match language {
            Some("json") => format::pretty_json(body),
            _ => None,
        };
        match pretty {
            Some(pretty) => {
                for (token, text) in tokenize_json(&pretty) {
                    let color = match token {
                        JsonToken::Key => self.pal.json_key,
                        JsonToken::String => self.pal.json_string,
                        JsonToken::Number => self.pal.json_number,
                        JsonToken::Boolean | JsonToken::Null => self.pal.json_literal,
                        JsonToken::Punctuation => self.pal.text_muted,
                    };
                    self.push_code_text(text, Style::default().fg(color));
                }
            }
            None => self.push_code_text(body, Style::default().fg(self.pal.code)),
        }
        self.new_line();
    }

    fn with_style(&mut self, style: Style, f: impl FnOnce(&mut Self)) {
        let patched = self.current_style().patch(style);
        self.style_stack.push(patched);
        f(self);
        self.style_stack.pop();
    }

    fn push_inlines(&mut self, inlines: &[Inline]) {
        for inline in inlines {
            match inline {
                Inline::Text(text) => self.push_text(text, self.current_style()),
                Inline::Strong(children) => {
                    let style = Style::default().fg(self.pal.strong).add_modifier(Modifier::BOLD);
                    self.with_style(style, |r| r.push_inlines(children));
                }
                Inline::Emphasis(children) => {
                    let style = Style::default().fg(self.pal.emphasis).add_modifier(Modifier::ITALIC);
                    self.with_style(style, |r| r.push_inlines(children));
                }
            }
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack
            .last()
            .copied()
            .unwrap_or_else(|| Style::default().fg(self.pal.text))
    }

    fn flush_line(&mut self) {
        if self.current_spans.is_empty() {
            return;
        }
        self.lines.push(Line::from(std::mem::take(&mut self.current_spans)));
        self.current_width = 0;
    }

    fn new_line(&mut self) {
        self.pending_space = false;
        self.flush_line();
    }

    fn blank_line(&mut self) {
        self.new_line();
        self.lines.push(Line::from(""));
    }

    fn ensure_line_prefix(&mut self) {
        if self.current_spans.is_empty() {
            if let Some((prefix, style)) = self.pending_item_prefix.take() {
                self.current_width += UnicodeWidthStr::width(prefix.as_str());
                self.current_spans.push(Span::styled(prefix, style));
            }
        }
    }

    fn push_span(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        self.ensure_line_prefix();
        self.current_spans.push(Span::styled(text.to_string(), style));
        self.current_width += UnicodeWidthStr::width(text);
    }

    fn push_word(&mut self, word: &str, style: Style) {
        let word_width = UnicodeWidthStr::width(word);
        if self.current_width > 0 && self.pending_space && self.current_width + 1 + word_width > self.width {
            self.new_line();
        } else if self.current_width > 0 && self.pending_space {
            self.push_span(" ", Style::default().fg(self.pal.text));
        }
        self.pending_space = false;

        if word_width <= self.width {
            self.push_span(word, style);
            return;
        }

        let mut chunk = String::new();
        let mut chunk_width = 0usize;
        for ch in word.chars() {
            let ch_width = UnicodeWidthChar::width(ch).unwrap_or(1);
            if chunk_width + ch_width > self.width && !chunk.is_empty() {
                self.push_span(&chunk, style);
                self.new_line();
                chunk.clear();
                chunk_width = 0;
            }
            chunk.push(ch);
            chunk_width += ch_width;
        }
        self.push_span(&chunk, style);
    }

    fn push_text(&mut self, text: &str, style: Style) {
        let mut token = String::new();
        let mut in_space = false;
        for ch in text.chars() {
            if ch == '\n' {
                self.flush_token(&token, in_space, style);
                token.clear();
                in_space = false;
                self.new_line();
                continue;
            }
            let is_space = ch.is_whitespace();
            if is_space != in_space && !token.is_empty() {
                self.flush_token(&token, in_space, style);
                token.clear();
            }
            in_space = is_space;
            if is_space {
                token.push(' ');
            } else {
                token.push(ch);
            }
        }
        self.flush_token(&token, in_space, style);
    }

    fn flush_token(&mut self, token: &str, is_space: bool, style: Style) {
        if token.is_empty() {
            return;
        }
        if is_space {
            self.pending_space = true;
        } else {
            self.push_word(token, style);
        }
    }

    /// Code keeps its own line breaks and indentation.
    fn push_code_text(&mut self, text: &str, style: Style) {
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                if self.current_spans.is_empty() {
                    self.lines.push(Line::from(""));
                } else {
                    self.flush_line();
                }
            }
            self.push_span(line, style);
        }
    }
}
