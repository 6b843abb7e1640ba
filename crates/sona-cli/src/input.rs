use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Dispatcher, UiMode, View};
use crate::commands::{commands_list, execute_command, filter_commands, parse_command};
use crate::navigator::NavEvent;

pub fn handle_paste(app: &mut App, text: String) {
    if app.mode == UiMode::Normal && app.view == View::Chat {
        let text = text.replace("\r\n", "\n");
        app.input.insert_str(app.cursor, &text);
        app.cursor += text.len();
        app.mark_dirty();
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent, dispatcher: &Dispatcher) {
    if handle_overlay_keys(app, key) {
        return;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('g') if ctrl => {
            app.toggle_view();
            return;
        }
        KeyCode::Char('n') if ctrl => {
            if app.reset_conversation() {
                app.set_toast("Started a new conversation");
            }
            return;
        }
        KeyCode::Char('t') if alt => {
            app.toggle_theme();
            return;
        }
        KeyCode::Char('/') if app.input.is_empty() => {
            app.mode = UiMode::CommandPalette;
            app.command_query.clear();
            app.command_selected = 0;
            app.command_offset = 0;
            app.mark_dirty();
            return;
        }
        _ => {}
    }

    match app.view {
        View::Guided => handle_guided_key(app, key, dispatcher),
        View::Chat => handle_chat_key(app, key, dispatcher),
    }
}

fn handle_guided_key(app: &mut App, key: KeyEvent, dispatcher: &Dispatcher) {
    // Guided controls are inert while any reply is pending.
    if app.is_loading() {
        if matches!(
            key.code,
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Esc | KeyCode::Backspace
        ) {
            app.set_toast("Please wait for the current reply");
        }
        return;
    }
    match key.code {
        KeyCode::Up | KeyCode::Left | KeyCode::BackTab => app.navigator.focus_prev(),
        KeyCode::Down | KeyCode::Right | KeyCode::Tab => app.navigator.focus_next(),
        KeyCode::Home => app.navigator.focus_first(),
        KeyCode::End => app.navigator.focus_last(),
        KeyCode::Esc | KeyCode::Backspace => {
            app.navigator.go_back();
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            match app.navigator.activate() {
                Some(NavEvent::Ask(question)) => {
                    app.begin_guided(&question);
                    dispatcher.send(app.session.id().map(str::to_string), question);
                }
                Some(NavEvent::PlayMedia(kind)) => app.play_media(kind),
                None => {}
            }
        }
        _ => return,
    }
    app.mark_dirty();
}

fn handle_chat_key(app: &mut App, key: KeyEvent, dispatcher: &Dispatcher) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let newline = key
        .modifiers
        .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Enter if newline => {
            app.input.insert(app.cursor, '\n');
            app.cursor += 1;
        }
        KeyCode::Enter => {
            let content = app.input.trim().to_string();
            if content.starts_with('/') {
                match parse_command(&content) {
                    Some((cmd, arg)) => {
                        app.input.clear();
                        app.cursor = 0;
                        execute_command(app, &cmd, arg);
                    }
                    None => app.set_toast("Unknown command"),
                }
                return;
            }
            if let Some(message) = app.begin_chat() {
                dispatcher.send(app.session.id().map(str::to_string), message);
            }
        }
        KeyCode::Char('u') if ctrl => {
            app.input.clear();
            app.cursor = 0;
        }
        KeyCode::Char('w') if ctrl => {
            if app.cursor > 0 {
                let before = app.input[..app.cursor].trim_end();
                let start = before
                    .rfind(char::is_whitespace)
                    .map(|i| i + before[i..].chars().next().map_or(1, char::len_utf8))
                    .unwrap_or(0);
                app.input.replace_range(start..app.cursor, "");
                app.cursor = start;
            }
        }
        KeyCode::Char('a') if ctrl => app.cursor = 0,
        KeyCode::Char('e') if ctrl => app.cursor = app.input.len(),
        KeyCode::Up if app.input.is_empty() => scroll_up(app, 1),
        KeyCode::Down if app.input.is_empty() => scroll_down(app, 1),
        KeyCode::PageUp => scroll_up(app, 10),
        KeyCode::PageDown => scroll_down(app, 10),
        KeyCode::Home if app.input.is_empty() => {
            app.scroll_from_bottom = usize::MAX;
            app.auto_scroll = false;
        }
        KeyCode::End if app.input.is_empty() => {
            app.scroll_from_bottom = 0;
            app.auto_scroll = true;
        }
        KeyCode::Home => app.cursor = 0,
        KeyCode::End => app.cursor = app.input.len(),
        KeyCode::Backspace => {
            if let Some(prev) = prev_boundary(&app.input, app.cursor) {
                app.input.replace_range(prev..app.cursor, "");
                app.cursor = prev;
            }
        }
        KeyCode::Delete => {
            if let Some(next) = next_boundary(&app.input, app.cursor) {
                app.input.replace_range(app.cursor..next, "");
            }
        }
        KeyCode::Left => {
            if let Some(prev) = prev_boundary(&app.input, app.cursor) {
                app.cursor = prev;
            }
        }
        KeyCode::Right => {
            if let Some(next) = next_boundary(&app.input, app.cursor) {
                app.cursor = next;
            }
        }
        KeyCode::Char(ch) => {
            if ctrl || key.modifiers.contains(KeyModifiers::ALT) {
                return;
            }
            app.input.insert(app.cursor, ch);
            app.cursor += ch.len_utf8();
        }
        KeyCode::Esc => {
            app.input.clear();
            app.cursor = 0;
        }
        _ => return,
    }
    app.mark_dirty();
}

fn scroll_up(app: &mut App, lines: usize) {
    app.scroll_from_bottom = app.scroll_from_bottom.saturating_add(lines);
    app.auto_scroll = false;
}

fn scroll_down(app: &mut App, lines: usize) {
    app.scroll_from_bottom = app.scroll_from_bottom.saturating_sub(lines);
    if app.scroll_from_bottom == 0 {
        app.auto_scroll = true;
    }
}

fn prev_boundary(text: &str, cursor: usize) -> Option<usize> {
    text[..cursor].char_indices().next_back().map(|(i, _)| i)
}

fn next_boundary(text: &str, cursor: usize) -> Option<usize> {
    text[cursor..].chars().next().map(|ch| cursor + ch.len_utf8())
}

pub fn handle_overlay_keys(app: &mut App, key: KeyEvent) -> bool {
    match app.mode {
        UiMode::CommandPalette => {
            let commands = filter_commands(&commands_list(), &app.command_query);
            let page_size = 8usize;
            match key.code {
                KeyCode::Esc => {
                    app.mode = UiMode::Normal;
                }
                KeyCode::Up => {
                    app.command_selected = app.command_selected.saturating_sub(1);
                }
                KeyCode::Down => {
                    if app.command_selected + 1 < commands.len() {
                        app.command_selected += 1;
                    }
                }
                KeyCode::Backspace => {
                    if app.command_query.pop().is_none() {
                        app.mode = UiMode::Normal;
                    }
                    app.command_selected = 0;
                    app.command_offset = 0;
                }
                KeyCode::Enter => {
                    if let Some(cmd) = commands.get(app.command_selected) {
                        execute_command(app, cmd, None);
                    }
                    if app.mode == UiMode::CommandPalette {
                        app.mode = UiMode::Normal;
                    }
                    app.command_query.clear();
                    app.command_offset = 0;
                }
                KeyCode::Char(ch) => {
                    if !key.modifiers.contains(KeyModifiers::CONTROL)
                        && !key.modifiers.contains(KeyModifiers::ALT)
                    {
                        app.command_query.push(ch);
                        app.command_selected = 0;
                        app.command_offset = 0;
                    }
                }
                _ => {}
            }
            if commands.is_empty() {
                app.command_selected = 0;
                app.command_offset = 0;
            } else {
                if app.command_selected >= commands.len() {
                    app.command_selected = commands.len().saturating_sub(1);
                }
                if app.command_selected < app.command_offset {
                    app.command_offset = app.command_selected;
                } else if app.command_selected >= app.command_offset + page_size {
                    app.command_offset = app.command_selected + 1 - page_size;
                }
            }
            app.mark_dirty();
            true
        }
        UiMode::HelpAbout => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
                app.mode = UiMode::Normal;
                app.mark_dirty();
            }
            true
        }
        UiMode::Normal => false,
    }
}
