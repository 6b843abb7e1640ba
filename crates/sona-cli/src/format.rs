//! Reply formatting.
//!
//! Assistant text is parsed into a small block tree (headings, paragraphs,
//! lists, fenced code) and rendered from there: to sanitized HTML for export
//! and `--html` output, and to terminal lines by `ui`. Raw text only ever
//! reaches the output through [`escape_html`], so nothing in a reply can turn
//! into markup.

use serde_json::Value;

use crate::constants::CODE_LANGUAGES;

const FENCE: &str = "```";
const COPY_BUTTON: &str = r#"<button class="copy-code-btn" title="Copy code">Copy</button>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    List { ordered: bool, items: Vec<Vec<Inline>> },
    Code { language: Option<String>, body: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// Formats a reply as sanitized HTML.
pub fn render(raw: &str) -> String {
    parse(raw).to_html()
}

pub fn parse(raw: &str) -> Document {
    let mut blocks = Vec::new();
    for segment in split_fences(raw) {
        match segment {
            Segment::Text(text) => parse_blocks(text, &mut blocks),
            Segment::Code { language, body } => blocks.push(Block::Code {
                language,
                body: body.to_string(),
            }),
        }
    }
    Document { blocks }
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn to_html(&self) -> String {
        // Heading-only replies carry no container markup of their own.
        let has_container = self
            .blocks
            .iter()
            .any(|block| !matches!(block, Block::Heading { .. }));
        let separator = if has_container { "" } else { "<br>" };
        self.blocks
            .iter()
            .map(block_html)
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Text a "copy" action puts on the clipboard, one entry per code block.
    pub fn code_blocks(&self) -> Vec<String> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Code { language, body } => Some(copy_text(language.as_deref(), body)),
                _ => None,
            })
            .collect()
    }

    /// Markup-free rendering for plain terminals and pipes.
    pub fn plain_text(&self) -> String {
        let mut parts = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let part = match block {
                Block::Heading { content, .. } | Block::Paragraph(content) => inline_text(content),
                Block::List { ordered, items } => items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        if *ordered {
                            format!("{}. {}", i + 1, inline_text(item))
                        } else {
                            format!("- {}", inline_text(item))
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                Block::Code { language, body } => copy_text(language.as_deref(), body),
            };
            parts.push(part);
        }
        parts.join("\n\n")
    }
}

pub fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Strong(children) | Inline::Emphasis(children) => {
                out.push_str(&inline_text(children))
            }
        }
    }
    out
}

/// Pretty JSON when a json block parses, the verbatim body otherwise.
pub fn copy_text(language: Option<&str>, body: &str) -> String {
    match language {
        Some("json") => pretty_json(body).unwrap_or_else(|| body.to_string()),
        _ => body.to_string(),
    }
}

pub fn pretty_json(body: &str) -> Option<String> {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).ok(),
        Err(err) => {
            log::debug!("json block left as plain text: {err}");
            None
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

enum Segment<'a> {
    Text(&'a str),
    Code { language: Option<String>, body: &'a str },
}

fn split_fences(raw: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(close) = after_open.find(FENCE) else {
            break;
        };
        if open > 0 {
            segments.push(Segment::Text(&rest[..open]));
        }
        let (language, body) = split_language(&after_open[..close]);
        segments.push(Segment::Code {
            language,
            body: body.trim(),
        });
        rest = &after_open[close + FENCE.len()..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }
    segments
}

fn split_language(inner: &str) -> (Option<String>, &str) {
    for lang in CODE_LANGUAGES {
        let Some(head) = inner.get(..lang.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(lang) {
            continue;
        }
        let rest = &inner[lang.len()..];
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return (Some(lang.to_string()), rest);
        }
    }
    (None, inner)
}

enum LineKind<'a> {
    Heading(u8, &'a str),
    Bullet(&'a str),
    Numbered(&'a str),
    Plain(&'a str),
}

fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim_start();

    let hashes = trimmed.bytes().take_while(|b| *b == b'#').count();
    if (1..=3).contains(&hashes) {
        if let Some(content) = marker_content(&trimmed[hashes..]) {
            return LineKind::Heading(hashes as u8, content);
        }
    }

    for marker in ['-', '*'] {
        if let Some(content) = trimmed.strip_prefix(marker).and_then(marker_content) {
            return LineKind::Bullet(content);
        }
    }

    let digits = trimmed.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(content) = trimmed[digits..].strip_prefix('.').and_then(marker_content) {
            return LineKind::Numbered(content);
        }
    }

    LineKind::Plain(line.trim())
}

/// Content after a block marker; the marker must be followed by whitespace.
fn marker_content(rest: &str) -> Option<&str> {
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let content = rest.trim();
    if content.is_empty() {
        None
    } else {
        Some(content)
    }
}

#[derive(Default)]
struct BlockBuilder<'a> {
    paragraph: Vec<&'a str>,
    list: Option<(bool, Vec<&'a str>)>,
}

impl<'a> BlockBuilder<'a> {
    fn push_line(&mut self, line: &'a str, blocks: &mut Vec<Block>) {
        self.flush_list(blocks);
        self.paragraph.push(line);
    }

    fn push_item(&mut self, ordered: bool, item: &'a str, blocks: &mut Vec<Block>) {
        self.flush_paragraph(blocks);
        if let Some((kind, items)) = &mut self.list {
            if *kind == ordered {
                items.push(item);
                return;
            }
        }
        self.flush_list(blocks);
        self.list = Some((ordered, vec![item]));
    }

    fn flush(&mut self, blocks: &mut Vec<Block>) {
        self.flush_paragraph(blocks);
        self.flush_list(blocks);
    }

    fn flush_paragraph(&mut self, blocks: &mut Vec<Block>) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.paragraph).join("\n");
        blocks.push(Block::Paragraph(parse_inlines(&text)));
    }

    fn flush_list(&mut self, blocks: &mut Vec<Block>) {
        if let Some((ordered, items)) = self.list.take() {
            blocks.push(Block::List {
                ordered,
                items: items.into_iter().map(parse_inlines).collect(),
            });
        }
    }
}

fn parse_blocks(text: &str, blocks: &mut Vec<Block>) {
    let mut builder = BlockBuilder::default();
    for line in text.lines() {
        if line.trim().is_empty() {
            builder.flush(blocks);
            continue;
        }
        match classify(line) {
            LineKind::Heading(level, content) => {
                builder.flush(blocks);
                blocks.push(Block::Heading {
                    level,
                    content: parse_inlines(content),
                });
            }
            LineKind::Bullet(item) => builder.push_item(false, item, blocks),
            LineKind::Numbered(item) => builder.push_item(true, item, blocks),
            LineKind::Plain(line) => builder.push_line(line, blocks),
        }
    }
    builder.flush(blocks);
}

/// Bold first, then italic over the bold output, so either may nest in the other.
pub fn parse_inlines(text: &str) -> Vec<Inline> {
    let mut bolded = Vec::new();
    let mut rest = text;
    while let Some((open, close)) = find_pair(rest, "**") {
        push_text(&rest[..open], &mut bolded);
        let inner = vec![Inline::Text(rest[open + 2..close].to_string())];
        bolded.push(Inline::Strong(apply_emphasis(inner)));
        rest = &rest[close + 2..];
    }
    push_text(rest, &mut bolded);
    apply_emphasis(bolded)
}

enum Piece {
    Star,
    Text(String),
    Atom(Inline),
}

/// Pairs single stars across text and already-built spans. A star pair
/// never reaches into a span, so the tree stays well nested.
fn apply_emphasis(items: Vec<Inline>) -> Vec<Inline> {
    let mut pieces = Vec::new();
    for item in items {
        match item {
            Inline::Text(text) => {
                for (i, part) in text.split('*').enumerate() {
                    if i > 0 {
                        pieces.push(Piece::Star);
                    }
                    if !part.is_empty() {
                        pieces.push(Piece::Text(part.to_string()));
                    }
                }
            }
            span => pieces.push(Piece::Atom(span)),
        }
    }

    let mut out = Vec::new();
    let mut i = 0;
    while i < pieces.len() {
        if let Piece::Star = pieces[i] {
            // At least one piece of content between the stars.
            let close = (i + 2..pieces.len()).find(|&j| matches!(pieces[j], Piece::Star));
            if let Some(close) = close {
                let mut inner = Vec::new();
                for piece in &pieces[i + 1..close] {
                    push_piece(piece, &mut inner);
                }
                out.push(Inline::Emphasis(inner));
                i = close + 1;
                continue;
            }
        }
        push_piece(&pieces[i], &mut out);
        i += 1;
    }
    out
}

fn push_piece(piece: &Piece, out: &mut Vec<Inline>) {
    match piece {
        Piece::Star => push_text("*", out),
        Piece::Text(text) => push_text(text, out),
        Piece::Atom(span) => out.push(span.clone()),
    }
}

/// Appends text, merging with a trailing text node.
fn push_text(text: &str, out: &mut Vec<Inline>) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}

/// Offsets of the first delimiter and the nearest closing one, leaving at
/// least one character between them.
fn find_pair(text: &str, delim: &str) -> Option<(usize, usize)> {
    let open = text.find(delim)?;
    let body_start = open + delim.len();
    let first = text[body_start..].chars().next()?;
    let search_from = body_start + first.len_utf8();
    let close = text[search_from..].find(delim)? + search_from;
    Some((open, close))
}

fn block_html(block: &Block) -> String {
    match block {
        Block::Heading { level, content } => {
            format!("<h{level}>{}</h{level}>", inlines_html(content))
        }
        Block::Paragraph(content) => format!("<p>{}</p>", inlines_html(content)),
        Block::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            let items: String = items
                .iter()
                .map(|item| format!("<li>{}</li>", inlines_html(item)))
                .collect();
            format!("<{tag}>{items}</{tag}>")
        }
        Block::Code { language, body } => code_block_html(language.as_deref(), body),
    }
}

fn inlines_html(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape_html(text).replace('\n', "<br>")),
            Inline::Strong(inner) => {
                out.push_str("<strong>");
                out.push_str(&inlines_html(inner));
                out.push_str("</strong>");
            }
            Inline::Emphasis(inner) => {
                out.push_str("<em>");
                out.push_str(&inlines_html(inner));
                out.push_str("</em>");
            }
        }
    }
    out
}

fn code_block_html(language: Option<&str>, body: &str) -> String {
    let content = match language {
        Some("json") => pretty_json(body)
            .map(|pretty| highlight_json(&pretty))
            .unwrap_or_else(|| escape_html(body)),
        _ => escape_html(body),
    };
    let mut html = String::new();
    match language {
        Some(lang) => {
            html.push_str(&format!(r#"<div class="code-block {lang}">"#));
            html.push_str(&format!(r#"<span class="code-block-label">{lang}</span>"#));
        }
        None => html.push_str(r#"<div class="code-block">"#),
    }
    html.push_str(COPY_BUTTON);
    html.push_str("<pre>");
    html.push_str(&content);
    html.push_str("</pre></div>");
    html
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonToken {
    Key,
    String,
    Number,
    Boolean,
    Null,
    Punctuation,
}

impl JsonToken {
    pub fn class(self) -> &'static str {
        match self {
            JsonToken::Key => "key",
            JsonToken::String => "string",
            JsonToken::Number => "number",
            JsonToken::Boolean => "boolean",
            JsonToken::Null => "null",
            JsonToken::Punctuation => "",
        }
    }
}

/// Splits pretty-printed JSON into classified runs. A quoted token directly
/// followed by a colon is a key.
pub fn tokenize_json(json: &str) -> Vec<(JsonToken, &str)> {
    let mut tokens: Vec<(JsonToken, &str)> = Vec::new();
    let mut pos = 0;
    while pos < json.len() {
        let rest = &json[pos..];
        let Some(ch) = rest.chars().next() else {
            break;
        };
        let (kind, len) = if ch == '"' {
            let len = string_token_len(rest);
            let is_key = rest[len..].trim_start_matches(|c: char| c == ' ' || c == '\t').starts_with(':');
            (if is_key { JsonToken::Key } else { JsonToken::String }, len)
        } else if ch == '-' || ch.is_ascii_digit() {
            (JsonToken::Number, number_token_len(rest))
        } else if rest.starts_with("true") {
            (JsonToken::Boolean, 4)
        } else if rest.starts_with("false") {
            (JsonToken::Boolean, 5)
        } else if rest.starts_with("null") {
            (JsonToken::Null, 4)
        } else {
            (JsonToken::Punctuation, ch.len_utf8())
        };
        if kind == JsonToken::Punctuation {
            if let Some((JsonToken::Punctuation, run)) = tokens.last_mut() {
                let start = pos - run.len();
                *run = &json[start..pos + len];
                pos += len;
                continue;
            }
        }
        tokens.push((kind, &rest[..len]));
        pos += len;
    }
    tokens
}

pub fn highlight_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len() * 2);
    for (kind, text) in tokenize_json(json) {
        if kind == JsonToken::Punctuation {
            out.push_str(&escape_html(text));
        } else {
            out.push_str(&format!(
                r#"<span class="{}">{}</span>"#,
                kind.class(),
                escape_html(text)
            ));
        }
    }
    out
}

fn string_token_len(s: &str) -> usize {
    let mut escaped = false;
    for (i, ch) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return i + 1;
        }
    }
    s.len()
}

fn number_token_len(s: &str) -> usize {
    s.char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_in_plain_text() {
        let html = render("<script>alert('x')</script>");
        assert!(!html.contains("<script"));
        assert!(html.contains("&lt;script&gt;"));
        assert_eq!(html, "<p>&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;</p>");
    }

    #[test]
    fn escapes_markup_inside_every_construct() {
        let raw = "# <b>title</b>\n\n- <img src=x onerror=y>\n\n**<i>x</i>**\n\n```html\n<script>run()</script>\n```";
        let html = render(raw);
        assert!(!html.contains("<script"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("<b>"));
        assert!(!html.contains("<i>"));
        assert!(html.contains("&lt;script&gt;run()&lt;/script&gt;"));
    }

    #[test]
    fn markup_never_survives_any_construct() {
        let cases = [
            "<b>plain</b>",
            "**<b>bold</b>**",
            "*<i>italic</i>*",
            "*a **<u>b</u>** c*",
            "**a *<s>b</s>* c**",
            "# <h1>head</h1>",
            "### *<em>x</em>*",
            "- <li>item</li>\n- **<a href=x>y</a>**",
            "1. <ol>\n2. *<img src=x>*",
            "```<script>\nalert(1)\n```",
            "```json\n{\"k\":\"<script>\"}\n```",
            "```json\n<not json>\n```",
            "```python\n<svg onload=x>\n```",
            "```\n<iframe>\n```",
            "```python\n<unclosed fence",
            "text\n```<b>\nmore",
            "\"quoted\" & 'single' <tag>",
        ];
        for raw in cases {
            let html = render(raw);
            let text = html
                .replace("<p>", "")
                .replace("</p>", "")
                .replace("<br>", "")
                .replace("<strong>", "")
                .replace("</strong>", "")
                .replace("<em>", "")
                .replace("</em>", "")
                .replace("<ul>", "")
                .replace("</ul>", "")
                .replace("<ol>", "")
                .replace("</ol>", "")
                .replace("<li>", "")
                .replace("</li>", "")
                .replace("<pre>", "")
                .replace("</pre>", "")
                .replace("</div>", "")
                .replace("</span>", "")
                .replace(COPY_BUTTON, "");
            let text = ["<h1>", "</h1>", "<h2>", "</h2>", "<h3>", "</h3>"]
                .iter()
                .fold(text, |acc, tag| acc.replace(tag, ""));
            let text = strip_known_openers(&text);
            assert!(!text.contains('<'), "raw markup leaked for {raw:?}: {html}");
            assert!(!text.contains('>'), "raw markup leaked for {raw:?}: {html}");
        }
    }

    /// Drops the attribute-carrying wrappers the renderer itself emits.
    fn strip_known_openers(html: &str) -> String {
        let mut out = String::new();
        let mut rest = html;
        while let Some(start) = rest.find('<') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let known = ["<div class=\"", "<span class=\""]
                .iter()
                .any(|prefix| tail.starts_with(prefix));
            match tail.find('>') {
                Some(end) if known => rest = &tail[end + 1..],
                _ => {
                    out.push_str(tail);
                    return out;
                }
            }
        }
        out.push_str(rest);
        out
    }

    #[test]
    fn bold_wraps_text_without_leftover_asterisks() {
        let html = render("**bold**");
        assert_eq!(html, "<p><strong>bold</strong></p>");
        assert!(!html.contains('*'));
    }

    #[test]
    fn italic_applies_after_bold_and_inside_it() {
        assert_eq!(render("*soft* and **loud**"), "<p><em>soft</em> and <strong>loud</strong></p>");
        assert_eq!(render("**a *b* c**"), "<p><strong>a <em>b</em> c</strong></p>");
    }

    #[test]
    fn italic_can_wrap_bold() {
        assert_eq!(render("*a **b** c*"), "<p><em>a <strong>b</strong> c</em></p>");
        assert_eq!(
            parse_inlines("*a **b** c*"),
            vec![Inline::Emphasis(vec![
                Inline::Text("a ".to_string()),
                Inline::Strong(vec![Inline::Text("b".to_string())]),
                Inline::Text(" c".to_string()),
            ])]
        );
    }

    #[test]
    fn crossing_delimiters_stay_well_nested() {
        let html = render("*a **b* c**");
        assert_eq!(html, "<p>*a <strong>b* c</strong></p>");
    }

    #[test]
    fn emphasis_is_non_greedy_and_spans_lines() {
        assert_eq!(
            render("**one** two **three**"),
            "<p><strong>one</strong> two <strong>three</strong></p>"
        );
        assert_eq!(
            render("**spans\nlines** done"),
            "<p><strong>spans<br>lines</strong> done</p>"
        );
    }

    #[test]
    fn unmatched_delimiters_stay_literal() {
        assert_eq!(render("2 * 3 = 6"), "<p>2 * 3 = 6</p>");
        assert_eq!(render("**open"), "<p>**open</p>");
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        assert_eq!(
            render("first line\nsecond line\n\n  \nnext paragraph"),
            "<p>first line<br>second line</p><p>next paragraph</p>"
        );
    }

    #[test]
    fn headings_are_not_wrapped_in_paragraphs() {
        assert_eq!(
            render("## Sleep tips\nKeep a routine."),
            "<h2>Sleep tips</h2><p>Keep a routine.</p>"
        );
        assert_eq!(render("#### too deep"), "<p>#### too deep</p>");
        assert_eq!(render("#hashtag"), "<p>#hashtag</p>");
    }

    #[test]
    fn heading_only_reply_falls_back_to_line_breaks() {
        assert_eq!(render("# One\n### Three"), "<h1>One</h1><br><h3>Three</h3>");
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(render(""), "");
        assert_eq!(render("\n\n  \n"), "");
    }

    #[test]
    fn bullet_run_is_one_list() {
        let html = render("- feed\n- burp\n- sleep");
        assert_eq!(html, "<ul><li>feed</li><li>burp</li><li>sleep</li></ul>");
        assert_eq!(html.matches("<ul>").count(), 1);
        assert_eq!(html.matches("<li>").count(), 3);
    }

    #[test]
    fn star_and_dash_bullets_share_a_list() {
        assert_eq!(render("* a\n- b"), "<ul><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn numbered_run_is_one_ordered_list() {
        assert_eq!(
            render("Steps:\n1. wash hands\n2. warm bottle\n10. test temperature"),
            "<p>Steps:</p><ol><li>wash hands</li><li>warm bottle</li><li>test temperature</li></ol>"
        );
    }

    #[test]
    fn blank_line_separates_list_runs() {
        let html = render("- a\n\n- b");
        assert_eq!(html, "<ul><li>a</li></ul><ul><li>b</li></ul>");
    }

    #[test]
    fn switching_list_kind_starts_a_new_list() {
        assert_eq!(
            render("- a\n1. b\n2. c"),
            "<ul><li>a</li></ul><ol><li>b</li><li>c</li></ol>"
        );
    }

    #[test]
    fn list_items_get_inline_formatting() {
        assert_eq!(render("- **Fever** over 38C"), "<ul><li><strong>Fever</strong> over 38C</li></ul>");
    }

    #[test]
    fn bold_line_is_not_a_bullet() {
        assert_eq!(render("**Note** this"), "<p><strong>Note</strong> this</p>");
    }

    #[test]
    fn json_block_is_pretty_printed_and_highlighted() {
        let html = render("```json\n{\"a\":1,\"ok\":true,\"none\":null,\"s\":\"x\"}\n```");
        assert!(html.starts_with(r#"<div class="code-block json"><span class="code-block-label">json</span>"#));
        assert!(html.contains(COPY_BUTTON));
        assert!(html.contains("{\n  <span class=\"key\">&quot;a&quot;</span>: <span class=\"number\">1</span>,\n"));
        assert!(html.contains(r#"<span class="boolean">true</span>"#));
        assert!(html.contains(r#"<span class="null">null</span>"#));
        assert!(html.contains(r#"<span class="string">&quot;x&quot;</span>"#));
        assert!(html.ends_with("\n}</pre></div>"));
    }

    #[test]
    fn json_keeps_key_order() {
        let html = render("```json\n{\"zeta\":1,\"alpha\":2}\n```");
        let zeta = html.find("zeta").unwrap_or(usize::MAX);
        let alpha = html.find("alpha").unwrap_or(0);
        assert!(zeta < alpha);
    }

    #[test]
    fn malformed_json_falls_back_to_plain_pre() {
        let html = render("```json\nnot json\n```");
        assert_eq!(
            html,
            format!(r#"<div class="code-block json"><span class="code-block-label">json</span>{COPY_BUTTON}<pre>not json</pre></div>"#)
        );
    }

    #[test]
    fn code_content_is_not_inline_formatted() {
        let html = render("```python\nx = a ** b * c\n# comment\n```");
        assert!(html.contains("<pre>x = a ** b * c\n# comment</pre>"));
        assert!(!html.contains("<strong>"));
        assert!(!html.contains("<h1>"));
    }

    #[test]
    fn untagged_and_unknown_fences() {
        assert_eq!(
            render("```\nplain\n```"),
            format!(r#"<div class="code-block">{COPY_BUTTON}<pre>plain</pre></div>"#)
        );
        let html = render("```rust\nfn main() {}\n```");
        assert!(html.starts_with(r#"<div class="code-block">"#));
        assert!(html.contains("<pre>rust\nfn main() {}</pre>"));
    }

    #[test]
    fn language_tag_is_case_insensitive() {
        let doc = parse("```JSON\n[1]\n```");
        assert_eq!(
            doc.blocks,
            vec![Block::Code { language: Some("json".to_string()), body: "[1]".to_string() }]
        );
    }

    #[test]
    fn code_block_splits_surrounding_text() {
        let doc = parse("Try this:\n```sql\nSELECT 1;\n```\nThen **rest**.");
        assert_eq!(doc.blocks.len(), 3);
        assert!(matches!(doc.blocks[0], Block::Paragraph(_)));
        assert!(matches!(doc.blocks[1], Block::Code { .. }));
        assert_eq!(
            doc.blocks[2],
            Block::Paragraph(vec![
                Inline::Text("Then ".to_string()),
                Inline::Strong(vec![Inline::Text("rest".to_string())]),
                Inline::Text(".".to_string()),
            ])
        );
    }

    #[test]
    fn unclosed_fence_is_literal_text() {
        assert_eq!(render("```json\n{"), "<p>```json<br>{</p>");
    }

    #[test]
    fn code_blocks_return_copy_text() {
        let doc = parse("```json\n{\"a\":[1,2]}\n```\n```\nraw *text*\n```\n```json\n{bad\n```");
        assert_eq!(
            doc.code_blocks(),
            vec![
                "{\n  \"a\": [\n    1,\n    2\n  ]\n}".to_string(),
                "raw *text*".to_string(),
                "{bad".to_string(),
            ]
        );
    }

    #[test]
    fn plain_text_drops_markup() {
        let doc = parse("## Tips\n**Rest** when *you* can.\n\n1. Eat\n2. Sleep\n\n```json\n{\"a\":1}\n```");
        assert_eq!(
            doc.plain_text(),
            "Tips\n\nRest when you can.\n\n1. Eat\n2. Sleep\n\n{\n  \"a\": 1\n}"
        );
        assert!(parse("").is_empty());
    }

    #[test]
    fn tokenizer_merges_punctuation_runs() {
        let tokens = tokenize_json("{\n  \"k\": -1.5e3\n}");
        assert_eq!(
            tokens,
            vec![
                (JsonToken::Punctuation, "{\n  "),
                (JsonToken::Key, "\"k\""),
                (JsonToken::Punctuation, ": "),
                (JsonToken::Number, "-1.5e3"),
                (JsonToken::Punctuation, "\n}"),
            ]
        );
    }

    #[test]
    fn tokenizer_handles_escaped_quotes() {
        let tokens = tokenize_json(r#""say \"hi\"": "a:b""#);
        assert_eq!(tokens[0], (JsonToken::Key, r#""say \"hi\"""#));
        assert_eq!(tokens[2], (JsonToken::String, r#""a:b""#));
    }
}
