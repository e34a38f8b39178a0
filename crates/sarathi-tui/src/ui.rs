use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use sarathi_core::{Entry, LineKind, Origin, RenderedLine, Segment};
use crate::app::App;

fn origin_style(origin: Origin) -> Style {
    match origin {
        Origin::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        Origin::Guide => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    }
}

fn segment_style(segment: &Segment, base: Style) -> Style {
    let mut style = base;
    if segment.style.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if segment.style.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if segment.style.strikethrough {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    if segment.style.code {
        style = style.fg(Color::Green);
    }
    if segment.link.is_some() {
        style = style.fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
    }
    style
}

/// Convert a rendered line into styled spans
fn rendered_line(line: &RenderedLine) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    if line.indent > 0 {
        spans.push(Span::raw(" ".repeat(line.indent as usize)));
    }

    let base = match line.kind {
        LineKind::Blank => return Line::default(),
        LineKind::Rule => {
            return Line::from(Span::styled("─".repeat(24), Style::default().fg(Color::DarkGray)));
        }
        LineKind::Heading(_) => Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        LineKind::Quote => {
            spans.push(Span::styled("│ ", Style::default().fg(Color::Magenta)));
            Style::default().add_modifier(Modifier::ITALIC)
        }
        LineKind::Code => {
            spans.push(Span::raw("  "));
            Style::default().fg(Color::Green)
        }
        LineKind::Paragraph | LineKind::ListItem => Style::default(),
    };

    for (i, segment) in line.segments.iter().enumerate() {
        spans.push(Span::styled(segment.text.clone(), segment_style(segment, base)));

        // Show the target once, after the last segment of a link
        if let Some(url) = &segment.link {
            let link_continues = line
                .segments
                .get(i + 1)
                .map(|next| next.link.as_ref() == Some(url))
                .unwrap_or(false);
            if !link_continues && url != &segment.text {
                spans.push(Span::styled(format!(" ({})", url), Style::default().fg(Color::DarkGray)));
            }
        }
    }

    Line::from(spans)
}

/// Display width of `text` in terminal columns
fn text_width(text: &str) -> usize {
    Span::raw(text).width()
}

/// Split text into alternating runs of whitespace and non-whitespace
fn split_runs(text: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        if let Some(space) = current {
            if space != is_space {
                runs.push((space, &text[start..i]));
                start = i;
            }
        }
        current = Some(is_space);
    }
    if let Some(is_space) = current {
        runs.push((is_space, &text[start..]));
    }
    runs
}

/// Word-wrap a styled line into rows of at most `width` columns.
///
/// Spaces at a row break are dropped, leading indentation on the first row is
/// kept, and words wider than a row are broken by character.
fn wrap_line(line: &Line<'static>, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);

    // Runs keep the style of every span they cross
    let mut runs: Vec<(bool, Vec<Span<'static>>)> = Vec::new();
    for span in &line.spans {
        for (is_space, piece) in split_runs(&span.content) {
            let piece = Span::styled(piece.to_string(), span.style);
            match runs.last_mut() {
                Some((space, pieces)) if *space == is_space => pieces.push(piece),
                _ => runs.push((is_space, vec![piece])),
            }
        }
    }

    let mut rows: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0;
    let mut pending: Vec<Span<'static>> = Vec::new();
    let mut pending_width = 0;

    for (is_space, pieces) in runs {
        let run_width: usize = pieces.iter().map(Span::width).sum();

        if is_space {
            if current.is_empty() && !rows.is_empty() {
                continue;
            }
            pending = pieces;
            pending_width = run_width;
            continue;
        }

        if current_width + pending_width + run_width <= width {
            current.append(&mut pending);
            current.extend(pieces);
            current_width += pending_width + run_width;
        } else if run_width <= width {
            if !current.is_empty() {
                rows.push(Line::from(std::mem::take(&mut current)));
            }
            pending.clear();
            current.extend(pieces);
            current_width = run_width;
        } else {
            current.append(&mut pending);
            current_width += pending_width;
            for span in pieces {
                for c in span.content.chars() {
                    let piece = Span::styled(c.to_string(), span.style);
                    let char_width = piece.width();
                    if current_width + char_width > width && !current.is_empty() {
                        rows.push(Line::from(std::mem::take(&mut current)));
                        current_width = 0;
                    }
                    current.push(piece);
                    current_width += char_width;
                }
            }
        }
        pending_width = 0;
    }

    if !current.is_empty() || rows.is_empty() {
        rows.push(Line::from(current));
    }
    rows
}

/// Visible slice of the composer text and the cursor column within it,
/// both measured in display columns
fn input_view(text: &str, cursor: usize, width: usize) -> (String, u16) {
    let chars: Vec<char> = text.chars().collect();
    let cursor = cursor.min(chars.len());
    let prefix_width = |from: usize| -> usize { text_width(&chars[from..cursor].iter().collect::<String>()) };

    // Scroll just far enough that the cursor stays inside the field
    let mut offset = 0;
    while offset < cursor && width > 0 && prefix_width(offset) >= width {
        offset += 1;
    }

    let mut visible = String::new();
    let mut visible_width = 0;
    for c in &chars[offset..] {
        let char_width = text_width(&c.to_string());
        if visible_width + char_width > width {
            break;
        }
        visible.push(*c);
        visible_width += char_width;
    }

    (visible, prefix_width(offset) as u16)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, verse, chat, input, footer
    let [header_area, verse_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(6),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_verse(app, frame, verse_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let badge = match app.backend_online {
        Some(true) => Span::styled(" ● online ", Style::default().fg(Color::Green)),
        Some(false) => Span::styled(" ● offline answers ", Style::default().fg(Color::Red)),
        None => Span::styled(" ○ connecting ", Style::default().fg(Color::DarkGray)),
    };

    let title = Line::from(vec![
        Span::styled(" Sarathi ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.guide.endpoint().to_string(), Style::default().fg(Color::DarkGray)),
        badge,
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn render_verse(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Verse of the Day ");

    let text = match app.current_verse() {
        Some(verse) => Text::from(vec![
            Line::from(Span::styled(
                verse.sanskrit.clone(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!("\"{}\"", verse.translation),
                Style::default().add_modifier(Modifier::ITALIC),
            )),
            Line::from(Span::styled(
                format!("— {}", verse.reference),
                Style::default().fg(Color::DarkGray),
            )),
        ]),
        None => {
            let note = if app.verse_error.is_some() {
                "Verses are unavailable right now"
            } else {
                "Loading verse..."
            };
            Text::from(Span::styled(note, Style::default().fg(Color::DarkGray)))
        }
    };

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    let mut lines: Vec<Line<'static>> = Vec::new();
    for entry in app.conversation.transcript().entries() {
        match entry {
            Entry::Message { message, lines: body, .. } => {
                lines.push(Line::from(Span::styled(
                    format!("{}:", message.origin.label()),
                    origin_style(message.origin),
                )));
                lines.extend(body.iter().map(rendered_line));
                lines.push(Line::default());
            }
            Entry::Placeholder(_) => {
                lines.push(Line::from(Span::styled(
                    format!("{}:", Origin::Guide.label()),
                    origin_style(Origin::Guide),
                )));
                // Animated ellipsis: cycles through ".", "..", "..."
                let dots = ".".repeat((app.animation_frame as usize) + 1);
                lines.push(Line::from(Span::styled(
                    format!("Krishna is contemplating{}", dots),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
                lines.push(Line::default());
            }
        }
    }

    // Inner size minus borders
    let inner_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);
    // Pre-wrap so the scroll range matches exactly what is drawn
    let rows: Vec<Line<'static>> = lines
        .iter()
        .flat_map(|line| wrap_line(line, inner_width as usize))
        .collect();
    let total_lines = rows.len().min(u16::MAX as usize) as u16;
    app.update_chat_metrics(total_lines, inner_height, inner_width);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Conversation ");

    let chat = Paragraph::new(Text::from(rows))
        .block(chat_block)
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let composer = app.conversation.composer();

    let (title, border_color) = if composer.is_enabled() {
        (" Ask Krishna (Enter to send) ", Color::Yellow)
    } else {
        (" Waiting for an answer... ", Color::DarkGray)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = input_view(composer.text(), composer.cursor(), inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor only while the composer accepts input
    if composer.is_enabled() && composer.is_focused() {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let line = match &app.status {
        Some(status) => Line::from(Span::styled(format!(" {}", status), Style::default().fg(Color::Yellow))),
        None => {
            let key = Style::default().fg(Color::Cyan);
            let hint = Style::default().fg(Color::DarkGray);
            Line::from(vec![
                Span::styled(" Enter", key),
                Span::styled(" send  ", hint),
                Span::styled("PgUp/PgDn", key),
                Span::styled(" scroll  ", hint),
                Span::styled("Ctrl-L", key),
                Span::styled(" latest  ", hint),
                Span::styled("Ctrl-S", key),
                Span::styled(" export  ", hint),
                Span::styled("Esc", key),
                Span::styled(" quit", hint),
            ])
        }
    };

    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sarathi_core::{MarkdownRenderer, markdown::render_plain};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn bold_markdown_becomes_bold_span() {
        let rendered = MarkdownRenderer::new().render("**Peace** be with you");
        let line = rendered_line(&rendered[0]);

        assert_eq!(line_text(&line), "Peace be with you");
        let peace = line.spans.iter().find(|s| s.content == "Peace").unwrap();
        assert!(peace.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn plain_markup_stays_literal() {
        let rendered = render_plain("<script>alert(1)</script>");
        let line = rendered_line(&rendered[0]);
        assert_eq!(line_text(&line), "<script>alert(1)</script>");
    }

    #[test]
    fn link_target_is_shown_once() {
        let rendered = MarkdownRenderer::new().render("see [**the** verse](https://example.org/2/47)");
        let line = rendered_line(&rendered[0]);
        assert_eq!(line_text(&line), "see the verse (https://example.org/2/47)");
    }

    fn row_texts(rows: &[Line]) -> Vec<String> {
        rows.iter().map(line_text).collect()
    }

    #[test]
    fn wrap_breaks_at_word_boundaries() {
        let rows = wrap_line(&Line::from("aaaaaaa bbbbbbb ccccccc"), 20);
        assert_eq!(row_texts(&rows), vec!["aaaaaaa bbbbbbb", "ccccccc"]);
    }

    #[test]
    fn wrap_keeps_styles_and_first_row_indent() {
        let line = Line::from(vec![
            Span::raw("  "),
            Span::styled("Peace be", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" with you"),
        ]);
        let rows = wrap_line(&line, 10);
        assert_eq!(row_texts(&rows), vec!["  Peace be", "with you"]);
        assert!(rows[0].spans.iter().any(|s| s.content == "Peace" && s.style.add_modifier.contains(Modifier::BOLD)));
    }

    #[test]
    fn wrap_splits_overlong_words_and_keeps_empty_lines() {
        let rows = wrap_line(&Line::from("a".repeat(25)), 10);
        assert_eq!(rows.iter().map(|r| r.width()).collect::<Vec<_>>(), vec![10, 10, 5]);
        assert_eq!(wrap_line(&Line::default(), 10).len(), 1);
    }

    #[test]
    fn input_cursor_uses_display_width() {
        // Virama and vowel sign take no column of their own
        assert_eq!(input_view("नमस्ते", 6, 20), ("नमस्ते".to_string(), 4));
        assert_eq!(input_view("🙏🙏", 2, 10), ("🙏🙏".to_string(), 4));
        assert_eq!(input_view("🙏🙏", 1, 10).1, 2);
    }

    #[test]
    fn input_scrolls_to_keep_cursor_inside() {
        assert_eq!(input_view("abcdefghij", 10, 5), ("ghij".to_string(), 4));
        assert_eq!(input_view("abcdefghij", 0, 5), ("abcde".to_string(), 0));
    }

    #[test]
    fn newest_reply_line_is_on_screen() {
        use ratatui::{backend::TestBackend, Terminal};
        use sarathi_core::{Conversation, Endpoint, GuideClient, RenderMode, Source};

        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let endpoint = Endpoint::parse("http://127.0.0.1:9/api/chat").unwrap();
        let guide = GuideClient::new(endpoint, std::time::Duration::from_secs(2)).unwrap();
        let mut app = App::new(
            Conversation::default().with_greeting(),
            guide,
            reqwest::Client::new(),
            Source::parse("verses.json"),
            tx,
        );

        let paragraph = "aaaaaaa bbbbbbb ccccccc ddddddd eeeeeee fffffff ggggggg";
        let mut reply = vec![paragraph; 8].join("\n\n");
        reply.push_str("\n\nFINALMARK");
        app.conversation
            .transcript_mut()
            .append_message(reply, Origin::Guide, RenderMode::Markdown);

        let mut terminal = Terminal::new(TestBackend::new(22, 30)).unwrap();
        for _ in 0..2 {
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
        }

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("FINALMARK"), "newest line is not visible");
        assert_eq!(app.chat_scroll, app.total_chat_lines - app.chat_height);
    }
}
