//! Markdown rendering for guide replies.
//!
//! Output is UI-agnostic: a message becomes a list of [`RenderedLine`]s made
//! of styled [`Segment`]s, which each front end maps onto its own widgets.
//! Raw HTML inside the source is never interpreted, only shown as text.

use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStyle {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub strikethrough: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub style: SegmentStyle,
    /// Target of the link this segment belongs to
    pub link: Option<String>,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: SegmentStyle::default(),
            link: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Paragraph,
    Heading(u8),
    Quote,
    ListItem,
    Code,
    Rule,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub kind: LineKind,
    pub indent: u16,
    pub segments: Vec<Segment>,
}

impl RenderedLine {
    pub fn blank() -> Self {
        Self {
            kind: LineKind::Blank,
            indent: 0,
            segments: Vec::new(),
        }
    }

    /// Concatenated visible text of the line
    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Render text verbatim, one line per source line.
pub fn render_plain(text: &str) -> Vec<RenderedLine> {
    let lines: Vec<RenderedLine> = text
        .lines()
        .map(|line| RenderedLine {
            kind: LineKind::Paragraph,
            indent: 0,
            segments: vec![Segment::plain(line)],
        })
        .collect();

    if lines.is_empty() {
        vec![RenderedLine::blank()]
    } else {
        lines
    }
}

/// Escape text for inclusion in HTML content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Plain text as an HTML paragraph; nothing in `text` is interpreted.
pub fn plain_html(text: &str) -> String {
    format!("<p>{}</p>\n", escape_html(text).replace('\n', "<br>\n"))
}

#[derive(Debug, Clone, Copy)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS,
        }
    }

    pub fn render(&self, text: &str) -> Vec<RenderedLine> {
        let mut builder = LineBuilder::default();
        for event in Parser::new_ext(text, self.options) {
            builder.push(event);
        }
        builder.finish()
    }

    /// HTML for export. Raw HTML is escaped, links open in a new browsing
    /// context without opener or referrer.
    pub fn render_html(&self, text: &str) -> String {
        let events = Parser::new_ext(text, self.options).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            Event::Start(Tag::Link { dest_url, title, .. }) => {
                Event::InlineHtml(CowStr::from(open_anchor(&dest_url, &title)))
            }
            Event::End(TagEnd::Link) => Event::InlineHtml(CowStr::Borrowed("</a>")),
            Event::Start(Tag::Image { link_type, dest_url, title, id }) if is_script_url(&dest_url) => {
                Event::Start(Tag::Image {
                    link_type,
                    dest_url: CowStr::Borrowed("#"),
                    title,
                    id,
                })
            }
            other => other,
        });

        let mut out = String::new();
        html::push_html(&mut out, events);
        out
    }
}

/// URLs that run code or smuggle content when followed or loaded
fn is_script_url(url: &str) -> bool {
    let lowered = url.trim_start().to_ascii_lowercase();
    ["javascript:", "vbscript:", "data:"].iter().any(|s| lowered.starts_with(s))
}

fn open_anchor(dest_url: &str, title: &str) -> String {
    let href = if is_script_url(dest_url) {
        "#".to_string()
    } else {
        escape_html(dest_url)
    };

    let title_attr = if title.is_empty() {
        String::new()
    } else {
        format!(r#" title="{}""#, escape_html(title))
    };

    format!(r#"<a href="{}"{} target="_blank" rel="noopener noreferrer">"#, href, title_attr)
}

#[derive(Default)]
struct LineBuilder {
    lines: Vec<RenderedLine>,
    segments: Vec<Segment>,
    bold: usize,
    italic: usize,
    strikethrough: usize,
    link: Option<String>,
    heading: Option<u8>,
    quote_depth: usize,
    // One entry per open list: next number for ordered lists
    lists: Vec<Option<u64>>,
    in_code_block: bool,
    needs_gap: bool,
    after_marker: bool,
}

impl LineBuilder {
    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.in_code_block {
                    for line in text.lines() {
                        self.lines.push(RenderedLine {
                            kind: LineKind::Code,
                            indent: self.indent(),
                            segments: vec![Segment::plain(line)],
                        });
                    }
                } else {
                    self.text(&text, false);
                }
            }
            Event::Code(text) => self.text(&text, true),
            Event::Html(raw) => {
                for line in raw.lines() {
                    self.text(line, false);
                    self.flush();
                }
            }
            Event::InlineHtml(raw) => self.text(&raw, false),
            Event::SoftBreak => self.text(" ", false),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.gap();
                self.lines.push(RenderedLine {
                    kind: LineKind::Rule,
                    indent: 0,
                    segments: Vec::new(),
                });
                self.needs_gap = true;
            }
            Event::TaskListMarker(done) => {
                self.text(if done { "[x] " } else { "[ ] " }, false);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.gap(),
            Tag::Heading { level, .. } => {
                self.gap();
                self.heading = Some(heading_number(level));
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.gap();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.gap();
                self.in_code_block = true;
            }
            Tag::List(start) => {
                self.flush();
                self.gap();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.segments.push(Segment::plain(marker));
                self.after_marker = true;
            }
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            Tag::Strikethrough => self.strikethrough += 1,
            Tag::Link { dest_url, .. } | Tag::Image { dest_url, .. } => {
                self.link = Some(dest_url.to_string());
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush();
                self.needs_gap = true;
            }
            TagEnd::Heading(_) => {
                self.flush();
                self.heading = None;
                self.needs_gap = true;
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.needs_gap = true;
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.needs_gap = true;
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                self.needs_gap = true;
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Strikethrough => self.strikethrough = self.strikethrough.saturating_sub(1),
            TagEnd::Link | TagEnd::Image => self.link = None,
            _ => {}
        }
    }

    fn text(&mut self, text: &str, code: bool) {
        if text.is_empty() {
            return;
        }
        let style = SegmentStyle {
            bold: self.bold > 0,
            italic: self.italic > 0,
            code,
            strikethrough: self.strikethrough > 0,
        };

        // Merge with the previous segment when nothing about it differs;
        // a list marker stays its own segment
        let after_marker = std::mem::take(&mut self.after_marker);
        if let Some(last) = self.segments.last_mut() {
            if !after_marker && last.style == style && last.link == self.link {
                last.text.push_str(text);
                return;
            }
        }

        self.segments.push(Segment {
            text: text.to_string(),
            style,
            link: self.link.clone(),
        });
    }

    fn gap(&mut self) {
        // Items in a list stay tight
        if self.needs_gap && self.lists.is_empty() && !self.lines.is_empty() {
            self.lines.push(RenderedLine::blank());
        }
        self.needs_gap = false;
    }

    fn indent(&self) -> u16 {
        (self.lists.len().saturating_sub(1) * 2 + self.quote_depth * 2) as u16
    }

    fn kind(&self) -> LineKind {
        if let Some(level) = self.heading {
            LineKind::Heading(level)
        } else if !self.lists.is_empty() {
            LineKind::ListItem
        } else if self.quote_depth > 0 {
            LineKind::Quote
        } else {
            LineKind::Paragraph
        }
    }

    fn flush(&mut self) {
        if self.segments.is_empty() {
            return;
        }
        let segments = std::mem::take(&mut self.segments);
        self.lines.push(RenderedLine {
            kind: self.kind(),
            indent: self.indent(),
            segments,
        });
    }

    fn finish(mut self) -> Vec<RenderedLine> {
        self.flush();
        while self.lines.last().map(|l| l.kind == LineKind::Blank).unwrap_or(false) {
            self.lines.pop();
        }
        if self.lines.is_empty() {
            self.lines.push(RenderedLine::blank());
        }
        self.lines
    }
}

fn heading_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_text(lines: &[RenderedLine]) -> String {
        lines.iter().map(|l| l.text()).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn strong_becomes_bold_without_asterisks() {
        let lines = MarkdownRenderer::new().render("**Peace** be with you");
        assert_eq!(lines.len(), 1);
        let segments = &lines[0].segments;
        assert_eq!(segments[0].text, "Peace");
        assert!(segments[0].style.bold);
        assert_eq!(segments[1].text, " be with you");
        assert!(!segments[1].style.bold);
        assert!(!all_text(&lines).contains('*'));
    }

    #[test]
    fn emphasis_and_code() {
        let lines = MarkdownRenderer::new().render("be *calm* and `steady`");
        let segments = &lines[0].segments;
        assert!(segments.iter().any(|s| s.text == "calm" && s.style.italic));
        assert!(segments.iter().any(|s| s.text == "steady" && s.style.code));
    }

    #[test]
    fn raw_html_is_kept_as_text() {
        let lines = MarkdownRenderer::new().render("<script>alert(1)</script>");
        assert_eq!(all_text(&lines), "<script>alert(1)</script>");
    }

    #[test]
    fn plain_rendering_is_literal() {
        let lines = render_plain("**not bold** <b>x</b>\nsecond");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].segments, vec![Segment::plain("**not bold** <b>x</b>")]);
        assert_eq!(lines[1].text(), "second");
    }

    #[test]
    fn blocks_are_separated_by_blank_lines() {
        let lines = MarkdownRenderer::new().render("# Karma Yoga\n\nAct without attachment.\n\n> Quote here");
        let kinds: Vec<LineKind> = lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LineKind::Heading(1), LineKind::Blank, LineKind::Paragraph, LineKind::Blank, LineKind::Quote]
        );
    }

    #[test]
    fn lists_get_markers() {
        let lines = MarkdownRenderer::new().render("1. first\n2. second\n\n- a\n- b");
        let texts: Vec<String> = lines.iter().filter(|l| l.kind == LineKind::ListItem).map(|l| l.text()).collect();
        assert_eq!(texts, vec!["1. first", "2. second", "• a", "• b"]);
    }

    #[test]
    fn code_blocks_keep_their_lines() {
        let lines = MarkdownRenderer::new().render("```\nline one\nline two\n```");
        let code: Vec<String> = lines.iter().filter(|l| l.kind == LineKind::Code).map(|l| l.text()).collect();
        assert_eq!(code, vec!["line one", "line two"]);
    }

    #[test]
    fn links_carry_their_target() {
        let lines = MarkdownRenderer::new().render("read [the Gita](https://example.org/gita)");
        let link = lines[0].segments.iter().find(|s| s.link.is_some()).unwrap();
        assert_eq!(link.text, "the Gita");
        assert_eq!(link.link.as_deref(), Some("https://example.org/gita"));
    }

    #[test]
    fn empty_input_renders_one_blank_line() {
        assert_eq!(MarkdownRenderer::new().render(""), vec![RenderedLine::blank()]);
        assert_eq!(render_plain(""), vec![RenderedLine::blank()]);
    }

    #[test]
    fn html_links_open_safely() {
        let html = MarkdownRenderer::new().render_html("see [verse](https://example.org/2/47 \"BG 2.47\")");
        assert!(html.contains(
            r#"<a href="https://example.org/2/47" title="BG 2.47" target="_blank" rel="noopener noreferrer">verse</a>"#
        ));
    }

    #[test]
    fn html_escapes_raw_markup() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_html("hi <script>alert('x')</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));

        let block = renderer.render_html("<div onclick=\"x()\">block</div>");
        assert!(!block.contains("<div"));
    }

    #[test]
    fn html_neutralises_script_urls() {
        let html = MarkdownRenderer::new().render_html("[click](javascript:alert(1))");
        assert!(html.contains(r##"href="#""##));
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn html_neutralises_script_image_sources() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render_html("![x](javascript:alert(1)) ![y](DATA:text/html,hi)");
        assert!(!html.to_ascii_lowercase().contains("javascript:"));
        assert!(!html.to_ascii_lowercase().contains("data:"));
        assert_eq!(html.matches(r##"src="#""##).count(), 2);

        let safe = renderer.render_html("![lotus](https://example.org/lotus.png)");
        assert!(safe.contains(r#"src="https://example.org/lotus.png""#));
    }

    #[test]
    fn html_bold() {
        let html = MarkdownRenderer::new().render_html("**Peace** be with you");
        assert_eq!(html, "<p><strong>Peace</strong> be with you</p>\n");
    }

    #[test]
    fn plain_html_is_escaped() {
        assert_eq!(
            plain_html("<script>alert(\"x\")</script>"),
            "<p>&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;</p>\n"
        );
    }
}
