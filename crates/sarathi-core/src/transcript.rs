//! The ordered, append-only log of the conversation.
//!
//! Messages are rendered once, when appended. The only entries that ever
//! leave the log are loading placeholders, and only through the handle
//! returned when they were added.

use crate::markdown::{render_plain, MarkdownRenderer, RenderedLine};
use crate::state::{Message, Origin, RenderMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaceholderHandle(u64);

#[derive(Debug, Clone)]
pub enum Entry {
    Message {
        id: EntryId,
        message: Message,
        lines: Vec<RenderedLine>,
    },
    Placeholder(PlaceholderHandle),
}

#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<Entry>,
    next_id: u64,
    markdown: Option<MarkdownRenderer>,
    follow_tail: bool,
}

impl Transcript {
    pub fn new(markdown: Option<MarkdownRenderer>) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            markdown,
            follow_tail: true,
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Render and append a message, and snap the view back to the newest entry.
    ///
    /// Markdown-mode text falls back to plain rendering when no Markdown
    /// renderer is installed.
    pub fn append_message(&mut self, text: impl Into<String>, origin: Origin, render_mode: RenderMode) -> EntryId {
        let message = Message::new(text, origin, render_mode);
        let lines = match (render_mode, &self.markdown) {
            (RenderMode::Markdown, Some(renderer)) => renderer.render(&message.text),
            _ => render_plain(&message.text),
        };

        let id = EntryId(self.next_id());
        self.entries.push(Entry::Message { id, message, lines });
        self.follow_tail = true;
        id
    }

    pub fn append_placeholder(&mut self) -> PlaceholderHandle {
        let handle = PlaceholderHandle(self.next_id());
        self.entries.push(Entry::Placeholder(handle));
        self.follow_tail = true;
        handle
    }

    /// Returns whether the placeholder was still present.
    pub fn remove_placeholder(&mut self, handle: PlaceholderHandle) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !matches!(entry, Entry::Placeholder(h) if *h == handle));
        self.entries.len() != before
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Message { message, .. } => Some(message),
            Entry::Placeholder(_) => None,
        })
    }

    pub fn message_count(&self) -> usize {
        self.messages().count()
    }

    pub fn has_placeholder(&self) -> bool {
        self.entries.iter().any(|entry| matches!(entry, Entry::Placeholder(_)))
    }

    pub fn markdown(&self) -> Option<&MarkdownRenderer> {
        self.markdown.as_ref()
    }

    pub fn markdown_ready(&self) -> bool {
        self.markdown.is_some()
    }

    pub fn install_markdown(&mut self, renderer: MarkdownRenderer) {
        self.markdown = Some(renderer);
    }

    /// Whether the view should stay pinned to the newest entry
    pub fn follow_tail(&self) -> bool {
        self.follow_tail
    }

    pub fn set_follow_tail(&mut self, follow: bool) {
        self.follow_tail = follow;
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new(Some(MarkdownRenderer::new()))
    }
}
