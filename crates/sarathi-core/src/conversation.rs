//! The exchange lifecycle: `Idle -> Pending -> Idle`.
//!
//! [`Conversation::submit`] starts an exchange and hands back a
//! [`PendingExchange`]; the caller runs the request wherever it likes (the
//! TUI spawns a task) and feeds the outcome to [`Conversation::resolve`].
//! While an exchange is pending the composer is disabled, so at most one is
//! ever in flight.

use rand::Rng;
use tracing::{debug, warn};

use crate::fallback;
use crate::markdown::MarkdownRenderer;
use crate::responder::{Responder, ResponderError};
use crate::state::{Origin, RenderMode};
use crate::transcript::{PlaceholderHandle, Transcript};

pub const GREETING: &str = "Namaste 🙏 I am Krishna, your spiritual guide. Ask me anything about the eternal wisdom of Bhagavad Gita, and I shall illuminate your path.";

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line input with a character cursor.
///
/// Edits are ignored while the composer is disabled.
#[derive(Debug, Clone)]
pub struct Composer {
    buffer: String,
    cursor: usize,
    enabled: bool,
    focused: bool,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            enabled: true,
            focused: true,
        }
    }
}

impl Composer {
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Cursor position in characters
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn insert(&mut self, c: char) {
        if !self.enabled {
            return;
        }
        let byte_pos = char_to_byte_index(&self.buffer, self.cursor);
        self.buffer.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if !self.enabled || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.buffer, self.cursor);
        self.buffer.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if !self.enabled {
            return;
        }
        if self.cursor < self.buffer.chars().count() {
            let byte_pos = char_to_byte_index(&self.buffer, self.cursor);
            self.buffer.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        let char_count = self.buffer.chars().count();
        self.cursor = (self.cursor + 1).min(char_count);
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.buffer.chars().count();
    }

    pub fn set_text(&mut self, text: &str) {
        if !self.enabled {
            return;
        }
        self.buffer = text.to_string();
        self.cursor = self.buffer.chars().count();
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.focused = false;
    }

    fn enable_and_focus(&mut self) {
        self.enabled = true;
        self.focused = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    Pending,
}

/// An exchange that has been started but not resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub id: u64,
    pub query: String,
    placeholder: PlaceholderHandle,
}

/// The guide's answer to one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Taken from the canned table because the request failed
    pub fallback: bool,
    /// Waiting for the Markdown renderer before it is appended
    pub deferred: bool,
}

#[derive(Debug)]
pub struct Conversation {
    transcript: Transcript,
    composer: Composer,
    state: ConversationState,
    pending: Option<u64>,
    next_exchange: u64,
    deferred: Vec<String>,
}

impl Conversation {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            composer: Composer::default(),
            state: ConversationState::Idle,
            pending: None,
            next_exchange: 0,
            deferred: Vec::new(),
        }
    }

    /// Open the conversation with the guide's greeting.
    pub fn with_greeting(mut self) -> Self {
        self.transcript.append_message(GREETING, Origin::Guide, RenderMode::PlainText);
        self
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn composer_mut(&mut self) -> &mut Composer {
        &mut self.composer
    }

    /// Replies still waiting for a Markdown renderer
    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    /// Submit whatever is in the composer.
    pub fn submit(&mut self) -> Option<PendingExchange> {
        let text = self.composer.text().to_string();
        self.submit_text(&text)
    }

    /// Start an exchange for `text`.
    ///
    /// Blank text, or any submission while another exchange is pending,
    /// changes nothing and returns `None`.
    pub fn submit_text(&mut self, text: &str) -> Option<PendingExchange> {
        let query = text.trim();
        if query.is_empty() || self.state == ConversationState::Pending {
            return None;
        }

        self.composer.disable();
        self.transcript.append_message(query, Origin::User, RenderMode::PlainText);
        self.composer.clear();
        let placeholder = self.transcript.append_placeholder();

        let id = self.next_exchange;
        self.next_exchange += 1;
        self.pending = Some(id);
        self.state = ConversationState::Pending;
        debug!(exchange = id, "Exchange started");

        Some(PendingExchange {
            id,
            query: query.to_string(),
            placeholder,
        })
    }

    pub fn resolve(&mut self, exchange: PendingExchange, outcome: Result<String, ResponderError>) -> Option<Reply> {
        self.resolve_with_rng(exchange, outcome, &mut rand::thread_rng())
    }

    /// Finish `exchange`, using the fallback table if the request failed.
    ///
    /// Returns `None` for an exchange that is not the pending one.
    pub fn resolve_with_rng<R: Rng + ?Sized>(
        &mut self,
        exchange: PendingExchange,
        outcome: Result<String, ResponderError>,
        rng: &mut R,
    ) -> Option<Reply> {
        if self.pending != Some(exchange.id) {
            warn!(exchange = exchange.id, "Ignoring reply for an exchange that is not pending");
            return None;
        }

        self.transcript.remove_placeholder(exchange.placeholder);

        let (text, fallback) = match outcome {
            Ok(text) => (text, false),
            Err(e) => {
                warn!(exchange = exchange.id, error = %e, "Guidance request failed, answering from the fallback table");
                (fallback::select(&exchange.query, rng).to_string(), true)
            }
        };

        let deferred = !self.transcript.markdown_ready();
        if deferred {
            self.deferred.push(text.clone());
        } else {
            self.transcript.append_message(text.clone(), Origin::Guide, RenderMode::Markdown);
        }

        self.pending = None;
        self.state = ConversationState::Idle;
        self.composer.enable_and_focus();
        debug!(exchange = exchange.id, fallback, deferred, "Exchange resolved");

        Some(Reply { text, fallback, deferred })
    }

    /// Install the Markdown renderer and append every reply queued for it.
    pub fn install_markdown(&mut self, renderer: MarkdownRenderer) {
        self.transcript.install_markdown(renderer);
        for text in std::mem::take(&mut self.deferred) {
            self.transcript.append_message(text, Origin::Guide, RenderMode::Markdown);
        }
    }

    /// Submit `text`, wait for `responder`, and resolve.
    pub async fn exchange<R: Responder + ?Sized>(&mut self, responder: &R, text: &str) -> Option<Reply> {
        let exchange = self.submit_text(text)?;
        let outcome = responder.request_response(&exchange.query).await;
        self.resolve(exchange, outcome)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(Transcript::default())
    }
}
