use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use ratatui::layout::Rect;
use reqwest::Client;
use sarathi_core::{
    export, Conversation, ConversationState, GuideClient, PendingExchange, Responder, ResponderError,
    Source, Verse, VerseBook,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::tui::AppEvent;

pub struct App {
    pub should_quit: bool,

    // Conversation state
    pub conversation: Conversation,
    pub guide: Arc<GuideClient>,
    pub backend_online: Option<bool>,

    // Verse of the day
    pub verses: VerseBook,
    pub verses_source: Source,
    pub verse_error: Option<String>,

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the chat area
    pub chat_width: u16,  // Inner width of the chat area, for wrap calculations
    pub total_chat_lines: u16,
    pub chat_area: Option<Rect>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // One-line notice shown in the footer
    pub status: Option<String>,
    pub export_dir: Option<PathBuf>,

    http: Client,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(
        conversation: Conversation,
        guide: GuideClient,
        http: Client,
        verses_source: Source,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,

            conversation,
            guide: Arc::new(guide),
            backend_online: None,

            verses: VerseBook::default(),
            verses_source,
            verse_error: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            total_chat_lines: 0,
            chat_area: None,

            animation_frame: 0,

            status: None,
            export_dir: None,

            http,
            events,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.conversation.state() == ConversationState::Pending
    }

    /// Submit the composer text and run the request in the background
    pub fn submit(&mut self) {
        let Some(exchange) = self.conversation.submit() else {
            return;
        };
        self.status = None;
        self.animation_frame = 0;

        let guide = Arc::clone(&self.guide);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = guide.request_response(&exchange.query).await;
            let _ = events.send(AppEvent::Reply(exchange, outcome));
        });
    }

    pub fn on_reply(&mut self, exchange: PendingExchange, outcome: Result<String, ResponderError>) {
        if let Some(reply) = self.conversation.resolve(exchange, outcome) {
            self.backend_online = Some(!reply.fallback);
        }
    }

    pub fn reload_verses(&self) {
        let http = self.http.clone();
        let source = self.verses_source.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = VerseBook::load(&http, &source).await;
            let _ = events.send(AppEvent::VersesLoaded(result));
        });
    }

    /// A failed reload keeps whatever verse is already shown.
    pub fn on_verses_loaded(&mut self, result: anyhow::Result<VerseBook>) {
        match result {
            Ok(verses) => {
                info!(count = verses.len(), "Loaded verses");
                self.verses = verses;
                self.verse_error = None;
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Could not load verses");
                self.verse_error = Some(format!("{:#}", e));
            }
        }
    }

    pub fn current_verse(&self) -> Option<&Verse> {
        self.verses.today()
    }

    pub fn probe_health(&self) {
        let guide = Arc::clone(&self.guide);
        let events = self.events.clone();
        tokio::spawn(async move {
            let online = match guide.health().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Guidance API health check failed");
                    false
                }
            };
            let _ = events.send(AppEvent::Health(online));
        });
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.conversation.transcript().has_placeholder() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling
    fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.conversation.transcript_mut().set_follow_tail(false);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
        if self.chat_scroll >= max_scroll {
            self.conversation.transcript_mut().set_follow_tail(true);
        }
    }

    pub fn scroll_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    pub fn scroll_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_to_tail(&mut self) {
        self.conversation.transcript_mut().set_follow_tail(true);
        self.chat_scroll = self.max_scroll();
    }

    /// Recompute the scroll offset after the chat has been laid out
    pub fn update_chat_metrics(&mut self, total_lines: u16, height: u16, width: u16) {
        self.total_chat_lines = total_lines;
        self.chat_height = height;
        self.chat_width = width;

        if self.conversation.transcript().follow_tail() {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }

    pub fn export_transcript(&mut self) {
        let dir = match self.export_dir.clone() {
            Some(dir) => dir,
            None => match export::default_export_dir() {
                Ok(dir) => dir,
                Err(e) => {
                    self.status = Some(format!("Export failed: {}", e));
                    return;
                }
            },
        };

        match export::write_transcript(self.conversation.transcript(), &dir, Local::now()) {
            Ok(path) => {
                info!(path = %path.display(), "Exported transcript");
                self.status = Some(format!("Saved transcript to {}", path.display()));
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Transcript export failed");
                self.status = Some(format!("Export failed: {:#}", e));
            }
        }
    }
}
