pub mod config;
pub mod conversation;
pub mod endpoint;
pub mod export;
pub mod fallback;
pub mod markdown;
pub mod responder;
pub mod source;
pub mod state;
pub mod transcript;
pub mod verse;

// Re-export main types for convenience
pub use config::Settings;
pub use conversation::{Composer, Conversation, ConversationState, PendingExchange, Reply, GREETING};
pub use endpoint::{Endpoint, DEFAULT_ENDPOINT};
pub use markdown::{LineKind, MarkdownRenderer, RenderedLine, Segment, SegmentStyle};
pub use responder::{GuideClient, Responder, ResponderError};
pub use source::Source;
pub use state::{Message, Origin, RenderMode};
pub use transcript::{Entry, EntryId, PlaceholderHandle, Transcript};
pub use verse::{Verse, VerseBook};
