//! UI-agnostic conversation types
//!
//! These are shared by every front end and carry no rendering or terminal
//! dependencies.

use serde::{Deserialize, Serialize};

/// One message in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub origin: Origin,
    pub render_mode: RenderMode,
}

impl Message {
    pub fn new(text: impl Into<String>, origin: Origin, render_mode: RenderMode) -> Self {
        Self {
            text: text.into(),
            origin,
            render_mode,
        }
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    User,
    Guide,
}

impl Origin {
    pub fn label(&self) -> &'static str {
        match self {
            Origin::User => "You",
            Origin::Guide => "Krishna",
        }
    }
}

/// How a message body is interpreted when rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderMode {
    PlainText,
    Markdown,
}
