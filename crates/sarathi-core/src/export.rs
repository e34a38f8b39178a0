//! One-way export of a transcript to a standalone HTML page.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};

use crate::markdown::{escape_html, plain_html, MarkdownRenderer};
use crate::state::{Message, Origin, RenderMode};
use crate::transcript::Transcript;

const STYLE: &str = "body{font-family:Georgia,serif;max-width:48em;margin:2em auto;padding:0 1em}\
.message{margin:1em 0;padding:.6em 1em;border-radius:8px}\
.user-message{background:#eef3fb}.bot-message{background:#fbf6e9}\
.origin{font-weight:bold;margin-bottom:.3em}";

pub fn transcript_html(transcript: &Transcript, title: &str) -> String {
    let renderer = transcript.markdown().copied().unwrap_or_default();

    let mut body = String::new();
    for message in transcript.messages() {
        body.push_str(&message_html(message, &renderer));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn message_html(message: &Message, renderer: &MarkdownRenderer) -> String {
    let class = match message.origin {
        Origin::User => "user-message",
        Origin::Guide => "bot-message",
    };
    let content = match message.render_mode {
        RenderMode::Markdown => renderer.render_html(&message.text),
        RenderMode::PlainText => plain_html(&message.text),
    };

    format!(
        "<div class=\"message {}\">\n<div class=\"origin\">{}</div>\n<div class=\"message-content\">\n{}</div>\n</div>\n",
        class,
        message.origin.label(),
        content
    )
}

pub fn default_export_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;

    Ok(data_dir.join("sarathi"))
}

/// Write the transcript to `dir/transcript-<timestamp>.html`.
pub fn write_transcript(transcript: &Transcript, dir: &Path, now: DateTime<Local>) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let path = dir.join(format!("transcript-{}.html", now.format("%Y%m%d-%H%M%S")));
    let title = format!("Conversation with Krishna, {}", now.format("%Y-%m-%d %H:%M"));
    fs::write(&path, transcript_html(transcript, &title))
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
