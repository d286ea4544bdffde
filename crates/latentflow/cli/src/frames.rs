//! Intent-frame input files.
//!
//! One JSON document per line, either a bare `IntentFrame` or
//! `{"session": "...", "frame": {...}}`. Blank lines and `#` comments are
//! skipped. Bare frames belong to the [`DEFAULT_SESSION`].

use anyhow::{Context, Result};
use latentflow_types::IntentFrame;
use serde::Deserialize;

pub const DEFAULT_SESSION: &str = "default";

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameLine {
    Session { session: String, frame: IntentFrame },
    Bare(IntentFrame),
}

/// A frame and the 1-based input line it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberedFrame {
    pub line: usize,
    pub frame: IntentFrame,
}

/// Frames of one session, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFrames {
    pub session: String,
    pub frames: Vec<NumberedFrame>,
}

/// Parse a frames file, grouping by session in order of first appearance.
pub fn parse_frames(text: &str) -> Result<Vec<SessionFrames>> {
    let mut sessions: Vec<SessionFrames> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let parsed: FrameLine =
            serde_json::from_str(trimmed).with_context(|| format!("line {line}: not an intent frame"))?;
        let (session, frame) = match parsed {
            FrameLine::Session { session, frame } => (session, frame),
            FrameLine::Bare(frame) => (DEFAULT_SESSION.to_string(), frame),
        };

        let entry = NumberedFrame { line, frame };
        match sessions.iter_mut().find(|s| s.session == session) {
            Some(existing) => existing.frames.push(entry),
            None => sessions.push(SessionFrames {
                session,
                frames: vec![entry],
            }),
        }
    }

    Ok(sessions)
}
