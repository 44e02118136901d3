//! Notification formatter
//!
//! Renders an [`Event`] into the text sent to the chat. Every field is
//! included, plus the raw line, so a misparsed field can always be checked
//! against the received line.

use crate::event::{Event, EventKind, Field};

/// Telegram rejects messages longer than this (in characters)
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Glyph for kinds outside the lookup table
const FALLBACK_GLYPH: &str = "🔔";

/// Longest rendering of a single captured field in the header
const MAX_FIELD_CHARS: usize = 256;

const ELLIPSIS: &str = "…";

/// Display glyph for an event kind
pub fn kind_glyph(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::Accepted => "🔓",
        EventKind::Failed => "❌",
        EventKind::SessionOpened => "🔓",
        EventKind::SessionClosed => "🚪",
        EventKind::Disconnected => "📴",
        EventKind::Error => "⚠️",
        EventKind::Other(_) => FALLBACK_GLYPH,
    }
}

/// Render an event as a multi-line notification
pub fn format_event(event: &Event) -> String {
    let header = format!(
        "{} New SSH event:\n\
         ⏰ Time: {}\n\
         🖥️ Server: {}\n\
         📡 Server IP: {}\n\
         🔑 Status: {}\n\
         👨 User: {}\n\
         🌍 IP: {}\n\
         🔒 Method: {}\n\
         🔌 Port: {}\n\
         ℹ️ Details: ",
        kind_glyph(&event.kind),
        header_field(event, Field::Timestamp),
        header_field(event, Field::ServerName),
        header_field(event, Field::ServerIp),
        truncate_chars(event.kind.as_str(), MAX_FIELD_CHARS),
        header_field(event, Field::Username),
        header_field(event, Field::ClientIp),
        header_field(event, Field::AuthMethod),
        header_field(event, Field::Port),
    );

    let budget = MAX_MESSAGE_CHARS.saturating_sub(header.chars().count());
    let details = truncate_chars(&event.raw_line, budget);

    header + &details
}

fn header_field(event: &Event, field: Field) -> String {
    truncate_chars(&event.display_field(field), MAX_FIELD_CHARS)
}

/// Cut `text` to at most `max_chars` characters, marking the cut with an ellipsis
/// when there is room for one
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars < ELLIPSIS.chars().count() {
        return text.chars().take(max_chars).collect();
    }

    let keep = max_chars.saturating_sub(ELLIPSIS.chars().count());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}
