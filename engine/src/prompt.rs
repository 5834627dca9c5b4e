//! Prompt templates and response shaping.
//!
//! Each trigger kind orders context, instruction and the user's text
//! differently; the templates here are the only place that ordering lives.

use scribe_types::SearchSettings;
use url::{Url, form_urlencoded};

/// Upper bound on suggestions shown for one request.
pub const MAX_SUGGESTIONS: usize = 6;

pub const DEFAULT_SMART_REPLY_INSTRUCTIONS: &str = "\
The user is writing a reply in a messaging app.

Work out the language of the most recent messages in the conversation above, \
ignoring interface labels. The newest message decides. Reply only in that \
language and never mix languages.

Suggest 6 short, natural replies that fit the conversation.
Output only the replies, one per line, without numbering or quotes.";

pub const DEFAULT_TONE_REWRITE_INSTRUCTIONS: &str = "\
Keep the language of the original text. Do not translate it.

Rewrite the text above in 6 tones: professional, casual and friendly, witty, \
empathetic, confident, and polite and formal.
Output only the rewritten versions, one per line, without numbering or labels.";

const FALLBACK_SEARCH_TEMPLATE: &str = "https://duckduckgo.com/?q=%s";

const SELECTION_REWRITE_SUFFIX: &str = "Return ONLY the rewritten text, nothing else.";

/// Smart reply: screen context first, instructions last.
#[must_use]
pub fn smart_reply(context: &str, instructions: &str) -> String {
    format!("Context from screen:\n{context}\n\n{instructions}")
}

/// Tone rewrite over a whole field: quoted original, then instructions.
#[must_use]
pub fn tone_rewrite(original: &str, instructions: &str) -> String {
    format!("Original text: \"{original}\"\n\n{instructions}")
}

/// Tone rewrite of a selection; asks for a single result.
#[must_use]
pub fn selection_tone_rewrite(selection: &str, instructions: &str) -> String {
    format!("{}\n\n{SELECTION_REWRITE_SUFFIX}", tone_rewrite(selection, instructions))
}

/// Custom trigger over a whole field: instruction, then the text on the same line.
#[must_use]
pub fn custom(instruction: &str, text: &str) -> String {
    format!("{instruction} {text}")
}

/// Custom trigger over a selection: instruction, blank line, selection.
#[must_use]
pub fn selection_custom(instruction: &str, selection: &str) -> String {
    format!("{instruction}\n\n{selection}")
}

/// Split a multi-suggestion response into at most [`MAX_SUGGESTIONS`] lines.
///
/// Blank lines are dropped; a leading `"- "` and surrounding quotes are removed.
#[must_use]
pub fn parse_suggestions(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let line = line.strip_prefix("- ").unwrap_or(line);
            let line = line.strip_prefix('"').unwrap_or(line);
            line.strip_suffix('"').unwrap_or(line).to_string()
        })
        .filter(|line| !line.is_empty())
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Search URL for `query`, percent-encoded into the engine's `%s` slot.
///
/// A custom engine without a usable template falls back to DuckDuckGo.
#[must_use]
pub fn search_url(settings: &SearchSettings, query: &str) -> Option<Url> {
    let template = settings
        .engine
        .url_template(&settings.custom_url)
        .unwrap_or(FALLBACK_SEARCH_TEMPLATE);
    let encoded: String = form_urlencoded::byte_serialize(query.as_bytes()).collect();
    match Url::parse(&template.replace("%s", &encoded)) {
        Ok(url) => Some(url),
        Err(err) => {
            tracing::warn!(template, "Invalid search URL template: {err}");
            None
        }
    }
}
