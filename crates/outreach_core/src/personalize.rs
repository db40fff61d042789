//! crates/outreach_core/src/personalize.rs
//!
//! Per-recipient message text and the deep link that opens it in the web
//! client. Shared by the program synthesizer and the delivery orchestrator
//! so both paths send identical text.

use std::sync::LazyLock;

use regex::Regex;

/// Longest message handed to the web client, in characters.
pub const MAX_DELIVERY_MESSAGE_CHARS: usize = 4096;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\s*(?:nombre|name)\s*\}").expect("placeholder pattern compiles")
});
static GREETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[¡!]?\s*(?:hola|hello|hi|hey|buenos|buenas|saludos)\b")
        .expect("greeting pattern compiles")
});

/// Fills `{nombre}`/`{name}` placeholders and makes sure the message opens
/// with a greeting that names the recipient.
pub fn personalize(name: &str, message: &str) -> String {
    let filled = PLACEHOLDER.replace_all(message, regex::NoExpand(name));
    let greeted = GREETING.is_match(&filled);

    let text = if greeted {
        filled.into_owned()
    } else {
        format!("Hola {name}!\n\n{filled}")
    };

    if text.chars().count() <= MAX_DELIVERY_MESSAGE_CHARS {
        return text;
    }
    let cut = text
        .char_indices()
        .nth(MAX_DELIVERY_MESSAGE_CHARS - 3)
        .map_or(text.len(), |(cut, _)| cut);
    format!("{}...", &text[..cut])
}

/// The URL that opens a chat with `phone` and pre-fills `message`.
pub fn deep_link(client_url: &str, phone: &str, message: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!(
        "{}/send?phone={}&text={}",
        client_url.trim_end_matches('/'),
        digits,
        urlencoding::encode(message)
    )
}
