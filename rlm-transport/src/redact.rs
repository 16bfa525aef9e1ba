//! Elides base64 image payloads from loggable text (spec §6: "Base64
//! payloads must be elided from logs").

use std::sync::OnceLock;

fn data_uri_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"data:([^;,\s]+);base64,[A-Za-z0-9+/=]+")
            .expect("static data-uri pattern is valid")
    })
}

/// Replace every `data:<media-type>;base64,<payload>` URI in `text` with
/// a redacted placeholder, keeping the media type for diagnostics.
pub fn redact_data_uris(text: &str) -> String {
    data_uri_pattern()
        .replace_all(text, "data:$1;base64,<redacted>")
        .into_owned()
}
