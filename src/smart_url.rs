/// Smart URLs: a page URL plus a reading-position hint
///
/// The hint rides in the fragment directive (`:~:`), which Chromium strips
/// before the page sees `location.hash`:
/// - `https://a.com/post#:~:text=Hello%20world` scrolls natively to the text
/// - `https://a.com/post#:~:scroll=450` is read back by the restore coordinator
///
/// Text beats scroll offset beats nothing.
use crate::config::TEXT_FRAGMENT_MAX_WORDS;
use crate::tab_data::ProbeData;

const DIRECTIVE_DELIMITER: &str = ":~:";
const TEXT_DIRECTIVE: &str = "text=";
const SCROLL_DIRECTIVE: &str = "scroll=";

/// Reading position captured from a tab before it is closed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionContext {
    pub text_fragment: Option<String>,
    pub scroll_y: f64,
}

impl PositionContext {
    /// Normalize a probe result; `None` (probe failed or found nothing) is no position
    pub fn from_probe(probe: Option<&ProbeData>) -> PositionContext {
        let Some(probe) = probe else {
            return PositionContext::default();
        };

        PositionContext {
            text_fragment: probe.text_fragment.as_deref().and_then(leading_words),
            scroll_y: if probe.scroll_y.is_finite() {
                probe.scroll_y.round().max(0.0)
            } else {
                0.0
            },
        }
    }
}

/// Position recovered from a smart URL
#[derive(Debug, Clone, PartialEq)]
pub enum SmartPosition {
    TextFragment(String),
    ScrollOffset(u32),
    None,
}

/// First `TEXT_FRAGMENT_MAX_WORDS` whitespace-delimited words, or `None` if blank
fn leading_words(text: &str) -> Option<String> {
    let words: Vec<&str> = text.split_whitespace().take(TEXT_FRAGMENT_MAX_WORDS).collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Percent-encode text for a `text=` directive. `-`, `,` and `&` are
/// directive syntax and must not appear literally.
fn encode_text_directive(text: &str) -> String {
    urlencoding::encode(text).replace('-', "%2D")
}

/// Byte offset of the fragment directive; only the fragment can carry one
fn directive_start(url: &str) -> Option<usize> {
    let hash = url.find('#')?;
    url[hash..].find(DIRECTIVE_DELIMITER).map(|at| hash + at)
}

/// Drop any position directive already present so anchors never stack
pub fn strip_position(url: &str) -> &str {
    match directive_start(url) {
        Some(at) => url[..at].strip_suffix('#').unwrap_or(&url[..at]),
        None => url,
    }
}

fn with_directive(base_url: &str, directive: &str) -> String {
    let separator = if base_url.contains('#') { "" } else { "#" };
    format!("{base_url}{separator}{DIRECTIVE_DELIMITER}{directive}")
}

/// Append the reading position in `context` to `base_url`
pub fn encode_smart_url(base_url: &str, context: &PositionContext) -> String {
    let base_url = strip_position(base_url);

    if let Some(text) = context.text_fragment.as_deref().and_then(leading_words) {
        return with_directive(
            base_url,
            &format!("{TEXT_DIRECTIVE}{}", encode_text_directive(&text)),
        );
    }

    let offset = context.scroll_y.round();
    if offset.is_finite() && offset > 0.0 {
        return with_directive(base_url, &format!("{SCROLL_DIRECTIVE}{}", offset as u64));
    }

    base_url.to_string()
}

/// Split a smart URL into its base URL and the position it carries
pub fn decode_smart_url(url: &str) -> (String, SmartPosition) {
    let base = strip_position(url).to_string();
    let Some(at) = directive_start(url) else {
        return (base, SmartPosition::None);
    };
    let directive = &url[at + DIRECTIVE_DELIMITER.len()..];

    let position = if let Some(text) = directive.strip_prefix(TEXT_DIRECTIVE) {
        urlencoding::decode(text)
            .ok()
            .filter(|text| !text.is_empty())
            .map(|text| SmartPosition::TextFragment(text.into_owned()))
            .unwrap_or(SmartPosition::None)
    } else if let Some(offset) = directive.strip_prefix(SCROLL_DIRECTIVE) {
        offset
            .parse::<u32>()
            .map(SmartPosition::ScrollOffset)
            .unwrap_or(SmartPosition::None)
    } else {
        SmartPosition::None
    };

    (base, position)
}
