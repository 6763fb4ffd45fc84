use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MARKDOWN_RE: Regex = Regex::new(r"[`*_#>~\-]+").unwrap();
    static ref LINK_RE: Regex = Regex::new(r"\[(.*?)\]\((.*?)\)").unwrap();
    static ref MULTI_SPACE_RE: Regex = Regex::new(r"\s{2,}").unwrap();
}

/// Strip light markdown so a span sounds natural when read aloud.
/// Returns an empty string when nothing speakable is left.
pub fn clean_for_speech(text: &str) -> String {
    let text = MARKDOWN_RE.replace_all(text, " ");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = MULTI_SPACE_RE.replace_all(&text, " ");
    text.trim().to_string()
}
