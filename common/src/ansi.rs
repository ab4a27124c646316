//! ANSI escape sequence stripping for captured tool output.

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// CSI sequences (colours, cursor movement) and OSC sequences (hyperlinks,
/// titles) terminated by BEL or ST.
const ANSI_PATTERN: &str = r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]";

fn ansi_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(ANSI_PATTERN).ok()).as_ref()
}

/// Remove ANSI escape sequences from `text`.
///
/// # Examples
///
/// ```
/// use qpm_action_common::ansi::strip_ansi;
///
/// assert_eq!(strip_ansi("\u{1b}[32mok\u{1b}[0m"), "ok");
/// ```
#[must_use]
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    match ansi_regex() {
        Some(regex) => regex.replace_all(text, ""),
        None => Cow::Borrowed(text),
    }
}
