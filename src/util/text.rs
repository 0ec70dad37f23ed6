use std::borrow::Cow;

use html_escape::decode_html_entities;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Truncates a string to fit within `max_width` terminal columns.
///
/// Appends "..." when text is cut. Widths of 3 or less get as many
/// characters as fit, without an ellipsis. Returns `Cow::Borrowed` when the
/// string already fits.
///
/// # Examples
///
/// ```
/// use homedeck::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let budget = if max_width <= ELLIPSIS_WIDTH {
        max_width
    } else {
        max_width - ELLIPSIS_WIDTH
    };

    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    if max_width <= ELLIPSIS_WIDTH {
        Cow::Owned(s[..end].to_string())
    } else {
        Cow::Owned(format!("{}{}", &s[..end], ELLIPSIS))
    }
}

fn is_unsafe_byte(b: u8) -> bool {
    b == 0x1b || b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}

/// Strip terminal control characters and ANSI escape sequences.
///
/// Feed titles and track names come from third parties and end up on the
/// terminal, so CSI (`ESC [ ... final`) and OSC (`ESC ] ... BEL|ST`) sequences
/// are dropped along with C0 controls other than tab, newline and CR.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    if !bytes.iter().any(|&b| is_unsafe_byte(b)) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            0x1b if bytes.get(i + 1) == Some(&b'[') => {
                i += 2;
                while i < bytes.len() {
                    let c = bytes[i];
                    i += 1;
                    if (0x40..=0x7e).contains(&c) {
                        break;
                    }
                }
            }
            0x1b if bytes.get(i + 1) == Some(&b']') => {
                i += 2;
                while i < bytes.len() {
                    if bytes[i] == 0x07 {
                        i += 1;
                        break;
                    }
                    if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b if is_unsafe_byte(b) => i += 1,
            _ => {
                let start = i;
                while i < bytes.len() && !is_unsafe_byte(bytes[i]) {
                    i += 1;
                }
                // Only ASCII bytes stop the run, so the slice is on a char boundary.
                out.push_str(&s[start..i]);
            }
        }
    }

    Cow::Owned(out)
}

/// Convert an HTML fragment to plain text.
///
/// Tags are removed, entities are decoded, and `<script>`/`<style>` bodies
/// are dropped. Surrounding whitespace is trimmed.
///
/// ```
/// use homedeck::util::strip_html;
///
/// assert_eq!(strip_html("<p>hi</p>"), "hi");
/// assert_eq!(strip_html("Fish &amp; <b>Chips</b>"), "Fish & Chips");
/// ```
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        let after = &rest[open..];
        let Some(close) = after.find('>') else {
            // Unterminated tag: keep the remainder as text.
            text.push_str(after);
            rest = "";
            break;
        };

        let tag = after[1..close].trim_start().to_ascii_lowercase();
        rest = &after[close + 1..];

        for raw in ["script", "style"] {
            if tag.starts_with(raw) {
                let end_tag = format!("</{}", raw);
                rest = match rest.to_ascii_lowercase().find(&end_tag) {
                    Some(pos) => {
                        let tail = &rest[pos..];
                        tail.find('>').map_or("", |gt| &tail[gt + 1..])
                    }
                    None => "",
                };
            }
        }
    }
    text.push_str(rest);

    decode_html_entities(text.trim()).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncation() {
        assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
        assert_eq!(truncate_to_width("Hello", 5), "Hello");
        assert_eq!(truncate_to_width("Test", 0), "");
        assert_eq!(truncate_to_width("Test", 3), "Tes");
    }

    #[test]
    fn test_cjk_truncation() {
        // 2 columns per character
        assert_eq!(truncate_to_width("你好世界", 7), "你好...");
    }

    #[test]
    fn test_strip_clean_text_returns_borrowed() {
        assert!(matches!(strip_control_chars("plain title"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_ansi_and_osc() {
        assert_eq!(strip_control_chars("\x1b[31mred\x1b[0m"), "red");
        assert_eq!(strip_control_chars("a\x1b]0;title\x07b"), "ab");
        assert_eq!(strip_control_chars("a\x1b]8;;x\x1b\\b"), "ab");
        assert_eq!(strip_control_chars("tab\tok\x00"), "tab\tok");
    }

    #[test]
    fn test_strip_html_basic() {
        assert_eq!(strip_html("<p>hi</p>"), "hi");
        assert_eq!(strip_html("<div><a href=\"x\">link</a> text</div>"), "link text");
    }

    #[test]
    fn test_strip_html_entities() {
        assert_eq!(strip_html("&lt;tag&gt; &quot;q&quot;"), "<tag> \"q\"");
        assert_eq!(strip_html("caf&#233;"), "café");
    }

    #[test]
    fn test_strip_html_drops_script_and_style() {
        assert_eq!(
            strip_html("<style>p{color:red}</style>Body<script>alert(1)</script> end"),
            "Body end"
        );
    }

    #[test]
    fn test_strip_html_unterminated_tag() {
        assert_eq!(strip_html("a < b"), "a < b");
    }

    #[test]
    fn test_strip_html_empty() {
        assert_eq!(strip_html(""), "");
    }
}
