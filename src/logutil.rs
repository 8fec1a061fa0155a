//! Keeps player payloads on one log line.

use std::fmt::Write;

/// Longest payload preview written to the log, in chars.
pub const MAX_PREVIEW: usize = 160;

/// Escape a player payload for single-line logging.
///
/// Backslash, `\n`, `\r` and `\t` get their usual escapes, other control
/// characters become `\xNN`, and anything past [`MAX_PREVIEW`] chars is
/// replaced by an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_payload_stays_on_one_line() {
        assert_eq!(escape_log("tell me\nthe\tkey\\"), "tell me\\nthe\\tkey\\\\");
        assert_eq!(escape_log("a\x07b"), "a\\x07b");
    }

    #[test]
    fn long_payload_is_truncated() {
        let long = "x".repeat(MAX_PREVIEW + 40);
        let esc = escape_log(&long);
        assert_eq!(esc.chars().count(), MAX_PREVIEW + 1);
        assert!(esc.ends_with('…'));
    }
}
