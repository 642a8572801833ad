//! CLI output formatting.
//!
//! Every command builds one output struct implementing [`CommandOutput`];
//! the global `--json` flag picks the rendering.

use serde::Serialize;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    let rendered = if json_mode {
        serde_json::to_string_pretty(&result.to_json()).unwrap_or_default()
    } else {
        result.to_human()
    };
    println!("{rendered}");
}

/// Shorten a string to at most `max_len` characters, ending in "..." when
/// cut. Counts characters, not bytes, so multibyte text never splits.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer string", 10), "a longe...");
    }

    #[test]
    fn test_truncate_tiny_limit() {
        assert_eq!(truncate("abcdef", 2), "...");
        assert_eq!(truncate("ab", 2), "ab");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("日本語のエラーメッセージ", 6), "日本語...");
    }
}
