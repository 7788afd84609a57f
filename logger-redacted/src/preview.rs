// Short transcript excerpts for log events
use crate::config::LoggerConfig;
use crate::redactor::PiiRedactor;

const ELLIPSIS: &str = "...";

/// Produces the redacted excerpts services log in place of full text
#[derive(Debug, Clone)]
pub struct TextPreview {
    redactor: PiiRedactor,
    max_chars: usize,
}

impl TextPreview {
    pub fn new(redactor: PiiRedactor, max_chars: usize) -> Self {
        Self { redactor, max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Whitespace-collapsed, redacted excerpt of at most `max_chars`
    /// characters (plus an ellipsis when cut).
    pub fn excerpt(&self, text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let redacted = self.redactor.redact(&collapsed);

        match redacted.char_indices().nth(self.max_chars) {
            Some((cut, _)) => format!("{}{}", redacted.get(..cut).unwrap_or_default(), ELLIPSIS),
            None => redacted,
        }
    }
}

impl Default for TextPreview {
    fn default() -> Self {
        LoggerConfig::default().previewer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redactor::RedactionConfig;

    fn masked(max_chars: usize) -> TextPreview {
        TextPreview::new(PiiRedactor::default(), max_chars)
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let text = "പനി ".repeat(20);
        assert_eq!(masked(5).excerpt(&text), format!("പനി പ{}", ELLIPSIS));
    }

    #[test]
    fn excerpt_redacts_and_collapses_whitespace() {
        let short = masked(200).excerpt("call\n\n me   on 555-123-4567");
        assert!(short.starts_with("call me on PHONE["));
    }

    #[test]
    fn disabled_redactor_keeps_identifiers() {
        let preview = TextPreview::new(PiiRedactor::new(RedactionConfig::disabled()), 200);
        assert_eq!(preview.excerpt("call 555-123-4567"), "call 555-123-4567");
    }

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(masked(10).excerpt("  fever  "), "fever");
    }
}
