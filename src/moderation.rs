use crate::commands::render_user;

/// Banned-word detection. Matching is a case-insensitive substring test on the
/// raw text, not on tokens, so "scammer" trips "scam".
#[derive(Debug, Clone)]
pub struct ModerationFilter {
    banned: Vec<String>,
    warning_template: String,
}

impl ModerationFilter {
    pub fn new(banned_words: &[String], warning_template: impl Into<String>) -> Self {
        Self {
            banned: banned_words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            warning_template: warning_template.into(),
        }
    }

    /// The first banned word the text contains, if any
    pub fn offending_word(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.banned
            .iter()
            .find(|w| lowered.contains(w.as_str()))
            .map(String::as_str)
    }

    pub fn warning_for(&self, display_name: &str) -> String {
        render_user(&self.warning_template, display_name)
    }

    /// Content relayed to the webhook when a message is moderated
    pub fn notice_for(&self, display_name: &str, text: &str) -> String {
        format!("Warned {} for message: \"{}\"", display_name, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(words: &[&str]) -> ModerationFilter {
        let words: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        ModerationFilter::new(&words, "@{user}, watch it.")
    }

    #[test]
    fn test_case_insensitive_substring() {
        let f = filter(&["Scam"]);
        assert!(f.offending_word("this is a SCAM").is_some());
        assert!(f.offending_word("total scammer here").is_some());
        assert!(f.offending_word("scarcely").is_none());
        assert_eq!(f.offending_word("ScAm alert"), Some("scam"));
    }

    #[test]
    fn test_blank_words_ignored() {
        let f = filter(&["", "   "]);
        assert!(f.offending_word("anything at all").is_none());
        assert!(f.offending_word("").is_none());
    }

    #[test]
    fn test_empty_list_never_matches() {
        assert!(filter(&[]).offending_word("hello").is_none());
    }

    #[test]
    fn test_first_listed_word_reported() {
        let f = filter(&["spoiler", "leak"]);
        assert_eq!(f.offending_word("leak of the spoiler"), Some("spoiler"));
    }

    #[test]
    fn test_warning_and_notice() {
        let f = filter(&["spoiler"]);
        assert_eq!(f.warning_for("bob"), "@bob, watch it.");
        assert_eq!(
            f.notice_for("bob", "big spoiler ahead"),
            "Warned bob for message: \"big spoiler ahead\""
        );
    }

    #[test]
    fn test_warning_expands_only_user() {
        let words = vec!["spoiler".to_string()];
        let f = ModerationFilter::new(&words, "@{user}: no {args} here ({uptime})");
        assert_eq!(f.warning_for("{uptime}"), "@{uptime}: no {args} here ({uptime})");
    }
}
