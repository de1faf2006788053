//! Marketing-content detection.
//!
//! Requests about email/SMS marketing are routed to a model that reliably
//! answers them, and the Gemini executor steers them away from models whose
//! safety filters refuse promotional copy.

use crate::types::Message;

/// Single words that mark marketing content (plural forms also match).
const MARKETING_KEYWORDS: &[&str] = &[
    "email",
    "campaign",
    "discount",
    "newsletter",
    "promo",
    "promotion",
    "promotional",
    "coupon",
    "sale",
    "marketing",
    "klaviyo",
    "sms",
    "subscriber",
    "cta",
];

/// Multi-word phrases that mark marketing content.
const MARKETING_PHRASES: &[&str] = &[
    "subject line",
    "open rate",
    "click rate",
    "call to action",
    "black friday",
];

/// Whether `text` reads as email/SMS marketing content.
pub fn is_marketing_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    if MARKETING_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|word| {
            MARKETING_KEYWORDS.contains(&word)
                || word
                    .strip_suffix('s')
                    .is_some_and(|stem| MARKETING_KEYWORDS.contains(&stem))
        })
}

/// Whether any message in the conversation is marketing content.
pub fn is_marketing_content(messages: &[Message]) -> bool {
    messages.iter().any(|m| is_marketing_text(&m.content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_keywords() {
        assert!(is_marketing_text("Write a campaign for spring"));
        assert!(is_marketing_text("20% DISCOUNT for loyal customers"));
        assert!(is_marketing_text("Draft three emails"));
        assert!(is_marketing_text("Improve our open rate"));
    }

    #[test]
    fn ignores_substrings() {
        assert!(!is_marketing_text("wholesale pricing of lumber"));
        assert!(!is_marketing_text("Explain the borrow checker"));
    }

    #[test]
    fn scans_all_messages() {
        let messages = vec![
            Message::system("You are helpful."),
            Message::user("Summarise our newsletter"),
        ];
        assert!(is_marketing_content(&messages));
    }
}
