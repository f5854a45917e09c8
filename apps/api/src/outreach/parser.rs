//! Response parser — splits free-form model output into subject and body.
//!
//! Never fails. Missing markers degrade to a fallback subject and the raw text as body.

use crate::outreach::models::EmailContent;
use crate::outreach::prompts::{SECTION_SEPARATOR, SUBJECT_MARKER};

/// Subject used when the model omits the `SUBJECT:` line.
pub const FALLBACK_SUBJECT: &str = "Quick question";

pub fn parse_email(raw: &str) -> EmailContent {
    let subject = raw
        .split('\n')
        .find(|line| starts_with_marker(line))
        .and_then(|line| line.split_once(':'))
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_else(|| FALLBACK_SUBJECT.to_string());

    // Only the segment between the first and second separator is the body.
    let body = match raw.split(SECTION_SEPARATOR).nth(1) {
        Some(segment) => segment.trim(),
        None => raw,
    };

    // Some models repeat the subject line inside the body segment.
    let body = body
        .replace(&format!("{SUBJECT_MARKER} {subject}"), "")
        .trim()
        .to_string();

    EmailContent { subject, body }
}

fn starts_with_marker(line: &str) -> bool {
    line.get(..SUBJECT_MARKER.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(SUBJECT_MARKER))
}
