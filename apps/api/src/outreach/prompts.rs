//! Prompt templates for outreach generation.
//!
//! Every email prompt asks for the same text contract so the parser can split it:
//! a `SUBJECT:` line, a `---` separator line, then the body.

use crate::outreach::models::{SenderProfile, SequencePosition};

/// Marker the model is asked to put in front of the subject line.
pub const SUBJECT_MARKER: &str = "SUBJECT:";

/// Separator between the subject line and the body.
pub const SECTION_SEPARATOR: &str = "---";

/// Output format instruction appended to every email prompt.
pub const EMAIL_FORMAT_INSTRUCTION: &str = "Format: SUBJECT: [subject]\n---\n[body]";

/// Token budgets per call type.
pub const EMAIL_MAX_TOKENS: u32 = 400;
pub const NETWORKING_MAX_TOKENS: u32 = 150;
pub const CALL_SCRIPT_MAX_TOKENS: u32 = 600;

/// Hard length bound on the networking message, in characters.
pub const NETWORKING_MAX_CHARS: usize = 280;

/// Day 1 cold open. Replace: {sender_name}, {sender_title}, {sender_company},
/// {contact_name}, {company}, {calendar_link}, {word_limit}
const INITIAL_EMAIL_TEMPLATE: &str = "Write a cold email from {sender_name} ({sender_title} at {sender_company}) \
    to {contact_name} at {company}. Mention we build scalable products. Max {word_limit} words. \
    Include {calendar_link}. Sign: {sender_name}.";

/// Day 3 value-add follow-up.
const FOLLOW_UP_DAY3_TEMPLATE: &str = "Write Day 3 follow-up from {sender_name} to {contact_name} at {company}. \
    Add value, share insight. Max {word_limit} words. Sign: {sender_name}.";

/// Day 7 follow-up from a different angle.
const FOLLOW_UP_DAY7_TEMPLATE: &str = "Write Day 7 follow-up from {sender_name} to {contact_name} at {company}. \
    Different angle. Max {word_limit} words. Sign: {sender_name}.";

/// Day 10 breakup.
const BREAKUP_DAY10_TEMPLATE: &str = "Write Day 10 breakup from {sender_name} to {contact_name} at {company}. \
    Easy yes/no. Max {word_limit} words. Sign: {sender_name}.";

const NETWORKING_TEMPLATE: &str = "Write a LinkedIn connection message to {contact_name} at {company}. \
    Under 280 characters. Professional, friendly. Just the message.";

const CALL_SCRIPT_TEMPLATE: &str = "Write a call script for {contact_name} at {company} from {sender_name} \
    at {sender_company}. Include: Opener, Value Prop, Discovery, 2 Objections, Close. Max 150 words.";

/// Word limit the model is asked to respect. Not enforced on the output.
pub fn word_limit(position: SequencePosition) -> u32 {
    match position {
        SequencePosition::Initial => 75,
        SequencePosition::FollowUpDay3 => 60,
        SequencePosition::FollowUpDay7 => 65,
        SequencePosition::BreakupDay10 => 50,
    }
}

/// Builds the email prompt for one position in the sequence.
pub fn build_email_prompt(
    contact_name: &str,
    company: &str,
    position: SequencePosition,
    sender: &SenderProfile,
) -> String {
    let template = match position {
        SequencePosition::Initial => INITIAL_EMAIL_TEMPLATE,
        SequencePosition::FollowUpDay3 => FOLLOW_UP_DAY3_TEMPLATE,
        SequencePosition::FollowUpDay7 => FOLLOW_UP_DAY7_TEMPLATE,
        SequencePosition::BreakupDay10 => BREAKUP_DAY10_TEMPLATE,
    };

    let prompt = fill(template, contact_name, company, sender)
        .replace("{word_limit}", &word_limit(position).to_string());
    format!("{prompt} {EMAIL_FORMAT_INSTRUCTION}")
}

pub fn build_networking_prompt(contact_name: &str, company: &str, sender: &SenderProfile) -> String {
    fill(NETWORKING_TEMPLATE, contact_name, company, sender)
}

pub fn build_call_script_prompt(
    contact_name: &str,
    company: &str,
    sender: &SenderProfile,
) -> String {
    fill(CALL_SCRIPT_TEMPLATE, contact_name, company, sender)
}

fn fill(template: &str, contact_name: &str, company: &str, sender: &SenderProfile) -> String {
    template
        .replace("{sender_name}", &sender.name)
        .replace("{sender_title}", &sender.title)
        .replace("{sender_company}", &sender.company)
        .replace("{calendar_link}", &sender.calendar_link)
        .replace("{contact_name}", contact_name)
        .replace("{company}", company)
}
