//! Outreach data model — contacts in, generated content out.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outreach::errors::OutreachError;

/// A normalized contact row produced by ingestion.
///
/// `email`, `first_name` and `company` are non-empty; `last_name` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub company: String,
}

/// Who the outreach is sent from. Constant for a whole batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderProfile {
    pub name: String,
    pub title: String,
    pub company: String,
    pub calendar_link: String,
}

/// Position of an email in the fixed four-step sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequencePosition {
    /// Day 1 cold open.
    Initial,
    /// Day 3 value-add follow-up.
    FollowUpDay3,
    /// Day 7 different-angle follow-up.
    FollowUpDay7,
    /// Day 10 low-pressure breakup.
    BreakupDay10,
}

impl SequencePosition {
    /// All positions, in send order.
    pub const ALL: [SequencePosition; 4] = [
        SequencePosition::Initial,
        SequencePosition::FollowUpDay3,
        SequencePosition::FollowUpDay7,
        SequencePosition::BreakupDay10,
    ];

    /// 1-based sequence number.
    pub fn number(self) -> u8 {
        match self {
            SequencePosition::Initial => 1,
            SequencePosition::FollowUpDay3 => 2,
            SequencePosition::FollowUpDay7 => 3,
            SequencePosition::BreakupDay10 => 4,
        }
    }
}

impl TryFrom<u8> for SequencePosition {
    type Error = OutreachError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SequencePosition::Initial),
            2 => Ok(SequencePosition::FollowUpDay3),
            3 => Ok(SequencePosition::FollowUpDay7),
            4 => Ok(SequencePosition::BreakupDay10),
            other => Err(OutreachError::InvalidSequencePosition(other)),
        }
    }
}

impl fmt::Display for SequencePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "email {}", self.number())
    }
}

/// Subject and body parsed out of one model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

/// Complete generated outreach for a single contact.
///
/// Only ever built once all six model calls have succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactResult {
    pub contact: Contact,
    /// Indexed by `SequencePosition::number() - 1`.
    pub emails: [EmailContent; 4],
    pub linkedin_message: String,
    pub call_script: String,
}

impl ContactResult {
    pub fn email(&self, position: SequencePosition) -> &EmailContent {
        &self.emails[usize::from(position.number() - 1)]
    }
}

/// Per-contact failure record kept alongside the successful results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactFailure {
    /// Zero-based index of the contact in the input.
    pub index: usize,
    pub email: String,
    pub first_name: String,
    pub company: String,
    pub message: String,
}

/// Outcome of one batch run. Replaces any earlier batch wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Successful contacts in processing order.
    pub results: Vec<ContactResult>,
    pub failures: Vec<ContactFailure>,
    /// Number of contacts the runner actually started on.
    pub attempted: usize,
    pub cancelled: bool,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn total_emails(&self) -> usize {
        self.results.len() * SequencePosition::ALL.len()
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Generated outreach for {} of {} contacts",
            self.succeeded(),
            self.attempted
        );
        if self.cancelled {
            summary.push_str(" (cancelled)");
        }
        summary
    }
}
