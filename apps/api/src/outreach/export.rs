//! CSV export of a finished batch.
//!
//! Output starts with a UTF-8 byte-order mark so spreadsheet tools detect the encoding.

use chrono::NaiveDate;
use serde::Serialize;

use crate::outreach::errors::OutreachError;
use crate::outreach::models::{ContactResult, SequencePosition};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One exported row. Field order is the column order.
#[derive(Debug, Serialize)]
pub struct ExportRow<'a> {
    #[serde(rename = "Email")]
    pub email: &'a str,
    #[serde(rename = "First_Name")]
    pub first_name: &'a str,
    #[serde(rename = "Last_Name")]
    pub last_name: &'a str,
    #[serde(rename = "Company")]
    pub company: &'a str,
    #[serde(rename = "Email_1_Subject")]
    pub email_1_subject: &'a str,
    #[serde(rename = "Email_1_Body")]
    pub email_1_body: &'a str,
    #[serde(rename = "Email_2_Day_3_Subject")]
    pub email_2_subject: &'a str,
    #[serde(rename = "Email_2_Day_3_Body")]
    pub email_2_body: &'a str,
    #[serde(rename = "Email_3_Day_7_Subject")]
    pub email_3_subject: &'a str,
    #[serde(rename = "Email_3_Day_7_Body")]
    pub email_3_body: &'a str,
    #[serde(rename = "Email_4_Day_10_Subject")]
    pub email_4_subject: &'a str,
    #[serde(rename = "Email_4_Day_10_Body")]
    pub email_4_body: &'a str,
    #[serde(rename = "LinkedIn_Message")]
    pub linkedin_message: &'a str,
    #[serde(rename = "Call_Script")]
    pub call_script: &'a str,
}

pub const EXPORT_HEADERS: [&str; 14] = [
    "Email",
    "First_Name",
    "Last_Name",
    "Company",
    "Email_1_Subject",
    "Email_1_Body",
    "Email_2_Day_3_Subject",
    "Email_2_Day_3_Body",
    "Email_3_Day_7_Subject",
    "Email_3_Day_7_Body",
    "Email_4_Day_10_Subject",
    "Email_4_Day_10_Body",
    "LinkedIn_Message",
    "Call_Script",
];

impl<'a> From<&'a ContactResult> for ExportRow<'a> {
    fn from(result: &'a ContactResult) -> Self {
        let initial = result.email(SequencePosition::Initial);
        let day3 = result.email(SequencePosition::FollowUpDay3);
        let day7 = result.email(SequencePosition::FollowUpDay7);
        let day10 = result.email(SequencePosition::BreakupDay10);
        Self {
            email: &result.contact.email,
            first_name: &result.contact.first_name,
            last_name: &result.contact.last_name,
            company: &result.contact.company,
            email_1_subject: &initial.subject,
            email_1_body: &initial.body,
            email_2_subject: &day3.subject,
            email_2_body: &day3.body,
            email_3_subject: &day7.subject,
            email_3_body: &day7.body,
            email_4_subject: &day10.subject,
            email_4_body: &day10.body,
            linkedin_message: &result.linkedin_message,
            call_script: &result.call_script,
        }
    }
}

/// Serializes results to BOM-prefixed CSV. The header row is always written.
pub fn to_csv(results: &[ContactResult]) -> Result<Vec<u8>, OutreachError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(UTF8_BOM.to_vec());

    writer
        .write_record(EXPORT_HEADERS)
        .map_err(|e| OutreachError::Export(e.to_string()))?;

    for result in results {
        writer
            .serialize(ExportRow::from(result))
            .map_err(|e| OutreachError::Export(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| OutreachError::Export(e.to_string()))
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("Outreach_{}.csv", date.format("%Y%m%d"))
}
