//! Contact ingestion — CSV upload to normalized `Contact` rows.
//!
//! Columns are found by case-insensitive substring match on the header:
//! "email", "first", "last", "company". Last name is optional.

use csv::ReaderBuilder;
use tracing::{info, warn};

use crate::outreach::errors::OutreachError;
use crate::outreach::models::Contact;

const BOM: char = '\u{feff}';

/// Header positions of the contact fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub email: usize,
    pub first_name: usize,
    pub last_name: Option<usize>,
    pub company: usize,
}

pub fn detect_columns<'a, I>(headers: I) -> Result<ColumnMap, OutreachError>
where
    I: IntoIterator<Item = &'a str>,
{
    let headers: Vec<String> = headers
        .into_iter()
        .map(|h| h.trim_start_matches(BOM).to_lowercase())
        .collect();
    let find = |needle: &str| headers.iter().position(|h| h.contains(needle));

    match (find("email"), find("first"), find("company")) {
        (Some(email), Some(first_name), Some(company)) => Ok(ColumnMap {
            email,
            first_name,
            last_name: find("last"),
            company,
        }),
        _ => Err(OutreachError::InputValidation(
            "CSV must have Email, First Name, and Company columns".to_string(),
        )),
    }
}

/// Parses an uploaded CSV into contacts, in file order.
///
/// Rows missing an email, first name or company are skipped.
pub fn read_contacts(content: &[u8]) -> Result<Vec<Contact>, OutreachError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let headers = reader
        .headers()
        .map_err(|e| OutreachError::InputValidation(format!("Error loading CSV: {e}")))?
        .clone();
    let columns = detect_columns(headers.iter())?;

    let mut contacts = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable CSV row {}: {}", row + 2, e);
                continue;
            }
        };

        let field = |idx: usize| record.get(idx).unwrap_or_default().trim().to_string();

        let contact = Contact {
            email: field(columns.email),
            first_name: field(columns.first_name),
            last_name: columns.last_name.map(&field).unwrap_or_default(),
            company: field(columns.company),
        };

        if contact.email.is_empty() || contact.first_name.is_empty() || contact.company.is_empty()
        {
            warn!(
                "Skipping CSV row {}: email, first name and company are required",
                row + 2
            );
            continue;
        }

        contacts.push(contact);
    }

    if contacts.is_empty() {
        return Err(OutreachError::InputValidation(
            "CSV contains no usable contacts".to_string(),
        ));
    }

    info!("Loaded {} contacts", contacts.len());
    Ok(contacts)
}
