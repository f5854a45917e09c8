//! Batch runner — drives the contact pipeline over the leading `limit` contacts.
//!
//! One contact is finished before the next starts. A failed contact is recorded
//! and skipped; it never aborts the batch. Cancellation is checked once per
//! contact boundary.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::outreach::errors::OutreachError;
use crate::outreach::models::{
    BatchResult, Contact, ContactFailure, ContactResult, SenderProfile,
};
use crate::outreach::pipeline::ContactPipeline;

/// Per-contact outcome: a full result or a tagged failure.
pub type ContactOutcome = Result<ContactResult, ContactFailure>;

/// Receives progress events from a running batch.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn contact_started(&self, index: usize, total: usize, contact: &Contact);
    /// `progress` is `(index + 1) / total`.
    async fn contact_succeeded(&self, index: usize, total: usize, progress: f32);
    async fn contact_failed(&self, index: usize, total: usize, failure: &ContactFailure);
}

/// Reports progress through `tracing` only.
pub struct LogProgress;

#[async_trait]
impl ProgressReporter for LogProgress {
    async fn contact_started(&self, index: usize, total: usize, contact: &Contact) {
        info!(
            "Processing {}/{}: {} @ {}",
            index + 1,
            total,
            contact.first_name,
            contact.company
        );
    }

    async fn contact_succeeded(&self, index: usize, total: usize, progress: f32) {
        info!(
            "Contact {}/{} complete ({:.0}%)",
            index + 1,
            total,
            progress * 100.0
        );
    }

    async fn contact_failed(&self, _index: usize, _total: usize, failure: &ContactFailure) {
        error!("Error processing {}: {}", failure.first_name, failure.message);
    }
}

pub struct BatchRunner {
    pipeline: ContactPipeline,
    /// Hard cap on `limit`, independent of how many contacts were uploaded.
    max_contacts: usize,
}

impl BatchRunner {
    pub fn new(pipeline: ContactPipeline, max_contacts: usize) -> Self {
        Self {
            pipeline,
            max_contacts,
        }
    }

    /// Processes `contacts[..limit]` in order.
    ///
    /// Fails only on an invalid `limit`, before any model call is made.
    pub async fn run(
        &self,
        contacts: &[Contact],
        sender: &SenderProfile,
        limit: usize,
        progress: &dyn ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<BatchResult, OutreachError> {
        validate_limit(limit, contacts.len(), self.max_contacts)?;

        let mut batch = BatchResult::default();

        for (index, contact) in contacts.iter().take(limit).enumerate() {
            if cancel.is_cancelled() {
                info!("Batch cancelled after {} of {} contacts", index, limit);
                batch.cancelled = true;
                break;
            }

            progress.contact_started(index, limit, contact).await;
            batch.attempted += 1;

            let outcome: ContactOutcome = self
                .pipeline
                .run(contact, sender)
                .await
                .map_err(|e| failure_for(index, contact, &e));

            match outcome {
                Ok(result) => {
                    batch.results.push(result);
                    progress
                        .contact_succeeded(index, limit, progress_fraction(index, limit))
                        .await;
                }
                Err(failure) => {
                    progress.contact_failed(index, limit, &failure).await;
                    batch.failures.push(failure);
                }
            }
        }

        info!("{}", batch.summary());
        Ok(batch)
    }
}

/// `1 <= limit <= min(available, max_contacts)`; never silently clamped.
pub fn validate_limit(
    limit: usize,
    available: usize,
    max_contacts: usize,
) -> Result<(), OutreachError> {
    if limit == 0 {
        return Err(OutreachError::InputValidation(
            "Number of contacts to process must be at least 1".to_string(),
        ));
    }
    if limit > available {
        return Err(OutreachError::InputValidation(format!(
            "Requested {limit} contacts but only {available} are available"
        )));
    }
    if limit > max_contacts {
        return Err(OutreachError::InputValidation(format!(
            "Requested {limit} contacts but at most {max_contacts} can be processed per batch"
        )));
    }
    Ok(())
}

pub fn progress_fraction(index: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (index + 1) as f32 / total as f32
}

fn failure_for(index: usize, contact: &Contact, error: &OutreachError) -> ContactFailure {
    ContactFailure {
        index,
        email: contact.email.clone(),
        first_name: contact.first_name.clone(),
        company: contact.company.clone(),
        message: error.to_string(),
    }
}
