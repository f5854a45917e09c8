//! Contact pipeline — the six model calls that make up one contact's outreach.
//!
//! Order: email 1 → 2 → 3 → 4 → LinkedIn message → call script.
//! Calls are awaited one at a time. Any failure discards the whole contact;
//! no partial `ContactResult` ever leaves this module.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::llm_client::{LlmError, ModelClient};
use crate::outreach::errors::{GenerationStep, OutreachError};
use crate::outreach::models::{Contact, ContactResult, EmailContent, SenderProfile, SequencePosition};
use crate::outreach::parser::parse_email;
use crate::outreach::prompts::{
    build_call_script_prompt, build_email_prompt, build_networking_prompt, CALL_SCRIPT_MAX_TOKENS,
    EMAIL_MAX_TOKENS, NETWORKING_MAX_CHARS, NETWORKING_MAX_TOKENS,
};
use crate::outreach::rate_limit::RateLimiter;

pub struct ContactPipeline {
    model: Arc<dyn ModelClient>,
    rate_limiter: Arc<dyn RateLimiter>,
    call_timeout: Duration,
}

impl ContactPipeline {
    pub fn new(
        model: Arc<dyn ModelClient>,
        rate_limiter: Arc<dyn RateLimiter>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            model,
            rate_limiter,
            call_timeout,
        }
    }

    pub async fn run(
        &self,
        contact: &Contact,
        sender: &SenderProfile,
    ) -> Result<ContactResult, OutreachError> {
        let emails = [
            self.generate_email(contact, sender, SequencePosition::Initial)
                .await?,
            self.generate_email(contact, sender, SequencePosition::FollowUpDay3)
                .await?,
            self.generate_email(contact, sender, SequencePosition::FollowUpDay7)
                .await?,
            self.generate_email(contact, sender, SequencePosition::BreakupDay10)
                .await?,
        ];

        let prompt = build_networking_prompt(&contact.first_name, &contact.company, sender);
        let raw = self
            .call(GenerationStep::Networking, &prompt, NETWORKING_MAX_TOKENS)
            .await?;
        let linkedin_message = truncate_chars(&raw, NETWORKING_MAX_CHARS);
        self.rate_limiter.pause().await;

        let prompt = build_call_script_prompt(&contact.first_name, &contact.company, sender);
        let call_script = self
            .call(GenerationStep::CallScript, &prompt, CALL_SCRIPT_MAX_TOKENS)
            .await?
            .trim()
            .to_string();

        Ok(ContactResult {
            contact: contact.clone(),
            emails,
            linkedin_message,
            call_script,
        })
    }

    async fn generate_email(
        &self,
        contact: &Contact,
        sender: &SenderProfile,
        position: SequencePosition,
    ) -> Result<EmailContent, OutreachError> {
        let prompt = build_email_prompt(&contact.first_name, &contact.company, position, sender);
        let raw = self
            .call(GenerationStep::Email(position), &prompt, EMAIL_MAX_TOKENS)
            .await?;
        self.rate_limiter.pause().await;
        Ok(parse_email(&raw))
    }

    /// One model call bounded by the configured timeout.
    async fn call(
        &self,
        step: GenerationStep,
        prompt: &str,
        max_tokens: u32,
    ) -> Result<String, OutreachError> {
        debug!("Generating {step} ({max_tokens} max tokens)");

        let result = match tokio::time::timeout(
            self.call_timeout,
            self.model.complete(prompt, max_tokens),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                secs: self.call_timeout.as_secs(),
            }),
        };

        result.map_err(|source| OutreachError::ContactGeneration { step, source })
    }
}

/// Trims, then keeps at most `max` characters (not bytes).
fn truncate_chars(text: &str, max: usize) -> String {
    let truncated: String = text.trim().chars().take(max).collect();
    truncated.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::outreach::parser::FALLBACK_SUBJECT;
    use crate::outreach::rate_limit::NoDelay;
    use crate::outreach::testing::{canned_response, contact, sender, ScriptedModel};

    fn pipeline(model: Arc<ScriptedModel>) -> ContactPipeline {
        ContactPipeline::new(model, Arc::new(NoDelay), Duration::from_secs(60))
    }

    struct CountingLimiter(AtomicUsize);

    #[async_trait::async_trait]
    impl RateLimiter for CountingLimiter {
        async fn pause(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_run_makes_six_calls_in_order() {
        let model = Arc::new(ScriptedModel::well_formed());
        let result = pipeline(model.clone())
            .run(&contact("Priya", "Globex"), &sender())
            .await
            .unwrap();

        let budgets: Vec<u32> = model.calls().iter().map(|(_, t)| *t).collect();
        assert_eq!(budgets, vec![400, 400, 400, 400, 150, 600]);

        let calls = model.calls();
        assert!(calls[0].0.contains("cold email"));
        assert!(calls[1].0.contains("Day 3"));
        assert!(calls[2].0.contains("Day 7"));
        assert!(calls[3].0.contains("Day 10"));
        assert!(calls[4].0.contains("LinkedIn"));
        assert!(calls[5].0.contains("call script"));

        assert_eq!(result.contact.first_name, "Priya");
        for position in SequencePosition::ALL {
            let email = result.email(position);
            assert!(!email.subject.is_empty());
            assert!(!email.body.is_empty());
        }
        assert!(!result.linkedin_message.is_empty());
        assert!(!result.call_script.is_empty());
    }

    #[tokio::test]
    async fn test_outputs_are_trimmed() {
        let model = Arc::new(ScriptedModel::well_formed());
        let result = pipeline(model)
            .run(&contact("Priya", "Globex"), &sender())
            .await
            .unwrap();

        assert_eq!(result.linkedin_message, result.linkedin_message.trim());
        assert_eq!(result.call_script, result.call_script.trim());
    }

    #[tokio::test]
    async fn test_unformatted_email_falls_back_to_default_subject() {
        let model = Arc::new(ScriptedModel::new(|_, max_tokens| match max_tokens {
            400 => Ok("Hi Priya, just a plain note.".to_string()),
            other => Ok(canned_response(other)),
        }));
        let result = pipeline(model)
            .run(&contact("Priya", "Globex"), &sender())
            .await
            .unwrap();

        for email in &result.emails {
            assert_eq!(email.subject, FALLBACK_SUBJECT);
            assert_eq!(email.body, "Hi Priya, just a plain note.");
        }
    }

    #[tokio::test]
    async fn test_networking_message_is_bounded_to_280_chars() {
        let model = Arc::new(ScriptedModel::new(|_, max_tokens| match max_tokens {
            150 => Ok("é".repeat(1000)),
            other => Ok(canned_response(other)),
        }));
        let result = pipeline(model)
            .run(&contact("Priya", "Globex"), &sender())
            .await
            .unwrap();

        assert_eq!(result.linkedin_message.chars().count(), 280);
    }

    #[tokio::test]
    async fn test_call_script_is_not_truncated() {
        let long_script = "word ".repeat(500);
        let expected = long_script.trim().to_string();
        let model = Arc::new(ScriptedModel::new(move |_, max_tokens| match max_tokens {
            600 => Ok(long_script.clone()),
            other => Ok(canned_response(other)),
        }));
        let result = pipeline(model)
            .run(&contact("Priya", "Globex"), &sender())
            .await
            .unwrap();

        assert_eq!(result.call_script, expected);
    }

    #[tokio::test]
    async fn test_failure_mid_sequence_discards_contact() {
        let model = Arc::new(ScriptedModel::new(|prompt, max_tokens| {
            if prompt.contains("Day 7") {
                Err(LlmError::Api {
                    status: 401,
                    message: "invalid x-api-key".to_string(),
                })
            } else {
                Ok(canned_response(max_tokens))
            }
        }));
        let err = pipeline(model.clone())
            .run(&contact("Priya", "Globex"), &sender())
            .await
            .unwrap_err();

        match err {
            OutreachError::ContactGeneration { step, .. } => {
                assert_eq!(step, GenerationStep::Email(SequencePosition::FollowUpDay7));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing after the failing call is attempted.
        assert_eq!(model.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_call_script_failure_reports_step() {
        let model = Arc::new(ScriptedModel::new(|_, max_tokens| match max_tokens {
            600 => Err(LlmError::EmptyContent),
            other => Ok(canned_response(other)),
        }));
        let err = pipeline(model)
            .run(&contact("Priya", "Globex"), &sender())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OutreachError::ContactGeneration {
                step: GenerationStep::CallScript,
                source: LlmError::EmptyContent,
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_model_call_times_out() {
        let model = Arc::new(ScriptedModel::well_formed().with_delay(Duration::from_secs(120)));
        let pipeline = ContactPipeline::new(model, Arc::new(NoDelay), Duration::from_secs(30));
        let err = pipeline
            .run(&contact("Priya", "Globex"), &sender())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OutreachError::ContactGeneration {
                step: GenerationStep::Email(SequencePosition::Initial),
                source: LlmError::Timeout { secs: 30 },
            }
        ));
    }

    #[tokio::test]
    async fn test_pauses_after_emails_and_networking_only() {
        let model = Arc::new(ScriptedModel::well_formed());
        let limiter = Arc::new(CountingLimiter(AtomicUsize::new(0)));
        let pipeline = ContactPipeline::new(model, limiter.clone(), Duration::from_secs(60));
        pipeline
            .run(&contact("Priya", "Globex"), &sender())
            .await
            .unwrap();

        assert_eq!(limiter.0.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_truncate_chars_respects_multibyte_boundaries() {
        let text = format!("  {}  ", "日本".repeat(200));
        let truncated = truncate_chars(&text, 280);
        assert_eq!(truncated.chars().count(), 280);
        assert!(truncated.starts_with('日'));
    }

    #[test]
    fn test_truncate_chars_trims_trailing_space_at_cut() {
        let text = format!("{} tail", "a".repeat(279));
        assert_eq!(truncate_chars(&text, 281), "a".repeat(279) + " t");
        assert_eq!(truncate_chars(&text, 280), "a".repeat(279));
    }
}
