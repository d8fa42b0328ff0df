//! Lead qualification gate
//!
//! The implicit checks (business email, allowed country) run first, then
//! the link's disqualification rules in order. The first failing check
//! decides the reason. Disqualified leads are kept for follow-up but may
//! not book.

use std::{collections::HashSet, sync::Arc};

use once_cell::sync::Lazy;
use validator::Validate;

use super::{clock::Clock, history::HistoryLog};
use crate::{
    error::AppResult,
    models::{
        booking_link::BookingLink,
        history::{HistoryEvent, HistoryKind},
        lead::{LeadSubmission, NewLead, QualificationResult},
        rule::FormResponses,
    },
    repository::SchedulingStore,
    scheduling::rules::first_match,
};

/// Webmail domains refused when a link requires a business address
static FREE_EMAIL_DOMAINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "gmail.com",
        "googlemail.com",
        "yahoo.com",
        "yahoo.fr",
        "hotmail.com",
        "hotmail.fr",
        "outlook.com",
        "live.com",
        "msn.com",
        "aol.com",
        "icloud.com",
        "me.com",
        "mail.com",
        "gmx.com",
        "gmx.de",
        "protonmail.com",
        "proton.me",
        "yandex.com",
        "zoho.com",
        "orange.fr",
        "free.fr",
        "laposte.net",
    ]
    .into_iter()
    .collect()
});

pub fn is_business_email(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((_, domain)) => !FREE_EMAIL_DOMAINS.contains(domain.trim().to_lowercase().as_str()),
        None => false,
    }
}

/// Reason the lead is disqualified, or `None` when it qualifies
pub fn disqualification_reason(
    link: &BookingLink,
    email: &str,
    country_code: Option<&str>,
    responses: &FormResponses,
) -> Option<String> {
    let settings = &link.qualification;

    if settings.require_business_email && !is_business_email(email) {
        return Some("A business email address is required".to_string());
    }

    if !settings.allowed_country_codes.is_empty() {
        let allowed = country_code.map_or(false, |code| {
            settings
                .allowed_country_codes
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(code.trim()))
        });
        if !allowed {
            return Some("Bookings are not available in your country".to_string());
        }
    }

    first_match(&link.disqualification_rules, responses).map(|rule| rule.outcome.clone())
}

#[derive(Clone)]
pub struct QualificationService {
    store: Arc<dyn SchedulingStore>,
    history: Arc<dyn HistoryLog>,
    clock: Arc<dyn Clock>,
}

impl QualificationService {
    pub fn new(store: Arc<dyn SchedulingStore>, history: Arc<dyn HistoryLog>, clock: Arc<dyn Clock>) -> Self {
        Self { store, history, clock }
    }

    /// Qualify a form submission and persist the lead either way
    pub async fn submit_form(
        &self,
        link: &BookingLink,
        submission: LeadSubmission,
    ) -> AppResult<QualificationResult> {
        submission.validate()?;

        let reason = disqualification_reason(
            link,
            &submission.email,
            submission.country_code.as_deref(),
            &submission.form_responses,
        );

        let lead = self
            .store
            .upsert_lead(NewLead {
                booking_link_id: link.id,
                name: submission.name,
                email: submission.email,
                phone: submission.phone,
                company: submission.company,
                country_code: submission.country_code,
                form_responses: submission.form_responses,
                qualified: reason.is_none(),
                disqualification_reason: reason.clone(),
                last_booking_id: None,
            })
            .await?;

        if let Some(reason) = &reason {
            tracing::info!(link_id = %link.id, lead_id = %lead.id, reason = %reason, "lead disqualified");
            let event = HistoryEvent {
                kind: HistoryKind::LeadDisqualified,
                booking_link_id: link.id,
                booking_id: None,
                actor: Some(lead.email.clone()),
                details: serde_json::json!({ "lead_id": lead.id, "reason": reason }),
                occurred_at: self.clock.now(),
            };
            if let Err(e) = self.history.record(event).await {
                tracing::warn!("Failed to record history event: {}", e);
            }
        }

        Ok(QualificationResult {
            lead_id: lead.id,
            qualified: lead.qualified,
            disqualification_reason: lead.disqualification_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::rule::{DisqualificationRule, RuleOperator},
        repository::memory::MemoryStore,
        services::{clock::FixedClock, history::MockHistoryLog},
    };
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn submission(email: &str, country: Option<&str>, responses: FormResponses) -> LeadSubmission {
        LeadSubmission {
            name: "Grace Hopper".to_string(),
            email: email.to_string(),
            phone: None,
            company: Some("Navy".to_string()),
            country_code: country.map(str::to_string),
            form_responses: responses,
        }
    }

    fn budget_rule() -> DisqualificationRule {
        DisqualificationRule {
            question_ref: "budget".to_string(),
            operator: RuleOperator::LessThan,
            value: "1000".to_string(),
            outcome: "Budget too small".to_string(),
        }
    }

    #[test]
    fn test_business_email_detection() {
        assert!(is_business_email("grace@navy.mil"));
        assert!(!is_business_email("grace@Gmail.com"));
        assert!(!is_business_email("no-at-sign"));
    }

    #[test]
    fn test_implicit_checks_run_before_rules() {
        let mut link = BookingLink::new(Uuid::new_v4(), "demo", 30);
        link.qualification.require_business_email = true;
        link.qualification.allowed_country_codes = vec!["FR".to_string(), "DE".to_string()];
        link.disqualification_rules = vec![budget_rule()];
        let cheap: FormResponses = [("budget".to_string(), json!(10))].into_iter().collect();

        let reason = disqualification_reason(&link, "a@gmail.com", Some("FR"), &cheap);
        assert_eq!(reason.as_deref(), Some("A business email address is required"));

        let reason = disqualification_reason(&link, "a@acme.io", Some("US"), &cheap);
        assert_eq!(reason.as_deref(), Some("Bookings are not available in your country"));

        let reason = disqualification_reason(&link, "a@acme.io", None, &cheap);
        assert!(reason.is_some());

        let reason = disqualification_reason(&link, "a@acme.io", Some("fr"), &cheap);
        assert_eq!(reason.as_deref(), Some("Budget too small"));

        assert!(disqualification_reason(&link, "a@acme.io", Some("DE"), &FormResponses::new()).is_none());
    }

    #[tokio::test]
    async fn test_disqualified_lead_is_persisted_and_audited() {
        let store = Arc::new(MemoryStore::new());
        let mut history = MockHistoryLog::new();
        history
            .expect_record()
            .withf(|event| event.kind == HistoryKind::LeadDisqualified)
            .times(1)
            .returning(|_| Ok(()));
        let service = QualificationService::new(
            store.clone(),
            Arc::new(history),
            Arc::new(FixedClock::new(Utc::now())),
        );

        let mut link = BookingLink::new(Uuid::new_v4(), "demo", 30);
        link.disqualification_rules = vec![budget_rule()];
        let responses: FormResponses = [("budget".to_string(), json!("500"))].into_iter().collect();

        let result = service
            .submit_form(&link, submission("grace@navy.mil", None, responses))
            .await
            .unwrap();
        assert!(!result.qualified);
        assert_eq!(result.disqualification_reason.as_deref(), Some("Budget too small"));

        let lead = store.get_lead(result.lead_id).await.unwrap();
        assert!(!lead.qualified);
    }

    #[tokio::test]
    async fn test_history_failure_does_not_fail_submission() {
        let store = Arc::new(MemoryStore::new());
        let mut history = MockHistoryLog::new();
        history
            .expect_record()
            .returning(|_| Err(AppError::NotProvisioned("booking_history".to_string())));
        let service = QualificationService::new(
            store,
            Arc::new(history),
            Arc::new(FixedClock::new(Utc::now())),
        );

        let mut link = BookingLink::new(Uuid::new_v4(), "demo", 30);
        link.qualification.require_business_email = true;

        let result = service
            .submit_form(&link, submission("grace@yahoo.com", None, FormResponses::new()))
            .await
            .unwrap();
        assert!(!result.qualified);
    }

    #[tokio::test]
    async fn test_qualified_submission_skips_history() {
        let store = Arc::new(MemoryStore::new());
        let mut history = MockHistoryLog::new();
        history.expect_record().times(0);
        let service = QualificationService::new(
            store,
            Arc::new(history),
            Arc::new(FixedClock::new(Utc::now())),
        );
        let link = BookingLink::new(Uuid::new_v4(), "demo", 30);

        let result = service
            .submit_form(&link, submission("grace@navy.mil", Some("US"), FormResponses::new()))
            .await
            .unwrap();
        assert!(result.qualified);
        assert!(result.disqualification_reason.is_none());
    }

    #[tokio::test]
    async fn test_invalid_submission_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let service = QualificationService::new(
            store,
            Arc::new(MockHistoryLog::new()),
            Arc::new(FixedClock::new(Utc::now())),
        );
        let link = BookingLink::new(Uuid::new_v4(), "demo", 30);

        let result = service
            .submit_form(&link, submission("not-an-email", None, FormResponses::new()))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
