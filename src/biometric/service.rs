//! Verification orchestrator: one decision per inbound request.
//!
//! The service wires the normalizer, the policy checks, the registration
//! rules, the lockout state machine, and the collaborators (identity store,
//! audit sink, biometric matcher) into the accept/reject decisions the API
//! layer exposes. All of its outcomes are values, not errors; `Err` means an
//! infrastructure failure, never a rejected request.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::audit::{AuditSink, FailedAttempt};
use super::cpf;
use super::lockout::LockoutPolicy;
use super::normalize;
use super::policy;
use super::registration::{self, RegistrationDetails};
use super::request::{ActionKind, RequestContext, VerificationInput, VerificationRequest};
use super::store::{IdentityStore, Member};
use super::violations::Violation;

/// Result of comparing a payload against a member's enrolled template.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Reported match confidence on the same 0..=100 scale as the thresholds.
    pub confidence: f32,
}

/// External biometric matching engine. The workflow only gates shape and
/// policy; actual template comparison happens behind this seam.
#[async_trait]
pub trait BiometricMatcher: Send + Sync {
    async fn match_member(
        &self,
        member: &Member,
        request: &VerificationRequest,
    ) -> Result<MatchOutcome>;
}

/// Stand-in matcher that accepts at exactly the declared confidence
/// threshold, for deployments where the real engine is not wired yet.
#[derive(Clone, Debug)]
pub struct ThresholdMatcher;

#[async_trait]
impl BiometricMatcher for ThresholdMatcher {
    async fn match_member(
        &self,
        _member: &Member,
        request: &VerificationRequest,
    ) -> Result<MatchOutcome> {
        Ok(MatchOutcome {
            matched: true,
            confidence: f32::from(request.confidence_threshold),
        })
    }
}

/// Decision for a verification or transaction-authorization request.
#[derive(Debug)]
pub enum Decision {
    Accepted { member_id: Uuid },
    Rejected(Vec<Violation>),
    IdentityNotFound,
}

/// Decision for a biometric login.
#[derive(Debug)]
pub enum LoginOutcome {
    Accepted { member_id: Uuid, confidence: f32 },
    /// The account is in a lockout window; retry after the given seconds.
    Locked { retry_after_seconds: i64 },
    /// The payload passed policy but did not match the enrolled template.
    InvalidCredentials,
    Rejected(Vec<Violation>),
    IdentityNotFound,
}

/// Decision for a membership application.
#[derive(Debug)]
pub enum RegisterOutcome {
    /// Application passed every rule; carries the normalized identifiers.
    Accepted(RegistrationDetails),
    Rejected(Vec<Violation>),
}

pub struct VerifyService {
    store: Arc<dyn IdentityStore>,
    audit: Arc<dyn AuditSink>,
    matcher: Arc<dyn BiometricMatcher>,
    lockout: LockoutPolicy,
}

impl VerifyService {
    #[must_use]
    pub fn new(
        store: Arc<dyn IdentityStore>,
        audit: Arc<dyn AuditSink>,
        matcher: Arc<dyn BiometricMatcher>,
        lockout: LockoutPolicy,
    ) -> Self {
        Self {
            store,
            audit,
            matcher,
            lockout,
        }
    }

    #[must_use]
    pub const fn lockout_policy(&self) -> &LockoutPolicy {
        &self.lockout
    }

    /// Gates a verification or transaction request.
    ///
    /// Logins go through [`login`](Self::login) instead, which adds the
    /// lockout rules and the matcher gate.
    pub async fn verify(
        &self,
        input: VerificationInput,
        context: &RequestContext,
    ) -> Result<Decision> {
        let request = normalize::normalize(input, context);

        let Some(member) = self.resolve_member(&request).await? else {
            return Ok(Decision::IdentityNotFound);
        };

        let violations = policy::evaluate(&request);
        if !violations.is_empty() {
            self.audit_failure(
                request.action,
                Some(&request),
                Some(member.id),
                request.email.as_deref(),
                context,
                &violations,
            )
            .await?;
            return Ok(Decision::Rejected(violations));
        }

        Ok(Decision::Accepted {
            member_id: member.id,
        })
    }

    /// Runs a biometric login end to end.
    ///
    /// Shape violations answer without touching the attempt counter; only a
    /// payload that passes policy but fails the matcher consumes budget.
    pub async fn login(
        &self,
        mut input: VerificationInput,
        context: &RequestContext,
    ) -> Result<LoginOutcome> {
        input.action = Some(ActionKind::Login);
        let request = normalize::normalize(input, context);

        let Some(member) = self.resolve_member(&request).await? else {
            return Ok(LoginOutcome::IdentityNotFound);
        };

        // Locked accounts answer before any credential work happens.
        if member.lockout.is_locked(context.now) {
            let retry_after_seconds = member.lockout.remaining_seconds(context.now).unwrap_or(0);
            return Ok(LoginOutcome::Locked {
                retry_after_seconds,
            });
        }

        let violations = policy::evaluate(&request);
        if !violations.is_empty() {
            self.audit_failure(
                ActionKind::Login,
                Some(&request),
                Some(member.id),
                request.email.as_deref(),
                context,
                &violations,
            )
            .await?;
            return Ok(LoginOutcome::Rejected(violations));
        }

        let outcome = self.matcher.match_member(&member, &request).await?;
        if !outcome.matched || outcome.confidence < f32::from(request.confidence_threshold) {
            let state = self
                .store
                .record_failed_login(member.id, &self.lockout, context.now)
                .await?;
            self.audit_failure(
                ActionKind::Login,
                Some(&request),
                Some(member.id),
                request.email.as_deref(),
                context,
                &[],
            )
            .await?;
            info!(
                member_id = %member.id,
                attempts = state.login_attempts,
                "biometric login did not match"
            );

            if state.is_locked(context.now) {
                let retry_after_seconds = state.remaining_seconds(context.now).unwrap_or(0);
                return Ok(LoginOutcome::Locked {
                    retry_after_seconds,
                });
            }
            return Ok(LoginOutcome::InvalidCredentials);
        }

        self.store.reset_login_attempts(member.id).await?;

        Ok(LoginOutcome::Accepted {
            member_id: member.id,
            confidence: outcome.confidence,
        })
    }

    /// Validates a membership application, optionally with an enrollment
    /// payload that must satisfy the same biometric policy.
    pub async fn register(
        &self,
        details: RegistrationDetails,
        biometric: Option<VerificationInput>,
        context: &RequestContext,
    ) -> Result<RegisterOutcome> {
        let details = RegistrationDetails {
            email: normalize::normalize_email(&details.email),
            cpf: cpf::strip_to_digits(&details.cpf),
            ..details
        };

        let mut violations =
            registration::evaluate(self.store.as_ref(), &details, context.now.date_naive())
                .await?;

        let enrollment = biometric.map(|mut input| {
            input.action = Some(ActionKind::Registration);
            normalize::normalize(input, context)
        });
        if let Some(request) = &enrollment {
            violations.extend(policy::evaluate(request));
        }

        if violations.is_empty() {
            return Ok(RegisterOutcome::Accepted(details));
        }

        self.audit_failure(
            ActionKind::Registration,
            enrollment.as_ref(),
            None,
            Some(&details.email),
            context,
            &violations,
        )
        .await?;

        Ok(RegisterOutcome::Rejected(violations))
    }

    /// Member id wins over email; no identity reference resolves to nothing.
    async fn resolve_member(&self, request: &VerificationRequest) -> Result<Option<Member>> {
        if let Some(member_id) = request.member_id {
            return self.store.find_active_by_id(member_id).await;
        }
        if let Some(email) = request.email.as_deref() {
            return self.store.find_active_by_email(email).await;
        }
        Ok(None)
    }

    async fn audit_failure(
        &self,
        action: ActionKind,
        request: Option<&VerificationRequest>,
        member_id: Option<Uuid>,
        email: Option<&str>,
        context: &RequestContext,
        violations: &[Violation],
    ) -> Result<()> {
        let attempt = FailedAttempt {
            action,
            modality: request.map(|request| request.modality),
            device_type: request.map(|request| request.device_info.device_type),
            member_id,
            email: email.map(str::to_string),
            client_ip: context.client_ip.clone(),
            user_agent: context.user_agent.clone(),
            occurred_at: context.now,
            violations: violations.to_vec(),
        };
        self.audit.record_failed_attempt(&attempt).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::super::audit::MemoryAuditSink;
    use super::super::lockout::LockoutState;
    use super::super::request::{DeviceType, Modality, SecurityLevel};
    use super::super::store::MemoryIdentityStore;
    use super::super::violations::ViolationCode;
    use super::*;

    struct RejectingMatcher;

    #[async_trait]
    impl BiometricMatcher for RejectingMatcher {
        async fn match_member(
            &self,
            _member: &Member,
            _request: &VerificationRequest,
        ) -> Result<MatchOutcome> {
            Ok(MatchOutcome {
                matched: false,
                confidence: 12.0,
            })
        }
    }

    struct Harness {
        store: Arc<MemoryIdentityStore>,
        audit: Arc<MemoryAuditSink>,
        service: VerifyService,
    }

    fn harness(matcher: Arc<dyn BiometricMatcher>, max_attempts: u32) -> Harness {
        let store = Arc::new(MemoryIdentityStore::new());
        let audit = Arc::new(MemoryAuditSink::new());
        let service = VerifyService::new(
            store.clone(),
            audit.clone(),
            matcher,
            LockoutPolicy::default()
                .with_max_attempts(max_attempts)
                .with_lock_minutes(30),
        );
        Harness {
            store,
            audit,
            service,
        }
    }

    fn member(email: &str) -> Member {
        Member {
            id: Uuid::new_v4(),
            email: email.to_string(),
            cpf: Some("52998224725".to_string()),
            phone: None,
            lockout: LockoutState::default(),
        }
    }

    fn login_input(email: &str) -> VerificationInput {
        let mut input = VerificationInput::new("A".repeat(128), Modality::Fingerprint);
        input.email = Some(email.to_string());
        input
    }

    fn context() -> RequestContext {
        RequestContext::new(Utc::now())
            .with_client_ip("203.0.113.9")
            .with_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148")
    }

    #[tokio::test]
    async fn test_verify_accepts_clean_request_for_known_member() -> Result<()> {
        let harness = harness(Arc::new(ThresholdMatcher), 5);
        let member = member("maria@example.com");
        let member_id = member.id;
        harness.store.seed(member).await;

        let mut input = VerificationInput::new("A".repeat(128), Modality::Fingerprint);
        input.member_id = Some(member_id);

        match harness.service.verify(input, &context()).await? {
            Decision::Accepted { member_id: id } => assert_eq!(id, member_id),
            other => panic!("expected acceptance, got {other:?}"),
        }
        assert!(harness.audit.recorded().await.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_verify_unknown_identity() -> Result<()> {
        let harness = harness(Arc::new(ThresholdMatcher), 5);

        let mut input = VerificationInput::new("A".repeat(128), Modality::Fingerprint);
        input.member_id = Some(Uuid::new_v4());

        assert!(matches!(
            harness.service.verify(input, &context()).await?,
            Decision::IdentityNotFound
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_verify_rejection_is_audited() -> Result<()> {
        let harness = harness(Arc::new(ThresholdMatcher), 5);
        let member = member("maria@example.com");
        let member_id = member.id;
        harness.store.seed(member).await;

        let mut input = VerificationInput::new("A".repeat(10), Modality::Iris);
        input.member_id = Some(member_id);
        input.device_type = Some(DeviceType::Desktop);

        let Decision::Rejected(violations) = harness.service.verify(input, &context()).await?
        else {
            panic!("expected rejection");
        };
        let codes: Vec<_> = violations.iter().map(|violation| violation.code).collect();
        assert!(codes.contains(&ViolationCode::InsufficientData));
        assert!(codes.contains(&ViolationCode::IncompatibleDevice));

        let recorded = harness.audit.recorded().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].member_id, Some(member_id));
        assert_eq!(recorded[0].modality, Some(Modality::Iris));
        assert_eq!(recorded[0].violations.len(), violations.len());

        Ok(())
    }

    #[tokio::test]
    async fn test_transaction_requires_high_security_device() -> Result<()> {
        let harness = harness(Arc::new(ThresholdMatcher), 5);
        let member = member("maria@example.com");
        let member_id = member.id;
        harness.store.seed(member).await;

        let mut input = VerificationInput::new("A".repeat(128), Modality::Fingerprint);
        input.member_id = Some(member_id);
        input.action = Some(ActionKind::Transaction);
        input.security_level = Some(SecurityLevel::Medium);

        let Decision::Rejected(violations) = harness.service.verify(input, &context()).await?
        else {
            panic!("expected rejection");
        };
        assert_eq!(
            violations[0].code,
            ViolationCode::InsufficientSecurityLevel
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_login_success_resets_attempt_counter() -> Result<()> {
        let harness = harness(Arc::new(ThresholdMatcher), 5);
        let mut member = member("maria@example.com");
        member.lockout.login_attempts = 3;
        let member_id = member.id;
        harness.store.seed(member).await;

        match harness
            .service
            .login(login_input("Maria@Example.com"), &context())
            .await?
        {
            LoginOutcome::Accepted { member_id: id, .. } => assert_eq!(id, member_id),
            other => panic!("expected acceptance, got {other:?}"),
        }

        let state = harness.store.lockout_of(member_id).await;
        assert_eq!(state, Some(LockoutState::default()));

        Ok(())
    }

    #[tokio::test]
    async fn test_login_mismatches_lock_after_budget() -> Result<()> {
        let harness = harness(Arc::new(RejectingMatcher), 3);
        let member = member("maria@example.com");
        let member_id = member.id;
        harness.store.seed(member).await;

        for _ in 0..2 {
            assert!(matches!(
                harness
                    .service
                    .login(login_input("maria@example.com"), &context())
                    .await?,
                LoginOutcome::InvalidCredentials
            ));
        }

        // Third mismatch exhausts the budget and answers locked.
        let LoginOutcome::Locked {
            retry_after_seconds,
        } = harness
            .service
            .login(login_input("maria@example.com"), &context())
            .await?
        else {
            panic!("expected lock");
        };
        assert!(retry_after_seconds > 0);

        // Subsequent logins stay locked without consuming budget.
        assert!(matches!(
            harness
                .service
                .login(login_input("maria@example.com"), &context())
                .await?,
            LoginOutcome::Locked { .. }
        ));
        let state = harness.store.lockout_of(member_id).await.unwrap();
        assert_eq!(state.login_attempts, 3);

        // Every mismatch left an audit event.
        assert_eq!(harness.audit.recorded().await.len(), 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_login_shape_violations_skip_the_attempt_counter() -> Result<()> {
        let harness = harness(Arc::new(ThresholdMatcher), 3);
        let member = member("maria@example.com");
        let member_id = member.id;
        harness.store.seed(member).await;

        let mut input = VerificationInput::new("A".repeat(10), Modality::Iris);
        input.email = Some("maria@example.com".to_string());

        assert!(matches!(
            harness.service.login(input, &context()).await?,
            LoginOutcome::Rejected(_)
        ));

        let state = harness.store.lockout_of(member_id).await.unwrap();
        assert_eq!(state.login_attempts, 0);
        assert_eq!(harness.audit.recorded().await.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_login_respects_existing_lock_window() -> Result<()> {
        let harness = harness(Arc::new(ThresholdMatcher), 5);
        let mut member = member("maria@example.com");
        member.lockout.locked_until = Some(Utc::now() + Duration::minutes(10));
        harness.store.seed(member).await;

        let LoginOutcome::Locked {
            retry_after_seconds,
        } = harness
            .service
            .login(login_input("maria@example.com"), &context())
            .await?
        else {
            panic!("expected lock");
        };
        assert!(retry_after_seconds > 0 && retry_after_seconds <= 600);

        Ok(())
    }

    #[tokio::test]
    async fn test_register_underage_applicant_is_rejected_and_audited() -> Result<()> {
        let harness = harness(Arc::new(ThresholdMatcher), 5);

        let details = RegistrationDetails {
            email: "Nova.Socia@Example.com".to_string(),
            cpf: "529.982.247-25".to_string(),
            phone: Some("+5511999990000".to_string()),
            birth_date: (Utc::now() - Duration::days(17 * 365)).date_naive(),
            admission_date: None,
        };

        let RegisterOutcome::Rejected(violations) =
            harness.service.register(details, None, &context()).await?
        else {
            panic!("expected rejection");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, ViolationCode::AgeRequirementNotMet);

        let recorded = harness.audit.recorded().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].action, ActionKind::Registration);
        assert_eq!(recorded[0].modality, None);
        assert_eq!(recorded[0].email.as_deref(), Some("nova.socia@example.com"));

        Ok(())
    }

    #[tokio::test]
    async fn test_register_with_enrollment_payload_checks_policy() -> Result<()> {
        let harness = harness(Arc::new(ThresholdMatcher), 5);

        let details = RegistrationDetails {
            email: "nova.socia@example.com".to_string(),
            cpf: "52998224725".to_string(),
            phone: None,
            birth_date: (Utc::now() - Duration::days(25 * 365)).date_naive(),
            admission_date: None,
        };

        let enrollment = VerificationInput::new("A".repeat(400), Modality::Face);
        match harness
            .service
            .register(details.clone(), Some(enrollment), &context())
            .await?
        {
            RegisterOutcome::Accepted(normalized) => {
                assert_eq!(normalized.email, "nova.socia@example.com");
            }
            RegisterOutcome::Rejected(violations) => {
                panic!("expected acceptance, got {violations:?}")
            }
        }

        let short_enrollment = VerificationInput::new("A".repeat(20), Modality::Face);
        let RegisterOutcome::Rejected(violations) = harness
            .service
            .register(details, Some(short_enrollment), &context())
            .await?
        else {
            panic!("expected rejection");
        };
        assert_eq!(violations[0].code, ViolationCode::InsufficientData);

        Ok(())
    }
}
