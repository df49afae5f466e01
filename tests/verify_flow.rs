#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use membro::biometric::{
    ActionKind, BiometricMatcher, Decision, DeviceType, LockoutPolicy, LockoutState, LoginOutcome,
    MatchOutcome, Member, MemoryAuditSink, MemoryIdentityStore, Modality, RegisterOutcome,
    RegistrationDetails, RequestContext, SecurityLevel, ThresholdMatcher, VerificationInput,
    VerificationRequest, VerifyService, ViolationCode,
};
use uuid::Uuid;

#[tokio::test]
async fn test_member_onboarding_then_login() -> Result<()> {
    let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
    let context = mobile_context(now);
    let store = Arc::new(MemoryIdentityStore::new());
    let service = service_with(store.clone(), Arc::new(ThresholdMatcher), 5);

    // 1. A valid application with an enrollment payload is accepted and the
    //    identifiers come back normalized.
    let details = RegistrationDetails {
        email: "Ana.Pereira@Example.com".to_string(),
        cpf: "529.982.247-25".to_string(),
        phone: Some("+5511988887777".to_string()),
        birth_date: chrono::NaiveDate::from_ymd_opt(1990, 5, 10).unwrap(),
        admission_date: Some(chrono::NaiveDate::from_ymd_opt(2015, 3, 1).unwrap()),
    };
    let enrollment = VerificationInput::new("B".repeat(200), Modality::Face);
    match service
        .register(details, Some(enrollment), &context)
        .await?
    {
        RegisterOutcome::Accepted(normalized) => {
            assert_eq!(normalized.email, "ana.pereira@example.com");
            assert_eq!(normalized.cpf, "52998224725");
        }
        RegisterOutcome::Rejected(violations) => panic!("expected acceptance, got {violations:?}"),
    }

    // 2. Once enrolled, the member logs in with the normalized email. The
    //    stand-in matcher reports confidence at the face default threshold.
    let member_id = Uuid::new_v4();
    store
        .seed(Member {
            id: member_id,
            email: "ana.pereira@example.com".to_string(),
            cpf: Some("52998224725".to_string()),
            phone: Some("+5511988887777".to_string()),
            lockout: LockoutState::default(),
        })
        .await;

    let mut input = VerificationInput::new("B".repeat(200), Modality::Face);
    input.email = Some("Ana.Pereira@Example.com".to_string());
    let LoginOutcome::Accepted {
        member_id: id,
        confidence,
    } = service.login(input, &context).await?
    else {
        panic!("expected login acceptance");
    };
    assert_eq!(id, member_id);
    assert!((confidence - 80.0).abs() < f32::EPSILON);

    Ok(())
}

#[tokio::test]
async fn test_lockout_window_then_recovery() -> Result<()> {
    let t0 = Utc.with_ymd_and_hms(2026, 8, 25, 9, 0, 0).unwrap();
    let store = Arc::new(MemoryIdentityStore::new());
    let audit = Arc::new(MemoryAuditSink::new());
    let rejecting = VerifyService::new(
        store.clone(),
        audit.clone(),
        Arc::new(MismatchMatcher),
        policy(3),
    );
    let accepting = VerifyService::new(
        store.clone(),
        audit.clone(),
        Arc::new(ThresholdMatcher),
        policy(3),
    );

    let member_id = Uuid::new_v4();
    store
        .seed(Member {
            id: member_id,
            email: "joao.silva@example.com".to_string(),
            cpf: None,
            phone: None,
            lockout: LockoutState::default(),
        })
        .await;

    // 1. Two mismatches burn budget without locking.
    for _ in 0..2 {
        assert!(matches!(
            rejecting
                .login(login_input("joao.silva@example.com"), &mobile_context(t0))
                .await?,
            LoginOutcome::InvalidCredentials
        ));
    }

    // 2. The third mismatch locks the account for the full window.
    let LoginOutcome::Locked {
        retry_after_seconds,
    } = rejecting
        .login(login_input("joao.silva@example.com"), &mobile_context(t0))
        .await?
    else {
        panic!("expected lock");
    };
    assert_eq!(retry_after_seconds, 30 * 60);

    // 3. Inside the window even a correct credential is refused.
    let half_way = t0 + Duration::minutes(15);
    assert!(matches!(
        accepting
            .login(
                login_input("joao.silva@example.com"),
                &mobile_context(half_way)
            )
            .await?,
        LoginOutcome::Locked { .. }
    ));

    // 4. After the window expires a successful login clears the state.
    let after = t0 + Duration::minutes(31);
    assert!(matches!(
        accepting
            .login(
                login_input("joao.silva@example.com"),
                &mobile_context(after)
            )
            .await?,
        LoginOutcome::Accepted { .. }
    ));
    assert_eq!(
        store.lockout_of(member_id).await,
        Some(LockoutState::default())
    );

    // 5. Each mismatch left exactly one audit event; the in-window refusal
    //    and the final success left none.
    assert_eq!(audit.recorded().await.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_policy_gate_reports_every_violation() -> Result<()> {
    let now = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
    let store = Arc::new(MemoryIdentityStore::new());
    let service = service_with(store.clone(), Arc::new(ThresholdMatcher), 5);

    let member_id = Uuid::new_v4();
    store
        .seed(Member {
            id: member_id,
            email: "carla.souza@example.com".to_string(),
            cpf: None,
            phone: None,
            lockout: LockoutState::default(),
        })
        .await;

    // An iris payload from a desktop, too short, with characters outside the
    // encoded alphabet, asking for a transaction from a medium-trust device.
    let mut input = VerificationInput::new("data!!".to_string(), Modality::Iris);
    input.member_id = Some(member_id);
    input.device_type = Some(DeviceType::Desktop);
    input.action = Some(ActionKind::Transaction);
    input.security_level = Some(SecurityLevel::Medium);

    let Decision::Rejected(violations) = service
        .verify(input, &RequestContext::new(now))
        .await?
    else {
        panic!("expected rejection");
    };

    let codes: Vec<_> = violations.iter().map(|violation| violation.code).collect();
    assert_eq!(
        codes,
        vec![
            ViolationCode::InvalidFormat,
            ViolationCode::InsufficientData,
            ViolationCode::IncompatibleDevice,
            ViolationCode::InsufficientSecurityLevel,
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_registration_rules_on_fixed_dates() -> Result<()> {
    let today = Utc.with_ymd_and_hms(2026, 8, 25, 12, 0, 0).unwrap();
    let context = mobile_context(today);
    let store = Arc::new(MemoryIdentityStore::new());
    let service = service_with(store.clone(), Arc::new(ThresholdMatcher), 5);

    // 1. Eighteen years old to the day is enough.
    let mut details = RegistrationDetails {
        email: "recem.maior@example.com".to_string(),
        cpf: "52998224725".to_string(),
        phone: None,
        birth_date: chrono::NaiveDate::from_ymd_opt(2008, 8, 25).unwrap(),
        admission_date: None,
    };
    assert!(matches!(
        service.register(details.clone(), None, &context).await?,
        RegisterOutcome::Accepted(_)
    ));

    // 2. One day short of eighteen is not.
    details.birth_date = chrono::NaiveDate::from_ymd_opt(2008, 8, 26).unwrap();
    let RegisterOutcome::Rejected(violations) =
        service.register(details.clone(), None, &context).await?
    else {
        panic!("expected rejection");
    };
    assert_eq!(violations[0].code, ViolationCode::AgeRequirementNotMet);

    // 3. An admission date before the sixteenth birthday is inconsistent.
    details.birth_date = chrono::NaiveDate::from_ymd_opt(1990, 5, 10).unwrap();
    details.admission_date = Some(chrono::NaiveDate::from_ymd_opt(2006, 5, 9).unwrap());
    let RegisterOutcome::Rejected(violations) =
        service.register(details.clone(), None, &context).await?
    else {
        panic!("expected rejection");
    };
    assert_eq!(violations[0].code, ViolationCode::AdmissionDateInvalid);

    // 4. A CPF failing its check digits is reported as known invalid.
    details.admission_date = None;
    details.cpf = "52998224724".to_string();
    let RegisterOutcome::Rejected(violations) =
        service.register(details.clone(), None, &context).await?
    else {
        panic!("expected rejection");
    };
    assert_eq!(violations[0].code, ViolationCode::KnownInvalid);

    // 5. Identifiers already on file are refused, case-insensitively.
    store
        .seed(Member {
            id: Uuid::new_v4(),
            email: "recem.maior@example.com".to_string(),
            cpf: None,
            phone: None,
            lockout: LockoutState::default(),
        })
        .await;
    details.cpf = "52998224725".to_string();
    details.email = "Recem.Maior@Example.com".to_string();
    let RegisterOutcome::Rejected(violations) =
        service.register(details, None, &context).await?
    else {
        panic!("expected rejection");
    };
    assert_eq!(violations[0].code, ViolationCode::AlreadyRegistered);

    Ok(())
}

struct MismatchMatcher;

#[async_trait]
impl BiometricMatcher for MismatchMatcher {
    async fn match_member(
        &self,
        _member: &Member,
        _request: &VerificationRequest,
    ) -> Result<MatchOutcome> {
        Ok(MatchOutcome {
            matched: false,
            confidence: 3.0,
        })
    }
}

fn policy(max_attempts: u32) -> LockoutPolicy {
    LockoutPolicy::default()
        .with_max_attempts(max_attempts)
        .with_lock_minutes(30)
}

fn service_with(
    store: Arc<MemoryIdentityStore>,
    matcher: Arc<dyn BiometricMatcher>,
    max_attempts: u32,
) -> VerifyService {
    VerifyService::new(
        store,
        Arc::new(MemoryAuditSink::new()),
        matcher,
        policy(max_attempts),
    )
}

fn login_input(email: &str) -> VerificationInput {
    let mut input = VerificationInput::new("A".repeat(128), Modality::Fingerprint);
    input.email = Some(email.to_string());
    input
}

fn mobile_context(now: DateTime<Utc>) -> RequestContext {
    RequestContext::new(now)
        .with_client_ip("198.51.100.7")
        .with_user_agent("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile/15E148")
}
