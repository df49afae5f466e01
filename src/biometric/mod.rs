//! Biometric credential verification workflow.
//!
//! Everything that decides whether a member-facing request may proceed lives
//! here: the credential normalizer, the threshold and device policy, CPF
//! validation, registration rules, the login lockout state machine, and the
//! orchestrator that composes them.
//!
//! ## Collaborators
//!
//! Persistence and template matching stay behind traits. [`IdentityStore`]
//! resolves active members and applies lockout transitions atomically,
//! [`AuditSink`] records every rejected attempt, and [`BiometricMatcher`]
//! wraps the external matching engine. Each comes with a Postgres or logging
//! implementation plus an in-memory one for tests and local runs.
//!
//! ## Decisions, not errors
//!
//! Rejections, lockouts, and unknown identities are ordinary outcome values.
//! `Err` from any operation means infrastructure trouble (database, sink) and
//! maps to a 500 at the surface.

pub mod audit;
pub mod cpf;
pub mod lockout;
pub mod normalize;
pub mod policy;
pub mod registration;
pub mod request;
pub mod service;
pub mod store;
pub mod violations;

pub use audit::{AuditSink, FailedAttempt, MemoryAuditSink, PgAuditSink, TracingAuditSink};
pub use lockout::{LockoutPolicy, LockoutState};
pub use registration::RegistrationDetails;
pub use request::{
    ActionKind, DeviceInfo, DeviceType, Modality, RequestContext, SecurityLevel, VerificationInput,
    VerificationRequest,
};
pub use service::{
    BiometricMatcher, Decision, LoginOutcome, MatchOutcome, RegisterOutcome, ThresholdMatcher,
    VerifyService,
};
pub use store::{IdentityStore, Member, MemoryIdentityStore, PgIdentityStore};
pub use violations::{Violation, ViolationCode};
