//! Request types for the verification workflow.
//!
//! [`VerificationInput`] is what the transport layer hands over: raw,
//! partially-filled fields. [`normalize`](crate::biometric::normalize::normalize)
//! turns it into a [`VerificationRequest`] with every default resolved, which
//! is the only shape the policy checks and the orchestrator accept.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Biometric capture method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Fingerprint,
    Face,
    Voice,
    Iris,
}

impl Modality {
    pub const ALL: [Self; 4] = [Self::Fingerprint, Self::Face, Self::Voice, Self::Iris];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fingerprint => "fingerprint",
            Self::Face => "face",
            Self::Voice => "voice",
            Self::Iris => "iris",
        }
    }
}

/// What the caller is trying to do with the credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Login,
    #[default]
    Verification,
    Registration,
    Transaction,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Verification => "verification",
            Self::Registration => "registration",
            Self::Transaction => "transaction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

/// Device trust tier as declared by the client platform.
///
/// The derived ordering is the policy ordering: `Low < Medium < High <
/// VeryHigh`.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl SecurityLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very_high",
        }
    }
}

/// Device facts after normalization; `sensor` is always resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_id: Option<String>,
    pub device_type: DeviceType,
    pub security_level: SecurityLevel,
    pub sensor: String,
}

/// Ambient request facts, passed explicitly rather than read from globals so
/// the workflow stays deterministic and testable.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub now: DateTime<Utc>,
}

impl RequestContext {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            client_ip: None,
            user_agent: None,
            now,
        }
    }

    #[must_use]
    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = Some(ip.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Raw verification fields as submitted, before any defaulting.
#[derive(Debug, Clone)]
pub struct VerificationInput {
    /// Identity reference for login-style calls.
    pub email: Option<String>,
    /// Identity reference for authenticated calls.
    pub member_id: Option<Uuid>,
    pub biometric_data: String,
    pub modality: Modality,
    pub action: Option<ActionKind>,
    pub cpf: Option<String>,
    pub device_id: Option<String>,
    pub device_type: Option<DeviceType>,
    pub security_level: Option<SecurityLevel>,
    pub sensor: Option<String>,
    pub quality_threshold: Option<u8>,
    pub confidence_threshold: Option<u8>,
}

impl VerificationInput {
    /// A bare submission carrying only the payload and modality.
    #[must_use]
    pub fn new(biometric_data: impl Into<String>, modality: Modality) -> Self {
        Self {
            email: None,
            member_id: None,
            biometric_data: biometric_data.into(),
            modality,
            action: None,
            cpf: None,
            device_id: None,
            device_type: None,
            security_level: None,
            sensor: None,
            quality_threshold: None,
            confidence_threshold: None,
        }
    }
}

/// Canonical verification request: lowercased email, digit-only CPF, resolved
/// device info and thresholds. Produced by the normalizer, consumed everywhere
/// else.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub email: Option<String>,
    pub member_id: Option<Uuid>,
    /// Opaque encoded biometric payload. Wrapped so it never lands in logs.
    pub biometric_data: SecretString,
    pub modality: Modality,
    pub action: ActionKind,
    pub cpf: Option<String>,
    pub device_info: DeviceInfo,
    pub quality_threshold: u8,
    pub confidence_threshold: u8,
}
