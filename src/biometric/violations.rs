//! Field-scoped validation violations accumulated across policy checks.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Machine-readable reason attached to a rejected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ViolationCode {
    InvalidFormat,
    InsufficientData,
    IncompatibleDevice,
    InsufficientSecurityLevel,
    KnownInvalid,
    AgeRequirementNotMet,
    AdmissionDateInvalid,
    AlreadyRegistered,
}

impl ViolationCode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::InsufficientData => "insufficient_data",
            Self::IncompatibleDevice => "incompatible_device",
            Self::InsufficientSecurityLevel => "insufficient_security_level",
            Self::KnownInvalid => "known_invalid",
            Self::AgeRequirementNotMet => "age_requirement_not_met",
            Self::AdmissionDateInvalid => "admission_date_invalid",
            Self::AlreadyRegistered => "already_registered",
        }
    }
}

/// One violated rule, scoped to the request field that triggered it.
///
/// Checks accumulate these instead of failing fast so a single response can
/// report every broken rule, the way a form validator would.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Violation {
    /// Request field the rule applies to, e.g. `biometric_data`.
    pub field: String,
    pub code: ViolationCode,
    /// Human-readable explanation, safe to show to the caller.
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_serializes_with_snake_case_code() -> anyhow::Result<()> {
        let violation = Violation::new(
            "device_info.security_level",
            ViolationCode::InsufficientSecurityLevel,
            "transaction requires a high security device",
        );

        let json = serde_json::to_value(&violation)?;
        assert_eq!(json["field"], "device_info.security_level");
        assert_eq!(json["code"], "insufficient_security_level");

        Ok(())
    }

    #[test]
    fn test_code_as_str_matches_wire_form() {
        assert_eq!(ViolationCode::KnownInvalid.as_str(), "known_invalid");
        assert_eq!(
            ViolationCode::IncompatibleDevice.as_str(),
            "incompatible_device"
        );
    }
}
