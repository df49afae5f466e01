//! Threshold, format, and device policy checks.
//!
//! Each check is an independent function from a canonical request to zero or
//! more violations. The orchestrator runs them all in order and merges the
//! results; no check mutates state or short-circuits the others.

use regex::Regex;
use secrecy::ExposeSecret;

use super::request::{ActionKind, DeviceType, Modality, SecurityLevel, VerificationRequest};
use super::violations::{Violation, ViolationCode};

/// Allowed payload character class shared by every modality.
const PERMISSIVE_PAYLOAD: &str = r"^[A-Za-z0-9+/=_-]+$";

/// Payload pattern keyed by modality.
///
/// Every entry currently points at the same permissive class.
/// TODO: tighten per modality once the capture apps commit to concrete
/// payload encodings.
const PAYLOAD_PATTERNS: &[(Modality, &str)] = &[
    (Modality::Fingerprint, PERMISSIVE_PAYLOAD),
    (Modality::Face, PERMISSIVE_PAYLOAD),
    (Modality::Voice, PERMISSIVE_PAYLOAD),
    (Modality::Iris, PERMISSIVE_PAYLOAD),
];

/// Modality and device pairs that never produce a usable capture.
const INCOMPATIBLE_DEVICES: &[(Modality, DeviceType)] = &[(Modality::Iris, DeviceType::Desktop)];

/// Minimum accepted payload length in bytes per modality.
#[must_use]
pub const fn min_payload_length(modality: Modality) -> usize {
    match modality {
        Modality::Fingerprint => 100,
        Modality::Voice => 150,
        Modality::Face => 200,
        Modality::Iris => 300,
    }
}

fn payload_pattern(modality: Modality) -> &'static str {
    PAYLOAD_PATTERNS
        .iter()
        .find(|(m, _)| *m == modality)
        .map_or(PERMISSIVE_PAYLOAD, |(_, pattern)| pattern)
}

pub fn check_payload_format(request: &VerificationRequest) -> Vec<Violation> {
    let payload = request.biometric_data.expose_secret();
    let pattern = payload_pattern(request.modality);

    if Regex::new(pattern).is_ok_and(|re| re.is_match(payload)) {
        Vec::new()
    } else {
        vec![Violation::new(
            "biometric_data",
            ViolationCode::InvalidFormat,
            format!(
                "{} payload contains characters outside the allowed set",
                request.modality.as_str()
            ),
        )]
    }
}

pub fn check_payload_length(request: &VerificationRequest) -> Vec<Violation> {
    let length = request.biometric_data.expose_secret().len();
    let minimum = min_payload_length(request.modality);

    if length >= minimum {
        Vec::new()
    } else {
        vec![Violation::new(
            "biometric_data",
            ViolationCode::InsufficientData,
            format!(
                "{} payload is {length} bytes, minimum is {minimum}",
                request.modality.as_str()
            ),
        )]
    }
}

pub fn check_device_compatibility(request: &VerificationRequest) -> Vec<Violation> {
    let combination = (request.modality, request.device_info.device_type);

    if INCOMPATIBLE_DEVICES.iter().any(|pair| *pair == combination) {
        vec![Violation::new(
            "device_info.device_type",
            ViolationCode::IncompatibleDevice,
            format!(
                "{} capture is not supported on {} devices",
                request.modality.as_str(),
                request.device_info.device_type.as_str()
            ),
        )]
    } else {
        Vec::new()
    }
}

pub fn check_security_level(request: &VerificationRequest) -> Vec<Violation> {
    if request.action == ActionKind::Transaction
        && request.device_info.security_level < SecurityLevel::High
    {
        vec![Violation::new(
            "device_info.security_level",
            ViolationCode::InsufficientSecurityLevel,
            "transaction authorization requires a high or very_high security device",
        )]
    } else {
        Vec::new()
    }
}

pub type PolicyCheck = fn(&VerificationRequest) -> Vec<Violation>;

/// The checks every canonical request goes through, in order.
pub const POLICY_CHECKS: &[PolicyCheck] = &[
    check_payload_format,
    check_payload_length,
    check_device_compatibility,
    check_security_level,
];

/// Runs every policy check and merges the violations.
#[must_use]
pub fn evaluate(request: &VerificationRequest) -> Vec<Violation> {
    POLICY_CHECKS
        .iter()
        .flat_map(|check| check(request))
        .collect()
}
