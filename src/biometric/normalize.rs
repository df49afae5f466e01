//! Credential normalizer: raw submissions become canonical requests.
//!
//! Normalization is a pure transform. It lowercases the email, strips the CPF
//! to digits, derives the device type from the user agent when the client did
//! not declare one, resolves the capture sensor from modality and device type,
//! and fills per-modality threshold defaults. Nothing here touches storage.

use regex::Regex;
use secrecy::SecretString;

use super::cpf;
use super::request::{
    ActionKind, DeviceInfo, DeviceType, Modality, RequestContext, VerificationInput,
    VerificationRequest,
};

/// Capture sensor by modality and device type.
const SENSOR_TABLE: &[(Modality, DeviceType, &str)] = &[
    (Modality::Fingerprint, DeviceType::Mobile, "capacitive"),
    (Modality::Fingerprint, DeviceType::Tablet, "capacitive"),
    (Modality::Fingerprint, DeviceType::Desktop, "optical_scanner"),
    (Modality::Face, DeviceType::Mobile, "front_camera"),
    (Modality::Face, DeviceType::Tablet, "front_camera"),
    (Modality::Face, DeviceType::Desktop, "webcam"),
    (Modality::Voice, DeviceType::Mobile, "microphone"),
    (Modality::Voice, DeviceType::Tablet, "microphone"),
    (Modality::Voice, DeviceType::Desktop, "microphone"),
    (Modality::Iris, DeviceType::Mobile, "infrared_scanner"),
    (Modality::Iris, DeviceType::Tablet, "infrared_scanner"),
    (Modality::Iris, DeviceType::Desktop, "infrared_scanner"),
];

/// Default `(quality, confidence)` acceptance thresholds per modality,
/// applied when the client does not declare its own.
#[must_use]
pub const fn default_thresholds(modality: Modality) -> (u8, u8) {
    match modality {
        Modality::Fingerprint => (70, 85),
        Modality::Face => (75, 80),
        Modality::Voice => (65, 75),
        Modality::Iris => (90, 95),
    }
}

#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Classifies a user-agent string into a device type.
///
/// Mobile markers are checked first, so an iPad agent that also advertises
/// `Mobile` classifies as mobile. That overlap mirrors how clients in the
/// field already get bucketed and is kept as-is.
#[must_use]
pub fn device_type_from_user_agent(user_agent: &str) -> DeviceType {
    if Regex::new(r"Mobile|Android|iPhone").is_ok_and(|re| re.is_match(user_agent)) {
        DeviceType::Mobile
    } else if Regex::new(r"Tablet|iPad").is_ok_and(|re| re.is_match(user_agent)) {
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}

/// Looks up the capture sensor for a modality on a device type.
#[must_use]
pub fn sensor_for(modality: Modality, device_type: DeviceType) -> &'static str {
    SENSOR_TABLE
        .iter()
        .find(|(m, d, _)| *m == modality && *d == device_type)
        .map_or("unknown", |(_, _, sensor)| sensor)
}

/// The action the caller meant: explicit wins, an email with no member id
/// reads as a login, anything else is a plain verification.
fn resolve_action(input: &VerificationInput) -> ActionKind {
    if let Some(action) = input.action {
        return action;
    }
    if input.email.is_some() && input.member_id.is_none() {
        ActionKind::Login
    } else {
        ActionKind::default()
    }
}

/// Produces the canonical request every downstream check operates on.
#[must_use]
pub fn normalize(input: VerificationInput, context: &RequestContext) -> VerificationRequest {
    let action = resolve_action(&input);

    let device_type = input.device_type.unwrap_or_else(|| {
        context
            .user_agent
            .as_deref()
            .map_or(DeviceType::Desktop, device_type_from_user_agent)
    });
    let security_level = input.security_level.unwrap_or_default();
    let sensor = input
        .sensor
        .unwrap_or_else(|| sensor_for(input.modality, device_type).to_string());

    let (default_quality, default_confidence) = default_thresholds(input.modality);

    VerificationRequest {
        email: input.email.map(|email| normalize_email(&email)),
        member_id: input.member_id,
        biometric_data: SecretString::from(input.biometric_data),
        modality: input.modality,
        action,
        cpf: input.cpf.map(|raw| cpf::strip_to_digits(&raw)),
        device_info: DeviceInfo {
            device_id: input.device_id,
            device_type,
            security_level,
            sensor,
        },
        quality_threshold: input.quality_threshold.unwrap_or(default_quality),
        confidence_threshold: input.confidence_threshold.unwrap_or(default_confidence),
    }
}
