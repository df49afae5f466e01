//! Request and response bodies for the verification API.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::biometric::{
    ActionKind, DeviceType, Modality, RegistrationDetails, SecurityLevel, VerificationInput,
    Violation,
};

/// Biometric submission shared by the verify and login endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub member_id: Option<Uuid>,
    pub biometric_data: String,
    pub modality: Modality,
    #[serde(default)]
    pub action: Option<ActionKind>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub device_info: Option<DeviceInfoBody>,
    #[serde(default)]
    pub quality_threshold: Option<u8>,
    #[serde(default)]
    pub confidence_threshold: Option<u8>,
}

/// Device facts as declared by the client; everything is optional and the
/// normalizer fills the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DeviceInfoBody {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_type: Option<DeviceType>,
    #[serde(default)]
    pub security_level: Option<SecurityLevel>,
    #[serde(default)]
    pub sensor: Option<String>,
}

impl VerifyBody {
    #[must_use]
    pub fn into_input(self) -> VerificationInput {
        let device = self.device_info.unwrap_or_default();
        VerificationInput {
            email: self.email,
            member_id: self.member_id,
            biometric_data: self.biometric_data,
            modality: self.modality,
            action: self.action,
            cpf: self.cpf,
            device_id: device.device_id,
            device_type: device.device_type,
            security_level: device.security_level,
            sensor: device.sensor,
            quality_threshold: self.quality_threshold,
            confidence_threshold: self.confidence_threshold,
        }
    }
}

/// Membership application body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterBody {
    pub email: String,
    pub cpf: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub admission_date: Option<NaiveDate>,
    /// Optional enrollment capture checked against the biometric policy.
    #[serde(default)]
    pub biometric: Option<VerifyBody>,
}

impl RegisterBody {
    #[must_use]
    pub fn into_parts(self) -> (RegistrationDetails, Option<VerificationInput>) {
        let details = RegistrationDetails {
            email: self.email,
            cpf: self.cpf,
            phone: self.phone,
            birth_date: self.birth_date,
            admission_date: self.admission_date,
        };
        (details, self.biometric.map(VerifyBody::into_input))
    }
}

/// 200 body for an accepted verification or transaction request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcceptedResponse {
    pub status: String,
    pub member_id: Uuid,
}

/// 200 body for a successful biometric login.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginAcceptedResponse {
    pub status: String,
    pub member_id: Uuid,
    pub confidence: f32,
}

/// 422 body listing every violated rule.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RejectionResponse {
    pub status: String,
    pub violations: Vec<Violation>,
}

/// 423 body while the account sits in a lockout window.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LockedResponse {
    pub status: String,
    pub retry_after_seconds: i64,
}

/// 200 body for an application that passed every rule, echoing the
/// normalized identifiers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterAcceptedResponse {
    pub status: String,
    pub email: String,
    pub cpf: String,
}

/// Plain-message body for 400/401/404/500 answers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
