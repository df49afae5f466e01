//! OpenAPI document for the verification API.
//!
//! Handlers register through `#[utoipa::path]`; this module collects them and
//! overrides the generated info block with Cargo metadata so the document
//! always matches the released package.

use utoipa::openapi::{Contact, InfoBuilder, License};
use utoipa::OpenApi;

use super::handlers::{health, login, register, types, verify};
use crate::biometric::{ActionKind, DeviceType, Modality, SecurityLevel, Violation, ViolationCode};

#[derive(OpenApi)]
#[openapi(
    paths(health::health, verify::verify, login::login, register::register),
    components(schemas(
        health::Health,
        types::VerifyBody,
        types::DeviceInfoBody,
        types::RegisterBody,
        types::AcceptedResponse,
        types::LoginAcceptedResponse,
        types::RejectionResponse,
        types::LockedResponse,
        types::RegisterAcceptedResponse,
        types::MessageResponse,
        Violation,
        ViolationCode,
        Modality,
        ActionKind,
        DeviceType,
        SecurityLevel,
    )),
    tags(
        (name = "verification", description = "Biometric verification and login"),
        (name = "membership", description = "Membership application validation"),
        (name = "health", description = "Service health")
    )
)]
struct ApiDoc;

/// The OpenAPI document, with info taken from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();

    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();
    info.contact = cargo_contact();
    info.license = cargo_license();
    doc.info = info;

    doc
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are colon separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(':').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = match primary.find('<') {
        Some(start) => {
            let name = primary[..start].trim();
            let email = primary[start + 1..].trim_end_matches('>').trim();
            (
                (!name.is_empty()).then_some(name),
                (!email.is_empty()).then_some(email),
            )
        }
        None => (Some(primary), None),
    };
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}
