//! Membership application rules: document, age, and uniqueness checks.
//!
//! These run next to the biometric policy during registration and report
//! through the same violation list. Inputs are expected to be normalized
//! already (lowercased email, digit-only CPF).

use anyhow::Result;
use chrono::{Months, NaiveDate};
use regex::Regex;

use super::cpf::{self, CpfError};
use super::store::IdentityStore;
use super::violations::{Violation, ViolationCode};

/// 18 years, the minimum age to join.
const ADULT_AGE: Months = Months::new(18 * 12);

/// 16 years, the earliest lawful admission relative to birth.
const MIN_WORKING_AGE: Months = Months::new(16 * 12);

/// What a membership application must carry.
#[derive(Debug, Clone)]
pub struct RegistrationDetails {
    pub email: String,
    pub cpf: String,
    pub phone: Option<String>,
    pub birth_date: NaiveDate,
    pub admission_date: Option<NaiveDate>,
}

fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

fn check_email_format(details: &RegistrationDetails) -> Option<Violation> {
    if valid_email(&details.email) {
        None
    } else {
        Some(Violation::new(
            "email",
            ViolationCode::InvalidFormat,
            "email address is not valid",
        ))
    }
}

fn check_cpf(details: &RegistrationDetails) -> Option<Violation> {
    match cpf::validate(&details.cpf) {
        Ok(()) => None,
        Err(CpfError::InvalidFormat) => Some(Violation::new(
            "cpf",
            ViolationCode::InvalidFormat,
            "CPF must contain exactly 11 digits",
        )),
        Err(CpfError::KnownInvalid | CpfError::ChecksumMismatch) => Some(Violation::new(
            "cpf",
            ViolationCode::KnownInvalid,
            "CPF is not a valid document number",
        )),
    }
}

fn check_age(details: &RegistrationDetails, today: NaiveDate) -> Option<Violation> {
    match details.birth_date.checked_add_months(ADULT_AGE) {
        Some(adult_at) if adult_at <= today => None,
        _ => Some(Violation::new(
            "birth_date",
            ViolationCode::AgeRequirementNotMet,
            "applicants must be at least 18 years old",
        )),
    }
}

fn check_admission(details: &RegistrationDetails) -> Option<Violation> {
    let admission = details.admission_date?;
    match details.birth_date.checked_add_months(MIN_WORKING_AGE) {
        Some(earliest) if admission >= earliest => None,
        _ => Some(Violation::new(
            "admission_date",
            ViolationCode::AdmissionDateInvalid,
            "admission date must be at least 16 years after the birth date",
        )),
    }
}

/// Pure document and date rules, accumulated like every other check.
#[must_use]
pub fn check_documents(details: &RegistrationDetails, today: NaiveDate) -> Vec<Violation> {
    [
        check_email_format(details),
        check_cpf(details),
        check_age(details, today),
        check_admission(details),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Uniqueness probes against the identity store. Inactive members still hold
/// their identifiers.
pub async fn check_uniqueness(
    store: &dyn IdentityStore,
    details: &RegistrationDetails,
) -> Result<Vec<Violation>> {
    let mut violations = Vec::new();

    if store.is_email_taken(&details.email).await? {
        violations.push(Violation::new(
            "email",
            ViolationCode::AlreadyRegistered,
            "email address is already registered",
        ));
    }
    if store.is_cpf_taken(&details.cpf).await? {
        violations.push(Violation::new(
            "cpf",
            ViolationCode::AlreadyRegistered,
            "CPF is already registered",
        ));
    }
    if let Some(phone) = details.phone.as_deref() {
        if store.is_phone_taken(phone).await? {
            violations.push(Violation::new(
                "phone",
                ViolationCode::AlreadyRegistered,
                "phone number is already registered",
            ));
        }
    }

    Ok(violations)
}

/// Every registration rule in one pass: documents, dates, then uniqueness.
pub async fn evaluate(
    store: &dyn IdentityStore,
    details: &RegistrationDetails,
    today: NaiveDate,
) -> Result<Vec<Violation>> {
    let mut violations = check_documents(details, today);
    violations.extend(check_uniqueness(store, details).await?);
    Ok(violations)
}
