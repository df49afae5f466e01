//! # Membro (Union Membership Verification Authority)
//!
//! `membro` is the verification authority for a union membership platform. It
//! accepts biometric credential submissions from member-facing apps and decides
//! whether each request may proceed, recording an audit trail for every
//! rejected attempt.
//!
//! ## Verification Model
//!
//! Every submission goes through the same pipeline: normalization, identity
//! resolution, and an ordered set of policy checks.
//!
//! - **Normalization:** Emails are lowercased, CPFs are stripped to their
//!   digits, device types are derived from the user agent, and per-modality
//!   quality/confidence thresholds are filled in when the client omits them.
//! - **Policy:** Payload format and size, device compatibility, and security
//!   level are checked independently; a request is rejected with the full list
//!   of violations rather than the first one found.
//! - **CPF:** Brazilian taxpayer numbers are validated with the official
//!   check-digit scheme during registration.
//!
//! ## Login Protection
//!
//! Failed biometric logins count against a per-account attempt budget. Once
//! the budget is exhausted the account locks for a configurable window and
//! login answers `423 Locked` with the seconds remaining. A successful login
//! clears the counter.
//!
//! Identity lookups that fail return `404 Not Found` without revealing whether
//! the email or member id ever existed.

pub mod api;
pub mod biometric;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
