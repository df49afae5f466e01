//! CPF (Brazilian taxpayer registry number) check-digit validation.
//!
//! A CPF is 11 digits; the last two are check digits computed from the first
//! nine with a weighted modulo-11 scheme. Formatting characters are ignored,
//! so `529.982.247-25` and `52998224725` validate the same way.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpfError {
    #[error("CPF must contain exactly 11 digits")]
    InvalidFormat,
    #[error("CPF is a known invalid repeated-digit sequence")]
    KnownInvalid,
    #[error("CPF check digits do not match")]
    ChecksumMismatch,
}

/// Strips everything but ASCII digits, keeping their order.
#[must_use]
pub fn strip_to_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Validates a CPF in any formatting, returning why it was rejected.
pub fn validate(raw: &str) -> Result<(), CpfError> {
    let stripped = strip_to_digits(raw);
    if stripped.len() != 11 {
        return Err(CpfError::InvalidFormat);
    }

    let digits: Vec<u32> = stripped.chars().filter_map(|c| c.to_digit(10)).collect();

    // 00000000000 through 99999999999 satisfy the checksum but are reserved.
    if digits.windows(2).all(|pair| pair[0] == pair[1]) {
        return Err(CpfError::KnownInvalid);
    }

    if check_digit(&digits[..9], 10) != digits[9] || check_digit(&digits[..10], 11) != digits[10] {
        return Err(CpfError::ChecksumMismatch);
    }

    Ok(())
}

/// Boolean form of [`validate`] for callers that do not need the reason.
#[must_use]
pub fn is_valid(raw: &str) -> bool {
    validate(raw).is_ok()
}

/// Weighted modulo-11 check digit over a digit prefix.
///
/// The first check digit weighs nine digits from 10 down to 2, the second
/// weighs ten digits from 11 down to 2. A remainder below 2 maps to 0.
fn check_digit(digits: &[u32], first_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(position, digit)| digit * (first_weight - position as u32))
        .sum();

    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        11 - remainder
    }
}
