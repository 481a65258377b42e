//! Registration identity validation
//!
//! Researchers register with an email. Subjects register with an email or a
//! CPF (Brazilian taxpayer number, 11 digits with two check digits).

use crate::error::{SurveyError, SurveyResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email pattern compiles")
});

/// A validated, normalised login identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Email(String),
    Cpf(String),
}

impl Identity {
    /// Normalised form used as the stored username
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Identity::Email(s) | Identity::Cpf(s) => s,
        }
    }

    #[must_use]
    pub fn into_username(self) -> String {
        match self {
            Identity::Email(s) | Identity::Cpf(s) => s,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim and lower-case an email, rejecting malformed input.
pub fn parse_email(raw: &str) -> SurveyResult<Identity> {
    let candidate = raw.trim().to_lowercase();
    if candidate.len() <= 254 && EMAIL.is_match(&candidate) {
        Ok(Identity::Email(candidate))
    } else {
        Err(SurveyError::InvalidIdentity(format!("malformed email: {raw}")))
    }
}

/// Strip `.`/`-`/spaces and verify both CPF check digits.
pub fn parse_cpf(raw: &str) -> SurveyResult<Identity> {
    let invalid = || SurveyError::InvalidIdentity(format!("malformed CPF: {raw}"));

    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect();
    if stripped.len() != 11 {
        return Err(invalid());
    }
    let digits: Vec<u32> = stripped
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<_>>()
        .ok_or_else(invalid)?;
    if digits.iter().all(|d| *d == digits[0]) {
        return Err(invalid());
    }
    if check_digit(&digits[..9]) != digits[9] || check_digit(&digits[..10]) != digits[10] {
        return Err(invalid());
    }
    Ok(Identity::Cpf(stripped))
}

fn check_digit(prefix: &[u32]) -> u32 {
    let weight_start = u32::try_from(prefix.len()).unwrap_or(0) + 1;
    let sum: u32 = prefix
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - u32::try_from(i).unwrap_or(0)))
        .sum();
    let rem = (sum * 10) % 11;
    if rem == 10 {
        0
    } else {
        rem
    }
}

/// Researcher usernames are emails.
pub fn parse_researcher_username(raw: &str) -> SurveyResult<Identity> {
    parse_email(raw)
}

/// Subject usernames are emails or CPFs.
pub fn parse_subject_username(raw: &str) -> SurveyResult<Identity> {
    if raw.contains('@') {
        parse_email(raw)
    } else {
        parse_cpf(raw)
    }
}
