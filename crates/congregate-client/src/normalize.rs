use chrono::NaiveDate;

use congregate_types::api::SubmissionPayload;

use crate::schema::{RegistrationMode, ValidatedValues, fields};

const COUNTRY_PREFIX: &str = "+62";
const TRUNK_PREFIX: &str = "0";

pub fn normalize_email(email: &str) -> String {
    email
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Strips whitespace and swaps a literal leading `+62` for `0`.
pub fn normalize_phone(phone: &str) -> String {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.strip_prefix(COUNTRY_PREFIX) {
        Some(rest) => format!("{}{}", TRUNK_PREFIX, rest),
        None => compact,
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn user_types(mode: RegistrationMode) -> Vec<String> {
    match mode {
        RegistrationMode::Worker => vec!["volunteer".to_string()],
        RegistrationMode::Member => vec!["user".to_string()],
    }
}

/// Builds the `POST /api/v2/users` body from validated values.
///
/// Every payload field is emitted for every mode; values the mode's schema
/// didn't accept fall back to `""`, `false` or `null`.
pub fn normalize(values: &ValidatedValues, mode: RegistrationMode) -> SubmissionPayload {
    let trimmed = |name: &str| values.text(name).map(str::trim).unwrap_or_default().to_string();
    let lowered = |name: &str| trimmed(name).to_lowercase();

    SubmissionPayload {
        name: trimmed(fields::NAME),
        phone_number: normalize_phone(values.text(fields::PHONE_NUMBER).unwrap_or_default()),
        email: normalize_email(values.text(fields::EMAIL).unwrap_or_default()),
        password: values.text(fields::PASSWORD).unwrap_or_default().to_string(),
        user_types: user_types(mode),
        campus_code: trimmed(fields::CAMPUS),
        place_of_birth: trimmed(fields::PLACE_OF_BIRTH),
        date_of_birth: values.date(fields::DATE_OF_BIRTH).map(format_date),
        address: String::new(),
        gender: lowered(fields::GENDER),
        department_code: trimmed(fields::DEPARTMENT),
        kkj_number: trimmed(fields::KKJ),
        jemaat_id: String::new(),
        is_kom100: values.flag(fields::KOM).unwrap_or(false),
        is_baptized: values.flag(fields::BAPTIS).unwrap_or(false),
        marital_status: lowered(fields::MARITAL_STATUS),
        cool_id: values.number(fields::COOL),
    }
}
