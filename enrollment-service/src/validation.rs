// Input validation shared by registration and spreadsheet import
use chrono::NaiveDate;
use error_common::FieldErrors;
use validator::{Validate, ValidationErrors};

use crate::error::{EnrollmentError, EnrollmentResult};
use crate::models::{NewEnrollee, NewFacility};

/// NIN is exactly 11 digits
pub fn is_valid_nin(nin: &str) -> bool {
    nin.len() == 11 && nin.chars().all(|c| c.is_ascii_digit())
}

/// Normalise a Nigerian mobile number to `+234XXXXXXXXXX`.
///
/// Accepts `08031234567`, `2348031234567` and `+2348031234567`, ignoring
/// spaces and dashes.
pub fn normalize_phone(phone: &str) -> Option<String> {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    let local = if let Some(rest) = digits.strip_prefix("+234") {
        rest
    } else if let Some(rest) = digits.strip_prefix("234") {
        rest
    } else if let Some(rest) = digits.strip_prefix('0') {
        rest
    } else {
        return None;
    };

    let valid = local.len() == 10
        && local.chars().all(|c| c.is_ascii_digit())
        && matches!(local.as_bytes().first(), Some(b'7' | b'8' | b'9'));
    valid.then(|| format!("+234{local}"))
}

/// Three-letter upper-case code used in enrollee numbers (`Bida` → `BID`)
pub fn lga_code(lga: &str) -> Option<String> {
    let letters: String = lga
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    (letters.len() == 3).then_some(letters)
}

/// Flatten `validator` errors into field → messages
pub fn to_field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map_or_else(|| e.code.to_string(), ToString::to_string)
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }
    fields
}

fn push(fields: &mut FieldErrors, field: &str, message: &str) {
    fields.entry(field.to_string()).or_default().push(message.to_string());
}

fn finish<T>(value: T, subject: &str, fields: FieldErrors) -> EnrollmentResult<T> {
    if fields.is_empty() {
        Ok(value)
    } else {
        Err(EnrollmentError::Validation {
            message: format!("Invalid {subject}"),
            fields,
        })
    }
}

impl NewEnrollee {
    /// Validate every field and return a normalised copy
    pub fn checked(&self, today: NaiveDate) -> EnrollmentResult<NewEnrollee> {
        let mut fields = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => to_field_errors(&errors),
        };
        let mut normalized = self.clone();

        normalized.nin = self.nin.trim().to_string();
        if !is_valid_nin(&normalized.nin) {
            push(&mut fields, "nin", "NIN must be exactly 11 digits");
        }

        match normalize_phone(&self.phone) {
            Some(phone) => normalized.phone = phone,
            None => push(&mut fields, "phone", "Phone must be a valid Nigerian mobile number"),
        }

        if self.date_of_birth > today {
            push(&mut fields, "date_of_birth", "Date of birth cannot be in the future");
        }

        if lga_code(&self.lga).is_none() {
            push(&mut fields, "lga", "LGA must contain at least three letters");
        }

        normalized.first_name = self.first_name.trim().to_string();
        normalized.last_name = self.last_name.trim().to_string();
        normalized.email = self
            .email
            .as_ref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());

        finish(normalized, "enrollee", fields)
    }
}

impl NewFacility {
    pub fn checked(&self) -> EnrollmentResult<NewFacility> {
        let fields = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => to_field_errors(&errors),
        };
        let mut normalized = self.clone();
        normalized.hcp_code = self.hcp_code.trim().to_ascii_uppercase();
        normalized.name = self.name.trim().to_string();
        finish(normalized, "facility", fields)
    }
}
