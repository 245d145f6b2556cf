use regex::Regex;
use lazy_static::lazy_static;
use sha2::{Sha256, Digest};
use base64::{Engine as _, engine::general_purpose};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    // Nigerian mobile numbers: 0803..., 234803..., +234803...
    static ref PHONE_REGEX: Regex = Regex::new(r"(?:\+234|\b234|\b0)[789][01]\d{8}\b").unwrap();
    static ref PIN_REGEX: Regex =
        Regex::new(&format!(r"\b\d{{{MIN_PIN_LENGTH},{MAX_PIN_LENGTH}}}\b")).unwrap();
    // National Identification Number
    static ref NIN_REGEX: Regex = Regex::new(r"\b\d{11}\b").unwrap();
    static ref DEFAULT_REDACTOR: PiiRedactor = PiiRedactor::new(RedactionConfig::default());
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_nins: bool,
    pub redact_pins: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_nins: true,
            redact_pins: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    pub fn with_custom_pattern(mut self, pattern: Regex, replacement: impl Into<String>) -> Self {
        self.custom_patterns.push((pattern, replacement.into()));
        self
    }
}

/// Shortest premium PIN the engine can be configured to issue
pub const MIN_PIN_LENGTH: usize = 8;
/// Longest premium PIN the engine can be configured to issue
pub const MAX_PIN_LENGTH: usize = 20;

/// PII redactor for log messages
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        // Phones before NINs: an 11-digit mobile number would otherwise be
        // taken for a NIN.
        if self.config.redact_phones {
            result = self.replace(&PHONE_REGEX, &result, "PHONE", |m| format!("***{}", last_four(m)));
        }

        // NINs before PINs: the PIN range covers 11-digit runs too.
        if self.config.redact_nins {
            result = self.replace(&NIN_REGEX, &result, "NIN", |_| "***********".to_string());
        }

        if self.config.redact_pins {
            result = self.replace(&PIN_REGEX, &result, "PIN", |m| format!("****{}", last_four(m)));
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX.replace_all(text, |caps: &regex::Captures| {
            let email = &caps[0];
            if self.config.hash_for_correlation {
                format!("EMAIL[{}]", hash_value(email))
            } else {
                match email.split_once('@') {
                    Some((local, domain)) => {
                        format!("{}***@{}***", first_char(local), first_char(domain))
                    }
                    None => "***@***".to_string(),
                }
            }
        }).to_string()
    }

    fn replace<F>(&self, regex: &Regex, text: &str, label: &str, mask: F) -> String
    where
        F: Fn(&str) -> String,
    {
        regex.replace_all(text, |caps: &regex::Captures| {
            let matched = &caps[0];
            if self.config.hash_for_correlation {
                format!("{}[{}]", label, hash_value(matched))
            } else {
                mask(matched)
            }
        }).to_string()
    }
}

/// Redact `text` with the default configuration
pub fn redact(text: &str) -> String {
    DEFAULT_REDACTOR.redact(text)
}

/// Short, stable correlation hash of a sensitive value
pub fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    general_purpose::URL_SAFE_NO_PAD.encode(&digest[..8])
}

fn last_four(value: &str) -> &str {
    value.get(value.len().saturating_sub(4)..).unwrap_or("")
}

fn first_char(value: &str) -> &str {
    value.get(..1).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masking_redactor() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking_redactor().redact("Enrollee amina.bello@example.com updated");
        assert!(redacted.contains("a***@e***"));
        assert!(!redacted.contains("amina.bello"));
    }

    #[test]
    fn test_phone_redaction() {
        let redactor = masking_redactor();
        assert_eq!(redactor.redact("call 08031234567"), "call ***4567");
        assert_eq!(redactor.redact("call +2348031234567 now"), "call ***4567 now");
    }

    #[test]
    fn test_nin_and_pin_redaction() {
        let redactor = masking_redactor();
        assert_eq!(redactor.redact("NIN 12345678901"), "NIN ***********");
        assert_eq!(redactor.redact("PIN 482910375521"), "PIN ****5521");
    }

    #[test]
    fn test_pins_of_every_issuable_length_are_masked() {
        let redactor = masking_redactor();
        assert_eq!(redactor.redact("PIN 48291037 redeemed"), "PIN ****1037 redeemed");
        assert_eq!(redactor.redact("PIN 4829103755 redeemed"), "PIN ****3755 redeemed");
        assert_eq!(
            redactor.redact("PIN 48291037552148291037 redeemed"),
            "PIN ****1037 redeemed"
        );
        // Shorter runs are left alone
        assert_eq!(redactor.redact("batch 1234567"), "batch 1234567");
        // Longer runs are not PINs either
        assert_eq!(
            redactor.redact("ref 482910375521482910375"),
            "ref 482910375521482910375"
        );
    }

    #[test]
    fn test_hash_is_stable_for_correlation() {
        let redactor = PiiRedactor::new(RedactionConfig::default());
        let first = redactor.redact("NIN 12345678901");
        let second = redactor.redact("NIN 12345678901");
        assert_eq!(first, second);
        assert!(first.starts_with("NIN NIN["));
        assert!(!first.contains("12345678901"));
    }

    #[test]
    fn test_custom_pattern() {
        let config = RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        }
        .with_custom_pattern(Regex::new(r"NGSCHA/[A-Z]{3}/\d{6}").unwrap(), "NGSCHA/[REDACTED]");
        let redactor = PiiRedactor::new(config);
        assert_eq!(redactor.redact("enrollee NGSCHA/BID/000123"), "enrollee NGSCHA/[REDACTED]");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(redact("Referral approved for facility HCP-001"), "Referral approved for facility HCP-001");
    }
}
