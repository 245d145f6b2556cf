//! Bulk enrollee import from spreadsheet rows
//!
//! Each row arrives as a header → cell map. Headers are normalised
//! (`"Date of Birth"` → `date_of_birth`) and a few common aliases are
//! accepted. Validation never stops at the first bad row: the report lists
//! every problem with its spreadsheet row number (the header is row 1).

use std::collections::HashMap;

use auth_rbac::{permissions, Actor};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::error::{EnrollmentError, EnrollmentResult};
use crate::models::{FundingType, LevelOfCare, NewEnrollee, Sex};
use crate::service::EnrollmentService;
use crate::validation::{is_valid_nin, to_field_errors};

/// Spreadsheet row as text, before type conversion
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct EnrolleeImportRow {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(equal = 11, message = "NIN must be exactly 11 digits"))]
    pub nin: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(email(message = "Email address is invalid"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Sex is required"))]
    pub sex: String,
    #[validate(length(min = 1, message = "Date of birth is required"))]
    pub date_of_birth: String,
    #[validate(length(min = 3, message = "LGA is required"))]
    pub lga: String,
    #[validate(length(min = 1, message = "Facility code is required"))]
    pub facility_code: String,
    #[validate(length(min = 1, message = "Funding type is required"))]
    pub funding_type: String,
}

fn normalize_header(header: &str) -> String {
    let key: String = header
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let key = key.trim_matches('_').to_string();
    match key.as_str() {
        "firstname" | "first" => "first_name".to_string(),
        "surname" | "lastname" | "last" => "last_name".to_string(),
        "phone_number" | "mobile" => "phone".to_string(),
        "email_address" => "email".to_string(),
        "gender" => "sex".to_string(),
        "dob" | "birth_date" => "date_of_birth".to_string(),
        "hcp_code" | "facility" | "primary_facility" => "facility_code".to_string(),
        "funding" | "category" => "funding_type".to_string(),
        _ => key,
    }
}

impl EnrolleeImportRow {
    pub fn from_record(record: &HashMap<String, String>) -> Self {
        let mut row = Self::default();
        for (header, value) in record {
            let value = value.trim().to_string();
            match normalize_header(header).as_str() {
                "first_name" => row.first_name = value,
                "last_name" => row.last_name = value,
                "nin" => row.nin = value,
                "phone" => row.phone = value,
                "email" => row.email = Some(value).filter(|v| !v.is_empty()),
                "sex" => row.sex = value,
                "date_of_birth" => row.date_of_birth = value,
                "lga" => row.lga = value,
                "facility_code" => row.facility_code = value.to_ascii_uppercase(),
                "funding_type" => row.funding_type = value,
                _ => {}
            }
        }
        row
    }
}

fn parse_sex(value: &str) -> Option<Sex> {
    match value.to_lowercase().as_str() {
        "m" | "male" => Some(Sex::Male),
        "f" | "female" => Some(Sex::Female),
        _ => None,
    }
}

fn parse_funding_type(value: &str) -> Option<FundingType> {
    match value.to_lowercase().replace(['-', ' '], "").as_str() {
        "formal" => Some(FundingType::Formal),
        "informal" => Some(FundingType::Informal),
        "bhcpf" => Some(FundingType::Bhcpf),
        "equity" => Some(FundingType::Equity),
        _ => None,
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

/// One problem found in an import file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub imported: Vec<String>,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn rows_with_errors(&self) -> usize {
        let mut rows: Vec<usize> = self.errors.iter().map(|e| e.row).collect();
        rows.dedup();
        rows.len()
    }
}

/// A row that passed validation, ready to register
#[derive(Debug, Clone)]
pub struct ReadyRow {
    pub row: usize,
    pub enrollee: NewEnrollee,
}

/// Validates and imports enrollee spreadsheets against the live register
pub struct EnrolleeImporter<'a> {
    service: &'a EnrollmentService,
}

impl<'a> EnrolleeImporter<'a> {
    pub fn new(service: &'a EnrollmentService) -> Self {
        Self { service }
    }

    /// Validate every row without writing anything
    pub async fn validate(
        &self,
        records: &[HashMap<String, String>],
    ) -> EnrollmentResult<(ImportReport, Vec<ReadyRow>)> {
        let today = self.service.clock.now().date_naive();
        let mut report = ImportReport {
            total_rows: records.len(),
            ..ImportReport::default()
        };
        let mut ready = Vec::new();
        let mut first_seen: HashMap<String, usize> = HashMap::new();

        for (index, record) in records.iter().enumerate() {
            let row_number = index + 2;
            let mut errors = Vec::new();
            let mut push = |field: &str, message: String| {
                errors.push(RowError {
                    row: row_number,
                    field: field.to_string(),
                    message,
                });
            };

            let row = EnrolleeImportRow::from_record(record);
            if let Err(e) = row.validate() {
                let mut fields: Vec<_> = to_field_errors(&e).into_iter().collect();
                fields.sort();
                for (field, messages) in fields {
                    for message in messages {
                        push(&field, message);
                    }
                }
            }

            // the length rule above already covers NINs of the wrong size
            if row.nin.chars().count() == 11 && !is_valid_nin(&row.nin) {
                push("nin", "NIN must be exactly 11 digits".to_string());
            }

            if !row.nin.is_empty() {
                match first_seen.get(&row.nin).copied() {
                    Some(first) => push("nin", format!("Duplicate NIN in file (first seen on row {first})")),
                    None => {
                        first_seen.insert(row.nin.clone(), row_number);
                        if self.service.find_enrollee_by_nin(&row.nin).await?.is_some() {
                            push("nin", "NIN is already registered".to_string());
                        }
                    }
                }
            }

            let sex = parse_sex(&row.sex);
            if sex.is_none() && !row.sex.is_empty() {
                push("sex", format!("Unknown sex '{}'", row.sex));
            }
            let funding_type = parse_funding_type(&row.funding_type);
            if funding_type.is_none() && !row.funding_type.is_empty() {
                push("funding_type", format!("Unknown funding type '{}'", row.funding_type));
            }
            let date_of_birth = parse_date(&row.date_of_birth);
            if date_of_birth.is_none() && !row.date_of_birth.is_empty() {
                push("date_of_birth", format!("Unrecognised date '{}'", row.date_of_birth));
            }

            let mut facility_id = None;
            if !row.facility_code.is_empty() {
                match self.service.find_facility_by_code(&row.facility_code).await? {
                    None => push("facility_code", format!("Unknown facility code {}", row.facility_code)),
                    Some(f) if !f.is_active() => {
                        push("facility_code", format!("Facility {} is inactive", f.hcp_code));
                    }
                    Some(f) if f.level_of_care != LevelOfCare::Primary => {
                        push("facility_code", format!("Facility {} is not a primary care facility", f.hcp_code));
                    }
                    Some(f) => facility_id = Some(f.id),
                }
            }

            if let (Some(sex), Some(funding_type), Some(date_of_birth), Some(facility_id)) =
                (sex, funding_type, date_of_birth, facility_id)
            {
                let candidate = NewEnrollee {
                    first_name: row.first_name.clone(),
                    last_name: row.last_name.clone(),
                    nin: row.nin.clone(),
                    phone: row.phone.clone(),
                    email: row.email.clone(),
                    sex,
                    date_of_birth,
                    lga: row.lga.clone(),
                    primary_facility_id: facility_id,
                    funding_type,
                };
                match candidate.checked(today) {
                    Ok(enrollee) if errors.is_empty() => ready.push(ReadyRow {
                        row: row_number,
                        enrollee,
                    }),
                    Ok(_) => {}
                    Err(EnrollmentError::Validation { fields, .. }) => {
                        let mut fields: Vec<_> = fields.into_iter().collect();
                        fields.sort();
                        for (field, messages) in fields {
                            // length errors for these were already reported
                            if errors.iter().any(|e| e.field == field) {
                                continue;
                            }
                            for message in messages {
                                errors.push(RowError {
                                    row: row_number,
                                    field: field.clone(),
                                    message,
                                });
                            }
                        }
                    }
                    Err(other) => return Err(other),
                }
            }

            report.errors.extend(errors);
        }

        report.valid_rows = ready.len();
        Ok((report, ready))
    }

    /// Register every valid row; rows that fail are reported, not fatal
    pub async fn import_enrollees(
        &self,
        actor: &Actor,
        records: &[HashMap<String, String>],
    ) -> EnrollmentResult<ImportReport> {
        self.service
            .access
            .authorize(actor, permissions::ENROLLEES_MANAGE)
            .await?;
        let (mut report, ready) = self.validate(records).await?;

        for ReadyRow { row, enrollee } in ready {
            match self.service.register_enrollee(actor, enrollee).await {
                Ok(registered) => report.imported.push(registered.enrollee_number),
                Err(err @ (EnrollmentError::Rbac(_) | EnrollmentError::Audit(_))) => return Err(err),
                Err(err) => report.errors.push(RowError {
                    row,
                    field: "row".to_string(),
                    message: err.to_string(),
                }),
            }
        }
        report.errors.sort_by_key(|e| e.row);

        if report.is_clean() {
            info!(imported = report.imported.len(), "enrollee import completed");
        } else {
            warn!(
                imported = report.imported.len(),
                rejected_rows = report.rows_with_errors(),
                "enrollee import completed with errors"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_normalization() {
        assert_eq!(normalize_header(" First Name "), "first_name");
        assert_eq!(normalize_header("Date of Birth"), "date_of_birth");
        assert_eq!(normalize_header("DOB"), "date_of_birth");
        assert_eq!(normalize_header("HCP Code"), "facility_code");
        assert_eq!(normalize_header("Surname"), "last_name");
    }

    #[test]
    fn test_row_from_record() {
        let record = HashMap::from([
            ("First Name".to_string(), " Hauwa ".to_string()),
            ("Gender".to_string(), "F".to_string()),
            ("Email".to_string(), String::new()),
            ("HCP Code".to_string(), "ns-phc-01".to_string()),
        ]);
        let row = EnrolleeImportRow::from_record(&record);
        assert_eq!(row.first_name, "Hauwa");
        assert_eq!(row.sex, "F");
        assert_eq!(row.email, None);
        assert_eq!(row.facility_code, "NS-PHC-01");
    }

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_sex("Male"), Some(Sex::Male));
        assert_eq!(parse_sex("x"), None);
        assert_eq!(parse_funding_type("BHCPF"), Some(FundingType::Bhcpf));
        assert_eq!(parse_funding_type("In-formal"), Some(FundingType::Informal));
        assert_eq!(parse_date("17/05/1990"), NaiveDate::from_ymd_opt(1990, 5, 17));
        assert_eq!(parse_date("1990-05-17"), NaiveDate::from_ymd_opt(1990, 5, 17));
        assert_eq!(parse_date("May 17"), None);
    }

    #[tokio::test]
    async fn test_non_numeric_nin_reported_alongside_other_errors() {
        use auth_rbac::AccessControl;
        use audit_engine::AuditEngine;
        use config_engine::EnrollmentSettings;
        use std::sync::Arc;

        let access = Arc::new(AccessControl::with_default_roles().await.unwrap());
        let service = EnrollmentService::in_memory(
            access,
            Arc::new(AuditEngine::new()),
            EnrollmentSettings::default(),
        );
        let record = HashMap::from([
            ("First Name".to_string(), "Musa".to_string()),
            ("Surname".to_string(), "Ndagi".to_string()),
            ("NIN".to_string(), "1234567890A".to_string()),
            ("Phone".to_string(), "08031234567".to_string()),
            ("Gender".to_string(), "unknown".to_string()),
            ("DOB".to_string(), "1990-05-17".to_string()),
            ("LGA".to_string(), "Bida".to_string()),
            ("HCP Code".to_string(), "NS-PHC-404".to_string()),
            ("Funding Type".to_string(), "Formal".to_string()),
        ]);

        let (report, ready) = EnrolleeImporter::new(&service).validate(&[record]).await.unwrap();
        assert!(ready.is_empty());
        let fields: Vec<&str> = report.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"sex"));
        assert!(fields.contains(&"facility_code"));
        let nin_errors: Vec<&RowError> = report.errors.iter().filter(|e| e.field == "nin").collect();
        assert_eq!(nin_errors.len(), 1);
        assert_eq!(nin_errors[0].message, "NIN must be exactly 11 digits");
        assert_eq!(nin_errors[0].row, 2);
    }
}
