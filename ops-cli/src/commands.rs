use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use audit_engine::AuditEngine;
use auth_rbac::{AccessControl, Actor};
use config_engine::NicareConfig;
use enrollment_service::{
    EnrolleeImporter, EnrollmentService, ImportReport, NewFacility, PremiumBatch, PremiumType,
};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::cli::{Cli, Command, ConfigCommand, ImportCommand, PinsCommand};

const OPERATOR: &str = "nicare-cli";

/// Execute a parsed command and return what should be printed
pub async fn run(cli: &Cli, config: &NicareConfig) -> Result<String> {
    match &cli.command {
        Command::Config(ConfigCommand::Show) => Ok(config.to_yaml()?),
        Command::Import(ImportCommand::Validate(args)) => {
            let report = validate_import(config, &args.file, args.facilities.as_deref()).await?;
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Command::Pins(PinsCommand::Generate(args)) => {
            let premium_type = if args.family {
                PremiumType::Family
            } else {
                PremiumType::Individual
            };
            let batch = generate_pins(config, args.count, args.amount, premium_type).await?;
            Ok(serde_json::to_string_pretty(&batch)?)
        }
    }
}

/// Services wired to in-memory stores, with a single all-powerful operator
struct Workspace {
    service: EnrollmentService,
    operator: Actor,
}

impl Workspace {
    async fn new(config: &NicareConfig) -> Result<Self> {
        let access = Arc::new(AccessControl::with_default_roles().await?);
        let operator = Actor::new(OPERATOR);
        access.assign_role(operator.user_id, "super_admin").await?;
        let audit = Arc::new(AuditEngine::new());
        let service = EnrollmentService::in_memory(access, audit, config.enrollment.clone());
        Ok(Self { service, operator })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

pub async fn validate_import(
    config: &NicareConfig,
    rows_path: &Path,
    facilities_path: Option<&Path>,
) -> Result<ImportReport> {
    let workspace = Workspace::new(config).await?;

    if let Some(path) = facilities_path {
        let facilities: Vec<NewFacility> = read_json(path)?;
        for facility in facilities {
            let code = facility.hcp_code.clone();
            workspace
                .service
                .register_facility(&workspace.operator, facility)
                .await
                .with_context(|| format!("facility {code} could not be registered"))?;
        }
        debug!(path = %path.display(), "facilities loaded");
    }

    let rows: Vec<HashMap<String, String>> = read_json(rows_path)?;
    let (report, _) = EnrolleeImporter::new(&workspace.service).validate(&rows).await?;
    info!(
        total = report.total_rows,
        valid = report.valid_rows,
        errors = report.errors.len(),
        "import validated"
    );
    Ok(report)
}

pub async fn generate_pins(
    config: &NicareConfig,
    count: usize,
    amount: Decimal,
    premium_type: PremiumType,
) -> Result<PremiumBatch> {
    let workspace = Workspace::new(config).await?;
    let batch = workspace
        .service
        .generate_batch(&workspace.operator, count, amount, premium_type)
        .await?;
    info!(batch_id = %batch.batch_id, count = batch.premiums.len(), "pins generated");
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(value: serde_json::Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{value}").unwrap();
        file
    }

    fn row(nin: &str, facility: &str) -> serde_json::Value {
        serde_json::json!({
            "First Name": "Aisha",
            "Surname": "Garba",
            "NIN": nin,
            "Phone": "08051234567",
            "Gender": "F",
            "DOB": "12/02/1988",
            "LGA": "Bida",
            "HCP Code": facility,
            "Funding Type": "BHCPF",
        })
    }

    #[tokio::test]
    async fn test_validate_import_against_facility_file() {
        let facilities = json_file(serde_json::json!([{
            "hcp_code": "NS-PHC-001",
            "name": "Bida PHC",
            "level_of_care": "primary",
            "lga": "Bida",
        }]));
        let rows = json_file(serde_json::json!([
            row("11111111111", "NS-PHC-001"),
            row("1234", "NS-PHC-001"),
        ]));

        let report = validate_import(&NicareConfig::default(), rows.path(), Some(facilities.path()))
            .await
            .unwrap();

        assert_eq!(report.total_rows, 2);
        assert_eq!(report.valid_rows, 1);
        assert!(report.imported.is_empty());
        assert!(report.errors.iter().all(|e| e.row == 3));
        assert!(report.errors.iter().any(|e| e.field == "nin"));
    }

    #[tokio::test]
    async fn test_validate_import_without_facilities_flags_codes() {
        let rows = json_file(serde_json::json!([row("11111111111", "NS-PHC-001")]));
        let report = validate_import(&NicareConfig::default(), rows.path(), None).await.unwrap();
        assert_eq!(report.valid_rows, 0);
        assert_eq!(report.errors[0].field, "facility_code");
    }

    #[tokio::test]
    async fn test_unreadable_rows_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("rows.json");
        let err = validate_import(&NicareConfig::default(), &missing, None).await.unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[tokio::test]
    async fn test_generate_pins_uses_configured_length() {
        let config = NicareConfig::default();
        let batch = generate_pins(&config, 3, Decimal::new(12_000, 0), PremiumType::Family)
            .await
            .unwrap();
        assert_eq!(batch.premiums.len(), 3);
        assert_eq!(batch.total_value, Decimal::new(36_000, 0));
        assert!(batch
            .premiums
            .iter()
            .all(|p| p.pin.len() == config.enrollment.pin_length && p.premium_type == PremiumType::Family));
    }

    #[tokio::test]
    async fn test_generate_pins_rejects_zero_amount() {
        let result = generate_pins(&NicareConfig::default(), 1, Decimal::ZERO, PremiumType::Individual).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_run_config_show_prints_yaml() {
        let cli = Cli::try_parse_from(["nicare", "config", "show"]).unwrap();
        let output = run(&cli, &NicareConfig::default()).await.unwrap();
        assert!(output.contains("referral_validity_days: 30"));
    }
}
