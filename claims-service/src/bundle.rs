use auth_rbac::{permissions, Actor};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::error::{ClaimsError, ClaimsResult};
use crate::models::{Bundle, ItemType, NewBundle};
use crate::service::ClaimsAutomation;

fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Active bundle covering a diagnosis.
///
/// An exact ICD-10 match wins; otherwise the bundle with the longest code
/// that prefixes the diagnosis (`O80` covers `O80.1`). Ties go to the
/// lowest bundle code so the result does not depend on iteration order.
pub fn match_bundle<'a>(
    bundles: impl IntoIterator<Item = &'a Bundle>,
    diagnosis_code: &str,
) -> Option<&'a Bundle> {
    let diagnosis = normalize_code(diagnosis_code);
    if diagnosis.is_empty() {
        return None;
    }

    bundles
        .into_iter()
        .filter(|b| b.active)
        .filter_map(|bundle| {
            let score = bundle
                .diagnosis_codes
                .iter()
                .map(|c| normalize_code(c))
                .filter_map(|code| {
                    if code == diagnosis {
                        Some(usize::MAX)
                    } else if !code.is_empty() && diagnosis.starts_with(&code) {
                        Some(code.len())
                    } else {
                        None
                    }
                })
                .max()?;
            Some((score, bundle))
        })
        .max_by(|(sa, a), (sb, b)| sa.cmp(sb).then_with(|| b.code.cmp(&a.code)))
        .map(|(_, bundle)| bundle)
}

/// Payment route for a service given the admission's bundle
pub fn classify(service_code: &str, bundle: Option<&Bundle>) -> ItemType {
    match bundle {
        Some(b) if b.includes(service_code) => ItemType::Bundle,
        _ => ItemType::Ffs,
    }
}

impl ClaimsAutomation {
    pub async fn create_bundle(&self, actor: &Actor, input: NewBundle) -> ClaimsResult<Bundle> {
        self.access.authorize(actor, permissions::BUNDLES_MANAGE).await?;

        let code = normalize_code(&input.code);
        if code.is_empty() {
            return Err(ClaimsError::field("code", "Bundle code is required"));
        }
        if input.name.trim().is_empty() {
            return Err(ClaimsError::field("name", "Bundle name is required"));
        }
        if input.price <= Decimal::ZERO {
            return Err(ClaimsError::field("price", "Bundle price must be positive"));
        }
        let diagnosis_codes: Vec<String> = input
            .diagnosis_codes
            .iter()
            .map(|c| normalize_code(c))
            .filter(|c| !c.is_empty())
            .collect();
        if diagnosis_codes.is_empty() {
            return Err(ClaimsError::field(
                "diagnosis_codes",
                "A bundle must cover at least one diagnosis",
            ));
        }

        let bundle = Bundle {
            id: Uuid::new_v4(),
            code,
            name: input.name.trim().to_string(),
            diagnosis_codes,
            included_services: input
                .included_services
                .iter()
                .map(|s| normalize_code(s))
                .filter(|s| !s.is_empty())
                .collect(),
            price: input.price,
            active: true,
        };

        let created = self.store.transaction(|state| {
            if state.bundles.values().any(|b| b.code == bundle.code) {
                return Err(ClaimsError::Conflict(format!(
                    "Bundle {} already exists",
                    bundle.code
                )));
            }
            state.bundles.insert(bundle.id, bundle.clone());
            Ok(bundle)
        })?;

        self.record(
            actor,
            "bundle.created",
            "bundle",
            created.id,
            json!({ "code": created.code, "price": created.price }),
        )
        .await?;
        info!(bundle = %created.code, "bundle created");
        Ok(created)
    }

    pub async fn deactivate_bundle(&self, actor: &Actor, bundle_id: Uuid) -> ClaimsResult<Bundle> {
        self.access.authorize(actor, permissions::BUNDLES_MANAGE).await?;
        let bundle = self.store.transaction(|state| {
            let bundle = state
                .bundles
                .get_mut(&bundle_id)
                .ok_or_else(|| ClaimsError::not_found("Bundle", bundle_id))?;
            bundle.active = false;
            Ok(bundle.clone())
        })?;
        self.record(actor, "bundle.deactivated", "bundle", bundle_id, json!({})).await?;
        Ok(bundle)
    }

    pub fn bundles(&self) -> Vec<Bundle> {
        let mut bundles: Vec<Bundle> = self.store.read(|s| s.bundles.values().cloned().collect());
        bundles.sort_by(|a, b| a.code.cmp(&b.code));
        bundles
    }

    /// Bundle that would be attached to an admission for this diagnosis
    pub fn match_bundle(&self, diagnosis_code: &str) -> Option<Bundle> {
        self.store
            .read(|s| match_bundle(s.bundles.values(), diagnosis_code).cloned())
    }
}
