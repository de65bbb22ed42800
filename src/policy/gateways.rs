use serde_json::Value;
use tracing::{info, warn};

use super::model::{
    Gateway, GatewayReport, LocaleService, LocaleServiceSummary, LocaleServices, NatStatus,
};
use super::{paths, PolicyError, PolicyResult};
use crate::client::PolicyApi;

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Number of rules on a NAT rule page: `result_count`, else `results` length
pub fn rule_count(page: &Value) -> usize {
    if let Some(count) = page.get("result_count").and_then(Value::as_u64) {
        return count as usize;
    }
    page.get("results")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

fn summarize_locale_services(items: Vec<Value>) -> PolicyResult<LocaleServices> {
    if items.is_empty() {
        return Ok(LocaleServices::Empty);
    }
    let services = items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<LocaleService>(item)
                .map(LocaleServiceSummary::from)
                .map_err(|e| PolicyError::Malformed {
                    context: "locale service".to_string(),
                    message: e.to_string(),
                })
        })
        .collect::<PolicyResult<Vec<_>>>()?;
    Ok(LocaleServices::Found(services))
}

// ============================================================================
// I/O: calls through the policy API
// ============================================================================

/// NAT rule presence on a gateway.
///
/// `Present` as soon as one NAT service has a rule. A failed NAT listing is
/// `Unknown`; a failed rule fetch makes the result `Unknown` unless a later
/// service shows rules.
pub async fn nat_status(api: &dyn PolicyApi, gateway_id: &str) -> NatStatus {
    let services = match api.list(&paths::nat_services(gateway_id)).await {
        Ok(services) => services,
        Err(e) => {
            warn!("NAT lookup failed for {}: {}", gateway_id, e);
            return NatStatus::Unknown;
        }
    };

    let mut status = NatStatus::Absent;
    for service in &services {
        let Some(nat_id) = service.get("id").and_then(Value::as_str) else {
            status = NatStatus::Unknown;
            continue;
        };
        match api.get(&paths::nat_rules(gateway_id, nat_id)).await {
            Ok(page) if rule_count(&page) > 0 => return NatStatus::Present,
            Ok(_) => {}
            Err(e) => {
                warn!("NAT rule lookup failed for {}/{}: {}", gateway_id, nat_id, e);
                status = NatStatus::Unknown;
            }
        }
    }
    status
}

/// Report every Tier-1 gateway with its locale services and NAT status.
///
/// Failing to list the gateways fails the report. A gateway whose locale
/// services cannot be fetched or read is reported with the error and the
/// listing carries on.
pub async fn list_gateways(api: &dyn PolicyApi) -> PolicyResult<Vec<GatewayReport>> {
    let docs = api.list(paths::TIER1S).await?;
    info!("Found {} Tier-1 gateways", docs.len());

    let mut reports = Vec::with_capacity(docs.len());
    for doc in docs {
        let gateway: Gateway =
            serde_json::from_value(doc).map_err(|e| PolicyError::Malformed {
                context: "Tier-1 gateway".to_string(),
                message: e.to_string(),
            })?;

        let locale_services = match api.list(&paths::locale_services(&gateway.id)).await {
            Ok(items) => summarize_locale_services(items).unwrap_or_else(|e| {
                warn!("Unreadable locale services on {}: {}", gateway.id, e);
                LocaleServices::Error(e.to_string())
            }),
            Err(e) => {
                warn!("Locale service lookup failed for {}: {}", gateway.id, e);
                LocaleServices::Error(e.to_string())
            }
        };

        let nat = nat_status(api, &gateway.id).await;

        reports.push(GatewayReport {
            display_name: gateway.display_name.unwrap_or_else(|| gateway.id.clone()),
            protection: gateway.protection,
            locale_services,
            nat,
            id: gateway.id,
        });
    }

    Ok(reports)
}
