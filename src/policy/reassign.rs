//! Attach or detach the edge cluster of a Tier-1 gateway's locale service
//!
//! The workflow:
//!
//! 1. Resolve the locale service. Without an explicit id the first one in
//!    API response order is used. No locale service at all fails an attach
//!    but makes a detach a successful no-op.
//! 2. Fetch the full locale-service document so the write carries every
//!    field the manager expects, `_revision` included.
//! 3. Read the protection flags of the gateway and the locale service.
//! 4. Decide on the overwrite header from the [`OverwritePolicy`].
//! 5. Set or clear `edge_cluster_path`, drop hyperlink metadata.
//! 6. Submit with PUT or PATCH. No retry, no rollback.

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::model::{edge_cluster_path_of, Protection, EDGE_CLUSTER_PATH_FIELD};
use super::protection::inspect_protection;
use super::{paths, PolicyError, PolicyResult};
use crate::client::PolicyApi;

/// Keys the manager returns on reads but rejects on write-back
const HYPERLINK_KEYS: &[&str] = &["_links", "_self"];

/// When to send the overwrite header on the update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Only when the gateway or locale service is protected
    #[default]
    Protected,
    /// On every update
    Always,
}

impl OverwritePolicy {
    pub fn forces_overwrite(self, gateway: Protection, locale_service: Protection) -> bool {
        match self {
            OverwritePolicy::Always => true,
            OverwritePolicy::Protected => {
                gateway.requires_override() || locale_service.requires_override()
            }
        }
    }
}

impl FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "protected" => Ok(OverwritePolicy::Protected),
            "always" => Ok(OverwritePolicy::Always),
            other => Err(format!("unknown overwrite policy '{}'", other)),
        }
    }
}

impl fmt::Display for OverwritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OverwritePolicy::Protected => "protected",
            OverwritePolicy::Always => "always",
        })
    }
}

/// How the updated document is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMethod {
    /// Full-document replace
    #[default]
    Put,
    Patch,
}

impl From<UpdateMethod> for Method {
    fn from(method: UpdateMethod) -> Self {
        match method {
            UpdateMethod::Put => Method::PUT,
            UpdateMethod::Patch => Method::PATCH,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReassignRequest<'a> {
    pub gateway_id: &'a str,
    /// `None` detaches
    pub edge_cluster_path: Option<&'a str>,
    pub locale_service_id: Option<&'a str>,
}

impl<'a> ReassignRequest<'a> {
    pub fn attach(gateway_id: &'a str, edge_cluster_path: &'a str) -> Self {
        Self {
            gateway_id,
            edge_cluster_path: Some(edge_cluster_path),
            locale_service_id: None,
        }
    }

    pub fn detach(gateway_id: &'a str) -> Self {
        Self {
            gateway_id,
            edge_cluster_path: None,
            locale_service_id: None,
        }
    }

    pub fn with_locale_service(mut self, locale_service_id: Option<&'a str>) -> Self {
        self.locale_service_id = locale_service_id;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReassignOptions {
    pub overwrite_policy: OverwritePolicy,
    pub method: UpdateMethod,
    /// Read the locale service back and compare the edge-cluster reference
    pub verify: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Updated {
        gateway_id: String,
        locale_service_id: String,
        /// Path of the updated locale service, relative to the API root
        path: String,
        edge_cluster_path: Option<String>,
        forced_overwrite: bool,
        verified: bool,
    },
    /// Detach requested on a gateway without locale services
    NothingToDetach { gateway_id: String },
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Remove hyperlink metadata at every level of a document
pub fn strip_hyperlinks(doc: &mut Value) {
    match doc {
        Value::Object(map) => {
            for key in HYPERLINK_KEYS {
                map.remove(*key);
            }
            map.values_mut().for_each(strip_hyperlinks);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_hyperlinks),
        _ => {}
    }
}

/// The locale-service document to submit: `current` with the edge-cluster
/// reference set (or nulled for a detach) and hyperlinks stripped
pub fn build_update(mut current: Value, edge_cluster_path: Option<&str>) -> PolicyResult<Value> {
    strip_hyperlinks(&mut current);
    let Value::Object(map) = &mut current else {
        return Err(PolicyError::Malformed {
            context: "locale service".to_string(),
            message: "document is not a JSON object".to_string(),
        });
    };
    let reference = match edge_cluster_path {
        Some(path) => Value::String(path.to_string()),
        None => Value::Null,
    };
    map.insert(EDGE_CLUSTER_PATH_FIELD.to_string(), reference);
    Ok(current)
}

// ============================================================================
// I/O: calls through the policy API
// ============================================================================

/// First locale service of a gateway in API response order
async fn first_locale_service(
    api: &dyn PolicyApi,
    gateway_id: &str,
) -> PolicyResult<Option<String>> {
    let items = api.list(&paths::locale_services(gateway_id)).await?;
    match items.first() {
        None => Ok(None),
        Some(item) => item
            .get("id")
            .and_then(Value::as_str)
            .map(|id| Some(id.to_string()))
            .ok_or_else(|| PolicyError::Malformed {
                context: "locale service".to_string(),
                message: "missing field `id`".to_string(),
            }),
    }
}

pub async fn reassign_edge_cluster(
    api: &dyn PolicyApi,
    request: ReassignRequest<'_>,
    options: ReassignOptions,
) -> PolicyResult<Outcome> {
    let gateway_id = request.gateway_id;

    let locale_service_id = match request.locale_service_id {
        Some(id) => id.to_string(),
        None => match first_locale_service(api, gateway_id).await? {
            Some(id) => {
                info!("Using locale service '{}' of {}", id, gateway_id);
                id
            }
            None if request.edge_cluster_path.is_none() => {
                info!("{} has no locale service, nothing to detach", gateway_id);
                return Ok(Outcome::NothingToDetach {
                    gateway_id: gateway_id.to_string(),
                });
            }
            None => return Err(PolicyError::NoLocaleService(gateway_id.to_string())),
        },
    };

    let path = paths::locale_service(gateway_id, &locale_service_id);
    let current = api.get(&path).await?;

    let gateway_protection = inspect_protection(api, &paths::tier1(gateway_id)).await;
    let locale_protection = Protection::from_document(&current);
    let forced_overwrite = options
        .overwrite_policy
        .forces_overwrite(gateway_protection, locale_protection);
    info!(
        "Protection: gateway {}, locale service {}; overwrite header: {}",
        gateway_protection, locale_protection, forced_overwrite
    );

    let update = build_update(current, request.edge_cluster_path)?;
    api.mutate(options.method.into(), &path, &update, forced_overwrite)
        .await?;

    if options.verify {
        let readback = api.get(&path).await?;
        let actual = edge_cluster_path_of(&readback);
        if actual != request.edge_cluster_path {
            return Err(PolicyError::VerificationFailed {
                path,
                expected: request.edge_cluster_path.unwrap_or("none").to_string(),
                actual: actual.unwrap_or("none").to_string(),
            });
        }
    }

    Ok(Outcome::Updated {
        gateway_id: gateway_id.to_string(),
        locale_service_id,
        path,
        edge_cluster_path: request.edge_cluster_path.map(str::to_string),
        forced_overwrite,
        verified: options.verify,
    })
}
