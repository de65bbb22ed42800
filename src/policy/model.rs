use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Wire name of the protection classification on policy objects
pub const PROTECTION_FIELD: &str = "_protection";

/// Wire name of a locale service's edge-cluster reference
pub const EDGE_CLUSTER_PATH_FIELD: &str = "edge_cluster_path";

/// Whether tooling may modify an object without the overwrite header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Protection {
    #[serde(rename = "NONE")]
    NotProtected,
    #[serde(rename = "PROTECTED")]
    Protected,
    #[serde(rename = "REQUIRE_OVERRIDE")]
    RequireOverride,
    /// Field absent, unrecognised, or the object could not be fetched
    #[default]
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Protection {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "NOT_PROTECTED" | "NONE" => Protection::NotProtected,
            "PROTECTED" => Protection::Protected,
            "REQUIRE_OVERRIDE" => Protection::RequireOverride,
            _ => Protection::Unknown,
        }
    }

    pub fn from_document(doc: &Value) -> Self {
        doc.get(PROTECTION_FIELD)
            .and_then(Value::as_str)
            .map(Protection::parse)
            .unwrap_or_default()
    }

    pub fn requires_override(self) -> bool {
        matches!(self, Protection::Protected | Protection::RequireOverride)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Protection::NotProtected => "NONE",
            Protection::Protected => "PROTECTED",
            Protection::RequireOverride => "REQUIRE_OVERRIDE",
            Protection::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Protection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(raw.as_str().map(Protection::parse).unwrap_or_default())
    }
}

/// NAT rule presence on a gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NatStatus {
    #[serde(rename = "PRESENT")]
    Present,
    #[serde(rename = "NONE")]
    Absent,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl fmt::Display for NatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NatStatus::Present => "PRESENT",
            NatStatus::Absent => "NONE",
            NatStatus::Unknown => "UNKNOWN",
        })
    }
}

// ============================================================================
// Documents as returned by the policy API (only the fields we read)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Gateway {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(rename = "_protection", default)]
    pub protection: Protection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocaleService {
    pub id: String,
    #[serde(rename = "_protection", default)]
    pub protection: Protection,
    #[serde(default)]
    pub edge_cluster_path: Option<String>,
}

impl LocaleService {
    /// The bound edge cluster; an empty path counts as none
    pub fn edge_cluster(&self) -> Option<&str> {
        self.edge_cluster_path.as_deref().filter(|p| !p.is_empty())
    }
}

/// Edge-cluster reference of a raw locale-service document
pub fn edge_cluster_path_of(doc: &Value) -> Option<&str> {
    doc.get(EDGE_CLUSTER_PATH_FIELD)
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeCluster {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub members: Option<Vec<Value>>,
    #[serde(default)]
    pub member_count: Option<usize>,
}

impl EdgeCluster {
    /// Length of `members`, falling back to `member_count`
    pub fn members(&self) -> usize {
        match &self.members {
            Some(members) => members.len(),
            None => self.member_count.unwrap_or(0),
        }
    }
}

// ============================================================================
// Reports handed to the display layer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocaleServiceSummary {
    pub id: String,
    pub protection: Protection,
    pub edge_cluster_path: Option<String>,
}

impl From<LocaleService> for LocaleServiceSummary {
    fn from(ls: LocaleService) -> Self {
        let edge_cluster_path = ls.edge_cluster().map(str::to_string);
        Self {
            id: ls.id,
            protection: ls.protection,
            edge_cluster_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "items", rename_all = "snake_case")]
pub enum LocaleServices {
    Empty,
    Found(Vec<LocaleServiceSummary>),
    /// The locale-service fetch failed; the message is shown in place
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayReport {
    pub id: String,
    pub display_name: String,
    pub protection: Protection,
    pub locale_services: LocaleServices,
    pub nat: NatStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeClusterReport {
    pub id: String,
    pub display_name: String,
    pub path: String,
    pub member_count: usize,
}

impl From<EdgeCluster> for EdgeClusterReport {
    fn from(ec: EdgeCluster) -> Self {
        let member_count = ec.members();
        Self {
            display_name: ec.display_name.unwrap_or_else(|| ec.id.clone()),
            path: ec.path.unwrap_or_default(),
            member_count,
            id: ec.id,
        }
    }
}
