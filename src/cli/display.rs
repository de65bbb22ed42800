//! Display formatting for CLI output
//!
//! SBIO pattern: Pure functions that format data for display

use serde::Serialize;

use crate::client::OVERWRITE_HEADER;
use crate::policy::{EdgeClusterReport, GatewayReport, LocaleServices, Outcome};

/// Line printed after each listed object
pub const SEPARATOR: &str = "----------------------------------------";

const NONE: &str = "NONE";

// ============================================================================
// Gateway display
// ============================================================================

/// Format the Tier-1 gateway report, one block per gateway
pub fn format_gateway_list(gateways: &[GatewayReport]) -> String {
    if gateways.is_empty() {
        return "No Tier-1 gateways found.\n".to_string();
    }

    let mut output = String::new();
    for gw in gateways {
        output.push_str(&format!("Tier-1 Gateway:  {}\n", gw.id));
        output.push_str(&format!("  Display Name:  {}\n", gw.display_name));
        output.push_str(&format!("  Protection:    {}\n", gw.protection));

        match &gw.locale_services {
            LocaleServices::Empty => {
                output.push_str(&format!("  Locale Services: {}\n", NONE));
            }
            LocaleServices::Found(services) => {
                output.push_str("  Locale Services:\n");
                for ls in services {
                    output.push_str(&format!(
                        "    - {} (protection: {}) edge cluster: {}\n",
                        ls.id,
                        ls.protection,
                        ls.edge_cluster_path.as_deref().unwrap_or(NONE)
                    ));
                }
            }
            LocaleServices::Error(message) => {
                output.push_str(&format!("  Locale Services: UNKNOWN ({})\n", message));
            }
        }

        output.push_str(&format!("  NAT Rules:     {}\n", gw.nat));
        output.push_str(SEPARATOR);
        output.push('\n');
    }
    output
}

// ============================================================================
// Edge cluster display
// ============================================================================

pub fn format_edge_cluster_list(clusters: &[EdgeClusterReport]) -> String {
    if clusters.is_empty() {
        return "No edge clusters found.\n".to_string();
    }

    let mut output = String::new();
    for ec in clusters {
        output.push_str(&format!("Edge Cluster:  {}\n", ec.id));
        output.push_str(&format!("  Display Name:  {}\n", ec.display_name));
        output.push_str(&format!("  Path:          {}\n", ec.path));
        output.push_str(&format!("  Members:       {}\n", ec.member_count));
        output.push_str(SEPARATOR);
        output.push('\n');
    }
    output
}

// ============================================================================
// Reassignment display
// ============================================================================

/// Result of an attach/detach, with a hint on how to check it
pub fn format_outcome(outcome: &Outcome, api_root: &str) -> String {
    match outcome {
        Outcome::NothingToDetach { gateway_id } => format!(
            "Tier-1 gateway {} has no locale service; nothing to detach.\n",
            gateway_id
        ),
        Outcome::Updated {
            gateway_id,
            locale_service_id,
            path,
            edge_cluster_path,
            forced_overwrite,
            verified,
        } => {
            let mut output = match edge_cluster_path {
                Some(ec) => format!(
                    "Attached edge cluster {} to {}/{}\n",
                    ec, gateway_id, locale_service_id
                ),
                None => format!(
                    "Detached edge cluster from {}/{}\n",
                    gateway_id, locale_service_id
                ),
            };
            if *forced_overwrite {
                output.push_str(&format!("  (sent with {}: true)\n", OVERWRITE_HEADER));
            }
            if *verified {
                output.push_str("  Verified by reading the locale service back.\n");
            } else {
                output.push_str(&format!("  Verify with: GET {}{}\n", api_root, path));
            }
            output
        }
    }
}

/// Pretty JSON for `--output json`
pub fn format_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut rendered = serde_json::to_string_pretty(value)?;
    rendered.push('\n');
    Ok(rendered)
}
