//! Resource paths relative to the policy API root
//!
//! Ids are percent-encoded so a `?`, `#` or `/` in an id stays inside its
//! own path segment.

use std::borrow::Cow;

pub const TIER1S: &str = "/tier-1s";

fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

pub fn tier1(gateway_id: &str) -> String {
    format!("{}/{}", TIER1S, segment(gateway_id))
}

pub fn locale_services(gateway_id: &str) -> String {
    format!("{}/locale-services", tier1(gateway_id))
}

pub fn locale_service(gateway_id: &str, locale_service_id: &str) -> String {
    format!("{}/{}", locale_services(gateway_id), segment(locale_service_id))
}

pub fn nat_services(gateway_id: &str) -> String {
    format!("{}/nat", tier1(gateway_id))
}

pub fn nat_rules(gateway_id: &str, nat_id: &str) -> String {
    format!("{}/{}/nat-rules", nat_services(gateway_id), segment(nat_id))
}

pub fn edge_clusters(site: &str, enforcement_point: &str) -> String {
    format!(
        "/sites/{}/enforcement-points/{}/edge-clusters",
        segment(site),
        segment(enforcement_point)
    )
}
