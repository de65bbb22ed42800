use tracing::{debug, warn};

use super::model::Protection;
use crate::client::PolicyApi;

/// Fetch `path` and read its protection classification.
///
/// Never fails: a missing field or a failed fetch both yield `Unknown`.
pub async fn inspect_protection(api: &dyn PolicyApi, path: &str) -> Protection {
    match api.get(path).await {
        Ok(doc) => {
            let protection = Protection::from_document(&doc);
            debug!("{} protection: {}", path, protection);
            protection
        }
        Err(e) => {
            warn!("Could not read protection of {}: {}", path, e);
            Protection::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockPolicyApi;
    use serde_json::json;

    #[tokio::test]
    async fn test_inspect_protected_object() {
        let api = MockPolicyApi::new().with_document(
            "/tier-1s/t1-gw-01",
            json!({"id": "t1-gw-01", "_protection": "REQUIRE_OVERRIDE"}),
        );
        assert_eq!(
            inspect_protection(&api, "/tier-1s/t1-gw-01").await,
            Protection::RequireOverride
        );
    }

    #[tokio::test]
    async fn test_inspect_missing_field() {
        let api = MockPolicyApi::new()
            .with_document("/tier-1s/t1-gw-01", json!({"id": "t1-gw-01"}));
        assert_eq!(
            inspect_protection(&api, "/tier-1s/t1-gw-01").await,
            Protection::Unknown
        );
    }

    #[tokio::test]
    async fn test_inspect_failed_fetch() {
        let api = MockPolicyApi::new().with_failure("/tier-1s/t1-gw-01");
        assert_eq!(
            inspect_protection(&api, "/tier-1s/t1-gw-01").await,
            Protection::Unknown
        );
    }
}
