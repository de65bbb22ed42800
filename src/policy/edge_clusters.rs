use tracing::info;

use super::model::{EdgeCluster, EdgeClusterReport};
use super::{paths, PolicyError, PolicyResult};
use crate::client::PolicyApi;

/// Every edge cluster of a site's enforcement point, in API order
pub async fn list_edge_clusters(
    api: &dyn PolicyApi,
    site: &str,
    enforcement_point: &str,
) -> PolicyResult<Vec<EdgeClusterReport>> {
    let docs = api.list(&paths::edge_clusters(site, enforcement_point)).await?;
    info!(
        "Found {} edge clusters at {}/{}",
        docs.len(),
        site,
        enforcement_point
    );

    docs.into_iter()
        .map(|doc| {
            serde_json::from_value::<EdgeCluster>(doc)
                .map(EdgeClusterReport::from)
                .map_err(|e| PolicyError::Malformed {
                    context: "edge cluster".to_string(),
                    message: e.to_string(),
                })
        })
        .collect()
}
