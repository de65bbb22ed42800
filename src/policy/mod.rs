//! Tier-1 gateway operations over the policy API
//!
//! Every function takes a [`PolicyApi`](crate::client::PolicyApi) so the
//! decision logic runs the same against the real manager and the test mock.

pub mod edge_clusters;
pub mod gateways;
pub mod model;
pub mod paths;
pub mod protection;
pub mod reassign;

use thiserror::Error;

use crate::client::ApiError;

pub use edge_clusters::list_edge_clusters;
pub use gateways::{list_gateways, nat_status, rule_count};
pub use model::{
    EdgeCluster, EdgeClusterReport, Gateway, GatewayReport, LocaleService, LocaleServiceSummary,
    LocaleServices, NatStatus, Protection,
};
pub use protection::inspect_protection;
pub use reassign::{
    build_update, reassign_edge_cluster, strip_hyperlinks, Outcome, OverwritePolicy,
    ReassignOptions, ReassignRequest, UpdateMethod,
};

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("No locale service found for Tier-1 gateway '{0}'")]
    NoLocaleService(String),

    #[error("Malformed {context}: {message}")]
    Malformed { context: String, message: String },

    #[error("Verification failed for {path}: expected edge cluster {expected}, found {actual}")]
    VerificationFailed {
        path: String,
        expected: String,
        actual: String,
    },
}

pub type PolicyResult<T> = Result<T, PolicyError>;
