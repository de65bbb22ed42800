//! Command implementations for the CLI
//!
//! SBIO pattern: Commands return the text to print, I/O is handled by caller

use std::collections::HashMap;

use thiserror::Error;
use tracing::info;

use super::display::{format_edge_cluster_list, format_gateway_list, format_json, format_outcome};
use super::{Cli, Commands, OutputFormat};
use crate::client::PolicyApi;
use crate::config::{load_file_config, ConfigError, Settings};
use crate::policy::{
    list_edge_clusters, list_gateways, reassign_edge_cluster, PolicyError, ReassignRequest,
};

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Policy(#[from] PolicyError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for commands
pub type CommandResult<T> = Result<T, CommandError>;

/// Build the run's settings from the config file, `env` and the flags
pub fn load_settings(cli: &Cli, env: &HashMap<String, String>) -> CommandResult<Settings> {
    let file = load_file_config(cli.config.as_deref())?;
    Ok(Settings::resolve(&cli.overrides(), env, &file)?)
}

/// Run one subcommand and return its output
pub async fn execute(
    command: &Commands,
    output: OutputFormat,
    settings: &Settings,
    api: &dyn PolicyApi,
) -> CommandResult<String> {
    match command {
        Commands::List => {
            let gateways = list_gateways(api).await?;
            match output {
                OutputFormat::Text => Ok(format_gateway_list(&gateways)),
                OutputFormat::Json => Ok(format_json(&gateways)?),
            }
        }

        Commands::ListEdgeClusters => {
            let clusters =
                list_edge_clusters(api, &settings.site, &settings.enforcement_point).await?;
            match output {
                OutputFormat::Text => Ok(format_edge_cluster_list(&clusters)),
                OutputFormat::Json => Ok(format_json(&clusters)?),
            }
        }

        Commands::ChangeEdgeCluster(args) => {
            info!(
                "Attaching {} to Tier-1 gateway {}",
                args.edge_cluster_path, args.gateway_id
            );
            let request = ReassignRequest::attach(&args.gateway_id, &args.edge_cluster_path)
                .with_locale_service(args.locale_service_id.as_deref());
            let outcome = reassign_edge_cluster(
                api,
                request,
                args.update.options(settings.overwrite_policy),
            )
            .await?;
            match output {
                OutputFormat::Text => Ok(format_outcome(&outcome, &settings.api_root())),
                OutputFormat::Json => Ok(format_json(&outcome)?),
            }
        }

        Commands::DetachEdgeCluster(args) => {
            info!("Detaching edge cluster from Tier-1 gateway {}", args.gateway_id);
            let request = ReassignRequest::detach(&args.gateway_id)
                .with_locale_service(args.locale_service_id.as_deref());
            let outcome = reassign_edge_cluster(
                api,
                request,
                args.update.options(settings.overwrite_policy),
            )
            .await?;
            match output {
                OutputFormat::Text => Ok(format_outcome(&outcome, &settings.api_root())),
                OutputFormat::Json => Ok(format_json(&outcome)?),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockPolicyApi;
    use clap::Parser;
    use serde_json::json;

    fn settings() -> Settings {
        Settings::new("nsx01", "admin", "secret")
    }

    async fn run(args: &[&str], api: &MockPolicyApi) -> CommandResult<String> {
        let cli = Cli::parse_from(args);
        execute(&cli.command, cli.output, &settings(), api).await
    }

    fn single_gateway_api() -> MockPolicyApi {
        MockPolicyApi::new()
            .with_document(
                "/tier-1s",
                json!({"results": [{"id": "t1-gw-01", "_protection": "NOT_PROTECTED"}]}),
            )
            .with_document(
                "/tier-1s/t1-gw-01",
                json!({"id": "t1-gw-01", "_protection": "NOT_PROTECTED"}),
            )
            .with_document(
                "/tier-1s/t1-gw-01/locale-services",
                json!({"results": [{"id": "ls-01", "_revision": 1}]}),
            )
            .with_document(
                "/tier-1s/t1-gw-01/locale-services/ls-01",
                json!({"id": "ls-01", "_revision": 1}),
            )
            .with_document("/tier-1s/t1-gw-01/nat", json!({"results": []}))
    }

    #[tokio::test]
    async fn test_list_text() {
        let api = single_gateway_api();
        let output = run(&["t1edge", "list"], &api).await.unwrap();
        assert!(output.contains("Tier-1 Gateway:  t1-gw-01"));
        assert!(output.contains("edge cluster: NONE"));
        assert!(output.contains("NAT Rules:     NONE"));
    }

    #[tokio::test]
    async fn test_list_json() {
        let api = single_gateway_api();
        let output = run(&["t1edge", "list", "--output", "json"], &api).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["id"], "t1-gw-01");
        assert_eq!(parsed[0]["locale_services"]["items"][0]["id"], "ls-01");
    }

    #[tokio::test]
    async fn test_list_edge_clusters_uses_configured_site() {
        let api = MockPolicyApi::new().with_document(
            "/sites/default/enforcement-points/default/edge-clusters",
            json!({"results": [{"id": "edge-cluster-01", "members": [{}, {}, {}]}]}),
        );
        let output = run(&["t1edge", "list-edge-clusters"], &api).await.unwrap();
        assert!(output.contains("Edge Cluster:  edge-cluster-01"));
        assert!(output.contains("Members:       3"));
    }

    #[tokio::test]
    async fn test_attach_prints_verification_hint() {
        let api = single_gateway_api();
        let output = run(
            &["t1edge", "attach-edge-cluster", "t1-gw-01", "/infra/ec-01"],
            &api,
        )
        .await
        .unwrap();
        assert!(output.contains("Attached edge cluster /infra/ec-01 to t1-gw-01/ls-01"));
        let hint = "Verify with: GET https://nsx01/policy/api/v1/infra\
                    /tier-1s/t1-gw-01/locale-services/ls-01";
        assert!(output.contains(hint));
    }

    #[tokio::test]
    async fn test_attach_without_locale_service_is_an_error() {
        let api = MockPolicyApi::new()
            .with_document("/tier-1s/t1-gw-02", json!({"id": "t1-gw-02"}))
            .with_document("/tier-1s/t1-gw-02/locale-services", json!({"results": []}));
        let result = run(
            &["t1edge", "change-edge-cluster", "t1-gw-02", "/infra/ec-01"],
            &api,
        )
        .await;
        match result {
            Err(CommandError::Policy(PolicyError::NoLocaleService(gw))) => {
                assert_eq!(gw, "t1-gw-02")
            }
            other => panic!("Expected NoLocaleService, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_detach_without_locale_service_succeeds() {
        let api = MockPolicyApi::new()
            .with_document("/tier-1s/t1-gw-02/locale-services", json!({"results": []}));
        let output = run(&["t1edge", "detach-edge-cluster", "t1-gw-02"], &api).await.unwrap();
        assert!(output.contains("nothing to detach"));
        assert!(api.mutations().is_empty());
    }

    #[test]
    fn test_load_settings_missing_config_file() {
        let cli = Cli::parse_from(["t1edge", "--config", "/nonexistent/t1edge.yaml", "list"]);
        let result = load_settings(&cli, &HashMap::new());
        assert!(matches!(
            result,
            Err(CommandError::Config(ConfigError::ConfigNotFound(_)))
        ));
    }

    #[test]
    fn test_load_settings_from_env() {
        let cli = Cli::parse_from(["t1edge", "--config", "/dev/null", "--site", "lab", "list"]);
        let env: HashMap<String, String> = [("NSX_PASSWORD", "pw"), ("NSX_HOST", "nsx02")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let settings = load_settings(&cli, &env).unwrap();
        assert_eq!(settings.host, "nsx02");
        assert_eq!(settings.site, "lab");
        assert_eq!(settings.password, "pw");
    }
}
