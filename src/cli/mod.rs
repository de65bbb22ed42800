//! CLI module for t1edge
//!
//! Subcommands:
//! - `t1edge list` - Tier-1 gateways with protection, locale services and NAT
//! - `t1edge list-edge-clusters` - Edge clusters of the configured enforcement point
//! - `t1edge change-edge-cluster` (alias `attach-edge-cluster`) - Bind an edge cluster
//! - `t1edge detach-edge-cluster` - Clear the edge cluster binding

use clap::builder::NonEmptyStringValueParser;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Overrides;
use crate::policy::{OverwritePolicy, ReassignOptions, UpdateMethod};

mod commands;
mod display;

pub use commands::*;
pub use display::*;

#[derive(Parser, Debug)]
#[command(name = "t1edge")]
#[command(about = "Inspect Tier-1 gateways and reassign their edge clusters")]
#[command(version)]
pub struct Cli {
    /// Record every request and response in the diagnostic log
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Diagnostic log file (default: t1edge-debug.log)
    #[arg(long, value_name = "FILE", global = true)]
    pub debug_log: Option<PathBuf>,

    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: ~/.t1edge/config.yaml)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Path to a .env file to load before reading NSX_* variables
    #[arg(long, value_name = "FILE", global = true)]
    pub env_file: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format for listings
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Manager connection flags; each overrides its NSX_* variable
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Manager host name or URL
    #[arg(long, global = true)]
    pub host: Option<String>,

    #[arg(long, global = true)]
    pub username: Option<String>,

    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Site of the edge clusters
    #[arg(long, global = true)]
    pub site: Option<String>,

    /// Enforcement point of the edge clusters
    #[arg(long, global = true)]
    pub enforcement_point: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Extra attempts for failed GET requests
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List Tier-1 gateways with protection, locale services and NAT status
    List,

    /// List edge clusters of the configured site and enforcement point
    #[command(name = "list-edge-clusters")]
    ListEdgeClusters,

    /// Bind an edge cluster to a gateway's locale service
    #[command(name = "change-edge-cluster", visible_alias = "attach-edge-cluster")]
    ChangeEdgeCluster(AttachArgs),

    /// Remove the edge cluster binding of a gateway's locale service
    #[command(name = "detach-edge-cluster")]
    DetachEdgeCluster(DetachArgs),
}

#[derive(Parser, Debug)]
pub struct AttachArgs {
    /// Tier-1 gateway id
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub gateway_id: String,

    /// Edge cluster policy path
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub edge_cluster_path: String,

    /// Locale service id (default: the gateway's first locale service)
    pub locale_service_id: Option<String>,

    #[command(flatten)]
    pub update: UpdateArgs,
}

#[derive(Parser, Debug)]
pub struct DetachArgs {
    /// Tier-1 gateway id
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub gateway_id: String,

    /// Locale service id (default: the gateway's first locale service)
    pub locale_service_id: Option<String>,

    #[command(flatten)]
    pub update: UpdateArgs,
}

/// Options shared by attach and detach
#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// Send a partial update (PATCH) instead of a full replace (PUT)
    #[arg(long)]
    pub patch: bool,

    /// Read the locale service back and check the binding
    #[arg(long)]
    pub verify: bool,

    /// When to send the overwrite header (default: protected)
    #[arg(long, value_enum)]
    pub overwrite_policy: Option<OverwritePolicy>,
}

impl UpdateArgs {
    pub fn options(&self, default_policy: OverwritePolicy) -> ReassignOptions {
        ReassignOptions {
            overwrite_policy: self.overwrite_policy.unwrap_or(default_policy),
            method: if self.patch {
                UpdateMethod::Patch
            } else {
                UpdateMethod::Put
            },
            verify: self.verify,
        }
    }
}

impl Cli {
    /// The command-line layer of the settings
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.connection.host.clone(),
            username: self.connection.username.clone(),
            password: self.connection.password.clone(),
            site: self.connection.site.clone(),
            enforcement_point: self.connection.enforcement_point.clone(),
            debug: self.debug,
            debug_log: self.debug_log.clone(),
            insecure: self.connection.insecure,
            timeout: self.connection.timeout,
            max_retries: self.connection.max_retries,
        }
    }
}
