use clap::{Args, Parser, Subcommand};

use almaseo_refresh::Transport;

#[derive(Parser)]
#[command(
    name = "almaseo",
    version,
    about = "AlmaSEO health status from the command line"
)]
pub struct Cli {
    #[command(flatten)]
    pub site: SiteArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch the health score of a post once
    Health(HealthArgs),
    /// Re-check a post periodically and print each accepted result
    Watch(WatchArgs),
}

/// Connection flags; unset values fall back to the ALMASEO_* environment.
#[derive(Args, Clone, Debug, Default)]
pub struct SiteArgs {
    /// WordPress site root, e.g. https://example.com
    #[arg(long, global = true, env = "ALMASEO_SITE_URL")]
    pub site_url: Option<String>,

    /// Bearer token (application password or plugin token)
    #[arg(long, global = true, env = "ALMASEO_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Nonce for the admin-ajax transport
    #[arg(long, global = true, env = "ALMASEO_NONCE", hide_env_values = true)]
    pub nonce: Option<String>,

    /// Endpoint flavour: rest or ajax
    #[arg(long, global = true, env = "ALMASEO_TRANSPORT")]
    pub transport: Option<Transport>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "ALMASEO_TIMEOUT")]
    pub timeout: Option<u64>,
}

#[derive(Args, Clone, Debug)]
pub struct HealthArgs {
    /// Post ID to score
    pub post_id: u64,

    /// Unsaved field values as a JSON object, scored instead of the stored post
    #[arg(long)]
    pub draft: Option<String>,

    /// Print the raw snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct WatchArgs {
    /// Post ID to watch
    pub post_id: u64,

    /// Seconds between checks
    #[arg(long, default_value_t = 30)]
    pub interval: u64,

    /// Stop after this many completed checks
    #[arg(long)]
    pub count: Option<u64>,
}
