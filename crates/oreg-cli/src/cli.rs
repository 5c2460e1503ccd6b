use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "oreg", about = "OCI artifact registry with referrer tracking", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the registry server
    Serve(ServeArgs),
    /// Store a manifest, linking it to its subject if one is given
    PutManifest(PutManifestArgs),
    /// Record that REFERRER refers to SUBJECT
    Link(LinkArgs),
    /// List the referrers of a subject
    Referrers(ReferrersArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Overrides `bind_addr` from the config
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Serve from a filesystem root instead of the configured storage
    #[arg(long)]
    pub root: Option<PathBuf>,
}

/// Repository on a filesystem root, shared by the offline commands.
#[derive(Args)]
pub struct RepoArgs {
    #[arg(long)]
    pub root: PathBuf,
    #[arg(long)]
    pub repo: String,
}

#[derive(Args)]
pub struct PutManifestArgs {
    #[command(flatten)]
    pub target: RepoArgs,
    #[arg(long)]
    pub media_type: String,
    #[arg(long)]
    pub artifact_type: Option<String>,
    #[arg(long)]
    pub subject: Option<String>,
    pub file: PathBuf,
}

#[derive(Args)]
pub struct LinkArgs {
    #[command(flatten)]
    pub target: RepoArgs,
    #[arg(long)]
    pub media_type: String,
    pub referrer: String,
    pub subject: String,
}

#[derive(Args)]
pub struct ReferrersArgs {
    #[command(flatten)]
    pub target: RepoArgs,
    pub subject: String,
    /// Only referrers stored under this media type
    #[arg(long, default_value = "")]
    pub media_type: String,
}
