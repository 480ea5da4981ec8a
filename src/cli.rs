// Command-line surface. Global options go before the subcommand, so `-c`
// means the config file there and the job command after it.

use crate::config::{DEFAULT_CONFIG_PATH, DEFAULT_LOG_LEVEL, DEFAULT_PORT, DEFAULT_SITE_NAME};
use crate::selection::SelectionPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Manage dcron installations. Sites are read from the configuration
/// file, by default `~/.dcron/sites.json` (created if it does not exist).
#[derive(Debug, Parser)]
#[command(name = "dcron-cli", version)]
pub struct Cli {
    /// Configuration file (created if it does not exist)
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config_file: String,

    /// Name of the site to interact with
    #[arg(short = 's', long, default_value = DEFAULT_SITE_NAME)]
    pub site_name: String,

    /// How to pick the server to talk to: first, last, random, or a server name
    #[arg(short = 'm', long = "selection-mechanism", default_value = "first")]
    pub selection: SelectionPolicy,

    /// Log at debug level regardless of the site's log level
    #[arg(short = 'v', long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage the sites in the configuration file
    #[command(subcommand)]
    Site(SiteCommand),
    #[command(flatten)]
    Cluster(ClusterCommand),
}

/// Commands that talk to a node of the selected site.
#[derive(Debug, Subcommand)]
pub enum ClusterCommand {
    /// Show cluster status
    Status,
    /// Show cluster jobs
    Jobs,
    /// Show running cluster jobs
    Running,
    /// Add a job to the cluster
    Add {
        /// Cron pattern to use
        #[arg(short = 'p', long, default_value = "* * * * *")]
        pattern: String,
        /// Command to execute from cron
        #[arg(short = 'c', long)]
        command: String,
        /// Enable the job on submission
        #[arg(long)]
        enabled: bool,
    },
    /// Remove a job from the cluster
    Remove(JobArgs),
    /// Show details of a job
    Details(JobArgs),
    /// Show the logs of a job
    Logs(JobArgs),
    /// Run a defined job on the cluster
    Run(JobArgs),
    /// Kill a running job on the cluster
    Kill(JobArgs),
    /// Export the cluster's jobs to a file
    Export {
        /// File to export the jobs to
        #[arg(short = 'f', long)]
        file_name: PathBuf,
        /// Overwrite the file if it exists
        #[arg(long)]
        force: bool,
    },
    /// Import jobs from a file into the cluster
    Import {
        /// File to import the jobs from
        #[arg(short = 'f', long)]
        file_name: PathBuf,
    },
}

/// Identifies a job by its pattern and command.
#[derive(Debug, Args)]
pub struct JobArgs {
    /// Cron pattern of the job
    #[arg(short = 'p', long)]
    pub pattern: String,
    /// Command of the job
    #[arg(short = 'c', long)]
    pub command: String,
}

#[derive(Debug, Subcommand)]
pub enum SiteCommand {
    /// List configured site names
    Ls,
    /// Add a site
    #[command(visible_alias = "a")]
    Add(NewSiteArgs),
    /// Remove a site
    Rm {
        /// Name of the site to remove
        name: String,
    },
    /// Show every field of a site, credentials included
    Info {
        /// Name of the site to show
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct NewSiteArgs {
    /// Name of the new site
    pub name: String,
    /// Comma-separated list of servers
    #[arg(long, value_delimiter = ',', required = true)]
    pub servers: Vec<String>,
    /// Port shared by all servers
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Username for basic authentication
    #[arg(long)]
    pub username: Option<String>,
    /// Password for basic authentication (prompted for when a username is given without it)
    #[arg(long)]
    pub password: Option<String>,
    /// Talk to the servers over https
    #[arg(long)]
    pub ssl: bool,
    /// Log level used while this site is active (info, debug, verbose)
    #[arg(long, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}
