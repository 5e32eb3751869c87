//! Command-line surface.
//!
//! Defines the recognized flags and converts parsed values into the raw
//! argument record the resolution pipeline reads from. All flags are
//! optional; anything left unset is resolved interactively.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "ecs-tunnel")]
#[command(about = "Open a database tunnel into an ECS task via SSM port forwarding")]
#[command(version)]
pub struct Cli {
    /// ECS cluster name
    #[arg(long)]
    pub cluster: Option<String>,

    /// Service name (exact or approximate) used to narrow the task search
    #[arg(long)]
    pub service: Option<String>,

    /// Container name within the selected task
    #[arg(long)]
    pub container: Option<String>,

    /// Database host to forward to
    #[arg(long = "db-host")]
    pub db_host: Option<String>,

    /// Read the database host from this container environment variable
    #[arg(long = "db-host-from-container-env", conflicts_with = "db_host")]
    pub db_host_from_container_env: Option<String>,

    /// Remote database port
    #[arg(long)]
    pub port: Option<u16>,

    /// Local port to bind
    #[arg(long = "local-port")]
    pub local_port: Option<u16>,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// AWS profile to use (defaults to AWS_PROFILE env var or default profile)
    #[arg(short = 'p', long)]
    pub profile: Option<String>,

    /// AWS region to use (defaults to AWS_REGION env var or config file)
    #[arg(short = 'r', long)]
    pub region: Option<String>,
}
