//! Session runner: hands the resolved target and parameters to the SSM
//! port-forwarding session.
//!
//! The session itself is owned by the AWS CLI and its session-manager
//! plugin; this module only spawns it with inherited stdio and waits. A
//! Ctrl-C during the session belongs to the child (the terminal delivers it
//! to the whole process group), so the parent swallows the signal and keeps
//! waiting instead of dying first.

use anyhow::{Context, Result};
use tokio::process::Command;

use crate::status::print_info;

const FORWARDING_DOCUMENT: &str = "AWS-StartPortForwardingSessionToRemoteHost";

/// Starts the forwarding session and blocks until it ends.
///
/// Returns the child's exit code, or `None` when the session was terminated
/// by a signal.
pub async fn run(
    target: &str,
    parameters: &str,
    profile: Option<&str>,
    region: Option<&str>,
) -> Result<Option<i32>> {
    let mut cmd = Command::new("aws");
    cmd.args(["ssm", "start-session"]);
    cmd.args(["--target", target]);
    cmd.args(["--document-name", FORWARDING_DOCUMENT]);
    cmd.args(["--parameters", parameters]);

    if let Some(profile) = profile {
        cmd.args(["--profile", profile]);
    }
    if let Some(region) = region {
        cmd.args(["--region", region]);
    }

    print_info("Starting port forwarding session...");

    let mut child = cmd
        .spawn()
        .context("Failed to spawn 'aws ssm start-session'; is the AWS CLI installed?")?;

    loop {
        tokio::select! {
            status = child.wait() => {
                let status = status.context("Failed waiting for the session process")?;
                return Ok(status.code());
            }
            _ = tokio::signal::ctrl_c() => {
                // Interrupt goes to the child via the process group; keep
                // waiting so its terminal cleanup finishes before we exit.
            }
        }
    }
}
