//! ecs-tunnel - a database tunnel helper for AWS ECS
//!
//! Resolves cluster, service, task and container coordinates plus the
//! database forwarding parameters, then hands both to an SSM port-forwarding
//! session. Anything not pinned on the command line is resolved by listing
//! the remote inventory and, where several candidates remain, asking.

mod aws;
mod cli;
mod config;
mod context;
mod errors;
mod forwarding;
mod fuzzy;
mod prompt;
mod replay;
mod session;
mod status;
mod target;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;
use crate::context::{ArgKey, RawArgs, ResolutionContext};
use crate::errors::ResolveError;
use crate::replay::ReplayMode;
use crate::status::{print_debug, print_error, print_info, print_success};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => match err.downcast_ref::<ResolveError>() {
            Some(ResolveError::Cancelled) => {
                print_info("Cancelled.");
                0
            }
            _ => {
                print_error(&format!("{err:#}"));
                1
            }
        },
    };

    std::process::exit(code);
}

/// One resolution pass, then the forwarding session.
async fn run(cli: Cli) -> Result<i32> {
    let config = config::Config::load()?;
    let verbose = cli.verbose;

    // CLI flags win over config-file defaults.
    let profile = cli.profile.clone().or_else(|| config.aws.profile.clone());
    let region = cli.region.clone().or_else(|| config.aws.region.clone());

    print_debug(
        &format!("Profile: {}", profile.as_deref().unwrap_or("default")),
        verbose,
    );
    print_debug(
        &format!("Region: {}", region.as_deref().unwrap_or("default (SDK resolution)")),
        verbose,
    );

    let mut ctx = ResolutionContext::new(RawArgs::from(&cli));

    // Explicit connection flags are part of the replayable invocation.
    if let Some(profile) = &cli.profile {
        ctx.processed
            .insert(ArgKey::Profile, Some(profile.clone()), false)?;
    }
    if let Some(region) = &cli.region {
        ctx.processed
            .insert(ArgKey::Region, Some(region.clone()), false)?;
    }

    let client = aws::EcsClient::new(region.clone(), profile.clone()).await?;
    let prompter = prompt::TerminalPrompter::default();

    let mut target_resolver = target::TargetResolver::new(&client, &prompter);
    target_resolver.resolve(&mut ctx).await?;

    let mut forwarding_resolver = forwarding::ForwardingResolver::new(&client, &prompter);
    forwarding_resolver.resolve(&mut ctx).await?;

    let descriptor = ctx.target.descriptor()?;
    let parameters = forwarding_resolver.payload()?;
    print_debug(&format!("Target: {descriptor}"), verbose);
    print_debug(&format!("Parameters: {parameters}"), verbose);

    let full = replay::format_cli_args(&ctx.processed, ReplayMode::Full)?;
    let required = replay::format_cli_args(&ctx.processed, ReplayMode::OnlyRequired)?;
    print_info("Repeat this invocation with:");
    println!("  ecs-tunnel {}", full.join(" "));
    if required != full {
        print_info("or, letting unique values resolve themselves:");
        println!("  ecs-tunnel {}", required.join(" "));
    }

    let exit = session::run(
        &descriptor,
        &parameters,
        profile.as_deref(),
        region.as_deref(),
    )
    .await?;

    match exit {
        Some(0) => {
            print_success("Session ended.");
            Ok(0)
        }
        Some(code) => {
            print_error(&format!("Session ended with exit code {code}"));
            Ok(code)
        }
        None => {
            // Terminated by signal; the user hung the tunnel up.
            print_info("Session terminated.");
            Ok(0)
        }
    }
}
