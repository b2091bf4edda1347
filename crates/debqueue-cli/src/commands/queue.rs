//! `debq queue`: Print the build queue for a distribution.

use clap::Args;

use super::{Cli, ResolveArgs};
use crate::output;

/// Arguments for the `queue` command.
#[derive(Args, Debug)]
pub struct QueueArgs {
    /// Resolution options and packages.
    #[command(flatten)]
    pub resolve: ResolveArgs,

    /// Print the requested packages as given, without inspecting anything.
    #[arg(long)]
    pub skip_inspect: bool,
}

/// Executes the `queue` command.
///
/// Prints one `name version` line per package, dependencies first.
///
/// # Errors
///
/// Returns an error if settings cannot be loaded, the sandbox cannot be
/// prepared, or resolution fails.
pub fn execute(cli: &Cli, args: &QueueArgs) -> anyhow::Result<()> {
    let packages = super::requested_packages(cli, &args.resolve)?;

    if args.skip_inspect {
        tracing::info!(packages = packages.len(), "skipping inspection");
        for package in &packages {
            println!("{package}");
        }
        return Ok(());
    }

    let resolution = super::resolve(cli, &args.resolve, &packages)?;
    for (package, reason) in resolution.skipped() {
        tracing::debug!(package = %package, %reason, "not queued");
    }
    for line in output::queue_lines(&resolution) {
        println!("{line}");
    }
    Ok(())
}
