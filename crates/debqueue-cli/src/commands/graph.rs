//! `debq graph`: Print the discovered dependency graph.

use clap::Args;
use debqueue_resolve::graph::PackageGraph;

use super::{Cli, ResolveArgs};

/// Arguments for the `graph` command.
#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Resolution options and packages.
    #[command(flatten)]
    pub resolve: ResolveArgs,
}

/// Executes the `graph` command.
///
/// # Errors
///
/// Returns an error if resolution fails.
pub fn execute(cli: &Cli, args: &GraphArgs) -> anyhow::Result<()> {
    let packages = super::requested_packages(cli, &args.resolve)?;
    let resolution = super::resolve(cli, &args.resolve, &packages)?;

    let graph = PackageGraph::from_table(resolution.table());
    tracing::debug!(packages = graph.package_count(), "rendering dependency graph");
    print!("{}", graph.to_dot());
    Ok(())
}
