//! `debq recipes`: List the recipes found on disk.

use debqueue_common::constants::DEFAULT_RECIPE_FILE;
use debqueue_resolve::recipes::list_recipes;

use super::Cli;

/// Executes the `recipes` command.
///
/// # Errors
///
/// Returns an error if the recipes directory cannot be read.
pub fn execute(cli: &Cli) -> anyhow::Result<()> {
    let recipes = list_recipes(&cli.recipes, DEFAULT_RECIPE_FILE)?;
    if recipes.is_empty() {
        eprintln!("No recipes found in {}", cli.recipes.display());
        return Ok(());
    }
    for name in &recipes {
        println!("{name}");
    }
    Ok(())
}
