//! System-wide constants and default paths.

/// Directory holding one sub-directory per recipe.
pub const DEFAULT_RECIPES_DIR: &str = "recipes";

/// File name of a recipe inside its package directory.
pub const DEFAULT_RECIPE_FILE: &str = "recipe.rb";

/// Recipe tool invoked inside the sandbox as `<tool> inspect <pkg>/<file>`.
pub const DEFAULT_INSPECT_TOOL: &str = "fpm-cook";

/// Default settings file read by the CLI.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.yml";

/// Command used to look up already published versions of a package.
pub const AVAILABILITY_COMMAND: [&str; 2] = ["apt-cache", "show"];

/// `apt-cache show` status when the package is known.
pub const APT_FOUND_EXIT_CODE: i32 = 0;

/// `apt-cache show` status when the package is unknown.
pub const APT_UNKNOWN_EXIT_CODE: i32 = 100;

/// Marker preceding a version in `apt-cache show` output.
pub const VERSION_MARKER: &str = "Version:";

/// Warm-up command run once in the seed container before committing the snapshot.
pub const SEED_COMMAND: [&str; 5] = ["chmod", "755", "/bin", "/lib", "/recipes"];

/// Entrypoint keeping the inspection context alive and idle.
pub const IDLE_COMMAND: [&str; 2] = ["sleep", "infinity"];

/// Mount point of the recipes directory inside the sandbox.
pub const SANDBOX_RECIPES_DIR: &str = "/recipes";

/// Container runtime binary driven by the CLI backend.
pub const DOCKER_BINARY: &str = "docker";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "debq";
