//! Recipe discovery on the host filesystem.

use std::path::Path;

use debqueue_common::error::{DebqueueError, Result};

/// Lists package directories under `recipes_dir` containing `recipe_file`.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn list_recipes(recipes_dir: &Path, recipe_file: &str) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(recipes_dir).map_err(|e| DebqueueError::Io {
        path: recipes_dir.to_path_buf(),
        source: e,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().join(recipe_file).is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
        .collect();
    names.sort();
    tracing::debug!(dir = %recipes_dir.display(), count = names.len(), "recipes listed");
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_directories_with_recipe() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["zlib", "app"] {
            std::fs::create_dir_all(dir.path().join(name)).expect("mkdir");
            std::fs::write(dir.path().join(name).join("recipe.rb"), "").expect("write");
        }
        std::fs::create_dir_all(dir.path().join("empty")).expect("mkdir");
        std::fs::write(dir.path().join("README"), "").expect("write");

        let names = list_recipes(dir.path(), "recipe.rb").expect("list");
        assert_eq!(names, ["app", "zlib"]);
    }

    #[test]
    fn missing_dir_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = list_recipes(&dir.path().join("nope"), "recipe.rb").expect_err("fail");
        assert!(matches!(err, DebqueueError::Io { .. }));
    }
}
