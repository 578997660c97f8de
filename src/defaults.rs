//! Default locations used when neither the configuration file, a CLI flag
//! nor an environment variable names one.

use std::path::PathBuf;

/// Returns the default local artifact repository, `~/.m2/repository`.
///
/// Falls back to `.m2/repository` in the current directory if the home
/// directory cannot be determined.
///
/// This can be overridden by the `--local-repository` CLI flag or the
/// `POM_TREE_LOCAL_REPOSITORY` environment variable.
pub fn default_local_repository() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".m2")
        .join("repository")
}

/// Returns the default resolution cache file.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/pom-tree/resolution-cache.json` (XDG Base Directory)
/// - macOS: `~/Library/Caches/pom-tree/resolution-cache.json`
/// - Windows: `{FOLDERID_LocalAppData}\pom-tree\resolution-cache.json`
///
/// Falls back to `.pom-tree-cache` in the current directory if the platform
/// cache directory cannot be determined.
pub fn default_cache_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".pom-tree-cache"))
        .join("pom-tree")
        .join("resolution-cache.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_local_repository_layout() {
        assert!(default_local_repository().ends_with(".m2/repository"));
    }

    #[test]
    fn test_default_cache_file_is_absolute_or_fallback() {
        let cache_file = default_cache_file();
        assert!(cache_file.ends_with("pom-tree/resolution-cache.json"));
        assert!(
            cache_file.is_absolute() || cache_file.starts_with(".pom-tree-cache"),
            "Expected absolute path or fallback, got: {:?}",
            cache_file
        );
    }
}
