//! Gitignore-style exclusion filter for observers
//!
//! Combines up to three sources into one matcher, all rooted at the watched
//! root:
//! 1. Built-in VCS directories (.git/, .jj/, .hg/, .svn/), when enabled
//! 2. The root's .gitignore, when enabled
//! 3. Patterns given in the configuration (later lines win, `!` negates)

use crate::error::Result;
use fsmon_core::PathFilter;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const VCS_DIRS: &[&str] = &[".git/", ".jj/", ".hg/", ".svn/"];

/// Exclusion filter configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Honour the root's .gitignore (default: false)
    #[serde(default)]
    pub use_gitignore: bool,

    /// Exclude version-control metadata directories (default: false)
    #[serde(default)]
    pub skip_vcs_dirs: bool,

    /// Additional gitignore-syntax patterns
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl FilterConfig {
    /// Configuration that excludes nothing
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exclusion pattern
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Read patterns from the root's .gitignore
    pub fn with_gitignore(mut self) -> Self {
        self.use_gitignore = true;
        self
    }

    /// Exclude .git/, .jj/, .hg/ and .svn/
    pub fn skip_vcs(mut self) -> Self {
        self.skip_vcs_dirs = true;
        self
    }

    /// Whether this configuration excludes anything at all
    pub fn is_empty(&self) -> bool {
        !self.use_gitignore && !self.skip_vcs_dirs && self.patterns.is_empty()
    }
}

/// `PathFilter` rejecting paths matched by gitignore-style rules
#[derive(Debug)]
pub struct IgnoreFilter {
    root: PathBuf,
    matcher: Gitignore,
    config: FilterConfig,
}

impl IgnoreFilter {
    /// Compile the rules for `root`
    pub fn load(root: &Path, config: FilterConfig) -> Result<Self> {
        let mut filter = Self {
            root: root.to_path_buf(),
            matcher: Gitignore::empty(),
            config,
        };

        filter.reload()?;
        Ok(filter)
    }

    /// Rebuild the matcher, picking up edits to .gitignore
    pub fn reload(&mut self) -> Result<()> {
        let mut builder = GitignoreBuilder::new(&self.root);

        if self.config.skip_vcs_dirs {
            for line in VCS_DIRS {
                builder.add_line(None, line)?;
            }
        }

        if self.config.use_gitignore {
            let gitignore_path = self.root.join(".gitignore");
            if gitignore_path.is_file() {
                if let Some(err) = builder.add(&gitignore_path) {
                    return Err(err.into());
                }
            }
        }

        for pattern in &self.config.patterns {
            builder.add_line(None, pattern)?;
        }

        self.matcher = builder.build()?;
        debug!(
            root = %self.root.display(),
            rules = self.matcher.num_ignores(),
            "Exclusion rules loaded"
        );
        Ok(())
    }

    /// Check if path should be excluded
    ///
    /// Directory-only rules (`name/`) match real directories only. Symbolic
    /// links are not followed, matching how snapshots record them as files.
    /// This costs one `lstat` per checked path.
    pub fn should_ignore(&self, path: &Path) -> bool {
        // Relative paths are taken relative to the root
        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let is_dir = fs::symlink_metadata(&full_path).is_ok_and(|m| m.is_dir());

        self.matcher.matched(path, is_dir).is_ignore()
    }

    /// Root the rules are anchored at
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configuration the rules were compiled from
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

impl PathFilter for IgnoreFilter {
    fn accept(&self, path: &Path) -> bool {
        !self.should_ignore(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WatchError;
    use fsmon_core::Snapshot;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_accepts_everything() {
        let temp_dir = TempDir::new().unwrap();
        let filter = IgnoreFilter::load(temp_dir.path(), FilterConfig::new()).unwrap();

        assert!(FilterConfig::new().is_empty());
        assert!(filter.accept(&temp_dir.path().join(".git")));
        assert!(filter.accept(&temp_dir.path().join("src/main.rs")));
    }

    #[test]
    fn test_vcs_dirs() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(".git")).unwrap();
        fs::create_dir_all(temp_dir.path().join(".jj")).unwrap();
        let filter =
            IgnoreFilter::load(temp_dir.path(), FilterConfig::new().skip_vcs()).unwrap();

        assert!(filter.should_ignore(&temp_dir.path().join(".git")));
        assert!(filter.should_ignore(Path::new(".jj")));
        assert!(!filter.should_ignore(&temp_dir.path().join("README.md")));
    }

    #[test]
    fn test_patterns_and_negation() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("build")).unwrap();
        let config = FilterConfig::new()
            .exclude("*.log")
            .exclude("!keep.log")
            .exclude("build/");
        let filter = IgnoreFilter::load(temp_dir.path(), config).unwrap();

        assert!(filter.should_ignore(&temp_dir.path().join("debug.log")));
        assert!(!filter.should_ignore(&temp_dir.path().join("keep.log")));
        assert!(filter.should_ignore(&temp_dir.path().join("build")));
        assert!(!filter.should_ignore(&temp_dir.path().join("src.rs")));
    }

    #[test]
    fn test_gitignore_reload() {
        let temp_dir = TempDir::new().unwrap();
        let mut filter =
            IgnoreFilter::load(temp_dir.path(), FilterConfig::new().with_gitignore()).unwrap();
        assert!(!filter.should_ignore(Path::new("test.tmp")));

        fs::write(temp_dir.path().join(".gitignore"), "*.tmp\n").unwrap();
        filter.reload().unwrap();

        assert!(filter.should_ignore(Path::new("test.tmp")));
    }

    #[test]
    fn test_excluded_directory_not_snapshotted() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::write(root.join("target/debug/app"), b"bin").unwrap();
        fs::write(root.join("lib.rs"), b"src").unwrap();

        let filter = IgnoreFilter::load(root, FilterConfig::new().exclude("target/")).unwrap();
        let snapshot = Snapshot::take(root, &filter);

        assert_eq!(snapshot.count(), 2);
        assert!(snapshot.find(&root.join("target")).is_none());
    }

    #[test]
    fn test_invalid_pattern() {
        let temp_dir = TempDir::new().unwrap();
        for pattern in ["a{b", "[z-a]"] {
            let result = IgnoreFilter::load(temp_dir.path(), FilterConfig::new().exclude(pattern));
            assert!(matches!(result, Err(WatchError::Pattern(_))), "{pattern} accepted");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_directory_is_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("real")).unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("link")).unwrap();

        let filter = IgnoreFilter::load(root, FilterConfig::new().exclude("link/")).unwrap();

        // Snapshots record the link as a file, so a directory-only rule skips it
        assert!(!filter.should_ignore(&root.join("link")));
        assert!(Snapshot::take(root, &filter).find(&root.join("link")).is_some());
    }
}
