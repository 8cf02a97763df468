//! fsmon CLI - report changes under the given paths as `C|M|D <path>` lines

use anyhow::{Context, Result};
use clap::Parser;
use fsmon_watcher::{FilterConfig, IgnoreFilter, LineReporter, Monitor, Observer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

/// fsmon - poll files and directories for changes
#[derive(Parser, Debug)]
#[command(name = "fsmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Files or directories to watch
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Seconds between scans (fractions allowed)
    #[arg(short, long, default_value = "5", value_parser = parse_interval)]
    interval: Duration,

    /// Exclude paths matching a gitignore-style pattern (repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Honour each root's .gitignore
    #[arg(long)]
    gitignore: bool,

    /// Skip .git, .jj, .hg and .svn directories
    #[arg(long)]
    skip_vcs: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            use_gitignore: self.gitignore,
            skip_vcs_dirs: self.skip_vcs,
            patterns: self.exclude.clone(),
        }
    }
}

fn parse_interval(value: &str) -> std::result::Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|_| format!("invalid number of seconds: '{value}'"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err("interval must be a positive number of seconds".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("interval out of range: {e}"))
}

/// Canonical path of `path`, or its absolute form if it does not exist yet
fn absolute_root(path: &Path) -> Result<PathBuf> {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return Ok(canonical);
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(path))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // Logs go to stderr; stdout carries only event lines
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let roots = cli
        .paths
        .iter()
        .map(|p| absolute_root(p))
        .collect::<Result<Vec<_>>>()?;
    let filter_config = cli.filter_config();

    let reporter = Arc::new(LineReporter::new(std::io::stdout()));
    let monitor = Monitor::new(cli.interval);

    for root in &roots {
        let mut observer = if filter_config.is_empty() {
            Observer::new(root)
        } else {
            let filter = IgnoreFilter::load(root, filter_config.clone())
                .with_context(|| format!("Invalid exclude rules for {}", root.display()))?;
            Observer::with_filter(root, filter)
        };
        observer.add_listener(reporter.clone());
        monitor.add_observer(observer);
    }

    reporter.announce(&roots);
    monitor.start().context("Failed to start monitor")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Shutting down");

    tokio::task::spawn_blocking(move || monitor.stop()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["fsmon", "/w"]).unwrap();

        assert_eq!(cli.paths, vec![PathBuf::from("/w")]);
        assert_eq!(cli.interval, Duration::from_secs(5));
        assert!(cli.filter_config().is_empty());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "fsmon", "-i", "0.5", "-x", "*.log", "--exclude", "target/", "--gitignore",
            "--skip-vcs", "-vv", "/a", "/b",
        ])
        .unwrap();

        assert_eq!(cli.paths.len(), 2);
        assert_eq!(cli.interval, Duration::from_millis(500));
        assert_eq!(cli.verbose, 2);

        let config = cli.filter_config();
        assert!(config.use_gitignore);
        assert!(config.skip_vcs_dirs);
        assert_eq!(config.patterns, vec!["*.log", "target/"]);
    }

    #[test]
    fn test_paths_required() {
        assert!(Cli::try_parse_from(["fsmon"]).is_err());
    }

    #[test]
    fn test_invalid_interval() {
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("-1").is_err());
        assert!(parse_interval("soon").is_err());
        assert!(parse_interval("1e30").is_err());
        assert!(Cli::try_parse_from(["fsmon", "-i", "1e300", "/w"]).is_err());
        assert_eq!(parse_interval("2").unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn test_absolute_root() {
        let temp_dir = TempDir::new().unwrap();
        let existing = absolute_root(temp_dir.path()).unwrap();
        assert_eq!(existing, std::fs::canonicalize(temp_dir.path()).unwrap());

        let missing = absolute_root(Path::new("not/created/yet")).unwrap();
        assert!(missing.is_absolute());
        assert!(missing.ends_with("not/created/yet"));
    }
}
