use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use relsnap_core::{parse_interval, Clock, StalenessPolicy, SyncConfig, SystemClock};
use relsnap_github::GitHubClient;
use relsnap_sync::{sync_catalog, verify_coverage, Catalog, SnapshotStore};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Keep an app catalog's latest-release snapshot up to date
#[derive(Debug, Parser)]
#[command(name = "relsnap", version, about)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Refresh missing and outdated release data, then rewrite the snapshot
    Sync(SyncArgs),
    /// Check that every app with a GitHub repo has fetched release data
    Verify(PathArgs),
    /// List the apps a sync would refresh, without fetching anything
    Stale(StaleArgs),
}

#[derive(Debug, Args)]
struct PathArgs {
    /// Snapshot file
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Catalog file (JSON array of apps)
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
}

impl PathArgs {
    fn apply(&self, mut config: SyncConfig) -> SyncConfig {
        if let Some(path) = &self.snapshot {
            config = config.with_snapshot_path(path);
        }
        if let Some(path) = &self.catalog {
            config = config.with_catalog_path(path);
        }
        config
    }
}

#[derive(Debug, Args)]
struct SyncArgs {
    #[command(flatten)]
    paths: PathArgs,

    /// Maximum lookups in flight at once [env: MAX_CONCURRENCY]
    #[arg(long, value_name = "N")]
    max_concurrency: Option<usize>,

    /// Cache time-to-live, e.g. "4 hours" [env: RELEASE_CACHE_TTL]
    #[arg(long, value_name = "INTERVAL", value_parser = parse_interval)]
    ttl: Option<Duration>,

    /// Pause before writing the snapshot
    #[arg(long, value_name = "MS")]
    settle_delay_ms: Option<u64>,

    /// GitHub API base URL
    #[arg(long, value_name = "URL")]
    api_base: Option<String>,
}

impl SyncArgs {
    fn apply(&self, config: SyncConfig) -> Result<SyncConfig> {
        let mut config = self.paths.apply(config);
        if let Some(max) = self.max_concurrency {
            config = config.with_max_concurrency(max)?;
        }
        if let Some(ttl) = self.ttl {
            config = config.with_release_cache_ttl(ttl);
        }
        if let Some(ms) = self.settle_delay_ms {
            config = config.with_settle_delay(Duration::from_millis(ms));
        }
        if let Some(url) = &self.api_base {
            config = config.with_api_base_url(url.clone());
        }
        Ok(config)
    }
}

#[derive(Debug, Args)]
struct StaleArgs {
    #[command(flatten)]
    paths: PathArgs,

    /// Cache time-to-live, e.g. "4 hours" [env: RELEASE_CACHE_TTL]
    #[arg(long, value_name = "INTERVAL", value_parser = parse_interval)]
    ttl: Option<Duration>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = SyncConfig::from_env().context("invalid environment configuration")?;

    match cli.command {
        Command::Sync(args) => sync(args.apply(config)?).await,
        Command::Verify(args) => verify(args.apply(config)).await,
        Command::Stale(args) => {
            let mut config = args.paths.apply(config);
            if let Some(ttl) = args.ttl {
                config = config.with_release_cache_ttl(ttl);
            }
            stale(config).await
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

async fn sync(config: SyncConfig) -> Result<ExitCode> {
    let catalog = Catalog::load(&config.catalog_path)
        .await
        .context("failed to load catalog")?;
    let client = GitHubClient::from_config(&config).context("failed to create GitHub client")?;

    let done = sync_catalog(&config, &catalog, Arc::new(client), Arc::new(SystemClock))
        .await
        .context("release sync failed")?;

    let report = &done.report;
    tracing::info!(
        entries = done.entries(),
        fetched = report.fetched,
        not_found = report.not_found,
        failed = report.failed,
        carried_over = report.carried_over,
        peak_in_flight = report.peak_in_flight,
        "sync finished"
    );
    Ok(ExitCode::SUCCESS)
}

async fn verify(config: SyncConfig) -> Result<ExitCode> {
    let catalog = Catalog::load(&config.catalog_path)
        .await
        .context("failed to load catalog")?;
    let snapshot = SnapshotStore::new(&config.snapshot_path)
        .load()
        .await
        .context("failed to load snapshot")?;

    let report = verify_coverage(&catalog.with_github_repos(), &snapshot);
    println!(
        "{} apps checked, {} with a release",
        report.expected, report.with_release
    );
    for slug in &report.missing {
        println!("missing: {slug}");
    }
    for slug in &report.unfetched {
        println!("never fetched: {slug}");
    }
    for slug in &report.extra {
        println!("not in catalog: {slug}");
    }

    Ok(if report.is_complete() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn stale(config: SyncConfig) -> Result<ExitCode> {
    let catalog = Catalog::load(&config.catalog_path)
        .await
        .context("failed to load catalog")?;
    let snapshot = SnapshotStore::new(&config.snapshot_path)
        .load()
        .await
        .context("failed to load snapshot")?;

    let policy = StalenessPolicy::new(config.release_cache_ttl);
    let now = SystemClock.now();
    for item in catalog.with_github_repos() {
        if policy.is_stale(&item.slug, &snapshot, now) {
            println!("{}", item.slug);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_flags_override_config() {
        let cli = Cli::try_parse_from([
            "relsnap",
            "sync",
            "--snapshot",
            "out.json",
            "--max-concurrency",
            "8",
            "--ttl",
            "90m",
            "--settle-delay-ms",
            "0",
        ])
        .unwrap();

        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        let config = args.apply(SyncConfig::new()).unwrap();
        assert_eq!(config.snapshot_path, PathBuf::from("out.json"));
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.release_cache_ttl, Duration::from_secs(90 * 60));
        assert_eq!(config.settle_delay, Duration::ZERO);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cli = Cli::try_parse_from(["relsnap", "sync", "--max-concurrency", "0"]).unwrap();
        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert!(args.apply(SyncConfig::new()).is_err());
    }

    #[test]
    fn bad_ttl_is_a_usage_error() {
        assert!(Cli::try_parse_from(["relsnap", "stale", "--ttl", "soon"]).is_err());
    }

    #[test]
    fn log_format_is_global() {
        let cli = Cli::try_parse_from(["relsnap", "verify", "--log-format", "json"]).unwrap();
        assert_eq!(cli.log_format, LogFormat::Json);
    }
}
