use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use feed_core::{
    parse_kinds, parse_references, FeedError, Mode, Pipeline, QueryOptions, RelayClient, Summary,
};
use nostr_sdk::Keys;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod render;

use config::Config;
use render::TerminalRenderer;

#[derive(Parser)]
#[command(name = "feed")]
#[command(about = "Read your Nostr home feed and inbox")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Notes from people you follow
    Home {
        #[command(flatten)]
        query: QueryArgs,

        /// Only notes that tag you
        #[arg(long)]
        onlymentions: bool,
    },
    /// Encrypted direct messages sent to you
    Inbox {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(Args, Debug, Default)]
struct QueryArgs {
    /// Show event ids and debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print raw event JSON, one per line
    #[arg(long)]
    json: bool,

    /// Hide events that reference another event
    #[arg(long)]
    noreplies: bool,

    /// Only show events that reference another event
    #[arg(long)]
    onlyreplies: bool,

    /// Event kinds to request (repeatable or comma-separated)
    #[arg(long)]
    kinds: Vec<String>,

    /// Unix timestamp lower bound (0 = unbounded)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    since: i64,

    /// Unix timestamp upper bound (0 = unbounded)
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    until: i64,

    /// Maximum number of stored events per relay (0 = relay default)
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Only events referencing these event ids (repeatable or comma-separated)
    #[arg(long)]
    reference: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config::default_config_path().to_string_lossy().into_owned());
    let config = Config::load_from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    let (mode, query, only_mentions) = match cli.command {
        Commands::Home { query, onlymentions } => (Mode::Home, query, onlymentions),
        Commands::Inbox { query } => (Mode::Inbox, query, false),
    };

    let level = if query.verbose { "debug" } else { config.logging.level.as_str() };
    init_logging(level)?;

    config
        .validate()
        .with_context(|| "Configuration validation failed")?;

    let keys = config.keys().with_context(|| "Failed to load identity")?;
    let options = build_options(mode, &query, only_mentions, &keys, &config)?;

    run_feed(config, keys, options).await
}

fn build_options(
    mode: Mode,
    query: &QueryArgs,
    only_mentions: bool,
    keys: &Keys,
    config: &Config,
) -> Result<QueryOptions> {
    let mut options = QueryOptions::new(keys.public_key());
    options.mode = mode;
    options.verbose = query.verbose;
    options.json = query.json;
    options.no_replies = query.noreplies;
    options.only_replies = query.onlyreplies;
    options.only_mentions = only_mentions;
    options.kinds = parse_kinds(&query.kinds);
    options.since = query.since;
    options.until = query.until;
    options.limit = query.limit;
    options.references = parse_references(&query.reference).map_err(FeedError::from)?;
    options.following = config.follows()?;

    if options.only_replies && options.no_replies {
        tracing::warn!("--onlyreplies together with --noreplies hides every event");
    }

    Ok(options)
}

async fn run_feed(config: Config, keys: Keys, options: QueryOptions) -> Result<()> {
    tracing::info!("Loaded identity: {}", keys.public_key());

    let relays = RelayClient::connect(keys.clone(), config.read_relays())
        .await
        .with_context(|| "Failed to connect to relays")?;

    let mut pipeline = Pipeline::new(options);
    let renderer = TerminalRenderer::new(std::io::stdout(), keys);

    let stop = tokio::select! {
        result = pipeline.run(&relays, renderer) => Stop::Finished(result),
        res = wait_for_shutdown() => Stop::Signal(res),
    };

    relays.disconnect().await;
    finish(stop)
}

/// Why the feed stopped.
enum Stop {
    Finished(Result<Summary, FeedError>),
    Signal(Result<()>),
}

/// Report the outcome once the relays are disconnected.
fn finish(stop: Stop) -> Result<()> {
    match stop {
        Stop::Finished(result) => {
            let summary = result.with_context(|| "Feed stopped")?;
            tracing::debug!("{:?}", summary);
        }
        Stop::Signal(res) => {
            res?;
            tracing::info!("Interrupted, stopping feed");
        }
    }
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            },
            _ = signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
        tracing::info!("Received Ctrl+C");
    }

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter.to_string())),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).unwrap()
    }

    #[test]
    fn home_flags_parse() {
        let parsed = cli(&[
            "feed", "home", "--onlymentions", "--kinds", "1,7", "--kinds", "x", "--since", "100",
            "--limit", "10",
        ]);
        match parsed.command {
            Commands::Home { query, onlymentions } => {
                assert!(onlymentions);
                assert_eq!(query.kinds, vec!["1,7".to_string(), "x".to_string()]);
                assert_eq!(query.since, 100);
                assert_eq!(query.limit, 10);
            }
            Commands::Inbox { .. } => panic!("expected home"),
        }
    }

    #[test]
    fn inbox_has_no_onlymentions() {
        assert!(Cli::try_parse_from(["feed", "inbox", "--onlymentions"]).is_err());
    }

    #[test]
    fn build_options_maps_flags() {
        let keys = Keys::generate();
        let config = Config::default();
        let query = QueryArgs {
            noreplies: true,
            kinds: vec!["1".into(), "nope".into()],
            until: 42,
            ..Default::default()
        };

        let options = build_options(Mode::Inbox, &query, false, &keys, &config).unwrap();
        assert!(options.is_inbox());
        assert!(options.no_replies);
        assert_eq!(options.kinds.len(), 1);
        assert_eq!(options.until, 42);
        assert_eq!(options.own_key, keys.public_key());
    }

    #[test]
    fn build_options_rejects_bad_reference() {
        let query = QueryArgs {
            reference: vec!["zzz".into()],
            ..Default::default()
        };
        let err = build_options(Mode::Home, &query, false, &Keys::generate(), &Config::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FeedError>(),
            Some(FeedError::Options(_))
        ));
    }

    #[test]
    fn finish_reports_signal_handler_failure() {
        let err = finish(Stop::Signal(Err(anyhow::anyhow!("no handler")))).unwrap_err();
        assert_eq!(err.to_string(), "no handler");
    }

    #[test]
    fn finish_after_interrupt_is_ok() {
        assert!(finish(Stop::Signal(Ok(()))).is_ok());
        assert!(finish(Stop::Finished(Ok(Summary::default()))).is_ok());
    }

    #[test]
    fn finish_keeps_pipeline_error() {
        let err = finish(Stop::Finished(Err(FeedError::Render(anyhow::anyhow!("closed")))))
            .unwrap_err();
        assert_eq!(err.to_string(), "Feed stopped");
        assert!(err.downcast_ref::<FeedError>().is_some());
    }
}
