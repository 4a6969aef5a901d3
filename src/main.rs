//! flagtree: load configuration domains and serve them until stopped.
//!
//! ```text
//! flagtree -c flagtree.toml run
//! flagtree -c flagtree.toml dump [DOMAIN]
//! flagtree -c flagtree.toml resolve DOMAIN NAME -x user=joe -x environment=qa
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use flagtree::config::schema::ObservabilityConfig;
use flagtree::config::{load_config, AppConfig, ConfigError};
use flagtree::config::watcher::SourceWatcher;
use flagtree::lifecycle::signals::{wait_for_signal, SignalAction};
use flagtree::lifecycle::Application;
use flagtree::observability::{logging, metrics};
use flagtree::ConfigurationContext;

#[derive(Parser)]
#[command(name = "flagtree")]
#[command(about = "Context-dependent configuration and feature flags", long_about = None)]
struct Cli {
    /// Settings file.
    #[arg(short, long, default_value = "flagtree.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep every domain refreshed until SIGINT or SIGTERM
    Run,
    /// Load once and print catalogs as JSON
    Dump {
        /// Reader name (`scope/root`) or root field; all domains when omitted
        domain: Option<String>,
    },
    /// Load once and print the value a name resolves to
    Resolve {
        /// Reader name (`scope/root`) or root field
        domain: String,
        name: String,
        /// Context dimension, `dimension=value`; repeatable
        #[arg(short = 'x', long = "context", value_parser = parse_dimension)]
        context: Vec<(String, String)>,
    },
}

fn parse_dimension(pair: &str) -> Result<(String, String), String> {
    match pair.split_once('=') {
        Some((dimension, value)) if !dimension.is_empty() => Ok((dimension.to_string(), value.to_string())),
        _ => Err(format!("expected `dimension=value`, got `{pair}`")),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = load_settings(&cli.config)?;

    tracing::info!(config = %cli.config.display(), domains = config.domains.len(), "flagtree v0.1.0 starting");

    match cli.command {
        Commands::Run => run(config).await,
        Commands::Dump { domain } => dump(config, domain.as_deref()).await,
        Commands::Resolve {
            domain,
            name,
            context,
        } => resolve(config, &domain, &name, context.into_iter().collect()).await,
    }
}

/// Load the settings file and install logging at its level.
///
/// A settings error is logged at the default level before it is returned.
fn load_settings(path: &Path) -> Result<AppConfig, ConfigError> {
    match load_config(path) {
        Ok(config) => {
            logging::init_tracing(&config.observability.log_level);
            Ok(config)
        }
        Err(e) => {
            logging::init_tracing(&ObservabilityConfig::default().log_level);
            tracing::error!(config = %path.display(), error = %e, "Failed to load settings");
            Err(e)
        }
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Application::from_config(&config);
    let loader = Arc::new(app.loader);
    loader.start()?;

    let _watcher = if config.source.watch {
        let trigger = loader.clone();
        Some(SourceWatcher::new(&config.source.base_path).run(move || trigger.trigger_refresh())?)
    } else {
        None
    };

    loader.wait_for_initial_load().await;
    for domain in &app.domains {
        tracing::info!(domain = %domain.name, entries = domain.manager.names().len(), "Domain loaded");
    }

    loop {
        match wait_for_signal().await? {
            SignalAction::Reload => {
                tracing::info!("Reload requested, re-publishing every domain");
                loader.reset_all();
                loader.trigger_refresh();
            }
            SignalAction::Shutdown => break,
        }
    }

    tracing::info!("Shutdown signal received");
    loader.shutdown().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Start, wait for every domain's first cycle, stop.
async fn load_once(app: &Application) -> Result<(), Box<dyn Error>> {
    app.loader.start()?;
    app.loader.wait_for_initial_load().await;
    app.loader.shutdown().await?;

    let stats = app.fetcher.stats();
    if stats.failures > 0 {
        tracing::warn!(failures = stats.failures, "Some domains could not be fetched");
    }
    Ok(())
}

async fn dump(config: AppConfig, domain: Option<&str>) -> Result<(), Box<dyn Error>> {
    let app = Application::from_config(&config);
    load_once(&app).await?;

    match domain {
        Some(key) => {
            let domain = app.domain(key).ok_or_else(|| format!("unknown domain `{key}`"))?;
            println!("{}", domain.manager.as_json()?);
        }
        None => {
            for domain in &app.domains {
                println!("# {}", domain.name);
                println!("{}", domain.manager.as_json()?);
            }
        }
    }
    Ok(())
}

async fn resolve(
    config: AppConfig,
    domain: &str,
    name: &str,
    context: ConfigurationContext,
) -> Result<(), Box<dyn Error>> {
    let app = Application::from_config(&config);
    load_once(&app).await?;

    let domain = app.domain(domain).ok_or_else(|| format!("unknown domain `{domain}`"))?;
    match domain.manager.resolve_json(name, &context) {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        None => Err(format!("`{name}` is not defined in `{}`", domain.name).into()),
    }
}
