//! CLI definitions, configuration resolution, tracing setup and startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use tracing::{info, warn};

use topic_annotator_core::{AppState, HttpMetrics, ServiceInfo};
use topic_annotator_pac::AnnotationsService;
use topic_annotator_shared::http::build_client;
use topic_annotator_shared::{AppConfig, load_config_from};
use topic_annotator_smartlogic::SmartlogicService;

/// Description reported by `/__health`.
const APP_DESCRIPTION: &str =
    "Creates topics in Smartlogic and annotates content with them through PAC";

/// Placeholder printed instead of credentials.
const REDACTED: &str = "<redacted>";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Topic annotator: create Smartlogic topics and annotate PAC content with them.
#[derive(Parser, Debug)]
#[command(name = "topic-annotator", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true, env = "LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Optional TOML config file; flags and environment variables take precedence.
    #[arg(long, global = true, env = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level subcommands. Without one, the service starts.
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Start the HTTP service.
    Serve,

    /// Print the resolved configuration with credentials redacted.
    ShowConfig,
}

/// Settings that override the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct ConfigOverrides {
    /// System code of the application.
    #[arg(long, global = true, env = "APP_SYSTEM_CODE")]
    pub app_system_code: Option<String>,

    /// Application name.
    #[arg(long, global = true, env = "APP_NAME")]
    pub app_name: Option<String>,

    /// Port to listen on.
    #[arg(long, global = true, env = "APP_PORT")]
    pub port: Option<u16>,

    /// Smartlogic credential, sent as the Authorization header.
    #[arg(long, global = true, env = "SMARTLOGIC_API_KEY", hide_env_values = true)]
    pub smartlogic_api_key: Option<String>,

    /// URL Smartlogic concepts are posted to.
    #[arg(long, global = true, env = "SL_REQUEST_URL")]
    pub sl_request_url: Option<String>,

    /// PAC API key.
    #[arg(long, global = true, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL for reading content annotations.
    #[arg(long, global = true, env = "PAC_READ_URL")]
    pub pac_read_url: Option<String>,

    /// Base URL for publishing draft annotations.
    #[arg(long, global = true, env = "PAC_WRITE_URL")]
    pub pac_write_url: Option<String>,

    /// Timeout for each outbound request, in seconds.
    #[arg(long, global = true, env = "HTTP_TIMEOUT_SECS")]
    pub http_timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Overwrite every setting that was given on the command line or in the environment.
    pub(crate) fn apply(&self, config: &mut AppConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut config.service.system_code, &self.app_system_code);
        set(&mut config.service.name, &self.app_name);
        set(&mut config.service.port, &self.port);
        set(&mut config.smartlogic.api_key, &self.smartlogic_api_key);
        set(&mut config.smartlogic.request_url, &self.sl_request_url);
        set(&mut config.pac.api_key, &self.api_key);
        set(&mut config.pac.read_url, &self.pac_read_url);
        set(&mut config.pac.write_url, &self.pac_write_url);
        set(&mut config.http.timeout_secs, &self.http_timeout_secs);
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "topic_annotator=info",
        1 => "topic_annotator=debug",
        _ => "topic_annotator=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Resolve configuration: defaults, then the config file, then overrides.
pub(crate) fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => AppConfig::default(),
    };
    cli.overrides.apply(&mut config);
    Ok(config)
}

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => cmd_serve(config).await,
        Command::ShowConfig => cmd_show_config(config),
    }
}

async fn cmd_serve(config: AppConfig) -> Result<()> {
    config.validate()?;

    info!(
        system_code = %config.service.system_code,
        name = %config.service.name,
        port = config.service.port,
        "starting topic annotator"
    );

    let client = build_client(&config.http)?;
    let metrics = HttpMetrics::new().wrap_err("failed to register metrics")?;
    let state = Arc::new(AppState {
        topics: Arc::new(SmartlogicService::new(client.clone(), &config.smartlogic)),
        annotations: Arc::new(AnnotationsService::new(client, &config.pac)),
        info: ServiceInfo {
            system_code: config.service.system_code.clone(),
            name: config.service.name.clone(),
            description: APP_DESCRIPTION.to_string(),
        },
        metrics,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.service.port));
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("failed to bind {addr}"))?;

    topic_annotator_core::serve(listener, state, shutdown_signal())
        .await
        .wrap_err("HTTP server failed")?;

    info!("topic annotator stopped");
    Ok(())
}

fn cmd_show_config(mut config: AppConfig) -> Result<()> {
    for key in [&mut config.smartlogic.api_key, &mut config.pac.api_key] {
        if !key.is_empty() {
            *key = REDACTED.to_string();
        }
    }
    let rendered = toml::to_string_pretty(&config).wrap_err("failed to render config")?;
    println!("{rendered}");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
