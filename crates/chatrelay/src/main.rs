use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chatrelay::config::{Config, DEFAULT_CONFIG_FILE, DEFAULT_DOTENV_FILE, Environment};
use chatrelay::llm::{
    GROQ_KEYS_URL, HttpUpstream, OPENAI_KEYS_URL, ProviderCredentials, key_type,
};
use chatrelay::relay::Relay;
use chatrelay::server::{self, AppState};

/// Relay browser chat requests to OpenAI or Groq
#[derive(Parser)]
#[command(name = "chatrelay", version, about, long_about = None)]
struct Cli {
    /// Config file (YAML). Missing file means defaults.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// `.env` file with KEY=VALUE lines. Overrides process environment.
    #[arg(long, global = true, default_value = DEFAULT_DOTENV_FILE)]
    env_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the long-running server: API routes plus static files
    Serve(ServeArgs),

    /// Run function-style routes with CORS headers
    Functions(ListenArgs),

    /// Show which provider keys are configured
    Status,
}

#[derive(Args)]
struct ListenArgs {
    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    listen: ListenArgs,

    /// Directory of static files
    #[arg(long)]
    public_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli).await?;

    match cli.command {
        Command::Serve(args) => {
            apply_listen_args(&mut config, &args.listen);
            if let Some(dir) = args.public_dir {
                config.server.public_dir = dir;
            }
            let state = AppState {
                relay: build_relay(&config)?,
                public_dir: config.server.public_dir.clone(),
            };
            let app = server::build_app(state, config.server.request_timeout_seconds);
            run(&config, app).await
        }
        Command::Functions(args) => {
            apply_listen_args(&mut config, &args);
            let relay = build_relay(&config)?;
            let app = server::build_functions_app(relay, config.server.request_timeout_seconds);
            run(&config, app).await
        }
        Command::Status => {
            print_status(&config);
            Ok(())
        }
    }
}

async fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(&cli.config)
        .await
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;

    let env = Environment::capture(&cli.env_file)
        .await
        .with_context(|| format!("failed to read {}", cli.env_file.display()))?;
    if env.has_dotenv() {
        info!(path = %cli.env_file.display(), "Loaded environment file");
    }

    config.apply_env(&env)?;
    Ok(config)
}

fn apply_listen_args(config: &mut Config, args: &ListenArgs) {
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
}

fn build_relay(config: &Config) -> Result<Arc<Relay>> {
    let upstream = HttpUpstream::with_timeout(
        config.upstream.endpoints(),
        Duration::from_secs(config.upstream.timeout_seconds),
    )
    .context("failed to build HTTP client")?;
    let relay = Relay::new(config.provider_credentials(), Arc::new(upstream));
    log_key_status(&relay);
    Ok(Arc::new(relay))
}

fn log_key_status(relay: &Relay) {
    let keys = relay.key_status();

    match relay.credentials().openai_api_key.as_deref() {
        Some(key) if keys.has_openai => {
            let kind = key_type(key);
            info!(key_type = kind, "OpenAI API key configured");
            if kind == "Service Account" {
                warn!("Service account keys may have different permissions");
            }
        }
        _ => warn!(get_one_at = OPENAI_KEYS_URL, "OpenAI API key not set"),
    }

    if keys.has_groq {
        info!("Groq API key configured");
    } else {
        warn!(get_one_at = GROQ_KEYS_URL, "Groq API key not set");
    }

    if !keys.any() {
        warn!(
            sources = "config file, .env, environment",
            "No API keys configured!"
        );
    }
}

fn print_status(config: &Config) {
    for line in key_status_lines(&config.provider_credentials()) {
        println!("{line}");
    }
    println!(
        "Listen: {}:{} (public dir: {})",
        config.server.host,
        config.server.port,
        config.server.public_dir.display()
    );
}

fn key_status_lines(credentials: &ProviderCredentials) -> [String; 2] {
    let keys = credentials.key_status();

    let openai = match credentials.openai_api_key.as_deref() {
        Some(key) if keys.has_openai => format!("OpenAI: configured ({} key)", key_type(key)),
        Some(_) => {
            format!("OpenAI: invalid key (expected sk- prefix), get one at {OPENAI_KEYS_URL}")
        }
        None => format!("OpenAI: not set, get one at {OPENAI_KEYS_URL}"),
    };

    let groq = match credentials.groq_api_key.as_deref() {
        Some(_) if keys.has_groq => "Groq:   configured".to_string(),
        Some(_) => format!(
            "Groq:   not set or invalid (placeholder or missing gsk_ prefix), \
             get one at {GROQ_KEYS_URL}"
        ),
        None => format!("Groq:   not set, get one at {GROQ_KEYS_URL}"),
    };

    [openai, groq]
}

async fn run(config: &Config, app: Router) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            error!(
                port = config.server.port,
                "Port is already in use; stop the other process or use --port / PORT"
            );
            return Err(e).with_context(|| format!("failed to bind {addr}"));
        }
        Err(e) => {
            error!(address = %addr, error = %e, "Error starting server");
            return Err(e).with_context(|| format!("failed to bind {addr}"));
        }
    };

    info!(address = %addr, "chatrelay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("Server closed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutting down gracefully");
}
