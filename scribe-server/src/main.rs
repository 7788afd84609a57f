use clap::Parser;
use colored::*;
use std::{env, io, net::SocketAddr};
use tracing::info;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use error_common::{log_error, Result, ScribeError};
use logger_redacted::{LoggerConfig, RedactingMakeWriter};
use scribe_server::{create_app, ScribeServer};
use voice_recognition_service::VoiceConfig;

/// Scribe HTTP Server
#[derive(Parser, Debug)]
#[command(name = "scribe-server")]
#[command(about = "Consultation transcription and clinical notes HTTP API server")]
struct Args {
    /// Server bind address
    #[arg(long, env = "SCRIBE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Server port
    #[arg(short, long, env = "SCRIBE_PORT", default_value = "8080")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long, env = "SCRIBE_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env before clap so flags can fall back to it
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let logging = LoggerConfig::from_env();

    init_tracing(args.verbose, &logging)?;

    if let Err(e) = run(args, &logging).await {
        log_error("scribe-server", &e);
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args, logging: &LoggerConfig) -> Result<()> {
    info!("🏥 {}", "Starting Scribe HTTP Server".bright_cyan());
    info!("📋 Version: {}", env!("CARGO_PKG_VERSION").bright_white());

    let voice_config = VoiceConfig::from_env().map_err(|e| ScribeError::ConfigError(e.to_string()))?;
    let server = ScribeServer::from_config(&voice_config, logging).map_err(|e| ScribeError::StartupError(e.to_string()))?;
    info!("✅ {}", "Consultation pipeline initialized".bright_green());

    let app = create_app(server);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|e| ScribeError::ConfigError(format!("Invalid bind address {}:{}: {}", args.host, args.port, e)))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ScribeError::NetworkError(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("🚀 {}", format!("Scribe server running on http://{}", addr).bright_green());
    info!("📋 {}", format!("Health check available at: http://{}/health", addr).bright_blue());
    info!("📋 {}", format!("API v1 available at: http://{}/api/v1", addr).bright_blue());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ScribeError::ServerError(format!("HTTP server error: {}", e)))?;

    info!("👋 Scribe server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

fn init_tracing(verbose: bool, logging: &LoggerConfig) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    // Check if we're in development or production
    let is_development = env::var("SCRIBE_ENV").unwrap_or_else(|_| "development".to_string()) == "development";
    let use_colors = env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stdout);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "scribe_server={level},voice_recognition_service={level},tower_http=info,reqwest=info",
            level = level
        )
        .into()
    });

    let writer = RedactingMakeWriter::new(io::stdout, logging.redactor());

    let result = if is_development && use_colors {
        let result = tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_file(verbose)
                    .with_line_number(verbose)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(true)
                    .with_writer(writer),
            )
            .try_init();
        print_startup_banner();
        result
    } else {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json()
                    .with_writer(writer),
            )
            .try_init()
    };

    result.map_err(|e| ScribeError::StartupError(format!("Failed to initialize tracing: {}", e)))
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                        🏥 SCRIBE                             ║".bright_cyan());
    println!("{}", "║        Consultation Transcription & Clinical Notes           ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}
