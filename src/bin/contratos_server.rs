//! Contratos Server - HTTP service and operator commands
//!
//! Commands: serve (default), generate, status
//! `generate` and `status` print JSON to stdout

use clap::{Parser, Subcommand};
use serde_json::json;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use contratos_core::{
    AppState, ContractPipeline, ContractRequest, PipelineError, ServiceConfig, TemplateLocator,
    SERVICE_VERSION,
};

#[derive(Parser)]
#[command(name = "contratos-server")]
#[command(about = "Contratos - WOLVE contract generation service")]
#[command(version)]
#[command(after_help = "Environment: PORT (default 5000), APP_ENV=production (FLASK_ENV is read when APP_ENV is unset), CONTRATOS_CONVERTER (default libreoffice; \"none\" disables PDF output), RUST_LOG")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Listen port (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate one contract without starting the service
    Generate {
        /// JSON payload (same body as POST /api/gerar-contrato)
        #[arg(short, long)]
        payload: String,
    },

    /// Report the template status
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ServiceConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", json!({ "error": e.to_string() }));
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.production);

    if let Err(e) = config.prepare_dirs() {
        tracing::error!(error = %e, "failed to create working directories");
        return ExitCode::FAILURE;
    }

    let locator = TemplateLocator::new(&config.template_path);
    locator.ensure();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(&config, locator, port.unwrap_or(config.port)).await,

        Commands::Generate { payload } => {
            let request: ContractRequest = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => {
                    println!("{:#}", json!({ "success": false, "error": format!("Invalid payload: {e}") }));
                    return ExitCode::from(2);
                }
            };

            match build_pipeline(&config).generate(&request).await {
                Ok(generated) => {
                    println!(
                        "{:#}",
                        json!({
                            "success": true,
                            "docx_file": generated.docx_file,
                            "pdf_file": generated.pdf_file,
                        })
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("{:#}", json!({ "success": false, "error": e.to_string() }));
                    exit_code_for(&e)
                }
            }
        }

        Commands::Status => {
            println!("{:#}", json!(locator.status()));
            ExitCode::SUCCESS
        }
    }
}

fn init_tracing(production: bool) {
    let default_filter = if production {
        "info"
    } else {
        "contratos_core=debug,contratos_server=debug,tower_http=debug"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_pipeline(config: &ServiceConfig) -> ContractPipeline {
    ContractPipeline::new(&config.template_path, &config.output_dir, config.build_converter())
}

fn exit_code_for(err: &PipelineError) -> ExitCode {
    if err.is_client_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    }
}

async fn serve(config: &ServiceConfig, locator: TemplateLocator, port: u16) -> ExitCode {
    let state = AppState::new(Arc::new(build_pipeline(config)), Arc::new(locator));
    let app = contratos_core::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        %addr,
        version = SERVICE_VERSION,
        production = config.production,
        "contract service listening"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("contract service stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
