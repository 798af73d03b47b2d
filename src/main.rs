//! Top Stories - pages of Hacker News top stories
//!
//! Loads settings and builds one cache and one upstream client for the
//! process. Without a subcommand it serves a single page request to stdout;
//! `serve` keeps the same service running behind an HTTP listener.

use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use topstories::cli::{Cli, Command, OutputFormat, PageRequest};
use topstories::data::HackerNewsClient;
use topstories::server::{self, TOP_STORIES_ROUTE};
use topstories::{output, AggregationService, CacheManager, Settings};

type BoxError = Box<dyn std::error::Error>;

/// Installs the stderr log subscriber, honouring `RUST_LOG` when set
fn init_tracing(verbose: bool) {
    let filter_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("topstories={filter_level},tower_http=info").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Loads settings and wires the cache, upstream client and pipeline
fn build_service(cli: &Cli) -> Result<AggregationService, BoxError> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut settings);
    settings.validate()?;
    debug!(?settings, "loaded settings");

    let cache = CacheManager::new(settings.cache_settings.max_entries);
    let source = HackerNewsClient::with_timeout(
        settings.api_settings.base_url.clone(),
        settings.api_settings.fetch_timeout(),
    )?;
    Ok(AggregationService::new(Arc::new(source), cache, &settings))
}

async fn run_once(cli: &Cli, request: PageRequest) -> Result<(), BoxError> {
    let service = build_service(cli)?;

    // Ctrl-C abandons outstanding fetches and prints what is already resolved
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let page = service
        .get_top_stories_until(request.page_number, request.page_size, &request.query, &cancel)
        .await;
    ctrl_c.abort();

    match cli.format {
        OutputFormat::Json => println!("{}", output::render_json(&page)?),
        OutputFormat::Table => print!("{}", output::render_table(&page, Utc::now())),
    }
    Ok(())
}

async fn serve(cli: &Cli, host: &str, port: u16) -> Result<(), BoxError> {
    let service = build_service(cli)?;

    let bind_addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("top stories server started on http://{}{}", bind_addr, TOP_STORIES_ROUTE);

    axum::serve(listener, server::router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Some(Command::Serve { host, port }) => serve(&cli, host, *port).await,
        None => {
            let request = match PageRequest::from_cli(&cli) {
                Ok(request) => request,
                Err(e) => {
                    eprintln!("error: {}", e);
                    return ExitCode::from(2);
                }
            };
            run_once(&cli, request).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
