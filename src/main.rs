//! tilegate - a gateway for serving pre-rendered map tiles.
//!
//! This binary loads the configuration, builds the project registry and
//! starts the HTTP server.

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tilegate::{
    backend::{ConnectionSpec, TileBackend},
    config::{CheckArgs, Cli, Command, ExpireLogsArgs, ServeArgs, ServiceConfig},
    logrotate,
    project::ProjectRegistry,
    server::{create_router, local_address_set, AppState},
    stats::ServiceStats,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Check(args) => run_check(args).await,
        Command::ExpireLogs(args) => run_expire_logs(args),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(args: ServeArgs) -> ExitCode {
    let config = match ServiceConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(args.verbose, &config.logfile);

    info!("tilegate v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", args.config.display());
    info!("  Listen: {}", config.bind_address());
    if !config.path_prefix.is_empty() {
        info!("  Path prefix: {}", config.path_prefix);
    }
    info!("  Layers: {}", config.layers.len());

    // Relative tile and default-tile paths resolve against the directory
    // holding the configuration file.
    let base_dir = args
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    // Opening blocks with retry until every store is reachable; the listener
    // is only bound afterwards.
    let registry = Arc::new(ProjectRegistry::from_config(&config, &base_dir).await);
    if registry.is_empty() {
        warn!("no projects could be loaded; every tile request will fail");
    }
    info!("{} project(s) ready", registry.len());

    let stats = Arc::new(ServiceStats::new());
    let local_addrs = local_address_set(&config.hostname).await;
    let state = AppState::new(registry, stats, &config.path_prefix, local_addrs);
    let router = create_router(state, &config.path_prefix, !args.no_tracing);

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
///
/// `logfile` selects the destination: `console` logs to stderr, `null` and
/// `/dev/null` disable output, anything else is a file appended to.
fn init_logging(verbose: bool, logfile: &str) {
    let env_filter = if verbose {
        "tilegate=debug,tower_http=debug"
    } else {
        "tilegate=info,tower_http=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| env_filter.into());

    match logfile {
        "console" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
        "null" | "/dev/null" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::sink))
                .init();
        }
        path => match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_ansi(false)
                            .with_writer(Arc::new(file)),
                    )
                    .init();
            }
            Err(e) => {
                eprintln!("Cannot open logfile {}: {}; logging to stderr", path, e);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .init();
            }
        },
    }
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(args: CheckArgs) -> ExitCode {
    if args.verbose {
        init_logging(true, "console");
    }

    println!("Tilegate Configuration Check");
    println!("════════════════════════════");
    println!();

    let config = match ServiceConfig::load(&args.config) {
        Ok(config) => {
            println!("✓ Configuration: {}", args.config.display());
            config
        }
        Err(e) => {
            println!("✗ Configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("✓ Listen: {}", config.bind_address());

    let base_dir = args
        .config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let mut failures = 0usize;

    for layer in &config.layers {
        println!();

        let name = match layer.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => {
                println!("✗ (unnamed layer): will be skipped at startup");
                failures += 1;
                continue;
            }
        };
        println!("Layer '{}':", name);

        if layer.files.is_empty() {
            println!("  ✗ no tileset sources: will be skipped at startup");
            failures += 1;
            continue;
        }

        for tileset in &layer.files {
            let Some(filename) = tileset.filename.as_deref() else {
                println!("  ✗ tileset without a connection spec");
                failures += 1;
                continue;
            };

            let spec = ConnectionSpec::parse(filename);
            print!("  {} ... ", spec.describe(&base_dir));

            // One probe, no retry: check reports instead of blocking.
            match TileBackend::open(&spec, &base_dir).await {
                Ok(backend) => match backend.query_format().await {
                    Some(format) => println!("✓ ok ('{}' tiles)", format),
                    None => println!("✓ ok (no format metadata, 'png' assumed)"),
                },
                Err(e) => {
                    println!("✗ {}", e);
                    failures += 1;
                }
            }

            if let Some(default_tile_path) = &tileset.default_tile_path {
                let path = if default_tile_path.is_absolute() {
                    default_tile_path.clone()
                } else {
                    base_dir.join(default_tile_path)
                };
                match std::fs::metadata(&path) {
                    Ok(_) => println!("  ✓ default tile: {}", path.display()),
                    Err(e) => {
                        println!("  ✗ default tile {}: {}", path.display(), e);
                        failures += 1;
                    }
                }
            }
        }
    }

    println!();
    println!("════════════════════════════");
    if failures == 0 {
        println!("✓ All checks passed!");
        ExitCode::SUCCESS
    } else {
        println!("✗ {} problem(s) found", failures);
        ExitCode::FAILURE
    }
}

// =============================================================================
// Expire-Logs Command
// =============================================================================

fn run_expire_logs(args: ExpireLogsArgs) -> ExitCode {
    let config = match ServiceConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if !config.logs_to_file() {
        println!("Nothing to do...");
        return ExitCode::SUCCESS;
    }

    match logrotate::expire_logs(&config.logfile) {
        Ok(summary) => {
            println!(
                "Deleted {} and compressed {} rotated log file(s)",
                summary.deleted, summary.compressed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error expiring logs: {}", e);
            ExitCode::FAILURE
        }
    }
}
