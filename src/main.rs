use std::{future::IntoFuture, net::SocketAddr, path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use gantry::{
    FileManifestStore, GatewayService, HttpClientAdapter, HttpHandler, build_router,
    config::{ConfigValidator, GatewayConfig, load_config},
    core::compile_slice,
    ports::http_client::HttpClient,
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    /// Settings file (TOML, YAML or JSON); `gantry.toml` is used when present
    #[clap(short, long)]
    config: Option<String>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Start the gateway server (default)
    Serve {
        /// Settings file to use
        #[clap(short, long)]
        config: Option<String>,
    },
    /// Compile a route manifest and print its routes
    Validate {
        /// Manifest file to validate
        manifest: String,
    },
    /// Write a starter route manifest
    Init {
        /// Output path for the new manifest
        #[clap(default_value = "config/app.yaml")]
        manifest: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { manifest }) => validate_manifest_command(&manifest).await,
        Some(Commands::Init { manifest }) => init_manifest_command(&manifest).await,
        Some(Commands::Serve { config }) => serve(config.or(args.config)).await,
        None => serve(args.config).await,
    }
}

async fn serve(config_path: Option<String>) -> Result<()> {
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;
    ConfigValidator::validate(&config).map_err(|e| eyre!("Invalid configuration: {}", e))?;

    tracing_setup::init_tracing_with_config(
        &std::env::var("RUST_LOG").unwrap_or_else(|_| config.log.level.clone()),
        config.log.json,
        config.log.include_spans,
    )
    .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    let store = Arc::new(FileManifestStore::new(&config.manifest_path));
    let gateway_service = Arc::new(GatewayService::new(store));

    // A broken persisted manifest must not keep the gateway down; the upload
    // endpoint stays available to fix it.
    match gateway_service.load_persisted().await {
        Ok(Some(table)) => {
            for entry in table.entries() {
                for target in entry.methods().values() {
                    tracing::info!(
                        "Configured route: {} {} -> {}",
                        target.method,
                        entry.listening_path(),
                        target.upstream_url
                    );
                }
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(
                error = %e,
                path = %config.manifest_path,
                "Failed to load persisted manifest; starting with an empty routing table"
            );
        }
    }

    let http_client: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client adapter")?);
    let http_handler = Arc::new(HttpHandler::new(gateway_service.clone(), http_client));
    let app = build_router(http_handler, config.max_manifest_bytes);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to address {addr}"))?;

    tracing::info!("Gantry API Gateway server starting on {}", addr);
    println!("Gantry API Gateway listening on {addr}");

    run_until_shutdown(listener, app, &config).await?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

async fn run_until_shutdown(
    listener: tokio::net::TcpListener,
    app: axum::Router,
    config: &GatewayConfig,
) -> Result<()> {
    let graceful_shutdown = Arc::new(GracefulShutdown::with_timeout(config.shutdown_timeout()));

    let signal_shutdown = graceful_shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signal_shutdown.run_signal_handler().await {
            tracing::error!("Signal handler error: {}", e);
        }
    });

    let shutdown_token = graceful_shutdown.shutdown_token();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_token.wait_for_shutdown().await;
    })
    .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.context("Server error");
        }
        shutdown_reason = graceful_shutdown.wait_for_shutdown_signal() => {
            tracing::info!("Shutdown signal received: {:?}", shutdown_reason);
        }
    }

    // Stop accepting; give in-flight requests until the deadline to drain.
    match tokio::time::timeout(graceful_shutdown.drain_timeout(), &mut server).await {
        Ok(result) => result.context("Server error"),
        Err(_) => {
            tracing::warn!(
                "Drain deadline of {:?} exceeded; dropping remaining connections",
                graceful_shutdown.drain_timeout()
            );
            Ok(())
        }
    }
}

/// Compile a manifest and report its routes
async fn validate_manifest_command(manifest_path: &str) -> Result<()> {
    println!("🔍 Validating route manifest: {manifest_path}");

    if !Path::new(manifest_path).exists() {
        eprintln!("❌ Error: Manifest file '{manifest_path}' not found");
        std::process::exit(1);
    }

    let bytes = tokio::fs::read(manifest_path)
        .await
        .with_context(|| format!("Failed to read {manifest_path}"))?;

    match compile_slice(&bytes) {
        Ok(table) => {
            println!("✅ Manifest compilation: OK");
            println!();
            println!("📋 Routes ({} paths, {} operations):", table.len(), table.route_count());
            for entry in table.entries() {
                for target in entry.methods().values() {
                    println!(
                        "   • {:<7} {} -> {}",
                        target.method.as_str().to_uppercase(),
                        entry.listening_path(),
                        target.upstream_url
                    );
                }
            }
            println!();
            println!("🎉 Manifest is valid and ready to upload!");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Manifest compilation failed:");
            eprintln!("   {e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Give every operation a non-empty summary");
            println!("   • Set x-target on the operation, or x-tag naming a tag with an x-target");
            println!("   • Declare every tag referenced by x-tag under the top-level tags list");
            std::process::exit(1);
        }
    }
}

/// Write a starter manifest
async fn init_manifest_command(manifest_path: &str) -> Result<()> {
    let path = Path::new(manifest_path);
    if path.exists() {
        eprintln!("❌ Error: Manifest file '{manifest_path}' already exists");
        std::process::exit(1);
    }

    let starter_manifest = r#"# Gantry route manifest
openapi: "3.0.0"
info:
  title: My Gateway
  version: "1.0.0"

# Operations tagged with x-tag use the tag's x-target as their upstream.
tags:
  - name: users
    description: User service
    x-target: http://localhost:3000/users/{id}

paths:
  # Named parameters are substituted into the upstream target.
  /users/{id}:
    get:
      summary: Fetch a user
      x-tag: users
      responses:
        "200":
          description: The user
    delete:
      summary: Delete a user
      x-target: http://localhost:3000/users/{id}

  # A trailing {name+} forwards the rest of the path after the target.
  /github/{account+}:
    get:
      summary: Proxy GitHub account calls
      x-target: http://localhost:3001/account
"#;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, starter_manifest)
        .await
        .context("Failed to write manifest file")?;
    println!("✅ Created starter manifest at: {manifest_path}");
    println!("   Run 'gantry validate {manifest_path}' to check it, then upload it to /gw-upload");
    Ok(())
}
