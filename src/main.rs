//! Process entry point: CLI parsing, runtime construction, startup wiring.

use clap::Parser;
use std::net::IpAddr;
use std::path::PathBuf;

use forward_proxy::config::loader::load_config;
use forward_proxy::config::validation::validate_config;
use forward_proxy::config::ProxyConfig;
use forward_proxy::http::HttpServer;
use forward_proxy::lifecycle::signals::spawn_interrupt_handler;
use forward_proxy::net::Listener;
use forward_proxy::observability;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Forward HTTP/HTTPS proxy with a TTL-bounded DNS cache.
#[derive(Debug, Parser)]
#[command(name = "forward-proxy", version)]
struct Cli {
    /// Address to listen on.
    bind_ip: IpAddr,

    /// Port to listen on.
    bind_port: u16,

    /// Enable debug-level logging.
    #[arg(short, long)]
    verbose: bool,

    /// Optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run the event loop on a dedicated worker thread; the main thread
    /// only waits for it to exit.
    #[arg(long)]
    worker_thread: bool,
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    observability::logging::init(cli.verbose);
    tracing::info!("forward-proxy v0.1.0 starting");

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    config.listener.bind_address = format!("{}:{}", cli.bind_ip, cli.bind_port);

    validate_config(&config).map_err(|errors| {
        let joined = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("invalid configuration: {joined}")
    })?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        dns_ttl_secs = config.dns.ttl_secs,
        connect_timeout_secs = config.timeouts.connect_secs,
        "Configuration loaded"
    );

    // The whole proxy runs on one cooperatively scheduled thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    if cli.worker_thread {
        let worker = std::thread::Builder::new()
            .name("proxy-loop".into())
            .spawn(move || runtime.block_on(serve(config)))?;
        worker
            .join()
            .map_err(|_| BoxError::from("proxy worker thread panicked"))??;
    } else {
        runtime.block_on(serve(config))?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve(config: ProxyConfig) -> Result<(), BoxError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;

    let server = HttpServer::new(config);
    spawn_interrupt_handler(server.state().shutdown.clone());

    server.run(listener).await?;
    Ok(())
}
