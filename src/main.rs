use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use job_server::config::{ServerConfig, DEFAULT_IO_TIMEOUT_SECS, DEFAULT_PORT};
use job_server::scheduler::DispatchCoordinator;
use job_server::server::{self, AppState};
use job_server::shutdown::install_shutdown_handler;
use job_server::storage::{load_jobs, FileSink};

#[derive(Parser, Debug)]
#[command(name = "job-server")]
#[command(version)]
#[command(about = "Hands out prompts to WebSocket workers and collects their responses")]
struct Args {
    /// Job list, one prompt per line
    jobs: PathBuf,

    /// File that accepted responses are appended to
    responses: PathBuf,

    /// Port to listen on
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Send/receive timeout for worker connections, in seconds
    #[arg(long, default_value_t = DEFAULT_IO_TIMEOUT_SECS)]
    io_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::new(args.jobs, args.responses)
        .with_listen_addr(SocketAddr::new(args.bind, args.port))
        .with_io_timeout(Duration::from_secs(args.io_timeout_secs));

    let jobs = load_jobs(&config.jobs_path).await?;
    let sink = FileSink::open(&config.responses_path)?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        jobs = jobs.len(),
        responses = %sink.path().display(),
        difficulty = config.admission.difficulty,
        window_bits = config.admission.window_bits,
        "Starting job server"
    );

    let shutdown = CancellationToken::new();
    install_shutdown_handler(shutdown.clone());

    let coordinator = Arc::new(DispatchCoordinator::new(jobs, shutdown));
    let state = AppState::new(&config, coordinator.clone(), Arc::new(sink));
    server::run(config.listen_addr, state).await?;

    if coordinator.is_drained() {
        tracing::info!("Finished!");
    } else {
        tracing::info!(pending = coordinator.pending(), "Stopped with jobs remaining");
    }
    Ok(())
}
