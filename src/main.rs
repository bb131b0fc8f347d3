//! pcm-relay command line
//!
//! Captures from the audio server (or reads raw PCM from stdin) and serves
//! the stream to every TCP client that connects.
//!
//! Listen with e.g.:
//!   nc localhost 5903 | aplay -f S16_LE -r 44100 -c 2

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pcm_relay::audio::{FrameSource, ParecSource, ReaderSource};
use pcm_relay::server::resolve_listen_addr;
use pcm_relay::{RelayConfig, RelayServer, Result};

#[derive(Parser, Debug)]
#[command(name = "pcm-relay")]
#[command(version)]
#[command(about = "Relay live PCM capture to TCP clients", long_about = None)]
struct Cli {
    /// TCP listen address
    #[arg(long, default_value = ":5903")]
    listen: String,

    /// Audio server (empty = default)
    #[arg(long, default_value = "")]
    pa_server: String,

    /// Capture device (empty = default source)
    #[arg(long, default_value = "")]
    pa_device: String,

    /// Channel count
    #[arg(long, default_value_t = 2)]
    channels: u8,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 44_100)]
    rate: u32,

    /// Buffer length in milliseconds
    #[arg(long, default_value_t = 50)]
    buffer_ms: u32,

    /// Drop clients whose write takes longer than this (0 = never)
    #[arg(long, default_value_t = 0)]
    write_timeout_ms: u64,

    /// Read raw S16LE PCM from stdin instead of capturing
    #[arg(long)]
    stdin: bool,

    /// Increase log verbosity
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    async fn to_config(&self) -> Result<RelayConfig> {
        let mut config = RelayConfig::default()
            .bind(resolve_listen_addr(&self.listen).await?)
            .capture_server(self.pa_server.as_str())
            .capture_device(self.pa_device.as_str())
            .channels(self.channels)
            .rate(self.rate)
            .buffer_ms(self.buffer_ms);

        if self.write_timeout_ms > 0 {
            config = config.write_timeout(Duration::from_millis(self.write_timeout_ms));
        }

        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "pcm_relay=debug"
    } else {
        "pcm_relay=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolve on SIGINT, or SIGTERM on Unix
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Received SIGINT");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("Received SIGTERM");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received Ctrl+C");
    }
}

async fn serve<S: FrameSource>(server: &RelayServer, source: S) -> Result<()> {
    server.run_until(source, shutdown_signal()).await?;
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.to_config().await?;

    // Validates the sample spec before anything is opened
    let server = RelayServer::new(config.clone())?;

    if cli.stdin {
        tracing::info!(spec = %config.sample_spec, "Reading PCM from stdin");
        serve(&server, ReaderSource::new(tokio::io::stdin())).await
    } else {
        let source = ParecSource::connect(
            &config.capture_server,
            &config.capture_device,
            &config.sample_spec,
            config.buffer_ms,
        )?;
        serve(&server, source).await
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Fatal error");
            ExitCode::FAILURE
        }
    }
}
