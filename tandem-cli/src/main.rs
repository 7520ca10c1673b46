use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::{IpAddr, Ipv4Addr};
use tandem_server::config::DEFAULT_PORT;
use tandem_server::{Server, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tandem", version)]
#[command(about = "Signaling server pairing a laptop and a phone into one video call")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP + WebSocket signaling server.
    Serve {
        #[arg(long, env = "TANDEM_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        host: IpAddr,

        #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Address phones on the local network can reach this machine at.
        #[arg(long = "lan", value_name = "IP")]
        lan: Vec<IpAddr>,

        /// Log filter, e.g. `debug` or `tandem_server=trace`. Overrides RUST_LOG.
        #[arg(long)]
        log: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Serve {
            host,
            port,
            lan,
            log,
        } => {
            init_logging(log.as_deref())?;
            serve(ServerConfig {
                host,
                port,
                lan_addresses: lan,
            })
            .await
        }
    }
}

fn init_logging(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter `{}`", directives))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

async fn serve(config: ServerConfig) -> Result<()> {
    let lan = config.lan_addresses.clone();
    let server = Server::bind(config).await?;
    let addr = server.local_addr()?;

    println!("{}", "tandem signaling server".green().bold());
    println!("   {} http://{}", "listening:".cyan(), addr);
    for ip in &lan {
        println!("   {} http://{}:{}", "lan:".cyan(), ip, addr.port());
    }
    if lan.is_empty() && addr.ip().is_unspecified() {
        println!(
            "   {}",
            "pass --lan <ip> so a phone opening the page can be pointed here".yellow()
        );
    }

    server.run_until(shutdown_signal()).await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
