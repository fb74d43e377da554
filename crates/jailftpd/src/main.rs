//! jailftpd serves the jailftp engine over TCP, with users and their jail roots taken from a
//! TOML file.

mod config;
mod users;

use crate::{config::Config, users::UserRegistry};
use anyhow::Context;
use clap::Parser;
use jailftp::{FtpBuilder, io::TokioAsyncReadCompatExt};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::net::{TcpListener, TcpStream};
use tracing::Instrument;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "jailftpd=info,jailftp=info";

#[derive(Parser, Debug)]
#[command(name = "jailftpd", about = "An FTP server that jails every user to a directory.")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "jailftpd.toml")]
    config: PathBuf,

    /// Address to listen on, overriding the configuration file
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Tracing filter directives, overriding RUST_LOG
    #[arg(long)]
    log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter {directives:?}"))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(&cli.config).await?;
    let registry = Arc::new(UserRegistry::from_records(config.users)?);
    if registry.is_empty() {
        tracing::warn!(config = %cli.config.display(), "no users configured; every login will fail");
    }

    let listen = cli.listen.unwrap_or(config.server.listen);
    let listener = TcpListener::bind(listen)
        .await
        .with_context(|| format!("failed to bind {listen}"))?;
    tracing::info!(addr = %listener.local_addr()?, users = registry.len(), "FTP server listening");

    let welcome = config.server.welcome;

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => spawn_session(stream, addr, registry.clone(), &welcome),
                Err(e) => tracing::error!(err = %e, "failed to accept connection"),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

fn spawn_session(stream: TcpStream, addr: SocketAddr, registry: Arc<UserRegistry>, welcome: &str) {
    let span = tracing::info_span!("session", %addr);

    let local_ip = match stream.local_addr() {
        Ok(local) => local.ip(),
        Err(e) => {
            span.in_scope(|| tracing::error!(err = %e, "failed to read local address"));
            return;
        }
    };

    let ftp = FtpBuilder::new()
        .welcome(welcome)
        .build(registry, stream.compat(), local_ip); // .compat() to turn the Tokio stream into a futures one

    tokio::spawn(
        async move {
            tracing::info!("client connected");
            if let Err(e) = ftp.handle().await {
                tracing::error!(err = %e, "error handling client");
            }
        }
        .instrument(span),
    );
}
