//! pdfdesk binary

use clap::Parser;
use pdfdesk_cli::Cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Results may be piped; keep logs on stderr
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("pdfdesk v{}", env!("CARGO_PKG_VERSION"));

    let path = pdfdesk_cli::run(&cli)?;
    println!("{}", path.display());
    Ok(())
}
