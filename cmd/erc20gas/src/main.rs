mod cli;

use clap::Parser;
use tracing_subscriber::{EnvFilter, filter::Directive};

use crate::cli::Options;

fn init_tracing(level: tracing::Level) {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(level))
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let opts = Options::parse();
    init_tracing(opts.log_level);

    if let Err(err) = cli::run(opts).await {
        tracing::error!("{err:?}");
        std::process::exit(1);
    }
}
