use clap::Parser;
use merchantdesk_client::cli::{self, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    merchantdesk_observability::init();

    let cli = Cli::parse();

    if let Err(err) = cli::run(cli).await {
        tracing::error!("command failed: {err:#}");
        std::process::exit(1);
    }
}
