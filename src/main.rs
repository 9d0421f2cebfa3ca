use clap::Parser;
use docflow_ingest::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ingest(args) => cli::ingest::run(args).await,
        Command::Reupload(args) => cli::reupload::run(args).await,
        Command::Migrate => cli::migrate::run().await,
    }
}
