use clap::Parser;
use tracing_subscriber::EnvFilter;

use verifier_pipeline::commands::{
    self,
    cli::{Cli, Commands},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so that run results on stdout stay machine readable.
    let mut filter = EnvFilter::new("info");
    if let Ok(env_filter) = std::env::var("RUST_LOG") {
        if let Ok(parsed) = env_filter.parse() {
            filter = filter.add_directive(parsed);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { config } => commands::command::init(config)?,
        Commands::Run(args) => commands::command::run(args).await?,
        Commands::Encode(args) => commands::command::encode(args).await?,
        Commands::Version {} => commands::command::version(),
    }

    Ok(())
}
