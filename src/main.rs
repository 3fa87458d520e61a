//! loanflow - Main entry point

use clap::Parser;
use loanflow::cli::{cmd_predict, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loanflow=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            policy,
            epochs,
            test_fraction,
            seed,
            warm_start,
            output,
        } => {
            cmd_train(&data, policy, epochs, test_fraction, seed, warm_start, output)?;
        }
        Commands::Predict {
            record,
            preprocessor,
            model,
        } => {
            cmd_predict(&record, preprocessor, model)?;
        }
        Commands::Serve {
            host,
            port,
            preprocessor,
            model,
        } => {
            cmd_serve(host, port, preprocessor, model).await?;
        }
    }

    Ok(())
}
