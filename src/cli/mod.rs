//! Command-line interface
//!
//! Subcommands for training, one-off prediction, and serving.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

use crate::inference::InferenceEngine;
use crate::schema::{ClientRecord, ColumnPolicy};
use crate::server::{run_server, ServerConfig};
use crate::training::{TrainEngine, TrainingConfig};
use crate::utils::DataLoader;

#[derive(Parser)]
#[command(name = "loanflow", about = "Loan-amount prediction pipeline", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model from a client CSV export
    Train {
        /// Path to the training CSV
        #[arg(short, long)]
        data: String,
        /// Column policy: strict or loose
        #[arg(short, long, default_value = "strict")]
        policy: ColumnPolicy,
        /// Training epochs
        #[arg(long, default_value_t = 50)]
        epochs: usize,
        /// Held-out test fraction
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
        /// Split and initialization seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Prior model artifact to warm-start from
        #[arg(long)]
        warm_start: Option<PathBuf>,
        /// Output directory for artifacts
        #[arg(short, long, default_value = "models")]
        output: PathBuf,
    },
    /// Predict the loan amount for a client record in a JSON file
    Predict {
        /// Path to a JSON file holding one client record
        #[arg(short, long)]
        record: String,
        /// Fitted pipeline artifact
        #[arg(long, default_value = "models/preprocessor.json")]
        preprocessor: PathBuf,
        /// Trained model artifact
        #[arg(long, default_value = "models/model.json")]
        model: PathBuf,
    },
    /// Start the prediction server
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
        /// Fitted pipeline artifact
        #[arg(long, default_value = "models/preprocessor.json")]
        preprocessor: PathBuf,
        /// Trained model artifact
        #[arg(long, default_value = "models/model.json")]
        model: PathBuf,
    },
}

fn step(msg: &str) {
    println!("  {} {}", "›".blue(), msg);
}

fn ok(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

pub fn cmd_train(
    data: &str,
    policy: ColumnPolicy,
    epochs: usize,
    test_fraction: f64,
    seed: u64,
    warm_start: Option<PathBuf>,
    output: PathBuf,
) -> anyhow::Result<()> {
    step(&format!("loading {data}"));
    let df = DataLoader::load_clients_csv(data)?;
    ok(&format!("{} rows, {} columns", df.height(), df.width()));

    let config = TrainingConfig {
        policy,
        test_fraction,
        seed,
        epochs,
        warm_start_model: warm_start,
        output_dir: output,
        ..Default::default()
    };

    step(&format!("training under {policy} policy"));
    let report = TrainEngine::new(config).run(&df)?;

    ok(&format!(
        "model trained on {} rows, evaluated on {}",
        report.n_train, report.n_test
    ));
    println!();
    println!("  {}", "Held-out metrics".bold());
    println!("    MSE   {:.4}", report.metrics.mse);
    println!("    RMSE  {:.4}", report.metrics.rmse);
    println!("    MAE   {:.4}", report.metrics.mae);
    println!("    R²    {:.4}", report.metrics.r2);
    println!();
    ok(&format!("pipeline  {}", report.preprocessor_path.display()));
    ok(&format!("model     {}", report.model_path.display()));

    Ok(())
}

pub fn cmd_predict(record: &str, preprocessor: PathBuf, model: PathBuf) -> anyhow::Result<()> {
    let engine = InferenceEngine::load(&preprocessor, &model)?;

    let json = std::fs::read_to_string(record)?;
    let client: ClientRecord = serde_json::from_str(&json)?;

    let estimate = engine.predict_one(&client)?;
    println!("  {} montant_pret = {estimate:.2}", "✓".green());

    Ok(())
}

pub async fn cmd_serve(
    host: String,
    port: u16,
    preprocessor: PathBuf,
    model: PathBuf,
) -> anyhow::Result<()> {
    let config = ServerConfig {
        host,
        port,
        preprocessor_path: preprocessor,
        model_path: model,
    };
    run_server(config).await
}
