use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use forecast::{FEATURE_NAMES, LinearModel};
use stock_predictor::{config::load_config, pipeline::Pipeline};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Next-day stock price estimates from moving averages")]
struct Cli {
    /// Config file; falls back to $STOCK_PREDICTOR_CONFIG, then built-in defaults.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// List the companies that can be predicted.
    Companies,
    /// Fit a model on every company and report holdout accuracy.
    Train {
        /// Write the fitted model as JSON.
        #[arg(long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
    /// Estimate a company's next-day price from its row on a date.
    Predict {
        #[arg(long)]
        company: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: NaiveDate,
        /// Use a saved model instead of training first.
        #[arg(long, value_name = "FILE")]
        model: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only results.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if let Cmd::Companies = cli.cmd {
        for company in &config.companies {
            println!("{:<12} {}", company.name, company.symbol);
        }
        return Ok(());
    }

    let provider = config.build_provider()?;
    let pipeline = Pipeline::new(config, provider, Utc::now().date_naive());

    match cli.cmd {
        Cmd::Companies => {}
        Cmd::Train { save } => {
            let report = pipeline.train().await.context("training failed")?;
            let model = &report.trained.model;

            println!(
                "training rows: {}  testing rows: {}",
                report.trained.split.training.len(),
                report.trained.split.testing.len()
            );
            for (name, weight) in FEATURE_NAMES.iter().zip(model.weights) {
                println!("{name:<10} {weight:>12.6}");
            }
            println!("{:<10} {:>12.6}", "bias", model.bias);
            match &report.evaluation {
                Some(eval) => {
                    print!("test MAE {:.4}  RMSE {:.4}", eval.mae, eval.rmse);
                    match eval.r_squared {
                        Some(r2) => println!("  R² {r2:.4}"),
                        None => println!(),
                    }
                }
                None => println!("no rows on or after the cutoff to evaluate"),
            }
            if !report.failed_symbols.is_empty() {
                println!("skipped: {}", report.failed_symbols.join(", "));
            }

            if let Some(path) = save {
                model
                    .save(&path)
                    .with_context(|| format!("saving model to {}", path.display()))?;
                println!("model written to {}", path.display());
            }
        }
        Cmd::Predict {
            company,
            date,
            model,
        } => {
            if let Some(path) = model {
                let fitted = LinearModel::load(&path)
                    .with_context(|| format!("loading model from {}", path.display()))?;
                pipeline.models().install_fitted(fitted);
            }
            let prediction = pipeline
                .predict(&company, date)
                .await
                .with_context(|| format!("Error fetching data for prediction of {company}"))?;
            println!("{}", pipeline.render(&prediction));
        }
    }

    Ok(())
}
