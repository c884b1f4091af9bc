//! Train, select and register one forecasting model per horizon
//!
//! ```text
//! train_horizons --data data/gcc_monthly.csv --config config/pipeline.toml
//! train_horizons --data data/gcc_monthly.csv --output models --stage staging --forward-fill
//! ```

use anyhow::Context;
use clap::Parser;
use forecast_pipeline::{DataLoader, FileStore, ForecastPipeline, PipelineConfig, Stage};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "train_horizons")]
#[command(about = "Rolling-origin model selection for monthly oil production forecasts")]
#[command(version)]
struct Cli {
    /// Path to a TOML pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the monthly input CSV
    #[arg(short, long)]
    data: PathBuf,

    /// Artifact store root, overriding the configuration
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stage to register winners under, overriding the configuration
    #[arg(short, long)]
    stage: Option<Stage>,

    /// Column to forecast, overriding the configuration
    #[arg(short, long)]
    target: Option<String>,

    /// Forward-fill missing raw values before building features
    #[arg(long)]
    forward_fill: bool,

    /// Write the feature matrix and targets to this CSV
    #[arg(long)]
    features_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(output) = cli.output {
        config.registry.root = output;
    }
    if let Some(stage) = cli.stage {
        config.registry.stage = stage;
    }
    if let Some(target) = cli.target {
        config.features.target_column = target;
    }

    let mut table = DataLoader::from_csv(&cli.data)
        .with_context(|| format!("loading data from {}", cli.data.display()))?;
    if cli.forward_fill {
        table = table.forward_filled();
    }
    info!(
        periods = table.len(),
        columns = ?table.column_names(),
        "loaded input table"
    );

    let pipeline = ForecastPipeline::new(config)?;
    let report = pipeline.run(&table)?;

    if let Some(path) = &cli.features_out {
        report
            .features
            .write_csv(path, &report.targets)
            .with_context(|| format!("writing features to {}", path.display()))?;
        info!(path = %path.display(), "wrote feature matrix");
    }

    for selection in &report.selections {
        for (rank, entry) in selection.leaderboard.iter().enumerate() {
            info!(
                horizon = selection.horizon,
                rank = rank + 1,
                model = %entry.model_name,
                rmse = entry.metrics.rmse,
                mae = entry.metrics.mae,
                smape = entry.metrics.smape,
                "leaderboard"
            );
        }
    }

    let registry = &pipeline.config().registry;
    let mut store = FileStore::new(&registry.root);
    let registered = pipeline.register(&report, &mut store, registry.stage)?;
    for model in &registered {
        println!(
            "{} -> {} v{:04} ({})",
            model.name,
            model.stage,
            model.version,
            store.root().display()
        );
    }

    Ok(())
}
