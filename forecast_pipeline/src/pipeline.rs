//! End-to-end training: features, per-horizon selection and registration

use crate::config::PipelineConfig;
use crate::error::{ForecastError, Result};
use crate::features::{build_features, FeatureMatrix, HorizonTargets, TrainingSet};
use crate::registry::{ArtifactStore, Stage};
use crate::selection::{select_best, HorizonSelection};
use crate::table::TimeSeriesTable;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outcome of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub features: FeatureMatrix,
    pub targets: HorizonTargets,
    /// One selection per horizon, ascending
    pub selections: Vec<HorizonSelection>,
}

impl PipelineReport {
    /// Selection for horizon `h`
    pub fn selection(&self, horizon: usize) -> Option<&HorizonSelection> {
        self.selections.iter().find(|s| s.horizon == horizon)
    }
}

/// A stored winner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredModel {
    pub name: String,
    pub horizon: usize,
    pub stage: Stage,
    pub version: u32,
}

/// Trains and selects one model per forecast horizon
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    config: PipelineConfig,
}

impl ForecastPipeline {
    /// Create a pipeline, validating the configuration
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build features once, then select the best candidate for every
    /// horizon in parallel.
    ///
    /// A horizon left without a single training row fails with
    /// [`ForecastError::InsufficientHistory`].
    pub fn run(&self, table: &TimeSeriesTable) -> Result<PipelineReport> {
        let (features, targets) = build_features(table, &self.config.features)?;

        let params = &self.config.features;
        let sets = targets
            .horizons()
            .into_iter()
            .map(|h| {
                let set = features.training_set(&targets, h)?;
                if set.is_empty() {
                    return Err(ForecastError::InsufficientHistory {
                        available: table.len(),
                        required: params.periods_for_horizon(h),
                    });
                }
                Ok(set)
            })
            .collect::<Result<Vec<TrainingSet>>>()?;

        let evaluation = &self.config.evaluation;
        let candidates = &self.config.models;
        let selections = sets
            .into_par_iter()
            .map(|set| select_best(&set, evaluation, candidates))
            .collect::<Result<Vec<HorizonSelection>>>()?;

        for selection in &selections {
            let metrics = &selection.winner.metrics;
            info!(
                horizon = selection.horizon,
                model = %selection.winner.model_name,
                rmse = metrics.rmse,
                mae = metrics.mae,
                smape = metrics.smape,
                folds = metrics.folds,
                "selected model"
            );
        }

        Ok(PipelineReport {
            features,
            targets,
            selections,
        })
    }

    /// Store every horizon's winning artifact under `stage`
    pub fn register(
        &self,
        report: &PipelineReport,
        store: &mut dyn ArtifactStore,
        stage: Stage,
    ) -> Result<Vec<RegisteredModel>> {
        let mut registered = Vec::with_capacity(report.selections.len());
        for selection in &report.selections {
            let artifact = &selection.winner.artifact;
            let version = store.store(stage, artifact)?;
            let name = artifact.registered_name(&self.config.registry.name_prefix);
            info!(name = %name, stage = %stage, version, "registered model");
            registered.push(RegisteredModel {
                name,
                horizon: artifact.horizon,
                stage,
                version,
            });
        }
        Ok(registered)
    }
}
