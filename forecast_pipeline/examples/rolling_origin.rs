use forecast_pipeline::evaluation::{evaluate, EvaluationParams};
use forecast_pipeline::models::{Linear, NaiveLag};
use forecast_pipeline::{build_features, FeatureParams, Period, TimeSeriesTable};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Six years of synthetic monthly data with a summer bump
    let start = Period::new(2018, 1)?;
    let months = 72;
    let brent: Vec<f64> = (0..months)
        .map(|i| 60.0 + 10.0 * (i as f64 / 9.0).sin())
        .collect();
    let production: Vec<f64> = (0..months)
        .map(|i| {
            let summer = if (5..=8).contains(&(i % 12)) { 300.0 } else { 0.0 };
            9_500.0 + 20.0 * brent[i] + summer
        })
        .collect();

    let table = TimeSeriesTable::monthly(start, months)
        .with_column("brent_price", brent)?
        .with_column("saudi_production", production)?;
    println!("Built table with {} months", table.len());

    let params = FeatureParams {
        horizons: vec![1, 3],
        ..FeatureParams::default()
    };
    let (features, targets) = build_features(&table, &params)?;
    println!(
        "{} features, {} complete rows",
        features.feature_names().len(),
        features.valid_rows().len()
    );

    let eval_params = EvaluationParams {
        folds: 6,
        ..EvaluationParams::default()
    };

    for horizon in targets.horizons() {
        let set = features.training_set(&targets, horizon)?;

        let naive = evaluate(&set, &eval_params, NaiveLag::default)?;
        let linear = evaluate(&set, &eval_params, Linear::default)?;

        println!("\nHorizon {} ({} training rows)", horizon, set.len());
        for evaluation in [&naive, &linear] {
            println!(
                "  {:<12} RMSE {:>8.2}  MAE {:>8.2}  sMAPE {:>5.2}%",
                evaluation.model_name,
                evaluation.metrics.rmse,
                evaluation.metrics.mae,
                evaluation.metrics.smape
            );
            for fold in &evaluation.folds {
                println!(
                    "    fold {} test {} rmse {:.2}",
                    fold.split.fold, fold.split.test_start, fold.metrics.rmse
                );
            }
        }
    }

    Ok(())
}
