//! The end-to-end run: fetch, plot, normalize, build, train, sweep, plot again.

use std::{path::PathBuf, time::Duration};

use burn::{
  backend::{Autodiff, NdArray},
  tensor::backend::Backend,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
  data::{get_data, Car, DataSource},
  evaluate::{original_points, test_model, Point},
  model::{create_model, CompileOptions, FitOptions, History, ModelConfig, ModelSummary},
  preprocess::{convert_to_tensor, NormalizationStats},
  utils::serialize_to_file,
  vis::{
    fit_callbacks, model_summary, scatterplot, ChartOptions, MetricName, ScatterData, Surface,
    Visor,
  },
  Error,
};

pub type PreprocessBackend = NdArray<f32>;
pub type TrainingBackend = Autodiff<PreprocessBackend>;

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
  pub source: DataSource,
  /// No timeout when `None`.
  pub fetch_timeout: Option<Duration>,
  pub output_dir: PathBuf,
  pub model: ModelConfig,
  pub compile: CompileOptions,
  pub fit: FitOptions,
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    Self {
      source: DataSource::default(),
      fetch_timeout: None,
      output_dir: PathBuf::from("mpgfit-out"),
      model: ModelConfig::default(),
      compile: CompileOptions::default(),
      fit: FitOptions::default(),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub records: usize,
  pub stats: NormalizationStats,
  pub summary: ModelSummary,
  pub history: History,
  pub predictions: Vec<Point>,
}

fn scatter_options() -> ChartOptions {
  ChartOptions::new("Horsepower", "MPG").with_height(300)
}

/// Fetches and cleans the dataset and draws the pre-training scatter.
///
/// An empty cleaned dataset is returned without plotting; normalization rejects it.
#[tracing::instrument(skip_all, fields(source = %config.source))]
pub async fn plot_data(config: &WorkflowConfig, visor: &Visor) -> Result<Vec<Car>, Error> {
  let cars = get_data(&config.source, config.fetch_timeout).await?;
  if cars.is_empty() {
    warn!("no usable records, skipping the scatter plot");
    return Ok(cars);
  }
  scatterplot(
    visor,
    &Surface::new("Horsepower v MPG"),
    &ScatterData::single(original_points(&cars)),
    &scatter_options(),
  )?;
  Ok(cars)
}

#[tracing::instrument(skip_all)]
pub async fn run(config: &WorkflowConfig) -> Result<RunReport, Error> {
  let visor = Visor::new(&config.output_dir)?;
  let mut cars = plot_data(config, &visor).await?;

  let device: <TrainingBackend as Backend>::Device = Default::default();
  let mut rng = StdRng::seed_from_u64(config.fit.seed);
  let data = convert_to_tensor::<PreprocessBackend, _>(&mut cars, &mut rng, &device)?;

  let mut model = create_model::<TrainingBackend>(&config.model, &device, config.fit.seed)?;
  let summary = model.summary();
  model_summary(&visor, &Surface::new("Model Summary"), &summary)?;

  model.compile(config.compile);
  let mut callbacks = fit_callbacks(
    &visor,
    Surface::new("Training Performance"),
    &[MetricName::Loss, MetricName::Mse],
    ChartOptions::new("Epoch", "Value").with_height(200),
  );
  let history = model
    .fit(&data.inputs, &data.labels, &config.fit, &mut callbacks)
    .await?;
  info!("Done Training");

  let predictions = test_model(&model, &data.stats)?;
  scatterplot(
    &visor,
    &Surface::new("Model Predictions vs Original Data"),
    &ScatterData::labelled(vec![
      ("original".to_string(), original_points(&cars)),
      ("predicted".to_string(), predictions.clone()),
    ]),
    &scatter_options(),
  )?;

  let report = RunReport {
    records: cars.len(),
    stats: data.stats,
    summary,
    history,
    predictions,
  };
  let path = visor.root().join(REPORT_FILE);
  serialize_to_file(&path, &report).map_err(|source| Error::Report {
    path: path.clone(),
    source,
  })?;
  info!("report written to {}", path.display());
  Ok(report)
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use super::*;
  use crate::{evaluate::SWEEP_POINTS, preprocess::NormalizeError, DataError};

  const THREE_RECORDS: &str = r#"[
    {"Name": "a", "Miles_per_Gallon": 20, "Horsepower": 100},
    {"Name": "b", "Miles_per_Gallon": null, "Horsepower": 150},
    {"Name": "c", "Miles_per_Gallon": 30, "Horsepower": 80}
  ]"#;

  fn config_for(dir: &Path, dataset: &str) -> WorkflowConfig {
    let data = dir.join("cars.json");
    std::fs::write(&data, dataset).unwrap();
    WorkflowConfig {
      source: DataSource::File(data),
      output_dir: dir.join("out"),
      model: ModelConfig {
        hidden_units: 4,
        ..ModelConfig::default()
      },
      fit: FitOptions {
        epochs: 3,
        batch_size: 2,
        ..FitOptions::default()
      },
      ..WorkflowConfig::default()
    }
  }

  #[tokio::test]
  async fn three_record_run_writes_every_surface() {
    let _scope = crate::utils::init_logging_tests();
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), THREE_RECORDS);

    let report = run(&config).await.unwrap();

    assert_eq!(report.records, 2);
    assert_eq!(
      report.stats,
      NormalizationStats {
        input_min: 80.0,
        input_max: 100.0,
        label_min: 20.0,
        label_max: 30.0,
      }
    );
    assert_eq!(report.history.epochs.len(), 3);
    assert_eq!(report.summary.total_params, 4 + 4 + 4 + 1);
    assert_eq!(report.predictions.len(), SWEEP_POINTS);
    assert!((report.predictions[0].x - 80.0).abs() < 1e-4);
    assert!((report.predictions[SWEEP_POINTS - 1].x - 100.0).abs() < 1e-4);
    // sigmoid output keeps predictions inside the observed mpg range
    assert!(report
      .predictions
      .iter()
      .all(|p| (20.0..=30.0).contains(&p.y)));

    let out = dir.path().join("out");
    for file in [
      "horsepower-v-mpg.svg",
      "model-summary.txt",
      "training-performance.svg",
      "model-predictions-vs-original-data.svg",
      REPORT_FILE,
    ] {
      assert!(out.join(file).is_file(), "missing {file}");
    }
    let json: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(out.join(REPORT_FILE)).unwrap()).unwrap();
    assert_eq!(json["records"], 2);
  }

  #[tokio::test]
  async fn parse_failure_aborts_before_any_plot() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), r#"{"not": "an array"}"#);

    let err = run(&config).await.unwrap_err();
    assert!(matches!(err, Error::Data(DataError::Parse(_))), "{err}");
    assert_eq!(std::fs::read_dir(dir.path().join("out")).unwrap().count(), 0);
  }

  #[tokio::test]
  async fn degenerate_data_stops_before_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(
      dir.path(),
      r#"[{"Miles_per_Gallon": 20, "Horsepower": 100}, {"Miles_per_Gallon": 25, "Horsepower": 100}]"#,
    );

    let err = run(&config).await.unwrap_err();
    assert!(
      matches!(err, Error::Normalize(NormalizeError::InsufficientData(_))),
      "{err}"
    );
    let out = dir.path().join("out");
    assert!(out.join("horsepower-v-mpg.svg").is_file());
    assert!(!out.join("model-summary.txt").exists());
  }

  #[tokio::test]
  async fn nothing_left_after_cleaning() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path(), r#"[{"Miles_per_Gallon": null, "Horsepower": 100}]"#);

    let visor = Visor::new(&config.output_dir).unwrap();
    assert!(plot_data(&config, &visor).await.unwrap().is_empty());
    assert!(matches!(
      run(&config).await,
      Err(Error::Normalize(NormalizeError::InsufficientData(_)))
    ));
  }
}
