use std::{fmt, path::PathBuf, str::FromStr};

use tracing::{debug, info, warn};

use super::{line_chart, ChartOptions, Surface, VisError, Visor};
use crate::model::{EpochCallback, EpochLogs, History, ModelSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricName {
  Loss,
  Mse,
}

impl MetricName {
  pub fn value(&self, logs: &EpochLogs) -> f32 {
    match self {
      MetricName::Loss => logs.loss,
      MetricName::Mse => logs.mse,
    }
  }
}

impl fmt::Display for MetricName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MetricName::Loss => write!(f, "loss"),
      MetricName::Mse => write!(f, "mse"),
    }
  }
}

impl FromStr for MetricName {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "loss" => Ok(MetricName::Loss),
      "mse" => Ok(MetricName::Mse),
      other => Err(format!("unknown metric `{other}`")),
    }
  }
}

/// Writes the layer table to `<surface>.txt` and echoes it to the log.
pub fn model_summary(
  visor: &Visor,
  surface: &Surface,
  summary: &ModelSummary,
) -> Result<PathBuf, VisError> {
  let path = visor.path_for(surface, "txt");
  std::fs::write(&path, summary.to_string()).map_err(|source| VisError::Io {
    path: path.clone(),
    source,
  })?;
  info!("{}\n{summary}", surface.name);
  Ok(path)
}

/// Epoch callback that keeps a running history and redraws one line per metric
/// after every epoch.
#[derive(Debug)]
pub struct FitCallbacks {
  visor: Visor,
  surface: Surface,
  metrics: Vec<MetricName>,
  options: ChartOptions,
  history: History,
  last_render: Option<PathBuf>,
}

pub fn fit_callbacks(
  visor: &Visor,
  surface: Surface,
  metrics: &[MetricName],
  options: ChartOptions,
) -> FitCallbacks {
  FitCallbacks {
    visor: visor.clone(),
    surface,
    metrics: metrics.to_vec(),
    options,
    history: History::default(),
    last_render: None,
  }
}

impl FitCallbacks {
  pub fn history(&self) -> &History {
    &self.history
  }

  /// Path of the most recent successful redraw.
  pub fn chart_path(&self) -> Option<&PathBuf> {
    self.last_render.as_ref()
  }

  fn series(&self) -> Vec<(String, Vec<(f64, f64)>)> {
    self
      .metrics
      .iter()
      .map(|metric| {
        let values = self
          .history
          .epochs
          .iter()
          .map(|logs| (logs.epoch as f64, f64::from(metric.value(logs))))
          .collect();
        (metric.to_string(), values)
      })
      .collect()
  }

  fn render(&mut self) {
    match line_chart(&self.visor, &self.surface, &self.series(), &self.options) {
      Ok(path) => self.last_render = Some(path),
      // a failed redraw must not interrupt training
      Err(err) => warn!("{err}"),
    }
  }
}

impl EpochCallback for FitCallbacks {
  fn on_epoch_end(&mut self, logs: &EpochLogs) {
    self.history.push(*logs);
    self.render();
  }

  fn on_train_end(&mut self, history: &History) {
    debug!(
      epochs = history.epochs.len(),
      chart = ?self.last_render,
      "training curves complete"
    );
  }
}
