use std::{fmt, ops::Range, path::PathBuf};

use itertools::{Itertools, MinMaxResult};
use plotters::prelude::*;
use tracing::debug;

use super::{ChartOptions, Surface, VisError, Visor};
use crate::evaluate::Point;

const PALETTE: [RGBColor; 4] = [BLUE, RED, GREEN, MAGENTA];

/// One or more point series; `series[i]` labels `values[i]` in the legend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScatterData {
  pub values: Vec<Vec<Point>>,
  pub series: Vec<String>,
}

impl ScatterData {
  pub fn single(values: Vec<Point>) -> Self {
    Self {
      values: vec![values],
      series: Vec::new(),
    }
  }

  pub fn labelled(series: Vec<(String, Vec<Point>)>) -> Self {
    let (series, values) = series.into_iter().unzip();
    Self { values, series }
  }
}

fn failed(surface: &Surface, err: impl fmt::Display) -> VisError {
  VisError::Render {
    surface: surface.name.clone(),
    message: err.to_string(),
  }
}

/// Data extent padded by 5% on both sides; a single value gets a unit margin.
fn axis_range(values: impl Iterator<Item = f64>) -> Option<Range<f64>> {
  match values.filter(|v| v.is_finite()).minmax_by(|a, b| a.total_cmp(b)) {
    MinMaxResult::NoElements => None,
    MinMaxResult::OneElement(v) => Some(v - 1.0..v + 1.0),
    MinMaxResult::MinMax(lo, hi) if lo == hi => Some(lo - 1.0..hi + 1.0),
    MinMaxResult::MinMax(lo, hi) => {
      let pad = (hi - lo) * 0.05;
      Some(lo - pad..hi + pad)
    }
  }
}

#[tracing::instrument(skip_all, fields(surface = %surface.name))]
pub fn scatterplot(
  visor: &Visor,
  surface: &Surface,
  data: &ScatterData,
  options: &ChartOptions,
) -> Result<PathBuf, VisError> {
  let empty = || VisError::Empty(surface.name.clone());
  let points = || data.values.iter().flatten();
  let x_range = axis_range(points().map(|p| f64::from(p.x))).ok_or_else(empty)?;
  let y_range = axis_range(points().map(|p| f64::from(p.y))).ok_or_else(empty)?;

  let path = visor.path_for(surface, "svg");
  let root = SVGBackend::new(&path, (options.width, options.height)).into_drawing_area();
  root.fill(&WHITE).map_err(|e| failed(surface, e))?;

  let mut chart = ChartBuilder::on(&root)
    .caption(&surface.name, ("sans-serif", 18))
    .margin(10)
    .x_label_area_size(35)
    .y_label_area_size(45)
    .build_cartesian_2d(x_range, y_range)
    .map_err(|e| failed(surface, e))?;
  chart
    .configure_mesh()
    .x_desc(options.x_label.as_str())
    .y_desc(options.y_label.as_str())
    .draw()
    .map_err(|e| failed(surface, e))?;

  for (i, series) in data.values.iter().enumerate() {
    let color = PALETTE[i % PALETTE.len()];
    let drawn = chart
      .draw_series(
        series
          .iter()
          .map(|p| Circle::new((f64::from(p.x), f64::from(p.y)), 3, color.filled())),
      )
      .map_err(|e| failed(surface, e))?;
    if let Some(label) = data.series.get(i) {
      drawn
        .label(label.as_str())
        .legend(move |(x, y)| Circle::new((x, y), 3, color.filled()));
    }
  }

  if !data.series.is_empty() {
    chart
      .configure_series_labels()
      .background_style(&WHITE.mix(0.8))
      .border_style(&BLACK)
      .draw()
      .map_err(|e| failed(surface, e))?;
  }

  root.present().map_err(|e| failed(surface, e))?;
  // the backend borrows `path` until both are gone
  drop(chart);
  drop(root);
  debug!("wrote {}", path.display());
  Ok(path)
}

/// Line per named series of `(x, y)` pairs, used for the training curves.
#[tracing::instrument(skip_all, fields(surface = %surface.name))]
pub fn line_chart(
  visor: &Visor,
  surface: &Surface,
  series: &[(String, Vec<(f64, f64)>)],
  options: &ChartOptions,
) -> Result<PathBuf, VisError> {
  let empty = || VisError::Empty(surface.name.clone());
  let pairs = || series.iter().flat_map(|(_, values)| values.iter());
  let x_range = axis_range(pairs().map(|&(x, _)| x)).ok_or_else(empty)?;
  let y_range = axis_range(pairs().map(|&(_, y)| y)).ok_or_else(empty)?;

  let path = visor.path_for(surface, "svg");
  let root = SVGBackend::new(&path, (options.width, options.height)).into_drawing_area();
  root.fill(&WHITE).map_err(|e| failed(surface, e))?;

  let mut chart = ChartBuilder::on(&root)
    .caption(&surface.name, ("sans-serif", 18))
    .margin(10)
    .x_label_area_size(35)
    .y_label_area_size(55)
    .build_cartesian_2d(x_range, y_range)
    .map_err(|e| failed(surface, e))?;
  chart
    .configure_mesh()
    .x_desc(options.x_label.as_str())
    .y_desc(options.y_label.as_str())
    .draw()
    .map_err(|e| failed(surface, e))?;

  for (i, (name, values)) in series.iter().enumerate() {
    let color = PALETTE[i % PALETTE.len()];
    chart
      .draw_series(LineSeries::new(values.iter().copied(), color.stroke_width(2)))
      .map_err(|e| failed(surface, e))?
      .label(name.as_str())
      .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
  }

  chart
    .configure_series_labels()
    .background_style(&WHITE.mix(0.8))
    .border_style(&BLACK)
    .draw()
    .map_err(|e| failed(surface, e))?;

  root.present().map_err(|e| failed(surface, e))?;
  drop(chart);
  drop(root);
  Ok(path)
}
