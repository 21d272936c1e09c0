//! Chart surfaces. Every named surface becomes one file in the visor directory.

pub mod render;
pub mod show;

use std::{
  io,
  path::{Path, PathBuf},
};

use thiserror::Error;

pub use render::{line_chart, scatterplot, ScatterData};
pub use show::{fit_callbacks, model_summary, FitCallbacks, MetricName};

#[derive(Debug, Error)]
pub enum VisError {
  #[error("cannot write to {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  #[error("failed to render {surface}: {message}")]
  Render { surface: String, message: String },
  #[error("nothing to plot on {0}")]
  Empty(String),
}

/// Output directory holding every rendered surface.
#[derive(Debug, Clone)]
pub struct Visor {
  root: PathBuf,
}

impl Visor {
  pub fn new(root: impl Into<PathBuf>) -> Result<Self, VisError> {
    let root = root.into();
    std::fs::create_dir_all(&root).map_err(|source| VisError::Io {
      path: root.clone(),
      source,
    })?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn path_for(&self, surface: &Surface, extension: &str) -> PathBuf {
    self.root.join(format!("{}.{extension}", surface.slug()))
  }
}

/// A named chart target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
  pub name: String,
}

impl Surface {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }

  /// Lowercase, `-` separated file stem derived from the name.
  pub fn slug(&self) -> String {
    let mut slug = String::with_capacity(self.name.len());
    for c in self.name.chars() {
      if c.is_ascii_alphanumeric() {
        slug.push(c.to_ascii_lowercase());
      } else if !slug.is_empty() && !slug.ends_with('-') {
        slug.push('-');
      }
    }
    while slug.ends_with('-') {
      slug.pop();
    }
    if slug.is_empty() {
      slug.push_str("surface");
    }
    slug
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
  pub x_label: String,
  pub y_label: String,
  pub width: u32,
  pub height: u32,
}

impl ChartOptions {
  pub fn new(x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
    Self {
      x_label: x_label.into(),
      y_label: y_label.into(),
      ..Self::default()
    }
  }

  pub fn with_height(mut self, height: u32) -> Self {
    self.height = height;
    self
  }
}

impl Default for ChartOptions {
  fn default() -> Self {
    Self {
      x_label: "x".into(),
      y_label: "y".into(),
      width: 600,
      height: 300,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slugs_are_file_friendly() {
    assert_eq!(Surface::new("Horsepower v MPG").slug(), "horsepower-v-mpg");
    assert_eq!(
      Surface::new("Model Predictions vs Original Data").slug(),
      "model-predictions-vs-original-data"
    );
    assert_eq!(Surface::new("  --Training  Performance!").slug(), "training-performance");
    assert_eq!(Surface::new("???").slug(), "surface");
  }

  #[test]
  fn visor_creates_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let visor = Visor::new(dir.path().join("charts/run-1")).unwrap();
    assert!(visor.root().is_dir());
    assert_eq!(
      visor.path_for(&Surface::new("Model Summary"), "txt"),
      dir.path().join("charts/run-1/model-summary.txt")
    );
  }
}
