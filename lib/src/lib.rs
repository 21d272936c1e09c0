pub mod data;
pub mod evaluate;
pub mod model;
pub mod preprocess;
pub mod tensor;
pub mod utils;
pub mod vis;
pub mod workflow;

use std::{io, path::PathBuf};

use thiserror::Error;

pub use data::{DataError, DataSource};
pub use model::ModelError;
pub use preprocess::NormalizeError;
pub use vis::VisError;
pub use workflow::{plot_data, run, RunReport, WorkflowConfig};

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Data(#[from] DataError),
  #[error(transparent)]
  Normalize(#[from] NormalizeError),
  #[error(transparent)]
  Model(#[from] ModelError),
  #[error(transparent)]
  Vis(#[from] VisError),
  #[error("cannot write report to {}: {source}", path.display())]
  Report {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}
