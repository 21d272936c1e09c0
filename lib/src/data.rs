//! Dataset acquisition: one fetch of the cars JSON array, then cleaning down to
//! the two fields the regression consumes.

use std::{
  fmt, io,
  path::{Path, PathBuf},
  time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_DATA_URL: &str = "https://storage.googleapis.com/tfjs-tutorials/carsData.json";

#[derive(Debug, Error)]
pub enum DataError {
  #[error("failed to fetch dataset from {url}: {source}")]
  Network {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("failed to read dataset from {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("dataset is not a JSON array of car records: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Where the raw records come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
  Url(String),
  File(PathBuf),
}

impl Default for DataSource {
  fn default() -> Self {
    DataSource::Url(DEFAULT_DATA_URL.to_string())
  }
}

impl fmt::Display for DataSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DataSource::Url(url) => write!(f, "{url}"),
      DataSource::File(path) => write!(f, "{}", path.display()),
    }
  }
}

/// One vehicle entry as published. Every other field of the source objects is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawCar {
  #[serde(rename = "Miles_per_Gallon", default)]
  pub miles_per_gallon: Option<f32>,
  #[serde(rename = "Horsepower", default)]
  pub horsepower: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Car {
  pub mpg: f32,
  pub horsepower: f32,
}

/// Keeps a record iff both consumed fields are present. Source order is preserved.
pub fn clean(raw: Vec<RawCar>) -> Vec<Car> {
  raw
    .into_iter()
    .filter_map(|car| match (car.miles_per_gallon, car.horsepower) {
      (Some(mpg), Some(horsepower)) => Some(Car { mpg, horsepower }),
      _ => None,
    })
    .collect()
}

pub fn parse_dataset(content: &str) -> Result<Vec<RawCar>, DataError> {
  Ok(serde_json::from_str(content)?)
}

async fn fetch_text(url: &str, timeout: Option<Duration>) -> Result<String, DataError> {
  let network = |source| DataError::Network {
    url: url.to_string(),
    source,
  };

  let mut builder = reqwest::Client::builder();
  if let Some(timeout) = timeout {
    builder = builder.timeout(timeout);
  }
  let client = builder.build().map_err(network)?;

  let response = client
    .get(url)
    .send()
    .await
    .and_then(|response| response.error_for_status())
    .map_err(network)?;
  response.text().await.map_err(network)
}

async fn read_text(path: &Path) -> Result<String, DataError> {
  tokio::fs::read_to_string(path)
    .await
    .map_err(|source| DataError::Read {
      path: path.to_path_buf(),
      source,
    })
}

/// Fetches and cleans the dataset. The only suspension point before training.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn get_data(source: &DataSource, timeout: Option<Duration>) -> Result<Vec<Car>, DataError> {
  let content = match source {
    DataSource::Url(url) => fetch_text(url, timeout).await?,
    DataSource::File(path) => read_text(path).await?,
  };
  debug!("received {} bytes", content.len());

  let raw = parse_dataset(&content)?;
  let total = raw.len();
  let cleaned = clean(raw);
  info!(
    "kept {} of {} records ({} missing mpg or horsepower)",
    cleaned.len(),
    total,
    total - cleaned.len()
  );
  Ok(cleaned)
}

#[cfg(test)]
mod tests {
  use std::net::SocketAddr;

  use axum::{http::StatusCode, routing::get, Router};
  use proptest::prelude::*;

  use super::*;
  use crate::utils;

  const SAMPLE: &str = r#"[
    {"Name": "chevrolet chevelle malibu", "Miles_per_Gallon": 20, "Cylinders": 8, "Horsepower": 100, "Origin": "USA"},
    {"Name": "ford pinto", "Miles_per_Gallon": null, "Cylinders": 4, "Horsepower": 150, "Origin": "USA"},
    {"Name": "datsun 510", "Miles_per_Gallon": 30, "Horsepower": 80, "Origin": "Japan"}
  ]"#;

  async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router).await.unwrap();
    });
    addr
  }

  fn raw(mpg: Option<f32>, horsepower: Option<f32>) -> RawCar {
    RawCar {
      miles_per_gallon: mpg,
      horsepower,
    }
  }

  #[test]
  fn drops_records_with_missing_fields() {
    let cleaned = clean(parse_dataset(SAMPLE).unwrap());
    assert_eq!(
      cleaned,
      vec![
        Car {
          mpg: 20.0,
          horsepower: 100.0
        },
        Car {
          mpg: 30.0,
          horsepower: 80.0
        },
      ]
    );
  }

  #[test]
  fn absent_fields_count_as_missing() {
    let parsed = parse_dataset(r#"[{"Name": "amc hornet"}, {"Horsepower": 90}]"#).unwrap();
    assert_eq!(parsed, vec![raw(None, None), raw(None, Some(90.0))]);
    assert!(clean(parsed).is_empty());
  }

  #[test]
  fn rejects_non_array_payload() {
    assert!(matches!(parse_dataset(r#"{"cars": []}"#), Err(DataError::Parse(_))));
    assert!(matches!(parse_dataset("<html>"), Err(DataError::Parse(_))));
  }

  proptest! {
    #[test]
    fn cleaned_iff_both_present(
      records in prop::collection::vec(
        (prop::option::of(1.0f32..60.0), prop::option::of(40.0f32..250.0)),
        0..64,
      )
    ) {
      let input: Vec<RawCar> = records.iter().map(|(m, h)| raw(*m, *h)).collect();
      let expected: Vec<Car> = records
        .iter()
        .filter_map(|(m, h)| Some(Car { mpg: (*m)?, horsepower: (*h)? }))
        .collect();
      let cleaned = clean(input);
      prop_assert!(cleaned.len() <= records.len());
      prop_assert_eq!(cleaned, expected);
    }
  }

  #[tokio::test]
  async fn fetches_over_http() {
    let _scope = utils::init_logging_tests();
    let addr = serve(Router::new().route("/carsData.json", get(|| async { SAMPLE }))).await;

    let source = DataSource::Url(format!("http://{addr}/carsData.json"));
    let cars = get_data(&source, Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(cars.len(), 2);
    assert_eq!(cars[1].horsepower, 80.0);
  }

  #[tokio::test]
  async fn http_error_status_is_a_network_error() {
    let addr = serve(Router::new().route(
      "/carsData.json",
      get(|| async { (StatusCode::NOT_FOUND, "gone") }),
    ))
    .await;

    let source = DataSource::Url(format!("http://{addr}/carsData.json"));
    let err = get_data(&source, None).await.unwrap_err();
    assert!(matches!(err, DataError::Network { .. }), "{err}");
  }

  #[tokio::test]
  async fn malformed_body_is_a_parse_error() {
    let addr = serve(Router::new().route("/carsData.json", get(|| async { "[{\"Horsepower\": " }))).await;

    let source = DataSource::Url(format!("http://{addr}/carsData.json"));
    let err = get_data(&source, None).await.unwrap_err();
    assert!(matches!(err, DataError::Parse(_)), "{err}");
  }

  #[tokio::test]
  async fn unreachable_host_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = DataSource::Url(format!("http://{addr}/carsData.json"));
    let err = get_data(&source, Some(Duration::from_secs(5))).await.unwrap_err();
    assert!(matches!(err, DataError::Network { .. }), "{err}");
  }

  #[tokio::test]
  async fn reads_local_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cars.json");
    std::fs::write(&path, SAMPLE).unwrap();

    let cars = get_data(&DataSource::File(path), None).await.unwrap();
    assert_eq!(cars.len(), 2);

    let missing = DataSource::File(dir.path().join("nope.json"));
    assert!(matches!(
      get_data(&missing, None).await,
      Err(DataError::Read { .. })
    ));
  }
}
