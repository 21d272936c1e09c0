mod app_config;

use std::{
  error::Error,
  path::{Path, PathBuf},
};

use app_config::{AppConfig, OptimizerKind};
use clap::{ArgAction, Args, Parser, Subcommand};
use mpgfit::{model::Activation, utils, vis::Visor};
use tracing::{info, Level};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
  /// YAML config file; flags on the command line take precedence
  #[arg(long, global = true, value_name = "PATH")]
  config: Option<PathBuf>,
  /// -v for debug output, -vv for per-batch trace
  #[arg(short, long, global = true, action = ArgAction::Count)]
  verbose: u8,
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Fetch, plot, train and evaluate
  Run {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    train: TrainArgs,
  },
  /// Fetch the dataset and plot it, no training
  Plot {
    #[command(flatten)]
    source: SourceArgs,
  },
}

#[derive(Args)]
struct SourceArgs {
  /// Dataset URL
  #[arg(long)]
  url: Option<String>,
  /// Local dataset file instead of a download
  #[arg(long, value_name = "PATH", conflicts_with = "url")]
  data: Option<PathBuf>,
  /// Output directory for charts and the report
  #[arg(short, long, value_name = "DIR")]
  out: Option<PathBuf>,
  #[arg(long, value_name = "SECS")]
  timeout_secs: Option<u64>,
}

#[derive(Args)]
struct TrainArgs {
  #[arg(short, long, value_name = "INT")]
  epochs: Option<usize>,
  #[arg(long, value_name = "INT")]
  batch_size: Option<usize>,
  #[arg(long, value_name = "INT")]
  hidden_units: Option<usize>,
  /// linear or sigmoid
  #[arg(long)]
  activation: Option<Activation>,
  #[arg(long)]
  no_bias: bool,
  #[arg(long)]
  learning_rate: Option<f64>,
  #[arg(long, value_enum)]
  optimizer: Option<OptimizerKind>,
  #[arg(long)]
  seed: Option<u64>,
}

impl SourceArgs {
  fn into_app_config(self) -> AppConfig {
    AppConfig {
      url: self.url,
      data: self.data,
      out: self.out,
      timeout_secs: self.timeout_secs,
      ..AppConfig::default()
    }
  }
}

impl TrainArgs {
  fn apply(self, config: AppConfig) -> AppConfig {
    AppConfig {
      epochs: self.epochs,
      batch_size: self.batch_size,
      hidden_units: self.hidden_units,
      activation: self.activation,
      use_bias: self.no_bias.then_some(false),
      learning_rate: self.learning_rate,
      optimizer: self.optimizer,
      seed: self.seed,
      ..config
    }
  }
}

fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn Error>> {
  match path {
    None => Ok(AppConfig::default()),
    Some(path) => {
      let text = std::fs::read_to_string(path)?;
      Ok(serde_yaml::from_str(&text)?)
    }
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
  let args = Cli::parse();
  let level = match args.verbose {
    0 => Level::INFO,
    1 => Level::DEBUG,
    _ => Level::TRACE,
  };
  utils::init_logging(level)?;

  let file_config = load_config(args.config.as_deref())?;

  match args.command {
    Command::Run { source, train } => {
      let config = file_config
        .merge(train.apply(source.into_app_config()))
        .into_workflow_config();
      let report = mpgfit::run(&config).await?;
      if let Some(last) = report.history.last() {
        info!(
          "final loss {:.5} after {} epochs, output in {}",
          last.loss,
          last.epoch,
          config.output_dir.display()
        );
      }
    }
    Command::Plot { source } => {
      let config = file_config.merge(source.into_app_config()).into_workflow_config();
      let visor = Visor::new(&config.output_dir)?;
      let cars = mpgfit::plot_data(&config, &visor).await?;
      info!("plotted {} records to {}", cars.len(), visor.root().display());
    }
  }
  Ok(())
}
