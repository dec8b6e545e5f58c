pub mod common;
pub mod simple_pod_e2e;

use clap::{Parser, ValueEnum};
use common::Error;
use simple_pod_e2e::simple_pod_e2e_test;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "e2e", about = "End-to-end tests against the cluster from the current kubeconfig")]
struct Cli {
    /// Controller to test
    #[arg(value_enum)]
    controller: Controller,
}

#[derive(ValueEnum, Clone, Debug)]
enum Controller {
    SimplePod,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    match Cli::parse().controller {
        Controller::SimplePod => {
            info!("Running simple-pod end-to-end test");
            simple_pod_e2e_test().await
        }
    }
}
