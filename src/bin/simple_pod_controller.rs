use anyhow::Result;
use clap::{Parser, Subcommand};
use kube::CustomResourceExt;
use simple_pod_operator::config::ControllerConfig;
use simple_pod_operator::controllers::simple_pod_controller::crd::SimplePod;
use simple_pod_operator::controllers::simple_pod_controller::exec::reconciler::SimplePodReconciler;
use simple_pod_operator::shim_layer::controller_runtime::run_controller;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "simple-pod-controller", about = "Keeps one Pod running for every SimplePod")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SimplePod CustomResourceDefinition as YAML
    Export,
    /// Run the controller against the cluster from the current kubeconfig or in-cluster config
    Run(ControllerConfig),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Export => {
            println!("{}", serde_yaml::to_string(&SimplePod::crd())?);
        }
        Command::Run(config) => {
            info!(?config, "running simple-pod-controller");
            run_controller::<SimplePod, SimplePodReconciler>(config).await?;
        }
    }
    Ok(())
}
