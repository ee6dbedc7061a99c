//! btcvol-submit - package and deploy a volatility model.

use std::path::PathBuf;
use std::process::ExitCode;

use btcvol_submit::{
    DeploymentStatus, DockerCli, RegistryChange, SubmitConfig, SubmitError, SubmitReport,
    SubmitRequest, Submitter,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const RULE: &str = "============================================================";

#[derive(Parser)]
#[command(name = "btcvol-submit")]
#[command(about = "Submit a model to the BTC Volatility Competition")]
#[command(version)]
#[command(after_help = "\
Examples:
  btcvol-submit my_model.py
  btcvol-submit GARCH_Baseline.ipynb --name my-garch

Your model file should contain a class that inherits from TrackerBase
and implements the predict() method.")]
struct Cli {
    /// Path to your model file (.py or .ipynb)
    model_file: PathBuf,

    /// Custom name for your submission (auto-generated if not provided)
    #[arg(long)]
    name: Option<String>,

    /// Create submission structure but do not deploy
    #[arg(long)]
    no_deploy: bool,

    /// Additional configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to wait for the orchestrator to report the model (overrides config)
    #[arg(long)]
    max_wait: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(
            "btcvol_submit=info"
                .parse()
                .unwrap_or_else(|_| tracing::Level::INFO.into()),
        ))
        .init();

    let cli = Cli::parse();

    println!("{RULE}");
    println!("BTC Volatility Competition - Model Submission Tool");
    println!("{RULE}");

    match run(cli).await {
        Ok((report, dashboard_url)) => {
            print_report(&report, &dashboard_url);
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<(SubmitReport, String)> {
    let mut config = SubmitConfig::load(cli.config.as_deref())?;
    if let Some(secs) = cli.max_wait {
        config.deploy.max_wait_secs = secs;
    }

    let runtime = DockerCli::new(config.deploy.runtime.clone());

    let request = SubmitRequest {
        model_file: cli.model_file,
        name: cli.name,
        skip_deploy: cli.no_deploy,
    };

    println!();
    println!("Submitting {}", request.model_file.display());
    if !request.skip_deploy {
        println!(
            "Deployment may take up to {}s after the orchestrator restarts.",
            config.deploy.grace_period_secs + config.deploy.max_wait_secs
        );
    }

    let report = Submitter::new(&config, &runtime).submit(&request).await?;
    Ok((report, config.deploy.dashboard_url))
}

fn print_report(report: &SubmitReport, dashboard_url: &str) {
    println!();
    println!("Submission details:");
    println!("  Name:         {}", report.name);
    println!("  Model ID:     {}", report.model_id);
    println!("  Directory:    {}", report.submission_dir.display());
    println!("  Requirements: {}", report.requirements.join(", "));
    println!(
        "  Registry:     {}",
        match report.registry_change {
            RegistryChange::Added => "added new model",
            RegistryChange::Updated => "updated existing model",
        }
    );

    println!();
    println!("{RULE}");
    match report.deployment {
        None => {
            println!("Skipping deployment (--no-deploy).");
            println!("Submission ready! Run without --no-deploy to deploy.");
        }
        Some(status) => {
            println!("SUCCESS! Your model is now {status}");
            println!("  Model ID:   {}", report.model_id);
            println!("  Submission: {}", report.name);
            println!();
            println!("View your model at: {dashboard_url}");
        }
    }
    println!("{RULE}");
}

fn report_error(e: &anyhow::Error) {
    eprintln!();
    match e.downcast_ref::<SubmitError>() {
        Some(SubmitError::DeploymentUnconfirmed { status, hint, .. }) => {
            eprintln!("{RULE}");
            match status {
                DeploymentStatus::Failed => eprintln!("Deployment failed. Check logs with:"),
                _ => eprintln!("Deployment status: {status}. Check status with:"),
            }
            eprintln!("  {hint}");
            eprintln!("{RULE}");
        }
        Some(err) => {
            eprintln!("Error ({}): {err}", err.kind());
            if let Some(hint) = err.hint() {
                eprintln!("Diagnose with:");
                eprintln!("  {hint}");
            }
        }
        None => eprintln!("Error: {e:#}"),
    }
}
