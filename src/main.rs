//! prognos CLI: symptom-to-condition prediction.
//!
//! Prefers a running prognosd daemon (discovered via its PID file); falls
//! back to running the catalog read and worker invocation locally.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use prognos::bridge::InferenceBridge;
use prognos::catalog::{SymptomCatalog, SymptomId};
use prognos::client::{RemoteClient, discover_server};
use prognos::config::ServiceConfig;
use prognos::decode::PredictionResult;
use prognos::paths::PrognosPaths;
use prognos::request::PredictionRequest;

#[derive(Parser)]
#[command(name = "prognos", version, about = "Symptom-to-condition prediction service")]
struct Cli {
    /// Path to a config file (defaults to the XDG config location).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the symptom catalog.
    Symptoms,

    /// Predict a condition from observed symptoms.
    Predict {
        /// Symptom ids, e.g. `prognos predict fever cough`.
        #[arg(required = true)]
        symptoms: Vec<String>,
    },

    /// Verify the catalog and worker are usable (preflight + round trip).
    Check,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let paths = PrognosPaths::resolve().into_diagnostic()?;
    let config = ServiceConfig::resolve(&paths, cli.config.as_deref()).into_diagnostic()?;
    let remote = discover_server(&paths).map(|info| RemoteClient::new(&info));

    match cli.command {
        Commands::Symptoms => {
            let catalog = match &remote {
                Some(client) => client.symptoms().into_diagnostic()?,
                None => block_on(SymptomCatalog::load(&config.catalog_path))?
                    .into_diagnostic()?,
            };
            for id in catalog.iter() {
                println!("{id}");
            }
        }

        Commands::Predict { symptoms } => {
            let ids: Vec<SymptomId> = symptoms.iter().map(SymptomId::new).collect();
            let result = match &remote {
                Some(client) => client.predict(&ids).into_diagnostic()?,
                None => predict_local(&config, ids)?,
            };
            print_prediction(&result);
        }

        Commands::Check => {
            check(&config, remote.is_some())?;
        }
    }

    Ok(())
}

fn predict_local(config: &ServiceConfig, ids: Vec<SymptomId>) -> Result<PredictionResult> {
    let request = PredictionRequest::new(ids).into_diagnostic()?;
    let bridge = InferenceBridge::new(
        config.worker_command(),
        config.worker_timeout(),
        config.worker.max_concurrent,
    );
    block_on(bridge.invoke(&request))?.into_diagnostic()
}

fn print_prediction(result: &PredictionResult) {
    println!("{} (confidence {:.2})", result.label, result.confidence);
}

fn check(config: &ServiceConfig, daemon_found: bool) -> Result<()> {
    println!(
        "worker:  {} {}",
        config.worker.program,
        config.worker.args.join(" ")
    );
    println!("catalog: {}", config.catalog_path.display());
    println!(
        "daemon:  {}",
        if daemon_found { "running" } else { "not running" }
    );

    let warnings = config.preflight_warnings();
    for warning in &warnings {
        println!("warning: {warning}");
    }

    let catalog = block_on(SymptomCatalog::load(&config.catalog_path))?.into_diagnostic()?;
    let Some(first) = catalog.iter().next() else {
        miette::bail!("the symptom catalog is empty");
    };

    // Round trip one prediction through the real worker.
    let result = predict_local(config, vec![first.clone()])?;
    println!(
        "round trip ok: {} -> {} ({:.2})",
        first, result.label, result.confidence
    );
    Ok(())
}

/// Run one async operation on a throwaway current-thread runtime.
fn block_on<F: std::future::Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    Ok(rt.block_on(future))
}
