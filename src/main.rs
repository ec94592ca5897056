//! metricwatch binary
//!
//! Sets up the harness from configuration, drives it with the simulated
//! source and waits for every expected measurement.

use clap::Parser;
use metricwatch::cli::{Cli, Command, OutputFormat, RunArgs, generate_config_template};
use metricwatch::config::Config;
use metricwatch::harness::Harness;
use metricwatch::source::SimulatedSource;
use metricwatch::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Config { output }) => write_template(output),
        Some(Command::Run(args)) => run(&cli.config, args).await,
        None => run(&cli.config, RunArgs::default()).await,
    }
}

fn write_template(output: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        Some(path) => {
            std::fs::write(&path, generate_config_template())?;
            eprintln!("Wrote configuration template to {}", path);
        }
        None => print!("{}", generate_config_template()),
    }
    Ok(())
}

async fn run(config_path: &str, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_file(config_path)?;
    telemetry::init(&config.observability);

    let harness = Harness::setup(config)?;
    if !harness.is_installed() {
        println!("Tracking disabled; nothing to verify");
        return Ok(());
    }

    let source = SimulatedSource::from_expectations(&harness.config().expectations)
        .omit(args.omit)
        .producers(args.producers);

    tracing::info!(
        producers = args.producers,
        timeout_seconds = harness.timeout().as_secs(),
        "Starting simulated producers"
    );
    let producers = source.spawn(harness.registry().clone());

    let outcome = harness.await_all_reporters().await;

    for producer in producers {
        if let Err(e) = producer.await {
            tracing::error!(error = %e, "Producer task failed");
        }
    }

    match args.format {
        OutputFormat::Text => {
            for (label, report) in harness.reports() {
                print!("{}: {}", label, report);
            }
        }
        OutputFormat::Json => {
            let reports: serde_json::Map<String, serde_json::Value> = harness
                .reports()
                .into_iter()
                .map(|(label, report)| Ok((label, serde_json::to_value(report)?)))
                .collect::<Result<_, serde_json::Error>>()?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
    }

    if args.print_metrics {
        print!("{}", harness.metrics().gather()?);
    }

    harness.teardown();
    outcome?;
    Ok(())
}
