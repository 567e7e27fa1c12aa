use ridb_dl::cli::{Invocation, usage};
use ridb_dl::{Config, Pipeline, RunOutcome, export};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Invocation::classify(std::env::args_os()) {
        Invocation::Help => {
            println!("{}", usage());
            return ExitCode::SUCCESS;
        }
        Invocation::Version(text) => {
            print!("{text}");
            return ExitCode::SUCCESS;
        }
        Invocation::Invalid(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
        Invocation::Run(cli) => cli,
    };

    init_logging();

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if cli.preview {
        config.output.stdout_preview = true;
    }

    let pipeline = match Pipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            tracing::error!(error = %e, "Could not set up the fetch");
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run(cli.input.as_deref()).await {
        Ok(RunOutcome::NoResults { source }) => {
            println!("No results found at {source}");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Exported { path, summary }) => {
            let output = &pipeline.config().output;
            if output.stdout_preview && summary.records.len() <= output.preview_limit {
                let stdout = std::io::stdout();
                if let Err(e) =
                    export::write_csv_to(&summary.records, stdout.lock(), &pipeline.columns())
                {
                    tracing::warn!(error = %e, "Could not print preview");
                }
            }
            if !summary.failed_facilities.is_empty() {
                println!(
                    "Skipped {} facilities whose lookup failed",
                    summary.failed_facilities.len()
                );
            }
            if summary.records.is_empty() {
                println!("No matching records; wrote header only to {}", path.display());
            } else {
                println!(
                    "Saved {} records ({} campsites scanned) to {}",
                    summary.records.len(),
                    summary.scanned,
                    path.display()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
