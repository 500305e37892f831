use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use page_localizer::cli::usage_exit_code;
use page_localizer::logging::init_logging;
use page_localizer::pipeline::{self, PipelineOutcome};
use page_localizer::{LocalizeCommand, LocalizeError};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match LocalizeCommand::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(usage_exit_code(&e));
        }
    };
    init_logging(args.quiet);

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "❌ Error:".red().bold(), e);
            let code = e
                .downcast_ref::<LocalizeError>()
                .map_or(1, LocalizeError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(args: &LocalizeCommand) -> Result<()> {
    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));
        spinner
    };

    let outcome = pipeline::run_with_progress(&args.pipeline_config(), progress.clone()).await;
    progress.finish_and_clear();
    let outcome = outcome?;

    if args.quiet {
        return Ok(());
    }
    match outcome {
        PipelineOutcome::AlreadyExists { output } => {
            println!("⏭️  {} already exists. Skipping.", output.display().to_string().yellow());
        }
        PipelineOutcome::Written { output, report } => {
            println!(
                "✅ Wrote {} ({} downloaded, {} already present, {} failed)",
                output.display().to_string().green(),
                report.downloaded,
                report.skipped,
                report.failed.len()
            );
            for failure in &report.failed {
                println!("⚠️  {} {}", failure.url.red(), failure.reason);
            }
        }
    }
    Ok(())
}
