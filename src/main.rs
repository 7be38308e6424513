use std::process::ExitCode;

use apiflow::cli::{self, Cli, Command, OutputFormat, RunArgs};
use apiflow::{RunReport, RunnerConfig, RunnerError, TestRunner, logging, storage};
use clap::Parser;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run(&args),
    };

    match result {
        Ok(report) if report.success() => ExitCode::from(cli::EXIT_PASSED),
        Ok(_) => ExitCode::from(cli::EXIT_FAILED),
        Err(err) => {
            tracing::error!(error = %err, "Run aborted");
            eprintln!("error: {err}");
            ExitCode::from(cli::EXIT_ERROR)
        }
    }
}

fn run(args: &RunArgs) -> Result<RunReport, RunnerError> {
    let mut config = RunnerConfig::load(args.config.as_deref())?;
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
        config.validate()?;
    }
    logging::init_logging(&config.log)?;
    tracing::debug!(base_url = %config.base_url, "Configuration loaded");

    let suite = storage::load_suite(&args.suite)?;
    let runner = TestRunner::new(&config)?;
    let report = if args.cases.is_empty() {
        runner.run_suite(&suite)?
    } else {
        runner.run_cases(&suite, &args.cases)?
    };

    match args.format {
        OutputFormat::Text => print!("{}", cli::render_text(&report)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| RunnerError::Config(format!("Failed to serialize report: {e}")))?;
            println!("{json}");
        }
    }
    if let Some(path) = &args.report {
        storage::save_report(path, &report)?;
    }

    Ok(report)
}
