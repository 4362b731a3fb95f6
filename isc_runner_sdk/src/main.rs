//! # ISC CLI
//!
//! `isc run --profile ha-gce --inputs outputs.json` checks live
//! infrastructure against a profile and exits 0 on pass, 1 on a failing
//! report and 2 on configuration or usage errors.

use clap::{Parser, Subcommand};
use isc_profile::config::constants;
use isc_profile::logging::{self, codes};
use isc_profile::{log_error, log_info, log_success, InputSet, ProfileDocument, ProfileError};
use isc_runner_base::prelude::*;
use isc_runner_sdk::profiles;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "isc", version, about = "Infrastructure state checks")]
struct Cli {
    /// Verbose logging and per-expectation output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a profile against live infrastructure
    Run(RunArgs),
    /// List built-in profiles
    List,
    /// Describe a profile's inputs and controls
    Show {
        /// Built-in profile name or profile file path
        profile: String,
    },
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Built-in profile name or profile file path
    #[arg(short, long)]
    profile: String,

    /// Input values (TOML or JSON, including `terraform output -json`)
    #[arg(short, long)]
    inputs: Option<PathBuf>,

    /// Write the JSON report to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Overall run timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Maximum concurrent fetches
    #[arg(long)]
    threads: Option<usize>,

    /// Only failing controls with impact above this value fail the run
    #[arg(long)]
    impact_threshold: Option<f64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init_global_logging(cli.verbose) {
        eprintln!("Warning: {}", e);
    }

    let result = match cli.command {
        Command::Run(args) => run(&args, cli.verbose),
        Command::List => {
            list();
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { profile } => show(&profile).map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            eprintln!("Error: {}", message);
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn load_profile(name_or_path: &str) -> Result<ProfileDocument, String> {
    profiles::resolve_profile(name_or_path).map_err(|e| {
        let code = match &e {
            ProfileError::Io { .. } => codes::profile::PROFILE_NOT_FOUND,
            _ => codes::profile::PROFILE_PARSE_ERROR,
        };
        log_error!(code, "Failed to load profile",
            "profile" => name_or_path,
            "error" => e
        );
        format!("profile '{}': {}", name_or_path, e)
    })
}

fn runner_config(args: &RunArgs) -> Result<RunnerConfig, String> {
    let mut config = RunnerConfig::new();
    if let Some(threads) = args.threads {
        config = config.with_max_threads(threads);
    }
    if let Some(secs) = args.timeout {
        config = match secs {
            0 => config.without_timeout(),
            secs => config.with_timeout(Duration::from_secs(secs)),
        };
    }
    if let Some(threshold) = args.impact_threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(format!(
                "--impact-threshold must be within [0, 1], got {}",
                threshold
            ));
        }
        config = config.with_impact_threshold(threshold);
    }
    Ok(config)
}

fn run(args: &RunArgs, verbose: bool) -> Result<ExitCode, String> {
    let start = Instant::now();

    // Phase 1: profile and inputs
    log_info!("Phase 1: Loading profile", "profile" => args.profile);
    let document = load_profile(&args.profile)?;

    let mut inputs = match &args.inputs {
        Some(path) => InputSet::load_file(path).map_err(|e| {
            log_error!(codes::profile::INVALID_INPUT, "Failed to read inputs",
                "path" => path.display(),
                "error" => e
            );
            e.to_string()
        })?,
        None => InputSet::new(),
    };
    inputs.apply_env_overrides(&document.inputs);

    let profile = document.bind_with(&inputs).map_err(|e| {
        let code = if e.is_input_error() {
            codes::profile::MISSING_INPUT
        } else {
            codes::profile::INVALID_EXPECTATION
        };
        log_error!(code, "Failed to bind profile", "error" => e);
        e.to_string()
    })?;

    // Phase 2: fetchers
    let config = runner_config(args)?;
    let command_timeout = config
        .timeout
        .unwrap_or(Duration::MAX)
        .min(Duration::from_secs(constants::runner::DEFAULT_COMMAND_TIMEOUT_SECS));
    log_info!("Phase 2: Initializing fetcher registry",
        "threads" => config.max_threads,
        "command_timeout_secs" => command_timeout.as_secs()
    );
    let registry = isc_runner_sdk::create_fetcher_registry(command_timeout).map_err(|e| {
        log_error!(codes::system::INITIALIZATION_FAILURE, "Failed to create fetcher registry",
            "error" => e
        );
        e.to_string()
    })?;

    // Phase 3: run
    log_info!("Phase 3: Running controls", "controls" => profile.controls.len());
    let runner = ControlRunner::new(Arc::new(registry), config);
    let report = runner.run_profile(&profile);

    // Phase 4: report
    let mut sinks: Vec<Box<dyn ReportSink>> = vec![Box::new(ConsoleSink::new(verbose))];
    if let Some(path) = &args.json {
        sinks.push(Box::new(JsonFileSink::new(path)));
    }
    for sink in &sinks {
        sink.emit(&report).map_err(|e| {
            log_error!(codes::runner::REPORT_SINK_FAILURE, "Failed to emit report",
                "sink" => sink.name(),
                "error" => e
            );
            e.to_string()
        })?;
    }
    if let Some(path) = &args.json {
        println!("\n[OK] Report saved to: {}", path.display());
    }

    if report.passed {
        log_success!(codes::success::RUN_COMPLETED, "Profile passed",
            "profile" => profile.name,
            "duration_ms" => start.elapsed().as_millis()
        );
    } else {
        log_error!(codes::runner::EXPECTATION_FAILED, "Profile failed",
            "profile" => profile.name,
            "failed_controls" => report.totals.controls_failed,
            "failed_expectations" => report.totals.expectations_failed
        );
    }

    Ok(ExitCode::from(report.exit_code() as u8))
}

fn list() {
    for name in profiles::list() {
        let title = profiles::resolve_profile(name)
            .ok()
            .and_then(|document| document.profile.title)
            .unwrap_or_default();
        println!("{:<10} {}", name, title);
    }
}

fn show(name_or_path: &str) -> Result<(), String> {
    let document = load_profile(name_or_path)?;
    let header = &document.profile;

    println!("{}", header.title.as_deref().unwrap_or(&header.name));
    if let Some(version) = &header.version {
        println!("Version: {}", version);
    }
    if let Some(summary) = &header.summary {
        println!("{}", summary);
    }

    println!("\nInputs:");
    for input in &document.inputs {
        let requirement = match (&input.default, input.required) {
            (Some(default), _) => format!("default {}", default),
            (None, true) => "required".to_string(),
            (None, false) => "optional".to_string(),
        };
        println!(
            "  {:<20} {:<9} {:<18} {}",
            input.name,
            input.input_type.to_string(),
            requirement,
            input.description.as_deref().unwrap_or("")
        );
    }

    println!("\nControls:");
    for control in &document.controls {
        let expectations: usize = control.resources.iter().map(|r| r.expect.len()).sum();
        println!(
            "  {:<15} impact {:.1}  {} expectation(s)  {}",
            control.name,
            control.impact,
            expectations,
            control.title.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
