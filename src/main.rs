//! FlowRunner CLI Entry Point
//!
//! Runs the news-monitoring agent until interrupted.
//!
//! # Usage
//!
//! ```bash
//! # Run with flowrunner.yaml (or defaults)
//! OPENAI_API_KEY=sk-... flowrunner
//!
//! # Explicit config file
//! flowrunner agent.yaml
//!
//! # Keep the CSV files somewhere else
//! flowrunner --data-dir /var/lib/flowrunner
//!
//! # Run two cycles and exit
//! flowrunner --cycles 2 --verbose
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use flowrunner::agent::config::CONFIG_PATH;
use flowrunner::agent::{api_key_from_env, build_flow, AgentConfig, AgentRunner, AgentServices};
use flowrunner::{APP_NAME, VERSION};

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    cycles: Option<u64>,
    verbose: bool,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Error => {
                    writeln!(buf, "{} {}", "[ERROR]".red().bold(), record.args())
                }
                log::Level::Warn => {
                    writeln!(buf, "{} {}", "[WARN]".yellow(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Autonomous AI/Tech News Monitor");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: flowrunner [OPTIONS] [CONFIG_FILE]");
    println!();
    println!("Arguments:");
    println!("  [CONFIG_FILE]       Agent config YAML (default: {})", CONFIG_PATH.display());
    println!();
    println!("Options:");
    println!("  --data-dir PATH     Directory for the CSV logs and report marker");
    println!("  --cycles N          Stop after N cycles (default: run forever)");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Environment:");
    println!("  OPENAI_API_KEY      API key for the language model (required)");
    println!();
    println!("Examples:");
    println!("  flowrunner");
    println!("  flowrunner agent.yaml --cycles 1");
    println!("  flowrunner --data-dir /var/lib/flowrunner --verbose");
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            "--data-dir" => {
                i += 1;
                if i >= args.len() {
                    return Err("--data-dir requires a path argument".to_string());
                }
                config.data_dir = Some(PathBuf::from(&args[i]));
            }
            "--cycles" => {
                i += 1;
                if i >= args.len() {
                    return Err("--cycles requires a number argument".to_string());
                }
                let cycles: u64 = args[i]
                    .parse()
                    .map_err(|_| format!("Invalid cycles value: {}", args[i]))?;
                if cycles == 0 {
                    return Err("--cycles must be at least 1".to_string());
                }
                config.cycles = Some(cycles);
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.config_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.config_path = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    // Parse arguments
    let cli = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    // Setup logging
    setup_logging(cli.verbose);

    // Print banner
    print_banner();

    // Load agent settings
    let mut config = match &cli.config_path {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::load_default()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    config.ensure_data_dir()?;

    let api_key = api_key_from_env().map_err(|e| {
        error!("{}", e);
        e
    })?;

    info!("Data directory: {}", config.data_dir.display());
    info!(
        "Polling every {} min, model {}, reports every {} h",
        config.poll_interval_minutes, config.model, config.report_interval_hours
    );
    info!(
        "Data files: {}, {}, {}",
        config.insights_path().display(),
        config.reports_path().display(),
        config.seen_path().display()
    );
    match cli.cycles {
        Some(n) => info!("Running {} cycle(s)", n),
        None => info!("Running until interrupted (Ctrl+C to stop)"),
    }
    println!();

    // Wire services and flow
    let services = AgentServices::production(&config, &api_key)?;
    let flow = build_flow(&services, &config);

    // Run the agent
    let mut runner = AgentRunner::new(flow, services.sleeper.clone(), config.error_pause());
    runner.run(cli.cycles);

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
