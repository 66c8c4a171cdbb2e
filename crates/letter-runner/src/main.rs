//! Scheduled letter run
//!
//! Generates the letters for the selected kinds, merges them into printable
//! batches and flags the requests as processed. Exits with status 1 after
//! writing the failure to the run log.

use clap::{Arg, ArgAction, ArgMatches, Command};
use letter_core::{run_and_record, LetterConfig, PipelineOptions, RunLog};
use letter_types::{LetterKind, RunContext};
use std::path::Path;

const DEFAULT_CONFIG: &str = ".config";
const DEFAULT_LETTERS: &str = "gw,rec";
const DEFAULT_LOG_FILE: &str = "missed_bin_letters.log";

fn cli() -> Command {
    Command::new("letter-runner")
        .version("1.0.0")
        .about("Waste collection letter generator")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file path")
                .default_value(DEFAULT_CONFIG),
        )
        .arg(
            Arg::new("letters")
                .long("letters")
                .value_name("KINDS")
                .help("Comma separated letter kinds: gw, rec, changes")
                .default_value(DEFAULT_LETTERS),
        )
        .arg(
            Arg::new("no-merge")
                .long("no-merge")
                .help("Keep individual PDFs instead of merging them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("skip-db-update")
                .long("skip-db-update")
                .help("Do not flag requests as processed")
                .action(ArgAction::SetTrue),
        )
}

fn string_arg<'a>(matches: &'a ArgMatches, id: &str, default: &'a str) -> &'a str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or(default)
}

/// Record a failure that happened before the configured run log is known
fn exit_with_failure(context: &RunContext, log_file: &Path, error: &dyn std::error::Error) -> ! {
    let run_log = RunLog::new(log_file);
    if let Err(e) = run_log.failure(context, error) {
        log::error!("Failed to write run log {}: {}", log_file.display(), e);
    }
    std::process::exit(1)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging with INFO as default if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    let context = RunContext::now();
    let default_log = Path::new(DEFAULT_LOG_FILE);

    let kinds = match LetterKind::parse_list(string_arg(&matches, "letters", DEFAULT_LETTERS)) {
        Ok(kinds) => kinds,
        Err(e) => exit_with_failure(&context, default_log, &e),
    };

    let config_path = string_arg(&matches, "config", DEFAULT_CONFIG);
    let config = match LetterConfig::from_file(config_path) {
        Ok(config) => config,
        Err(e) => exit_with_failure(&context, default_log, &e),
    };
    log::info!("Loaded configuration from {}", config_path);

    let options = PipelineOptions {
        kinds,
        merge: !matches.get_flag("no-merge"),
        mark_processed: !matches.get_flag("skip-db-update"),
    };

    if run_and_record(&config, options, context).await.is_err() {
        std::process::exit(1);
    }
}
