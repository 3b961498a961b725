//! # helpers CLI
//!
//! Command-line access to the helpers crates.
//!
//! Usage:
//!   helpers status --code <CODE> --message <MESSAGE> [--field name=desc]... [--wrap ctx]...
//!   helpers config <FILE> [--env-file <FILE>] [--secret path=value]...
//!
//! Examples:
//!   helpers status --code invalid-argument --message "bad signup" --field email=required
//!   helpers -v status --code internal --message "db down" --wrap "load account"
//!   helpers config service.toml --secret projects/p/secrets/db=hunter2

use anyhow::Context;
use clap::{Parser, Subcommand};
use helpers_config::{ConfigLoader, Env, MemorySecrets};
use helpers_error::{Error, ErrorCode, ErrorDetail, Ferror, Field, Report};
use helpers_log::{LogConfig, Logger};
use std::path::PathBuf;
use tonic_types::StatusExt;

#[derive(Parser)]
#[command(name = "helpers")]
#[command(author, version, about = "Render coded errors and load service configs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Enable verbose output (error stacks, verbose logs)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Human readable logs instead of JSON
    #[arg(long, global = true)]
    human: bool,

    /// Log below ERROR to stdout instead of stderr
    #[arg(long, global = true)]
    log_stdout: bool,

    /// Log filter directive, e.g. "info,helpers_config=debug"
    #[arg(long, global = true, env = "RUST_LOG")]
    log_filter: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an error and show its rendering and wire status
    Status {
        /// Error code, e.g. NotFound or not-found
        #[arg(long, default_value = "Unknown")]
        code: ErrorCode,

        /// Root error message
        #[arg(long)]
        message: String,

        /// Offending field as name=description (repeatable)
        #[arg(long = "field", value_parser = parse_pair)]
        fields: Vec<(String, String)>,

        /// Context message wrapped around the error (repeatable, innermost last)
        #[arg(long = "wrap")]
        wraps: Vec<String>,

        /// Machine-readable reason attached as error detail
        #[arg(long)]
        reason: Option<String>,

        /// Domain of the reason
        #[arg(long, requires = "reason")]
        domain: Option<String>,

        /// Detail metadata as key=value (repeatable)
        #[arg(long = "meta", value_parser = parse_pair, requires = "reason")]
        metadata: Vec<(String, String)>,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
    /// Load a config file and print it as JSON after expansion
    Config {
        /// Path to a .json or .toml file
        file: PathBuf,

        /// Environment file to overlay (default: ./.env when present)
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Secret available to gSecret:// values, as path=value (repeatable)
        #[arg(long = "secret", value_parser = parse_pair)]
        secrets: Vec<(String, String)>,
    },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

struct StatusArgs {
    code: ErrorCode,
    message: String,
    fields: Vec<(String, String)>,
    wraps: Vec<String>,
    reason: Option<String>,
    domain: Option<String>,
    metadata: Vec<(String, String)>,
}

/// Build the error described on the command line. Fields select the
/// fields-carrying shape; each `--wrap` adds one layer, in order.
fn build_error(args: StatusArgs) -> Error {
    let mut err = if args.fields.is_empty() {
        Error::with_code(args.code, args.message, None)
    } else {
        Error::with_fields(
            args.code,
            args.message,
            args.fields.into_iter().map(Field::from),
        )
    };

    if let Some(reason) = args.reason {
        let mut detail = ErrorDetail::new(reason);
        if let Some(domain) = args.domain {
            detail = detail.with_domain(domain);
        }
        for (key, value) in args.metadata {
            detail = detail.with_metadata(key, value);
        }
        err = err.with_detail(detail);
    }

    for message in args.wraps {
        err = err.wrap(message);
    }
    err
}

/// The parts of a status a client can see, as JSON.
fn status_json(status: &tonic::Status) -> serde_json::Value {
    let mut details = Vec::new();

    if let Some(bad_request) = status.get_details_bad_request() {
        let violations: Vec<_> = bad_request
            .field_violations
            .iter()
            .map(|v| serde_json::json!({"field": v.field, "description": v.description}))
            .collect();
        details.push(serde_json::json!({"badRequest": {"fieldViolations": violations}}));
    }

    if let Some(failure) = status.get_details_precondition_failure() {
        let violations: Vec<_> = failure
            .violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "type": v.r#type,
                    "subject": v.subject,
                    "description": v.description,
                })
            })
            .collect();
        details.push(serde_json::json!({"preconditionFailure": {"violations": violations}}));
    }

    if let Some(info) = status.get_details_error_info() {
        details.push(serde_json::json!({
            "errorInfo": {
                "reason": info.reason,
                "domain": info.domain,
                "metadata": info.metadata,
            }
        }));
    }

    serde_json::json!({
        "code": format!("{:?}", status.code()),
        "message": status.message(),
        "details": details,
    })
}

fn run_status(logger: &Logger, args: StatusArgs, json: bool, verbose: bool) -> anyhow::Result<()> {
    let err = build_error(args);
    let status = err.to_status();
    logger.debug(format_args!("built {} error with {} stacks", err.code(), err.stacks().len()));

    if json {
        let output = serde_json::json!({
            "report": Report::new(&err),
            "status": status_json(&status),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if verbose {
        println!("{:?}", err);
    } else {
        println!("{}", err);
    }

    println!("\n--- STATUS ---\n");
    println!("{}", serde_json::to_string_pretty(&status_json(&status))?);
    Ok(())
}

fn run_config(
    logger: &Logger,
    file: PathBuf,
    env_file: Option<PathBuf>,
    secrets: Vec<(String, String)>,
) -> anyhow::Result<()> {
    let env = match &env_file {
        Some(path) => Env::process().with_file(path)?,
        None => Env::load_default()?,
    };

    let mut memory = MemorySecrets::new();
    for (path, value) in secrets {
        memory.insert(path, value);
    }

    logger.verbose(format_args!("loading config {}", file.display()));
    let config: serde_json::Value = ConfigLoader::new()
        .with_env(env)
        .with_secrets(&memory)
        .load(&file)
        .map_err(|err| {
            logger.log_error(&err);
            err
        })
        .with_context(|| format!("unable to load {}", file.display()))?;

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        debug: cli.debug,
        verbose: cli.verbose,
        human: cli.human,
        log_debug_stdout: cli.log_stdout,
        filter: cli.log_filter.clone(),
    };
    let (logger, _guard) = Logger::init(&log_config)?;

    match cli.command {
        Commands::Status {
            code,
            message,
            fields,
            wraps,
            reason,
            domain,
            metadata,
            json,
        } => {
            let args = StatusArgs {
                code,
                message,
                fields,
                wraps,
                reason,
                domain,
                metadata,
            };
            run_status(&logger, args, json, cli.verbose)
        }
        Commands::Config {
            file,
            env_file,
            secrets,
        } => run_config(&logger, file, env_file, secrets),
    }
}
