//! Rule OpenAPI Generator - Command-line tool for generating OpenAPI documentation.
//!
//! This binary reads a route manifest (the registered routes plus each handler's
//! validation rules), inspects the handler sources for response codes and writes an
//! OpenAPI 3.0 document together with a Swagger UI page.
//!
//! # Usage
//!
//! ```bash
//! rule-openapi [OPTIONS]
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation into `public/`:
//! ```bash
//! rule-openapi -m routes.yaml -s app
//! ```
//!
//! Generate JSON documentation for a custom server:
//! ```bash
//! rule-openapi -f json --server-url https://api.example.com -o build/docs
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! rule-openapi -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use rule_openapi::cli;

fn main() -> Result<()> {
    // Parse first so the verbose flag can pick the log level
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Rule OpenAPI Generator starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
