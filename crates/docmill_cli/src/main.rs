//! Minimal command line front end.
//!
//! Workflow: run `docmill` in a directory with a `docmill.toml` (or pass a
//! config path as the only argument). This is the single top-level driver:
//! every fatal condition propagates here as an error, and only this
//! function maps it to a process exit status.

use std::env;
use std::path::Path;
use std::process;

use docmill_base::tracing::init_tracing;
use docmill_engine::{Config, generate, load_config};

mod host;

use host::{DocTagExtractor, JsonAstParser};

fn main() {
    init_tracing().unwrap();

    let config_path = env::args().nth(1).unwrap_or_else(|| "docmill.toml".to_string());
    let raw = match load_config(Path::new(&config_path)) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Error: failed to load config from {}: {}", config_path, e);
            process::exit(1);
        }
    };
    let config = match Config::from_raw(raw) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid configuration: {}", e);
            process::exit(1);
        }
    };

    println!("Destination: {}", config.destination.display());
    if !config.plugins.is_empty() {
        println!("Configured plugins: {}", config.plugins.join(", "));
    }

    let parser = JsonAstParser;
    let mut extractor = DocTagExtractor;
    match generate(config, Vec::new(), &parser, &mut extractor) {
        Ok(summary) => {
            if !summary.parse_failures.is_empty() {
                eprintln!("\nWarnings during parsing:");
                for failure in &summary.parse_failures {
                    eprintln!("  - {}: {}", failure.path.display(), failure.error);
                }
            }
            println!(
                "Processed {}/{} files, wrote {} records",
                summary.files_parsed, summary.files_matched, summary.records_written
            );
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: generation failed: {}", e);
            process::exit(1);
        }
    }
}
