use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod input;

use cli::Args;
use ednr::{EdnResult, Reader, Value};
use input::Input;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("ednr: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Read every input, returning whether all of them parsed.
fn run(args: &Args) -> Result<bool> {
    let reader = Reader::new().with_config(args.reader_config());
    let inputs = input::collect(&args.paths, &args.globs, args.recursive)?;
    debug!(count = inputs.len(), max_depth = args.max_depth, "collected inputs");

    let mut all_ok = true;
    for input in &inputs {
        let bytes = match load(input) {
            Ok(bytes) => bytes,
            Err(err) => {
                eprintln!("ednr: {:#}", err);
                all_ok = false;
                continue;
            }
        };
        match read_values(&reader, &bytes, args.all) {
            Ok(values) => {
                debug!(input = %input, forms = values.len(), "read input");
                if !args.quiet {
                    for value in &values {
                        println!("{}", render(value, args, input));
                    }
                }
            }
            Err(err) => {
                eprintln!("ednr: {}: {}", input, err);
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

fn load(input: &Input) -> Result<Vec<u8>> {
    match input {
        Input::Stdin => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("cannot read stdin")?;
            Ok(buf)
        }
        Input::File(path) => {
            fs::read(path).with_context(|| format!("cannot read {}", path.display()))
        }
    }
}

/// Parse one input. A document made only of discarded forms yields no values.
fn read_values(reader: &Reader, bytes: &[u8], all: bool) -> EdnResult<Vec<Value>> {
    if all {
        reader.read_all_bytes(bytes)
    } else {
        Ok(reader.parse_bytes(bytes)?.into_iter().collect())
    }
}

fn render(value: &Value, args: &Args, input: &Input) -> String {
    let output = if args.print {
        format!("{:#?}", value)
    } else {
        format!("{:?}", value)
    };
    if args.with_filename {
        format!("{}:{}", input, output)
    } else {
        output
    }
}
