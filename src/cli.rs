use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::path::PathBuf;

use ednr::edn::reader::{DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};
use ednr::ReaderConfig;

#[derive(Parser, Debug)]
#[command(name = "ednr")]
#[command(about = "Read and validate EDN documents")]
#[command(version)]
pub struct Args {
    /// Input files or directories (reads from stdin if none provided)
    pub paths: Vec<PathBuf>,

    /// Read every top-level form instead of exactly one
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Pretty-print the parsed value tree
    #[arg(short = 'p', long)]
    pub print: bool,

    /// Print nothing for inputs that parse; only report failures
    #[arg(short = 'q', long, conflicts_with = "print")]
    pub quiet: bool,

    /// Print filename for each output line (like grep -H)
    #[arg(short = 'H', long)]
    pub with_filename: bool,

    /// Descend into directories and read every *.edn file found
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Also read files matching a glob pattern (repeatable)
    #[arg(short = 'g', long = "glob", value_name = "PATTERN")]
    pub globs: Vec<String>,

    /// Deepest allowed nesting of collections and tagged literals (1-256)
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_DEPTH,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_DEPTH_LIMIT as u64)
    )]
    pub max_depth: usize,

    /// Log debug information to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            max_depth: self.max_depth,
        }
    }
}
