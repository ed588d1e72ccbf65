//! undocx CLI - line-level DOCX extraction tool.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use undocx::DocxParser;

/// Line-level DOCX extraction with resolved formatting annotations
#[derive(Parser)]
#[command(
    name = "undocx",
    version,
    about = "Extract annotated lines from DOCX documents",
    long_about = "undocx - structural DOCX extraction.\n\n\
                  Resolves styles, numbering and direct formatting into \
                  per-line annotation spans."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the plain text of each line
    Lines {
        /// Input file paths
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Emit annotated line records as JSON
    Json {
        /// Input file paths
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output compact JSON (no indentation)
        #[arg(long)]
        compact: bool,
    },

    /// Show per-document summary (line, annotation and part counts)
    Info {
        /// Input file paths
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Lines { inputs } => run_batch(&inputs, print_lines),
        Commands::Json {
            inputs,
            output,
            compact,
        } => run_json(&inputs, output.as_deref(), compact),
        Commands::Info { inputs } => run_batch(&inputs, print_info),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

/// Process every input, logging and skipping failures. Fails only when no
/// input succeeds.
fn run_batch(
    inputs: &[PathBuf],
    mut handle: impl FnMut(&PathBuf) -> undocx::Result<()>,
) -> Result<(), ()> {
    let mut succeeded = 0;
    for input in inputs {
        match handle(input) {
            Ok(()) => succeeded += 1,
            Err(e) => log::error!("{}: {}", input.display(), e),
        }
    }
    if succeeded == 0 {
        Err(())
    } else {
        Ok(())
    }
}

fn print_lines(input: &PathBuf) -> undocx::Result<()> {
    let mut parser = DocxParser::new(input);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for line in parser.get_lines()? {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

fn print_info(input: &PathBuf) -> undocx::Result<()> {
    let mut parser = DocxParser::new(input);
    let records = parser.get_lines_with_meta()?;

    let annotations: usize = records.iter().map(|r| r.annotations.len()).sum();
    let numbered = records.iter().filter(|r| r.level.is_some()).count();
    let non_body = records
        .iter()
        .filter(|r| r.origin != undocx::Origin::Body)
        .count();

    println!("{}", input.display());
    println!("  lines: {}", records.len());
    println!("  annotations: {}", annotations);
    println!("  numbered lines: {}", numbered);
    println!("  header/footer/note lines: {}", non_body);
    Ok(())
}

fn run_json(inputs: &[PathBuf], output: Option<&std::path::Path>, compact: bool) -> Result<(), ()> {
    let mut all_records = Vec::new();
    let mut succeeded = 0;
    for input in inputs {
        let mut parser = DocxParser::new(input);
        match parser.get_lines_with_meta() {
            Ok(records) => {
                all_records.extend(records);
                succeeded += 1;
            }
            Err(e) => log::error!("{}: {}", input.display(), e),
        }
    }
    if succeeded == 0 {
        return Err(());
    }

    let json = if compact {
        serde_json::to_string(&all_records)
    } else {
        serde_json::to_string_pretty(&all_records)
    };
    let json = match json {
        Ok(json) => json,
        Err(e) => {
            log::error!("serialization failed: {}", e);
            return Err(());
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, json) {
                log::error!("{}: {}", path.display(), e);
                return Err(());
            }
        }
        None => println!("{}", json),
    }
    Ok(())
}
