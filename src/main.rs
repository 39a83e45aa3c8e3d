//! The `tacc` driver: read C source, write textual three-address IR.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

/// Compile a subset of C to textual three-address IR.
#[derive(Parser)]
#[command(name = "tacc", version, about)]
struct Options {
  /// Input source file; standard input when omitted.
  input: Option<PathBuf>,

  /// Output file for the textual IR; standard output when omitted.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Enable debug logging.
  #[arg(short, long)]
  verbose: bool,
}

fn run(opts: &Options) -> tacc::error::CResult<()> {
  let src = match &opts.input {
    Some(path) => fs::read_to_string(path)?,
    None => {
      let mut buf = String::new();
      io::stdin().read_to_string(&mut buf)?;
      buf
    }
  };
  match &opts.output {
    Some(path) => {
      let mut out = io::BufWriter::new(fs::File::create(path)?);
      tacc::compile(&src, &mut out)?;
      out.flush()?;
    }
    None => tacc::compile(&src, &mut io::stdout().lock())?,
  }
  Ok(())
}

fn main() -> ExitCode {
  let opts = Options::parse();
  let level = if opts.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
  TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto)
    .expect("logger init");
  match run(&opts) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("tacc: error: {e}");
      ExitCode::FAILURE
    }
  }
}
