//! Argument classification for the `ridb-dl` binary.
//!
//! No argument runs the full API fetch, a single path replaces the fetch with a
//! local JSON file, `--help`, `-h` or `/?` print usage, and `--version` prints
//! the version.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// Fetch RV-ready campsites from RIDB, join their facilities and save a CSV
#[derive(Debug, Parser)]
#[command(name = "ridb-dl", version)]
pub struct Cli {
    /// Local JSON file of campsites to use instead of the paginated API fetch
    pub input: Option<PathBuf>,

    /// Echo the CSV to stdout when the match count is small
    #[arg(long)]
    pub preview: bool,
}

/// What the binary was asked to do
#[derive(Debug)]
pub enum Invocation {
    /// Print usage and exit successfully
    Help,
    /// Print the version text and exit successfully
    Version(String),
    /// Run the pipeline
    Run(Cli),
    /// Unusable arguments; print the error with usage and exit non-zero
    Invalid(clap::Error),
}

impl Invocation {
    /// Classify a full argument vector, program name included
    pub fn classify<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        if args.len() == 2 && args[1] == "/?" {
            return Invocation::Help;
        }

        match Cli::try_parse_from(args) {
            Ok(cli) => Invocation::Run(cli),
            Err(e) if e.kind() == ErrorKind::DisplayHelp => Invocation::Help,
            Err(e) if e.kind() == ErrorKind::DisplayVersion => {
                Invocation::Version(e.render().to_string())
            }
            Err(e) => Invocation::Invalid(e),
        }
    }
}

/// Usage text
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}
