//! CLI surface and the resolved [`Config`] derived from it.

use std::path::PathBuf;

use clap::Parser;
use sfflt_gen::OutputFormat;
use thiserror::Error;

/// `sfflt_lang [-v] [--format=oneline|pretty|N] FILE`.
#[derive(Parser, Debug)]
#[command(
    name = "sfflt_lang",
    version,
    about = "Compiles a .sf source file to a three-symbol F/L/T instruction stream"
)]
pub struct Cli {
    /// Print version information and exit.
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    /// Output layout: `oneline`, `pretty`, or a positive column width.
    #[arg(long = "format", default_value = "64")]
    pub format: String,

    /// The `.sf` source file to compile.
    pub file: Option<PathBuf>,
}

impl Cli {
    pub fn print_usage() {
        eprintln!("Usage: sfflt_lang [-v] [--format=oneline|pretty|N] FILE");
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatOptionError {
    #[error("Invalid format option. [oneline, pretty, (number of column)]")]
    Invalid,
}

/// The resolved, validated configuration for one compile.
#[derive(Debug, Clone)]
pub struct Config {
    pub format: OutputFormat,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, FormatOptionError> {
        Ok(Self { format: parse_format(&cli.format)? })
    }
}

/// `oneline`/`pretty` are recognized by name; anything else must parse
/// as a positive column count.
fn parse_format(raw: &str) -> Result<OutputFormat, FormatOptionError> {
    match raw {
        "oneline" => Ok(OutputFormat::OneLine),
        "pretty" => Ok(OutputFormat::Pretty),
        other => {
            let column: usize = other.parse().map_err(|_| FormatOptionError::Invalid)?;
            if column == 0 {
                return Err(FormatOptionError::Invalid);
            }
            Ok(OutputFormat::Square(column))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_oneline_and_pretty() {
        assert_eq!(parse_format("oneline"), Ok(OutputFormat::OneLine));
        assert_eq!(parse_format("pretty"), Ok(OutputFormat::Pretty));
    }

    #[test]
    fn parses_positive_column_width() {
        assert_eq!(parse_format("64"), Ok(OutputFormat::Square(64)));
    }

    #[test]
    fn rejects_zero_and_non_numeric() {
        assert_eq!(parse_format("0"), Err(FormatOptionError::Invalid));
        assert_eq!(parse_format("wide"), Err(FormatOptionError::Invalid));
    }
}
