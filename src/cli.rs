//! Command-line interface definitions and parsing
//!
//! This module defines the CLI structure for pickr using the `clap` crate.
//!
//! # Commands
//!
//! - **pick**: Select content through the picker and print the outcome
//! - **recover**: Report an outcome left behind by an interrupted run
//! - **resolve**: Show how a single handle resolves, without copying
//! - **clear-cache**: Remove materialized copies
//! - **config**: Show the configuration or its location
//!
//! # Examples
//!
//! ```
//! use pickr::cli::{Cli, Commands};
//! use clap::Parser;
//!
//! let cli = Cli::parse_from(["pickr", "pick", "--file-type", "image", "--multiple"]);
//! assert!(matches!(cli.command, Commands::Pick { multiple: true, .. }));
//! ```

use crate::PickrError;
use crate::request::{FileType, SelectionRequest, TypeFilter};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pickr")]
#[command(about = "Pick files and directories, surviving interruptions", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress informational output (only print results)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Log debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Use this configuration file instead of the default
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Pick one or more files, or a directory
    #[command(visible_alias = "p")]
    Pick {
        /// Answer the picker with these handles or paths instead of prompting
        #[arg(value_name = "HANDLE")]
        handles: Vec<String>,

        /// Raw type filter: a MIME pattern or comma-separated list
        #[arg(short = 't', long = "type", value_name = "FILTER", conflicts_with = "file_type")]
        type_filter: Option<String>,

        /// Preset file type
        #[arg(short = 'f', long = "file-type", value_enum)]
        file_type: Option<FileType>,

        /// Extensions for the custom file type (without dot)
        #[arg(short = 'e', long = "extension", value_name = "EXT", num_args = 1..)]
        extensions: Vec<String>,

        /// Allow selecting several files
        #[arg(short = 'm', long = "multiple")]
        multiple: bool,

        /// Load the picked bytes into memory
        #[arg(long = "with-data")]
        with_data: bool,

        /// Treat the storage permission as already granted
        #[arg(short = 'y', long = "yes")]
        yes: bool,

        /// Print the outcome as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// Report the outcome of an interrupted selection, if any
    #[command(visible_alias = "r")]
    Recover {
        /// Print the outcome as JSON
        #[arg(long = "json")]
        json: bool,
    },

    /// Show how a handle resolves to a local path
    Resolve {
        #[arg(value_name = "HANDLE")]
        handle: String,
    },

    /// Remove materialized copies of picked content
    #[command(name = "clear-cache")]
    ClearCache,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file location
    Path,
}

impl Cli {
    /// Parse command line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Commands {
    /// Build the selection request described by a `pick` command
    ///
    /// # Errors
    ///
    /// Returns `PickrError::InvalidInput` for a custom file type without
    /// usable extensions, or when called on another command.
    pub fn selection_request(&self) -> Result<SelectionRequest, PickrError> {
        let Self::Pick {
            type_filter,
            file_type,
            extensions,
            multiple,
            with_data,
            ..
        } = self
        else {
            return Err(PickrError::InvalidInput("not a pick command".into()));
        };

        let filter = match (type_filter, file_type) {
            (Some(raw), _) => TypeFilter::parse(raw),
            (None, Some(file_type)) => file_type.to_filter(extensions)?,
            (None, None) if !extensions.is_empty() => FileType::Custom.to_filter(extensions)?,
            (None, None) => TypeFilter::Any,
        };

        let request = match filter {
            TypeFilter::Directory => SelectionRequest::directory(),
            filter if *multiple => SelectionRequest::files(filter),
            filter => SelectionRequest::file(filter),
        };
        Ok(request.with_data(*with_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SelectionKind;

    fn pick(args: &[&str]) -> Commands {
        let mut argv = vec!["pickr", "pick"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv).command
    }

    #[test]
    fn test_pick_defaults_to_any_single_file() {
        let request = pick(&[]).selection_request().unwrap();
        assert_eq!(request.kind, SelectionKind::File);
        assert_eq!(request.type_filter, TypeFilter::Any);
        assert!(!request.with_data);
    }

    #[test]
    fn test_pick_file_type_preset() {
        let request = pick(&["-f", "media", "-m", "--with-data"]).selection_request().unwrap();
        assert_eq!(request.kind, SelectionKind::Files);
        assert_eq!(
            request.type_filter,
            TypeFilter::List(vec!["image/*".into(), "video/*".into()])
        );
        assert!(request.with_data);
    }

    #[test]
    fn test_pick_raw_type() {
        let request = pick(&["--type", "application/pdf"]).selection_request().unwrap();
        assert_eq!(request.type_filter, TypeFilter::Mime("application/pdf".into()));
    }

    #[test]
    fn test_pick_directory_ignores_multiple() {
        let request = pick(&["-f", "dir", "-m"]).selection_request().unwrap();
        assert!(request.is_directory());
        assert!(!request.multiple);
    }

    #[test]
    fn test_pick_extensions_imply_custom() {
        let request = pick(&["-e", "pdf", "docx"]).selection_request().unwrap();
        assert_eq!(request.type_filter, TypeFilter::List(vec!["pdf".into(), "docx".into()]));
    }

    #[test]
    fn test_pick_custom_without_extensions_is_rejected() {
        assert!(matches!(
            pick(&["-f", "custom"]).selection_request(),
            Err(PickrError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_type_conflicts_with_file_type() {
        assert!(Cli::try_parse_from(["pickr", "pick", "-t", "x/y", "-f", "image"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["pickr", "recover", "--json", "-q", "--config", "/tmp/c.toml"]);
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(cli.command, Commands::Recover { json: true }));
    }

    #[test]
    fn test_selection_request_on_other_command() {
        assert!(Commands::ClearCache.selection_request().is_err());
    }
}
