//! Command-line interface parsing for the top stories tool
//!
//! This module handles parsing of CLI arguments using clap, validation of the
//! requested page, and command-line overrides of file settings.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::Settings;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// Page number or page size is not positive
    #[error("Page number and page size must be greater than 0.")]
    InvalidPage,
}

/// How results are written to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// JSON array of story records
    #[default]
    Json,
    /// Human readable table
    Table,
}

/// Long-running modes
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve pages over HTTP, sharing one cache across all requests
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value_t = 5000)]
        port: u16,
    },
}

/// Top Stories - cached, searchable pages of the Hacker News front page
#[derive(Parser, Debug)]
#[command(name = "topstories")]
#[command(about = "Cached, searchable, paginated Hacker News top stories")]
#[command(version)]
pub struct Cli {
    /// Run as a server instead of printing one page
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Page to return, starting at 1
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,

    /// Stories per page
    #[arg(long, default_value_t = 20, allow_negative_numbers = true)]
    pub page_size: i64,

    /// Only keep stories whose title contains this text (case-insensitive)
    #[arg(short, long, default_value = "")]
    pub query: String,

    /// Settings file (defaults to the XDG config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the upstream API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Override the most stories resolved per request
    #[arg(long, global = true, value_name = "N")]
    pub max_stories: Option<usize>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Applies command-line overrides on top of loaded settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(base_url) = &self.base_url {
            settings.api_settings.base_url = base_url.clone();
        }
        if let Some(max_stories) = self.max_stories {
            settings.api_settings.max_stories = max_stories;
        }
    }
}

/// A validated page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: usize,
    pub page_size: usize,
    pub query: String,
}

impl PageRequest {
    /// Validates raw page values as received from a caller.
    ///
    /// # Returns
    /// * `Ok(PageRequest)` when page and page size are positive
    /// * `Err(CliError::InvalidPage)` otherwise
    pub fn new(page_number: i64, page_size: i64, query: String) -> Result<Self, CliError> {
        if page_number <= 0 || page_size <= 0 {
            return Err(CliError::InvalidPage);
        }
        let page_number = usize::try_from(page_number).map_err(|_| CliError::InvalidPage)?;
        let page_size = usize::try_from(page_size).map_err(|_| CliError::InvalidPage)?;
        Ok(Self {
            page_number,
            page_size,
            query,
        })
    }

    /// Creates a PageRequest from parsed CLI arguments
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        Self::new(cli.page, cli.page_size, cli.query.clone())
    }
}
