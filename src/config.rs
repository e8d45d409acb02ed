//! Client configuration: CLI arguments merged over the JSON config file
//!
//! Precedence is CLI flag, then config file value, then built-in default.
//! A missing or unreadable config file is not fatal; the client continues
//! with defaults and reports it once logging is up.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;

/// Default config file path
pub const DEFAULT_CONFIG_PATH: &str = "./controlify-client.json";

/// Default controller address
pub const DEFAULT_SERVER_ADDR: &str = "controlify.io:9700";

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "controlify-client", about = "Controlify unit client", version)]
pub struct Cli {
    /// File containing a JSON config object
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address of the controlify server
    #[arg(short = 'u', long = "serverurl")]
    pub server_url: Option<String>,

    /// API key to pass to the server
    #[arg(short = 'k', long = "apikey")]
    pub api_key: Option<String>,

    /// The id of this unit
    #[arg(short = 'i', long = "unitid")]
    pub unit_id: Option<String>,

    /// JSON string specifying the spec of this unit
    #[arg(short = 's', long = "unitspec")]
    pub unit_spec: Option<String>,

    /// Turn on extra debug output
    #[arg(short, long)]
    pub debug: bool,
}

/// Shape of the JSON config file. Keys are lowercase, matching the file
/// format units ship with.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    #[serde(rename = "serverurl")]
    pub server_url: Option<String>,
    #[serde(rename = "apikey")]
    pub api_key: Option<String>,
    #[serde(rename = "unitid")]
    pub unit_id: Option<String>,
    #[serde(rename = "unitspec")]
    pub unit_spec: Option<String>,
    pub handlers: Option<HashMap<String, String>>,
    pub debug: Option<bool>,
}

impl FileConfig {
    /// Read and parse the JSON config file
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse a JSON config object
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Fully merged client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_url: String,
    pub api_key: String,
    pub unit_id: String,
    pub unit_spec: String,
    /// Verb to invocation-template overrides for the handler registry
    pub handlers: HashMap<String, String>,
    pub debug: bool,
}

impl ClientConfig {
    /// Merge CLI arguments over file values over defaults
    pub fn merge(cli: &Cli, file: FileConfig) -> Self {
        Self {
            server_url: cli
                .server_url
                .clone()
                .or(file.server_url)
                .unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
            api_key: cli.api_key.clone().or(file.api_key).unwrap_or_default(),
            unit_id: cli.unit_id.clone().or(file.unit_id).unwrap_or_default(),
            unit_spec: cli.unit_spec.clone().or(file.unit_spec).unwrap_or_default(),
            handlers: file.handlers.unwrap_or_default(),
            debug: cli.debug || file.debug.unwrap_or(false),
        }
    }
}
