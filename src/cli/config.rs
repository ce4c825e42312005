use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::position::arrow::ArrowSettings;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "annotation-locator",
    version,
    about = "Re-resolve pinned annotation locations against a page snapshot"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: annotation-locator.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a location descriptor against a page snapshot
    Resolve {
        /// Page snapshot JSON
        #[arg(long)]
        page: String,

        /// Location descriptor JSON
        #[arg(long)]
        location: String,

        /// Arrow origin x (default: viewport center)
        #[arg(long)]
        from_x: Option<f64>,

        /// Arrow origin y (default: viewport center)
        #[arg(long)]
        from_y: Option<f64>,

        /// Output format: console, json
        #[arg(long, default_value = "console")]
        format: String,

        /// Append a JSONL resolution trace to this file
        #[arg(long)]
        trace: Option<String>,

        /// Right edge of the annotatable area, in px
        #[arg(long)]
        right_boundary: Option<f64>,
    },

    /// Compute the element identifier of the first element matching a selector
    Fingerprint {
        /// Page snapshot JSON
        #[arg(long)]
        page: String,

        /// CSS selector of the element
        #[arg(long)]
        selector: String,

        /// Fingerprint algorithm version (default: current)
        #[arg(long)]
        version: Option<u32>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `annotation-locator.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub arrow: ArrowConfig,
    #[serde(default)]
    pub tree: TreeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_relay_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_relay_timeout_ms(),
        }
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrowConfig {
    #[serde(default = "default_pointer_size")]
    pub pointer_width: f64,

    #[serde(default = "default_pointer_size")]
    pub pointer_height: f64,

    #[serde(default = "default_edge_gap")]
    pub gap_vs_screen_edge: f64,

    pub right_boundary: Option<f64>,
}

impl Default for ArrowConfig {
    fn default() -> Self {
        Self {
            pointer_width: default_pointer_size(),
            pointer_height: default_pointer_size(),
            gap_vs_screen_edge: default_edge_gap(),
            right_boundary: None,
        }
    }
}

impl ArrowConfig {
    pub fn settings(&self) -> ArrowSettings {
        ArrowSettings {
            pointer_width: self.pointer_width,
            pointer_height: self.pointer_height,
            gap_vs_screen_edge: self.gap_vs_screen_edge,
            right_boundary: self.right_boundary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_expand_delay_ms")]
    pub expand_delay_ms: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            expand_delay_ms: default_expand_delay_ms(),
        }
    }
}

impl TreeConfig {
    pub fn expand_delay(&self) -> Duration {
        Duration::from_millis(self.expand_delay_ms)
    }
}

// Serde default helpers
fn default_debounce_ms() -> u64 { 10 }
fn default_relay_timeout_ms() -> u64 { 1000 }
fn default_pointer_size() -> f64 { 24.0 }
fn default_edge_gap() -> f64 { 10.0 }
fn default_expand_delay_ms() -> u64 { 100 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("annotation-locator.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "malformed config; using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// CLI flag wins over the config file.
pub fn resolve_arrow_settings(config: &AppConfig, right_boundary: Option<f64>) -> ArrowSettings {
    ArrowSettings {
        right_boundary: right_boundary.or(config.arrow.right_boundary),
        ..config.arrow.settings()
    }
}
