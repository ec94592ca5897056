//! Command-line interface for metricwatch
//!
//! Provides argument parsing and subcommand handling for the metricwatch binary.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Verifies that a system emits a complete set of named measurements in time
#[derive(Parser)]
#[command(name = "metricwatch")]
#[command(version)]
#[command(about = "Verifies that a system emits a complete set of named measurements in time")]
#[command(
    long_about = "metricwatch installs pattern-tracking reporters, feeds them measurement \
    notifications and waits, within a deadline, until every expected measurement name \
    has been seen at least once."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "metricwatch.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a verification against the simulated notification source
    Run(RunArgs),
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Gauge (as written in the config) the source should never emit
    #[arg(long = "omit", value_name = "GAUGE")]
    pub omit: Vec<String>,

    /// Number of concurrent producer tasks
    #[arg(long, default_value_t = 2)]
    pub producers: usize,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also print harness metrics in Prometheus text format
    #[arg(long)]
    pub print_metrics: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            omit: Vec::new(),
            producers: 2,
            format: OutputFormat::Text,
            print_metrics: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# metricwatch Configuration
# ==========================
#
# Declares which reporters are installed, which measurement names each of them
# must observe, and how long to wait for them.

# ─────────────────────────────────────────────────────────────────────────────
# REPORTERS
# ─────────────────────────────────────────────────────────────────────────────

[metrics]
# Master switch: when false, no reporter is installed
system_resource_metrics = true

# Reporters to install; each needs a [metrics.reporter.<name>] table
reporters = ["test_reporter"]

[metrics.reporter.test_reporter]
# Factory that builds this reporter ("pattern" is built in)
factory = "pattern"

# Any other keys are handed to the factory unchanged
label = "system-resources"

# ─────────────────────────────────────────────────────────────────────────────
# EXPECTATIONS
# ─────────────────────────────────────────────────────────────────────────────
#
# Every host prefix is combined with every gauge name. A pattern is satisfied by
# the first measurement whose fully qualified name matches it; later matches are
# ignored.

[expectations]
hosts = ["taskmanager.", "jobmanager."]

gauges = [
    "System.CPU.Idle",
    "System.CPU.Sys",
    "System.CPU.User",
    "System.CPU.IOWait",
    "System.CPU.Irq",
    "System.CPU.SoftIrq",
    "System.CPU.Steal",
    "System.CPU.Nice",
    "System.Memory.Available",
    "System.Memory.Total",
    "System.Swap.Used",
    "System.Swap.Total",
    "System.Network.*ReceiveRate",
    "System.Network.*SendRate",
]

# How patterns are interpreted:
#   - "glob": '*' matches any substring, everything else is literal (default)
#   - "exact": whole-name equality
#   - "prefix": name starts with the pattern
match_kind = "glob"

# Seconds to wait for every pattern before failing (1-300)
timeout_seconds = 10

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"
"#
}
