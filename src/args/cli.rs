use clap::Parser;
use std::time::Duration;

use crate::transport::DEFAULT_URL;

use super::parsers::{parse_client_count, parse_duration_arg, parse_positive_u64};
use super::types::{OutputFormat, PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Load and latency benchmark for WebSocket chat servers: many concurrent clients stream timestamps, the echoes are timed, and per-client and aggregate statistics are reported."
)]
pub struct BenchArgs {
    /// Number of concurrent clients (1-250). Prompted for when not set.
    #[arg(long = "clients", short = 'c', value_parser = parse_client_count)]
    pub clients: Option<PositiveUsize>,

    /// Run duration in seconds. Prompted for when not set.
    #[arg(long = "duration", short = 't', value_parser = parse_positive_u64)]
    pub duration: Option<PositiveU64>,

    /// Delay between two messages of a client, in milliseconds. Prompted for when not set.
    #[arg(long = "interval", short = 'i', value_parser = parse_positive_u64)]
    pub interval: Option<PositiveU64>,

    /// Chat endpoint (ws, wss, http or https)
    #[arg(long, short = 'u', env = "CHATBENCH_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Timeout for establishing each connection (supports ms/s/m/h)
    #[arg(
        long = "connect-timeout",
        default_value = "5s",
        value_parser = parse_duration_arg
    )]
    pub connect_timeout: Duration,

    /// Give up collecting results after this long (supports ms/s/m/h). Waits indefinitely when not set.
    #[arg(long = "collect-timeout", value_parser = parse_duration_arg)]
    pub collect_timeout: Option<Duration>,

    /// Path to config file (TOML/JSON). Defaults to ./chatbench.toml or ./chatbench.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Report format
    #[arg(long = "output-format", value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<String>,

    /// Enable verbose logging (sets log level to debug unless overridden by CHATBENCH_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color")]
    pub no_color: bool,
}
