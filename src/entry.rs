use std::io::BufReader;

use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::error;

use crate::args::BenchArgs;
use crate::bench::{RunConfig, run_benchmark};
use crate::error::{AppResult, ValidationError};
use crate::prompt::resolve_run_values;
use crate::report::write_report;
use crate::transport::{WebSocketConnector, resolve_websocket_url};

/// Parses the command line, settles the run parameters and drives one
/// benchmark run to its report.
///
/// # Errors
///
/// Returns an error when arguments, config or prompted values are invalid,
/// when the run cannot collect its results, or when the report cannot be
/// written.
pub fn run() -> AppResult<()> {
    let (mut args, matches) = parse_args()?;
    apply_config(&mut args, &matches)?;

    crate::logger::init_logging(args.verbose, args.no_color);

    let url = resolve_websocket_url(&args.url).inspect_err(|err| {
        error!("Invalid endpoint: {}", err);
    })?;

    let values = {
        let stdin = std::io::stdin();
        let mut input = BufReader::new(stdin.lock());
        let mut prompts = std::io::stderr();
        resolve_run_values(&args, &mut input, &mut prompts)
    }
    .inspect_err(|err| error!("{}", err))?;

    let config = RunConfig::new(values.clients, values.duration_secs, values.interval_ms)?
        .with_collect_timeout(args.collect_timeout);
    let connector = WebSocketConnector::new(url, args.connect_timeout);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| ValidationError::RuntimeBuildFailed { source })?;

    runtime.block_on(run_async(&args, &config, &connector))
}

fn parse_args() -> AppResult<(BenchArgs, ArgMatches)> {
    let matches = BenchArgs::command().get_matches_from(std::env::args_os());
    let args = BenchArgs::from_arg_matches(&matches)?;
    Ok((args, matches))
}

fn apply_config(args: &mut BenchArgs, matches: &ArgMatches) -> AppResult<()> {
    if let Some(config) = crate::config::load_config(args.config.as_deref())? {
        crate::config::apply_config(args, matches, &config)?;
    }
    Ok(())
}

async fn run_async(
    args: &BenchArgs,
    config: &RunConfig,
    connector: &WebSocketConnector,
) -> AppResult<()> {
    tracing::info!("Benchmarking {}", connector.url());
    let report = run_benchmark(config, connector).await?;
    write_report(&report, args.output_format, args.output.as_deref()).await
}
