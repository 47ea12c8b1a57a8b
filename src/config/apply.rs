use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::parsers::ensure_client_limit;
use crate::args::{BenchArgs, PositiveU64, PositiveUsize};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};

use super::types::{ConfigFile, DurationValue};

/// Fills every argument the user did not set explicitly from the config file.
///
/// # Errors
///
/// Returns an error when a config value is zero, out of range or not a valid
/// duration.
pub fn apply_config(
    args: &mut BenchArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_explicit(matches, "clients")
        && let Some(clients) = config.clients
    {
        let clients = ensure_positive_usize(clients, "clients")?;
        args.clients = Some(ensure_client_limit(clients)?);
    }

    if !is_explicit(matches, "duration")
        && let Some(duration) = config.duration
    {
        args.duration = Some(ensure_positive_u64(duration, "duration")?);
    }

    if !is_explicit(matches, "interval")
        && let Some(interval) = config.interval
    {
        args.interval = Some(ensure_positive_u64(interval, "interval")?);
    }

    if !is_explicit(matches, "url")
        && let Some(url) = config.url.clone()
    {
        args.url = url;
    }

    if !is_explicit(matches, "connect_timeout")
        && let Some(timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = to_duration(timeout, "connect_timeout")?;
    }

    if !is_explicit(matches, "collect_timeout")
        && let Some(timeout) = config.collect_timeout.as_ref()
    {
        args.collect_timeout = Some(to_duration(timeout, "collect_timeout")?);
    }

    if !is_explicit(matches, "output")
        && let Some(output) = config.output.clone()
    {
        args.output = Some(output);
    }

    if !is_explicit(matches, "output_format")
        && let Some(format) = config.output_format
    {
        args.output_format = format;
    }

    if !is_explicit(matches, "verbose")
        && let Some(verbose) = config.verbose
    {
        args.verbose = verbose;
    }

    if !is_explicit(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}

/// Values given on the command line or through the environment win over the config file.
fn is_explicit(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

fn ensure_positive_u64(value: u64, field: &str) -> AppResult<PositiveU64> {
    PositiveU64::try_from(value).map_err(|err| positive_error(field, err))
}

fn ensure_positive_usize(value: usize, field: &str) -> AppResult<PositiveUsize> {
    PositiveUsize::try_from(value).map_err(|err| positive_error(field, err))
}

fn positive_error(field: &str, source: ValidationError) -> AppError {
    AppError::config(ConfigError::FieldMustBePositive {
        field: field.to_owned(),
        source,
    })
}

fn to_duration(value: &DurationValue, field: &str) -> AppResult<std::time::Duration> {
    value.to_duration().map_err(|err| {
        AppError::config(ConfigError::InvalidDuration {
            field: field.to_owned(),
            source: err,
        })
    })
}
