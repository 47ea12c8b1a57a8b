//! Interactive fallback for run parameters missing from the CLI and config.
use std::io::{BufRead, Write};

use crate::args::BenchArgs;
use crate::args::parsers::ensure_client_limit;
use crate::args::{PositiveU64, PositiveUsize};
use crate::bench::MAX_CLIENTS;
use crate::error::ValidationError;

const CLIENTS_FIELD: &str = "quantity";
const DURATION_FIELD: &str = "duration";
const INTERVAL_FIELD: &str = "interval";

/// The three run parameters, all present and positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunValues {
    pub clients: usize,
    pub duration_secs: u64,
    pub interval_ms: u64,
}

/// Takes each run parameter from `args`, asking on `output` and reading a
/// line from `input` for the ones that are unset. Prompts are issued in the
/// order clients, duration, interval; the first bad answer aborts.
///
/// # Errors
///
/// Returns an error when input ends early, is not a positive integer, or the
/// client count exceeds the supported maximum.
pub fn resolve_run_values<R, W>(
    args: &BenchArgs,
    input: &mut R,
    output: &mut W,
) -> Result<RunValues, ValidationError>
where
    R: BufRead,
    W: Write,
{
    let clients = match args.clients {
        Some(clients) => clients,
        None => {
            let question = format!(
                "Please enter the quantity of clients (max {}):",
                MAX_CLIENTS
            );
            let answer = ask(input, output, &question, CLIENTS_FIELD)?;
            let clients = parse_answer::<PositiveUsize>(&answer, CLIENTS_FIELD)?;
            ensure_client_limit(clients)?
        }
    };

    let duration = match args.duration {
        Some(duration) => duration,
        None => {
            let answer = ask(
                input,
                output,
                "Please enter the duration of the test in seconds:",
                DURATION_FIELD,
            )?;
            parse_answer::<PositiveU64>(&answer, DURATION_FIELD)?
        }
    };

    let interval = match args.interval {
        Some(interval) => interval,
        None => {
            let answer = ask(
                input,
                output,
                "Please enter the interval between messages in milliseconds:",
                INTERVAL_FIELD,
            )?;
            parse_answer::<PositiveU64>(&answer, INTERVAL_FIELD)?
        }
    };

    Ok(RunValues {
        clients: clients.get(),
        duration_secs: duration.get(),
        interval_ms: interval.get(),
    })
}

fn ask<R, W>(
    input: &mut R,
    output: &mut W,
    question: &str,
    field: &'static str,
) -> Result<String, ValidationError>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "{}", question)
        .and_then(|()| output.flush())
        .map_err(|source| ValidationError::ReadPrompt { field, source })?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|source| ValidationError::ReadPrompt { field, source })?;
    let answer = line.trim();
    if read == 0 || answer.is_empty() {
        return Err(ValidationError::MissingPromptValue { field });
    }
    Ok(answer.to_owned())
}

fn parse_answer<T>(answer: &str, field: &'static str) -> Result<T, ValidationError>
where
    T: std::str::FromStr<Err = ValidationError>,
{
    match answer.parse::<T>() {
        Ok(value) => Ok(value),
        Err(ValidationError::InvalidNumber { source }) => {
            Err(ValidationError::InvalidPromptNumber {
                field,
                value: answer.to_owned(),
                source,
            })
        }
        Err(other) => Err(other),
    }
}
