use std::time::Duration;

use serde::Deserialize;

use crate::args::OutputFormat;
use crate::args::parsers::parse_duration;
use crate::error::ValidationError;

/// Keys mirror the long CLI flags.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub clients: Option<usize>,
    /// Run duration in seconds.
    pub duration: Option<u64>,
    /// Send interval in milliseconds.
    pub interval: Option<u64>,
    pub url: Option<String>,
    pub connect_timeout: Option<DurationValue>,
    pub collect_timeout: Option<DurationValue>,
    pub output: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub verbose: Option<bool>,
    pub no_color: Option<bool>,
}

/// Either a bare number of seconds or a string with a unit suffix.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => parse_duration(text),
        }
    }
}
