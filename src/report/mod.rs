//! Rendering and delivery of the final run report.
mod text;

use serde_json::json;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::info;

use crate::args::OutputFormat;
use crate::bench::RunReport;
use crate::error::{AppError, AppResult, RunError};

/// Renders the report in the requested format, newline-terminated.
///
/// # Errors
///
/// Returns an error when JSON serialization fails.
pub fn render_report(report: &RunReport, format: OutputFormat) -> AppResult<String> {
    match format {
        OutputFormat::Text => {
            let mut rendered = text::report_lines(report).join("\n");
            rendered.push('\n');
            Ok(rendered)
        }
        OutputFormat::Json => {
            let clients: Vec<serde_json::Value> = report
                .clients
                .iter()
                .map(|(client_id, stat)| {
                    json!({
                        "client": client_id,
                        "sent": stat.sent,
                        "received": stat.received,
                        "avg_delay_ns": stat.avg_delay_nanos,
                    })
                })
                .collect();
            let aggregate = &report.aggregate;
            let payload = json!({
                "run": report.run,
                "clients": clients,
                "aggregate": {
                    "total_sent": aggregate.total_sent,
                    "total_received": aggregate.total_received,
                    "avg_delay_ns": aggregate.avg_delay_nanos,
                    "loss_ratio_percent": text::format_x100(aggregate.loss_ratio_x100),
                },
            });
            let mut rendered = serde_json::to_string_pretty(&payload)?;
            rendered.push('\n');
            Ok(rendered)
        }
    }
}

/// Prints the rendered report to stdout, or writes it to `path` when set.
///
/// # Errors
///
/// Returns an error when rendering fails or the report file cannot be written.
pub async fn write_report(
    report: &RunReport,
    format: OutputFormat,
    path: Option<&str>,
) -> AppResult<()> {
    let rendered = render_report(report, format)?;
    let Some(path) = path else {
        print!("{}", rendered);
        return Ok(());
    };

    write_file(path, rendered.as_bytes())
        .await
        .map_err(|source| {
            AppError::run(RunError::WriteReport {
                path: path.to_owned(),
                source,
            })
        })?;
    info!("Report written to {}", path);
    Ok(())
}

async fn write_file(path: &str, contents: &[u8]) -> Result<(), std::io::Error> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    writer.write_all(contents).await?;
    writer.flush().await?;
    Ok(())
}
