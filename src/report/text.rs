use crate::bench::RunReport;

/// Divisor for two-decimal fixed-point percentages.
const PERCENT_DIVISOR: u64 = 100;
/// Nanoseconds per microsecond.
const NS_PER_US: u64 = 1_000;
/// Nanoseconds per millisecond.
const NS_PER_MS: u64 = 1_000_000;
/// Nanoseconds per second.
const NS_PER_SEC: u64 = 1_000_000_000;
/// Fraction digits kept when scaling a delay to a larger unit.
const FRACTION_SCALE: u64 = 1_000;
const SEPARATOR: &str = "------------------------------";

pub(crate) fn report_lines(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::with_capacity(report.clients.len().saturating_mul(4).saturating_add(6));
    for (client_id, stat) in &report.clients {
        lines.push(format!("Client number: {}", client_id));
        lines.push(format!(
            "Average delay: {}",
            format_delay(stat.avg_delay_nanos)
        ));
        lines.push(format!("Messages sent: {}", stat.sent));
        lines.push(format!("Messages received: {}", stat.received));
    }

    let aggregate = &report.aggregate;
    lines.push(SEPARATOR.to_owned());
    lines.push(format!(
        "Clients: {} over {}s, one message every {}ms",
        report.run.client_count, report.run.duration_secs, report.run.interval_ms
    ));
    lines.push(format!(
        "Average delay: {}",
        format_delay(aggregate.avg_delay_nanos)
    ));
    lines.push(format!("Messages sent: {}", aggregate.total_sent));
    lines.push(format!("Messages received: {}", aggregate.total_received));
    lines.push(format!(
        "Loss ratio: {}%",
        format_x100(aggregate.loss_ratio_x100)
    ));
    lines
}

pub(crate) fn format_x100(value: u64) -> String {
    format!(
        "{}.{:02}",
        value / PERCENT_DIVISOR,
        value % PERCENT_DIVISOR
    )
}

/// Renders a signed nanosecond delay in the largest unit that keeps it >= 1.
pub(crate) fn format_delay(nanos: i64) -> String {
    let sign = if nanos < 0 { "-" } else { "" };
    let magnitude = nanos.unsigned_abs();
    let (unit_ns, suffix) = if magnitude >= NS_PER_SEC {
        (NS_PER_SEC, "s")
    } else if magnitude >= NS_PER_MS {
        (NS_PER_MS, "ms")
    } else if magnitude >= NS_PER_US {
        (NS_PER_US, "µs")
    } else {
        return format!("{}{}ns", sign, magnitude);
    };

    let whole = magnitude / unit_ns;
    let fraction = (magnitude % unit_ns) / (unit_ns / FRACTION_SCALE);
    format!("{}{}.{:03}{}", sign, whole, fraction, suffix)
}
