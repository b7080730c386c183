//! Result export: CSV, JSON envelope and free-text report generation

use crate::error::{AppError, Result};
use crate::models::{History, MeasurementRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Fixed CSV column order; exports must never reorder these
const CSV_HEADERS: [&str; 9] = [
    "Timestamp",
    "Server",
    "Download (Mbps)",
    "Upload (Mbps)",
    "Ping (ms)",
    "Jitter (ms)",
    "Packet Loss (%)",
    "ISP",
    "Location",
];

/// JSON export envelope wrapping the full history
#[derive(Debug, Serialize)]
struct ExportEnvelope<'a> {
    #[serde(rename = "exportDate")]
    export_date: DateTime<Utc>,
    #[serde(rename = "testCount")]
    test_count: usize,
    results: &'a [MeasurementRecord],
}

fn require_results(history: &History) -> Result<()> {
    if history.is_empty() {
        return Err(AppError::export(
            "No test data to export. Please run a test first.",
        ));
    }
    Ok(())
}

/// Quote a CSV field when it contains a delimiter, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn fmt_opt_f64(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "0".to_string())
}

fn fmt_opt_u32(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "0".to_string())
}

/// Render the full history as CSV with the fixed column order
pub fn to_csv(history: &History) -> Result<String> {
    require_results(history)?;

    let mut output = String::new();
    output.push_str(&CSV_HEADERS.join(","));
    output.push('\n');

    for record in history.records() {
        let row = [
            record.started_at.to_rfc3339(),
            csv_field(&record.server),
            fmt_opt_f64(record.download_mbps),
            fmt_opt_f64(record.upload_mbps),
            fmt_opt_u32(record.ping_ms),
            fmt_opt_u32(record.jitter_ms),
            fmt_opt_f64(record.packet_loss_pct),
            csv_field(record.client.isp.as_deref().unwrap_or("")),
            csv_field(&record.client.location_label().unwrap_or_default()),
        ];
        output.push_str(&row.join(","));
        output.push('\n');
    }

    Ok(output)
}

/// Render the full history as the JSON export envelope
pub fn to_json(history: &History) -> Result<String> {
    require_results(history)?;

    let envelope = ExportEnvelope {
        export_date: Utc::now(),
        test_count: history.len(),
        results: history.records(),
    };

    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// Generate the human-readable detailed report for the latest run, with a
/// historical summary over the full history
pub fn to_text_report(history: &History) -> Result<String> {
    require_results(history)?;

    // require_results guarantees at least one record
    let latest = history
        .latest()
        .ok_or_else(|| AppError::internal("history empty after non-empty check"))?;

    let mut report = String::new();
    writeln!(report, "INTERNATIONAL NETWORK SPEED TEST REPORT").ok();
    writeln!(report, "Generated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")).ok();
    writeln!(report).ok();

    writeln!(report, "=== LATEST TEST RESULTS ===").ok();
    writeln!(report, "Test Server: {}", latest.server).ok();
    writeln!(report, "Test Date: {}", latest.started_at.format("%Y-%m-%d %H:%M:%S UTC")).ok();
    writeln!(report).ok();
    writeln!(report, "Download Speed: {}", fmt_metric_f64(latest.download_mbps, "Mbps")).ok();
    writeln!(report, "Upload Speed: {}", fmt_metric_f64(latest.upload_mbps, "Mbps")).ok();
    writeln!(report, "Ping Latency: {}", fmt_metric_u32(latest.ping_ms, "ms")).ok();
    writeln!(report, "Jitter: {}", fmt_metric_u32(latest.jitter_ms, "ms")).ok();
    writeln!(
        report,
        "Packet Loss: {}",
        latest
            .packet_loss_pct
            .map(|v| format!("{:.1}%", v))
            .unwrap_or_else(|| "Not measured".to_string())
    )
    .ok();
    writeln!(report).ok();

    writeln!(report, "=== CONNECTION DETAILS ===").ok();
    writeln!(report, "Your IP Address: {}", latest.client.ip.as_deref().unwrap_or("Unknown")).ok();
    writeln!(report, "ISP Provider: {}", latest.client.isp.as_deref().unwrap_or("Unknown")).ok();
    writeln!(
        report,
        "Your Location: {}",
        latest.client.location_label().unwrap_or_else(|| "Unknown".to_string())
    )
    .ok();
    writeln!(report, "DNS Resolution Time: {}", fmt_metric_u32(latest.dns_ms, "ms")).ok();
    writeln!(report, "Connection Time: {}", fmt_metric_u32(latest.connection_ms, "ms")).ok();
    writeln!(report).ok();

    writeln!(report, "=== ANALYSIS ===").ok();
    writeln!(report, "{}", analyze(latest)).ok();
    writeln!(report).ok();

    writeln!(report, "=== HISTORICAL SUMMARY ===").ok();
    writeln!(report, "Total Tests Performed: {}", history.len()).ok();
    if let Some(avg) = average(history, |r| r.download_mbps) {
        writeln!(report, "Average Download Speed: {:.2} Mbps", avg).ok();
    }
    if let Some(avg) = average(history, |r| r.upload_mbps) {
        writeln!(report, "Average Upload Speed: {:.2} Mbps", avg).ok();
    }
    if let Some(avg) = average(history, |r| r.ping_ms.map(f64::from)) {
        writeln!(report, "Average Ping: {} ms", avg.round() as u32).ok();
    }
    writeln!(report).ok();

    writeln!(report, "=== DISCLAIMER ===").ok();
    writeln!(
        report,
        "This test measures your connection to real international servers, bypassing potential"
    )
    .ok();
    writeln!(
        report,
        "ISP speed test manipulation that occurs with local/cached testing servers."
    )
    .ok();
    writeln!(
        report,
        "Results may vary based on network conditions, server load, and routing."
    )
    .ok();

    Ok(report)
}

/// Write export contents to a file
pub fn write_export(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .map_err(|e| AppError::io(format!("Failed to write {}: {}", path.display(), e)))
}

fn fmt_metric_f64(value: Option<f64>, unit: &str) -> String {
    value
        .map(|v| format!("{:.2} {}", v, unit))
        .unwrap_or_else(|| "Not measured".to_string())
}

fn fmt_metric_u32(value: Option<u32>, unit: &str) -> String {
    value
        .map(|v| format!("{} {}", v, unit))
        .unwrap_or_else(|| "Not measured".to_string())
}

/// Average of a metric over the records where it was measured
fn average<F>(history: &History, metric: F) -> Option<f64>
where
    F: Fn(&MeasurementRecord) -> Option<f64>,
{
    let values: Vec<f64> = history.records().iter().filter_map(metric).collect();
    crate::stats::mean(&values)
}

/// Threshold-based plain-language assessment of one record
fn analyze(record: &MeasurementRecord) -> String {
    let mut lines = Vec::new();

    if let Some(download) = record.download_mbps {
        if download < 5.0 {
            lines.push("Download speed is quite low. Consider contacting your ISP.");
        } else if download > 50.0 {
            lines.push("Excellent download speed for most activities.");
        }
    }

    if let Some(ping) = record.ping_ms {
        if ping > 100 {
            lines.push("High latency detected. Gaming and video calls may be affected.");
        } else if ping < 30 {
            lines.push("Low latency - excellent for real-time applications.");
        }
    }

    if let Some(jitter) = record.jitter_ms {
        if jitter > 50 {
            lines.push("High jitter detected. Connection may be unstable.");
        }
    }

    if let Some(loss) = record.packet_loss_pct {
        if loss > 1.0 {
            lines.push("Packet loss detected. Network quality may be poor.");
        }
    }

    if lines.is_empty() {
        "Overall connection quality appears normal.".to_string()
    } else {
        lines.join("\n")
    }
}
