//! Console presentation layer
//!
//! Subscribes to engine progress events and renders status lines, the final
//! result summary and the survey table. All terminal concerns live here; the
//! engine itself never prints.

pub mod export;

use crate::engine::{ProgressEvent, ProgressObserver, Stage};
use crate::models::MeasurementRecord;
use crate::registry::Endpoint;
use crate::engine::selector::ServerRank;
use colored::Colorize;
use std::io::Write as _;

/// Console subscriber for engine progress
pub struct ConsoleReporter {
    use_color: bool,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(use_color: bool, verbose: bool) -> Self {
        // colored honors this global toggle for every string we emit
        colored::control::set_override(use_color);
        Self { use_color, verbose }
    }

    fn status(&self, message: &str) {
        if self.use_color {
            println!("{}", message.cyan());
        } else {
            println!("{}", message);
        }
    }

    /// Render one finished record as a summary block
    pub fn summary(&self, record: &MeasurementRecord) -> String {
        let metric_f = |value: Option<f64>, unit: &str| {
            value
                .map(|v| format!("{:.2} {}", v, unit))
                .unwrap_or_else(|| "--".to_string())
        };
        let metric_u = |value: Option<u32>, unit: &str| {
            value
                .map(|v| format!("{} {}", v, unit))
                .unwrap_or_else(|| "--".to_string())
        };

        let mut out = String::new();
        out.push_str(&format!("Server:      {}\n", record.server));
        out.push_str(&format!(
            "Started:     {}\n",
            record.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&format!("Download:    {}\n", metric_f(record.download_mbps, "Mbps")));
        out.push_str(&format!("Upload:      {}\n", metric_f(record.upload_mbps, "Mbps")));
        out.push_str(&format!("Ping:        {}\n", metric_u(record.ping_ms, "ms")));
        out.push_str(&format!("Jitter:      {}\n", metric_u(record.jitter_ms, "ms")));
        out.push_str(&format!(
            "Packet loss: {}\n",
            record
                .packet_loss_pct
                .map(|v| format!("{:.1}%", v))
                .unwrap_or_else(|| "--".to_string())
        ));
        out.push_str(&format!("DNS:         {}\n", metric_u(record.dns_ms, "ms")));
        out.push_str(&format!("Connection:  {}\n", metric_u(record.connection_ms, "ms")));

        if let Some(isp) = &record.client.isp {
            out.push_str(&format!("ISP:         {}\n", isp));
        }
        if let Some(location) = record.client.location_label() {
            out.push_str(&format!("Location:    {}\n", location));
        }

        out
    }

    /// Render the survey ranking as a fixed-width table
    pub fn survey_table(&self, ranking: &[(Endpoint, ServerRank)]) -> String {
        let mut out = String::new();
        out.push_str(&format!("{:<28} {:<22} {:>12}\n", "Server", "Location", "Ping"));
        out.push_str(&format!("{}\n", "-".repeat(64)));
        for (endpoint, rank) in ranking {
            out.push_str(&format!(
                "{:<28} {:<22} {:>12}\n",
                endpoint.display_name,
                endpoint.location,
                rank.to_string()
            ));
        }
        out
    }
}

impl ProgressObserver for ConsoleReporter {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { stage } => match stage {
                Stage::SelectingServer => self.status("Finding best server..."),
                Stage::Latency => self.status("Testing latency and jitter..."),
                Stage::Download => self.status("Testing download speed..."),
                Stage::Upload => self.status("Testing upload speed..."),
                Stage::Diagnostics => self.status("Running diagnostics..."),
            },
            ProgressEvent::StageCompleted { stage } => {
                // Close the carriage-return progress line
                if matches!(stage, Stage::Download | Stage::Upload | Stage::Latency) {
                    println!();
                }
            }
            ProgressEvent::LatencySample {
                sample_ms,
                completed,
                total,
            } => {
                print!("\r  ping {:>4} ms  [{}/{}]", sample_ms, completed, total);
                let _ = std::io::stdout().flush();
            }
            ProgressEvent::Throughput {
                stage,
                mbps,
                fraction,
                ..
            } => {
                let label = match stage {
                    Stage::Upload => "upload",
                    _ => "download",
                };
                print!(
                    "\r  {} {:>8.2} Mbps  ({:.0}%)",
                    label,
                    mbps,
                    stage.overall_percent(fraction)
                );
                let _ = std::io::stdout().flush();
            }
            ProgressEvent::StageProgress { .. } => {}
            ProgressEvent::ServerProbed {
                display_name, rank, ..
            } => {
                if self.verbose {
                    println!("  {:<28} {}", display_name, rank);
                }
            }
            ProgressEvent::Status { message } => self.status(&message),
            ProgressEvent::RunCompleted => {
                if self.use_color {
                    println!("{}", "Speed test completed.".green());
                } else {
                    println!("Speed test completed.");
                }
            }
            ProgressEvent::RunFailed { message } => {
                if self.use_color {
                    eprintln!("{}", format!("Speed test failed: {}", message).red());
                } else {
                    eprintln!("Speed test failed: {}", message);
                }
            }
        }
    }
}
