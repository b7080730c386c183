//! Statistical helpers for latency and throughput aggregation

/// Arithmetic mean of a sample set. Returns `None` for an empty set so that
/// callers must represent "no data" explicitly instead of dividing by zero.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population standard deviation of a sample set about its mean.
///
/// The latency sampler reports this as jitter. Population (not sample)
/// variance is used: the probes collected *are* the whole population of
/// interest for one run.
pub fn population_std_dev(samples: &[f64]) -> Option<f64> {
    let avg = mean(samples)?;
    let variance = samples.iter().map(|&x| (x - avg).powi(2)).sum::<f64>() / samples.len() as f64;
    Some(variance.sqrt())
}

/// Round a millisecond value to the nearest whole millisecond.
pub fn round_ms(ms: f64) -> u32 {
    ms.round().max(0.0) as u32
}

/// Bitrate in megabits per second for `bytes` transferred over `elapsed_secs`.
///
/// Matches the reporting convention used throughout: bits / 1,000,000, not
/// mebibits. Returns 0.0 when no time has elapsed yet.
pub fn mbps(bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    (bytes as f64 * 8.0) / elapsed_secs / 1_000_000.0
}

/// Packet loss percentage for `failed` out of `total` probes.
pub fn loss_percentage(failed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (failed as f64 / total as f64) * 100.0
}
