//! Data models: measurement records and test history

pub mod history;
pub mod record;

pub use history::{History, HistoryStore};
pub use record::{ClientInfo, MeasurementRecord};
