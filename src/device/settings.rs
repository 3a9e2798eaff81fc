//! Reader settings object model
//!
//! A trimmed mirror of the settings tree the reader SDK exposes. Only the fields
//! the session configurator touches are modelled.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// One report per tag read
    Individual,
    /// Reports batched until inventory stops
    BatchAfterStop,
    #[default]
    WaitForQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReaderMode {
    #[default]
    AutoSetDenseReader,
    AutoSetStaticFast,
    MaxThroughput,
    Hybrid,
    DenseReaderM4,
    DenseReaderM8,
    MaxMiller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    ReaderSelected,
    SingleTarget,
    #[default]
    DualTarget,
    TagFocus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AutoStopMode {
    #[default]
    None,
    Duration,
    GpiTrigger,
}

/// Fields included in every tag report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReportConfig {
    pub include_antenna_port: bool,
    pub include_peak_rssi: bool,
    pub include_first_seen_time: bool,
    pub include_seen_count: bool,
    pub include_pc_bits: bool,
    pub mode: ReportMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntennaConfig {
    pub port: u16,
    pub enabled: bool,
    pub tx_power_dbm: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KeepaliveConfig {
    pub enabled: bool,
    /// Drop the link after `link_down_threshold` missed keepalives
    pub link_monitor_mode: bool,
    pub period_ms: u64,
    pub link_down_threshold: u16,
}

/// Complete operating configuration pushed to the reader in one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReaderSettings {
    pub report: ReportConfig,
    pub reader_mode: ReaderMode,
    pub search_mode: SearchMode,
    pub session: u16,
    pub antennas: Vec<AntennaConfig>,
    pub keepalive: KeepaliveConfig,
    pub auto_stop: AutoStopMode,
    pub hold_reports_on_disconnect: bool,
}

impl ReaderSettings {
    /// Antenna ports that will radiate with these settings
    pub fn enabled_ports(&self) -> Vec<u16> {
        self.antennas
            .iter()
            .filter(|a| a.enabled)
            .map(|a| a.port)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_ports() {
        let settings = ReaderSettings {
            antennas: vec![
                AntennaConfig {
                    port: 1,
                    enabled: true,
                    tx_power_dbm: Some(30.0),
                },
                AntennaConfig {
                    port: 2,
                    enabled: false,
                    tx_power_dbm: None,
                },
                AntennaConfig {
                    port: 3,
                    enabled: true,
                    tx_power_dbm: Some(30.0),
                },
            ],
            ..Default::default()
        };

        assert_eq!(settings.enabled_ports(), vec![1, 3]);
    }

    #[test]
    fn test_mode_serialization_is_snake_case() {
        let json = serde_json::to_string(&SearchMode::DualTarget).unwrap();
        assert_eq!(json, "\"dual_target\"");

        let mode: ReaderMode = serde_json::from_str("\"auto_set_dense_reader\"").unwrap();
        assert_eq!(mode, ReaderMode::AutoSetDenseReader);
    }
}
