//! Device session configuration
//!
//! Builds the complete operating settings for a session and pushes them to the
//! reader in a single request.

use super::connection::ReaderEndpoint;
use super::status::StatusCache;
use crate::config::ConnectionSection;
use crate::device::{
    AutoStopMode, DeviceError, DeviceLink, KeepaliveConfig, ReaderSettings, ReportMode,
};
use tracing::{debug, info};

/// Keepalive thresholds pushed to the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepalivePolicy {
    pub period_secs: u64,
    pub max_lost: u16,
}

impl KeepalivePolicy {
    pub fn from_config(connection: &ConnectionSection) -> Self {
        Self {
            period_secs: connection.keepalive_secs,
            max_lost: connection.max_keepalive_lost,
        }
    }
}

impl Default for KeepalivePolicy {
    fn default() -> Self {
        Self {
            period_secs: 5,
            max_lost: 3,
        }
    }
}

pub struct SessionConfigurator {
    endpoint: ReaderEndpoint,
    keepalive: KeepalivePolicy,
}

impl SessionConfigurator {
    pub fn new(endpoint: ReaderEndpoint, keepalive: KeepalivePolicy) -> Self {
        Self {
            endpoint,
            keepalive,
        }
    }

    /// Derive operating settings from device defaults (pure function)
    pub fn build_settings(&self, defaults: ReaderSettings, status: &StatusCache) -> ReaderSettings {
        let params = &self.endpoint.parameters;
        let mut settings = defaults;

        settings.auto_stop = AutoStopMode::None;

        settings.report.include_antenna_port = true;
        settings.report.include_peak_rssi = true;
        settings.report.include_first_seen_time = true;
        settings.report.include_seen_count = true;
        settings.report.include_pc_bits = true;
        settings.report.mode = ReportMode::Individual;

        settings.reader_mode = params.reader_mode;
        settings.search_mode = params.search_mode;
        settings.session = params.session;

        // Ports never reported stay enabled; only known-disconnected ones are excluded
        for antenna in &mut settings.antennas {
            antenna.enabled = status.antenna_state(antenna.port).unwrap_or(true);
            antenna.tx_power_dbm = antenna.enabled.then(|| params.tx_power_dbm());
        }

        settings.keepalive = KeepaliveConfig {
            enabled: true,
            link_monitor_mode: true,
            period_ms: self.keepalive.period_secs * 1000,
            link_down_threshold: self.keepalive.max_lost,
        };

        settings.hold_reports_on_disconnect = true;
        settings
    }

    /// Full session configuration: clear queued operations, then apply settings
    pub async fn configure_session(
        &self,
        link: &dyn DeviceLink,
        status: &StatusCache,
    ) -> Result<ReaderSettings, DeviceError> {
        info!(reader = %self.endpoint.name, "Configuring reader");

        link.clear_queued_operations().await?;
        self.apply(link, status).await
    }

    /// Rebuild settings from defaults and the current status cache and apply them
    pub async fn apply(
        &self,
        link: &dyn DeviceLink,
        status: &StatusCache,
    ) -> Result<ReaderSettings, DeviceError> {
        let defaults = link.query_default_settings().await?;
        let settings = self.build_settings(defaults, status);

        debug!(
            reader = %self.endpoint.name,
            enabled_ports = ?settings.enabled_ports(),
            session = settings.session,
            "Applying reader settings"
        );
        link.apply_settings(&settings).await?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OperatingParameters;
    use crate::device::{AntennaConfig, ReaderMode, SearchMode};

    fn configurator() -> SessionConfigurator {
        let endpoint = ReaderEndpoint::new(
            "test-reader",
            "127.0.0.1",
            OperatingParameters {
                tx_power_centi_dbm: 2550,
                session: 1,
                search_mode: SearchMode::SingleTarget,
                reader_mode: ReaderMode::MaxThroughput,
            },
        );
        SessionConfigurator::new(
            endpoint,
            KeepalivePolicy {
                period_secs: 4,
                max_lost: 6,
            },
        )
    }

    fn defaults() -> ReaderSettings {
        ReaderSettings {
            antennas: (1..=4)
                .map(|port| AntennaConfig {
                    port,
                    enabled: false,
                    tx_power_dbm: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_settings_report_composition() {
        let settings = configurator().build_settings(defaults(), &StatusCache::new());

        assert!(settings.report.include_antenna_port);
        assert!(settings.report.include_peak_rssi);
        assert!(settings.report.include_first_seen_time);
        assert!(settings.report.include_seen_count);
        assert!(settings.report.include_pc_bits);
        assert_eq!(settings.report.mode, ReportMode::Individual);
        assert_eq!(settings.auto_stop, AutoStopMode::None);
        assert!(settings.hold_reports_on_disconnect);
    }

    #[test]
    fn test_build_settings_applies_parameters() {
        let settings = configurator().build_settings(defaults(), &StatusCache::new());

        assert_eq!(settings.session, 1);
        assert_eq!(settings.search_mode, SearchMode::SingleTarget);
        assert_eq!(settings.reader_mode, ReaderMode::MaxThroughput);
        assert_eq!(
            settings.keepalive,
            KeepaliveConfig {
                enabled: true,
                link_monitor_mode: true,
                period_ms: 4000,
                link_down_threshold: 6,
            }
        );
    }

    #[test]
    fn test_unknown_antennas_stay_enabled() {
        let settings = configurator().build_settings(defaults(), &StatusCache::new());

        assert_eq!(settings.enabled_ports(), vec![1, 2, 3, 4]);
        for antenna in &settings.antennas {
            assert_eq!(antenna.tx_power_dbm, Some(25.5));
        }
    }

    #[test]
    fn test_disconnected_antennas_are_excluded() {
        let status = StatusCache::new();
        status.record_antenna(1, true);
        status.record_antenna(3, false);

        let settings = configurator().build_settings(defaults(), &status);

        assert_eq!(settings.enabled_ports(), vec![1, 2, 4]);
        let port3 = settings.antennas.iter().find(|a| a.port == 3).unwrap();
        assert_eq!(port3.tx_power_dbm, None);
    }

    #[test]
    fn test_build_settings_is_idempotent() {
        let configurator = configurator();
        let status = StatusCache::new();
        status.record_antenna(2, false);

        let once = configurator.build_settings(defaults(), &status);
        let twice = configurator.build_settings(once.clone(), &status);
        assert_eq!(once, twice);
    }
}
