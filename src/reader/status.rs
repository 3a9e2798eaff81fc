//! Last-known antenna and GPI port states

use crate::device::ReaderStatus;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Port states reported by the reader, last write wins
///
/// Entries are never invalidated; a port that was never reported reads as
/// `false`.
#[derive(Debug, Default)]
pub struct StatusCache {
    gpi: RwLock<HashMap<u16, bool>>,
    antennas: RwLock<HashMap<u16, bool>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_gpi(&self, port: u16, state: bool) {
        self.gpi.write().insert(port, state);
    }

    pub fn record_antenna(&self, port: u16, connected: bool) {
        self.antennas.write().insert(port, connected);
    }

    /// Refresh both maps from a full status snapshot
    pub fn apply_status(&self, status: &ReaderStatus) {
        {
            let mut antennas = self.antennas.write();
            for antenna in &status.antennas {
                antennas.insert(antenna.port, antenna.connected);
            }
        }
        let mut gpi = self.gpi.write();
        for input in &status.gpis {
            gpi.insert(input.port, input.state);
        }
    }

    pub fn gpi_state(&self, port: u16) -> bool {
        self.gpi.read().get(&port).copied().unwrap_or(false)
    }

    pub fn antenna_connected(&self, port: u16) -> bool {
        self.antennas.read().get(&port).copied().unwrap_or(false)
    }

    /// Raw antenna entry; `None` when the port has never been reported
    pub fn antenna_state(&self, port: u16) -> Option<bool> {
        self.antennas.read().get(&port).copied()
    }

    pub fn antenna_snapshot(&self) -> HashMap<u16, bool> {
        self.antennas.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{AntennaStatus, GpiStatus};

    #[test]
    fn test_unset_ports_default_to_false() {
        let cache = StatusCache::new();
        assert!(!cache.gpi_state(1));
        assert!(!cache.antenna_connected(4));
        assert_eq!(cache.antenna_state(4), None);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = StatusCache::new();
        cache.record_gpi(1, true);
        cache.record_gpi(1, false);
        cache.record_gpi(2, true);

        assert!(!cache.gpi_state(1));
        assert!(cache.gpi_state(2));
    }

    #[test]
    fn test_gpi_and_antenna_maps_are_separate() {
        let cache = StatusCache::new();
        cache.record_gpi(1, true);
        assert!(!cache.antenna_connected(1));

        cache.record_antenna(1, true);
        cache.record_gpi(1, false);
        assert!(cache.antenna_connected(1));
    }

    #[test]
    fn test_apply_status_snapshot() {
        let cache = StatusCache::new();
        cache.record_gpi(3, true);

        cache.apply_status(&ReaderStatus {
            antennas: vec![
                AntennaStatus {
                    port: 1,
                    connected: true,
                },
                AntennaStatus {
                    port: 2,
                    connected: false,
                },
            ],
            gpis: vec![GpiStatus {
                port: 1,
                state: true,
            }],
            temperature_celsius: 41,
            is_active: false,
        });

        assert!(cache.antenna_connected(1));
        assert_eq!(cache.antenna_state(2), Some(false));
        assert!(cache.gpi_state(1));
        // Ports absent from the snapshot keep their last value
        assert!(cache.gpi_state(3));
    }
}
