use crate::{error::{CoreError, Result}, model::ByteCounters, source::NetworkSource};
use std::collections::BTreeMap;
use std::sync::Mutex;
use sysinfo::Networks;

/// Network counters read through sysinfo
pub struct SysinfoNetworks {
    networks: Mutex<Networks>,
}

impl SysinfoNetworks {
    pub fn new() -> Result<Self> {
        let networks = Networks::new_with_refreshed_list();

        Ok(Self {
            networks: Mutex::new(networks),
        })
    }
}

impl NetworkSource for SysinfoNetworks {
    fn interface_counters(&self) -> Result<BTreeMap<String, ByteCounters>> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|e| CoreError::counters(format!("network counters lock poisoned: {}", e)))?;

        // Pick up interfaces that appeared since the last read, drop vanished ones
        networks.refresh_list();
        networks.refresh();

        let mut counters = BTreeMap::new();
        for (interface_name, data) in &*networks {
            counters.insert(
                interface_name.clone(),
                ByteCounters::new(data.total_received(), data.total_transmitted()),
            );
        }

        if counters.is_empty() {
            return Err(CoreError::counters("no network interfaces reported"));
        }

        Ok(counters)
    }
}
